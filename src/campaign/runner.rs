//! Campaign runners: a compressed demo timeline and a timer-driven schedule.
//!
//! The scheduled runner has one worker task that owns the [`Campaign`] and
//! consumes [`CampaignJob`]s from a queue; timer tasks only enqueue jobs.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use super::engine::{CampaignEngine, JobOutcome};
use super::{Campaign, CampaignSummary, Stage};

const JOB_QUEUE_CAPACITY: usize = 64;

/// Delays measured from campaign start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub followup_at: Duration,
    pub personalized_at: Duration,
    /// When the campaign ends and is archived.
    pub horizon: Duration,
    pub check_interval: Duration,
}

/// Unit of work for the campaign worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignJob {
    RunStage(Stage),
    CheckResponses,
    Finish,
}

impl std::fmt::Display for CampaignJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RunStage(stage) => write!(f, "run_stage({stage})"),
            Self::CheckResponses => write!(f, "check_responses"),
            Self::Finish => write!(f, "finish"),
        }
    }
}

/// Job order of the compressed demo timeline.
pub const DEMO_TIMELINE: [CampaignJob; 7] = [
    CampaignJob::RunStage(Stage::Initial),
    CampaignJob::CheckResponses,
    CampaignJob::RunStage(Stage::Followup),
    CampaignJob::CheckResponses,
    CampaignJob::RunStage(Stage::Personalized),
    CampaignJob::CheckResponses,
    CampaignJob::Finish,
];

/// Run the whole campaign back to back and return the final summary.
pub async fn run_demo(engine: &CampaignEngine, campaign: &mut Campaign) -> CampaignSummary {
    info!(campaign = %campaign.name, "Starting demo run");
    for job in DEMO_TIMELINE {
        if let JobOutcome::Finished(summary) = run_job(engine, campaign, job).await {
            return summary;
        }
    }
    campaign.archive()
}

async fn run_job(engine: &CampaignEngine, campaign: &mut Campaign, job: CampaignJob) -> JobOutcome {
    debug!(%job, "Running job");
    let outcome = engine.handle(campaign, job).await;
    match &outcome {
        JobOutcome::Dispatched(report) => {
            debug!(stage = %report.stage, delivered = report.delivered.len(), "Stage job done");
        }
        JobOutcome::Checked(report) => {
            debug!(cycle = report.cycle, interested = report.interested, "Check job done");
        }
        JobOutcome::CheckAborted(e) => {
            warn!(error = %e, "Check job aborted, will retry on next tick");
        }
        JobOutcome::Finished(summary) => {
            info!(
                campaign = %campaign.name,
                sent = summary.sent,
                booked = summary.booked,
                "Campaign finished"
            );
        }
    }
    outcome
}

/// Cloneable stop signal for a scheduled run.
#[derive(Debug, Clone)]
pub struct StopToken {
    tx: Arc<watch::Sender<bool>>,
}

impl StopToken {
    /// Ask the worker to stop. A job already running completes first.
    pub fn stop(&self) {
        let _ = self.tx.send(true);
    }
}

/// Handle to a scheduled campaign.
pub struct CampaignHandle {
    stop: StopToken,
    worker: JoinHandle<Campaign>,
    timers: Vec<JoinHandle<()>>,
}

impl CampaignHandle {
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Wait for the worker and return the archived campaign.
    pub async fn join(self) -> Result<Campaign, JoinError> {
        let result = self.worker.await;
        for timer in &self.timers {
            timer.abort();
        }
        result
    }
}

/// Start a scheduled run. The initial stage is queued immediately.
pub fn spawn_scheduled(
    engine: Arc<CampaignEngine>,
    campaign: Campaign,
    schedule: Schedule,
) -> CampaignHandle {
    let (job_tx, job_rx) = mpsc::channel(JOB_QUEUE_CAPACITY);
    let (stop_tx, stop_rx) = watch::channel(false);

    info!(
        campaign = %campaign.name,
        followup_at = ?schedule.followup_at,
        personalized_at = ?schedule.personalized_at,
        horizon = ?schedule.horizon,
        check_interval = ?schedule.check_interval,
        "Scheduling campaign"
    );

    let timers = vec![
        spawn_at(job_tx.clone(), Duration::ZERO, vec![CampaignJob::RunStage(Stage::Initial)]),
        spawn_at(
            job_tx.clone(),
            schedule.followup_at,
            vec![CampaignJob::RunStage(Stage::Followup)],
        ),
        spawn_at(
            job_tx.clone(),
            schedule.personalized_at,
            vec![CampaignJob::RunStage(Stage::Personalized)],
        ),
        spawn_at(
            job_tx.clone(),
            schedule.horizon,
            vec![CampaignJob::CheckResponses, CampaignJob::Finish],
        ),
        spawn_check_ticker(job_tx, schedule.check_interval),
    ];

    let worker = tokio::spawn(worker_loop(engine, campaign, job_rx, stop_rx));
    CampaignHandle {
        stop: StopToken {
            tx: Arc::new(stop_tx),
        },
        worker,
        timers,
    }
}

fn spawn_at(
    jobs: mpsc::Sender<CampaignJob>,
    delay: Duration,
    batch: Vec<CampaignJob>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        for job in batch {
            if jobs.send(job).await.is_err() {
                return;
            }
        }
    })
}

fn spawn_check_ticker(jobs: mpsc::Sender<CampaignJob>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick fires immediately; nothing has been sent yet.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if jobs.send(CampaignJob::CheckResponses).await.is_err() {
                return;
            }
        }
    })
}

async fn worker_loop(
    engine: Arc<CampaignEngine>,
    mut campaign: Campaign,
    mut jobs: mpsc::Receiver<CampaignJob>,
    mut stop: watch::Receiver<bool>,
) -> Campaign {
    loop {
        tokio::select! {
            biased;

            // Dropping every stop token counts as a stop request.
            _ = stop.changed() => {
                info!(campaign = %campaign.name, "Stop requested");
                break;
            }
            job = jobs.recv() => {
                let Some(job) = job else { break };
                if let JobOutcome::Finished(_) = run_job(&engine, &mut campaign, job).await {
                    break;
                }
            }
        }
    }

    let summary = campaign.archive();
    debug!(total = summary.total, sent = summary.sent, "Worker exiting");
    campaign
}
