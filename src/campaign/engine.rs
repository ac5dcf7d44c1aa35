//! Campaign engine: stage sends and response checks.
//!
//! The engine holds the collaborators; the [`Campaign`] it acts on is passed
//! in by `&mut` so a single owner serializes all state changes.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{error, info, warn};

use super::contact::ContactStatus;
use super::runner::CampaignJob;
use super::{Campaign, CampaignSummary, Stage};
use crate::config::{CampaignConfig, EnrichmentKind, NotifierKind};
use crate::error::{CampaignError, ClassifierError};
use crate::integrations::booker::{Booker, Meeting, SimulatedBooker};
use crate::integrations::notifier::{LogNotifier, NoopNotifier, Notifier};
use crate::leads::enrich::{Enricher, NoopEnricher, SimulatedEnricher};
use crate::outreach::dispatcher::{DispatchReport, OutreachDispatcher};
use crate::outreach::mailer::SimulatedMailer;
use crate::outreach::templates::TemplateRegistry;
use crate::replies::classifier::{ResponseClassifier, SimulatedClassifier};
use crate::replies::types::Reply;

/// What one response check did.
#[derive(Debug, Default)]
pub struct ResponseCheckReport {
    pub cycle: u32,
    /// Contacts handed to the classifier.
    pub examined: usize,
    pub bounced: usize,
    pub unsubscribed: usize,
    pub out_of_office: usize,
    pub replied_neutral: usize,
    pub interested: usize,
    pub notified: usize,
    pub meetings: Vec<Meeting>,
    pub booking_failures: usize,
    /// Replies the campaign refused to apply.
    pub rejected: Vec<CampaignError>,
}

/// Result of handling one queued job.
#[derive(Debug)]
pub enum JobOutcome {
    Dispatched(DispatchReport),
    Checked(ResponseCheckReport),
    /// The classifier was unavailable; nothing changed.
    CheckAborted(ClassifierError),
    Finished(CampaignSummary),
}

pub struct CampaignEngine {
    dispatcher: OutreachDispatcher,
    classifier: Arc<dyn ResponseClassifier>,
    notifier: Arc<dyn Notifier>,
    booker: Arc<dyn Booker>,
    max_booking_attempts: u32,
}

impl CampaignEngine {
    pub fn new(
        dispatcher: OutreachDispatcher,
        classifier: Arc<dyn ResponseClassifier>,
        notifier: Arc<dyn Notifier>,
        booker: Arc<dyn Booker>,
        max_booking_attempts: u32,
    ) -> Self {
        Self {
            dispatcher,
            classifier,
            notifier,
            booker,
            max_booking_attempts: max_booking_attempts.max(1),
        }
    }

    /// Wire the simulated collaborators selected by `config`.
    ///
    /// With a seed, each collaborator gets its own deterministic stream.
    pub fn from_config(config: &CampaignConfig) -> crate::error::Result<Self> {
        config.validate()?;
        let templates = TemplateRegistry::with_defaults();
        templates.validate_stages()?;

        let rng = |stream: u64| match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
            None => StdRng::from_entropy(),
        };

        let enricher: Arc<dyn Enricher> = match config.enrichment {
            EnrichmentKind::Simulated => Arc::new(SimulatedEnricher::new(rng(1))),
            EnrichmentKind::None => Arc::new(NoopEnricher),
        };
        let notifier: Arc<dyn Notifier> = match config.notifier {
            NotifierKind::Log => Arc::new(LogNotifier::default()),
            NotifierKind::None => Arc::new(NoopNotifier),
        };
        let dispatcher = OutreachDispatcher::new(
            Arc::new(SimulatedMailer::new(config.send_failure_rate, rng(2))?),
            templates,
            enricher,
        );

        Ok(Self::new(
            dispatcher,
            Arc::new(SimulatedClassifier::new(config.rates, rng(3))?),
            notifier,
            Arc::new(SimulatedBooker::new(rng(4))),
            config.max_booking_attempts,
        ))
    }

    /// Dispatch `stage` to every eligible contact.
    pub async fn run_stage(&self, campaign: &mut Campaign, stage: Stage) -> DispatchReport {
        self.dispatcher.send_stage(campaign, stage).await
    }

    /// Classify every contact awaiting a reply and apply the outcomes.
    ///
    /// All classifications are collected before anything is applied, so a
    /// classifier error leaves the campaign untouched. Bookings that failed in
    /// earlier cycles are retried first.
    pub async fn check_responses(
        &self,
        campaign: &mut Campaign,
    ) -> Result<ResponseCheckReport, ClassifierError> {
        let mut report = ResponseCheckReport::default();
        if campaign.is_archived() {
            return Ok(report);
        }

        let awaiting: Vec<_> = campaign.awaiting_reply().into_iter().cloned().collect();
        report.examined = awaiting.len();

        let mut replies: Vec<Reply> = Vec::new();
        for contact in &awaiting {
            if let Some(reply) = self.classifier.classify(contact).await? {
                replies.push(reply);
            }
        }

        report.cycle = campaign.begin_check_cycle();
        info!(
            campaign = %campaign.name,
            cycle = report.cycle,
            examined = report.examined,
            replies = replies.len(),
            classifier = self.classifier.name(),
            "Checking responses"
        );

        self.retry_pending_bookings(campaign, &mut report).await;

        for reply in replies {
            let email = reply.email.clone();
            let content = reply.content.clone();
            match campaign.apply_reply(reply) {
                Ok(None) => {
                    report.out_of_office += 1;
                    info!(email = %email, "Out-of-office reply, holding for this cycle");
                }
                Ok(Some(ContactStatus::Bounced)) => report.bounced += 1,
                Ok(Some(ContactStatus::Unsubscribed)) => report.unsubscribed += 1,
                Ok(Some(ContactStatus::RepliedNeutral)) => report.replied_neutral += 1,
                Ok(Some(ContactStatus::Interested)) => {
                    report.interested += 1;
                    info!(email = %email, "Prospect is interested");
                    self.notify_interest(campaign, &email, &content, &mut report).await;
                    self.try_book(campaign, &email, &mut report).await;
                }
                Ok(Some(other)) => {
                    warn!(email = %email, status = %other, "Unexpected status from reply");
                }
                Err(e) => {
                    warn!(email = %email, error = %e, "Reply rejected");
                    report.rejected.push(e);
                }
            }
        }

        info!(
            cycle = report.cycle,
            bounced = report.bounced,
            unsubscribed = report.unsubscribed,
            out_of_office = report.out_of_office,
            interested = report.interested,
            booked = report.meetings.len(),
            "Response check complete"
        );
        Ok(report)
    }

    /// Handle one job from the runner queue.
    pub async fn handle(&self, campaign: &mut Campaign, job: CampaignJob) -> JobOutcome {
        match job {
            CampaignJob::RunStage(stage) => {
                JobOutcome::Dispatched(self.run_stage(campaign, stage).await)
            }
            CampaignJob::CheckResponses => match self.check_responses(campaign).await {
                Ok(report) => JobOutcome::Checked(report),
                Err(e) => {
                    warn!(error = %e, "Response check aborted");
                    JobOutcome::CheckAborted(e)
                }
            },
            CampaignJob::Finish => JobOutcome::Finished(campaign.archive()),
        }
    }

    async fn notify_interest(
        &self,
        campaign: &Campaign,
        email: &str,
        reply_text: &str,
        report: &mut ResponseCheckReport,
    ) {
        let Some(contact) = campaign.contact(email) else {
            return;
        };
        match self.notifier.notify(&contact.summary(), reply_text).await {
            Ok(()) => report.notified += 1,
            Err(e) => warn!(
                email,
                notifier = self.notifier.name(),
                error = %e,
                "Notification failed"
            ),
        }
    }

    async fn retry_pending_bookings(
        &self,
        campaign: &mut Campaign,
        report: &mut ResponseCheckReport,
    ) {
        let pending: Vec<String> = campaign
            .pending_bookings()
            .into_iter()
            .filter(|c| c.booking_attempts < self.max_booking_attempts)
            .map(|c| c.email.clone())
            .collect();
        for email in pending {
            info!(email = %email, "Retrying meeting booking");
            self.try_book(campaign, &email, report).await;
        }
    }

    async fn try_book(
        &self,
        campaign: &mut Campaign,
        email: &str,
        report: &mut ResponseCheckReport,
    ) {
        match self.booker.book_meeting(email).await {
            Ok(meeting) => match campaign.mark_booked(email, &meeting.slot.id) {
                Ok(()) => report.meetings.push(meeting),
                Err(e) => {
                    warn!(email, error = %e, "Booked meeting could not be recorded");
                    report.rejected.push(e);
                }
            },
            Err(e) => {
                report.booking_failures += 1;
                match campaign.record_booking_failure(email) {
                    Ok(attempts) if attempts >= self.max_booking_attempts => {
                        error!(email, attempts, error = %e, "Booking attempts exhausted");
                    }
                    Ok(attempts) => {
                        warn!(email, attempts, error = %e, "Booking failed, will retry next check");
                    }
                    Err(e) => report.rejected.push(e),
                }
            }
        }
    }
}
