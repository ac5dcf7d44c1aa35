//! Renders and sends one stage to every eligible contact.
//!
//! Individual failures (render, send, campaign rejection) are recorded in the
//! [`DispatchReport`] and never fail the batch.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::campaign::contact::Contact;
use crate::campaign::{Campaign, Stage};
use crate::error::{CampaignError, DispatchError, TemplateError};
use crate::leads::enrich::Enricher;
use crate::outreach::mailer::{Mailer, OutboundEmail};
use crate::outreach::templates::TemplateRegistry;

/// Send attempts per contact per call.
const SEND_ATTEMPTS: u32 = 2;

/// A delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub email: String,
    pub ack_id: String,
}

/// Why an eligible contact was not sent to.
#[derive(Debug)]
pub enum SkipReason {
    Render(TemplateError),
    Dispatch(DispatchError),
    Rejected(CampaignError),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Render(e) => write!(f, "{e}"),
            Self::Dispatch(e) => write!(f, "{e}"),
            Self::Rejected(e) => write!(f, "{e}"),
        }
    }
}

#[derive(Debug)]
pub struct SkippedContact {
    pub email: String,
    pub reason: SkipReason,
}

/// Outcome of one `send_stage` call.
#[derive(Debug)]
pub struct DispatchReport {
    pub stage: Stage,
    pub delivered: Vec<Delivery>,
    pub skipped: Vec<SkippedContact>,
}

impl DispatchReport {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            delivered: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Acknowledgement id for `email`, if it was delivered.
    pub fn ack_for(&self, email: &str) -> Option<&str> {
        self.delivered
            .iter()
            .find(|d| d.email.eq_ignore_ascii_case(email))
            .map(|d| d.ack_id.as_str())
    }

    fn skip(&mut self, email: &str, reason: SkipReason) {
        warn!(stage = %self.stage, email, reason = %reason, "Contact skipped");
        self.skipped.push(SkippedContact {
            email: email.to_string(),
            reason,
        });
    }
}

pub struct OutreachDispatcher {
    mailer: Arc<dyn Mailer>,
    templates: TemplateRegistry,
    enricher: Arc<dyn Enricher>,
}

impl OutreachDispatcher {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        templates: TemplateRegistry,
        enricher: Arc<dyn Enricher>,
    ) -> Self {
        Self {
            mailer,
            templates,
            enricher,
        }
    }

    /// Send `stage` to every contact currently eligible for it.
    ///
    /// Re-invoking for the same stage only reaches contacts that have no
    /// event for it yet.
    pub async fn send_stage(&self, campaign: &mut Campaign, stage: Stage) -> DispatchReport {
        if campaign.is_archived() {
            debug!(campaign = %campaign.name, %stage, "Campaign archived, nothing to send");
            return DispatchReport::new(stage);
        }
        if stage == Stage::Personalized {
            self.enrich_eligible(campaign, stage).await;
        }

        let recipients: Vec<Contact> = campaign.eligible_for(stage).into_iter().cloned().collect();
        info!(
            campaign = %campaign.name,
            %stage,
            recipients = recipients.len(),
            "Dispatching stage"
        );

        let mut report = DispatchReport::new(stage);
        for contact in &recipients {
            let rendered = match self.templates.render(stage.template_id(), contact) {
                Ok(text) => text,
                Err(e) => {
                    report.skip(&contact.email, SkipReason::Render(e));
                    continue;
                }
            };
            let email = OutboundEmail::for_stage(&contact.email, stage, &rendered);

            let ack_id = match self.send_with_retry(&email).await {
                Ok(ack) => ack,
                Err(e) => {
                    report.skip(&contact.email, SkipReason::Dispatch(e));
                    continue;
                }
            };

            match campaign.record_outreach(&contact.email, stage, ack_id.as_str()) {
                Ok(_) => report.delivered.push(Delivery {
                    email: contact.email.clone(),
                    ack_id,
                }),
                Err(e) => report.skip(&contact.email, SkipReason::Rejected(e)),
            }
        }

        campaign.advance_cursor(stage);
        info!(
            campaign = %campaign.name,
            %stage,
            delivered = report.delivered.len(),
            skipped = report.skipped.len(),
            "Stage dispatch complete"
        );
        report
    }

    async fn send_with_retry(&self, email: &OutboundEmail) -> Result<String, DispatchError> {
        let mut attempt = 1;
        loop {
            match self.mailer.send(email).await {
                Ok(ack) => {
                    debug!(
                        to = %email.to,
                        mailer = self.mailer.name(),
                        attempt,
                        ack = %ack,
                        "Email sent"
                    );
                    return Ok(ack);
                }
                Err(e) if attempt < SEND_ATTEMPTS => {
                    warn!(to = %email.to, attempt, error = %e, "Send failed, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Enrich the stage's recipients in place. Falls back to the existing
    /// profiles when the enricher is unavailable.
    async fn enrich_eligible(&self, campaign: &mut Campaign, stage: Stage) {
        let targets: Vec<Contact> = campaign.eligible_for(stage).into_iter().cloned().collect();
        if targets.is_empty() {
            return;
        }
        match self.enricher.enrich(targets).await {
            Ok(enriched) => {
                let updated = campaign.apply_enrichment(enriched);
                debug!(enricher = self.enricher.name(), updated, "Contacts enriched");
            }
            Err(e) => {
                warn!(
                    enricher = self.enricher.name(),
                    error = %e,
                    "Enrichment unavailable, using existing profiles"
                );
            }
        }
    }
}
