//! Mailer seam. The only place outbound email leaves the core.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::campaign::Stage;
use crate::config::check_probability;
use crate::error::{ConfigError, DispatchError};

/// Delivery priority hint for the CRM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Normal,
    High,
}

/// A rendered email ready to send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub to: String,
    pub stage: Stage,
    pub campaign_id: String,
    /// Set for follow-up stages so replies land in one thread.
    pub thread_id: Option<String>,
    pub priority: Priority,
    pub subject: Option<String>,
    pub body: String,
}

impl OutboundEmail {
    /// Build the outbound email for `stage` from rendered template text.
    pub fn for_stage(to: &str, stage: Stage, rendered: &str) -> Self {
        let (subject, body) = crate::outreach::templates::split_subject(rendered);
        let thread_id = match stage {
            Stage::Initial => None,
            Stage::Followup | Stage::Personalized => Some(thread_id_for(to)),
        };
        let priority = match stage {
            Stage::Personalized => Priority::High,
            Stage::Initial | Stage::Followup => Priority::Normal,
        };
        Self {
            to: to.to_string(),
            stage,
            campaign_id: stage.campaign_id().to_string(),
            thread_id,
            priority,
            subject: subject.map(String::from),
            body: body.to_string(),
        }
    }
}

/// Stable thread id for a recipient.
pub fn thread_id_for(email: &str) -> String {
    format!("thread_{}", email.replace('@', "_at_"))
}

/// Sends one email and returns the delivery acknowledgement id.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Mailer name for logs.
    fn name(&self) -> &str;

    async fn send(&self, email: &OutboundEmail) -> Result<String, DispatchError>;
}

/// CRM stand-in: acknowledges with a random id, failing with a fixed probability.
pub struct SimulatedMailer {
    failure_rate: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedMailer {
    /// Fails when `failure_rate` is not a probability in [0, 1].
    pub fn new(failure_rate: f64, rng: StdRng) -> Result<Self, ConfigError> {
        check_probability("send_failure_rate", failure_rate)?;
        Ok(Self {
            failure_rate,
            rng: Mutex::new(rng),
        })
    }
}

#[async_trait]
impl Mailer for SimulatedMailer {
    fn name(&self) -> &str {
        "simulated-crm"
    }

    async fn send(&self, email: &OutboundEmail) -> Result<String, DispatchError> {
        let outcome = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            if rng.gen_bool(self.failure_rate) {
                None
            } else {
                Some(rng.gen_range(10_000..100_000u32))
            }
        };

        match outcome {
            Some(id) => {
                debug!(to = %email.to, campaign_id = %email.campaign_id, id, "CRM accepted email");
                Ok(format!("crm-{id}"))
            }
            None => Err(DispatchError::SendFailed {
                email: email.to.clone(),
                reason: "simulated CRM rejection".into(),
            }),
        }
    }
}
