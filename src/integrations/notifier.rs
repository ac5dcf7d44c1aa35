//! Sales-team notifications for interested prospects.

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::campaign::contact::ContactSummary;
use crate::error::IntegrationError;
use crate::replies::sentiment;

/// Default Slack-style channel for lead alerts.
pub const DEFAULT_CHANNEL: &str = "#sales-leads";

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(
        &self,
        contact: &ContactSummary,
        reply_text: &str,
    ) -> Result<(), IntegrationError>;
}

/// Builds the chat payload and writes it to the log instead of posting it.
pub struct LogNotifier {
    channel: String,
}

impl LogNotifier {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL)
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(
        &self,
        contact: &ContactSummary,
        reply_text: &str,
    ) -> Result<(), IntegrationError> {
        if self.channel.trim().is_empty() {
            return Err(IntegrationError::NotifyFailed {
                email: contact.email.clone(),
                reason: "no channel configured".into(),
            });
        }
        let payload = build_payload(&self.channel, contact, reply_text);
        info!(
            channel = %self.channel,
            email = %contact.email,
            payload = %payload,
            "Interested prospect notification"
        );
        Ok(())
    }
}

/// Notifier for runs with notifications switched off.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    fn name(&self) -> &str {
        "none"
    }

    async fn notify(&self, _: &ContactSummary, _: &str) -> Result<(), IntegrationError> {
        Ok(())
    }
}

/// Slack `chat.postMessage`-shaped body for an interested prospect.
pub fn build_payload(
    channel: &str,
    contact: &ContactSummary,
    reply_text: &str,
) -> serde_json::Value {
    let report = sentiment::analyze(reply_text);
    let text = format!(
        ":white_check_mark: *Interested prospect!*\n\
         *Name:* {}\n\
         *Company:* {}\n\
         *Role:* {}\n\
         *Email:* {}\n\
         *Sentiment:* {} ({:.2})\n\n\
         *Their response:*\n```\n{}\n```\n\n\
         *Next steps:* Schedule a call by replying to this thread with \"book call\".",
        contact.name,
        contact.company,
        contact.role,
        contact.email,
        report.overall,
        report.score,
        reply_text,
    );
    json!({
        "channel": channel,
        "text": text,
        "mrkdwn": true,
    })
}
