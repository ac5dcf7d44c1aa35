//! Classified inbound replies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::campaign::contact::ContactStatus;
use crate::replies::sentiment::Sentiment;

/// Why a message bounced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BounceReason {
    InvalidEmail,
    MailboxFull,
    DomainNotFound,
}

impl BounceReason {
    pub const ALL: [BounceReason; 3] = [
        BounceReason::InvalidEmail,
        BounceReason::MailboxFull,
        BounceReason::DomainNotFound,
    ];
}

impl std::fmt::Display for BounceReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InvalidEmail => "invalid_email",
            Self::MailboxFull => "mailbox_full",
            Self::DomainNotFound => "domain_not_found",
        };
        write!(f, "{s}")
    }
}

/// Delivery-level status of an inbound record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReplyStatus {
    Bounced { reason: BounceReason },
    Unsubscribed,
    Replied,
}

impl ReplyStatus {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Bounced { .. } => "bounced",
            Self::Unsubscribed => "unsubscribed",
            Self::Replied => "replied",
        }
    }
}

/// An immutable, classified inbound record for one contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub id: Uuid,
    pub email: String,
    #[serde(flatten)]
    pub status: ReplyStatus,
    /// Raw reply text. Empty for bounces and unsubscribes.
    pub content: String,
    pub is_out_of_office: bool,
    pub is_interested: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    pub received_at: DateTime<Utc>,
}

impl Reply {
    pub fn bounced(email: impl Into<String>, reason: BounceReason) -> Self {
        Self::build(email, ReplyStatus::Bounced { reason }, String::new(), false, false)
    }

    pub fn unsubscribed(email: impl Into<String>) -> Self {
        Self::build(email, ReplyStatus::Unsubscribed, String::new(), false, false)
    }

    pub fn out_of_office(email: impl Into<String>, content: impl Into<String>) -> Self {
        Self::build(email, ReplyStatus::Replied, content.into(), true, false)
    }

    /// A human reply, with or without interest.
    pub fn replied(
        email: impl Into<String>,
        content: impl Into<String>,
        is_interested: bool,
    ) -> Self {
        Self::build(email, ReplyStatus::Replied, content.into(), false, is_interested)
    }

    fn build(
        email: impl Into<String>,
        status: ReplyStatus,
        content: String,
        is_out_of_office: bool,
        is_interested: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            status,
            content,
            is_out_of_office,
            is_interested: is_interested && !is_out_of_office,
            sentiment: None,
            received_at: Utc::now(),
        }
    }

    pub fn with_sentiment(mut self, sentiment: Sentiment) -> Self {
        self.sentiment = Some(sentiment);
        self
    }

    /// Contact status this reply moves the contact to, if any.
    ///
    /// Out-of-office replies carry no intent and change nothing.
    pub fn target_status(&self) -> Option<ContactStatus> {
        match self.status {
            ReplyStatus::Bounced { .. } => Some(ContactStatus::Bounced),
            ReplyStatus::Unsubscribed => Some(ContactStatus::Unsubscribed),
            ReplyStatus::Replied if self.is_out_of_office => None,
            ReplyStatus::Replied if self.is_interested => Some(ContactStatus::Interested),
            ReplyStatus::Replied => Some(ContactStatus::RepliedNeutral),
        }
    }
}
