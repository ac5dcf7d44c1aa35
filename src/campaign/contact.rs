//! Contact records and the per-contact status machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outreach status of a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    /// Ingested, nothing sent yet.
    New,
    /// Initial email delivered, no classified reply yet.
    Contacted,
    Bounced,
    Unsubscribed,
    /// Replied without interest.
    RepliedNeutral,
    Interested,
    MeetingBooked,
}

impl ContactStatus {
    /// Check if this status allows transitioning to another status.
    pub fn can_transition_to(&self, target: ContactStatus) -> bool {
        use ContactStatus::*;

        matches!(
            (self, target),
            (New, Contacted)
                | (Contacted, Bounced)
                | (Contacted, Unsubscribed)
                | (Contacted, RepliedNeutral)
                | (Contacted, Interested)
                | (Interested, MeetingBooked)
        )
    }

    /// No further stage emails go to a contact in this status.
    pub fn is_closed_for_outreach(&self) -> bool {
        !matches!(self, Self::New | Self::Contacted)
    }

    /// Bounced and unsubscribed contacts must never be emailed again.
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::Bounced | Self::Unsubscribed)
    }

    /// Replied with intent: neutral, interested or booked.
    pub fn has_replied(&self) -> bool {
        matches!(self, Self::RepliedNeutral | Self::Interested | Self::MeetingBooked)
    }
}

impl std::fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Bounced => "bounced",
            Self::Unsubscribed => "unsubscribed",
            Self::RepliedNeutral => "replied_neutral",
            Self::Interested => "interested",
            Self::MeetingBooked => "meeting_booked",
        };
        write!(f, "{s}")
    }
}

/// A prospect and everything the campaign knows about them.
///
/// Identity and profile fields come from the lead source (and optionally the
/// enricher). `status` and the bookkeeping fields below it are only written by
/// [`crate::campaign::Campaign`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub role: String,
    pub company: String,
    /// Unique key, compared case-insensitively.
    pub email: String,
    pub industry: String,
    pub company_size: Option<String>,
    pub website: Option<String>,
    pub linkedin_url: Option<String>,
    /// Topics the contact engages with. Empty until enriched.
    pub interests: Vec<String>,
    /// Short phrase about the company, e.g. "recently expanded operations".
    pub recent_news: Option<String>,
    pub last_activity: Option<String>,

    pub status: ContactStatus,
    /// Response-check cycle in which an out-of-office reply last arrived.
    pub out_of_office_cycle: Option<u32>,
    /// Failed booking attempts while `Interested`.
    pub booking_attempts: u32,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// Create a new contact in status `New`.
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        company: impl Into<String>,
        email: impl Into<String>,
        industry: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            company: company.into(),
            email: email.into(),
            industry: industry.into(),
            company_size: None,
            website: None,
            linkedin_url: None,
            interests: Vec::new(),
            recent_news: None,
            last_activity: None,
            status: ContactStatus::New,
            out_of_office_cycle: None,
            booking_attempts: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn with_company_size(mut self, size: impl Into<String>) -> Self {
        self.company_size = Some(size.into());
        self
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    pub fn with_linkedin(mut self, url: impl Into<String>) -> Self {
        self.linkedin_url = Some(url.into());
        self
    }

    pub fn with_interests(mut self, interests: Vec<String>) -> Self {
        self.interests = interests;
        self
    }

    pub fn with_recent_news(mut self, news: impl Into<String>) -> Self {
        self.recent_news = Some(news.into());
        self
    }

    /// Normalized email used as the identity key.
    pub fn key(&self) -> String {
        normalize_email(&self.email)
    }

    /// Short view handed to the notifier.
    pub fn summary(&self) -> ContactSummary {
        ContactSummary {
            name: self.name.clone(),
            role: self.role.clone(),
            company: self.company.clone(),
            email: self.email.clone(),
        }
    }
}

/// Identity fields of a contact, as shown in notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSummary {
    pub name: String,
    pub role: String,
    pub company: String,
    pub email: String,
}

/// Lowercased, trimmed email.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
