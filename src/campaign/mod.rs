//! Campaign state: contacts, the outreach event log, and the status machine.
//!
//! A single [`Campaign`] is owned by whoever drives the run and passed by
//! `&mut` into each component. It is the only writer of contact status.

pub mod contact;
pub mod engine;
pub mod runner;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::CampaignError;
use crate::replies::types::Reply;
use contact::{Contact, ContactStatus, normalize_email};

/// Cap on the status transition history.
const MAX_TRANSITIONS: usize = 10_000;

// ── Stage ───────────────────────────────────────────────────────────

/// Outreach phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Initial,
    Followup,
    Personalized,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Initial, Stage::Followup, Stage::Personalized];

    /// The stage after this one, if any.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Self::Initial => Some(Self::Followup),
            Self::Followup => Some(Self::Personalized),
            Self::Personalized => None,
        }
    }

    /// Id of the template rendered for this stage.
    pub fn template_id(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Followup => "followup",
            Self::Personalized => "personalized",
        }
    }

    /// CRM campaign identifier attached to outbound emails.
    pub fn campaign_id(&self) -> &'static str {
        match self {
            Self::Initial => "initial_outreach",
            Self::Followup => "followup_outreach",
            Self::Personalized => "personalized_outreach",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.template_id())
    }
}

// ── Records ─────────────────────────────────────────────────────────

/// One message sent to one contact at one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachEvent {
    pub id: Uuid,
    pub email: String,
    pub stage: Stage,
    /// Acknowledgement id returned by the mailer.
    pub ack_id: String,
    pub sent_at: DateTime<Utc>,
}

/// A status change of one contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransition {
    pub email: String,
    pub from: ContactStatus,
    pub to: ContactStatus,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Why a contact is or isn't in a stage's send list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    /// Status rules the contact out of this stage.
    Ineligible(ContactStatus),
    AlreadySent,
    /// Out-of-office reply in the latest response check.
    OutOfOffice,
}

/// Aggregate counts, always derived from contact status and the event log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub total: usize,
    /// Outreach events recorded across all stages.
    pub sent: usize,
    pub bounced: usize,
    pub unsubscribed: usize,
    /// Contacts that replied with intent (neutral, interested or booked).
    pub replied: usize,
    /// Contacts that became interested (including those since booked).
    pub interested: usize,
    pub booked: usize,
}

impl std::fmt::Display for CampaignSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Total contacts: {}", self.total)?;
        writeln!(f, "Emails sent: {}", self.sent)?;
        writeln!(f, "Bounced emails: {}", self.bounced)?;
        writeln!(f, "Unsubscribed: {}", self.unsubscribed)?;
        writeln!(f, "Replied: {}", self.replied)?;
        writeln!(f, "Interested: {}", self.interested)?;
        write!(f, "Meetings booked: {}", self.booked)
    }
}

// ── Campaign ────────────────────────────────────────────────────────

/// The one campaign of a run.
#[derive(Debug, Clone, Serialize)]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
    contacts: Vec<Contact>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    events: Vec<OutreachEvent>,
    #[serde(skip)]
    sent: HashSet<(String, Stage)>,
    replies: Vec<Reply>,
    transitions: Vec<StatusTransition>,
    /// Last stage dispatched.
    stage_cursor: Option<Stage>,
    /// Number of response checks started so far.
    check_cycle: u32,
}

impl Campaign {
    /// Create a campaign from ingested contacts. Later duplicates of an email
    /// are dropped; every contact starts out `New`.
    pub fn new(name: impl Into<String>, contacts: Vec<Contact>) -> Self {
        let mut campaign = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
            archived_at: None,
            contacts: Vec::with_capacity(contacts.len()),
            index: HashMap::new(),
            events: Vec::new(),
            sent: HashSet::new(),
            replies: Vec::new(),
            transitions: Vec::new(),
            stage_cursor: None,
            check_cycle: 0,
        };

        for mut contact in contacts {
            let key = contact.key();
            if campaign.index.contains_key(&key) {
                debug!(email = %contact.email, "Dropping duplicate contact");
                continue;
            }
            contact.status = ContactStatus::New;
            campaign.index.insert(key, campaign.contacts.len());
            campaign.contacts.push(contact);
        }

        info!(
            campaign = %campaign.name,
            contacts = campaign.contacts.len(),
            "Campaign created"
        );
        campaign
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn contact(&self, email: &str) -> Option<&Contact> {
        self.index
            .get(&normalize_email(email))
            .map(|&i| &self.contacts[i])
    }

    pub fn events(&self) -> &[OutreachEvent] {
        &self.events
    }

    pub fn replies(&self) -> &[Reply] {
        &self.replies
    }

    pub fn transitions(&self) -> &[StatusTransition] {
        &self.transitions
    }

    pub fn stage_cursor(&self) -> Option<Stage> {
        self.stage_cursor
    }

    pub fn check_cycle(&self) -> u32 {
        self.check_cycle
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    /// The stage the campaign would dispatch next.
    pub fn next_stage(&self) -> Option<Stage> {
        match self.stage_cursor {
            None => Some(Stage::Initial),
            Some(stage) => stage.next(),
        }
    }

    pub fn has_event(&self, email: &str, stage: Stage) -> bool {
        self.sent.contains(&(normalize_email(email), stage))
    }

    /// Whether `contact` belongs in the send list of `stage` right now.
    pub fn eligibility(&self, contact: &Contact, stage: Stage) -> Eligibility {
        let required = match stage {
            Stage::Initial => ContactStatus::New,
            Stage::Followup | Stage::Personalized => ContactStatus::Contacted,
        };
        if contact.status != required {
            return Eligibility::Ineligible(contact.status);
        }
        if self.has_event(&contact.email, stage) {
            return Eligibility::AlreadySent;
        }
        if self.check_cycle > 0 && contact.out_of_office_cycle == Some(self.check_cycle) {
            return Eligibility::OutOfOffice;
        }
        Eligibility::Eligible
    }

    /// Contacts that would receive `stage` if it were dispatched now.
    pub fn eligible_for(&self, stage: Stage) -> Vec<&Contact> {
        self.contacts
            .iter()
            .filter(|c| self.eligibility(c, stage) == Eligibility::Eligible)
            .collect()
    }

    /// Contacts awaiting a classified reply.
    pub fn awaiting_reply(&self) -> Vec<&Contact> {
        self.contacts
            .iter()
            .filter(|c| c.status == ContactStatus::Contacted)
            .collect()
    }

    /// Contacts that are interested but not yet booked.
    pub fn pending_bookings(&self) -> Vec<&Contact> {
        self.contacts
            .iter()
            .filter(|c| c.status == ContactStatus::Interested)
            .collect()
    }

    /// Record a delivered message. Moves `new → contacted` at the initial stage.
    pub fn record_outreach(
        &mut self,
        email: &str,
        stage: Stage,
        ack_id: impl Into<String>,
    ) -> Result<&OutreachEvent, CampaignError> {
        let idx = self.position(email)?;
        let key = self.contacts[idx].key();
        let status = self.contacts[idx].status;

        if status.is_closed_for_outreach() {
            return Err(CampaignError::OutreachBlocked {
                email: email.to_string(),
                status,
            });
        }
        if self.sent.contains(&(key.clone(), stage)) {
            return Err(CampaignError::DuplicateOutreach {
                email: email.to_string(),
                stage,
            });
        }
        match (stage, status) {
            (Stage::Initial, ContactStatus::New) => {
                self.transition(idx, ContactStatus::Contacted, format!("{stage} email sent"))?;
            }
            (Stage::Initial, _) | (_, ContactStatus::New) => {
                return Err(CampaignError::InvalidTransition {
                    email: email.to_string(),
                    from: status,
                    to: ContactStatus::Contacted,
                });
            }
            _ => {}
        }

        self.sent.insert((key, stage));
        self.events.push(OutreachEvent {
            id: Uuid::new_v4(),
            email: self.contacts[idx].email.clone(),
            stage,
            ack_id: ack_id.into(),
            sent_at: Utc::now(),
        });
        self.contacts[idx].updated_at = Utc::now();

        let last = self.events.len() - 1;
        Ok(&self.events[last])
    }

    /// Mark `stage` as dispatched.
    pub fn advance_cursor(&mut self, stage: Stage) {
        if self.stage_cursor.is_none_or(|current| stage > current) {
            self.stage_cursor = Some(stage);
        }
    }

    /// Start a new response-check cycle and return its number.
    pub fn begin_check_cycle(&mut self) -> u32 {
        self.check_cycle += 1;
        self.check_cycle
    }

    /// Apply a classified reply. Returns the new status, or `None` when the
    /// reply changed nothing (out-of-office).
    pub fn apply_reply(&mut self, reply: Reply) -> Result<Option<ContactStatus>, CampaignError> {
        let idx = self.position(&reply.email)?;

        let outcome = match reply.target_status() {
            None => {
                self.contacts[idx].out_of_office_cycle = Some(self.check_cycle);
                self.contacts[idx].updated_at = Utc::now();
                None
            }
            Some(target) => {
                let reason = match reply.status {
                    crate::replies::types::ReplyStatus::Bounced { reason } => {
                        format!("bounced: {reason}")
                    }
                    other => other.label().to_string(),
                };
                self.transition(idx, target, reason)?;
                Some(target)
            }
        };

        self.replies.push(reply);
        Ok(outcome)
    }

    /// `interested → meeting_booked`.
    pub fn mark_booked(&mut self, email: &str, slot: &str) -> Result<(), CampaignError> {
        let idx = self.position(email)?;
        self.transition(
            idx,
            ContactStatus::MeetingBooked,
            format!("meeting booked ({slot})"),
        )
    }

    /// Count a failed booking attempt. Returns the attempts made so far.
    pub fn record_booking_failure(&mut self, email: &str) -> Result<u32, CampaignError> {
        let idx = self.position(email)?;
        let contact = &mut self.contacts[idx];
        contact.booking_attempts += 1;
        contact.updated_at = Utc::now();
        Ok(contact.booking_attempts)
    }

    /// Copy enriched profile fields onto matching contacts. Status and
    /// bookkeeping are left alone; unknown emails are ignored.
    pub fn apply_enrichment(&mut self, enriched: Vec<Contact>) -> usize {
        let mut updated = 0;
        for incoming in enriched {
            let Some(&idx) = self.index.get(&incoming.key()) else {
                continue;
            };
            let contact = &mut self.contacts[idx];
            if !incoming.interests.is_empty() {
                contact.interests = incoming.interests;
            }
            if incoming.recent_news.is_some() {
                contact.recent_news = incoming.recent_news;
            }
            if incoming.last_activity.is_some() {
                contact.last_activity = incoming.last_activity;
            }
            contact.updated_at = Utc::now();
            updated += 1;
        }
        updated
    }

    /// Derived counts.
    pub fn summary(&self) -> CampaignSummary {
        let mut summary = CampaignSummary {
            total: self.contacts.len(),
            sent: self.events.len(),
            ..Default::default()
        };
        for contact in &self.contacts {
            if contact.status.has_replied() {
                summary.replied += 1;
            }
            match contact.status {
                ContactStatus::Bounced => summary.bounced += 1,
                ContactStatus::Unsubscribed => summary.unsubscribed += 1,
                ContactStatus::Interested => summary.interested += 1,
                ContactStatus::MeetingBooked => {
                    summary.interested += 1;
                    summary.booked += 1;
                }
                ContactStatus::New | ContactStatus::Contacted | ContactStatus::RepliedNeutral => {}
            }
        }
        summary
    }

    /// Close the campaign. Contacts are kept as they are.
    pub fn archive(&mut self) -> CampaignSummary {
        if self.archived_at.is_none() {
            self.archived_at = Some(Utc::now());
            info!(campaign = %self.name, "Campaign archived");
        }
        self.summary()
    }

    fn position(&self, email: &str) -> Result<usize, CampaignError> {
        self.index
            .get(&normalize_email(email))
            .copied()
            .ok_or_else(|| CampaignError::UnknownContact(email.to_string()))
    }

    fn transition(
        &mut self,
        idx: usize,
        to: ContactStatus,
        reason: String,
    ) -> Result<(), CampaignError> {
        let contact = &mut self.contacts[idx];
        let from = contact.status;
        if !from.can_transition_to(to) {
            return Err(CampaignError::InvalidTransition {
                email: contact.email.clone(),
                from,
                to,
            });
        }

        contact.status = to;
        contact.updated_at = Utc::now();
        debug!(email = %contact.email, %from, %to, "Contact status changed");

        self.transitions.push(StatusTransition {
            email: contact.email.clone(),
            from,
            to,
            timestamp: Utc::now(),
            reason: Some(reason),
        });
        if self.transitions.len() > MAX_TRANSITIONS {
            let drain_count = self.transitions.len() - MAX_TRANSITIONS;
            self.transitions.drain(..drain_count);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replies::types::BounceReason;

    fn contacts(n: usize) -> Vec<Contact> {
        (0..n)
            .map(|i| {
                Contact::new(
                    format!("Contact {i}"),
                    "CFO",
                    "Acme",
                    format!("c{i}@example.com"),
                    "Manufacturing",
                )
            })
            .collect()
    }

    #[test]
    fn new_campaign_dedups_emails() {
        let mut list = contacts(2);
        list.push(Contact::new("Dup", "CFO", "Other", "C0@Example.com", "Construction"));
        let campaign = Campaign::new("test", list);
        assert_eq!(campaign.contacts().len(), 2);
        assert_eq!(campaign.contact("c0@example.com").unwrap().company, "Acme");
    }

    #[test]
    fn initial_outreach_moves_new_to_contacted() {
        let mut campaign = Campaign::new("test", contacts(1));
        campaign
            .record_outreach("c0@example.com", Stage::Initial, "ack-1")
            .unwrap();
        let contact = campaign.contact("c0@example.com").unwrap();
        assert_eq!(contact.status, ContactStatus::Contacted);
        assert!(campaign.has_event("C0@example.com", Stage::Initial));
        assert_eq!(campaign.transitions().len(), 1);
    }

    #[test]
    fn duplicate_outreach_rejected() {
        let mut campaign = Campaign::new("test", contacts(1));
        campaign
            .record_outreach("c0@example.com", Stage::Initial, "ack-1")
            .unwrap();
        let err = campaign
            .record_outreach("c0@example.com", Stage::Initial, "ack-2")
            .unwrap_err();
        assert!(matches!(err, CampaignError::DuplicateOutreach { .. }));
        assert_eq!(campaign.events().len(), 1);
    }

    #[test]
    fn followup_requires_initial() {
        let mut campaign = Campaign::new("test", contacts(1));
        let err = campaign
            .record_outreach("c0@example.com", Stage::Followup, "ack-1")
            .unwrap_err();
        assert!(matches!(err, CampaignError::InvalidTransition { .. }));
    }

    #[test]
    fn bounced_contact_blocked() {
        let mut campaign = Campaign::new("test", contacts(1));
        campaign
            .record_outreach("c0@example.com", Stage::Initial, "ack-1")
            .unwrap();
        campaign.begin_check_cycle();
        campaign
            .apply_reply(Reply::bounced("c0@example.com", BounceReason::InvalidEmail))
            .unwrap();

        let err = campaign
            .record_outreach("c0@example.com", Stage::Followup, "ack-2")
            .unwrap_err();
        assert!(matches!(err, CampaignError::OutreachBlocked { .. }));
        assert!(campaign.eligible_for(Stage::Followup).is_empty());
    }

    #[test]
    fn reply_on_new_contact_is_invalid() {
        let mut campaign = Campaign::new("test", contacts(1));
        let err = campaign
            .apply_reply(Reply::replied("c0@example.com", "yes", true))
            .unwrap_err();
        assert!(matches!(err, CampaignError::InvalidTransition { .. }));
        assert!(campaign.replies().is_empty());
    }

    #[test]
    fn booking_requires_interest() {
        let mut campaign = Campaign::new("test", contacts(1));
        campaign
            .record_outreach("c0@example.com", Stage::Initial, "ack-1")
            .unwrap();
        assert!(campaign.mark_booked("c0@example.com", "slot").is_err());

        campaign
            .apply_reply(Reply::replied("c0@example.com", "let's talk", true))
            .unwrap();
        campaign.mark_booked("c0@example.com", "slot").unwrap();
        assert_eq!(
            campaign.contact("c0@example.com").unwrap().status,
            ContactStatus::MeetingBooked
        );
    }

    #[test]
    fn out_of_office_excludes_for_one_cycle() {
        let mut campaign = Campaign::new("test", contacts(1));
        campaign
            .record_outreach("c0@example.com", Stage::Initial, "ack-1")
            .unwrap();

        campaign.begin_check_cycle();
        let outcome = campaign
            .apply_reply(Reply::out_of_office("c0@example.com", "away"))
            .unwrap();
        assert_eq!(outcome, None);
        let contact = campaign.contact("c0@example.com").unwrap();
        assert_eq!(contact.status, ContactStatus::Contacted);
        assert_eq!(
            campaign.eligibility(contact, Stage::Followup),
            Eligibility::OutOfOffice
        );

        campaign.begin_check_cycle();
        assert_eq!(campaign.eligible_for(Stage::Followup).len(), 1);
    }

    #[test]
    fn unknown_contact_errors() {
        let mut campaign = Campaign::new("test", contacts(1));
        assert!(matches!(
            campaign.record_outreach("ghost@example.com", Stage::Initial, "x"),
            Err(CampaignError::UnknownContact(_))
        ));
    }

    #[test]
    fn summary_matches_statuses() {
        let mut campaign = Campaign::new("test", contacts(4));
        for i in 0..4 {
            campaign
                .record_outreach(&format!("c{i}@example.com"), Stage::Initial, "ack")
                .unwrap();
        }
        campaign.begin_check_cycle();
        campaign
            .apply_reply(Reply::bounced("c0@example.com", BounceReason::MailboxFull))
            .unwrap();
        campaign.apply_reply(Reply::unsubscribed("c1@example.com")).unwrap();
        campaign
            .apply_reply(Reply::replied("c2@example.com", "sure", true))
            .unwrap();
        campaign.mark_booked("c2@example.com", "slot").unwrap();

        let summary = campaign.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.sent, 4);
        assert_eq!(summary.bounced, 1);
        assert_eq!(summary.unsubscribed, 1);
        assert_eq!(summary.replied, 1);
        assert_eq!(summary.interested, 1);
        assert_eq!(summary.booked, 1);
    }

    #[test]
    fn cursor_only_moves_forward() {
        let mut campaign = Campaign::new("test", contacts(1));
        assert_eq!(campaign.next_stage(), Some(Stage::Initial));
        campaign.advance_cursor(Stage::Followup);
        campaign.advance_cursor(Stage::Initial);
        assert_eq!(campaign.stage_cursor(), Some(Stage::Followup));
        assert_eq!(campaign.next_stage(), Some(Stage::Personalized));
        campaign.advance_cursor(Stage::Personalized);
        assert_eq!(campaign.next_stage(), None);
    }

    #[test]
    fn enrichment_updates_profile_only() {
        let mut campaign = Campaign::new("test", contacts(1));
        let enriched = Contact::new("X", "X", "X", "c0@example.com", "X")
            .with_interests(vec!["Industry 4.0".into()])
            .with_recent_news("acquired a smaller competitor");
        assert_eq!(campaign.apply_enrichment(vec![enriched]), 1);

        let contact = campaign.contact("c0@example.com").unwrap();
        assert_eq!(contact.name, "Contact 0");
        assert_eq!(contact.interests, vec!["Industry 4.0"]);
        assert_eq!(contact.status, ContactStatus::New);
    }

    #[test]
    fn archive_is_idempotent() {
        let mut campaign = Campaign::new("test", contacts(2));
        campaign.archive();
        let first = campaign.archived_at;
        campaign.archive();
        assert_eq!(campaign.archived_at, first);
        assert_eq!(campaign.contacts().len(), 2);
    }
}
