//! Meeting booking against a simulated calendar.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::error::IntegrationError;

const DAYS_AHEAD: i64 = 7;
const SLOT_HOURS: [u32; 4] = [9, 11, 13, 15];
const MEETING_MINUTES: i64 = 30;
const TAKEN_RATE: f64 = 0.3;
const INVITE_SUCCESS_RATE: f64 = 0.95;
const ORGANIZER: &str = "alex@mathersonandsons.com";

/// A bookable calendar slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A booked meeting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub email: String,
    pub slot: Slot,
    /// Calendar event body sent with the invite.
    pub event: serde_json::Value,
}

#[async_trait]
pub trait Booker: Send + Sync {
    fn name(&self) -> &str;

    async fn book_meeting(&self, email: &str) -> Result<Meeting, IntegrationError>;
}

/// Free weekday slots over the next week, with some already taken.
pub fn find_available_slots(now: DateTime<Utc>, rng: &mut impl Rng) -> Vec<Slot> {
    let mut slots = Vec::new();
    for day in 1..=DAYS_AHEAD {
        let date = (now + Duration::days(day)).date_naive();
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            continue;
        }
        for hour in SLOT_HOURS {
            let Some(start) = date.and_hms_opt(hour, 0, 0).map(|t| t.and_utc()) else {
                continue;
            };
            if rng.gen_bool(TAKEN_RATE) {
                continue;
            }
            slots.push(Slot {
                id: format!("slot_{}", start.format("%Y%m%d%H%M")),
                start,
                end: start + Duration::minutes(MEETING_MINUTES),
            });
        }
    }
    slots
}

/// Calendar event body for an introductory call.
pub fn calendar_event(email: &str, slot: &Slot) -> serde_json::Value {
    json!({
        "summary": "Matherson and Sons - Introductory Call",
        "location": "Zoom (link in description)",
        "description": "Meeting to discuss how Matherson and Sons can help with your digital transformation initiatives.",
        "start": { "dateTime": slot.start.to_rfc3339(), "timeZone": "Australia/Sydney" },
        "end": { "dateTime": slot.end.to_rfc3339(), "timeZone": "Australia/Sydney" },
        "attendees": [{ "email": email }, { "email": ORGANIZER }],
        "reminders": {
            "useDefault": false,
            "overrides": [
                { "method": "email", "minutes": 24 * 60 },
                { "method": "popup", "minutes": 10 },
            ],
        },
    })
}

pub struct SimulatedBooker {
    rng: Mutex<StdRng>,
}

impl SimulatedBooker {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }
}

#[async_trait]
impl Booker for SimulatedBooker {
    fn name(&self) -> &str {
        "simulated-calendar"
    }

    async fn book_meeting(&self, email: &str) -> Result<Meeting, IntegrationError> {
        let (slot, accepted) = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            let slots = find_available_slots(Utc::now(), &mut *rng);
            debug!(email, available = slots.len(), "Found calendar slots");
            let slot = slots.choose(&mut *rng).cloned();
            (slot, rng.gen_bool(INVITE_SUCCESS_RATE))
        };

        let slot = slot.ok_or_else(|| IntegrationError::BookingFailed {
            email: email.to_string(),
            reason: "no available slots".into(),
        })?;
        if !accepted {
            return Err(IntegrationError::BookingFailed {
                email: email.to_string(),
                reason: "calendar invite failed".into(),
            });
        }

        let event = calendar_event(email, &slot);
        info!(
            email,
            slot = %slot.id,
            start = %slot.start.format("%Y-%m-%d %H:%M"),
            "Meeting booked"
        );
        Ok(Meeting {
            email: email.to_string(),
            slot,
            event,
        })
    }
}
