//! Contact enrichment with interests, company news and recent activity.
//!
//! Optional capability: callers fall back to the unenriched contacts when the
//! enricher errors, and [`NoopEnricher`] is wired in when it is disabled.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::campaign::contact::Contact;
use crate::error::IntegrationError;

const INTERESTS: &[&str] = &[
    "AI and automation",
    "Digital transformation",
    "Industry 4.0",
    "Sustainable manufacturing",
    "Supply chain optimization",
    "Cloud infrastructure",
    "Data analytics",
    "IoT implementation",
];

const COMPANY_NEWS: &[&str] = &[
    "recently expanded operations",
    "announced a sustainability initiative",
    "is implementing a new ERP system",
    "acquired a smaller competitor",
    "launched a digital transformation project",
    "hired new technology leadership",
    "reported strong quarterly results",
];

/// Augments contact profiles.
#[async_trait]
pub trait Enricher: Send + Sync {
    fn name(&self) -> &str;

    async fn enrich(&self, contacts: Vec<Contact>) -> Result<Vec<Contact>, IntegrationError>;
}

/// Enricher used when enrichment is disabled. Returns contacts unchanged.
pub struct NoopEnricher;

#[async_trait]
impl Enricher for NoopEnricher {
    fn name(&self) -> &str {
        "none"
    }

    async fn enrich(&self, contacts: Vec<Contact>) -> Result<Vec<Contact>, IntegrationError> {
        Ok(contacts)
    }
}

/// Fabricates plausible enrichment data from fixed pools.
pub struct SimulatedEnricher {
    rng: Mutex<StdRng>,
}

impl SimulatedEnricher {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }
}

#[async_trait]
impl Enricher for SimulatedEnricher {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn enrich(&self, mut contacts: Vec<Contact>) -> Result<Vec<Contact>, IntegrationError> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        for contact in &mut contacts {
            let count = rng.gen_range(1..=3);
            contact.interests = INTERESTS
                .choose_multiple(&mut *rng, count)
                .map(|s| s.to_string())
                .collect();
            contact.recent_news = COMPANY_NEWS.choose(&mut *rng).map(|s| s.to_string());
            let days_ago = rng.gen_range(1..=30);
            contact.last_activity = Some(format!("Posted on LinkedIn {days_ago} days ago"));
        }
        Ok(contacts)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn contacts() -> Vec<Contact> {
        vec![
            Contact::new("A", "CFO", "Acme", "a@acme.com", "Manufacturing"),
            Contact::new("B", "CFO", "Acme", "b@acme.com", "Manufacturing"),
        ]
    }

    #[tokio::test]
    async fn simulated_enricher_fills_profile() {
        let enricher = SimulatedEnricher::new(StdRng::seed_from_u64(7));
        let enriched = enricher.enrich(contacts()).await.unwrap();
        for contact in &enriched {
            assert!((1..=3).contains(&contact.interests.len()));
            assert!(contact.interests.iter().all(|i| INTERESTS.contains(&i.as_str())));
            assert!(contact.recent_news.is_some());
            assert!(contact.last_activity.as_deref().unwrap().starts_with("Posted on LinkedIn"));
        }
    }

    #[tokio::test]
    async fn simulated_enricher_is_seeded() {
        let a = SimulatedEnricher::new(StdRng::seed_from_u64(7))
            .enrich(contacts())
            .await
            .unwrap();
        let b = SimulatedEnricher::new(StdRng::seed_from_u64(7))
            .enrich(contacts())
            .await
            .unwrap();
        assert_eq!(a[0].interests, b[0].interests);
        assert_eq!(a[1].recent_news, b[1].recent_news);
    }

    #[tokio::test]
    async fn noop_enricher_leaves_contacts_alone() {
        let out = NoopEnricher.enrich(contacts()).await.unwrap();
        assert!(out.iter().all(|c| c.interests.is_empty() && c.recent_news.is_none()));
    }
}
