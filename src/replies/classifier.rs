//! Response classification of contacted prospects.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::campaign::contact::Contact;
use crate::config::ClassifierRates;
use crate::error::{ClassifierError, ConfigError};
use crate::replies::sentiment;
use crate::replies::types::{BounceReason, Reply};

const OUT_OF_OFFICE_TEXT: &str = "I'm currently out of the office until next week with limited access to email. I'll respond to your message when I return.";

const INTERESTED_TEXTS: &[&str] = &[
    "Thanks for reaching out. This sounds interesting. I'd be happy to schedule a call next week to discuss further.",
    "Your email caught my attention. We've been looking into digital transformation recently. Let's set up a time to chat.",
    "I'm interested in learning more about your services. Can you send over some case studies from similar companies in our industry?",
];

const DECLINE_TEXTS: &[&str] = &[
    "Thanks, but we're not looking for these services at the moment.",
    "We've recently signed with another provider for this. Perhaps we can connect in the future.",
    "Please remove me from your list. This isn't relevant to our needs right now.",
];

/// Produces at most one classified reply per contact per check.
#[async_trait]
pub trait ResponseClassifier: Send + Sync {
    /// Classifier name for logs.
    fn name(&self) -> &str;

    /// `Ok(None)` means the contact has not responded.
    async fn classify(&self, contact: &Contact) -> Result<Option<Reply>, ClassifierError>;
}

/// Probabilistic classifier driven by [`ClassifierRates`].
///
/// Draws, in order: bounce, unsubscribe, reply; within a reply,
/// out-of-office, then interest for non-OOO replies.
pub struct SimulatedClassifier {
    rates: ClassifierRates,
    rng: Mutex<StdRng>,
}

impl SimulatedClassifier {
    /// Fails when any rate is not a probability in [0, 1].
    pub fn new(rates: ClassifierRates, rng: StdRng) -> Result<Self, ConfigError> {
        rates.validate()?;
        Ok(Self {
            rates,
            rng: Mutex::new(rng),
        })
    }

    fn draw(&self, email: &str) -> Option<Reply> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let rates = &self.rates;

        if rng.gen_bool(rates.bounce_rate) {
            let reason = *BounceReason::ALL
                .choose(&mut *rng)
                .unwrap_or(&BounceReason::InvalidEmail);
            return Some(Reply::bounced(email, reason));
        }
        if rng.gen_bool(rates.unsubscribe_rate) {
            return Some(Reply::unsubscribed(email));
        }
        if !rng.gen_bool(rates.reply_rate) {
            return None;
        }
        if rng.gen_bool(rates.ooo_rate) {
            return Some(Reply::out_of_office(email, OUT_OF_OFFICE_TEXT));
        }

        let interested = rng.gen_bool(rates.interest_rate);
        let pool = if interested { INTERESTED_TEXTS } else { DECLINE_TEXTS };
        let content = pool.choose(&mut *rng).copied().unwrap_or_default();
        let report = sentiment::analyze(content);
        Some(Reply::replied(email, content, interested).with_sentiment(report.overall))
    }
}

#[async_trait]
impl ResponseClassifier for SimulatedClassifier {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn classify(&self, contact: &Contact) -> Result<Option<Reply>, ClassifierError> {
        Ok(self.draw(&contact.email))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::campaign::contact::ContactStatus;
    use crate::config::RateOption;
    use crate::replies::sentiment::Sentiment;
    use crate::replies::types::ReplyStatus;

    fn contact() -> Contact {
        Contact::new("A", "CFO", "Acme", "a@acme.com", "Manufacturing")
    }

    fn rates(bounce: f64, unsub: f64, reply: f64, ooo: f64, interest: f64) -> ClassifierRates {
        ClassifierRates::default()
            .with(RateOption::BounceRate, bounce)
            .and_then(|r| r.with(RateOption::UnsubscribeRate, unsub))
            .and_then(|r| r.with(RateOption::ReplyRate, reply))
            .and_then(|r| r.with(RateOption::OooRate, ooo))
            .and_then(|r| r.with(RateOption::InterestRate, interest))
            .unwrap()
    }

    fn classifier(rates: ClassifierRates) -> SimulatedClassifier {
        SimulatedClassifier::new(rates, StdRng::seed_from_u64(42)).unwrap()
    }

    #[test]
    fn rates_outside_unit_interval_are_rejected() {
        let bad = ClassifierRates {
            bounce_rate: 1.5,
            ..ClassifierRates::default()
        };
        match SimulatedClassifier::new(bad, StdRng::seed_from_u64(42)) {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "bounce_rate"),
            Err(other) => panic!("Expected InvalidValue, got {:?}", other),
            Ok(_) => panic!("Expected bounce_rate 1.5 to be rejected"),
        }

        let nan = ClassifierRates {
            interest_rate: f64::NAN,
            ..ClassifierRates::default()
        };
        assert!(SimulatedClassifier::new(nan, StdRng::seed_from_u64(42)).is_err());
    }

    #[tokio::test]
    async fn certain_bounce() {
        let reply = classifier(rates(1.0, 1.0, 1.0, 0.0, 1.0))
            .classify(&contact())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(reply.status, ReplyStatus::Bounced { .. }));
        assert_eq!(reply.target_status(), Some(ContactStatus::Bounced));
    }

    #[tokio::test]
    async fn certain_unsubscribe() {
        let reply = classifier(rates(0.0, 1.0, 1.0, 0.0, 1.0))
            .classify(&contact())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.status, ReplyStatus::Unsubscribed);
    }

    #[tokio::test]
    async fn no_reply_at_zero_rates() {
        let c = classifier(rates(0.0, 0.0, 0.0, 0.0, 0.0));
        for _ in 0..50 {
            assert!(c.classify(&contact()).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn out_of_office_is_never_interested() {
        let reply = classifier(rates(0.0, 0.0, 1.0, 1.0, 1.0))
            .classify(&contact())
            .await
            .unwrap()
            .unwrap();
        assert!(reply.is_out_of_office);
        assert!(!reply.is_interested);
        assert!(reply.sentiment.is_none());
        assert_eq!(reply.target_status(), None);
    }

    #[tokio::test]
    async fn interested_reply_is_never_negative() {
        let reply = classifier(rates(0.0, 0.0, 1.0, 0.0, 1.0))
            .classify(&contact())
            .await
            .unwrap()
            .unwrap();
        assert!(reply.is_interested);
        assert!(INTERESTED_TEXTS.contains(&reply.content.as_str()));
        assert!(reply.sentiment.is_some());
        assert_ne!(reply.sentiment, Some(Sentiment::Negative));
    }

    #[tokio::test]
    async fn declined_reply_is_neutral_status() {
        let reply = classifier(rates(0.0, 0.0, 1.0, 0.0, 0.0))
            .classify(&contact())
            .await
            .unwrap()
            .unwrap();
        assert!(!reply.is_interested);
        assert!(DECLINE_TEXTS.contains(&reply.content.as_str()));
        assert_eq!(reply.target_status(), Some(ContactStatus::RepliedNeutral));
    }

    #[tokio::test]
    async fn same_seed_same_outcomes() {
        let a = classifier(ClassifierRates::default());
        let b = classifier(ClassifierRates::default());
        for _ in 0..100 {
            let x = a.classify(&contact()).await.unwrap();
            let y = b.classify(&contact()).await.unwrap();
            assert_eq!(x.map(|r| (r.status, r.content)), y.map(|r| (r.status, r.content)));
        }
    }
}
