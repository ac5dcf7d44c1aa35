//! Keyword sentiment scoring for reply text.
//!
//! Counts fixed positive and negative phrases. Good enough to annotate
//! notifications; not a language model.

use serde::{Deserialize, Serialize};

const POSITIVE_PHRASES: &[&str] = &[
    "interested",
    "sounds good",
    "let's talk",
    "schedule",
    "call",
    "meet",
    "learn more",
    "tell me more",
    "happy to",
    "case studies",
];

const NEGATIVE_PHRASES: &[&str] = &[
    "not interested",
    "no thanks",
    "remove",
    "unsubscribe",
    "don't contact",
    "not relevant",
    "not looking",
    "no need",
];

/// Score above which a reply reads as positive (and below the negation, negative).
const POLARITY_THRESHOLD: f64 = 0.3;

/// Overall polarity of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        };
        write!(f, "{s}")
    }
}

/// Breakdown of a sentiment score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentReport {
    /// In [-1, 1].
    pub score: f64,
    pub overall: Sentiment,
    pub positive_hits: usize,
    pub negative_hits: usize,
}

/// Score `text` by phrase counts.
pub fn analyze(text: &str) -> SentimentReport {
    let lower = text.to_lowercase();
    let positive_hits = POSITIVE_PHRASES.iter().filter(|p| lower.contains(*p)).count();
    let negative_hits = NEGATIVE_PHRASES.iter().filter(|p| lower.contains(*p)).count();

    let total = positive_hits + negative_hits;
    let score = if total == 0 {
        0.0
    } else {
        (positive_hits as f64 - negative_hits as f64) / total as f64
    };

    let overall = if score > POLARITY_THRESHOLD {
        Sentiment::Positive
    } else if score < -POLARITY_THRESHOLD {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    };

    SentimentReport {
        score,
        overall,
        positive_hits,
        negative_hits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_reply() {
        let report = analyze("Thanks, I'd be happy to schedule a call next week.");
        assert_eq!(report.overall, Sentiment::Positive);
        assert_eq!(report.negative_hits, 0);
        assert!(report.positive_hits >= 3);
    }

    #[test]
    fn negative_reply() {
        let report = analyze("Please remove me from your list. This isn't relevant, no thanks.");
        assert_eq!(report.overall, Sentiment::Negative);
        assert!(report.score < 0.0);
    }

    #[test]
    fn no_phrases_is_neutral() {
        let report = analyze("Out of office until Monday.");
        assert_eq!(report.overall, Sentiment::Neutral);
        assert_eq!(report.score, 0.0);
    }

    #[test]
    fn mixed_reply_balances_out() {
        // "not interested" also contains "interested"
        let report = analyze("Not interested.");
        assert_eq!(report.positive_hits, 1);
        assert_eq!(report.negative_hits, 1);
        assert_eq!(report.overall, Sentiment::Neutral);
    }
}
