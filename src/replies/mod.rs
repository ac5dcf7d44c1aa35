//! Inbound side of a campaign: classified replies and their sentiment.

pub mod classifier;
pub mod sentiment;
pub mod types;

pub use classifier::{ResponseClassifier, SimulatedClassifier};
pub use types::{BounceReason, Reply, ReplyStatus};
