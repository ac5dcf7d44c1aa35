//! Error types for the outreach agent.

use crate::campaign::Stage;
use crate::campaign::contact::ContactStatus;

/// Top-level error type for the agent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Integration error: {0}")]
    Integration(#[from] IntegrationError),

    #[error("Campaign error: {0}")]
    Campaign(#[from] CampaignError),
}

/// Configuration-related errors. All of these are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse {key}: '{value}'")]
    Parse { key: String, value: String },

    #[error("No template registered for stage {0}")]
    MissingStageTemplate(Stage),
}

/// Template rendering errors.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Template {template} has unresolved placeholder '{field}'")]
    Render { template: String, field: String },
}

/// Outbound send failures.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Send to {email} failed: {reason}")]
    SendFailed { email: String, reason: String },
}

/// Response classifier errors.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Classification unavailable: {0}")]
    Unavailable(String),
}

/// Best-effort integration failures (notifier, booker, enrichment).
#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    #[error("Notification for {email} failed: {reason}")]
    NotifyFailed { email: String, reason: String },

    #[error("Booking for {email} failed: {reason}")]
    BookingFailed { email: String, reason: String },

    #[error("Enrichment unavailable: {0}")]
    EnrichmentUnavailable(String),
}

/// Campaign state machine errors.
#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    #[error("Unknown contact: {0}")]
    UnknownContact(String),

    #[error("Contact {email} cannot transition from {from} to {to}")]
    InvalidTransition {
        email: String,
        from: ContactStatus,
        to: ContactStatus,
    },

    #[error("Contact {email} already received the {stage} email")]
    DuplicateOutreach { email: String, stage: Stage },

    #[error("Contact {email} is {status} and cannot receive outreach")]
    OutreachBlocked { email: String, status: ContactStatus },
}

/// Result type alias for the agent.
pub type Result<T> = std::result::Result<T, Error>;
