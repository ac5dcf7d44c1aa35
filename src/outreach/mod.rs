//! Outbound side of a campaign: templates, the mailer seam and stage dispatch.

pub mod dispatcher;
pub mod mailer;
pub mod templates;

pub use dispatcher::{DispatchReport, OutreachDispatcher};
pub use mailer::{Mailer, OutboundEmail, SimulatedMailer};
pub use templates::TemplateRegistry;
