//! Outreach Agent: simulated outbound sales campaigns.

pub mod campaign;
pub mod config;
pub mod error;
pub mod integrations;
pub mod leads;
pub mod outreach;
pub mod replies;
