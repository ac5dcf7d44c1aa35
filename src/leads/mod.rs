//! Lead discovery and profile enrichment.

pub mod enrich;
pub mod source;

pub use enrich::{Enricher, NoopEnricher, SimulatedEnricher};
pub use source::{LeadQuery, LeadSource, MockDirectory};
