//! Shared identifier types for the trading event log.

pub mod types;

pub use types::{AggregateId, AggregateKind};
