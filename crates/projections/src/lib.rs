//! Replay and materialized views over the trading event log.
//!
//! - [`EventProcessor`] folds an aggregate's events into an [`AggregateState`]
//! - [`AggregateStats`] summarizes the whole log in one pass
//! - [`TimelineEntry`] lists an aggregate's events in stream order

pub mod error;
pub mod processor;
pub mod state;
pub mod stats;

pub use error::{ProjectionError, Result};
pub use processor::EventProcessor;
pub use state::{AggregateState, CacheStats, Invalidation, Status};
pub use stats::{AggregateStats, TimelineEntry};
