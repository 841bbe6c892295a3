//! Projection error types.

use thiserror::Error;

/// Errors that can occur while rebuilding state from the event log.
///
/// Folding itself never fails; every error comes from reading the store.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] event_store::EventStoreError),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
