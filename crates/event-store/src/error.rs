use thiserror::Error;

/// Errors that can occur when interacting with the event store.
///
/// A duplicate `event_id` is not an error; see
/// [`AppendOutcome::Duplicate`](crate::AppendOutcome::Duplicate).
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row, or an event about to be stored, does not fit the
    /// persisted event schema.
    #[error("Invalid event record {event_id}: {reason}")]
    InvalidRecord { event_id: String, reason: String },

    /// A batch append stopped on a storage failure. Events appended before
    /// the failure stay appended.
    #[error("Batch append interrupted after {appended} events: {source}")]
    BatchInterrupted {
        appended: usize,
        source: Box<EventStoreError>,
    },
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
