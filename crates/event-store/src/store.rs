use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_core::Stream;

use crate::{AggregateId, Event, EventId, EventQuery, EventStoreError, EventType, Result};

/// What happened to an appended event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The event is now durably recorded and visible to readers.
    Appended,
    /// An event with the same `event_id` was already recorded. The store is
    /// unchanged; callers may treat the event as already recorded.
    Duplicate,
}

impl AppendOutcome {
    /// Returns true if the event was newly recorded.
    pub fn is_appended(&self) -> bool {
        matches!(self, AppendOutcome::Appended)
    }
}

/// A stream of events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<Event>> + Send>>;

/// Core trait for event store implementations.
///
/// An event store is an append-only log of events. Reads are ordered
/// ascending by timestamp with ties broken by append order. All
/// implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends one event.
    ///
    /// The append is all-or-nothing. Once this returns
    /// [`AppendOutcome::Appended`] the event is visible to every subsequent
    /// read. An existing `event_id` yields [`AppendOutcome::Duplicate`] and
    /// leaves the stored event untouched.
    async fn append(&self, event: Event) -> Result<AppendOutcome>;

    /// Retrieves a single event by ID.
    async fn get(&self, event_id: &EventId) -> Result<Option<Event>>;

    /// Retrieves events matching a query, in stream order.
    async fn query(&self, query: EventQuery) -> Result<Vec<Event>>;

    /// Streams every event in the store, in stream order.
    async fn stream_all(&self) -> Result<EventStream>;

    /// Returns the total number of stored events.
    async fn count(&self) -> Result<u64>;
}

/// Extension trait providing convenience methods for event stores.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Appends each event independently and returns how many were newly
    /// recorded.
    ///
    /// Duplicates are skipped. A storage failure stops the batch with
    /// [`EventStoreError::BatchInterrupted`]; events appended before it are
    /// not rolled back.
    async fn append_many(&self, events: Vec<Event>) -> Result<usize> {
        let mut appended = 0;
        for event in events {
            match self.append(event).await {
                Ok(AppendOutcome::Appended) => appended += 1,
                Ok(AppendOutcome::Duplicate) => {}
                Err(source) => {
                    return Err(EventStoreError::BatchInterrupted {
                        appended,
                        source: Box::new(source),
                    });
                }
            }
        }
        Ok(appended)
    }

    /// Retrieves the stream of one aggregate, optionally only the tail at or
    /// after `since`.
    async fn get_by_aggregate(
        &self,
        aggregate_id: &AggregateId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Event>> {
        let mut query = EventQuery::for_aggregate(aggregate_id.clone());
        query.from_timestamp = since;
        self.query(query).await
    }

    /// Retrieves all events of one type.
    async fn get_by_type(&self, event_type: &EventType) -> Result<Vec<Event>> {
        self.query(EventQuery::for_event_type(event_type.clone()))
            .await
    }

    /// Retrieves every event, keeping only the earliest `limit` if given.
    async fn get_all(&self, limit: Option<usize>) -> Result<Vec<Event>> {
        let mut query = EventQuery::new();
        query.limit = limit;
        self.query(query).await
    }

    /// Checks if an aggregate has any events.
    async fn aggregate_exists(&self, aggregate_id: &AggregateId) -> Result<bool> {
        let query = EventQuery::for_aggregate(aggregate_id.clone()).limit(1);
        Ok(!self.query(query).await?.is_empty())
    }
}

// Blanket implementation for all EventStore implementations
impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Destructive reset of an event store.
///
/// Kept apart from [`EventStore`] so that request-serving code, which only
/// needs `EventStore`, cannot reach it. Intended for tests and environment
/// resets only.
#[async_trait]
pub trait ResetStore: EventStore {
    /// Irreversibly deletes every event.
    async fn clear(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{CacheEventKind, create_cache_event};
    use crate::memory::InMemoryEventStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Delegates to an in-memory store until the `fail_on`-th append.
    struct FlakyStore {
        inner: InMemoryEventStore,
        attempts: AtomicUsize,
        fail_on: usize,
    }

    impl FlakyStore {
        fn new(fail_on: usize) -> Self {
            Self {
                inner: InMemoryEventStore::new(),
                attempts: AtomicUsize::new(0),
                fail_on,
            }
        }
    }

    #[async_trait]
    impl EventStore for FlakyStore {
        async fn append(&self, event: Event) -> Result<AppendOutcome> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt == self.fail_on {
                return Err(EventStoreError::Database(sqlx::Error::PoolTimedOut));
            }
            self.inner.append(event).await
        }

        async fn get(&self, event_id: &EventId) -> Result<Option<Event>> {
            self.inner.get(event_id).await
        }

        async fn query(&self, query: EventQuery) -> Result<Vec<Event>> {
            self.inner.query(query).await
        }

        async fn stream_all(&self) -> Result<EventStream> {
            self.inner.stream_all().await
        }

        async fn count(&self) -> Result<u64> {
            self.inner.count().await
        }
    }

    #[tokio::test]
    async fn append_many_keeps_events_before_a_failure() {
        let store = FlakyStore::new(3);
        let events: Vec<_> = (0..5)
            .map(|i| create_cache_event(format!("k{i}"), CacheEventKind::Miss, "GET", Some(false)))
            .collect();
        let ids: Vec<_> = events.iter().map(|e| e.event_id.clone()).collect();

        match store.append_many(events).await {
            Err(EventStoreError::BatchInterrupted { appended, source }) => {
                assert_eq!(appended, 2);
                assert!(matches!(*source, EventStoreError::Database(_)));
            }
            other => panic!("expected BatchInterrupted, got {other:?}"),
        }

        assert_eq!(store.count().await.unwrap(), 2);
        for id in &ids[..2] {
            assert!(store.get(id).await.unwrap().is_some());
        }
        for id in &ids[2..] {
            assert!(store.get(id).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn append_many_counts_only_new_events() {
        let store = InMemoryEventStore::new();
        let event = create_cache_event("k", CacheEventKind::Hit, "GET", Some(true));
        store.append(event.clone()).await.unwrap();

        let fresh = create_cache_event("k", CacheEventKind::Hit, "GET", Some(true));
        assert_eq!(store.append_many(vec![event, fresh]).await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 2);
    }
}
