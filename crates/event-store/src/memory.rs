use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    Event, EventId, EventQuery, Result,
    store::{AppendOutcome, EventStore, EventStream, ResetStore},
};

#[derive(Default)]
struct Log {
    /// Events in append order.
    events: Vec<Event>,
    /// Position of each event in `events`.
    by_id: HashMap<EventId, usize>,
}

/// In-memory event store implementation.
///
/// Cloning the store clones the handle; all clones share one log. Suitable
/// for tests and single-process deployments that do not need durability
/// across restarts.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    log: Arc<RwLock<Log>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters and orders a copy of the log. The sort is stable, so events
    /// with equal timestamps keep their append order.
    fn select(events: &[Event], query: &EventQuery) -> Vec<Event> {
        let mut selected: Vec<Event> = events
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();
        selected.sort_by_key(|e| e.timestamp);

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        selected.into_iter().skip(offset).take(limit).collect()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: Event) -> Result<AppendOutcome> {
        let mut log = self.log.write().await;

        if log.by_id.contains_key(&event.event_id) {
            tracing::warn!(event_id = %event.event_id, "event already recorded");
            metrics::counter!("event_store_duplicate_appends", "backend" => "memory").increment(1);
            return Ok(AppendOutcome::Duplicate);
        }

        tracing::debug!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            aggregate_id = %event.aggregate_id,
            "event appended"
        );
        let position = log.events.len();
        log.by_id.insert(event.event_id.clone(), position);
        log.events.push(event);
        metrics::counter!("event_store_events_appended", "backend" => "memory").increment(1);

        Ok(AppendOutcome::Appended)
    }

    async fn get(&self, event_id: &EventId) -> Result<Option<Event>> {
        let log = self.log.read().await;
        Ok(log
            .by_id
            .get(event_id)
            .and_then(|&position| log.events.get(position))
            .cloned())
    }

    async fn query(&self, query: EventQuery) -> Result<Vec<Event>> {
        let log = self.log.read().await;
        Ok(Self::select(&log.events, &query))
    }

    async fn stream_all(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events = {
            let log = self.log.read().await;
            Self::select(&log.events, &EventQuery::new())
        };

        let stream = stream::iter(events.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.log.read().await.events.len() as u64)
    }
}

#[async_trait]
impl ResetStore for InMemoryEventStore {
    async fn clear(&self) -> Result<()> {
        let mut log = self.log.write().await;
        let removed = log.events.len();
        log.events.clear();
        log.by_id.clear();
        tracing::warn!(removed, "all events cleared");
        Ok(())
    }
}
