//! Replay processor: rebuilds aggregate state from the event store.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::{EventQuery, EventStore, EventStoreExt};
use futures_util::StreamExt;

use crate::Result;
use crate::state::AggregateState;
use crate::stats::{AggregateStats, TimelineEntry};

/// Reconstructs aggregate state, statistics and timelines by reading the
/// event store.
///
/// The processor holds no state of its own between calls; every operation
/// reads the store afresh, so two replays over the same log are identical.
pub struct EventProcessor<S: EventStore> {
    store: S,
}

impl<S: EventStore> EventProcessor<S> {
    /// Creates a new processor reading from the given event store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replays every event of an aggregate.
    ///
    /// An aggregate with no events yields the empty state, not an error.
    #[tracing::instrument(skip(self), fields(aggregate_id = %aggregate_id))]
    pub async fn replay(&self, aggregate_id: &AggregateId) -> Result<AggregateState> {
        let events = self.store.get_by_aggregate(aggregate_id, None).await?;
        let state = AggregateState::fold(aggregate_id.clone(), &events);

        metrics::counter!("projections_replays").increment(1);
        metrics::counter!("projections_events_replayed").increment(events.len() as u64);
        tracing::info!(events_applied = events.len(), "replay complete");

        Ok(state)
    }

    /// Replays the events of an aggregate with `timestamp <= cutoff`.
    #[tracing::instrument(skip(self), fields(aggregate_id = %aggregate_id))]
    pub async fn replay_until(
        &self,
        aggregate_id: &AggregateId,
        cutoff: DateTime<Utc>,
    ) -> Result<AggregateState> {
        let query = EventQuery::for_aggregate(aggregate_id.clone()).to_timestamp(cutoff);
        let events = self.store.query(query).await?;

        let mut state = AggregateState::fold(aggregate_id.clone(), &events);
        state.as_of = Some(cutoff);

        metrics::counter!("projections_replays").increment(1);
        metrics::counter!("projections_events_replayed").increment(events.len() as u64);
        tracing::info!(events_applied = events.len(), as_of = %cutoff, "replay complete");

        Ok(state)
    }

    /// Materialized view of `trade:<trade_id>`.
    pub async fn get_trade_projection(
        &self,
        trade_id: impl std::fmt::Display,
    ) -> Result<AggregateState> {
        self.replay(&AggregateId::trade(trade_id)).await
    }

    /// Materialized view of `cache:<cache_key>`.
    pub async fn get_cache_projection(&self, cache_key: &str) -> Result<AggregateState> {
        self.replay(&AggregateId::cache(cache_key)).await
    }

    /// Counts every stored event in a single pass over the store.
    #[tracing::instrument(skip(self))]
    pub async fn get_aggregate_stats(&self) -> Result<AggregateStats> {
        let mut stream = self.store.stream_all().await?;
        let mut stats = AggregateStats::default();

        while let Some(result) = stream.next().await {
            stats.record(&result?);
        }

        tracing::debug!(total_events = stats.total_events, "stats computed");
        Ok(stats)
    }

    /// Lists the events of an aggregate in stream order.
    #[tracing::instrument(skip(self), fields(aggregate_id = %aggregate_id))]
    pub async fn get_event_timeline(
        &self,
        aggregate_id: &AggregateId,
    ) -> Result<Vec<TimelineEntry>> {
        let events = self.store.get_by_aggregate(aggregate_id, None).await?;
        Ok(events.iter().map(TimelineEntry::from).collect())
    }
}
