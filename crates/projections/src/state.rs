//! Materialized aggregate state built by folding an event stream.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::{Event, EventPayload, EventRecord, Side};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a materialized aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Initialized,
    Created,
    Executed,
    Cancelled,
}

/// Hit and miss counters of a cache aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// One `CACHE_INVALIDATED` fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invalidation {
    pub cache_key: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// State of one aggregate reconstructed from its events.
///
/// Built only by replay and never persisted. Optional fields are absent from
/// the serialized form until an event sets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateState {
    pub aggregate_id: AggregateId,
    /// Number of events applied.
    pub version: u64,
    pub status: Status,
    pub event_count: u64,
    /// Every applied event in its wire form, in stream order.
    pub events: Vec<EventRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    /// Cutoff of a point-in-time replay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_stats: Option<CacheStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_cache_key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invalidations: Vec<Invalidation>,

    /// Events with no state rule, kept in wire form.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown_events: Vec<EventRecord>,
}

impl AggregateState {
    /// The state of an aggregate before any event is applied.
    pub fn new(aggregate_id: AggregateId) -> Self {
        Self {
            aggregate_id,
            version: 0,
            status: Status::Initialized,
            event_count: 0,
            events: Vec::new(),
            last_updated: None,
            as_of: None,
            symbol: None,
            price: None,
            quantity: None,
            side: None,
            executed_price: None,
            executed_quantity: None,
            executed_at: None,
            cancelled_reason: None,
            cancelled_at: None,
            cache_stats: None,
            last_cache_key: None,
            invalidations: Vec::new(),
            unknown_events: Vec::new(),
        }
    }

    /// Folds `events`, in the order given, over the empty state.
    pub fn fold<'a>(
        aggregate_id: AggregateId,
        events: impl IntoIterator<Item = &'a Event>,
    ) -> Self {
        let mut state = Self::new(aggregate_id);
        for event in events {
            state.apply(event);
        }
        state
    }

    /// Returns true if no event has been applied.
    pub fn is_empty(&self) -> bool {
        self.event_count == 0
    }

    /// Applies one event. Never fails: the rule of each known type runs
    /// whatever shape its `data` has, and events without a rule are
    /// collected in `unknown_events`.
    pub fn apply(&mut self, event: &Event) {
        match event.payload() {
            EventPayload::TradeCreated(data) => {
                self.symbol = data.symbol;
                self.price = data.price;
                self.quantity = data.quantity;
                self.side = data.side;
                self.status = Status::Created;
            }
            EventPayload::TradeExecuted(data) => {
                self.status = Status::Executed;
                self.executed_price = data.price.or(self.price);
                self.executed_quantity = data.quantity.or(self.quantity);
                self.executed_at = Some(event.timestamp);
            }
            EventPayload::TradeCancelled(data) => {
                self.status = Status::Cancelled;
                self.cancelled_reason = data.reason;
                self.cancelled_at = Some(event.timestamp);
            }
            EventPayload::CacheHit(data) => {
                self.cache_stats.get_or_insert_default().hits += 1;
                self.last_cache_key = data.cache_key;
            }
            EventPayload::CacheMiss(data) => {
                self.cache_stats.get_or_insert_default().misses += 1;
                self.last_cache_key = data.cache_key;
            }
            EventPayload::CacheInvalidated(data) => {
                self.invalidations.push(Invalidation {
                    cache_key: data.cache_key,
                    timestamp: event.timestamp,
                });
            }
            EventPayload::SystemStartup(_)
            | EventPayload::SystemShutdown(_)
            | EventPayload::SystemError(_)
            | EventPayload::Unknown { .. } => {
                self.unknown_events.push(event.to_record());
            }
        }

        self.version += 1;
        self.event_count += 1;
        self.events.push(event.to_record());
        self.last_updated = Some(event.timestamp);
    }
}
