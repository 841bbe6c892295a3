//! Store-wide statistics and per-aggregate timelines.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::{Event, EventId, EventType};
use serde::{Deserialize, Serialize};

/// Counts over every stored event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total_events: u64,
    pub events_by_type: BTreeMap<String, u64>,
    pub events_by_aggregate: BTreeMap<AggregateId, u64>,
    /// Timestamp of the first event in stream order; `None` on an empty store.
    pub first_event_time: Option<DateTime<Utc>>,
    /// Timestamp of the last event in stream order; `None` on an empty store.
    pub last_event_time: Option<DateTime<Utc>>,
}

impl AggregateStats {
    /// Counts one event. Events must be recorded in stream order.
    pub fn record(&mut self, event: &Event) {
        self.total_events += 1;
        *self
            .events_by_type
            .entry(event.event_type.to_string())
            .or_default() += 1;
        *self
            .events_by_aggregate
            .entry(event.aggregate_id.clone())
            .or_default() += 1;

        if self.first_event_time.is_none() {
            self.first_event_time = Some(event.timestamp);
        }
        self.last_event_time = Some(event.timestamp);
    }
}

/// One row of an aggregate's timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub event_id: EventId,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub version: u32,
}

impl From<&Event> for TimelineEntry {
    fn from(event: &Event) -> Self {
        Self {
            event_id: event.event_id.clone(),
            event_type: event.event_type.clone(),
            timestamp: event.timestamp,
            version: event.version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use event_store::{
        CacheEventKind, Event, Side, TradeEventKind, create_cache_event, create_trade_event,
    };

    fn trade(kind: TradeEventKind, status: &str) -> Event {
        create_trade_event("1", kind, "BTC/USD", 1.0, 1.0, Side::Buy, status)
    }

    #[test]
    fn record_counts_by_type_and_aggregate() {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap();
        let events = [
            trade(TradeEventKind::Created, "CREATED").with_timestamp(t0),
            create_cache_event("k", CacheEventKind::Hit, "GET", Some(true))
                .with_timestamp(t0 + Duration::seconds(1)),
            trade(TradeEventKind::Executed, "EXECUTED").with_timestamp(t0 + Duration::seconds(2)),
        ];

        let mut stats = AggregateStats::default();
        for event in &events {
            stats.record(event);
        }

        assert_eq!(stats.total_events, 3);
        assert_eq!(stats.events_by_type["TRADE_CREATED"], 1);
        assert_eq!(stats.events_by_type["CACHE_HIT"], 1);
        assert_eq!(stats.events_by_aggregate[&AggregateId::trade("1")], 2);
        assert_eq!(stats.first_event_time, Some(t0));
        assert_eq!(stats.last_event_time, Some(t0 + Duration::seconds(2)));
    }

    #[test]
    fn empty_stats_serialize_with_null_times() {
        let value = serde_json::to_value(AggregateStats::default()).unwrap();
        assert_eq!(value["total_events"], 0);
        assert!(value["first_event_time"].is_null());
        assert!(value["last_event_time"].is_null());
        assert_eq!(value["events_by_type"], serde_json::json!({}));
    }
}
