//! Integration tests: factory events → InMemoryEventStore → EventProcessor.

use chrono::{DateTime, Duration, TimeZone, Utc};
use common::AggregateId;
use event_store::{
    AppendOutcome, CacheEventKind, Event, EventPayload, EventStore, EventStoreExt,
    InMemoryEventStore, Level, Side, SystemEventKind, TradeEventKind, create_cache_event,
    create_system_event, create_trade_event,
};
use projections::{CacheStats, EventProcessor, Status};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
}

fn btc_trade(trade_id: &str, kind: TradeEventKind, price: f64) -> Event {
    create_trade_event(trade_id, kind, "BTC/USD", price, 1.0, Side::Buy, "CREATED")
}

fn eth_trade(kind: TradeEventKind, price: f64, status: &str) -> Event {
    create_trade_event("1", kind, "ETH/USD", price, 10.0, Side::Sell, status)
}

fn setup() -> (InMemoryEventStore, EventProcessor<InMemoryEventStore>) {
    let store = InMemoryEventStore::new();
    let processor = EventProcessor::new(store.clone());
    (store, processor)
}

#[tokio::test]
async fn trade_lifecycle_replays_to_executed() {
    let (store, processor) = setup();

    let created = create_trade_event(
        "123",
        TradeEventKind::Created,
        "BTC/USD",
        45000.0,
        1.5,
        Side::Buy,
        "CREATED",
    )
    .with_timestamp(t0());
    let executed = create_trade_event(
        "123",
        TradeEventKind::Executed,
        "BTC/USD",
        45100.0,
        1.5,
        Side::Buy,
        "EXECUTED",
    )
    .with_timestamp(t0() + Duration::seconds(3));
    store.append_many(vec![created, executed]).await.unwrap();

    let state = processor.get_trade_projection("123").await.unwrap();

    assert_eq!(state.aggregate_id, AggregateId::trade("123"));
    assert_eq!(state.status, Status::Executed);
    assert_eq!(state.symbol.as_deref(), Some("BTC/USD"));
    assert_eq!(state.price, Some(45000.0));
    assert_eq!(state.side, Some(Side::Buy));
    assert_eq!(state.executed_price, Some(45100.0));
    assert_eq!(state.version, 2);
    assert_eq!(state.event_count, 2);
    assert_eq!(state.events.len(), 2);
    assert_eq!(state.last_updated, Some(t0() + Duration::seconds(3)));
}

#[tokio::test]
async fn cache_activity_counts_hits_and_misses() {
    let (store, processor) = setup();

    store
        .append_many(vec![
            create_cache_event("k", CacheEventKind::Hit, "GET", Some(true)),
            create_cache_event("k", CacheEventKind::Hit, "GET", Some(true)),
            create_cache_event("k", CacheEventKind::Miss, "GET", Some(false)),
        ])
        .await
        .unwrap();

    let state = processor.get_cache_projection("k").await.unwrap();

    assert_eq!(state.cache_stats, Some(CacheStats { hits: 2, misses: 1 }));
    assert_eq!(state.last_cache_key.as_deref(), Some("k"));
    assert_eq!(state.status, Status::Initialized);
}

#[tokio::test]
async fn stats_span_all_aggregates() {
    let (store, processor) = setup();

    store
        .append_many(vec![
            eth_trade(TradeEventKind::Created, 2500.0, "CREATED").with_timestamp(t0()),
            eth_trade(TradeEventKind::Executed, 2501.0, "EXECUTED")
                .with_timestamp(t0() + Duration::seconds(1)),
            create_cache_event("prices", CacheEventKind::Miss, "GET", Some(false))
                .with_timestamp(t0() + Duration::seconds(2)),
        ])
        .await
        .unwrap();

    let stats = processor.get_aggregate_stats().await.unwrap();

    assert_eq!(stats.total_events, 3);
    assert_eq!(stats.events_by_aggregate.len(), 2);
    assert_eq!(stats.events_by_aggregate.values().sum::<u64>(), 3);
    assert_eq!(stats.events_by_aggregate[&AggregateId::trade("1")], 2);
    assert_eq!(stats.first_event_time, Some(t0()));
    assert_eq!(stats.last_event_time, Some(t0() + Duration::seconds(2)));
}

#[tokio::test]
async fn duplicate_event_id_keeps_first_payload() {
    let (store, processor) = setup();

    let first = btc_trade("9", TradeEventKind::Created, 100.0);
    let event_id = first.event_id.clone();
    let retry = btc_trade("9", TradeEventKind::Created, 999.0).with_event_id(event_id.clone());

    assert_eq!(store.append(first).await.unwrap(), AppendOutcome::Appended);
    assert_eq!(store.append(retry).await.unwrap(), AppendOutcome::Duplicate);

    let stored = store.get(&event_id).await.unwrap().unwrap();
    let EventPayload::TradeCreated(data) = stored.payload() else {
        panic!("expected TradeCreated");
    };
    assert_eq!(data.price, Some(100.0));

    let state = processor.get_trade_projection("9").await.unwrap();
    assert_eq!(state.event_count, 1);
    assert_eq!(state.price, Some(100.0));
}

#[tokio::test]
async fn replay_is_deterministic() {
    let (store, processor) = setup();

    store
        .append_many(vec![
            btc_trade("5", TradeEventKind::Created, 1.0),
            btc_trade("5", TradeEventKind::Executed, 1.1),
        ])
        .await
        .unwrap();

    let first = processor.replay(&AggregateId::trade("5")).await.unwrap();
    let second = processor.replay(&AggregateId::trade("5")).await.unwrap();

    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
}

#[tokio::test]
async fn unknown_aggregate_replays_to_empty_state() {
    let (_store, processor) = setup();

    let state = processor
        .replay(&AggregateId::trade("doesnotexist"))
        .await
        .unwrap();

    assert_eq!(state.event_count, 0);
    assert_eq!(state.version, 0);
    assert_eq!(state.status, Status::Initialized);
    assert!(state.events.is_empty());
    assert!(state.last_updated.is_none());
}

#[tokio::test]
async fn stats_agree_with_store_count() {
    let (store, processor) = setup();

    for i in 0..7 {
        store
            .append(create_cache_event(
                format!("k{}", i % 3),
                CacheEventKind::Hit,
                "GET",
                Some(true),
            ))
            .await
            .unwrap();
    }
    store
        .append(create_system_event(
            SystemEventKind::Error,
            Level::Error,
            "boom",
            "worker",
            None,
        ))
        .await
        .unwrap();

    let stats = processor.get_aggregate_stats().await.unwrap();
    let by_type: u64 = stats.events_by_type.values().sum();

    assert_eq!(by_type, stats.total_events);
    assert_eq!(stats.total_events, store.count().await.unwrap());
    assert_eq!(stats.events_by_type["SYSTEM_ERROR"], 1);
}

#[tokio::test]
async fn interleaved_aggregates_replay_in_their_own_order() {
    let (store, processor) = setup();

    for i in 0..6 {
        let trade_id = if i % 2 == 0 { "a" } else { "b" };
        let kind = if i < 2 {
            TradeEventKind::Created
        } else {
            TradeEventKind::Executed
        };
        let event = btc_trade(trade_id, kind, 100.0 + i as f64)
            .with_timestamp(t0() + Duration::seconds(i));
        store.append(event).await.unwrap();
    }

    let a = processor.get_trade_projection("a").await.unwrap();
    let b = processor.get_trade_projection("b").await.unwrap();

    assert_eq!(a.event_count, 3);
    assert_eq!(b.event_count, 3);
    assert_eq!(a.price, Some(100.0));
    assert_eq!(a.executed_price, Some(104.0));
    assert_eq!(b.price, Some(101.0));
    assert_eq!(b.executed_price, Some(105.0));

    let timestamps: Vec<_> = a.events.iter().map(|e| e.timestamp).collect();
    let mut sorted = timestamps.clone();
    sorted.sort();
    assert_eq!(timestamps, sorted);
}

#[tokio::test]
async fn loosely_shaped_payloads_still_run_their_rules() {
    let (store, processor) = setup();

    let records = [
        serde_json::json!({
            "event_id": "t-1",
            "event_type": "TRADE_CREATED",
            "aggregate_id": "trade:77",
            "timestamp": "2024-06-01T09:30:00Z",
            "data": {"symbol": "BTC/USD", "price": 45000, "quantity": 1, "side": "SHORT"}
        }),
        serde_json::json!({
            "event_id": "c-1",
            "event_type": "CACHE_HIT",
            "aggregate_id": "cache:k",
            "timestamp": "2024-06-01T09:30:01Z",
            "data": {"cache_key": "k", "ttl": -1}
        }),
    ];
    for record in records {
        let event: Event = serde_json::from_value(record).unwrap();
        store.append(event).await.unwrap();
    }

    let trade = processor.get_trade_projection("77").await.unwrap();
    assert_eq!(trade.status, Status::Created);
    assert_eq!(trade.symbol.as_deref(), Some("BTC/USD"));
    assert!(trade.unknown_events.is_empty());

    let cache = processor.get_cache_projection("k").await.unwrap();
    assert_eq!(cache.cache_stats, Some(CacheStats { hits: 1, misses: 0 }));
    assert_eq!(cache.last_cache_key.as_deref(), Some("k"));
    assert!(cache.unknown_events.is_empty());
}
