use chrono::{Duration, TimeZone, Utc};
use common::AggregateId;
use criterion::{Criterion, criterion_group, criterion_main};
use event_store::{
    CacheEventKind, Event, EventStoreExt, InMemoryEventStore, Side, TradeEventKind,
    create_cache_event, create_trade_event,
};
use projections::EventProcessor;

fn trade(trade_id: u32, kind: TradeEventKind, price: f64) -> Event {
    create_trade_event(trade_id, kind, "BTC/USD", price, 1.0, Side::Buy, "OPEN")
}

/// Populate a store with N trades (created + executed) and N cache hits.
async fn populate_store(store: &InMemoryEventStore, n: u32) {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut events: Vec<Event> = Vec::new();
    for i in 0..n {
        let at = t0 + Duration::seconds(i64::from(i));
        events.push(trade(i, TradeEventKind::Created, 45000.0).with_timestamp(at));
        events.push(
            trade(i, TradeEventKind::Executed, 45010.0)
                .with_timestamp(at + Duration::milliseconds(500)),
        );
        events.push(
            create_cache_event("prices", CacheEventKind::Hit, "GET", Some(true)).with_timestamp(at),
        );
    }
    store.append_many(events).await.unwrap();
}

fn bench_replay_trade(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    rt.block_on(populate_store(&store, 100));
    let processor = EventProcessor::new(store);
    let trade_id = AggregateId::trade(42);

    c.bench_function("projections/replay_trade_of_300", |b| {
        b.iter(|| {
            rt.block_on(async {
                processor.replay(&trade_id).await.unwrap();
            });
        });
    });
}

fn bench_replay_cache_100_events(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    rt.block_on(populate_store(&store, 100));
    let processor = EventProcessor::new(store);

    c.bench_function("projections/replay_cache_100_events", |b| {
        b.iter(|| {
            rt.block_on(async {
                processor.get_cache_projection("prices").await.unwrap();
            });
        });
    });
}

fn bench_aggregate_stats(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    rt.block_on(populate_store(&store, 1000));
    let processor = EventProcessor::new(store);

    c.bench_function("projections/aggregate_stats_3000", |b| {
        b.iter(|| {
            rt.block_on(async {
                processor.get_aggregate_stats().await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_replay_trade,
    bench_replay_cache_100_events,
    bench_aggregate_stats,
);
criterion_main!(benches);
