use chrono::{Duration, TimeZone, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use event_store::{
    AggregateId, CacheEventKind, Event, EventStoreExt, EventType, InMemoryEventStore, Side,
    TradeEventKind, create_cache_event, create_trade_event, store::EventStore,
};

fn make_trade(trade_id: u32, seconds: i64) -> Event {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    create_trade_event(
        trade_id,
        TradeEventKind::Executed,
        "BTC/USD",
        45000.0,
        0.25,
        Side::Sell,
        "EXECUTED",
    )
    .with_timestamp(t0 + Duration::seconds(seconds))
}

fn populated_store(
    rt: &tokio::runtime::Runtime,
    aggregates: u32,
    per_aggregate: i64,
) -> InMemoryEventStore {
    let store = InMemoryEventStore::new();
    rt.block_on(async {
        for trade_id in 0..aggregates {
            let events: Vec<Event> = (0..per_aggregate).map(|s| make_trade(trade_id, s)).collect();
            store.append_many(events).await.unwrap();
        }
    });
    store
}

fn bench_append_single_event(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("event_store/append_single_event", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryEventStore::new();
                store.append(make_trade(1, 0)).await.unwrap();
            });
        });
    });
}

fn bench_append_many_100(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("event_store/append_many_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryEventStore::new();
                let events: Vec<Event> = (0..100)
                    .map(|i| {
                        create_cache_event(format!("key{i}"), CacheEventKind::Miss, "GET", None)
                    })
                    .collect();
                store.append_many(events).await.unwrap();
            });
        });
    });
}

fn bench_get_by_aggregate(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = populated_store(&rt, 10, 100);
    let aggregate_id = AggregateId::trade(3);

    c.bench_function("event_store/get_by_aggregate_100_of_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.get_by_aggregate(&aggregate_id, None).await.unwrap();
            });
        });
    });
}

fn bench_get_by_type(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = populated_store(&rt, 10, 100);

    c.bench_function("event_store/get_by_type_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.get_by_type(&EventType::TradeExecuted).await.unwrap();
            });
        });
    });
}

fn bench_stream_all(c: &mut Criterion) {
    use futures_util::StreamExt;

    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = populated_store(&rt, 10, 100);

    c.bench_function("event_store/stream_1000_events", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut stream = store.stream_all().await.unwrap();
                let mut count = 0;
                while let Some(result) = stream.next().await {
                    result.unwrap();
                    count += 1;
                }
                assert_eq!(count, 1000);
            });
        });
    });
}

criterion_group!(
    benches,
    bench_append_single_event,
    bench_append_many_100,
    bench_get_by_aggregate,
    bench_get_by_type,
    bench_stream_all,
);
criterion_main!(benches);
