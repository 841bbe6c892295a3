//! Factory helpers used by producers.
//!
//! The helpers fix the aggregate naming convention: trades live in
//! `trade:<id>`, cache keys in `cache:<key>`, system components in
//! `sys:<component>`.

use crate::AggregateId;
use crate::event::Event;
use crate::payload::{CacheData, EventPayload, Level, Side, SystemData, TradeData};

/// Which trade fact is being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeEventKind {
    Created,
    Executed,
    Cancelled,
}

/// Which cache fact is being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEventKind {
    Hit,
    Miss,
    Invalidated,
}

/// Which system fact is being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventKind {
    Startup,
    Shutdown,
    Error,
}

/// Creates a trade event on `trade:<trade_id>`.
pub fn create_trade_event(
    trade_id: impl std::fmt::Display,
    kind: TradeEventKind,
    symbol: impl Into<String>,
    price: f64,
    quantity: f64,
    side: Side,
    status: impl Into<String>,
) -> Event {
    let data = TradeData {
        symbol: Some(symbol.into()),
        price: Some(price),
        quantity: Some(quantity),
        side: Some(side),
        status: Some(status.into()),
        ..Default::default()
    };
    let payload = match kind {
        TradeEventKind::Created => EventPayload::TradeCreated(data),
        TradeEventKind::Executed => EventPayload::TradeExecuted(data),
        TradeEventKind::Cancelled => EventPayload::TradeCancelled(data),
    };
    Event::new(AggregateId::trade(trade_id), payload)
}

/// Creates a `TRADE_CANCELLED` event carrying only a reason.
pub fn create_trade_cancelled_event(
    trade_id: impl std::fmt::Display,
    reason: impl Into<String>,
) -> Event {
    Event::new(
        AggregateId::trade(trade_id),
        EventPayload::TradeCancelled(TradeData {
            status: Some("CANCELLED".to_string()),
            reason: Some(reason.into()),
            ..Default::default()
        }),
    )
}

/// Creates a cache event on `cache:<cache_key>`.
///
/// `hit` is only written when given.
pub fn create_cache_event(
    cache_key: impl Into<String>,
    kind: CacheEventKind,
    operation: impl Into<String>,
    hit: Option<bool>,
) -> Event {
    let cache_key = cache_key.into();
    let aggregate_id = AggregateId::cache(&cache_key);
    let data = CacheData {
        cache_key: Some(cache_key),
        operation: Some(operation.into()),
        hit,
        ..Default::default()
    };
    let payload = match kind {
        CacheEventKind::Hit => EventPayload::CacheHit(data),
        CacheEventKind::Miss => EventPayload::CacheMiss(data),
        CacheEventKind::Invalidated => EventPayload::CacheInvalidated(data),
    };
    Event::new(aggregate_id, payload)
}

/// Creates a system event on `sys:<component>`.
pub fn create_system_event(
    kind: SystemEventKind,
    level: Level,
    message: impl Into<String>,
    component: impl Into<String>,
    error_code: Option<String>,
) -> Event {
    let component = component.into();
    let aggregate_id = AggregateId::system(&component);
    let data = SystemData {
        level: Some(level),
        message: Some(message.into()),
        component: Some(component),
        error_code,
        ..Default::default()
    };
    let payload = match kind {
        SystemEventKind::Startup => EventPayload::SystemStartup(data),
        SystemEventKind::Shutdown => EventPayload::SystemShutdown(data),
        SystemEventKind::Error => EventPayload::SystemError(data),
    };
    Event::new(aggregate_id, payload)
}
