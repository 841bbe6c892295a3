//! Append-only event log for the trading platform.
//!
//! Producers record immutable [`Event`]s through an [`EventStore`]; readers
//! query them back ordered by timestamp. Two backends are provided:
//! [`InMemoryEventStore`] and [`PostgresEventStore`].

pub mod error;
pub mod event;
pub mod factory;
pub mod memory;
pub mod payload;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::{AggregateId, AggregateKind};
pub use error::{EventStoreError, Result};
pub use event::{Event, EventId, EventRecord, EventType};
pub use factory::{
    CacheEventKind, SystemEventKind, TradeEventKind, create_cache_event, create_system_event,
    create_trade_cancelled_event, create_trade_event,
};
pub use memory::InMemoryEventStore;
pub use payload::{CacheData, EventPayload, Level, Side, SystemData, TradeData};
pub use postgres::PostgresEventStore;
pub use query::EventQuery;
pub use store::{AppendOutcome, EventStore, EventStoreExt, EventStream, ResetStore};
