use std::convert::Infallible;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::AggregateId;
use crate::payload::EventPayload;

/// Unique identifier for an event.
///
/// Generated ids are UUID v4 strings, but any string a producer supplies is
/// accepted; the store only requires uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing identifier.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uuid> for EventId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.to_string())
    }
}

impl From<String> for EventId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The kind of fact an event records.
///
/// The wire form is the upper-snake name (`TRADE_CREATED`). Names this build
/// does not know are kept in [`EventType::Other`] so stored events written by
/// newer producers still load.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    TradeCreated,
    TradeExecuted,
    TradeCancelled,
    CacheHit,
    CacheMiss,
    CacheInvalidated,
    SystemStartup,
    SystemShutdown,
    SystemError,
    Other(String),
}

impl EventType {
    /// Returns the wire name of this type.
    pub fn as_str(&self) -> &str {
        match self {
            EventType::TradeCreated => "TRADE_CREATED",
            EventType::TradeExecuted => "TRADE_EXECUTED",
            EventType::TradeCancelled => "TRADE_CANCELLED",
            EventType::CacheHit => "CACHE_HIT",
            EventType::CacheMiss => "CACHE_MISS",
            EventType::CacheInvalidated => "CACHE_INVALIDATED",
            EventType::SystemStartup => "SYSTEM_STARTUP",
            EventType::SystemShutdown => "SYSTEM_SHUTDOWN",
            EventType::SystemError => "SYSTEM_ERROR",
            EventType::Other(name) => name,
        }
    }

    /// Returns true for every type except [`EventType::Other`].
    pub fn is_known(&self) -> bool {
        !matches!(self, EventType::Other(_))
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        match name {
            "TRADE_CREATED" => EventType::TradeCreated,
            "TRADE_EXECUTED" => EventType::TradeExecuted,
            "TRADE_CANCELLED" => EventType::TradeCancelled,
            "CACHE_HIT" => EventType::CacheHit,
            "CACHE_MISS" => EventType::CacheMiss,
            "CACHE_INVALIDATED" => EventType::CacheInvalidated,
            "SYSTEM_STARTUP" => EventType::SystemStartup,
            "SYSTEM_SHUTDOWN" => EventType::SystemShutdown,
            "SYSTEM_ERROR" => EventType::SystemError,
            other => EventType::Other(other.to_string()),
        }
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        match EventType::from(name.as_str()) {
            EventType::Other(_) => EventType::Other(name),
            known => known,
        }
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        match event_type {
            EventType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for EventType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(EventType::from(s))
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable fact recorded in the event log.
///
/// `data` is held exactly as the producer wrote it, so an event reads back
/// unchanged from every backend. [`Event::payload`] decodes a typed view of
/// it on demand. On the wire an event is the flat [`EventRecord`] shape
/// shared with every other producer and consumer of the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EventRecord", into = "EventRecord")]
pub struct Event {
    /// Unique identifier and de-duplication key.
    pub event_id: EventId,

    /// The kind of fact recorded.
    pub event_type: EventType,

    /// The stream this event belongs to.
    pub aggregate_id: AggregateId,

    /// When the fact occurred. Primary ordering key, kept at microsecond
    /// precision.
    pub timestamp: DateTime<Utc>,

    /// The payload object as written by the producer.
    pub data: Map<String, Value>,

    /// Schema version of the payload shape.
    pub version: u32,

    /// The actor that caused the event, if known.
    pub user_id: Option<String>,
}

impl Event {
    /// Schema version written by this build.
    pub const SCHEMA_VERSION: u32 = 1;

    /// Creates an event with a fresh id, the current time and the current
    /// schema version. The event type follows the payload variant.
    pub fn new(aggregate_id: impl Into<AggregateId>, payload: EventPayload) -> Self {
        Self {
            event_id: EventId::new(),
            event_type: payload.event_type(),
            aggregate_id: aggregate_id.into(),
            timestamp: stored_precision(Utc::now()),
            data: payload.into_data(),
            version: Self::SCHEMA_VERSION,
            user_id: None,
        }
    }

    /// Decodes the typed view of `data`.
    pub fn payload(&self) -> EventPayload {
        EventPayload::decode(&self.event_type, &self.data)
    }

    /// Overrides the generated event id, e.g. when re-issuing a timed-out append.
    pub fn with_event_id(mut self, event_id: impl Into<EventId>) -> Self {
        self.event_id = event_id.into();
        self
    }

    /// Overrides the occurrence time.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = stored_precision(timestamp);
        self
    }

    /// Sets the actor that caused the event.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Returns the wire form of this event.
    pub fn to_record(&self) -> EventRecord {
        EventRecord::from(self.clone())
    }

    /// Serializes the event to its JSON wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Truncates to the microsecond resolution of `TIMESTAMPTZ`, so every
/// backend returns the instant it was given.
fn stored_precision(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp.trunc_subsecs(6)
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Event(type={}, aggregate={}, timestamp={})",
            self.event_type,
            self.aggregate_id,
            self.timestamp.to_rfc3339()
        )
    }
}

/// The persisted, storage-independent shape of an event.
///
/// `{event_id, event_type, aggregate_id, timestamp, data, version, user_id}`
/// with `timestamp` as an ISO-8601 string and `data` as a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: String,
    pub event_type: String,
    pub aggregate_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default = "default_schema_version")]
    pub version: u32,
    #[serde(default)]
    pub user_id: Option<String>,
}

fn default_schema_version() -> u32 {
    Event::SCHEMA_VERSION
}

impl From<Event> for EventRecord {
    fn from(event: Event) -> Self {
        Self {
            event_id: event.event_id.0,
            event_type: event.event_type.into(),
            aggregate_id: event.aggregate_id.into(),
            timestamp: event.timestamp,
            data: event.data,
            version: event.version,
            user_id: event.user_id,
        }
    }
}

impl From<EventRecord> for Event {
    fn from(record: EventRecord) -> Self {
        Self {
            event_id: EventId(record.event_id),
            event_type: EventType::from(record.event_type),
            aggregate_id: AggregateId::new(record.aggregate_id),
            timestamp: stored_precision(record.timestamp),
            data: record.data,
            version: record.version,
            user_id: record.user_id,
        }
    }
}
