//! Typed event payloads.
//!
//! An event stores its `data` object exactly as the producer wrote it; the
//! types here are a read view decoded from that object. Every field is
//! optional and lenient: a key that is missing, `null`, or of the wrong shape
//! reads as `None` and never changes how the event is dispatched. Keys the
//! structs do not name are kept in `extra`. Only types this build has no
//! payload struct for decode to [`EventPayload::Unknown`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::event::EventType;

/// Trade direction.
///
/// `BUY` and `SELL` in any case; any other label is kept in [`Side::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Side {
    Buy,
    Sell,
    Other(String),
}

impl From<String> for Side {
    fn from(label: String) -> Self {
        match label.to_ascii_uppercase().as_str() {
            "BUY" => Side::Buy,
            "SELL" => Side::Sell,
            _ => Side::Other(label),
        }
    }
}

impl From<Side> for String {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => "BUY".to_string(),
            Side::Sell => "SELL".to_string(),
            Side::Other(label) => label,
        }
    }
}

/// Severity of a system event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    #[serde(rename = "INFO", alias = "info")]
    Info,
    #[serde(rename = "WARNING", alias = "warning")]
    Warning,
    #[serde(rename = "ERROR", alias = "error")]
    Error,
    #[serde(rename = "CRITICAL", alias = "critical")]
    Critical,
}

/// Reads a field as `T`, or `None` if the stored value does not fit.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Payload shared by every trade event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeData {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    /// Producer-side status label (`CREATED`, `EXECUTED`, ...).
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Cancellation reason.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload shared by every cache event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheData {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
    /// `GET`, `SET`, `DELETE`, `INVALIDATE`.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub hit: Option<bool>,
    /// Time-to-live in seconds, for `SET`.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload shared by every system event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemData {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// Always written, `null` when absent.
    #[serde(default, deserialize_with = "lenient")]
    pub error_code: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The payload of an event, tagged by event kind.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    TradeCreated(TradeData),
    TradeExecuted(TradeData),
    TradeCancelled(TradeData),
    CacheHit(CacheData),
    CacheMiss(CacheData),
    CacheInvalidated(CacheData),
    SystemStartup(SystemData),
    SystemShutdown(SystemData),
    SystemError(SystemData),
    /// A type this build has no payload struct for. Kept exactly as stored.
    Unknown {
        event_type: String,
        data: Map<String, Value>,
    },
}

impl EventPayload {
    /// Returns the event type this payload belongs to.
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::TradeCreated(_) => EventType::TradeCreated,
            EventPayload::TradeExecuted(_) => EventType::TradeExecuted,
            EventPayload::TradeCancelled(_) => EventType::TradeCancelled,
            EventPayload::CacheHit(_) => EventType::CacheHit,
            EventPayload::CacheMiss(_) => EventType::CacheMiss,
            EventPayload::CacheInvalidated(_) => EventType::CacheInvalidated,
            EventPayload::SystemStartup(_) => EventType::SystemStartup,
            EventPayload::SystemShutdown(_) => EventType::SystemShutdown,
            EventPayload::SystemError(_) => EventType::SystemError,
            EventPayload::Unknown { event_type, .. } => EventType::from(event_type.as_str()),
        }
    }

    /// Decodes stored `data` for the given type. Never fails, and a known
    /// type always decodes to its own variant.
    pub fn decode(event_type: &EventType, data: &Map<String, Value>) -> Self {
        match event_type {
            EventType::TradeCreated => EventPayload::TradeCreated(typed(data)),
            EventType::TradeExecuted => EventPayload::TradeExecuted(typed(data)),
            EventType::TradeCancelled => EventPayload::TradeCancelled(typed(data)),
            EventType::CacheHit => EventPayload::CacheHit(typed(data)),
            EventType::CacheMiss => EventPayload::CacheMiss(typed(data)),
            EventType::CacheInvalidated => EventPayload::CacheInvalidated(typed(data)),
            EventType::SystemStartup => EventPayload::SystemStartup(typed(data)),
            EventType::SystemShutdown => EventPayload::SystemShutdown(typed(data)),
            EventType::SystemError => EventPayload::SystemError(typed(data)),
            EventType::Other(name) => EventPayload::Unknown {
                event_type: name.clone(),
                data: data.clone(),
            },
        }
    }

    /// Returns the payload as the JSON object stored under `data`.
    pub fn into_data(self) -> Map<String, Value> {
        match self {
            EventPayload::TradeCreated(data)
            | EventPayload::TradeExecuted(data)
            | EventPayload::TradeCancelled(data) => object(&data),
            EventPayload::CacheHit(data)
            | EventPayload::CacheMiss(data)
            | EventPayload::CacheInvalidated(data) => object(&data),
            EventPayload::SystemStartup(data)
            | EventPayload::SystemShutdown(data)
            | EventPayload::SystemError(data) => object(&data),
            EventPayload::Unknown { data, .. } => data,
        }
    }
}

fn typed<T: DeserializeOwned + Default>(data: &Map<String, Value>) -> T {
    serde_json::from_value(Value::Object(data.clone())).unwrap_or_else(|err| {
        tracing::debug!(%err, "payload could not be read, using empty fields");
        T::default()
    })
}

// The payload structs only hold strings, numbers, booleans and nested JSON,
// so they always serialize to an object.
fn object<T: Serialize>(data: &T) -> Map<String, Value> {
    match serde_json::to_value(data) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
