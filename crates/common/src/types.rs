use serde::{Deserialize, Serialize};

/// The kind of entity an aggregate stream belongs to, derived from the
/// namespace prefix of its [`AggregateId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateKind {
    /// A trade stream, `trade:<id>`.
    Trade,
    /// A cache key stream, `cache:<key>`.
    Cache,
    /// A system component stream, `sys:<component>`.
    System,
    /// Any identifier without a recognised prefix.
    Other,
}

impl AggregateKind {
    /// Returns the namespace prefix used for this kind, if it has one.
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            AggregateKind::Trade => Some(AggregateId::TRADE_PREFIX),
            AggregateKind::Cache => Some(AggregateId::CACHE_PREFIX),
            AggregateKind::System => Some(AggregateId::SYSTEM_PREFIX),
            AggregateKind::Other => None,
        }
    }
}

/// Identifier of one ordered event stream.
///
/// Aggregate ids are namespaced strings (`trade:<id>`, `cache:<key>`,
/// `sys:<component>`). All events sharing an id form one stream. Ids produced
/// outside the known namespaces are accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId(String);

impl AggregateId {
    pub const TRADE_PREFIX: &'static str = "trade";
    pub const CACHE_PREFIX: &'static str = "cache";
    pub const SYSTEM_PREFIX: &'static str = "sys";

    /// Wraps a raw aggregate id string without validation.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the stream id for a trade, `trade:<id>`.
    pub fn trade(trade_id: impl std::fmt::Display) -> Self {
        Self(format!("{}:{trade_id}", Self::TRADE_PREFIX))
    }

    /// Returns the stream id for a cache key, `cache:<key>`.
    pub fn cache(cache_key: impl std::fmt::Display) -> Self {
        Self(format!("{}:{cache_key}", Self::CACHE_PREFIX))
    }

    /// Returns the stream id for a system component, `sys:<component>`.
    pub fn system(component: impl std::fmt::Display) -> Self {
        Self(format!("{}:{component}", Self::SYSTEM_PREFIX))
    }

    /// Returns the kind of stream this id names.
    pub fn kind(&self) -> AggregateKind {
        match self.0.split_once(':') {
            Some((Self::TRADE_PREFIX, _)) => AggregateKind::Trade,
            Some((Self::CACHE_PREFIX, _)) => AggregateKind::Cache,
            Some((Self::SYSTEM_PREFIX, _)) => AggregateKind::System,
            _ => AggregateKind::Other,
        }
    }

    /// Returns the part after the namespace prefix, or the whole id when the
    /// kind is [`AggregateKind::Other`].
    pub fn local_id(&self) -> &str {
        self.kind()
            .prefix()
            .and_then(|prefix| self.0.strip_prefix(prefix)?.strip_prefix(':'))
            .unwrap_or(&self.0)
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AggregateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for AggregateId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for AggregateId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<AggregateId> for String {
    fn from(id: AggregateId) -> Self {
        id.0
    }
}

impl AsRef<str> for AggregateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
