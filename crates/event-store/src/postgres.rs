use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgPoolOptions, postgres::PgRow};

use crate::{
    Event, EventId, EventQuery, EventRecord, EventStoreError, Result,
    store::{AppendOutcome, EventStore, EventStream, ResetStore},
};

/// Rows fetched per round trip by [`PostgresEventStore::stream_all`].
const STREAM_PAGE_SIZE: i64 = 500;

/// Keyset position of a paged scan over `(timestamp, sequence)`.
enum Cursor {
    Start,
    After(DateTime<Utc>, i64),
    Done,
}

/// PostgreSQL-backed event store implementation.
///
/// Append order is recorded in the `sequence` column, which breaks ties
/// between events with equal timestamps.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a new PostgreSQL event store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool and wraps it in a store.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<Event> {
        let event_id: String = row.try_get("event_id")?;

        let data = match row.try_get::<serde_json::Value, _>("data")? {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(EventStoreError::InvalidRecord {
                    event_id,
                    reason: format!("data must be a JSON object, found {other}"),
                });
            }
        };

        let version = u32::try_from(row.try_get::<i32, _>("version")?).map_err(|_| {
            EventStoreError::InvalidRecord {
                event_id: event_id.clone(),
                reason: "negative schema version".to_string(),
            }
        })?;

        let record = EventRecord {
            event_id,
            event_type: row.try_get("event_type")?,
            aggregate_id: row.try_get("aggregate_id")?,
            timestamp: row.try_get("timestamp")?,
            data,
            version,
            user_id: row.try_get("user_id")?,
        };
        Ok(Event::from(record))
    }

    async fn fetch_page(pool: PgPool, cursor: Cursor) -> Result<Option<(Vec<Event>, Cursor)>> {
        let rows = match cursor {
            Cursor::Done => return Ok(None),
            Cursor::Start => {
                sqlx::query(
                    r#"
                    SELECT sequence, event_id, event_type, aggregate_id, timestamp, data, version, user_id
                    FROM events
                    ORDER BY timestamp ASC, sequence ASC
                    LIMIT $1
                    "#,
                )
                .bind(STREAM_PAGE_SIZE)
                .fetch_all(&pool)
                .await?
            }
            Cursor::After(timestamp, sequence) => {
                sqlx::query(
                    r#"
                    SELECT sequence, event_id, event_type, aggregate_id, timestamp, data, version, user_id
                    FROM events
                    WHERE (timestamp, sequence) > ($1, $2)
                    ORDER BY timestamp ASC, sequence ASC
                    LIMIT $3
                    "#,
                )
                .bind(timestamp)
                .bind(sequence)
                .bind(STREAM_PAGE_SIZE)
                .fetch_all(&pool)
                .await?
            }
        };

        if rows.is_empty() {
            return Ok(None);
        }

        let next = match rows.last() {
            Some(last) if rows.len() as i64 == STREAM_PAGE_SIZE => {
                Cursor::After(last.try_get("timestamp")?, last.try_get("sequence")?)
            }
            _ => Cursor::Done,
        };

        let events = rows
            .into_iter()
            .map(Self::row_to_event)
            .collect::<Result<Vec<_>>>()?;
        Ok(Some((events, next)))
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[tracing::instrument(
        skip(self, event),
        fields(event_id = %event.event_id, event_type = %event.event_type)
    )]
    async fn append(&self, event: Event) -> Result<AppendOutcome> {
        let record = EventRecord::from(event);
        let version =
            i32::try_from(record.version).map_err(|_| EventStoreError::InvalidRecord {
                event_id: record.event_id.clone(),
                reason: format!("schema version {} out of range", record.version),
            })?;

        let result = sqlx::query(
            r#"
            INSERT INTO events (event_id, event_type, aggregate_id, timestamp, data, version, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(&record.event_id)
        .bind(&record.event_type)
        .bind(&record.aggregate_id)
        .bind(record.timestamp)
        .bind(serde_json::Value::Object(record.data))
        .bind(version)
        .bind(&record.user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!("event already recorded");
            metrics::counter!("event_store_duplicate_appends", "backend" => "postgres")
                .increment(1);
            return Ok(AppendOutcome::Duplicate);
        }

        tracing::debug!(aggregate_id = %record.aggregate_id, "event appended");
        metrics::counter!("event_store_events_appended", "backend" => "postgres").increment(1);
        Ok(AppendOutcome::Appended)
    }

    async fn get(&self, event_id: &EventId) -> Result<Option<Event>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT sequence, event_id, event_type, aggregate_id, timestamp, data, version, user_id
            FROM events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_event).transpose()
    }

    async fn query(&self, query: EventQuery) -> Result<Vec<Event>> {
        let mut sql = String::from(
            "SELECT sequence, event_id, event_type, aggregate_id, timestamp, data, version, user_id FROM events WHERE 1=1",
        );
        let mut param_count = 0;

        // Build dynamic query
        if query.aggregate_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND aggregate_id = ${param_count}"));
        }
        if query.event_types.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND event_type = ANY(${param_count})"));
        }
        if query.from_timestamp.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND timestamp >= ${param_count}"));
        }
        if query.to_timestamp.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND timestamp <= ${param_count}"));
        }

        sql.push_str(" ORDER BY timestamp ASC, sequence ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(id) = query.aggregate_id {
            sqlx_query = sqlx_query.bind(String::from(id));
        }
        if let Some(event_types) = query.event_types {
            let names: Vec<String> = event_types.into_iter().map(String::from).collect();
            sqlx_query = sqlx_query.bind(names);
        }
        if let Some(from_ts) = query.from_timestamp {
            sqlx_query = sqlx_query.bind(from_ts);
        }
        if let Some(to_ts) = query.to_timestamp {
            sqlx_query = sqlx_query.bind(to_ts);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(i64::try_from(offset).unwrap_or(i64::MAX));
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn stream_all(&self) -> Result<EventStream> {
        use futures_util::{TryStreamExt, stream};

        let pool = self.pool.clone();
        let stream = stream::try_unfold(Cursor::Start, move |cursor| {
            Self::fetch_page(pool.clone(), cursor)
        })
        .map_ok(|events| stream::iter(events.into_iter().map(Ok)))
        .try_flatten();

        Ok(Box::pin(stream))
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl ResetStore for PostgresEventStore {
    async fn clear(&self) -> Result<()> {
        sqlx::query("TRUNCATE TABLE events RESTART IDENTITY")
            .execute(&self.pool)
            .await?;
        tracing::warn!("all events cleared");
        Ok(())
    }
}
