//! Event log endpoints: append, query, stream, replay and statistics.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::{AppendOutcome, Event, EventId, EventQuery, EventStore, EventStoreExt, EventType};
use projections::{AggregateState, AggregateStats, TimelineEntry};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

/// Default page size of `GET /events`.
pub const DEFAULT_LIMIT: usize = 100;
/// Largest page `GET /events` will return.
pub const MAX_LIMIT: usize = 1000;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub event_type: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ReplayParams {
    /// Replay only events at or before this instant.
    pub until: Option<DateTime<Utc>>,
}

// -- Response types --

#[derive(Serialize)]
pub struct AppendResponse {
    pub event_id: EventId,
    pub aggregate_id: AggregateId,
}

// -- Handlers --

/// GET /events: events in stream order, optionally of one type.
#[tracing::instrument(skip(state))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 || limit > MAX_LIMIT {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }

    let mut query = EventQuery::new().limit(limit);
    if let Some(name) = params.event_type {
        query = query.event_type(EventType::from(name));
    }

    let events = state.store.query(query).await?;
    Ok(Json(events))
}

/// POST /events: append one event in its wire form.
#[tracing::instrument(skip(state, event), fields(event_id = %event.event_id))]
pub async fn append<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(event): Json<Event>,
) -> Result<(StatusCode, Json<AppendResponse>), ApiError> {
    let response = AppendResponse {
        event_id: event.event_id.clone(),
        aggregate_id: event.aggregate_id.clone(),
    };

    match state.store.append(event).await? {
        AppendOutcome::Appended => Ok((StatusCode::CREATED, Json(response))),
        AppendOutcome::Duplicate => Err(ApiError::Conflict(format!(
            "Event {} already recorded",
            response.event_id
        ))),
    }
}

/// GET /events/{event_id}: a single event.
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(event_id): Path<String>,
) -> Result<Json<Event>, ApiError> {
    let event_id = EventId::from(event_id);
    state
        .store
        .get(&event_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Event {event_id} not found")))
}

/// GET /events/stream/{aggregate_id}: every event of one aggregate.
#[tracing::instrument(skip(state))]
pub async fn stream<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(aggregate_id): Path<String>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let aggregate_id = AggregateId::new(aggregate_id);
    let events = state.store.get_by_aggregate(&aggregate_id, None).await?;
    if events.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No events found for {aggregate_id}"
        )));
    }
    Ok(Json(events))
}

/// GET /events/replay/{aggregate_id}: state rebuilt from the log,
/// optionally as of `until`.
#[tracing::instrument(skip(state))]
pub async fn replay<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(aggregate_id): Path<String>,
    Query(params): Query<ReplayParams>,
) -> Result<Json<AggregateState>, ApiError> {
    let aggregate_id = AggregateId::new(aggregate_id);
    let replayed = match params.until {
        Some(cutoff) => state.processor.replay_until(&aggregate_id, cutoff).await?,
        None => state.processor.replay(&aggregate_id).await?,
    };

    if replayed.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No events to replay for {aggregate_id}"
        )));
    }
    Ok(Json(replayed))
}

/// GET /events/timeline/{aggregate_id}: event metadata in stream order.
#[tracing::instrument(skip(state))]
pub async fn timeline<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(aggregate_id): Path<String>,
) -> Result<Json<Vec<TimelineEntry>>, ApiError> {
    let aggregate_id = AggregateId::new(aggregate_id);
    let entries = state.processor.get_event_timeline(&aggregate_id).await?;
    Ok(Json(entries))
}

/// GET /events/stats: counts across the whole log.
#[tracing::instrument(skip(state))]
pub async fn stats<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<AggregateStats>, ApiError> {
    let stats = state.processor.get_aggregate_stats().await?;
    Ok(Json(stats))
}
