//! Materialized views of trades and cache keys.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use event_store::EventStore;
use projections::AggregateState;

use crate::AppState;
use crate::error::ApiError;

/// GET /trades/{trade_id}/projection: current state of `trade:<trade_id>`.
#[tracing::instrument(skip(state))]
pub async fn trade<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(trade_id): Path<String>,
) -> Result<Json<AggregateState>, ApiError> {
    let projection = state.processor.get_trade_projection(&trade_id).await?;
    Ok(Json(projection))
}

/// GET /cache/{key}/projection: hit/miss activity of `cache:<key>`.
#[tracing::instrument(skip(state))]
pub async fn cache<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(key): Path<String>,
) -> Result<Json<AggregateState>, ApiError> {
    let projection = state.processor.get_cache_projection(&key).await?;
    Ok(Json(projection))
}
