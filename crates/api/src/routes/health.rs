//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use event_store::EventStore;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `healthy` when the event store answers, `degraded` otherwise.
    pub status: &'static str,
    pub event_count: Option<u64>,
}

/// GET /health: returns system health status.
pub async fn check<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<HealthResponse> {
    match state.store.count().await {
        Ok(count) => Json(HealthResponse {
            status: "healthy",
            event_count: Some(count),
        }),
        Err(err) => {
            tracing::warn!(error = %err, "event store health check failed");
            Json(HealthResponse {
                status: "degraded",
                event_count: None,
            })
        }
    }
}
