//! HTTP API over the trading event log.
//!
//! Provides REST endpoints to append and query events and to replay
//! aggregates, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use event_store::{EventStore, Level, SystemEventKind, create_system_event};
use metrics_exporter_prometheus::PrometheusHandle;
use projections::EventProcessor;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Component name used for the server's own lifecycle events.
pub const COMPONENT: &str = "api";

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore> {
    pub store: S,
    pub processor: EventProcessor<S>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route(
            "/events",
            get(routes::events::list::<S>).post(routes::events::append::<S>),
        )
        .route("/events/stats", get(routes::events::stats::<S>))
        .route("/events/stream/{aggregate_id}", get(routes::events::stream::<S>))
        .route("/events/replay/{aggregate_id}", get(routes::events::replay::<S>))
        .route("/events/timeline/{aggregate_id}", get(routes::events::timeline::<S>))
        .route("/events/{event_id}", get(routes::events::get::<S>))
        .route("/trades/{trade_id}/projection", get(routes::views::trade::<S>))
        .route("/cache/{key}/projection", get(routes::views::cache::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state around an event store.
pub fn create_default_state<S: EventStore + Clone + 'static>(event_store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        processor: EventProcessor::new(event_store.clone()),
        store: event_store,
    })
}

/// Records a lifecycle event for the server itself on `sys:api`.
///
/// Failures are logged and otherwise ignored; the server keeps running
/// without its own lifecycle record.
pub async fn record_lifecycle<S: EventStore>(store: &S, kind: SystemEventKind, message: &str) {
    let event = create_system_event(kind, Level::Info, message, COMPONENT, None);
    if let Err(err) = store.append(event).await {
        tracing::warn!(error = %err, ?kind, "failed to record lifecycle event");
    }
}
