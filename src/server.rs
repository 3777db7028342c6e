//! HTTP application assembly.

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::preferences::{PreferencesRouteState, PreferencesStore, preferences_routes};
use crate::store::Database;
use crate::tracker::{Tracker, TrackerRouteState, tracker_routes};

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "yatt-tasks",
    }))
}

/// Build the full router over a shared database handle.
pub fn app(db: Arc<dyn Database>, config: &ServerConfig) -> Router {
    let tracker = Arc::new(Tracker::new(
        Arc::clone(&db),
        config.paging,
        config.enforce_assignee_eligibility,
    ));
    let preferences = Arc::new(PreferencesStore::new(db));

    let router = Router::new()
        .route("/health", get(health))
        .merge(tracker_routes(TrackerRouteState { tracker }))
        .merge(preferences_routes(PreferencesRouteState { store: preferences }))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    if config.cors_permissive {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
