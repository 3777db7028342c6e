//! REST endpoints for user preferences.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use super::PreferencesStore;
use super::model::PreferencesUpdate;
use crate::error::TrackerError;
use crate::tracker::routes::{json_body, parse_id};

#[derive(Clone)]
pub struct PreferencesRouteState {
    pub store: Arc<PreferencesStore>,
}

/// GET /user-preferences/{user_id}
///
/// 404 until preferences have been saved for the user.
async fn get_preferences(
    State(state): State<PreferencesRouteState>,
    Path(user_id): Path<String>,
) -> Result<Response, TrackerError> {
    let user_id = parse_id(&user_id, "user")?;
    Ok(Json(state.store.get(user_id).await?).into_response())
}

/// PUT /user-preferences/{user_id}
async fn put_preferences(
    State(state): State<PreferencesRouteState>,
    Path(user_id): Path<String>,
    payload: Result<Json<PreferencesUpdate>, JsonRejection>,
) -> Result<Response, TrackerError> {
    let user_id = parse_id(&user_id, "user")?;
    let body = json_body(payload)?;
    Ok(Json(state.store.set(user_id, body.column_order).await?).into_response())
}

/// Build the preferences REST routes.
pub fn preferences_routes(state: PreferencesRouteState) -> Router {
    Router::new()
        .route(
            "/user-preferences/{user_id}",
            get(get_preferences).put(put_preferences),
        )
        .with_state(state)
}
