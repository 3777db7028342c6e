//! REST endpoints for organizations, users, groups and work items.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::listing::ListQuery;
use super::model::{
    GroupUpdate, NewOrganization, NewUser, NewWorkItem, NewWorkItemGroup, OrganizationUpdate,
    UserUpdate, WorkItemUpdate,
};
use super::service::{Tracker, TrackerResult};
use crate::error::TrackerError;

/// Shared state for tracker routes.
#[derive(Clone)]
pub struct TrackerRouteState {
    pub tracker: Arc<Tracker>,
}

/// Parse a path segment as an id, reporting which id was malformed.
pub(crate) fn parse_id(raw: &str, what: &str) -> TrackerResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| TrackerError::invalid(format!("Invalid {what} id: {raw}")))
}

pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> TrackerResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| TrackerError::invalid(e.body_text()))
}

fn created<T: Serialize>(location: String, body: T) -> Response {
    (
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(body),
    )
        .into_response()
}

// ── Organizations ───────────────────────────────────────────────────

/// POST /organizations
async fn create_organization(
    State(state): State<TrackerRouteState>,
    payload: Result<Json<NewOrganization>, JsonRejection>,
) -> TrackerResult<Response> {
    let org = state.tracker.create_organization(json_body(payload)?).await?;
    Ok(created(format!("/organizations/{}", org.id), org))
}

/// GET /organizations
async fn list_organizations(State(state): State<TrackerRouteState>) -> TrackerResult<Response> {
    Ok(Json(state.tracker.list_organizations().await?).into_response())
}

/// GET /organizations/{id}
///
/// Includes the member ids.
async fn get_organization(
    State(state): State<TrackerRouteState>,
    Path(id): Path<String>,
) -> TrackerResult<Response> {
    let id = parse_id(&id, "organization")?;
    Ok(Json(state.tracker.get_organization(id).await?).into_response())
}

/// PUT /organizations/{id}
async fn update_organization(
    State(state): State<TrackerRouteState>,
    Path(id): Path<String>,
    payload: Result<Json<OrganizationUpdate>, JsonRejection>,
) -> TrackerResult<Response> {
    let id = parse_id(&id, "organization")?;
    let org = state
        .tracker
        .update_organization(id, json_body(payload)?)
        .await?;
    Ok(Json(org).into_response())
}

/// PUT /organizations/{id}/members/{user_id}
async fn add_organization_member(
    State(state): State<TrackerRouteState>,
    Path((id, user_id)): Path<(String, String)>,
) -> TrackerResult<StatusCode> {
    let id = parse_id(&id, "organization")?;
    let user_id = parse_id(&user_id, "user")?;
    state.tracker.add_organization_member(id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /organizations/{id}/members/{user_id}
async fn remove_organization_member(
    State(state): State<TrackerRouteState>,
    Path((id, user_id)): Path<(String, String)>,
) -> TrackerResult<StatusCode> {
    let id = parse_id(&id, "organization")?;
    let user_id = parse_id(&user_id, "user")?;
    state.tracker.remove_organization_member(id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Users ───────────────────────────────────────────────────────────

async fn create_user(
    State(state): State<TrackerRouteState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> TrackerResult<Response> {
    let user = state.tracker.create_user(json_body(payload)?).await?;
    Ok(created(format!("/users/{}", user.id), user))
}

/// GET /users
///
/// Active users only.
async fn list_users(State(state): State<TrackerRouteState>) -> TrackerResult<Response> {
    Ok(Json(state.tracker.list_users().await?).into_response())
}

async fn get_user(
    State(state): State<TrackerRouteState>,
    Path(id): Path<String>,
) -> TrackerResult<Response> {
    let id = parse_id(&id, "user")?;
    Ok(Json(state.tracker.get_user(id).await?).into_response())
}

async fn update_user(
    State(state): State<TrackerRouteState>,
    Path(id): Path<String>,
    payload: Result<Json<UserUpdate>, JsonRejection>,
) -> TrackerResult<Response> {
    let id = parse_id(&id, "user")?;
    let user = state.tracker.update_user(id, json_body(payload)?).await?;
    Ok(Json(user).into_response())
}

/// DELETE /users/{id}
///
/// Deactivates; the row is kept.
async fn deactivate_user(
    State(state): State<TrackerRouteState>,
    Path(id): Path<String>,
) -> TrackerResult<StatusCode> {
    let id = parse_id(&id, "user")?;
    state.tracker.deactivate_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Groups ──────────────────────────────────────────────────────────

async fn create_group(
    State(state): State<TrackerRouteState>,
    payload: Result<Json<NewWorkItemGroup>, JsonRejection>,
) -> TrackerResult<Response> {
    let group = state.tracker.create_group(json_body(payload)?).await?;
    Ok(created(format!("/work-item-groups/{}", group.id), group))
}

async fn list_groups(State(state): State<TrackerRouteState>) -> TrackerResult<Response> {
    Ok(Json(state.tracker.list_groups().await?).into_response())
}

async fn get_group(
    State(state): State<TrackerRouteState>,
    Path(id): Path<String>,
) -> TrackerResult<Response> {
    let id = parse_id(&id, "group")?;
    Ok(Json(state.tracker.get_group(id).await?).into_response())
}

async fn update_group(
    State(state): State<TrackerRouteState>,
    Path(id): Path<String>,
    payload: Result<Json<GroupUpdate>, JsonRejection>,
) -> TrackerResult<Response> {
    let id = parse_id(&id, "group")?;
    let group = state.tracker.update_group(id, json_body(payload)?).await?;
    Ok(Json(group).into_response())
}

/// DELETE /work-item-groups/{id}
///
/// Soft-deletes the group together with all of its items.
async fn delete_group(
    State(state): State<TrackerRouteState>,
    Path(id): Path<String>,
) -> TrackerResult<StatusCode> {
    let id = parse_id(&id, "group")?;
    state.tracker.delete_group(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_group_co_worker(
    State(state): State<TrackerRouteState>,
    Path((id, user_id)): Path<(String, String)>,
) -> TrackerResult<StatusCode> {
    let id = parse_id(&id, "group")?;
    let user_id = parse_id(&user_id, "user")?;
    state.tracker.add_group_co_worker(id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_group_co_worker(
    State(state): State<TrackerRouteState>,
    Path((id, user_id)): Path<(String, String)>,
) -> TrackerResult<StatusCode> {
    let id = parse_id(&id, "group")?;
    let user_id = parse_id(&user_id, "user")?;
    state.tracker.remove_group_co_worker(id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /work-item-groups/{id}/work-items?page=&pageSize=&sortBy=&sortOrder=
async fn list_group_work_items(
    State(state): State<TrackerRouteState>,
    Path(id): Path<String>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> TrackerResult<Response> {
    let id = parse_id(&id, "group")?;
    let Query(query) = query.map_err(|e| TrackerError::invalid(e.body_text()))?;
    Ok(Json(state.tracker.list_work_items(id, &query).await?).into_response())
}

// ── Work items ──────────────────────────────────────────────────────

async fn create_work_item(
    State(state): State<TrackerRouteState>,
    payload: Result<Json<NewWorkItem>, JsonRejection>,
) -> TrackerResult<Response> {
    let item = state.tracker.create_work_item(json_body(payload)?).await?;
    Ok(created(format!("/work-items/{}", item.id), item))
}

async fn get_work_item(
    State(state): State<TrackerRouteState>,
    Path(id): Path<String>,
) -> TrackerResult<Response> {
    let id = parse_id(&id, "work item")?;
    Ok(Json(state.tracker.get_work_item(id).await?).into_response())
}

async fn update_work_item(
    State(state): State<TrackerRouteState>,
    Path(id): Path<String>,
    payload: Result<Json<WorkItemUpdate>, JsonRejection>,
) -> TrackerResult<Response> {
    let id = parse_id(&id, "work item")?;
    let item = state.tracker.update_work_item(id, json_body(payload)?).await?;
    Ok(Json(item).into_response())
}

async fn delete_work_item(
    State(state): State<TrackerRouteState>,
    Path(id): Path<String>,
) -> TrackerResult<StatusCode> {
    let id = parse_id(&id, "work item")?;
    state.tracker.delete_work_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /work-items/{id}/assign/{user_id}
async fn assign_work_item(
    State(state): State<TrackerRouteState>,
    Path((id, user_id)): Path<(String, String)>,
) -> TrackerResult<Response> {
    let id = parse_id(&id, "work item")?;
    let user_id = parse_id(&user_id, "user")?;
    Ok(Json(state.tracker.assign(id, user_id).await?).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssigneesQuery {
    group_id: Option<String>,
}

/// GET /work-items/assignees?groupId=
async fn list_assignees(
    State(state): State<TrackerRouteState>,
    Query(query): Query<AssigneesQuery>,
) -> TrackerResult<Response> {
    let raw = query
        .group_id
        .ok_or_else(|| TrackerError::invalid("Missing groupId query parameter"))?;
    let group_id = parse_id(&raw, "group")?;
    Ok(Json(state.tracker.eligible_assignees(group_id).await?).into_response())
}

/// Build the tracker REST routes.
pub fn tracker_routes(state: TrackerRouteState) -> Router {
    Router::new()
        .route(
            "/organizations",
            get(list_organizations).post(create_organization),
        )
        .route(
            "/organizations/{id}",
            get(get_organization).put(update_organization),
        )
        .route(
            "/organizations/{id}/members/{user_id}",
            put(add_organization_member).delete(remove_organization_member),
        )
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(deactivate_user),
        )
        .route("/work-item-groups", get(list_groups).post(create_group))
        .route(
            "/work-item-groups/{id}",
            get(get_group).put(update_group).delete(delete_group),
        )
        .route(
            "/work-item-groups/{id}/co-workers/{user_id}",
            put(add_group_co_worker).delete(remove_group_co_worker),
        )
        .route(
            "/work-item-groups/{id}/work-items",
            get(list_group_work_items),
        )
        .route("/work-items", post(create_work_item))
        .route("/work-items/assignees", get(list_assignees))
        .route(
            "/work-items/{id}",
            get(get_work_item)
                .put(update_work_item)
                .delete(delete_work_item),
        )
        .route("/work-items/{id}/assign/{user_id}", put(assign_work_item))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_reports_kind() {
        let err = parse_id("nope", "work item").unwrap_err();
        assert_eq!(err.to_string(), "Invalid request: Invalid work item id: nope");
        assert!(parse_id(&Uuid::new_v4().to_string(), "user").is_ok());
    }
}
