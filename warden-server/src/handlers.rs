//! HTTP handlers for the governance API.

use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use warden_core::{
    Action, AuditEntry, AuditFilter, ExecutionResult, Recommendation, Role, UserContext,
    UserPermissionRecord,
};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Request body for executing a governed action.
///
/// When `roles` or `capabilities` are supplied the call runs under that
/// explicit context; otherwise the user's stored permissions are resolved
/// server-side.
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    /// The action to execute.
    pub action: Action,
    /// The user the call runs under.
    pub user_id: String,
    /// Explicit role override.
    #[serde(default)]
    pub roles: Option<Vec<String>>,
    /// Explicit individual-capability override.
    #[serde(default)]
    pub capabilities: Option<Vec<String>>,
}

/// Request body for assigning a role.
#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    /// The role to assign.
    pub role: String,
}

/// Request body for granting a capability.
#[derive(Debug, Deserialize)]
pub struct GrantCapabilityRequest {
    /// The capability to grant.
    pub capability: String,
}

/// One action-type entry in the capabilities listing.
#[derive(Debug, Serialize)]
pub struct CatalogEntry {
    /// Action type.
    #[serde(rename = "type")]
    pub action_type: String,
    /// Capability required to execute it.
    pub capability: String,
}

/// Query parameters for audit queries.
#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    /// Only entries for this user.
    pub user_id: Option<String>,
    /// Only entries for this action type.
    #[serde(rename = "type")]
    pub action_type: Option<String>,
    /// At most this many entries.
    pub limit: Option<usize>,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let backend_healthy = state.pipeline.backend_healthy().await;
    Json(json!({
        "status": "ok",
        "backend_healthy": backend_healthy,
        "audit_published": state.pipeline.recorder().bus().published(),
    }))
}

/// GET /capabilities
pub async fn capabilities(State(state): State<AppState>) -> Json<Vec<CatalogEntry>> {
    let entries = state
        .pipeline
        .catalog()
        .entries()
        .map(|(action_type, capability)| CatalogEntry {
            action_type: action_type.to_string(),
            capability: capability.to_string(),
        })
        .collect();
    Json(entries)
}

/// GET /roles
pub async fn roles(State(state): State<AppState>) -> Json<Vec<Role>> {
    Json(state.pipeline.registry().list().into_iter().cloned().collect())
}

/// GET /users
pub async fn users(State(state): State<AppState>) -> ServerResult<Json<Vec<UserPermissionRecord>>> {
    Ok(Json(state.pipeline.permissions().list_users().await?))
}

/// GET /users/:id/roles
pub async fn user_roles(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ServerResult<Json<Vec<String>>> {
    Ok(Json(state.pipeline.permissions().roles_of(&user_id).await?))
}

/// POST /users/:id/roles
pub async fn assign_role(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<AssignRoleRequest>,
) -> ServerResult<Json<Vec<String>>> {
    let permissions = state.pipeline.permissions();
    permissions.assign_role(&user_id, &request.role).await?;
    Ok(Json(permissions.roles_of(&user_id).await?))
}

/// DELETE /users/:id/roles/:role
pub async fn remove_role(
    State(state): State<AppState>,
    Path((user_id, role)): Path<(String, String)>,
) -> ServerResult<Json<Vec<String>>> {
    let permissions = state.pipeline.permissions();
    permissions.remove_role(&user_id, &role).await?;
    Ok(Json(permissions.roles_of(&user_id).await?))
}

/// POST /users/:id/capabilities
pub async fn grant_capability(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<GrantCapabilityRequest>,
) -> ServerResult<Json<Vec<String>>> {
    let permissions = state.pipeline.permissions();
    permissions
        .grant_capability(&user_id, &request.capability)
        .await?;
    Ok(Json(
        permissions
            .capabilities_of(&user_id)
            .await?
            .into_iter()
            .collect(),
    ))
}

/// DELETE /users/:id/capabilities/:capability
pub async fn revoke_capability(
    State(state): State<AppState>,
    Path((user_id, capability)): Path<(String, String)>,
) -> ServerResult<Json<Vec<String>>> {
    let permissions = state.pipeline.permissions();
    permissions.revoke_capability(&user_id, &capability).await?;
    Ok(Json(
        permissions
            .capabilities_of(&user_id)
            .await?
            .into_iter()
            .collect(),
    ))
}

/// POST /execute
pub async fn execute(
    State(state): State<AppState>,
    Json(request): Json<ExecuteRequest>,
) -> ServerResult<Json<ExecutionResult>> {
    if request.user_id.is_empty() {
        return Err(ServerError::InvalidRequest("user_id is required".to_string()));
    }

    let result = match (request.roles, request.capabilities) {
        (None, None) => {
            state
                .pipeline
                .execute_for_user(request.action, &request.user_id)
                .await?
        }
        (roles, capabilities) => {
            let ctx = UserContext::new(&request.user_id)
                .with_roles(roles.unwrap_or_default())
                .with_capabilities(capabilities.unwrap_or_default());
            state.pipeline.execute(request.action, ctx).await?
        }
    };
    Ok(Json(result))
}

/// GET /audit
pub async fn audit_query(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> ServerResult<Json<Vec<AuditEntry>>> {
    let mut filter = AuditFilter::default();
    if let Some(user_id) = query.user_id {
        filter = filter.user(user_id);
    }
    if let Some(action_type) = query.action_type {
        filter = filter.action_type(action_type);
    }
    if let Some(limit) = query.limit {
        filter = filter.limit(limit);
    }
    Ok(Json(state.pipeline.recorder().query(&filter).await?))
}

/// Query parameters for the recent-entries endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
    /// At most this many entries.
    pub limit: Option<usize>,
}

/// GET /audit/recent
pub async fn audit_recent(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Json<Vec<AuditEntry>> {
    let limit = query.limit.unwrap_or(usize::MAX);
    Json(
        state
            .pipeline
            .recorder()
            .recent(limit)
            .into_iter()
            .map(|entry| entry.as_ref().clone())
            .collect(),
    )
}

/// GET /audit/stream
///
/// SSE stream interleaving every new audit entry (`audit-update` events)
/// with derived denial/failure alerts (`audit-alert` events).
pub async fn audit_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let bus = state.pipeline.recorder().bus();

    let updates = BroadcastStream::new(bus.subscribe()).filter_map(|update| {
        update.ok().map(|entry| {
            Ok::<_, Infallible>(
                Event::default()
                    .event("audit-update")
                    .data(serde_json::to_string(entry.as_ref()).unwrap_or_default()),
            )
        })
    });
    let alerts = BroadcastStream::new(bus.subscribe_alerts()).filter_map(|alert| {
        alert.ok().map(|alert| {
            Ok::<_, Infallible>(
                Event::default()
                    .event("audit-alert")
                    .data(serde_json::to_string(&alert).unwrap_or_default()),
            )
        })
    });

    Sse::new(futures::stream::select(updates, alerts)).keep_alive(KeepAlive::default())
}

/// GET /recommendations
pub async fn recommendations(State(state): State<AppState>) -> Json<Vec<Recommendation>> {
    Json(state.engine.list())
}

/// POST /recommendations/generate
pub async fn generate_recommendations(
    State(state): State<AppState>,
) -> ServerResult<Json<Vec<Recommendation>>> {
    let recs = state
        .engine
        .scan(state.pipeline.recorder(), state.pipeline.permissions())
        .await?;
    Ok(Json(recs))
}

/// POST /recommendations/:id/apply
pub async fn apply_recommendation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Recommendation>> {
    if state.engine.get(&id).is_none() {
        return Err(ServerError::NotFound(format!("no recommendation with id {}", id)));
    }
    let applied = state
        .engine
        .apply(&id, state.pipeline.permissions())
        .await?;
    Ok(Json(applied))
}

/// POST /recommendations/:id/dismiss
pub async fn dismiss_recommendation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<serde_json::Value>> {
    if state.engine.get(&id).is_none() {
        return Err(ServerError::NotFound(format!("no recommendation with id {}", id)));
    }
    state.engine.dismiss(&id)?;
    Ok(Json(json!({ "dismissed": id })))
}
