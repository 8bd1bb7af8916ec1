//! Admin API handlers.
//!
//! Reachable only through the loopback listener.

use axum::extract::State;
use axum::Json;
use protocol::messages::{Ack, AdminStatus, ConfigUpdate, DecisionRequest, PendingRequest};
use protocol::API_VERSION;

use super::{ApiResult, AppState};

fn admin_status(state: &AppState) -> ApiResult<AdminStatus> {
    Ok(AdminStatus {
        api_version: API_VERSION,
        config: state.share.snapshot()?,
        pending_count: state.approvals.pending_count()?,
        active_sessions: state.sessions.len(),
    })
}

/// `GET /admin/api/status`
pub async fn status(State(state): State<AppState>) -> ApiResult<Json<AdminStatus>> {
    Ok(Json(admin_status(&state)?))
}

/// `POST /admin/api/status`
pub async fn update_config(
    State(state): State<AppState>,
    Json(update): Json<ConfigUpdate>,
) -> ApiResult<Json<AdminStatus>> {
    if !update.is_empty() {
        state.share.update(update)?;
    }
    Ok(Json(admin_status(&state)?))
}

/// `POST /admin/api/logout_all`
pub async fn logout_all(State(state): State<AppState>) -> ApiResult<Json<Ack>> {
    state.share.force_logout_all()?;
    Ok(Json(Ack::with_message("all clients logged out")))
}

/// `GET /admin/api/requests`
pub async fn list_pending(State(state): State<AppState>) -> ApiResult<Json<Vec<PendingRequest>>> {
    let pending = state
        .approvals
        .list_pending()?
        .iter()
        .map(|r| r.to_pending())
        .collect();
    Ok(Json(pending))
}

/// `POST /admin/api/decision`
pub async fn decide(
    State(state): State<AppState>,
    Json(body): Json<DecisionRequest>,
) -> ApiResult<Json<Ack>> {
    let status = state.approvals.decide(&body.req_id, body.decision)?;
    Ok(Json(Ack::with_message(format!(
        "request {} is {status}",
        body.req_id
    ))))
}
