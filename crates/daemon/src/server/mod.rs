//! HTTP surface of the daemon.
//!
//! Two routers share one [`AppState`]:
//! - the client API ([`client_router`]), served on the public listener;
//! - the admin API ([`admin_router`]), served only on a loopback listener.

pub mod admin;
pub mod client;
pub mod error;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::approvals::ApprovalStore;
use crate::files::DirectoryBrowser;
use crate::policy::AccessPolicy;
use crate::session::SessionTable;
use crate::state::ShareState;

pub use error::{ApiError, ApiResult};

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub share: Arc<ShareState>,
    pub approvals: Arc<ApprovalStore>,
    pub sessions: Arc<SessionTable>,
    pub policy: AccessPolicy,
    pub browser: DirectoryBrowser,
}

impl AppState {
    /// Wire fresh approval and session stores to `share`.
    pub fn new(share: Arc<ShareState>, browser: DirectoryBrowser) -> Self {
        let approvals = Arc::new(ApprovalStore::new());
        let policy = AccessPolicy::new(Arc::clone(&share), Arc::clone(&approvals));
        Self {
            share,
            approvals,
            sessions: Arc::new(SessionTable::new()),
            policy,
            browser,
        }
    }
}

/// Routes offered to share clients.
pub fn client_router(state: AppState) -> Router {
    Router::new()
        .route("/api/login", post(client::login))
        .route("/api/logout", post(client::logout))
        .route("/api/status", get(client::status))
        .route("/api/files", get(client::list_files))
        .route("/api/requests", post(client::request_download))
        .route("/api/requests/{id}", get(client::check_request))
        .route("/api/download", get(client::download))
        .route("/api/preview", get(client::preview))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Routes offered to the local administrator.
pub fn admin_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/admin/api/status",
            get(admin::status).post(admin::update_config),
        )
        .route("/admin/api/logout_all", post(admin::logout_all))
        .route("/admin/api/requests", get(admin::list_pending))
        .route("/admin/api/decision", post(admin::decide))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
