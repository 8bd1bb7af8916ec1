//! HTTP API bodies for ShareGate.
//!
//! Every type here is serialized as JSON. Field names follow the snake_case
//! spelling the browser front-end already speaks (`req_id`, `folder_path`,
//! `force_logout`).

use serde::{Deserialize, Serialize};

use crate::ids::{ConfigVersion, RequestId};

/// Current API version, reported by the status endpoints.
pub const API_VERSION: u8 = 1;

/// Lifecycle state of a download request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Waiting for an administrator.
    Pending,
    /// Approved; the request id can be redeemed once.
    Approved,
    /// Rejected; never redeemable.
    Rejected,
}

impl RequestStatus {
    /// Returns the wire spelling of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An administrator's verdict on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    #[serde(alias = "approve")]
    Approved,
    #[serde(alias = "reject", alias = "denied", alias = "deny")]
    Rejected,
}

impl From<Decision> for RequestStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approved => RequestStatus::Approved,
            Decision::Rejected => RequestStatus::Rejected,
        }
    }
}

// ============================================================================
// Client API
// ============================================================================

/// `POST /api/login`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

/// `GET /api/status`, polled by the browser every few seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStatus {
    /// Downloads and previews are currently refused.
    pub paused: bool,
    /// The share is accepting logins.
    pub running: bool,
    /// The caller's session was revoked by an administrator.
    pub force_logout: bool,
    /// Changes whenever the shared root changes.
    pub config_id: ConfigVersion,
    /// Previews are offered at all.
    pub previews: bool,
}

/// Query string of `GET /api/files`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    /// Directory relative to the shared root; empty for the root itself.
    #[serde(default)]
    pub path: String,
}

/// A sub-directory in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    pub name: String,
    /// Path relative to the shared root, `/`-separated.
    pub path: String,
}

/// A file in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    /// Path relative to the shared root, `/`-separated.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// Size formatted for display (`"1.5 MB"`).
    pub size_display: String,
    /// Last modification, seconds since the Unix epoch.
    pub modified: u64,
    /// Whether `GET /api/preview` can render this file.
    pub previewable: bool,
}

/// Response of `GET /api/files`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    /// The listed directory relative to the root.
    pub current_path: String,
    /// Parent of `current_path`, `None` at the root.
    pub parent: Option<String>,
    pub folders: Vec<FolderEntry>,
    pub files: Vec<FileEntry>,
}

/// `POST /api/requests`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequestBody {
    /// File relative to the shared root.
    #[serde(alias = "filename")]
    pub path: String,
}

/// Response of `POST /api/requests`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DownloadTicketResponse {
    /// No approval needed; fetch `direct_link` straight away.
    Approved { direct_link: String },
    /// Poll `GET /api/requests/{req_id}` until decided.
    Pending { req_id: RequestId },
}

/// Response of `GET /api/requests/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCheck {
    pub status: RequestStatus,
    /// Download link carrying the approval token, present once approved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Query string of `GET /api/download`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadQuery {
    #[serde(alias = "filename")]
    pub path: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// Query string of `GET /api/preview`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewQuery {
    pub path: String,
}

// ============================================================================
// Admin API
// ============================================================================

/// Live configuration as shown to the administrator.
///
/// The password is deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub folder_path: String,
    pub is_running: bool,
    pub is_paused: bool,
    pub require_approval: bool,
    pub enable_previews: bool,
    pub preview_bypasses_approval: bool,
    pub config_id: ConfigVersion,
}

/// Response of `GET /admin/api/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminStatus {
    pub api_version: u8,
    pub config: ConfigSnapshot,
    pub pending_count: usize,
    pub active_sessions: usize,
}

/// `POST /admin/api/status`. Every field is optional; absent fields keep
/// their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_running: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_paused: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_approval: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_previews: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_bypasses_approval: Option<bool>,
}

impl ConfigUpdate {
    /// True when the update carries no field at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A pending request as listed for the administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub req_id: RequestId,
    pub file: String,
    /// Creation time, seconds since the Unix epoch.
    pub timestamp: u64,
}

/// `POST /admin/api/decision`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub req_id: RequestId,
    pub decision: Decision,
}

/// Generic acknowledgement used by admin mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Ack {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }
}
