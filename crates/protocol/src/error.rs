//! Error types for the protocol crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Protocol error type for malformed wire input.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// An identifier could not be parsed.
    #[error("invalid {kind}: {reason}")]
    InvalidIdentifier {
        /// Which identifier was being parsed.
        kind: &'static str,
        /// Parser message.
        reason: String,
    },
}

/// Machine-readable failure code returned in every error body.
///
/// Clients branch on this value: the two session codes mean "go back to the
/// login page", the policy codes mean "show the reason", and `not_found`
/// means the path or request no longer exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Session
    Unauthenticated,
    ForcedLogout,
    InvalidCredentials,
    ServerOffline,

    // Path
    PathTraversal,
    NotFound,

    // Policy
    Paused,
    PreviewsDisabled,
    ApprovalRequired,
    NotApproved,
    TokenMismatch,
    TooLarge,
    AlreadyDecided,

    // Request shape
    BadRequest,

    Internal,
}

impl ErrorCode {
    /// Returns the wire spelling of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::ForcedLogout => "forced_logout",
            Self::InvalidCredentials => "invalid_credentials",
            Self::ServerOffline => "server_offline",
            Self::PathTraversal => "path_traversal",
            Self::NotFound => "not_found",
            Self::Paused => "paused",
            Self::PreviewsDisabled => "previews_disabled",
            Self::ApprovalRequired => "approval_required",
            Self::NotApproved => "not_approved",
            Self::TokenMismatch => "token_mismatch",
            Self::TooLarge => "too_large",
            Self::AlreadyDecided => "already_decided",
            Self::BadRequest => "bad_request",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Failure code.
    pub error: ErrorCode,
    /// Human-readable detail.
    pub message: String,
}

impl ErrorBody {
    /// Create a new error body.
    pub fn new(error: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error,
            message: message.into(),
        }
    }
}
