//! Access-control error taxonomy.
//!
//! Every authorization and path-resolution failure surfaces as a distinct
//! [`AccessError`] variant so the HTTP layer can choose between a redirect to
//! login, a 403 with a reason, or a 404.

use protocol::ErrorCode;
use thiserror::Error;

use crate::approvals::ApprovalError;
use crate::files::{BrowserError, PreviewError, ResolveError};

/// Errors produced by the access-control engine.
#[derive(Debug, Error)]
pub enum AccessError {
    /// No valid login, or the share is stopped.
    #[error("not logged in")]
    Unauthenticated,

    /// The session predates the current epoch.
    #[error("logged out by the administrator")]
    ForcedLogout,

    /// The path escapes the shared root.
    #[error("path escapes the shared folder: {0}")]
    PathTraversal(String),

    /// The path or request does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The share is not accepting logins.
    #[error("server is currently offline")]
    ServerOffline,

    /// Downloads and previews are paused.
    #[error("server is paused")]
    Paused,

    /// Previews are switched off.
    #[error("previews are disabled")]
    PreviewsDisabled,

    /// Previews are blocked while downloads need approval.
    #[error("previews are unavailable while downloads require approval")]
    ApprovalRequired,

    /// No approved request backs this download.
    #[error("access denied: download not approved")]
    NotApproved,

    /// The approval token was issued for a different file.
    #[error("approval token does not match the requested file")]
    TokenMismatch,

    /// The content exceeds the preview limit.
    #[error("content too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    /// Wrong password.
    #[error("invalid password")]
    InvalidCredentials,

    /// A conflicting decision was submitted for an already-decided request.
    #[error("request {0} has already been decided")]
    AlreadyDecided(String),

    /// Malformed input from the caller.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Lock poisoning or an unexpected I/O failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AccessError {
    /// Wire code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Unauthenticated => ErrorCode::Unauthenticated,
            Self::ForcedLogout => ErrorCode::ForcedLogout,
            Self::PathTraversal(_) => ErrorCode::PathTraversal,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::ServerOffline => ErrorCode::ServerOffline,
            Self::Paused => ErrorCode::Paused,
            Self::PreviewsDisabled => ErrorCode::PreviewsDisabled,
            Self::ApprovalRequired => ErrorCode::ApprovalRequired,
            Self::NotApproved => ErrorCode::NotApproved,
            Self::TokenMismatch => ErrorCode::TokenMismatch,
            Self::TooLarge { .. } => ErrorCode::TooLarge,
            Self::InvalidCredentials => ErrorCode::InvalidCredentials,
            Self::AlreadyDecided(_) => ErrorCode::AlreadyDecided,
            Self::BadRequest(_) => ErrorCode::BadRequest,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    pub(crate) fn lock_poisoned(what: &str) -> Self {
        Self::Internal(format!("lock poisoned: {what}"))
    }
}

impl From<ResolveError> for AccessError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::PathTraversal(p) => Self::PathTraversal(p),
            ResolveError::NotFound(p) => Self::NotFound(p),
            ResolveError::Io(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<BrowserError> for AccessError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::Resolve(e) => e.into(),
            BrowserError::NotADirectory(p) => Self::NotFound(format!("{p} is not a directory")),
            BrowserError::Io(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<PreviewError> for AccessError {
    fn from(err: PreviewError) -> Self {
        match err {
            PreviewError::Unsupported(name) => {
                Self::BadRequest(format!("{name} cannot be previewed"))
            }
            PreviewError::TooLarge { size, limit } => Self::TooLarge { size, limit },
            PreviewError::Io(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<ApprovalError> for AccessError {
    fn from(err: ApprovalError) -> Self {
        match err {
            ApprovalError::NotFound(id) => Self::NotFound(format!("request {id}")),
            ApprovalError::NotApproved(_) => Self::NotApproved,
            ApprovalError::AlreadyDecided { id, .. } => Self::AlreadyDecided(id.to_string()),
            ApprovalError::LockPoisoned => Self::lock_poisoned("approval store"),
        }
    }
}

/// Result alias for access-control operations.
pub type AccessResult<T> = Result<T, AccessError>;

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{RequestId, RequestStatus};

    #[test]
    fn test_resolve_errors_stay_distinguishable() {
        let traversal: AccessError = ResolveError::PathTraversal("../x".into()).into();
        assert_eq!(traversal.code(), ErrorCode::PathTraversal);

        let missing: AccessError = ResolveError::NotFound("x".into()).into();
        assert_eq!(missing.code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_approval_errors_map_to_policy_codes() {
        let id = RequestId::generate();
        let err: AccessError = ApprovalError::NotApproved(id).into();
        assert_eq!(err.code(), ErrorCode::NotApproved);

        let err: AccessError = ApprovalError::AlreadyDecided {
            id,
            status: RequestStatus::Rejected,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::AlreadyDecided);

        let err: AccessError = ApprovalError::NotFound(id).into();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_browser_io_failure_is_local() {
        let err: AccessError = BrowserError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ))
        .into();
        assert_eq!(err.code(), ErrorCode::Internal);
    }

    #[test]
    fn test_preview_too_large_maps() {
        let err: AccessError = PreviewError::TooLarge { size: 10, limit: 5 }.into();
        assert_eq!(err.code(), ErrorCode::TooLarge);
    }

    #[test]
    fn test_too_large_message() {
        let err = AccessError::TooLarge {
            size: 2_000_000,
            limit: 1_048_576,
        };
        assert_eq!(
            err.to_string(),
            "content too large: 2000000 bytes exceeds limit of 1048576 bytes"
        );
    }
}
