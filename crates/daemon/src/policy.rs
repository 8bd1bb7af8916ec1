//! Authorization of file operations.
//!
//! [`AccessPolicy`] combines the share switches with the approval store to
//! decide whether a listing, preview, or download may proceed. Callers must
//! already hold an authorized session and a path that passed
//! [`PathResolver`](crate::files::PathResolver).

use std::sync::Arc;

use protocol::RequestId;

use crate::approvals::{ApprovalError, ApprovalStore};
use crate::error::{AccessError, AccessResult};
use crate::files::{normalize_relative, MAX_TEXT_PREVIEW_SIZE};
use crate::state::ShareState;

/// Why a download may go ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadGrant {
    /// Approval is not required.
    Direct,
    /// An approved request was redeemed for this download.
    Approved { request_id: RequestId },
}

/// Outcome of asking to download a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadTicket {
    /// Download straight away.
    Direct,
    /// Wait for the administrator to decide this request.
    Pending(RequestId),
}

/// Policy gate for listings, previews, and downloads.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    state: Arc<ShareState>,
    approvals: Arc<ApprovalStore>,
}

impl AccessPolicy {
    pub fn new(state: Arc<ShareState>, approvals: Arc<ApprovalStore>) -> Self {
        Self { state, approvals }
    }

    /// Listing is allowed whenever the share runs, paused or not.
    pub fn authorize_list(&self) -> AccessResult<()> {
        if !self.state.read()?.is_running {
            return Err(AccessError::ServerOffline);
        }
        Ok(())
    }

    /// Authorize downloading `file_path`, redeeming `token` if approval is
    /// required.
    ///
    /// A token issued for another file is consumed and then refused with
    /// `TokenMismatch`.
    pub fn authorize_download(
        &self,
        file_path: &str,
        token: Option<RequestId>,
    ) -> AccessResult<DownloadGrant> {
        let (paused, require_approval) = {
            let settings = self.state.read()?;
            (settings.is_paused, settings.require_approval)
        };

        if paused {
            return Err(AccessError::Paused);
        }
        if !require_approval {
            return Ok(DownloadGrant::Direct);
        }

        let request_id = token.ok_or(AccessError::NotApproved)?;
        let approved_path = match self.approvals.consume_if_approved(&request_id) {
            Ok(path) => path,
            Err(ApprovalError::NotApproved(_) | ApprovalError::NotFound(_)) => {
                tracing::warn!(request_id = %request_id, file = %file_path, "Download without approval refused");
                return Err(AccessError::NotApproved);
            }
            Err(e) => return Err(e.into()),
        };

        if normalize_relative(&approved_path)? != normalize_relative(file_path)? {
            tracing::warn!(
                request_id = %request_id,
                approved = %approved_path,
                requested = %file_path,
                "Approval token used for a different file"
            );
            return Err(AccessError::TokenMismatch);
        }

        Ok(DownloadGrant::Approved { request_id })
    }

    /// Ask to download `file_path`, opening an approval request if needed.
    pub fn request_download(&self, file_path: &str) -> AccessResult<DownloadTicket> {
        let (paused, require_approval) = {
            let settings = self.state.read()?;
            (settings.is_paused, settings.require_approval)
        };

        if paused {
            return Err(AccessError::Paused);
        }
        if !require_approval {
            return Ok(DownloadTicket::Direct);
        }

        let id = self.approvals.create(normalize_relative(file_path)?)?;
        Ok(DownloadTicket::Pending(id))
    }

    /// Previews are gated by switches only, never by approval tokens.
    pub fn authorize_preview(&self, file_path: &str) -> AccessResult<()> {
        let settings = self.state.read()?;

        if settings.is_paused {
            return Err(AccessError::Paused);
        }
        if !settings.enable_previews {
            return Err(AccessError::PreviewsDisabled);
        }
        if settings.require_approval && !settings.preview_bypasses_approval {
            tracing::debug!(file = %file_path, "Preview blocked while approval is required");
            return Err(AccessError::ApprovalRequired);
        }
        Ok(())
    }

    /// Refuse text previews over 1 MiB.
    pub fn check_text_preview_size(&self, len: u64) -> AccessResult<()> {
        if len > MAX_TEXT_PREVIEW_SIZE {
            return Err(AccessError::TooLarge {
                size: len,
                limit: MAX_TEXT_PREVIEW_SIZE,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ShareSettings;
    use protocol::messages::ConfigUpdate;
    use protocol::Decision;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        state: Arc<ShareState>,
        approvals: Arc<ApprovalStore>,
        policy: AccessPolicy,
    }

    fn fixture(update: ConfigUpdate) -> Fixture {
        let dir = TempDir::new().unwrap();
        let state = Arc::new(ShareState::new(
            ShareSettings::new(dir.path(), "pw").unwrap(),
        ));
        state.update(update).unwrap();
        let approvals = Arc::new(ApprovalStore::new());
        let policy = AccessPolicy::new(Arc::clone(&state), Arc::clone(&approvals));
        Fixture {
            _dir: dir,
            state,
            approvals,
            policy,
        }
    }

    fn approval_required() -> ConfigUpdate {
        ConfigUpdate {
            require_approval: Some(true),
            ..Default::default()
        }
    }

    #[test]
    fn test_list_allowed_while_paused() {
        let f = fixture(ConfigUpdate {
            is_paused: Some(true),
            require_approval: Some(true),
            ..Default::default()
        });
        assert!(f.policy.authorize_list().is_ok());
    }

    #[test]
    fn test_list_refused_when_stopped() {
        let f = fixture(ConfigUpdate {
            is_running: Some(false),
            ..Default::default()
        });
        assert!(matches!(
            f.policy.authorize_list(),
            Err(AccessError::ServerOffline)
        ));
    }

    #[test]
    fn test_direct_download_without_approval() {
        let f = fixture(ConfigUpdate::default());
        assert_eq!(
            f.policy.authorize_download("a.txt", None).unwrap(),
            DownloadGrant::Direct
        );
        assert_eq!(
            f.policy.request_download("a.txt").unwrap(),
            DownloadTicket::Direct
        );
        assert!(f.approvals.is_empty().unwrap());
    }

    #[test]
    fn test_paused_denies_download_and_preview() {
        for require_approval in [false, true] {
            for enable_previews in [false, true] {
                let f = fixture(ConfigUpdate {
                    is_paused: Some(true),
                    require_approval: Some(require_approval),
                    enable_previews: Some(enable_previews),
                    preview_bypasses_approval: Some(true),
                    ..Default::default()
                });
                assert!(matches!(
                    f.policy.authorize_download("a.txt", None),
                    Err(AccessError::Paused)
                ));
                assert!(matches!(
                    f.policy.authorize_preview("a.txt"),
                    Err(AccessError::Paused)
                ));
                assert!(matches!(
                    f.policy.request_download("a.txt"),
                    Err(AccessError::Paused)
                ));
            }
        }
    }

    #[test]
    fn test_download_without_token_not_approved() {
        let f = fixture(approval_required());
        assert!(matches!(
            f.policy.authorize_download("a.txt", None),
            Err(AccessError::NotApproved)
        ));
    }

    #[test]
    fn test_pending_and_unknown_tokens_not_approved() {
        let f = fixture(approval_required());
        let DownloadTicket::Pending(id) = f.policy.request_download("a.txt").unwrap() else {
            panic!("expected a pending ticket");
        };

        assert!(matches!(
            f.policy.authorize_download("a.txt", Some(id)),
            Err(AccessError::NotApproved)
        ));
        assert!(matches!(
            f.policy
                .authorize_download("a.txt", Some(RequestId::generate())),
            Err(AccessError::NotApproved)
        ));
    }

    #[test]
    fn test_approved_token_redeemed_once() {
        let f = fixture(approval_required());
        let DownloadTicket::Pending(id) = f.policy.request_download("docs/a.txt").unwrap() else {
            panic!("expected a pending ticket");
        };
        f.approvals.decide(&id, Decision::Approved).unwrap();

        assert_eq!(
            f.policy.authorize_download("docs/a.txt", Some(id)).unwrap(),
            DownloadGrant::Approved { request_id: id }
        );
        assert!(matches!(
            f.policy.authorize_download("docs/a.txt", Some(id)),
            Err(AccessError::NotApproved)
        ));
    }

    #[test]
    fn test_rejected_token_not_approved() {
        let f = fixture(approval_required());
        let id = f.approvals.create("a.txt").unwrap();
        f.approvals.decide(&id, Decision::Rejected).unwrap();
        assert!(matches!(
            f.policy.authorize_download("a.txt", Some(id)),
            Err(AccessError::NotApproved)
        ));
    }

    #[test]
    fn test_token_for_other_file_mismatch() {
        let f = fixture(approval_required());
        let id = f.approvals.create("a.txt").unwrap();
        f.approvals.decide(&id, Decision::Approved).unwrap();

        assert!(matches!(
            f.policy.authorize_download("b.txt", Some(id)),
            Err(AccessError::TokenMismatch)
        ));
        // Consumed by the mismatched attempt.
        assert!(f.approvals.peek(&id).is_err());
    }

    #[test]
    fn test_token_matches_after_separator_normalization() {
        let f = fixture(approval_required());
        let DownloadTicket::Pending(id) = f.policy.request_download("docs\\a.txt").unwrap() else {
            panic!("expected a pending ticket");
        };
        assert_eq!(f.approvals.peek(&id).unwrap().file_path, "docs/a.txt");
        f.approvals.decide(&id, Decision::Approved).unwrap();

        assert!(f.policy.authorize_download("/docs/./a.txt", Some(id)).is_ok());
    }

    #[test]
    fn test_previews_disabled_even_without_approval() {
        let f = fixture(ConfigUpdate {
            enable_previews: Some(false),
            require_approval: Some(false),
            ..Default::default()
        });
        assert!(matches!(
            f.policy.authorize_preview("a.txt"),
            Err(AccessError::PreviewsDisabled)
        ));
    }

    #[test]
    fn test_preview_with_approval_required() {
        let f = fixture(approval_required());
        assert!(matches!(
            f.policy.authorize_preview("a.txt"),
            Err(AccessError::ApprovalRequired)
        ));

        f.state
            .update(ConfigUpdate {
                preview_bypasses_approval: Some(true),
                ..Default::default()
            })
            .unwrap();
        assert!(f.policy.authorize_preview("a.txt").is_ok());
        assert!(f.approvals.is_empty().unwrap());
    }

    #[test]
    fn test_preview_allowed_by_default() {
        let f = fixture(ConfigUpdate::default());
        assert!(f.policy.authorize_preview("a.txt").is_ok());
    }

    #[test]
    fn test_text_preview_size() {
        let f = fixture(ConfigUpdate::default());
        assert!(f
            .policy
            .check_text_preview_size(MAX_TEXT_PREVIEW_SIZE)
            .is_ok());
        assert!(matches!(
            f.policy.check_text_preview_size(MAX_TEXT_PREVIEW_SIZE + 1),
            Err(AccessError::TooLarge { .. })
        ));
    }
}
