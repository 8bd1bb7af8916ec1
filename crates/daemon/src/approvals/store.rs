//! In-memory store of download requests awaiting or holding approval.
//!
//! When downloads require approval, each download attempt first creates a
//! request in the `pending` state. An administrator approves or rejects it;
//! an approved request can then be redeemed exactly once, which removes it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime};

use protocol::messages::PendingRequest;
use protocol::{Decision, RequestId, RequestStatus};
use thiserror::Error;

/// Errors returned by the approval store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    /// No request with this id (never created, consumed, or expired).
    #[error("request {0} not found")]
    NotFound(RequestId),

    /// The request exists but is not approved.
    #[error("request {0} is not approved")]
    NotApproved(RequestId),

    /// A different decision was already recorded.
    #[error("request {id} was already {status}")]
    AlreadyDecided { id: RequestId, status: RequestStatus },

    /// The store lock was poisoned by a panicking thread.
    #[error("approval store lock poisoned")]
    LockPoisoned,
}

/// A download request tracked by the store.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// Unique id; also the one-time approval token.
    pub id: RequestId,
    /// File path relative to the shared root, already validated.
    pub file_path: String,
    /// Current status.
    pub status: RequestStatus,
    /// Wall-clock creation time, for display.
    pub created_at: SystemTime,
    /// Monotonic creation time.
    requested_at: Instant,
    /// Monotonic time of the administrator's decision.
    decided_at: Option<Instant>,
    /// Insertion order, for display.
    seq: u64,
}

impl DownloadRequest {
    fn new(file_path: String, seq: u64) -> Self {
        Self {
            id: RequestId::generate(),
            file_path,
            status: RequestStatus::Pending,
            created_at: SystemTime::now(),
            requested_at: Instant::now(),
            decided_at: None,
            seq,
        }
    }

    /// How long ago the request was created.
    pub fn age(&self) -> Duration {
        self.requested_at.elapsed()
    }

    /// Time since the last status change. Expiry is measured from here, so a
    /// fresh approval gets the full lifetime.
    pub fn idle(&self) -> Duration {
        self.decided_at.unwrap_or(self.requested_at).elapsed()
    }

    /// Creation time as seconds since the Unix epoch.
    pub fn timestamp(&self) -> u64 {
        self.created_at
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// View shown to the administrator.
    pub fn to_pending(&self) -> PendingRequest {
        PendingRequest {
            req_id: self.id,
            file: self.file_path.clone(),
            timestamp: self.timestamp(),
        }
    }
}

#[derive(Debug, Default)]
struct RequestTable {
    entries: HashMap<RequestId, DownloadRequest>,
    next_seq: u64,
}

/// Thread-safe store of download requests.
///
/// A single mutex guards the table, so check-and-remove in
/// [`consume_if_approved`](Self::consume_if_approved) is atomic: for a given
/// approved id exactly one caller wins.
#[derive(Debug, Default)]
pub struct ApprovalStore {
    requests: Mutex<RequestTable>,
}

impl ApprovalStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> Result<std::sync::MutexGuard<'_, RequestTable>, ApprovalError> {
        self.requests.lock().map_err(|_| ApprovalError::LockPoisoned)
    }

    /// Creates a pending request for `file_path` and returns its id.
    pub fn create(&self, file_path: impl Into<String>) -> Result<RequestId, ApprovalError> {
        let mut table = self.table()?;

        let seq = table.next_seq;
        table.next_seq += 1;

        let request = DownloadRequest::new(file_path.into(), seq);
        let id = request.id;

        tracing::info!(request_id = %id, file = %request.file_path, "Download request pending approval");

        table.entries.insert(id, request);
        Ok(id)
    }

    /// Records an administrator's decision.
    ///
    /// A pending request takes the decision. Repeating the decision already
    /// recorded is a no-op; a conflicting decision is refused with
    /// `AlreadyDecided`.
    pub fn decide(&self, id: &RequestId, decision: Decision) -> Result<RequestStatus, ApprovalError> {
        let mut table = self.table()?;

        let request = table
            .entries
            .get_mut(id)
            .ok_or(ApprovalError::NotFound(*id))?;

        let new_status = RequestStatus::from(decision);
        match request.status {
            RequestStatus::Pending => {
                tracing::info!(
                    request_id = %id,
                    file = %request.file_path,
                    status = ?new_status,
                    "Download request decided"
                );
                request.status = new_status;
                request.decided_at = Some(Instant::now());
                Ok(new_status)
            }
            current if current == new_status => Ok(current),
            current => {
                tracing::warn!(
                    request_id = %id,
                    current = ?current,
                    attempted = ?new_status,
                    "Refused conflicting decision"
                );
                Err(ApprovalError::AlreadyDecided {
                    id: *id,
                    status: current,
                })
            }
        }
    }

    /// Returns a copy of the request without consuming it.
    pub fn peek(&self, id: &RequestId) -> Result<DownloadRequest, ApprovalError> {
        let table = self.table()?;
        table
            .entries
            .get(id)
            .cloned()
            .ok_or(ApprovalError::NotFound(*id))
    }

    /// Removes an approved request and returns its file path.
    ///
    /// Pending and rejected requests are left in place and reported as
    /// `NotApproved`.
    pub fn consume_if_approved(&self, id: &RequestId) -> Result<String, ApprovalError> {
        let mut table = self.table()?;

        match table.entries.get(id).map(|r| r.status) {
            None => Err(ApprovalError::NotFound(*id)),
            Some(RequestStatus::Approved) => {
                let request = table
                    .entries
                    .remove(id)
                    .ok_or(ApprovalError::NotFound(*id))?;
                tracing::info!(request_id = %id, file = %request.file_path, "Approval token redeemed");
                Ok(request.file_path)
            }
            Some(_) => Err(ApprovalError::NotApproved(*id)),
        }
    }

    /// Lists pending requests in creation order.
    pub fn list_pending(&self) -> Result<Vec<DownloadRequest>, ApprovalError> {
        let table = self.table()?;
        let mut pending: Vec<DownloadRequest> = table
            .entries
            .values()
            .filter(|r| r.status == RequestStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.seq);
        Ok(pending)
    }

    /// Returns the number of pending requests.
    pub fn pending_count(&self) -> Result<usize, ApprovalError> {
        let table = self.table()?;
        Ok(table
            .entries
            .values()
            .filter(|r| r.status == RequestStatus::Pending)
            .count())
    }

    /// Returns the number of tracked requests in any state.
    pub fn len(&self) -> Result<usize, ApprovalError> {
        Ok(self.table()?.entries.len())
    }

    /// Returns true if no requests are tracked.
    pub fn is_empty(&self) -> Result<bool, ApprovalError> {
        Ok(self.len()? == 0)
    }

    /// Removes requests whose status has not changed for `ttl`, whatever
    /// that status is.
    ///
    /// Returns the ids that were removed.
    pub fn cleanup_expired(&self, ttl: Duration) -> Result<Vec<RequestId>, ApprovalError> {
        let mut table = self.table()?;
        let mut expired = Vec::new();

        table.entries.retain(|id, request| {
            if request.idle() >= ttl {
                expired.push(*id);
                false
            } else {
                true
            }
        });

        if !expired.is_empty() {
            tracing::info!("Removed {} expired download requests", expired.len());
        }

        Ok(expired)
    }
}
