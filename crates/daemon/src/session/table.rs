//! Server-side table of browser sessions.
//!
//! Browsers hold only an opaque random token in a cookie; the
//! [`ClientSession`] it refers to lives here.

use std::fmt;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use protocol::SessionEpoch;
use rand::RngCore;

use super::guard::{AuthOutcome, ClientSession, SessionGuard};
use crate::state::ShareSettings;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "sharegate_session";

const TOKEN_BYTES: usize = 32;

/// Opaque cookie value identifying a session.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// A fresh token of 32 random bytes, hex-encoded.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wrap a token read from a cookie.
    pub fn from_cookie(value: &str) -> Self {
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens are credentials; keep them out of logs.
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

/// How long a session revoked by a forced logout is kept so its owner can
/// still be told about the logout.
pub const REVOKED_SESSION_GRACE: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug)]
struct SessionEntry {
    session: ClientSession,
    /// First sweep that found this session under an old epoch.
    revoked_seen_at: Option<Instant>,
}

/// Concurrent map from token to session.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: DashMap<SessionToken, SessionEntry>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `session` under a new token.
    pub fn insert(&self, session: ClientSession) -> SessionToken {
        let token = SessionToken::generate();
        self.sessions.insert(
            token.clone(),
            SessionEntry {
                session,
                revoked_seen_at: None,
            },
        );
        tracing::debug!(active = self.sessions.len(), "Client session created");
        token
    }

    /// Check the session behind `token`.
    ///
    /// Unknown tokens are unauthenticated. A forced logout clears and drops
    /// the entry, so the following call reports `Unauthenticated`.
    pub fn authorize(&self, token: &SessionToken, settings: &ShareSettings) -> AuthOutcome {
        let outcome = match self.sessions.get_mut(token) {
            Some(mut entry) => SessionGuard::authorize(&mut entry.session, settings),
            None => return AuthOutcome::Unauthenticated,
        };

        if outcome == AuthOutcome::ForcedLogout {
            self.sessions.remove(token);
            tracing::debug!("Dropped revoked client session");
        }
        outcome
    }

    /// Remove a session on logout. Returns true if it existed.
    pub fn remove(&self, token: &SessionToken) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions not issued under `epoch`. Returns how many were dropped.
    ///
    /// A revoked session has not yet reported its forced logout, so the
    /// first pass that sees it only marks it. It is dropped by a later pass
    /// once `grace` has elapsed since the mark.
    pub fn purge_stale(&self, epoch: SessionEpoch, grace: Duration) -> usize {
        let before = self.sessions.len();
        let now = Instant::now();
        self.sessions.retain(|_, entry| {
            if !entry.session.authenticated {
                return false;
            }
            if entry.session.epoch_at_login == Some(epoch) {
                return true;
            }
            match entry.revoked_seen_at {
                None => {
                    entry.revoked_seen_at = Some(now);
                    true
                }
                Some(seen) => now.duration_since(seen) < grace,
            }
        });
        let purged = before.saturating_sub(self.sessions.len());
        if purged > 0 {
            tracing::info!("Purged {} stale client sessions", purged);
        }
        purged
    }
}
