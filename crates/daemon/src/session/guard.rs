//! Session validation against the live epoch.
//!
//! A session records the epoch it was issued under. Replacing the epoch in
//! [`ShareSettings`] revokes every earlier session at once without
//! enumerating them; the next use of a revoked session reports
//! [`AuthOutcome::ForcedLogout`] and clears it.

use constant_time_eq::constant_time_eq;
use protocol::SessionEpoch;

use crate::error::{AccessError, AccessResult};
use crate::state::ShareSettings;

/// Per-client login state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientSession {
    /// A login succeeded and has not been cleared.
    pub authenticated: bool,
    /// Epoch captured at login.
    pub epoch_at_login: Option<SessionEpoch>,
}

impl ClientSession {
    /// A session that never logged in.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Forget the login.
    pub fn clear(&mut self) {
        self.authenticated = false;
        self.epoch_at_login = None;
    }
}

/// Result of checking a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Authorized,
    /// Never logged in, already cleared, or the share is stopped.
    Unauthenticated,
    /// Revoked by the administrator; reported once, then cleared.
    ForcedLogout,
}

impl AuthOutcome {
    /// Turn a non-authorized outcome into the matching error.
    pub fn into_result(self) -> AccessResult<()> {
        match self {
            Self::Authorized => Ok(()),
            Self::Unauthenticated => Err(AccessError::Unauthenticated),
            Self::ForcedLogout => Err(AccessError::ForcedLogout),
        }
    }
}

/// Stateless session checks.
pub struct SessionGuard;

impl SessionGuard {
    /// Check `session` against `settings`.
    ///
    /// While the share is stopped every session is unauthenticated, but the
    /// session itself is kept so it works again once the share restarts.
    pub fn authorize(session: &mut ClientSession, settings: &ShareSettings) -> AuthOutcome {
        if !session.authenticated {
            return AuthOutcome::Unauthenticated;
        }
        if !settings.is_running {
            return AuthOutcome::Unauthenticated;
        }
        if session.epoch_at_login != Some(settings.session_epoch) {
            session.clear();
            return AuthOutcome::ForcedLogout;
        }
        AuthOutcome::Authorized
    }

    /// Log in with `attempt`.
    ///
    /// The epoch is taken from the same `settings` borrow as the password,
    /// so a caller holding the read lock cannot capture a stale epoch.
    pub fn login(attempt: &str, settings: &ShareSettings) -> AccessResult<ClientSession> {
        if !settings.is_running {
            return Err(AccessError::ServerOffline);
        }
        if !constant_time_eq(attempt.as_bytes(), settings.password.as_bytes()) {
            tracing::warn!("Rejected login with wrong password");
            return Err(AccessError::InvalidCredentials);
        }

        Ok(ClientSession {
            authenticated: true,
            epoch_at_login: Some(settings.session_epoch),
        })
    }
}
