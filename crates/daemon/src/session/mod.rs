//! Client session module.
//!
//! This module provides login, epoch-based session validation, and the
//! server-side table that maps cookie tokens to sessions.

pub mod guard;
pub mod table;

pub use guard::{AuthOutcome, ClientSession, SessionGuard};
pub use table::{SessionTable, SessionToken, REVOKED_SESSION_GRACE, SESSION_COOKIE};
