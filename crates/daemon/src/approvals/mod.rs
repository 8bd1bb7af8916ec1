//! Download approval module.
//!
//! This module tracks download requests through their lifecycle:
//! pending, then approved or rejected, then consumed by a single download.

pub mod store;

pub use store::{ApprovalError, ApprovalStore, DownloadRequest};
