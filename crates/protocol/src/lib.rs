//! # ShareGate Protocol Library
//!
//! Wire definitions shared by the ShareGate daemon and its clients.
//!
//! ## Overview
//!
//! ShareGate exposes two HTTP+JSON surfaces:
//!
//! - **Client API**: login, directory listing, download requests, previews
//! - **Admin API**: live configuration, forced logout, approval decisions
//!
//! This crate holds the request and response bodies for both, the opaque
//! identifier types that travel over the wire, and the error codes a client
//! uses to tell a redirect-to-login apart from a policy denial.
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{ErrorBody, ErrorCode, RequestId};
//!
//! let id = RequestId::generate();
//! let parsed: RequestId = id.to_string().parse().unwrap();
//! assert_eq!(id, parsed);
//!
//! let body = ErrorBody::new(ErrorCode::NotApproved, "download not approved");
//! let json = serde_json::to_string(&body).unwrap();
//! assert!(json.contains("\"not_approved\""));
//! ```
//!
//! ## Modules
//!
//! - [`ids`]: Request identifiers, epoch and config-version tokens
//! - [`messages`]: Client and admin API bodies
//! - [`error`]: Error codes and error bodies

pub mod error;
pub mod ids;
pub mod messages;

pub use error::{ErrorBody, ErrorCode, ProtocolError};
pub use ids::{ConfigVersion, RequestId, SessionEpoch};
pub use messages::{Decision, RequestStatus, API_VERSION};
