//! # ShareGate Daemon Library
//!
//! This crate provides the daemon that shares one folder over HTTP to
//! clients holding a shared password.
//!
//! ## Overview
//!
//! - **Sessions**: password login, revocable all at once by replacing the
//!   session epoch
//! - **Path containment**: every client path is resolved inside the shared
//!   root; traversal and symlink escapes are refused
//! - **Download approval**: with approval required, each download is a
//!   pending request that the administrator approves or rejects, and an
//!   approved request can be redeemed exactly once
//! - **Switches**: pause, preview enable, preview bypass
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Daemon Orchestrator                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────┐        ┌──────────────────────────┐  │
//! │  │  Client API (public) │        │  Admin API (loopback)    │  │
//! │  └──────────────────────┘        └──────────────────────────┘  │
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────┐  │
//! │  │ SessionTable │  │ AccessPolicy │  │    ApprovalStore     │  │
//! │  │ SessionGuard │  │              │  │                      │  │
//! │  └──────────────┘  └──────────────┘  └──────────────────────┘  │
//! │                                                                 │
//! │  ┌────────────────────────────┐  ┌───────────────────────────┐ │
//! │  │ ShareState (live settings) │  │ PathResolver / Browser    │ │
//! │  └────────────────────────────┘  └───────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sharegate::{Config, DaemonOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = Config::load_default()?;
//!     config.apply_env_overrides();
//!
//!     let mut orchestrator = DaemonOrchestrator::new(config)?;
//!     orchestrator.start().await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!
//!     orchestrator.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`state`]: Live share settings
//! - [`session`]: Login and session validation
//! - [`approvals`]: Download request lifecycle
//! - [`policy`]: Authorization of listings, previews, and downloads
//! - [`files`]: Path containment, listing, previews
//! - [`server`]: HTTP routers and handlers
//! - [`orchestrator`]: Main daemon coordinator

pub mod approvals;
pub mod config;
pub mod error;
pub mod files;
pub mod orchestrator;
pub mod policy;
pub mod server;
pub mod session;
pub mod state;

// Re-export protocol for convenience
pub use protocol;

pub use approvals::{ApprovalError, ApprovalStore, DownloadRequest};
pub use config::Config;
pub use error::{AccessError, AccessResult};
pub use files::{DirectoryBrowser, PathResolver, ResolveError};
pub use orchestrator::{DaemonOrchestrator, OrchestratorEvent, OrchestratorState};
pub use policy::{AccessPolicy, DownloadGrant, DownloadTicket};
pub use server::{admin_router, client_router, AppState};
pub use session::{AuthOutcome, ClientSession, SessionGuard, SessionTable, SessionToken};
pub use state::{ShareSettings, ShareState};
