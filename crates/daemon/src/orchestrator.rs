//! Daemon orchestrator for wiring together all components.
//!
//! This module provides the `DaemonOrchestrator` that builds the shared state
//! from configuration, binds the client and admin listeners, runs the
//! expiry sweep, and coordinates graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::files::DirectoryBrowser;
use crate::server::{admin_router, client_router, AppState};
use crate::session::REVOKED_SESSION_GRACE;
use crate::state::ShareState;

/// Daemon orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    /// Initial state, not started.
    Stopped,
    /// Binding listeners.
    Starting,
    /// Serving requests.
    Running,
    /// Shutting down gracefully.
    ShuttingDown,
}

/// Events emitted by the orchestrator.
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    /// Orchestrator state changed.
    StateChanged(OrchestratorState),
    /// Both listeners are bound.
    Listening { client: SocketAddr, admin: SocketAddr },
    /// The sweep removed expired requests or stale sessions.
    Swept { requests: usize, sessions: usize },
    /// Error occurred.
    Error { message: String },
}

/// Result of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub requests: usize,
    pub sessions: usize,
}

/// Daemon orchestrator that manages all subsystems.
pub struct DaemonOrchestrator {
    /// Configuration.
    config: Config,
    /// State shared with the HTTP handlers.
    app: AppState,
    /// Current state.
    state: Arc<RwLock<OrchestratorState>>,
    /// Event broadcaster.
    event_tx: broadcast::Sender<OrchestratorEvent>,
    /// Cancelled on stop.
    shutdown_token: CancellationToken,
    /// Listener and sweep tasks.
    tasks: Mutex<Vec<JoinHandle<()>>>,
    client_addr: Option<SocketAddr>,
    admin_addr: Option<SocketAddr>,
}

impl DaemonOrchestrator {
    /// Creates a new orchestrator from `config`.
    ///
    /// Fails if the configuration is invalid or the share root is not an
    /// existing directory.
    pub fn new(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let settings = config.share_settings()?;
        info!(
            root = %settings.root.display(),
            require_approval = settings.require_approval,
            paused = settings.is_paused,
            "Sharing folder"
        );

        let share = Arc::new(ShareState::new(settings));
        let browser = DirectoryBrowser::new().include_hidden(config.share.show_hidden);
        let (event_tx, _) = broadcast::channel(64);

        Ok(Self {
            config,
            app: AppState::new(share, browser),
            state: Arc::new(RwLock::new(OrchestratorState::Stopped)),
            event_tx,
            shutdown_token: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
            client_addr: None,
            admin_addr: None,
        })
    }

    /// Returns the current state.
    pub async fn state(&self) -> OrchestratorState {
        *self.state.read().await
    }

    /// Returns a receiver for orchestrator events.
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.event_tx.subscribe()
    }

    /// Starts serving.
    pub async fn start(&mut self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if *state != OrchestratorState::Stopped {
                anyhow::bail!("Orchestrator is already running");
            }
            *state = OrchestratorState::Starting;
        }
        self.emit_event(OrchestratorEvent::StateChanged(OrchestratorState::Starting));

        info!("Starting daemon orchestrator...");

        let server = &self.config.server;
        let client_listener = TcpListener::bind((server.client_host.as_str(), server.client_port))
            .await
            .with_context(|| {
                format!(
                    "Failed to bind client listener on {}:{}",
                    server.client_host, server.client_port
                )
            })?;
        let admin_listener = TcpListener::bind((server.admin_host.as_str(), server.admin_port))
            .await
            .with_context(|| {
                format!(
                    "Failed to bind admin listener on {}:{}",
                    server.admin_host, server.admin_port
                )
            })?;

        let client_addr = client_listener.local_addr()?;
        let admin_addr = admin_listener.local_addr()?;
        self.client_addr = Some(client_addr);
        self.admin_addr = Some(admin_addr);

        let mut tasks = self.tasks.lock().await;
        tasks.push(self.spawn_server(
            "client",
            client_listener,
            client_router(self.app.clone()),
        ));
        tasks.push(self.spawn_server(
            "admin",
            admin_listener,
            admin_router(self.app.clone()),
        ));
        tasks.push(self.spawn_sweep());
        drop(tasks);

        info!("Client API listening on http://{}", client_addr);
        info!("Admin API listening on http://{}", admin_addr);
        self.emit_event(OrchestratorEvent::Listening {
            client: client_addr,
            admin: admin_addr,
        });

        {
            let mut state = self.state.write().await;
            *state = OrchestratorState::Running;
        }
        self.emit_event(OrchestratorEvent::StateChanged(OrchestratorState::Running));

        info!("Daemon orchestrator started successfully");
        Ok(())
    }

    fn spawn_server(
        &self,
        name: &'static str,
        listener: TcpListener,
        router: axum::Router,
    ) -> JoinHandle<()> {
        let shutdown_token = self.shutdown_token.clone();
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
                .await;

            match result {
                Ok(()) => debug!("{} listener stopped", name),
                Err(e) => {
                    error!("{} listener failed: {}", name, e);
                    let _ = event_tx.send(OrchestratorEvent::Error {
                        message: format!("{name} listener failed: {e}"),
                    });
                }
            }
        })
    }

    fn spawn_sweep(&self) -> JoinHandle<()> {
        let app = self.app.clone();
        let shutdown_token = self.shutdown_token.clone();
        let event_tx = self.event_tx.clone();
        let interval = Duration::from_secs(self.config.security.sweep_interval_secs);
        let ttl = approval_ttl(self.config.security.approval_timeout);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_token.cancelled() => {
                        debug!("Sweep task shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let report = Self::sweep(&app, ttl);
                        if report != SweepReport::default() {
                            let _ = event_tx.send(OrchestratorEvent::Swept {
                                requests: report.requests,
                                sessions: report.sessions,
                            });
                        }
                    }
                }
            }
        })
    }

    /// Removes expired download requests and sessions from older epochs.
    ///
    /// `ttl` of `None` keeps requests forever. Revoked sessions survive for
    /// [`REVOKED_SESSION_GRACE`] so they can still report the forced logout.
    pub fn sweep(app: &AppState, ttl: Option<Duration>) -> SweepReport {
        let mut report = SweepReport::default();

        if let Some(ttl) = ttl {
            match app.approvals.cleanup_expired(ttl) {
                Ok(expired) => report.requests = expired.len(),
                Err(e) => warn!("Request sweep failed: {}", e),
            }
        }

        match app.share.session_epoch() {
            Ok(epoch) => {
                report.sessions = app.sessions.purge_stale(epoch, REVOKED_SESSION_GRACE)
            }
            Err(e) => warn!("Session sweep failed: {}", e),
        }

        report
    }

    /// Stops the daemon orchestrator gracefully.
    pub async fn stop(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if *state == OrchestratorState::Stopped {
                return Ok(());
            }
            if *state == OrchestratorState::ShuttingDown {
                anyhow::bail!("Orchestrator is already shutting down");
            }
            *state = OrchestratorState::ShuttingDown;
        }
        self.emit_event(OrchestratorEvent::StateChanged(
            OrchestratorState::ShuttingDown,
        ));

        info!("Stopping daemon orchestrator...");

        // Signal shutdown to all tasks
        self.shutdown_token.cancel();

        let tasks: Vec<_> = self.tasks.lock().await.drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!("Task ended abnormally: {}", e);
            }
        }

        {
            let mut state = self.state.write().await;
            *state = OrchestratorState::Stopped;
        }
        self.emit_event(OrchestratorEvent::StateChanged(OrchestratorState::Stopped));

        info!("Daemon orchestrator stopped");
        Ok(())
    }

    /// Emits an orchestrator event.
    fn emit_event(&self, event: OrchestratorEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Returns the state shared with the HTTP handlers.
    pub fn app_state(&self) -> &AppState {
        &self.app
    }

    /// Address the client listener is bound to, once started.
    pub fn client_addr(&self) -> Option<SocketAddr> {
        self.client_addr
    }

    /// Address the admin listener is bound to, once started.
    pub fn admin_addr(&self) -> Option<SocketAddr> {
        self.admin_addr
    }

    /// Returns the shutdown token for external tasks to observe shutdown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }
}

/// Request lifetime for a configured timeout; 0 means requests never expire.
fn approval_ttl(timeout_secs: u64) -> Option<Duration> {
    (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs))
}
