//! ShareGate Daemon
//!
//! Shares a folder over HTTP with password login and optional per-download
//! approval.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use sharegate::config::{default_config_path, Config};
use sharegate::orchestrator::{DaemonOrchestrator, OrchestratorEvent};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// ShareGate Daemon - share a folder with approval-gated downloads.
#[derive(Parser, Debug)]
#[command(name = "sharegate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for the daemon.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start sharing
    Start {
        /// Directory to share (overrides the config file)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Share password (overrides the config file)
        #[arg(long)]
        password: Option<String>,

        /// Client listener port
        #[arg(long, short)]
        port: Option<u16>,

        /// Admin listener port (0 picks a free port)
        #[arg(long)]
        admin_port: Option<u16>,

        /// Require approval for every download
        #[arg(long)]
        require_approval: bool,
    },

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    let mut config = Config::load(&config_path)?;
    config.apply_env_overrides();

    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.daemon.log_level.to_lowercase()
    };
    let _log_guard = init_tracing(&level, config.daemon.log_file.as_deref())?;

    match cli.command {
        Commands::Start {
            root,
            password,
            port,
            admin_port,
            require_approval,
        } => {
            if let Some(root) = root {
                config.share.root = root;
            }
            if let Some(password) = password {
                config.share.password = password;
            }
            if let Some(port) = port {
                config.server.client_port = port;
            }
            if let Some(admin_port) = admin_port {
                config.server.admin_port = admin_port;
            }
            if require_approval {
                config.share.require_approval = true;
            }

            config.validate()?;
            tracing::info!("ShareGate daemon starting...");

            let mut orchestrator = DaemonOrchestrator::new(config)?;
            run_headless(&mut orchestrator).await?;
        }
        Commands::Config(ConfigCommands::Init { force }) => {
            init_config(&config_path, force)?;
        }
        Commands::Config(ConfigCommands::Show) => {
            let mut shown = config.clone();
            shown.share.password = "********".to_string();
            println!("# {}", config_path.display());
            print!("{}", shown.to_toml()?);
        }
    }

    Ok(())
}

/// Initialize logging to stdout and, if configured, to a file.
///
/// The returned guard must live until exit so buffered file output is
/// flushed.
fn init_tracing(level: &str, log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let Some(log_file) = log_file else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return Ok(None);
    };

    let dir = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = log_file
        .file_name()
        .with_context(|| format!("log_file has no file name: {}", log_file.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();

    Ok(Some(guard))
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    Config::default().save(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

/// Run until SIGINT or SIGTERM.
async fn run_headless(orchestrator: &mut DaemonOrchestrator) -> anyhow::Result<()> {
    orchestrator.start().await?;

    let mut events = orchestrator.subscribe();

    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                OrchestratorEvent::StateChanged(state) => {
                    tracing::info!("Orchestrator state: {:?}", state);
                }
                OrchestratorEvent::Listening { client, admin } => {
                    tracing::debug!("Listening on {} (admin {})", client, admin);
                }
                OrchestratorEvent::Swept { requests, sessions } => {
                    tracing::debug!(
                        "Sweep removed {} requests and {} sessions",
                        requests,
                        sessions
                    );
                }
                OrchestratorEvent::Error { message } => {
                    tracing::error!("Orchestrator error: {}", message);
                }
            }
        }
    });

    if let Some(admin) = orchestrator.admin_addr() {
        println!("Admin API: http://{admin}/admin/api/status");
    }

    wait_for_shutdown_signal().await?;
    tracing::info!("Received shutdown signal");

    orchestrator.stop().await?;

    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to register SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT");
        }
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")
}
