//! Live share settings.
//!
//! One [`ShareState`] exists per process. It holds the shared root, the
//! password, the policy switches, and the two opaque version tokens (session
//! epoch and config version). Every mutation goes through a named operation
//! so the invariants on `root` and the tokens hold for all callers.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};

use protocol::messages::{ConfigSnapshot, ConfigUpdate};
use protocol::{ConfigVersion, SessionEpoch};

use crate::error::{AccessError, AccessResult};
use crate::files::PathResolver;

/// Current values of every share setting.
#[derive(Debug, Clone)]
pub struct ShareSettings {
    /// Canonical absolute path of the shared directory.
    pub root: PathBuf,
    /// Shared secret clients log in with.
    pub password: String,
    /// Logins are accepted and sessions are honoured.
    pub is_running: bool,
    /// Downloads and previews are refused; listing still works.
    pub is_paused: bool,
    /// Downloads must be approved per file.
    pub require_approval: bool,
    /// Previews are offered at all.
    pub enable_previews: bool,
    /// Previews stay available while downloads need approval.
    pub preview_bypasses_approval: bool,
    /// Sessions captured under another epoch are revoked.
    pub session_epoch: SessionEpoch,
    /// Regenerated whenever `root` changes.
    pub config_version: ConfigVersion,
}

impl ShareSettings {
    /// Settings for sharing `root` with `password`, running and unpaused.
    ///
    /// Fails with `NotFound` unless `root` is an existing directory.
    pub fn new(root: impl AsRef<Path>, password: impl Into<String>) -> AccessResult<Self> {
        Ok(Self {
            root: canonical_dir(root.as_ref())?,
            password: password.into(),
            is_running: true,
            is_paused: false,
            require_approval: false,
            enable_previews: true,
            preview_bypasses_approval: false,
            session_epoch: SessionEpoch::generate(),
            config_version: ConfigVersion::generate(),
        })
    }

    /// The administrator's view of these settings, without the password.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            folder_path: self.root.display().to_string(),
            is_running: self.is_running,
            is_paused: self.is_paused,
            require_approval: self.require_approval,
            enable_previews: self.enable_previews,
            preview_bypasses_approval: self.preview_bypasses_approval,
            config_id: self.config_version,
        }
    }
}

fn canonical_dir(path: &Path) -> AccessResult<PathBuf> {
    let canonical =
        fs::canonicalize(path).map_err(|_| AccessError::NotFound(path.display().to_string()))?;
    if !canonical.is_dir() {
        return Err(AccessError::NotFound(format!(
            "{} is not a directory",
            path.display()
        )));
    }
    Ok(canonical)
}

/// Lock-guarded share settings.
#[derive(Debug)]
pub struct ShareState {
    settings: RwLock<ShareSettings>,
}

impl ShareState {
    /// Wrap `settings`.
    pub fn new(settings: ShareSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    /// Read guard over the settings.
    ///
    /// Hold it only for short synchronous checks, never across an await.
    pub fn read(&self) -> AccessResult<RwLockReadGuard<'_, ShareSettings>> {
        self.settings
            .read()
            .map_err(|_| AccessError::lock_poisoned("share settings"))
    }

    /// A copy of the current settings.
    pub fn settings(&self) -> AccessResult<ShareSettings> {
        Ok(self.read()?.clone())
    }

    /// The administrator's view of the current settings.
    pub fn snapshot(&self) -> AccessResult<ConfigSnapshot> {
        Ok(self.read()?.snapshot())
    }

    /// Current session epoch.
    pub fn session_epoch(&self) -> AccessResult<SessionEpoch> {
        Ok(self.read()?.session_epoch)
    }

    /// Resolver bound to the current root.
    pub fn resolver(&self) -> AccessResult<PathResolver> {
        let root = self.read()?.root.clone();
        Ok(PathResolver::new(root)?)
    }

    /// Apply a partial update.
    ///
    /// Every field is validated before any is written: a `folder_path` that
    /// is not an existing directory, or an empty password, leaves the
    /// settings untouched.
    pub fn update(&self, update: ConfigUpdate) -> AccessResult<ConfigSnapshot> {
        let new_root = match update.folder_path.as_deref() {
            Some(path) => Some(canonical_dir(Path::new(path))?),
            None => None,
        };
        if matches!(update.password.as_deref(), Some("")) {
            return Err(AccessError::BadRequest("password must not be empty".into()));
        }

        let mut settings = self
            .settings
            .write()
            .map_err(|_| AccessError::lock_poisoned("share settings"))?;

        if let Some(root) = new_root {
            if root != settings.root {
                tracing::info!(root = %root.display(), "Shared folder changed");
                settings.root = root;
                settings.config_version = ConfigVersion::generate();
            }
        }
        if let Some(password) = update.password {
            tracing::info!("Share password changed");
            settings.password = password;
        }
        if let Some(running) = update.is_running {
            settings.is_running = running;
        }
        if let Some(paused) = update.is_paused {
            settings.is_paused = paused;
        }
        if let Some(require) = update.require_approval {
            settings.require_approval = require;
        }
        if let Some(enable) = update.enable_previews {
            settings.enable_previews = enable;
        }
        if let Some(bypass) = update.preview_bypasses_approval {
            settings.preview_bypasses_approval = bypass;
        }

        tracing::debug!(
            running = settings.is_running,
            paused = settings.is_paused,
            require_approval = settings.require_approval,
            previews = settings.enable_previews,
            "Share settings updated"
        );

        Ok(settings.snapshot())
    }

    /// Revoke every outstanding session by replacing the epoch.
    pub fn force_logout_all(&self) -> AccessResult<SessionEpoch> {
        let mut settings = self
            .settings
            .write()
            .map_err(|_| AccessError::lock_poisoned("share settings"))?;
        settings.session_epoch = SessionEpoch::generate();
        tracing::info!("All client sessions revoked");
        Ok(settings.session_epoch)
    }
}
