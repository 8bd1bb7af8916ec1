//! Path containment for client-supplied paths.
//!
//! Clients address files relative to the shared root. A relative path is
//! checked twice: lexically before it ever touches the filesystem, and again
//! after canonicalization so that symlinks cannot lead outside the root.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while resolving a client path.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The path would resolve outside the shared root.
    #[error("path traversal detected: {0}")]
    PathTraversal(String),

    /// The path is contained but nothing exists there.
    #[error("path does not exist: {0}")]
    NotFound(String),

    /// IO error other than a missing file.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Resolves client-relative paths against a trusted root directory.
#[derive(Debug, Clone)]
pub struct PathResolver {
    /// Canonical root; every resolved path starts with it.
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver for `root`.
    ///
    /// The root is canonicalized once here so later containment checks
    /// compare canonical paths on both sides.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ResolveError> {
        let root = root.as_ref();
        let canonical = fs::canonicalize(root).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ResolveError::NotFound(root.display().to_string())
            } else {
                ResolveError::Io(e)
            }
        })?;
        Ok(Self { root: canonical })
    }

    /// The canonical shared root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `relative` to an absolute path inside the root.
    ///
    /// Returns `PathTraversal` if the path escapes the root either lexically
    /// or after symlinks are resolved, and `NotFound` if it is contained but
    /// does not exist.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, ResolveError> {
        let normalized = normalize_relative(relative)?;

        let joined = if normalized.is_empty() {
            self.root.clone()
        } else {
            self.root.join(&normalized)
        };

        let canonical = fs::canonicalize(&joined).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ResolveError::NotFound(relative.to_string())
            } else {
                ResolveError::Io(e)
            }
        })?;

        // Component-wise, so "/share2" is not inside "/share".
        if !canonical.starts_with(&self.root) {
            tracing::warn!(
                requested = %relative,
                resolved = %canonical.display(),
                "Rejected path resolving outside the shared root"
            );
            return Err(ResolveError::PathTraversal(relative.to_string()));
        }

        Ok(canonical)
    }

    /// Express a resolved path relative to the root, `/`-separated.
    ///
    /// Returns `None` if `resolved` is not inside the root.
    pub fn relative_of(&self, resolved: &Path) -> Option<String> {
        let stripped = resolved.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = stripped
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        Some(parts.join("/"))
    }
}

/// Lexically normalize a client path.
///
/// Backslashes become `/`, empty and `.` segments are dropped, a leading `/`
/// is treated as the root, and `..` pops the previous segment. A `..` with
/// nothing left to pop, an embedded NUL, or a drive prefix such as `C:` is a
/// traversal attempt. The result never starts with `/` and is empty for the
/// root itself.
pub fn normalize_relative(raw: &str) -> Result<String, ResolveError> {
    if raw.contains('\0') {
        return Err(ResolveError::PathTraversal(raw.escape_default().to_string()));
    }

    let unified = raw.replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();

    for segment in unified.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                if parts.pop().is_none() {
                    return Err(ResolveError::PathTraversal(raw.to_string()));
                }
            }
            s if parts.is_empty() && is_drive_prefix(s) => {
                return Err(ResolveError::PathTraversal(raw.to_string()));
            }
            s => parts.push(s),
        }
    }

    Ok(parts.join("/"))
}

fn is_drive_prefix(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
