//! File access inside the shared root.
//!
//! This module provides:
//! - Path containment for client-supplied relative paths
//! - Directory listing with symlink filtering
//! - Preview classification and size-bounded text reads
//!
//! # Security
//!
//! Every path from a client goes through [`PathResolver::resolve`] before any
//! other operation. Paths are checked lexically and again after
//! canonicalization, and symlinks that point outside the root are rejected.

pub mod browser;
pub mod preview;
pub mod resolver;

pub use browser::{format_file_size, BrowserError, DirectoryBrowser};
pub use preview::{read_text_preview, PreviewError, PreviewKind, MAX_TEXT_PREVIEW_SIZE};
pub use resolver::{normalize_relative, PathResolver, ResolveError};
