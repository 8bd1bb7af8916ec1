//! Directory listing inside the shared root.
//!
//! Listings are produced from a path that has already passed the
//! [`PathResolver`]. Symlinked entries are only shown when their target is
//! also inside the root.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use protocol::messages::{DirectoryListing, FileEntry, FolderEntry};
use thiserror::Error;

use super::preview::PreviewKind;
use super::resolver::{PathResolver, ResolveError};

/// Errors that can occur during directory browsing.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The path failed containment or does not exist.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The requested path is not a directory.
    #[error("path is not a directory: {0}")]
    NotADirectory(String),

    /// IO error while reading the directory.
    #[error("error reading directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Directory browser for the shared root.
#[derive(Debug, Clone)]
pub struct DirectoryBrowser {
    /// Whether dot-files are listed.
    include_hidden: bool,
}

impl Default for DirectoryBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryBrowser {
    /// Create a browser that lists hidden entries.
    pub fn new() -> Self {
        Self {
            include_hidden: true,
        }
    }

    /// Set whether entries starting with '.' are listed.
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// List the directory at `relative` under the resolver's root.
    ///
    /// Folders come first, then files, each sorted case-insensitively.
    /// Entries that cannot be stat'ed are skipped rather than failing the
    /// whole listing.
    pub fn list(
        &self,
        resolver: &PathResolver,
        relative: &str,
    ) -> Result<DirectoryListing, BrowserError> {
        let canonical = resolver.resolve(relative)?;

        let metadata = fs::metadata(&canonical)?;
        if !metadata.is_dir() {
            return Err(BrowserError::NotADirectory(relative.to_string()));
        }

        let current_path = resolver.relative_of(&canonical).unwrap_or_default();

        let mut folders = Vec::new();
        let mut files = Vec::new();

        for entry_result in fs::read_dir(&canonical)? {
            let entry = match entry_result {
                Ok(e) => e,
                Err(_) => continue,
            };

            let name = entry.file_name().to_string_lossy().to_string();
            if !self.include_hidden && name.starts_with('.') {
                continue;
            }

            let entry_path = entry.path();
            let is_symlink = entry
                .file_type()
                .map(|t| t.is_symlink())
                .unwrap_or(false);
            if is_symlink && !target_inside(resolver.root(), &entry_path) {
                tracing::debug!(entry = %entry_path.display(), "Hiding symlink leaving the shared root");
                continue;
            }

            // Follows symlinks; targets were checked above.
            let metadata = match fs::metadata(&entry_path) {
                Ok(m) => m,
                Err(_) => continue,
            };

            let path = join_relative(&current_path, &name);

            if metadata.is_dir() {
                folders.push(FolderEntry { name, path });
            } else if metadata.is_file() {
                let size = metadata.len();
                let modified = metadata
                    .modified()
                    .unwrap_or(SystemTime::UNIX_EPOCH)
                    .duration_since(SystemTime::UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                files.push(FileEntry {
                    previewable: PreviewKind::from_name(&name).is_some(),
                    name,
                    path,
                    size,
                    size_display: format_file_size(size),
                    modified,
                });
            }
        }

        folders.sort_by_key(|f| f.name.to_lowercase());
        files.sort_by_key(|f| f.name.to_lowercase());

        let parent = if current_path.is_empty() {
            None
        } else {
            Some(
                current_path
                    .rsplit_once('/')
                    .map(|(parent, _)| parent.to_string())
                    .unwrap_or_default(),
            )
        };

        Ok(DirectoryListing {
            current_path,
            parent,
            folders,
            files,
        })
    }
}

fn target_inside(root: &Path, link: &Path) -> bool {
    fs::canonicalize(link)
        .map(|target| target.starts_with(root))
        .unwrap_or(false)
}

fn join_relative(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Format a byte count for display, e.g. `"1.5 MB"`.
pub fn format_file_size(size: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if size < 1024 {
        return format!("{size} B");
    }

    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{:?} {}", rounded, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    fn create_test_structure(dir: &Path) {
        fs::create_dir_all(dir.join("subdir")).unwrap();
        fs::create_dir_all(dir.join(".hidden_dir")).unwrap();
        fs::write(dir.join("file.txt"), "Hello").unwrap();
        fs::write(dir.join("subdir/nested.txt"), "Nested").unwrap();
        fs::write(dir.join(".hidden"), "Hidden").unwrap();
    }

    #[test]
    fn test_list_root() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());
        let resolver = PathResolver::new(temp_dir.path()).unwrap();

        let listing = DirectoryBrowser::new()
            .include_hidden(false)
            .list(&resolver, "")
            .unwrap();

        assert_eq!(listing.current_path, "");
        assert_eq!(listing.parent, None);
        assert_eq!(listing.folders.len(), 1);
        assert_eq!(listing.folders[0].name, "subdir");
        assert_eq!(listing.folders[0].path, "subdir");
        assert_eq!(listing.files.len(), 1);
        assert_eq!(listing.files[0].name, "file.txt");
        assert_eq!(listing.files[0].size, 5);
        assert!(listing.files[0].previewable);
    }

    #[test]
    fn test_list_with_hidden() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());
        let resolver = PathResolver::new(temp_dir.path()).unwrap();

        let listing = DirectoryBrowser::new().list(&resolver, "").unwrap();
        let folder_names: Vec<&str> = listing.folders.iter().map(|f| f.name.as_str()).collect();
        let file_names: Vec<&str> = listing.files.iter().map(|f| f.name.as_str()).collect();
        assert!(folder_names.contains(&".hidden_dir"));
        assert!(file_names.contains(&".hidden"));
    }

    #[test]
    fn test_list_subdirectory_paths_and_parent() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());
        fs::create_dir_all(temp_dir.path().join("subdir/deeper")).unwrap();
        let resolver = PathResolver::new(temp_dir.path()).unwrap();

        let listing = DirectoryBrowser::new().list(&resolver, "subdir").unwrap();
        assert_eq!(listing.current_path, "subdir");
        assert_eq!(listing.parent.as_deref(), Some(""));
        assert_eq!(listing.files[0].path, "subdir/nested.txt");

        let listing = DirectoryBrowser::new()
            .list(&resolver, "subdir/deeper")
            .unwrap();
        assert_eq!(listing.parent.as_deref(), Some("subdir"));
    }

    #[test]
    fn test_list_traversal_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let share = temp_dir.path().join("share");
        fs::create_dir_all(&share).unwrap();
        let resolver = PathResolver::new(&share).unwrap();

        let result = DirectoryBrowser::new().list(&resolver, "..");
        assert!(matches!(
            result,
            Err(BrowserError::Resolve(ResolveError::PathTraversal(_)))
        ));
    }

    #[test]
    fn test_list_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let resolver = PathResolver::new(temp_dir.path()).unwrap();

        let result = DirectoryBrowser::new().list(&resolver, "nonexistent");
        assert!(matches!(
            result,
            Err(BrowserError::Resolve(ResolveError::NotFound(_)))
        ));
    }

    #[test]
    fn test_not_a_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("file.txt"), "Hello").unwrap();
        let resolver = PathResolver::new(temp_dir.path()).unwrap();

        let result = DirectoryBrowser::new().list(&resolver, "file.txt");
        assert!(matches!(result, Err(BrowserError::NotADirectory(_))));
    }

    #[test]
    fn test_symlink_outside_root_hidden() {
        let temp_dir = TempDir::new().unwrap();
        let other_dir = TempDir::new().unwrap();
        fs::write(other_dir.path().join("secret.txt"), "Secret").unwrap();
        fs::write(temp_dir.path().join("file.txt"), "Hello").unwrap();
        symlink(
            other_dir.path().join("secret.txt"),
            temp_dir.path().join("sneaky_link"),
        )
        .unwrap();
        symlink(
            temp_dir.path().join("file.txt"),
            temp_dir.path().join("friendly_link"),
        )
        .unwrap();
        let resolver = PathResolver::new(temp_dir.path()).unwrap();

        let listing = DirectoryBrowser::new().list(&resolver, "").unwrap();
        let names: Vec<&str> = listing.files.iter().map(|f| f.name.as_str()).collect();
        assert!(names.contains(&"friendly_link"));
        assert!(!names.contains(&"sneaky_link"));
    }

    #[test]
    fn test_directory_sorting() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("zebra.txt"), "z").unwrap();
        fs::write(temp_dir.path().join("Apple.txt"), "a").unwrap();
        fs::create_dir_all(temp_dir.path().join("beta_dir")).unwrap();
        fs::create_dir_all(temp_dir.path().join("Alpha_dir")).unwrap();
        let resolver = PathResolver::new(temp_dir.path()).unwrap();

        let listing = DirectoryBrowser::new().list(&resolver, "").unwrap();
        assert_eq!(listing.folders[0].name, "Alpha_dir");
        assert_eq!(listing.folders[1].name, "beta_dir");
        assert_eq!(listing.files[0].name, "Apple.txt");
        assert_eq!(listing.files[1].name, "zebra.txt");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
