//! On-disk layout of an installation root
//!
//! ```text
//! <root>/
//!   versions/<version>/
//!     bin/go
//!     go-build[-<os>-<arch>...]/
//!     go-mod/
//!   shared/go-mod/
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use toolcache_naming::MODULE_CACHE_DIR;

use crate::entry::compare_versions;

/// Version label for the root-level shared module cache.
pub const SHARED_VERSION_LABEL: &str = "shared";

/// Paths inside an installation root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.versions_dir().join(version)
    }

    /// Per-version module cache location.
    pub fn module_cache(&self, version: &str) -> PathBuf {
        self.version_dir(version).join(MODULE_CACHE_DIR)
    }

    /// Module cache shared by all versions.
    pub fn shared_module_cache(&self) -> PathBuf {
        self.root.join("shared").join(MODULE_CACHE_DIR)
    }

    /// Toolchain binary of an installed version.
    pub fn go_binary(&self, version: &str) -> PathBuf {
        let name = if cfg!(windows) { "go.exe" } else { "go" };
        self.version_dir(version).join("bin").join(name)
    }

    /// Installed versions, oldest first. A missing `versions/` yields none.
    pub fn installed_versions(&self) -> Vec<String> {
        let entries = match fs::read_dir(self.versions_dir()) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut versions: Vec<String> = entries
            .flatten()
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|name| !name.starts_with('.'))
            .collect();
        versions.sort_by(|a, b| compare_versions(a, b));
        versions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths() {
        let layout = Layout::new("/opt/goenv");
        assert_eq!(layout.version_dir("1.22.1"), PathBuf::from("/opt/goenv/versions/1.22.1"));
        assert_eq!(
            layout.module_cache("1.22.1"),
            PathBuf::from("/opt/goenv/versions/1.22.1/go-mod")
        );
        assert_eq!(layout.shared_module_cache(), PathBuf::from("/opt/goenv/shared/go-mod"));
    }

    #[test]
    fn test_installed_versions_sorted() {
        let temp = TempDir::new().unwrap();
        let layout = Layout::new(temp.path());
        for v in ["1.10.1", "1.9.7", "1.21.0", ".tmp"] {
            fs::create_dir_all(layout.version_dir(v)).unwrap();
        }
        fs::write(layout.versions_dir().join("README"), "x").unwrap();

        assert_eq!(layout.installed_versions(), vec!["1.9.7", "1.10.1", "1.21.0"]);
    }

    #[test]
    fn test_no_versions_dir() {
        let temp = TempDir::new().unwrap();
        assert!(Layout::new(temp.path()).installed_versions().is_empty());
    }
}
