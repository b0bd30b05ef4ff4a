//! Discovery of cache directories across installed versions

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use toolcache_naming::{decode, is_build_cache_name, AbiMap, MODULE_CACHE_DIR};

use crate::entry::{compare_versions, CacheEntry, CacheKind};
use crate::layout::{Layout, SHARED_VERSION_LABEL};
use crate::scan::{last_modified, scan_dir};

/// Walks version directories and measures every cache found.
#[derive(Debug, Clone)]
pub struct Enumerator {
    layout: Layout,
    fast: bool,
    timeout: Duration,
}

impl Enumerator {
    pub fn new(layout: Layout, timeout: Duration) -> Self {
        Self {
            layout,
            fast: false,
            timeout,
        }
    }

    /// Skip exact file counting.
    pub fn with_fast(mut self, fast: bool) -> Self {
        self.fast = fast;
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Enumerate caches of `versions` plus the shared module cache.
    ///
    /// Versions whose directory cannot be read are skipped with a warning.
    pub fn list(&self, versions: &[String]) -> Inventory {
        let mut entries = Vec::new();

        for version in versions {
            let dir = self.layout.version_dir(version);
            let children = match fs::read_dir(&dir) {
                Ok(children) => children,
                Err(e) => {
                    tracing::warn!(version = %version, error = %e, "skipping unreadable version directory");
                    continue;
                }
            };

            for child in children.flatten() {
                if !child.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                    continue;
                }
                let name = child.file_name();
                let Some(name) = name.to_str() else { continue };

                if is_build_cache_name(name) {
                    if let Some(entry) = self.build_entry(version, &child.path(), name) {
                        entries.push(entry);
                    }
                } else if name == MODULE_CACHE_DIR {
                    if let Some(entry) = self.module_entry(version, &child.path()) {
                        entries.push(entry);
                    }
                }
            }
        }

        let shared = self.layout.shared_module_cache();
        if shared.is_dir() {
            if let Some(entry) = self.module_entry(SHARED_VERSION_LABEL, &shared) {
                entries.push(entry);
            }
        }

        Inventory::from_entries(entries)
    }

    fn build_entry(&self, version: &str, path: &Path, name: &str) -> Option<CacheEntry> {
        let decoded = decode(name);
        let mut entry = self.measure(CacheKind::Build, version, path)?;
        entry.target = decoded.target;
        entry.abi = decoded.abi;
        entry.toolchain_fingerprint = decoded.toolchain_fingerprint;
        entry.old_format = decoded.old_format;
        Some(entry)
    }

    fn module_entry(&self, version: &str, path: &Path) -> Option<CacheEntry> {
        self.measure(CacheKind::Module, version, path)
    }

    fn measure(&self, kind: CacheKind, version: &str, path: &Path) -> Option<CacheEntry> {
        if let Err(e) = fs::metadata(path) {
            tracing::warn!(path = %path.display(), error = %e, "skipping unreadable cache");
            return None;
        }

        let scan = scan_dir(path, self.fast, self.timeout);
        Some(CacheEntry {
            kind,
            path: path.to_path_buf(),
            toolchain_version: version.to_string(),
            target: None,
            abi: AbiMap::new(),
            toolchain_fingerprint: None,
            size_bytes: scan.size_bytes,
            files: scan.files,
            old_format: false,
            modified_at: last_modified(path),
        })
    }
}

/// All caches found by one enumeration, in display order.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub entries: Vec<CacheEntry>,
    pub total_bytes: u64,
    /// `None` if any entry's count is approximate.
    pub total_files: Option<u64>,
}

impl Inventory {
    pub fn from_entries(mut entries: Vec<CacheEntry>) -> Self {
        entries.sort_by(CacheEntry::display_order);
        let total_bytes = entries.iter().map(|e| e.size_bytes).sum();
        let total_files = entries.iter().map(|e| e.files).sum();
        Self {
            entries,
            total_bytes,
            total_files,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn old_format(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.iter().filter(|e| e.old_format)
    }

    /// Per-version totals in display order.
    pub fn by_version(&self) -> Vec<VersionSummary> {
        let mut summaries: Vec<VersionSummary> = Vec::new();
        for entry in &self.entries {
            match summaries
                .iter_mut()
                .find(|s| s.version == entry.toolchain_version)
            {
                Some(summary) => summary.add(entry),
                None => {
                    let mut summary = VersionSummary::new(&entry.toolchain_version);
                    summary.add(entry);
                    summaries.push(summary);
                }
            }
        }
        summaries.sort_by(|a, b| compare_versions(&a.version, &b.version));
        summaries
    }
}

/// Aggregate for one toolchain version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionSummary {
    pub version: String,
    pub caches: usize,
    pub size_bytes: u64,
    pub files: Option<u64>,
}

impl VersionSummary {
    fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            caches: 0,
            size_bytes: 0,
            files: Some(0),
        }
    }

    fn add(&mut self, entry: &CacheEntry) {
        self.caches += 1;
        self.size_bytes += entry.size_bytes;
        self.files = self.files.zip(entry.files).map(|(a, b)| a + b);
    }
}
