//! Cache descriptors and selection filters

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::SystemTime;

use serde::Serialize;
use toolcache_naming::{AbiMap, Target};

use crate::error::CacheError;

/// Kind of cache directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CacheKind {
    #[serde(rename = "build")]
    Build,
    #[serde(rename = "mod")]
    Module,
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKind::Build => write!(f, "build"),
            CacheKind::Module => write!(f, "mod"),
        }
    }
}

/// Which kinds an operation applies to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KindFilter {
    Build,
    Module,
    #[default]
    All,
}

impl KindFilter {
    pub fn matches(&self, kind: CacheKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Build => kind == CacheKind::Build,
            KindFilter::Module => kind == CacheKind::Module,
        }
    }
}

impl FromStr for KindFilter {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "build" => Ok(KindFilter::Build),
            "mod" | "module" | "modules" => Ok(KindFilter::Module),
            "all" | "" => Ok(KindFilter::All),
            _ => Err(CacheError::InvalidKind(s.to_string())),
        }
    }
}

/// One cache directory as found on disk.
///
/// Module caches never carry a target or ABI; old-format build caches never
/// carry a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub kind: CacheKind,
    pub path: PathBuf,
    pub toolchain_version: String,
    pub target: Option<Target>,
    pub abi: AbiMap,
    pub toolchain_fingerprint: Option<String>,
    pub size_bytes: u64,
    /// Exact file count, or `None` when the scan was approximate.
    pub files: Option<u64>,
    pub old_format: bool,
    pub modified_at: SystemTime,
}

impl CacheEntry {
    /// Label used for display and ordering: `linux-amd64`, `(old format)`,
    /// `(unknown)` or `module`.
    pub fn label(&self) -> String {
        match (self.kind, &self.target) {
            (CacheKind::Module, _) => "module".to_string(),
            (CacheKind::Build, Some(target)) => target.label(),
            (CacheKind::Build, None) if self.old_format => "(old format)".to_string(),
            (CacheKind::Build, None) => "(unknown)".to_string(),
        }
    }

    /// Stable display order: version, then kind, then label.
    pub fn display_order(a: &CacheEntry, b: &CacheEntry) -> Ordering {
        compare_versions(&a.toolchain_version, &b.toolchain_version)
            .then(a.kind.cmp(&b.kind))
            .then_with(|| a.label().cmp(&b.label()))
            .then_with(|| a.path.cmp(&b.path))
    }
}

/// Numeric-aware version comparison; `1.9` sorts before `1.10`.
///
/// Each component contributes its leading digits, so `1.22rc1` compares as
/// `1.22`. Remaining ties are broken by plain string order so the order
/// stays total.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> {
        v.split(|c: char| c == '.' || c == '-')
            .map_while(leading_number)
            .collect()
    };

    let a_parts = parse(a);
    let b_parts = parse(b);

    for (ap, bp) in a_parts.iter().zip(b_parts.iter()) {
        match ap.cmp(bp) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    a_parts
        .len()
        .cmp(&b_parts.len())
        .then_with(|| a.cmp(b))
}

fn leading_number(component: &str) -> Option<u64> {
    let end = component
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(component.len());
    component[..end].parse().ok()
}
