//! Machine-readable status document

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use toolcache_naming::{AbiMap, Target};

use crate::entry::{CacheEntry, CacheKind};
use crate::enumerate::Inventory;
use crate::platform::{EnvironmentFlags, HostPlatform};

/// Version of the status JSON layout
pub const SCHEMA_VERSION: &str = "1";

/// Status report, serialized by `status --json`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub schema_version: &'static str,
    pub tool: ToolInfo,
    pub host: HostInfo,
    /// RFC 3339, UTC
    pub timestamp: String,
    pub caches: Vec<CacheRecord>,
    pub totals: Totals,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct HostInfo {
    pub goos: String,
    pub goarch: String,
    pub rosetta: bool,
    pub wsl: bool,
    pub container: bool,
}

/// One cache in the report. `entries` is -1 when approximate.
#[derive(Debug, Clone, Serialize)]
pub struct CacheRecord {
    pub kind: CacheKind,
    pub path: String,
    pub go_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    #[serde(skip_serializing_if = "AbiMap::is_empty")]
    pub abi: AbiMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toolchain_fingerprint: Option<String>,
    pub size_bytes: u64,
    pub entries: i64,
    pub exists: bool,
    pub old_format: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Totals {
    pub size_bytes: u64,
    pub entries: i64,
}

impl StatusReport {
    pub fn new(
        inventory: &Inventory,
        host: &HostPlatform,
        flags: EnvironmentFlags,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            tool: ToolInfo {
                name: env!("CARGO_PKG_NAME"),
                version: env!("CARGO_PKG_VERSION"),
            },
            host: HostInfo {
                goos: host.os.clone(),
                goarch: host.arch.clone(),
                rosetta: flags.rosetta,
                wsl: flags.wsl,
                container: flags.container,
            },
            timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            caches: inventory.entries.iter().map(CacheRecord::from).collect(),
            totals: Totals {
                size_bytes: inventory.total_bytes,
                entries: count_or_unknown(inventory.total_files),
            },
        }
    }
}

impl From<&CacheEntry> for CacheRecord {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            kind: entry.kind,
            path: entry.path.display().to_string(),
            go_version: entry.toolchain_version.clone(),
            target: entry.target.clone(),
            abi: entry.abi.clone(),
            toolchain_fingerprint: entry.toolchain_fingerprint.clone(),
            size_bytes: entry.size_bytes,
            entries: count_or_unknown(entry.files),
            exists: entry.path.exists(),
            old_format: entry.old_format,
        }
    }
}

fn count_or_unknown(files: Option<u64>) -> i64 {
    files.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX))
}
