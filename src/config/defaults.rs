//! Built-in defaults (layer 1)

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Installation root relative to `$HOME` (default: ".goenv")
    pub root_dir_name: String,

    /// Per-cache scan budget in seconds (default: 10)
    pub scan_timeout_secs: u64,

    /// Skip confirmation prompts (default: false)
    pub assume_yes: bool,

    /// Size above which a cache is reported as large (default: 5 GiB)
    pub large_cache_bytes: u64,

    /// Days without modification before a cache is reported stale (default: 365)
    pub stale_after_days: u64,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            root_dir_name: ".goenv".to_string(),
            scan_timeout_secs: 10,
            assume_yes: false,
            large_cache_bytes: 5 * 1024 * 1024 * 1024,
            stale_after_days: 365,
        }
    }
}

impl BuiltinDefaults {
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }
}
