//! Toolcache - build-artifact cache manager for installed toolchain versions
//!
//! Each installed toolchain version keeps target-qualified build caches and
//! a module cache under `<root>/versions/<version>/`. This crate enumerates
//! and measures them, plans and executes size/age-based cleanup, migrates
//! legacy unqualified caches, and reports the native toolchain recorded for
//! each build cache.

pub mod config;
pub mod confirm;
pub mod entry;
pub mod enumerate;
pub mod error;
pub mod format;
pub mod layout;
pub mod logging;
pub mod manager;
pub mod migrate;
pub mod platform;
pub mod prune;
pub mod report;
pub mod scan;
pub mod units;

pub use config::{CliOverrides, ConfigError, Settings};
pub use confirm::{Confirm, ConfirmError, Prompt};
pub use entry::{compare_versions, CacheEntry, CacheKind, KindFilter};
pub use enumerate::{Enumerator, Inventory, VersionSummary};
pub use error::{CacheError, CacheResult, EntryError};
pub use layout::{Layout, SHARED_VERSION_LABEL};
pub use manager::{CacheManager, InfoRecord, ValidationWarning, WarningKind};
pub use migrate::{MigrateResult, MigrationTask};
pub use platform::{EnvironmentFlags, HostPlatform};
pub use prune::{CleanPlan, CleanResult, PruneOptions};
pub use report::StatusReport;
pub use scan::{scan_dir, ScanResult};
