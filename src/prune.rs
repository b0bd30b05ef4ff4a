//! Retention planning for cache cleanup
//!
//! Selection runs as successive filters over the enumerated caches:
//! kind, version, old-format, then age, then size budget. Age filtering
//! selects what to delete; the size budget walks caches newest first, keeps
//! each one that still fits and selects the rest.

use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::entry::{CacheEntry, KindFilter};
use crate::error::EntryError;

/// Cleanup selection policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneOptions {
    pub kind: KindFilter,
    /// Only caches of this toolchain version
    pub version: Option<String>,
    /// Only legacy unqualified build caches
    pub old_format_only: bool,
    /// Bytes to retain, newest first (0 = no size filter)
    pub max_retained_bytes: u64,
    /// Only caches older than this (zero = no age filter)
    pub max_age: Duration,
    /// Report without deleting
    pub dry_run: bool,
}

impl PruneOptions {
    /// Keep at most `max_retained_bytes` of the newest caches.
    pub fn size_based(max_retained_bytes: u64) -> Self {
        Self {
            max_retained_bytes,
            ..Self::default()
        }
    }

    /// Remove caches not modified within `max_age`.
    pub fn age_based(max_age: Duration) -> Self {
        Self {
            max_age,
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: KindFilter) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_old_format_only(mut self) -> Self {
        self.old_format_only = true;
        self
    }

    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// Caches selected for removal, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanPlan {
    pub entries: Vec<CacheEntry>,
    pub total_bytes: u64,
}

impl CleanPlan {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Compute which of `entries` to remove under `options` as of `now`.
///
/// An empty plan means nothing qualified.
pub fn plan(entries: &[CacheEntry], options: &PruneOptions, now: SystemTime) -> CleanPlan {
    let mut candidates: Vec<CacheEntry> = entries
        .iter()
        .filter(|e| options.kind.matches(e.kind))
        .filter(|e| match &options.version {
            Some(v) => &e.toolchain_version == v,
            None => true,
        })
        .filter(|e| !options.old_format_only || e.old_format)
        .cloned()
        .collect();

    if !options.max_age.is_zero() {
        candidates = match now.checked_sub(options.max_age) {
            Some(cutoff) => candidates
                .into_iter()
                .filter(|e| e.modified_at < cutoff)
                .collect(),
            None => Vec::new(),
        };
    }

    if options.max_retained_bytes > 0 {
        candidates.sort_by(|a, b| {
            b.modified_at
                .cmp(&a.modified_at)
                .then_with(|| a.path.cmp(&b.path))
        });

        let mut retained = 0u64;
        candidates.retain(|e| match retained.checked_add(e.size_bytes) {
            Some(total) if total <= options.max_retained_bytes => {
                retained = total;
                false
            }
            _ => true,
        });
    }

    candidates.sort_by(|a, b| {
        a.modified_at
            .cmp(&b.modified_at)
            .then_with(|| a.path.cmp(&b.path))
    });

    let total_bytes = candidates.iter().map(|e| e.size_bytes).sum();
    CleanPlan {
        entries: candidates,
        total_bytes,
    }
}

/// Outcome of executing (or previewing) a clean.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanResult {
    pub caches_removed: usize,
    pub bytes_reclaimed: u64,
    pub errors: Vec<EntryError>,
    pub dry_run: bool,
}

impl CleanResult {
    /// Result a dry run reports for `plan`.
    pub fn preview(plan: &CleanPlan) -> Self {
        Self {
            caches_removed: plan.len(),
            bytes_reclaimed: plan.total_bytes,
            errors: Vec::new(),
            dry_run: true,
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Merge another result into this one.
    pub fn merge(&mut self, other: &CleanResult) {
        self.caches_removed += other.caches_removed;
        self.bytes_reclaimed += other.bytes_reclaimed;
        self.errors.extend(other.errors.iter().cloned());
    }
}
