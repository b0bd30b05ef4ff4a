//! Renaming legacy build caches into the target-qualified scheme

use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use toolcache_naming::{encode, AbiMap, Target};

use crate::entry::{CacheEntry, CacheKind};
use crate::error::EntryError;

/// One planned rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationTask {
    pub version: String,
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Outcome of a migration run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrateResult {
    pub caches_migrated: usize,
    /// Sources left in place because the destination already exists
    pub skipped: Vec<PathBuf>,
    pub errors: Vec<EntryError>,
    pub dry_run: bool,
}

impl MigrateResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Plan renames for every old-format build cache in `entries`.
///
/// `host` must be the runtime platform, not a cross-compilation target.
pub fn plan_migration(entries: &[CacheEntry], host: &Target) -> Vec<MigrationTask> {
    let name = encode(&host.os, &host.arch, &AbiMap::new());
    entries
        .iter()
        .filter(|e| e.kind == CacheKind::Build && e.old_format)
        .filter_map(|e| {
            let parent = e.path.parent()?;
            Some(MigrationTask {
                version: e.toolchain_version.clone(),
                from: e.path.clone(),
                to: parent.join(&name),
            })
        })
        .collect()
}

/// Execute `tasks` independently. Occupied destinations are skipped; a
/// failed rename is recorded and the rest continue.
pub fn run_migration(tasks: &[MigrationTask], dry_run: bool) -> MigrateResult {
    let mut result = MigrateResult {
        dry_run,
        ..MigrateResult::default()
    };

    for task in tasks {
        if fs::symlink_metadata(&task.to).is_ok() {
            tracing::warn!(
                from = %task.from.display(),
                to = %task.to.display(),
                "destination exists, leaving legacy cache in place"
            );
            result.skipped.push(task.from.clone());
            continue;
        }

        if dry_run {
            result.caches_migrated += 1;
            continue;
        }

        match fs::rename(&task.from, &task.to) {
            Ok(()) => {
                tracing::info!(from = %task.from.display(), to = %task.to.display(), "migrated cache");
                result.caches_migrated += 1;
            }
            Err(e) => result.errors.push(EntryError::new(&task.from, e.to_string())),
        }
    }

    result
}
