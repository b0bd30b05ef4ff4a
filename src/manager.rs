//! Cache manager: status, clean, migrate, info and validate
//!
//! Every operation enumerates fresh from disk. Destructive operations are
//! split into a pure planning step and an execution step so callers can
//! confirm in between.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::Serialize;
use toolcache_naming::{ArchFamily, BuildCacheName, Target, EXPERIMENT_KEY};
use toolcache_toolchain::{BuildInfo, FingerprintCalculator, ProcessCommand, ProcessRunner, ToolchainEnv};

use crate::config::Settings;
use crate::entry::{CacheEntry, CacheKind};
use crate::enumerate::{Enumerator, Inventory};
use crate::error::{CacheError, CacheResult, EntryError};
use crate::layout::{Layout, SHARED_VERSION_LABEL};
use crate::migrate::{plan_migration, run_migration, MigrateResult, MigrationTask};
use crate::platform::HostPlatform;
use crate::prune::{plan, CleanPlan, CleanResult, PruneOptions};

/// Per-build-cache toolchain record returned by [`CacheManager::info`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoRecord {
    pub version: String,
    /// Directory name, e.g. `go-build-linux-amd64`
    pub cache_dir: String,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_info: Option<BuildInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What a validation warning is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    OldFormat,
    Large,
    Stale,
}

/// Advisory finding from [`CacheManager::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationWarning {
    pub kind: WarningKind,
    pub path: PathBuf,
    pub message: String,
}

/// Orchestrates the cache engine for one installation root.
pub struct CacheManager<R> {
    settings: Settings,
    layout: Layout,
    runner: R,
    host: HostPlatform,
}

impl<R: ProcessRunner> CacheManager<R> {
    pub fn new(settings: Settings, runner: R) -> Self {
        Self {
            layout: Layout::new(&settings.root),
            settings,
            runner,
            host: HostPlatform::current(),
        }
    }

    /// Override the runtime platform used for migration.
    pub fn with_host(mut self, host: HostPlatform) -> Self {
        self.host = host;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn host(&self) -> &HostPlatform {
        &self.host
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn enumerator(&self, fast: bool) -> Enumerator {
        Enumerator::new(self.layout.clone(), self.settings.scan_timeout).with_fast(fast)
    }

    /// Installed versions, narrowed to `filter` when given.
    ///
    /// An unknown filter fails before anything is scanned.
    fn versions(&self, filter: Option<&str>) -> CacheResult<Vec<String>> {
        let installed = self.layout.installed_versions();
        match filter {
            None => Ok(installed),
            Some(SHARED_VERSION_LABEL) => Ok(Vec::new()),
            Some(v) if installed.iter().any(|i| i == v) => Ok(vec![v.to_string()]),
            Some(v) => Err(CacheError::UnknownVersion(v.to_string())),
        }
    }

    /// Read-only listing of every cache.
    pub fn status(&self, fast: bool) -> Inventory {
        self.enumerator(fast).list(&self.layout.installed_versions())
    }

    /// Select caches to remove. Touches nothing.
    pub fn plan_clean(&self, options: &PruneOptions) -> CacheResult<CleanPlan> {
        let versions = self.versions(options.version.as_deref())?;
        let inventory = self.enumerator(true).list(&versions);
        Ok(plan(&inventory.entries, options, SystemTime::now()))
    }

    /// Remove every entry of `plan`, or only report when `dry_run`.
    ///
    /// Build caches are deleted directly; module caches go through the
    /// toolchain's own clean command because they contain read-only files.
    pub fn execute_clean(&self, plan: &CleanPlan, dry_run: bool) -> CleanResult {
        if dry_run {
            return CleanResult::preview(plan);
        }

        let mut result = CleanResult::default();
        for entry in &plan.entries {
            let outcome = match entry.kind {
                CacheKind::Build => fs::remove_dir_all(&entry.path)
                    .map_err(|e| EntryError::new(&entry.path, e.to_string())),
                CacheKind::Module => self.clean_module_cache(entry),
            };

            match outcome {
                Ok(()) => {
                    tracing::info!(path = %entry.path.display(), bytes = entry.size_bytes, "removed cache");
                    result.caches_removed += 1;
                    result.bytes_reclaimed += entry.size_bytes;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to remove cache");
                    result.errors.push(err);
                }
            }
        }
        result
    }

    /// Plan and execute in one step.
    pub fn clean(&self, options: &PruneOptions) -> CacheResult<CleanResult> {
        let plan = self.plan_clean(options)?;
        Ok(self.execute_clean(&plan, options.dry_run))
    }

    fn clean_module_cache(&self, entry: &CacheEntry) -> Result<(), EntryError> {
        let version = entry.toolchain_version.as_str();
        let binary = self.layout.go_binary(version);
        let program = if version != SHARED_VERSION_LABEL && binary.is_file() {
            binary.display().to_string()
        } else {
            "go".to_string()
        };

        let mut command = ProcessCommand::new(program)
            .arg("clean")
            .arg("-modcache")
            .env("GOMODCACHE", entry.path.display().to_string());
        if version != SHARED_VERSION_LABEL {
            command = command.env("GOENV_VERSION", version);
        }

        tracing::debug!(command = %command.display(), "cleaning module cache");
        let output = self
            .runner
            .run(&command)
            .map_err(|e| EntryError::new(&entry.path, e.to_string()))?;
        if output.success {
            Ok(())
        } else {
            let detail = output.combined();
            let detail = detail.trim();
            let message = if detail.is_empty() {
                format!("'{}' failed", command.display())
            } else {
                format!("'{}' failed: {}", command.display(), detail)
            };
            Err(EntryError::new(&entry.path, message))
        }
    }

    /// Renames needed to qualify legacy caches with the host platform.
    pub fn plan_migration(&self) -> Vec<MigrationTask> {
        let inventory = self.enumerator(true).list(&self.layout.installed_versions());
        plan_migration(&inventory.entries, &self.host.target())
    }

    /// Migrate legacy caches. Re-running is a no-op once none remain.
    pub fn migrate(&self, dry_run: bool) -> MigrateResult {
        run_migration(&self.plan_migration(), dry_run)
    }

    /// Toolchain records for build caches, optionally for one version.
    ///
    /// A missing sidecar yields a record without `build_info`; an unreadable
    /// one yields a record carrying `error`.
    pub fn info(&self, version: Option<&str>) -> CacheResult<Vec<InfoRecord>> {
        let versions = self.versions(version)?;
        let inventory = self.enumerator(true).list(&versions);

        let records = inventory
            .entries
            .iter()
            .filter(|e| e.kind == CacheKind::Build)
            .map(|e| {
                let (build_info, error) = match BuildInfo::read_from(&e.path) {
                    Ok(info) => (info, None),
                    Err(err) => (None, Some(err.to_string())),
                };
                InfoRecord {
                    version: e.toolchain_version.clone(),
                    cache_dir: dir_name(&e.path),
                    path: e.path.clone(),
                    build_info,
                    error,
                }
            })
            .collect();
        Ok(records)
    }

    /// Advisory warnings about `inventory` as of `now`.
    pub fn validate(&self, inventory: &Inventory, now: SystemTime) -> Vec<ValidationWarning> {
        let stale_after = self.settings.stale_after();
        let mut warnings = Vec::new();

        for entry in &inventory.entries {
            if entry.old_format {
                warnings.push(ValidationWarning {
                    kind: WarningKind::OldFormat,
                    path: entry.path.clone(),
                    message: format!(
                        "Go {} has an old-format build cache; run 'toolcache migrate'",
                        entry.toolchain_version
                    ),
                });
            }
            if entry.size_bytes > self.settings.large_cache_bytes {
                warnings.push(ValidationWarning {
                    kind: WarningKind::Large,
                    path: entry.path.clone(),
                    message: format!(
                        "Go {} {} cache is {}; consider 'toolcache clean'",
                        entry.toolchain_version,
                        entry.label(),
                        crate::format::format_bytes(entry.size_bytes)
                    ),
                });
            }
            let age = now.duration_since(entry.modified_at).unwrap_or(Duration::ZERO);
            if !stale_after.is_zero() && age > stale_after {
                warnings.push(ValidationWarning {
                    kind: WarningKind::Stale,
                    path: entry.path.clone(),
                    message: format!(
                        "Go {} {} cache unused for {} days",
                        entry.toolchain_version,
                        entry.label(),
                        age.as_secs() / 86_400
                    ),
                });
            }
        }
        warnings
    }

    /// Fingerprint of the native toolchain described by `env`.
    pub fn fingerprint(&self, env: &ToolchainEnv) -> Option<String> {
        FingerprintCalculator::new(&self.runner).fingerprint(env)
    }

    /// Build-cache name the toolchain in `env` should use.
    ///
    /// Unlike migration this honours `GOOS`/`GOARCH`, since it names the
    /// cache for the configured build target.
    pub fn cache_name_for(&self, env: &ToolchainEnv) -> BuildCacheName {
        let target = Target::new(
            env.get("GOOS").unwrap_or(self.host.os.as_str()),
            env.get("GOARCH").unwrap_or(self.host.arch.as_str()),
        );
        let family = ArchFamily::from_arch(&target.arch);

        let mut name = BuildCacheName::new(target);
        if let Some(key) = family.abi_key() {
            if let Some(value) = env.get(key) {
                name = name.with_abi(key, value);
            }
        }
        if let Some(experiments) = env.get(EXPERIMENT_KEY) {
            name = name.with_abi(EXPERIMENT_KEY, experiments);
        }
        if let Some(fingerprint) = self.fingerprint(env) {
            name = name.with_fingerprint(fingerprint);
        }
        name
    }

    /// Write a `build.info` sidecar for `env` into `version`'s build cache
    /// and return the cache directory.
    pub fn record_build_info(&self, version: &str, env: &ToolchainEnv) -> CacheResult<PathBuf> {
        self.versions(Some(version))?;
        let dir = self
            .layout
            .version_dir(version)
            .join(self.cache_name_for(env).encode());
        BuildInfo::collect(env, &self.runner).write_to(&dir)?;
        Ok(dir)
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
