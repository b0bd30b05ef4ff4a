//! `build.info` sidecar recording the native toolchain behind a build cache

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::env::ToolchainEnv;
use crate::fingerprint::{compiler_version, FingerprintCalculator};
use crate::process::ProcessRunner;

/// Sidecar file name inside a build-cache directory.
pub const BUILD_INFO_FILENAME: &str = "build.info";

/// Errors reading or writing a sidecar
#[derive(Debug, thiserror::Error)]
pub enum BuildInfoError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed build info in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Native toolchain used to populate a build cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cc: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cc_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cxx: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cxx_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cflags: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cxxflags: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ldflags: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pkg_config: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pkg_config_path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cgo_enabled: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sysroot: String,
    #[serde(default)]
    pub toolchain_hash: String,
}

impl BuildInfo {
    /// Record the toolchain described by `env`.
    pub fn collect<R: ProcessRunner>(env: &ToolchainEnv, runner: &R) -> Self {
        let get = |key: &str| env.get(key).unwrap_or_default().to_string();
        let mut info = Self {
            created: Utc::now(),
            cc: String::new(),
            cc_version: String::new(),
            cxx: String::new(),
            cxx_version: String::new(),
            cflags: String::new(),
            cxxflags: String::new(),
            ldflags: String::new(),
            pkg_config: String::new(),
            pkg_config_path: String::new(),
            cgo_enabled: get("CGO_ENABLED"),
            sysroot: String::new(),
            toolchain_hash: String::new(),
        };

        if !env.native_enabled() {
            return info;
        }

        info.cc = get("CC");
        info.cxx = get("CXX");
        info.cflags = get("CFLAGS");
        info.cxxflags = get("CXXFLAGS");
        info.ldflags = get("LDFLAGS");
        info.pkg_config = get("PKG_CONFIG");
        info.pkg_config_path = get("PKG_CONFIG_PATH");
        info.sysroot = get("SYSROOT");
        if !info.cc.is_empty() {
            info.cc_version = compiler_version(runner, &info.cc).unwrap_or_default();
        }
        if !info.cxx.is_empty() {
            info.cxx_version = compiler_version(runner, &info.cxx).unwrap_or_default();
        }
        info.toolchain_hash = FingerprintCalculator::new(runner)
            .fingerprint(env)
            .unwrap_or_default();

        info
    }

    /// Whether this cache was built with a native compiler.
    pub fn uses_native_toolchain(&self) -> bool {
        !self.cc.is_empty()
    }

    /// Short form of the hash for display.
    pub fn short_hash(&self) -> &str {
        let end = self
            .toolchain_hash
            .char_indices()
            .nth(16)
            .map_or(self.toolchain_hash.len(), |(i, _)| i);
        &self.toolchain_hash[..end]
    }

    /// Read the sidecar from `cache_dir`.
    ///
    /// A missing sidecar is normal for caches built without native
    /// compilation and yields `Ok(None)`.
    pub fn read_from(cache_dir: &Path) -> Result<Option<Self>, BuildInfoError> {
        let path = cache_dir.join(BUILD_INFO_FILENAME);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(BuildInfoError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| BuildInfoError::Parse {
                path: path.display().to_string(),
                source,
            })
    }

    /// Write the sidecar into `cache_dir` via temp file and rename, so
    /// readers never observe a partial file.
    pub fn write_to(&self, cache_dir: &Path) -> Result<(), BuildInfoError> {
        let path = cache_dir.join(BUILD_INFO_FILENAME);
        let io_err = |source| BuildInfoError::Io {
            path: path.display().to_string(),
            source,
        };

        fs::create_dir_all(cache_dir).map_err(io_err)?;

        let json = serde_json::to_string_pretty(self).map_err(|source| BuildInfoError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        let tmp = cache_dir.join(format!(".{}.{}.tmp", BUILD_INFO_FILENAME, std::process::id()));
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;
        Ok(())
    }
}
