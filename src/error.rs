//! Error types for cache management
//!
//! Read-path problems (unreadable directories, scan timeouts, odd names)
//! never surface here; they degrade to partial data. `CacheError` covers
//! pre-flight failures that stop an operation before anything is touched.
//! Failures of individual deletions or renames are collected as
//! [`EntryError`] values instead.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use toolcache_toolchain::BuildInfoError;

use crate::config::ConfigError;
use crate::units::UnitError;

/// Cache result type
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors from cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid cache kind: {0} (must be 'build', 'mod', or 'all')")]
    InvalidKind(String),

    #[error("version {0} is not installed")]
    UnknownVersion(String),

    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    BuildInfo(#[from] BuildInfoError),
}

/// Failure to remove or rename a single cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryError {
    pub path: PathBuf,
    pub message: String,
}

impl EntryError {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for EntryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}
