//! Resolved per-invocation settings with provenance
//!
//! Settings are built once from the layers below and then passed by
//! reference to every operation:
//! 1. Built-in defaults
//! 2. `<root>/toolcache.toml`
//! 3. Environment (`GOENV_ROOT`, `GOENV_ASSUME_YES`)
//! 4. CLI flags

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::defaults::BuiltinDefaults;

/// Config file name inside the installation root
pub const CONFIG_FILE_NAME: &str = "toolcache.toml";

/// Environment variable overriding the installation root
pub const ROOT_ENV: &str = "GOENV_ROOT";

/// Environment variable that auto-confirms destructive operations
pub const ASSUME_YES_ENV: &str = "GOENV_ASSUME_YES";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot determine installation root: set GOENV_ROOT or HOME")]
    NoRoot,

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

/// Origin of a configuration source
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Env,
    Cli,
}

/// A contributing config source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (file layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes (file layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ConfigSource {
    fn bare(origin: ConfigOrigin) -> Self {
        Self {
            origin,
            path: None,
            digest: None,
        }
    }
}

/// Contents of `toolcache.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub scan_timeout_secs: Option<u64>,
    pub assume_yes: Option<bool>,
    pub large_cache_bytes: Option<u64>,
    pub stale_after_days: Option<u64>,
}

impl ConfigFile {
    /// Load a config file, returning `None` when it does not exist.
    pub fn load(path: &Path) -> Result<Option<(Self, String)>, ConfigError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        let digest = hex::encode(Sha256::digest(&bytes));
        let contents = String::from_utf8_lossy(&bytes);
        let file: ConfigFile = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        Ok(Some((file, digest)))
    }
}

/// Overrides supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root: Option<PathBuf>,
    pub force: bool,
}

/// Immutable settings for one invocation
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    /// Installation root holding `versions/` and `shared/`
    pub root: PathBuf,

    /// Per-cache scan budget
    pub scan_timeout: Duration,

    /// Skip confirmation prompts
    pub assume_yes: bool,

    /// Threshold for the large-cache warning
    pub large_cache_bytes: u64,

    /// Threshold for the stale-cache warning, in days
    pub stale_after_days: u64,

    /// Layers that contributed, lowest precedence first
    pub sources: Vec<ConfigSource>,
}

impl Settings {
    /// Built-in defaults rooted at `root`, with no file, env or CLI layer.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let defaults = BuiltinDefaults::default();
        Self {
            root: root.into(),
            scan_timeout: defaults.scan_timeout(),
            assume_yes: defaults.assume_yes,
            large_cache_bytes: defaults.large_cache_bytes,
            stale_after_days: defaults.stale_after_days,
            sources: vec![ConfigSource::bare(ConfigOrigin::Builtin)],
        }
    }

    /// Resolve settings from all layers.
    ///
    /// `lookup` reads environment variables; pass `|k| std::env::var(k).ok()`
    /// in production.
    pub fn resolve<F>(lookup: F, cli: &CliOverrides) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let defaults = BuiltinDefaults::default();

        let root = match (&cli.root, non_empty(ROOT_ENV), non_empty("HOME")) {
            (Some(root), _, _) => root.clone(),
            (None, Some(root), _) => PathBuf::from(root),
            (None, None, Some(home)) => Path::new(&home).join(&defaults.root_dir_name),
            (None, None, None) => return Err(ConfigError::NoRoot),
        };

        let mut settings = Self::with_root(root);

        // Layer 2: config file
        let config_path = settings.root.join(CONFIG_FILE_NAME);
        if let Some((file, digest)) = ConfigFile::load(&config_path)? {
            settings.apply_file(&file)?;
            settings.sources.push(ConfigSource {
                origin: ConfigOrigin::File,
                path: Some(config_path.display().to_string()),
                digest: Some(digest),
            });
        }

        // Layer 3: environment
        let env_root = cli.root.is_none() && non_empty(ROOT_ENV).is_some();
        let env_yes = non_empty(ASSUME_YES_ENV).is_some_and(|v| is_truthy(&v));
        if env_yes {
            settings.assume_yes = true;
        }
        if env_root || env_yes {
            settings.sources.push(ConfigSource::bare(ConfigOrigin::Env));
        }

        // Layer 4: CLI
        if cli.force {
            settings.assume_yes = true;
        }
        if cli.root.is_some() || cli.force {
            settings.sources.push(ConfigSource::bare(ConfigOrigin::Cli));
        }

        Ok(settings)
    }

    fn apply_file(&mut self, file: &ConfigFile) -> Result<(), ConfigError> {
        if let Some(secs) = file.scan_timeout_secs {
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "scan_timeout_secs",
                    message: "must be greater than zero".to_string(),
                });
            }
            self.scan_timeout = Duration::from_secs(secs);
        }
        if let Some(yes) = file.assume_yes {
            self.assume_yes = yes;
        }
        if let Some(bytes) = file.large_cache_bytes {
            self.large_cache_bytes = bytes;
        }
        if let Some(days) = file.stale_after_days {
            self.stale_after_days = days;
        }
        Ok(())
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_days.saturating_mul(86_400))
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_from_home() {
        let settings =
            Settings::resolve(lookup_from(&[("HOME", "/home/dev")]), &CliOverrides::default())
                .unwrap();

        assert_eq!(settings.root, PathBuf::from("/home/dev/.goenv"));
        assert_eq!(settings.scan_timeout, Duration::from_secs(10));
        assert!(!settings.assume_yes);
        assert_eq!(settings.sources, vec![ConfigSource::bare(ConfigOrigin::Builtin)]);
    }

    #[test]
    fn test_no_root() {
        let err = Settings::resolve(lookup_from(&[]), &CliOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::NoRoot));
    }

    #[test]
    fn test_env_root_and_assume_yes() {
        let settings = Settings::resolve(
            lookup_from(&[
                ("HOME", "/home/dev"),
                ("GOENV_ROOT", "/opt/goenv"),
                ("GOENV_ASSUME_YES", "TRUE"),
            ]),
            &CliOverrides::default(),
        )
        .unwrap();

        assert_eq!(settings.root, PathBuf::from("/opt/goenv"));
        assert!(settings.assume_yes);
        assert_eq!(settings.sources.last().unwrap().origin, ConfigOrigin::Env);
    }

    #[test]
    fn test_assume_yes_rejects_other_values() {
        let settings = Settings::resolve(
            lookup_from(&[("GOENV_ROOT", "/opt/goenv"), ("GOENV_ASSUME_YES", "0")]),
            &CliOverrides::default(),
        )
        .unwrap();
        assert!(!settings.assume_yes);
    }

    #[test]
    fn test_file_layer() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            "scan_timeout_secs = 30\nassume_yes = true\nstale_after_days = 90\n",
        )
        .unwrap();

        let cli = CliOverrides {
            root: Some(temp.path().to_path_buf()),
            force: false,
        };
        let settings = Settings::resolve(lookup_from(&[]), &cli).unwrap();

        assert_eq!(settings.scan_timeout, Duration::from_secs(30));
        assert!(settings.assume_yes);
        assert_eq!(settings.stale_after(), Duration::from_secs(90 * 86_400));
        assert_eq!(settings.large_cache_bytes, 5 * 1024 * 1024 * 1024);

        let origins: Vec<_> = settings.sources.iter().map(|s| s.origin).collect();
        assert_eq!(
            origins,
            vec![ConfigOrigin::Builtin, ConfigOrigin::File, ConfigOrigin::Cli]
        );
        assert_eq!(settings.sources[1].digest.as_ref().unwrap().len(), 64);
    }

    #[test]
    fn test_file_parse_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE_NAME), "scan_timeout = 'soon'\n").unwrap();

        let cli = CliOverrides {
            root: Some(temp.path().to_path_buf()),
            force: false,
        };
        let err = Settings::resolve(lookup_from(&[]), &cli).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE_NAME), "scan_timeout_secs = 0\n").unwrap();

        let cli = CliOverrides {
            root: Some(temp.path().to_path_buf()),
            force: false,
        };
        let err = Settings::resolve(lookup_from(&[]), &cli).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "scan_timeout_secs",
                ..
            }
        ));
    }

    #[test]
    fn test_huge_stale_after_days_saturates() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            format!("stale_after_days = {}\n", i64::MAX),
        )
        .unwrap();

        let cli = CliOverrides {
            root: Some(temp.path().to_path_buf()),
            force: false,
        };
        let settings = Settings::resolve(lookup_from(&[]), &cli).unwrap();
        assert_eq!(settings.stale_after(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_cli_overrides_env() {
        let cli = CliOverrides {
            root: Some(PathBuf::from("/cli/root")),
            force: true,
        };
        let settings =
            Settings::resolve(lookup_from(&[("GOENV_ROOT", "/env/root")]), &cli).unwrap();

        assert_eq!(settings.root, PathBuf::from("/cli/root"));
        assert!(settings.assume_yes);
        let origins: Vec<_> = settings.sources.iter().map(|s| s.origin).collect();
        assert_eq!(origins, vec![ConfigOrigin::Builtin, ConfigOrigin::Cli]);
    }
}
