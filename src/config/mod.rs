//! Configuration layering
//!
//! Implements the 4-layer resolution:
//! 1. Built-in defaults
//! 2. Root config (`<root>/toolcache.toml`)
//! 3. Environment
//! 4. CLI flags

mod defaults;
mod settings;

pub use defaults::BuiltinDefaults;
pub use settings::{
    CliOverrides, ConfigError, ConfigFile, ConfigOrigin, ConfigSource, Settings,
    ASSUME_YES_ENV, CONFIG_FILE_NAME, ROOT_ENV,
};
