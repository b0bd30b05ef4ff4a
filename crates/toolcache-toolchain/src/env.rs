//! Snapshot of the environment relevant to native compilation

use std::collections::BTreeMap;

/// Immutable environment snapshot.
///
/// Fingerprinting reads from this rather than from the live process
/// environment so that results are reproducible in tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainEnv {
    vars: BTreeMap<String, String>,
}

impl ToolchainEnv {
    /// Capture the current process environment.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Build from explicit key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value of `key`, treating empty values as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Native compilation is on unless `CGO_ENABLED=0`.
    pub fn native_enabled(&self) -> bool {
        self.get("CGO_ENABLED") != Some("0")
    }
}
