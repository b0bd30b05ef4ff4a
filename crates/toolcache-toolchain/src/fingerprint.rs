//! Toolchain fingerprint calculation
//!
//! The fingerprint partitions build caches by native toolchain: two caches
//! built with different compilers, flags or sysroots must never share a
//! directory. It is a SHA-256 over an order-stable list of `KEY=value`
//! lines, so it only has to be deterministic, never decodable.

use sha2::{Digest, Sha256};

use crate::env::ToolchainEnv;
use crate::process::{ProcessCommand, ProcessRunner};

/// Variables folded into the fingerprint, in hashing order.
pub const TRACKED_VARS: &[&str] = &[
    "CC",
    "CXX",
    "CFLAGS",
    "CXXFLAGS",
    "LDFLAGS",
    "PKG_CONFIG",
    "PKG_CONFIG_PATH",
    "PKG_CONFIG_LIBDIR",
    "CGO_CFLAGS",
    "CGO_CXXFLAGS",
    "CGO_LDFLAGS",
    "AR",
    "SYSROOT",
];

/// Longest compiler version string kept.
pub const VERSION_MAX_LEN: usize = 200;

/// Compiler launchers that wrap the real compiler.
const LAUNCHERS: &[&str] = &["ccache", "distcc"];

/// Derives toolchain fingerprints, probing compilers through `R`.
pub struct FingerprintCalculator<R> {
    runner: R,
}

impl<R: ProcessRunner> FingerprintCalculator<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Ordered `KEY=value` components for `env`.
    ///
    /// Empty when native compilation is disabled.
    pub fn components(&self, env: &ToolchainEnv) -> Vec<String> {
        if !env.native_enabled() {
            return Vec::new();
        }

        let mut components: Vec<String> = TRACKED_VARS
            .iter()
            .filter_map(|key| env.get(key).map(|value| format!("{}={}", key, value)))
            .collect();

        for (key, label) in [("CC", "CC_VERSION"), ("CXX", "CXX_VERSION")] {
            if let Some(version) = env
                .get(key)
                .and_then(|compiler| compiler_version(&self.runner, compiler))
            {
                components.push(format!("{}={}", label, version));
            }
        }

        components
    }

    /// Hex-encoded SHA-256 fingerprint, or `None` when no native toolchain
    /// is in play.
    pub fn fingerprint(&self, env: &ToolchainEnv) -> Option<String> {
        let components = self.components(env);
        if components.is_empty() {
            return None;
        }

        let mut hasher = Sha256::new();
        for component in &components {
            hasher.update(component.as_bytes());
            hasher.update(b"\n");
        }
        Some(hex::encode(hasher.finalize()))
    }
}

/// Self-reported version of a compiler: first line of `--version`, falling
/// back to `-v` (some compilers only print their banner there).
///
/// Launcher prefixes such as `ccache gcc` resolve to the wrapped compiler.
pub fn compiler_version<R: ProcessRunner>(runner: &R, compiler: &str) -> Option<String> {
    let mut words = compiler.split_whitespace();
    let first = words.next()?;
    let program = if LAUNCHERS.iter().any(|l| first.contains(l)) {
        words.next().unwrap_or(first)
    } else {
        first
    };

    let output = match runner.run(&ProcessCommand::new(program).arg("--version")) {
        Ok(out) if out.success => out.stdout,
        _ => match runner.run(&ProcessCommand::new(program).arg("-v")) {
            Ok(out) if out.success => out.combined(),
            Ok(_) => return None,
            Err(e) => {
                tracing::debug!("compiler probe failed for {}: {}", program, e);
                return None;
            }
        },
    };

    let line = output.lines().next()?.trim();
    if line.is_empty() {
        return None;
    }
    Some(line.chars().take(VERSION_MAX_LEN).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{ProcessError, ProcessOutput};
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Answers `<program> <first arg>` from a table; unknown commands fail.
    #[derive(Default)]
    struct FakeRunner {
        responses: HashMap<String, ProcessOutput>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeRunner {
        fn respond(mut self, cmd: &str, stdout: &str, stderr: &str, success: bool) -> Self {
            self.responses.insert(
                cmd.to_string(),
                ProcessOutput {
                    success,
                    stdout: stdout.to_string(),
                    stderr: stderr.to_string(),
                },
            );
            self
        }
    }

    impl ProcessRunner for FakeRunner {
        fn run(&self, command: &ProcessCommand) -> Result<ProcessOutput, ProcessError> {
            let key = command.display();
            self.calls.borrow_mut().push(key.clone());
            self.responses.get(&key).cloned().ok_or_else(|| ProcessError::Spawn {
                program: command.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            })
        }
    }

    fn gcc_runner(version: &str) -> FakeRunner {
        FakeRunner::default().respond("gcc --version", &format!("{}\nCopyright\n", version), "", true)
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let env = ToolchainEnv::from_pairs([("CC", "gcc"), ("CFLAGS", "-O2")]);
        let calc = FingerprintCalculator::new(gcc_runner("gcc (GCC) 13.2.0"));

        let first = calc.fingerprint(&env).unwrap();
        let second = calc.fingerprint(&env).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_any_tracked_variable_changes_hash() {
        let calc = FingerprintCalculator::new(FakeRunner::default());
        let base = ToolchainEnv::from_pairs([("CFLAGS", "-O2")]);
        let base_hash = calc.fingerprint(&base).unwrap();

        for key in TRACKED_VARS {
            let mut env = base.clone();
            env.set(*key, "/changed");
            assert_ne!(calc.fingerprint(&env).unwrap(), base_hash, "{}", key);
        }
    }

    #[test]
    fn test_compiler_upgrade_changes_hash() {
        let env = ToolchainEnv::from_pairs([("CC", "gcc")]);
        let old = FingerprintCalculator::new(gcc_runner("gcc (GCC) 12.1.0"))
            .fingerprint(&env)
            .unwrap();
        let new = FingerprintCalculator::new(gcc_runner("gcc (GCC) 13.2.0"))
            .fingerprint(&env)
            .unwrap();
        assert_ne!(old, new);
    }

    #[test]
    fn test_disabled_native_compilation_is_empty() {
        let env = ToolchainEnv::from_pairs([("CGO_ENABLED", "0"), ("CC", "gcc"), ("CFLAGS", "-O2")]);
        let runner = gcc_runner("gcc (GCC) 13.2.0");
        let calc = FingerprintCalculator::new(&runner);

        assert_eq!(calc.fingerprint(&env), None);
        assert!(runner.calls.borrow().is_empty(), "no compiler probing when disabled");
    }

    #[test]
    fn test_no_components_is_empty() {
        let calc = FingerprintCalculator::new(FakeRunner::default());
        assert_eq!(calc.fingerprint(&ToolchainEnv::default()), None);
    }

    #[test]
    fn test_components_follow_fixed_order() {
        let env = ToolchainEnv::from_pairs([("SYSROOT", "/sdk"), ("AR", "ar"), ("CC", "gcc")]);
        let calc = FingerprintCalculator::new(gcc_runner("gcc 13"));
        assert_eq!(
            calc.components(&env),
            vec!["CC=gcc", "AR=ar", "SYSROOT=/sdk", "CC_VERSION=gcc 13"]
        );
    }

    #[test]
    fn test_version_falls_back_to_dash_v() {
        let runner = FakeRunner::default()
            .respond("cc --version", "", "unknown option", false)
            .respond("cc -v", "", "Apple clang version 15.0.0\nTarget: arm64\n", true);
        assert_eq!(
            compiler_version(&runner, "cc").as_deref(),
            Some("Apple clang version 15.0.0")
        );
    }

    #[test]
    fn test_version_skips_launcher() {
        let runner = gcc_runner("gcc 13");
        assert_eq!(compiler_version(&runner, "ccache gcc").as_deref(), Some("gcc 13"));
        assert_eq!(runner.calls.borrow()[0], "gcc --version");
    }

    #[test]
    fn test_version_is_truncated() {
        let long = "x".repeat(500);
        let runner = FakeRunner::default().respond("gcc --version", &long, "", true);
        let version = compiler_version(&runner, "gcc").unwrap();
        assert_eq!(version.len(), VERSION_MAX_LEN);
    }

    #[test]
    fn test_missing_compiler_has_no_version() {
        assert_eq!(compiler_version(&FakeRunner::default(), "gcc"), None);
        assert_eq!(compiler_version(&FakeRunner::default(), "   "), None);
    }
}
