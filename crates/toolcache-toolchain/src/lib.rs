//! Native-toolchain identity for build caches
//!
//! Caches produced with native compilation enabled depend on the C/C++
//! toolchain that was on the machine at build time. This crate derives a
//! stable fingerprint from that toolchain and reads/writes the `build.info`
//! sidecar that records it next to the cache.
//!
//! External processes (compiler probes, the toolchain's own clean command)
//! go through [`ProcessRunner`] so callers and tests can substitute them.

mod build_info;
mod env;
mod fingerprint;
mod process;

pub use build_info::{BuildInfo, BuildInfoError, BUILD_INFO_FILENAME};
pub use env::ToolchainEnv;
pub use fingerprint::{compiler_version, FingerprintCalculator, TRACKED_VARS, VERSION_MAX_LEN};
pub use process::{ProcessCommand, ProcessError, ProcessOutput, ProcessRunner, SystemRunner};
