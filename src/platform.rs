//! Runtime host identity

use std::env::consts;
use std::fs;
use std::path::Path;

use serde::Serialize;
use toolcache_naming::Target;
use toolcache_toolchain::{ProcessCommand, ProcessRunner};

/// Platform of the running process, in toolchain vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostPlatform {
    pub os: String,
    pub arch: String,
}

impl HostPlatform {
    /// Platform this binary is running on. Never reads `GOOS`/`GOARCH`.
    pub fn current() -> Self {
        Self {
            os: map_os(consts::OS).to_string(),
            arch: map_arch(consts::ARCH, cfg!(target_endian = "little")).to_string(),
        }
    }

    pub fn target(&self) -> Target {
        Target::new(&self.os, &self.arch)
    }
}

/// Map a Rust OS name onto the toolchain's name.
pub fn map_os(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

/// Map a Rust architecture name onto the toolchain's name.
///
/// Rust reports big and little endian variants of some architectures under
/// one name; the toolchain names them apart.
pub fn map_arch(arch: &str, little_endian: bool) -> &str {
    match (arch, little_endian) {
        ("powerpc64", true) => "ppc64le",
        ("powerpc64", false) => "ppc64",
        ("mips", true) => "mipsle",
        ("mips64", true) => "mips64le",
        (other, _) => map_arch_name(other),
    }
}

fn map_arch_name(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        "loongarch64" => "loong64",
        "s390x" => "s390x",
        "wasm32" => "wasm",
        other => other,
    }
}

/// Emulation and virtualization flags for the status report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnvironmentFlags {
    pub rosetta: bool,
    pub wsl: bool,
    pub container: bool,
}

impl EnvironmentFlags {
    pub fn detect<R: ProcessRunner>(runner: &R) -> Self {
        Self {
            rosetta: cfg!(target_os = "macos") && is_translated(runner),
            wsl: is_wsl(Path::new("/proc/version")),
            container: is_container(Path::new("/")),
        }
    }
}

fn is_translated<R: ProcessRunner>(runner: &R) -> bool {
    let cmd = ProcessCommand::new("sysctl")
        .arg("-n")
        .arg("sysctl.proc_translated");
    match runner.run(&cmd) {
        Ok(out) => out.success && out.stdout.trim() == "1",
        Err(_) => false,
    }
}

fn is_wsl(proc_version: &Path) -> bool {
    fs::read_to_string(proc_version)
        .map(|s| s.to_ascii_lowercase().contains("microsoft"))
        .unwrap_or(false)
}

fn is_container(root: &Path) -> bool {
    root.join(".dockerenv").exists() || root.join("run/.containerenv").exists()
}
