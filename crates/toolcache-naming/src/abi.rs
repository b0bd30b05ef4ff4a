//! Architecture families and their ABI variant vocabulary

use std::collections::BTreeMap;

/// ABI variant key → value (e.g. `GOAMD64` → `v3`).
///
/// Ordered so that serialized output and encoded names are stable.
pub type AbiMap = BTreeMap<String, String>;

/// Key under which build-time experiments are stored in an [`AbiMap`].
///
/// The value is comma-joined (`rangefunc,boringcrypto`).
pub const EXPERIMENT_KEY: &str = "GOEXPERIMENT";

/// Architecture family, one per distinct ABI vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchFamily {
    /// 64-bit x86: microarchitecture level `v1`..`v4`
    Amd64,
    /// 32-bit ARM: floating-point revision 5, 6 or 7
    Arm,
    /// 32-bit x86: `sse2` or `softfloat`
    X86,
    /// 32-bit MIPS, either endianness
    Mips,
    /// 64-bit MIPS, either endianness
    Mips64,
    /// 64-bit PowerPC, either endianness
    Ppc64,
    /// RISC-V 64, opaque profile tag
    Riscv64,
    /// WebAssembly, opaque feature tag
    Wasm,
    /// Anything without an ABI vocabulary
    Other,
}

impl ArchFamily {
    /// Classify an architecture name.
    pub fn from_arch(arch: &str) -> Self {
        match arch {
            "amd64" => Self::Amd64,
            "arm" => Self::Arm,
            "386" => Self::X86,
            "mips" | "mipsle" => Self::Mips,
            "mips64" | "mips64le" => Self::Mips64,
            "ppc64" | "ppc64le" => Self::Ppc64,
            "riscv64" => Self::Riscv64,
            "wasm" => Self::Wasm,
            _ => Self::Other,
        }
    }

    /// ABI variable this family is keyed by.
    pub fn abi_key(&self) -> Option<&'static str> {
        match self {
            Self::Amd64 => Some("GOAMD64"),
            Self::Arm => Some("GOARM"),
            Self::X86 => Some("GO386"),
            Self::Mips => Some("GOMIPS"),
            Self::Mips64 => Some("GOMIPS64"),
            Self::Ppc64 => Some("GOPPC64"),
            Self::Riscv64 => Some("GORISCV64"),
            Self::Wasm => Some("GOWASM"),
            Self::Other => None,
        }
    }

    /// Interpret a name token as this family's ABI value.
    ///
    /// Returns `None` for tokens outside the vocabulary.
    pub fn parse_token(&self, token: &str) -> Option<String> {
        match self {
            Self::Amd64 => {
                let level = token.strip_prefix('v')?;
                is_digits(level).then(|| token.to_string())
            }
            Self::Arm => {
                let revision = token.strip_prefix('v').unwrap_or(token);
                matches!(revision, "5" | "6" | "7").then(|| revision.to_string())
            }
            Self::X86 => matches!(token, "sse2" | "softfloat").then(|| token.to_string()),
            Self::Mips | Self::Mips64 => {
                matches!(token, "hardfloat" | "softfloat").then(|| token.to_string())
            }
            Self::Ppc64 => {
                matches!(token, "power8" | "power9" | "power10").then(|| token.to_string())
            }
            Self::Riscv64 | Self::Wasm => Some(token.to_string()),
            Self::Other => None,
        }
    }

    /// Render an ABI value as a name token.
    pub fn encode_value(&self, value: &str) -> String {
        match self {
            Self::Arm if !value.starts_with('v') => format!("v{}", value),
            _ => sanitize(value),
        }
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Replace characters that cannot appear inside a single name token.
fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            ',' | ' ' | '/' | '\\' => '-',
            c => c,
        })
        .collect()
}
