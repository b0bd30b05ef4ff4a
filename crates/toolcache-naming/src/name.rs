//! Encoding and decoding of build-cache directory names

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::abi::{AbiMap, ArchFamily, EXPERIMENT_KEY};

/// Literal that marks a directory as a build cache.
pub const BUILD_CACHE_PREFIX: &str = "go-build";

/// Fixed name of a module cache directory.
pub const MODULE_CACHE_DIR: &str = "go-mod";

/// Number of fingerprint characters embedded in a name.
pub const FINGERPRINT_PREFIX_LEN: usize = 8;

const EXPERIMENT_MARKER: &str = "exp";
const NATIVE_MARKER: &str = "cgo";

/// Target platform of a build cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Target {
    /// Operating system (e.g. "linux", "darwin")
    pub os: String,
    /// Architecture (e.g. "amd64", "arm64")
    pub arch: String,
}

impl Target {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// `<os>-<arch>` label used in listings.
    pub fn label(&self) -> String {
        format!("{}-{}", self.os, self.arch)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// Result of decoding a directory name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedName {
    /// Target platform; `None` for the legacy name and for unparseable suffixes
    pub target: Option<Target>,
    /// Recognized ABI variants, plus experiments under [`EXPERIMENT_KEY`]
    pub abi: AbiMap,
    /// Native-toolchain fingerprint fragment from a `cgo-<hash>` suffix
    pub toolchain_fingerprint: Option<String>,
    /// True only for the bare legacy name
    pub old_format: bool,
}

/// Whether `name` belongs to the build-cache namespace (legacy or qualified).
pub fn is_build_cache_name(name: &str) -> bool {
    match name.strip_prefix(BUILD_CACHE_PREFIX) {
        Some(rest) => rest.is_empty() || rest.starts_with('-'),
        None => false,
    }
}

/// Decode a build-cache directory name.
///
/// Never fails. Names outside the build-cache namespace, or with fewer than
/// two suffix components, decode to an empty descriptor.
pub fn decode(name: &str) -> DecodedName {
    if name == BUILD_CACHE_PREFIX {
        return DecodedName {
            old_format: true,
            ..DecodedName::default()
        };
    }

    let Some(suffix) = name
        .strip_prefix(BUILD_CACHE_PREFIX)
        .and_then(|rest| rest.strip_prefix('-'))
    else {
        return DecodedName::default();
    };

    let mut parts = suffix.split('-');
    let (os, arch) = match (parts.next(), parts.next()) {
        (Some(os), Some(arch)) if !os.is_empty() && !arch.is_empty() => (os, arch),
        _ => return DecodedName::default(),
    };

    let family = ArchFamily::from_arch(arch);
    let tokens: Vec<&str> = parts.filter(|t| !t.is_empty()).collect();

    let mut decoded = DecodedName {
        target: Some(Target::new(os, arch)),
        ..DecodedName::default()
    };

    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            NATIVE_MARKER => {
                if let Some(hash) = tokens.get(i + 1) {
                    decoded.toolchain_fingerprint = Some(hash.to_string());
                    i += 2;
                } else {
                    i += 1;
                }
            }
            EXPERIMENT_MARKER => {
                // Payload runs up to the fingerprint marker, since experiment
                // lists are written with dashes in place of commas.
                let start = i + 1;
                let end = tokens[start..]
                    .iter()
                    .position(|t| *t == NATIVE_MARKER)
                    .map_or(tokens.len(), |offset| start + offset);
                if end > start {
                    decoded
                        .abi
                        .insert(EXPERIMENT_KEY.to_string(), tokens[start..end].join(","));
                }
                i = end.max(start);
            }
            token => {
                if let (Some(key), Some(value)) = (family.abi_key(), family.parse_token(token)) {
                    decoded.abi.insert(key.to_string(), value);
                }
                i += 1;
            }
        }
    }

    decoded
}

/// Encode a target and its ABI variants into a directory name.
pub fn encode(os: &str, arch: &str, abi: &AbiMap) -> String {
    BuildCacheName {
        target: Target::new(os, arch),
        abi: abi.clone(),
        toolchain_fingerprint: None,
    }
    .encode()
}

/// Fully-qualified build-cache name, the inverse of [`decode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCacheName {
    pub target: Target,
    pub abi: AbiMap,
    pub toolchain_fingerprint: Option<String>,
}

impl BuildCacheName {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            abi: AbiMap::new(),
            toolchain_fingerprint: None,
        }
    }

    /// Add an ABI variant or experiment list.
    pub fn with_abi(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.abi.insert(key.into(), value.into());
        self
    }

    /// Tag with a native-toolchain fingerprint (only a prefix is embedded).
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        let fingerprint = fingerprint.into();
        if !fingerprint.is_empty() {
            self.toolchain_fingerprint = Some(fingerprint);
        }
        self
    }

    /// Render the directory name.
    ///
    /// Only the ABI key belonging to the target's architecture family is
    /// written; other keys have no representation in the grammar.
    pub fn encode(&self) -> String {
        let mut name = format!(
            "{}-{}-{}",
            BUILD_CACHE_PREFIX, self.target.os, self.target.arch
        );
        let family = ArchFamily::from_arch(&self.target.arch);

        if let Some(value) = family
            .abi_key()
            .and_then(|key| self.abi.get(key))
            .filter(|v| !v.is_empty())
        {
            name.push('-');
            name.push_str(&family.encode_value(value));
        }

        if let Some(experiments) = self.abi.get(EXPERIMENT_KEY).filter(|v| !v.is_empty()) {
            name.push('-');
            name.push_str(EXPERIMENT_MARKER);
            name.push('-');
            name.push_str(&experiments.replace(',', "-"));
        }

        if let Some(fingerprint) = &self.toolchain_fingerprint {
            let prefix: String = fingerprint.chars().take(FINGERPRINT_PREFIX_LEN).collect();
            name.push('-');
            name.push_str(NATIVE_MARKER);
            name.push('-');
            name.push_str(&prefix);
        }

        name
    }
}

impl fmt::Display for BuildCacheName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abi(pairs: &[(&str, &str)]) -> AbiMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_legacy_name_is_old_format() {
        let decoded = decode("go-build");
        assert!(decoded.old_format);
        assert!(decoded.target.is_none());
        assert!(decoded.abi.is_empty());
    }

    #[test]
    fn test_qualified_name_is_not_old_format() {
        let decoded = decode("go-build-linux-amd64");
        assert!(!decoded.old_format);
        assert_eq!(decoded.target, Some(Target::new("linux", "amd64")));
        assert!(decoded.abi.is_empty());
        assert!(decoded.toolchain_fingerprint.is_none());
    }

    #[test]
    fn test_round_trip_every_family() {
        let cases: &[(&str, &str, &[(&str, &str)])] = &[
            ("linux", "amd64", &[("GOAMD64", "v3")]),
            ("linux", "arm", &[("GOARM", "6")]),
            ("linux", "386", &[("GO386", "softfloat")]),
            ("linux", "mips", &[("GOMIPS", "softfloat")]),
            ("linux", "mipsle", &[("GOMIPS", "hardfloat")]),
            ("linux", "mips64le", &[("GOMIPS64", "softfloat")]),
            ("aix", "ppc64", &[("GOPPC64", "power9")]),
            ("linux", "ppc64le", &[("GOPPC64", "power10")]),
            ("linux", "riscv64", &[("GORISCV64", "rva22u64")]),
            ("js", "wasm", &[("GOWASM", "satconv")]),
            ("darwin", "arm64", &[]),
            ("linux", "amd64", &[("GOAMD64", "v2"), ("GOEXPERIMENT", "rangefunc,aliastypeparams")]),
        ];

        for (os, arch, pairs) in cases {
            let expected = abi(pairs);
            let name = encode(os, arch, &expected);
            let decoded = decode(&name);
            assert_eq!(decoded.target, Some(Target::new(*os, *arch)), "{}", name);
            assert_eq!(decoded.abi, expected, "{}", name);
            assert!(!decoded.old_format, "{}", name);
        }
    }

    #[test]
    fn test_arm_bare_digit_decodes() {
        let decoded = decode("go-build-linux-arm-7");
        assert_eq!(decoded.abi.get("GOARM").map(String::as_str), Some("7"));
    }

    #[test]
    fn test_unknown_tokens_are_dropped() {
        let decoded = decode("go-build-linux-amd64-turbo-v3-future");
        assert_eq!(decoded.target, Some(Target::new("linux", "amd64")));
        assert_eq!(decoded.abi, abi(&[("GOAMD64", "v3")]));
    }

    #[test]
    fn test_reserved_payloads_are_not_abi_tokens() {
        // riscv64 accepts any token as its ABI tag
        let decoded = decode("go-build-linux-riscv64-exp-arenas-cgo-deadbeef");
        assert_eq!(
            decoded.abi.get(EXPERIMENT_KEY).map(String::as_str),
            Some("arenas")
        );
        assert!(!decoded.abi.contains_key("GORISCV64"));
        assert_eq!(decoded.toolchain_fingerprint.as_deref(), Some("deadbeef"));
    }

    #[test]
    fn test_bare_native_marker_is_dropped() {
        let decoded = decode("go-build-linux-riscv64-cgo");
        assert!(decoded.abi.is_empty());
        assert!(decoded.toolchain_fingerprint.is_none());
    }

    #[test]
    fn test_unparseable_suffix_has_no_target() {
        let decoded = decode("go-build-linux");
        assert!(decoded.target.is_none());
        assert!(!decoded.old_format);

        let decoded = decode("go-buildx-linux-amd64");
        assert!(decoded.target.is_none());
    }

    #[test]
    fn test_is_build_cache_name() {
        assert!(is_build_cache_name("go-build"));
        assert!(is_build_cache_name("go-build-darwin-arm64"));
        assert!(!is_build_cache_name("go-buildx"));
        assert!(!is_build_cache_name("go-mod"));
        assert!(!is_build_cache_name("bin"));
    }

    #[test]
    fn test_fingerprint_prefix_is_embedded() {
        let name = BuildCacheName::new(Target::new("linux", "amd64"))
            .with_fingerprint("0123456789abcdef0123456789abcdef");
        assert_eq!(name.encode(), "go-build-linux-amd64-cgo-01234567");

        let decoded = decode(&name.to_string());
        assert_eq!(decoded.toolchain_fingerprint.as_deref(), Some("01234567"));
    }

    #[test]
    fn test_empty_fingerprint_is_ignored() {
        let name = BuildCacheName::new(Target::new("linux", "amd64")).with_fingerprint("");
        assert_eq!(name.encode(), "go-build-linux-amd64");
    }

    #[test]
    fn test_foreign_abi_keys_are_not_encoded() {
        let name = BuildCacheName::new(Target::new("darwin", "arm64")).with_abi("GOAMD64", "v3");
        assert_eq!(name.encode(), "go-build-darwin-arm64");
    }

    #[test]
    fn test_target_label_and_serialization() {
        let target = Target::new("linux", "amd64");
        assert_eq!(target.label(), "linux-amd64");
        assert_eq!(target.to_string(), "linux/amd64");

        let json = serde_json::to_string(&target).unwrap();
        assert_eq!(json, r#"{"os":"linux","arch":"amd64"}"#);
    }
}
