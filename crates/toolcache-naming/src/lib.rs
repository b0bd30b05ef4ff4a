//! Build-cache directory naming
//!
//! Every installed toolchain version keeps its build caches in directories
//! whose names encode the target they were built for:
//!
//! ```text
//! go-build-<os>-<arch>[-<abi>]*[-exp-<experiments>][-cgo-<hash>]
//! ```
//!
//! A bare `go-build` is the legacy layout that predates architecture
//! qualification. Decoding never fails: tokens that do not belong to the
//! target's ABI vocabulary are dropped, so names written by newer tools
//! still classify.

mod abi;
mod name;

pub use abi::{AbiMap, ArchFamily, EXPERIMENT_KEY};
pub use name::{
    decode, encode, is_build_cache_name, BuildCacheName, DecodedName, Target,
    BUILD_CACHE_PREFIX, FINGERPRINT_PREFIX_LEN, MODULE_CACHE_DIR,
};
