//! Timeout-bounded directory measurement

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime};

use walkdir::WalkDir;

/// How many visited entries pass between wall-clock checks.
const TIMEOUT_CHECK_INTERVAL: u64 = 1000;

/// Bytes and file count for one directory tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub size_bytes: u64,
    /// Exact regular-file count, or `None` when approximate.
    pub files: Option<u64>,
}

impl ScanResult {
    pub fn is_approximate(&self) -> bool {
        self.files.is_none()
    }
}

/// Sum regular-file sizes under `path`.
///
/// With `fast` set only sizes are summed. Once `timeout` has elapsed the walk
/// keeps summing bytes but stops counting files. Unreadable entries are
/// skipped.
pub fn scan_dir(path: &Path, fast: bool, timeout: Duration) -> ScanResult {
    let start = Instant::now();
    let mut size_bytes = 0u64;
    let mut files = 0u64;
    let mut counting = !fast;
    let mut visited = 0u64;

    for entry in WalkDir::new(path).into_iter().filter_map(Result::ok) {
        if counting && visited % TIMEOUT_CHECK_INTERVAL == 0 && start.elapsed() >= timeout {
            tracing::debug!(path = %path.display(), ?timeout, "scan timed out, file count is approximate");
            counting = false;
        }
        visited += 1;

        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(meta) = entry.metadata() {
            size_bytes += meta.len();
            if counting {
                files += 1;
            }
        }
    }

    ScanResult {
        size_bytes,
        files: counting.then_some(files),
    }
}

/// Most recent mtime among the immediate children of `path`, falling back
/// to the directory's own mtime.
pub fn last_modified(path: &Path) -> SystemTime {
    let mut latest = SystemTime::UNIX_EPOCH;

    if let Ok(entries) = fs::read_dir(path) {
        for entry in entries.flatten() {
            if let Ok(mtime) = entry.metadata().and_then(|m| m.modified()) {
                if mtime > latest {
                    latest = mtime;
                }
            }
        }
    }

    if latest == SystemTime::UNIX_EPOCH {
        if let Ok(mtime) = fs::metadata(path).and_then(|m| m.modified()) {
            latest = mtime;
        }
    }

    latest
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn populate(dir: &Path) {
        fs::create_dir_all(dir.join("ab/cd")).unwrap();
        fs::write(dir.join("one"), vec![0u8; 100]).unwrap();
        fs::write(dir.join("ab/two"), vec![0u8; 200]).unwrap();
        fs::write(dir.join("ab/cd/three"), vec![0u8; 300]).unwrap();
    }

    #[test]
    fn test_exact_scan() {
        let temp = TempDir::new().unwrap();
        populate(temp.path());

        let result = scan_dir(temp.path(), false, Duration::from_secs(10));
        assert_eq!(result.size_bytes, 600);
        assert_eq!(result.files, Some(3));
        assert!(!result.is_approximate());
    }

    #[test]
    fn test_fast_scan_same_size() {
        let temp = TempDir::new().unwrap();
        populate(temp.path());

        let exact = scan_dir(temp.path(), false, Duration::from_secs(10));
        let fast = scan_dir(temp.path(), true, Duration::from_secs(10));
        assert_eq!(fast.size_bytes, exact.size_bytes);
        assert_eq!(fast.files, None);
    }

    #[test]
    fn test_zero_timeout_is_approximate() {
        let temp = TempDir::new().unwrap();
        populate(temp.path());

        let result = scan_dir(temp.path(), false, Duration::ZERO);
        assert_eq!(result.size_bytes, 600);
        assert!(result.is_approximate());
    }

    #[test]
    fn test_missing_dir() {
        let temp = TempDir::new().unwrap();
        let result = scan_dir(&temp.path().join("absent"), false, Duration::from_secs(1));
        assert_eq!(result, ScanResult { size_bytes: 0, files: Some(0) });
    }

    #[test]
    fn test_last_modified_empty_dir_uses_own_mtime() {
        let temp = TempDir::new().unwrap();
        let expected = fs::metadata(temp.path()).unwrap().modified().unwrap();
        assert_eq!(last_modified(temp.path()), expected);
    }

    #[test]
    fn test_last_modified_prefers_children() {
        let temp = TempDir::new().unwrap();
        populate(temp.path());
        assert!(last_modified(temp.path()) > SystemTime::UNIX_EPOCH);
    }
}
