//! Utility functions shared across autopilot modules.

use std::fs;
use std::io::Read;
use std::path::Path;

use crate::error::{AutopilotError, Result};

/// Maximum file size that can be read into memory (10 MB).
///
/// Guards read externally owned files (transcripts excluded, those are only
/// stat'd); this limit protects against a surprisingly large settings.json
/// or progress.json wedging the hook.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Read a file into a string with size limit protection.
pub fn read_to_string_limited(path: &Path) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| AutopilotError::storage(path, e))?;

    let size = metadata.len();
    if size > MAX_FILE_SIZE {
        return Err(AutopilotError::settings(format!(
            "File {} is too large ({} bytes, max {} bytes)",
            path.display(),
            size,
            MAX_FILE_SIZE
        )));
    }

    fs::read_to_string(path).map_err(|e| AutopilotError::storage(path, e))
}

/// Read at most `max_bytes` from the start of a file, lossily decoded.
///
/// Used for bounded textual scans where the interesting content (import
/// statements) sits at the top of the file.
pub fn read_prefix(path: &Path, max_bytes: usize) -> Result<String> {
    let file = fs::File::open(path).map_err(|e| AutopilotError::storage(path, e))?;
    let mut buf = Vec::with_capacity(max_bytes.min(8192));
    file.take(max_bytes as u64)
        .read_to_end(&mut buf)
        .map_err(|e| AutopilotError::storage(path, e))?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_to_string_limited_success() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("test.txt");
        fs::write(&path, "Hello, world!").unwrap();

        let content = read_to_string_limited(&path).unwrap();
        assert_eq!(content, "Hello, world!");
    }

    #[test]
    fn test_read_to_string_limited_nonexistent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.txt");

        assert!(read_to_string_limited(&path).is_err());
    }

    #[test]
    fn test_read_prefix_truncates() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("long.txt");
        fs::write(&path, "x".repeat(1000)).unwrap();

        let prefix = read_prefix(&path, 100).unwrap();
        assert_eq!(prefix.len(), 100);
    }

    #[test]
    fn test_read_prefix_short_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("short.txt");
        fs::write(&path, "import foo").unwrap();

        let prefix = read_prefix(&path, 4096).unwrap();
        assert_eq!(prefix, "import foo");
    }
}
