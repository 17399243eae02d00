//! Host file I/O collaborators.
//!
//! Whole-file reads and writes for the transform source text and the
//! data/key payloads. No coordination logic lives here; errors carry
//! the offending path so callers can print them directly.

use std::fs;
use std::path::Path;

use crate::{ClxorError, ClxorResult};

/// Read an entire file into a byte vector.
pub fn read_all_bytes<P: AsRef<Path>>(path: P) -> ClxorResult<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|e| ClxorError::Io(format!("{}: {e}", path.display())))
}

/// Write a byte slice to a file, replacing any existing contents.
pub fn write_all_bytes<P: AsRef<Path>>(path: P, bytes: &[u8]) -> ClxorResult<()> {
    let path = path.as_ref();
    fs::write(path, bytes).map_err(|e| ClxorError::Io(format!("{}: {e}", path.display())))
}

/// Read an entire file as UTF-8 text (for transform source).
pub fn read_all_text<P: AsRef<Path>>(path: P) -> ClxorResult<String> {
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|e| ClxorError::Io(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.bin");
        let bytes = [0x00, 0x10, 0xFF, 0x7F, 0x80];

        write_all_bytes(&path, &bytes).unwrap();
        let back = read_all_bytes(&path).unwrap();
        assert_eq!(back, bytes);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.bin");
        let err = read_all_bytes(&path).unwrap_err();
        match err {
            ClxorError::Io(msg) => assert!(msg.contains("missing.bin")),
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn test_read_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kernel.cl");
        write_all_bytes(&path, b"__kernel void noop() {}\n").unwrap();
        let text = read_all_text(&path).unwrap();
        assert!(text.starts_with("__kernel"));
    }
}
