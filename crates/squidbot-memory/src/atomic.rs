use std::io::Write;
use std::path::Path;

use crate::error::{MemoryError, Result};

/// Writes `contents` to `path` atomically: a temp file created in the same
/// directory, flushed, fsynced, then renamed over the target. Same-directory
/// placement keeps the rename on one filesystem so it is atomic on POSIX.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| MemoryError::io(dir.display().to_string(), e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| MemoryError::io(dir.display().to_string(), e))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| MemoryError::io(path.display().to_string(), e))?;
    tmp.as_file_mut()
        .sync_all()
        .map_err(|e| MemoryError::io(path.display().to_string(), e))?;
    tmp.persist(path)
        .map_err(|e| MemoryError::io(path.display().to_string(), e.error))?;
    Ok(())
}

/// Reads a file as a string; a missing file is treated as empty rather than
/// an error, matching the store's "missing files return empty results"
/// failure semantics.
pub fn read_or_empty(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(s),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(MemoryError::io(path.display().to_string(), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        write_atomic(&path, "hello").unwrap();
        assert_eq!(read_or_empty(&path).unwrap(), "hello");
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.md");
        assert_eq!(read_or_empty(&path).unwrap(), "");
    }

    #[test]
    fn write_overwrites_existing_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        write_atomic(&path, "first").unwrap();
        write_atomic(&path, "second").unwrap();
        assert_eq!(read_or_empty(&path).unwrap(), "second");
    }
}
