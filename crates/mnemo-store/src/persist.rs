use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use mnemo_core::{MemoryId, MnemoError, Result};
use tracing::warn;

use crate::record::Memory;

/// Read the store document at `path`.
///
/// Returns `None` when the file does not exist. A file that exists but
/// fails to parse (unreadable JSON, or a root that is not an object of
/// records) is copied to a timestamped `.bak` sibling and treated as
/// empty rather than silently discarded. I/O failures surface to the
/// caller.
pub(crate) fn read_document(path: &Path) -> Result<Option<HashMap<MemoryId, Memory>>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read(path)?;
    match serde_json::from_slice::<HashMap<MemoryId, Memory>>(&raw) {
        Ok(records) => Ok(Some(records)),
        Err(e) => {
            let backup = backup_corrupt(path);
            warn!(
                ?path,
                ?backup,
                error = %e,
                "store document is unreadable, backed it up and starting empty"
            );
            Ok(Some(HashMap::new()))
        }
    }
}

/// Atomically replace the document at `path` with the full record map.
///
/// The map is serialized to a sibling temp file which is then renamed
/// over the destination, so a reader of `path` only ever observes the
/// previous complete document or the new one.
pub(crate) fn write_document(path: &Path, records: &HashMap<MemoryId, Memory>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = sibling_path(path, ".tmp")?;

    let write_and_swap = || -> Result<()> {
        let mut file = fs::File::create(&tmp)?;
        serde_json::to_writer_pretty(&mut file, records)?;
        file.write_all(b"\n")?;
        file.flush()?;
        fs::rename(&tmp, path)?;
        Ok(())
    };

    let result = write_and_swap();
    if result.is_err() && tmp.exists() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Copy an unreadable document to a timestamped backup next to it.
/// Best-effort: a backup failure is logged, never raised.
fn backup_corrupt(path: &Path) -> Option<PathBuf> {
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
    let backup = match sibling_path(path, &format!(".corrupt-{stamp}.bak")) {
        Ok(p) => p,
        Err(_) => return None,
    };
    match fs::copy(path, &backup) {
        Ok(_) => Some(backup),
        Err(e) => {
            warn!(?path, error = %e, "failed to back up corrupt store document");
            None
        }
    }
}

/// `path` with `suffix` appended to its file name.
fn sibling_path(path: &Path, suffix: &str) -> Result<PathBuf> {
    let mut name = path
        .file_name()
        .ok_or_else(|| MnemoError::Store(format!("invalid store path: {}", path.display())))?
        .to_os_string();
    name.push(suffix);
    Ok(path.with_file_name(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(read_document(&path).unwrap().is_none());
    }

    #[test]
    fn test_write_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut records = HashMap::new();
        let m = Memory::new("persist me", &["t".into()], 0.8, Some(30), Default::default());
        records.insert(m.id.clone(), m.clone());

        write_document(&path, &records).unwrap();
        let loaded = read_document(&path).unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[&m.id], m);
        // No stray temp file left behind
        assert!(!path.with_file_name("store.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_document_is_backed_up_and_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, b"{ not json at all").unwrap();

        let loaded = read_document(&path).unwrap().unwrap();
        assert!(loaded.is_empty());

        let backups: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                name.starts_with("store.json.corrupt-") && name.ends_with(".bak")
            })
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read(backups[0].path()).unwrap(), b"{ not json at all");
    }

    #[test]
    fn test_non_utf8_bytes_are_treated_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, [0xff, 0xfe, 0x00, 0x42]).unwrap();
        let loaded = read_document(&path).unwrap().unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_non_object_root_is_treated_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, b"[1, 2, 3]").unwrap();
        let loaded = read_document(&path).unwrap().unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/store.json");
        write_document(&path, &HashMap::new()).unwrap();
        assert!(path.exists());
    }
}
