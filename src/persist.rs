//! JSON file helpers shared by settings and knowledge-base export.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-file mutex map to serialize concurrent writes to the same path.
static FILE_LOCKS: LazyLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Atomically write bytes to a file using write-to-temp-then-rename.
///
/// The previous file, if any, is kept as a `.bak` sibling (best-effort).
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), PersistError> {
    let lock = FILE_LOCKS
        .lock()
        .entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone();
    let _guard = lock.lock();

    // foo.json → foo.json.tmp, foo.json.bak
    let file_name = path.file_name().unwrap_or_default();

    let mut tmp_name = OsString::from(file_name);
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(&tmp_name);

    let mut bak_name = OsString::from(file_name);
    bak_name.push(".bak");
    let bak_path = path.with_file_name(&bak_name);

    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    if path.exists() {
        let _ = fs::rename(path, &bak_path);
    }

    fs::rename(&tmp_path, path)?;

    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    atomic_write(path, json.as_bytes())
}

pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, PersistError> {
    let data = fs::read_to_string(path)?;
    let value = serde_json::from_str(&data)?;
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_keeps_backup() {
        let dir = std::env::temp_dir().join(format!("gh_bridge_test_persist_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("nested").join("data.json");

        write_json(&path, &serde_json::json!({ "n": 1 })).unwrap();
        write_json(&path, &serde_json::json!({ "n": 2 })).unwrap();

        let value: serde_json::Value = read_json(&path).unwrap();
        assert_eq!(value["n"], 2);
        let backup: serde_json::Value = read_json(&path.with_file_name("data.json.bak")).unwrap();
        assert_eq!(backup["n"], 1);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_read_missing_is_io_error() {
        let path = std::env::temp_dir().join("gh_bridge_test_persist_missing.json");
        let _ = fs::remove_file(&path);
        let err = read_json::<serde_json::Value>(&path).unwrap_err();
        assert!(matches!(err, PersistError::Io(_)));
    }

    #[test]
    fn test_read_garbage_is_json_error() {
        let path = std::env::temp_dir().join(format!("gh_bridge_test_persist_garbage_{}.json", std::process::id()));
        fs::write(&path, "{not json").unwrap();
        let err = read_json::<serde_json::Value>(&path).unwrap_err();
        assert!(matches!(err, PersistError::Json(_)));
        assert!(err.to_string().starts_with("JSON error: "));
        let _ = fs::remove_file(&path);
    }
}
