//! State store: SHA-256 records of what each task last ran against.
//!
//! Persists a `StateStoreFile` JSON document (by default
//! `.filetreesubs-state.json` in the working directory). Writes go to
//! `<path>.tmp` first and are then renamed into place.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{io_err, SyncError};

/// What a task looked like the last time it executed successfully.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRecord {
    /// File dependency path → SHA-256 hex digest.
    #[serde(default)]
    pub deps: BTreeMap<String, String>,
    /// Config values the task depended on.
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

/// On-disk state payload, keyed by task id (`<category>:<name>`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateStoreFile {
    pub synced_at: DateTime<Utc>,
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskRecord>,
}

impl Default for StateStoreFile {
    fn default() -> Self {
        Self {
            synced_at: Utc::now(),
            tasks: BTreeMap::new(),
        }
    }
}

/// Load the state store at `path`.
///
/// Returns an empty store if the file does not yet exist.
pub fn load_at(path: &Path) -> Result<StateStoreFile, SyncError> {
    if !path.exists() {
        return Ok(StateStoreFile::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Save the state store to `path` atomically.
pub fn save_at(path: &Path, store: &StateStoreFile) -> Result<(), SyncError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    let json = serde_json::to_string_pretty(store)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// SHA-256 hex digest of the file at `path`.
pub fn hash_file(path: &Path) -> Result<String, SyncError> {
    let mut file = std::fs::File::open(path).map_err(|e| io_err(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).map_err(|e| io_err(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 hex digest of `text`.
pub fn hash_text(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
