//! JSON records on disk.
//!
//! All writes go to a temporary file next to the destination which is then
//! renamed over it, so readers see either the old or the new record, never a
//! torn one.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{IoResultExt, Result};

/// Writes `content` to `path` atomically.
pub fn persist_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(content)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;

    Ok(())
}

/// Like [`persist_atomic`], reporting failures with the destination path.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    persist_atomic(path, content).at(path)
}

/// Serializes `value` as JSON and writes it to `path` atomically.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_vec(value)?;
    write_atomic(path, &content)
}

/// Reads a JSON value from `path`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read(path).at(path)?;
    Ok(serde_json::from_slice(&content)?)
}

/// A directory of JSON records, one `<key>.json` file per record.
#[derive(Debug, Clone)]
pub struct JsonRepository {
    dir: PathBuf,
}

impl JsonRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Reads the record stored under `key`.
    ///
    /// A missing record is `Ok(None)`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path(key);
        if !path.is_file() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    /// Stores `value` under `key`, replacing any previous record.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        write_json_atomic(&self.path(key), value)
    }

    /// Lists all readable records in key order.
    ///
    /// Records that cannot be parsed are skipped with a warning.
    pub fn list<T: DeserializeOwned>(&self) -> Result<Vec<(String, T)>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for path in crate::fs_tree::files_in(&self.dir)? {
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            match read_json(&path) {
                Ok(record) => records.push((key.to_string(), record)),
                Err(error) => tracing::warn!("Skipping unreadable record {}: {error}", path.display()),
            }
        }

        Ok(records)
    }
}
