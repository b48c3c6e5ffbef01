//! Key-value record backends
//!
//! One JSON document per key. [`FileRecordStore`] keeps each record as a
//! file in one directory; [`MemoryRecordStore`] backs tests.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::SystemTime;
use tarot_common::{Error, Result};

/// Persistent namespace of records keyed by string
///
/// Every operation performs blocking I/O. Nothing here serializes
/// concurrent writers to the same key.
pub trait RecordStore: Send + Sync {
    /// Record body, `None` when the key is absent
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Create or overwrite a record
    fn put(&self, key: &str, body: &str) -> Result<()>;

    /// Returns false when the key was absent
    fn delete(&self, key: &str) -> Result<bool>;

    /// All keys, sorted
    fn keys(&self) -> Result<Vec<String>>;

    /// Last write time, `None` when the key is absent
    fn modified_at(&self, key: &str) -> Result<Option<SystemTime>>;
}

/// Keys are single path components: no separators, no `..`, not empty
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty()
        || key == "."
        || key == ".."
        || key.contains(['/', '\\', '\0'])
    {
        return Err(Error::InvalidInput(format!("Invalid record key: {:?}", key)));
    }
    Ok(())
}

/// Load and deserialize a record
///
/// A body that does not parse as `T` is [`Error::MalformedRecord`].
pub fn get_json<T: DeserializeOwned>(store: &dyn RecordStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        Some(body) => serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| malformed(key, e)),
        None => Ok(None),
    }
}

fn malformed(key: &str, reason: impl std::fmt::Display) -> Error {
    Error::MalformedRecord {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Serialize and store a record (pretty-printed)
pub fn put_json<T: Serialize>(store: &dyn RecordStore, key: &str, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    store.put(key, &body)
}

/// Records stored as files in one directory
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    dir: PathBuf,
}

impl FileRecordStore {
    /// The directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(key))
    }
}

impl RecordStore for FileRecordStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| malformed(key, e)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, body: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;

        // Write then rename so readers never see a partial record
        let tmp = self.dir.join(format!(".{}.tmp", key));
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            keys.push(name);
        }
        keys.sort();
        Ok(keys)
    }

    fn modified_at(&self, key: &str) -> Result<Option<SystemTime>> {
        let path = self.path_for(key)?;
        match fs::metadata(&path) {
            Ok(metadata) => Ok(Some(metadata.modified()?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory records with settable modification times
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, (String, SystemTime)>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backdate (or postdate) a record; returns false when the key is absent
    pub fn set_modified_at(&self, key: &str, modified: SystemTime) -> Result<bool> {
        let mut records = self.lock()?;
        Ok(match records.get_mut(key) {
            Some(entry) => {
                entry.1 = modified;
                true
            }
            None => false,
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, (String, SystemTime)>>> {
        self.records
            .lock()
            .map_err(|_| Error::Internal("Record store lock poisoned".to_string()))
    }
}

impl RecordStore for MemoryRecordStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        Ok(self.lock()?.get(key).map(|(body, _)| body.clone()))
    }

    fn put(&self, key: &str, body: &str) -> Result<()> {
        validate_key(key)?;
        self.lock()?
            .insert(key.to_string(), (body.to_string(), SystemTime::now()));
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self.lock()?.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.lock()?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn modified_at(&self, key: &str) -> Result<Option<SystemTime>> {
        validate_key(key)?;
        Ok(self.lock()?.get(key).map(|(_, modified)| *modified))
    }
}
