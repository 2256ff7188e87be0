// src/store.rs
use crate::config::CorruptPolicy;
use crate::error::{StoreError, StoreResult};
use crate::models::Collection;
use chrono::Utc;
use log;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// Owns the JSON data file holding the whole collection.
///
/// Writes go to a temporary file in the same directory and are renamed over
/// the target, so a concurrent `load` sees either the old or the new file.
/// `modify` serializes read-modify-write cycles behind a single writer lock.
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    on_corrupt: CorruptPolicy,
    writer: Mutex<()>,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>, on_corrupt: CorruptPolicy) -> Self {
        Self {
            path: path.into(),
            on_corrupt,
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the collection. A missing or blank file is an empty collection.
    pub fn load(&self) -> StoreResult<Collection> {
        log::debug!("Loading store from {:?}", self.path);
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("Store file {:?} does not exist yet; starting empty.", self.path);
                return Ok(Collection::new());
            }
            Err(e) => {
                log::error!("Failed to read store file {:?}: {:?}", self.path, e);
                return Err(StoreError::Io(e));
            }
        };

        if raw.trim().is_empty() {
            return Ok(Collection::new());
        }

        match serde_json::from_str::<Collection>(&raw) {
            Ok(collection) => Ok(collection),
            Err(source) => match self.on_corrupt {
                CorruptPolicy::Fail => {
                    log::error!("Store file {:?} is not valid JSON: {}", self.path, source);
                    Err(StoreError::Corrupt { path: self.path.clone(), source })
                }
                CorruptPolicy::Reset => {
                    let backup = self.backup_path();
                    fs::copy(&self.path, &backup)?;
                    log::warn!(
                        "Store file {:?} is corrupt ({}); copied it to {:?} and starting empty.",
                        self.path, source, backup
                    );
                    Ok(Collection::new())
                }
            },
        }
    }

    /// Replaces the data file with `collection`, creating the directory if needed.
    pub fn save(&self, collection: &Collection) -> StoreResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| {
            log::error!("Failed to create store directory {:?}: {:?}", dir, e);
            StoreError::Io(e)
        })?;

        let serialized = serde_json::to_string_pretty(collection).map_err(|e| {
            log::error!("save: JSON serialization failed: {}", e);
            StoreError::Serialization(e)
        })?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(serialized.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| {
            log::error!("Failed to move temporary file over {:?}: {}", self.path, e.error);
            StoreError::Persist(e)
        })?;

        log::info!("Saved {} credentials to {:?}", collection.credentials.len(), self.path);
        Ok(())
    }

    /// Runs one load-modify-save cycle while holding the writer lock.
    ///
    /// Nothing is written when `f` fails.
    pub fn modify<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Collection) -> Result<T, E>,
        E: From<StoreError>,
    {
        // The guarded value is `()`, so a poisoned lock carries no broken state.
        let _guard = self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut collection = self.load()?;
        let out = f(&mut collection)?;
        self.save(&collection)?;
        Ok(out)
    }

    fn backup_path(&self) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%3fZ");
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".corrupt-{}", stamp));
        self.path.with_file_name(name)
    }
}
