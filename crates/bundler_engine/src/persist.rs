use std::fs;
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use bundler_core::{Checkpoint, ContentStore, SourceItem};
use bundler_logging::{bundler_debug, bundler_warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("invalid target path: {0}")]
    InvalidPath(String),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Atomically write content to `{dir}/{filename}`: temp file in the same
/// directory, fsync, then rename over the target. Readers see either the old
/// file or the new one, never a partial write.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// A JSON document on disk, replaced atomically on every save.
///
/// Loading never fails: a missing file is silently absent and an unreadable
/// or corrupt one is logged and treated as absent.
pub struct JsonFile<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFile<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: DeserializeOwned> JsonFile<T> {
    pub fn load(&self) -> Option<T> {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                bundler_warn!("Failed to read {:?}: {}", self.path, err);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(err) => {
                bundler_warn!("Ignoring corrupt file {:?}: {}", self.path, err);
                None
            }
        }
    }
}

impl<T: DeserializeOwned + Default> JsonFile<T> {
    pub fn load_or_default(&self) -> T {
        self.load().unwrap_or_default()
    }
}

impl<T: Serialize> JsonFile<T> {
    pub fn save(&self, value: &T) -> Result<PathBuf, PersistError> {
        let filename = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PersistError::InvalidPath(self.path.display().to_string()))?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let content = serde_json::to_string_pretty(value)?;
        AtomicFileWriter::new(dir).write(filename, &content)
    }
}

/// Durable `url -> snippet` map. Only the coordinator writes it.
pub struct ContentStoreFile {
    file: JsonFile<ContentStore>,
}

impl ContentStoreFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Missing or corrupt backing file yields an empty store.
    pub fn load(&self) -> ContentStore {
        let store = self.file.load_or_default();
        bundler_debug!("Loaded {} cached entries from {:?}", store.len(), self.path());
        store
    }

    pub fn save(&self, store: &ContentStore) -> Result<(), PersistError> {
        self.file.save(store)?;
        Ok(())
    }

    /// Merge `entries` into `store` and write the result durably. Returns the number of new entries.
    pub fn put_all<I>(&self, store: &mut ContentStore, entries: I) -> Result<usize, PersistError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let added = store.extend(entries);
        self.save(store)?;
        Ok(added)
    }
}

pub struct CheckpointFile {
    file: JsonFile<Checkpoint>,
}

impl CheckpointFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path),
        }
    }

    pub fn load(&self) -> Checkpoint {
        self.file.load_or_default()
    }

    /// Derive from the selection and store, then write.
    pub fn record(
        &self,
        selection: &[SourceItem],
        store: &ContentStore,
    ) -> Result<Checkpoint, PersistError> {
        let checkpoint = Checkpoint::derive(selection, store);
        self.file.save(&checkpoint)?;
        Ok(checkpoint)
    }
}
