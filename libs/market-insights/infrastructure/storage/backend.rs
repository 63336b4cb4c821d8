//! Durable string-keyed storage
//!
//! Reads are served from memory and never fail. Writes replace the whole
//! value for a key; the file backend writes through to a JSON document.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to access storage file: {0}")]
    Io(String),

    #[error("Failed to serialize record for '{key}': {reason}")]
    Serialize { key: String, reason: String },

    #[error("Malformed persisted record under '{key}': {reason}")]
    MalformedRecord { key: String, reason: String },
}

impl PersistenceError {
    pub fn from_io_error(err: std::io::Error) -> Self {
        PersistenceError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

/// String-keyed, string-valued storage with replace semantics
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local storage, lost on exit
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Storage persisted to a JSON object on disk.
///
/// Reads come from memory. Every mutation re-reads the document, applies the
/// one key it changes and rewrites the whole file, so keys written by another
/// process in the meantime survive. There is no file locking and no change
/// notification across processes: another process's writes become visible
/// here on this backend's next mutation, and two processes flushing at the
/// same instant can still lose one update.
pub struct FileBackend {
    entries: RwLock<HashMap<String, String>>,
    file_path: PathBuf,
}

impl FileBackend {
    /// Open (or create on first write) the storage file at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file_path = path.as_ref().to_path_buf();

        let entries = if file_path.exists() {
            debug!("Loading storage from {:?}", file_path);
            let content = fs::read_to_string(&file_path).map_err(PersistenceError::from_io_error)?;
            parse_document(&file_path, &content)?
        } else {
            debug!("Storage file not found, starting empty");
            HashMap::new()
        };

        debug!("Loaded {} storage entries", entries.len());

        Ok(Self {
            entries: RwLock::new(entries),
            file_path,
        })
    }

    /// Current document on disk, `None` if it can't be read or parsed
    fn reload(&self) -> Option<HashMap<String, String>> {
        let content = fs::read_to_string(&self.file_path).ok()?;
        match parse_document(&self.file_path, &content) {
            Ok(entries) => Some(entries),
            Err(e) => {
                warn!("{}; keeping in-memory entries", e);
                None
            }
        }
    }

    fn flush(&self, entries: &HashMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(entries).map_err(|e| PersistenceError::Serialize {
            key: self.file_path.display().to_string(),
            reason: e.to_string(),
        })?;
        if let Some(parent) = self.file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(PersistenceError::from_io_error)?;
        }
        fs::write(&self.file_path, json).map_err(PersistenceError::from_io_error)
    }

    fn mutate(&self, key: &str, value: Option<&str>) -> Result<()> {
        let mut entries = self.entries.write();
        let mut next = self.reload().unwrap_or_else(|| entries.clone());
        match value {
            Some(v) => next.insert(key.to_string(), v.to_string()),
            None => next.remove(key),
        };

        // Memory only changes once the file has
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }
}

fn parse_document(path: &Path, content: &str) -> Result<HashMap<String, String>> {
    if content.trim().is_empty() {
        return Ok(HashMap::new());
    }
    serde_json::from_str(content).map_err(|e| PersistenceError::MalformedRecord {
        key: path.display().to_string(),
        reason: e.to_string(),
    })
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.mutate(key, Some(value))
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.mutate(key, None)
    }
}
