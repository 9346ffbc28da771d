//! Durable client-side key-value storage.

use std::collections::{
    BTreeMap,
    HashMap,
};
use std::path::{
    Path,
    PathBuf,
};
use std::sync::{
    Arc,
    Mutex,
    PoisonError,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to access storage file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize storage: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// String key-value store surviving a session restart.
pub trait Storage: std::fmt::Debug + Send {
    fn get_item(&self, key: &str) -> Option<String>;

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Shared contents of a [`MemoryStorage`].
#[derive(Debug, Default)]
struct MemoryInner {
    /// Stored items
    items: HashMap<String, String>,
    /// Number of `set_item`/`remove_item` calls
    writes: usize,
}

/// Volatile storage. Clones share the same contents.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    /// Shared between clones
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes performed so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).writes
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.items.insert(key.to_string(), value.to_string());
        inner.writes += 1;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.items.remove(key);
        inner.writes += 1;
        Ok(())
    }
}

/// Storage persisted as a JSON object in a single file.
#[derive(Debug)]
pub struct FileStorage {
    /// Backing file
    path: PathBuf,
    /// Current contents
    items: BTreeMap<String, String>,
}

impl FileStorage {
    /// Opens the storage at `path`.
    ///
    /// A missing file starts empty. A corrupt file is logged and starts empty as well,
    /// so a damaged cache never blocks startup.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        let items = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Discarding corrupt storage file");
                BTreeMap::new()
            })
        } else {
            BTreeMap::new()
        };

        Ok(Self { path, items })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.items)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.insert(key.to_string(), value.to_string());
        self.persist()
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        if self.items.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}
