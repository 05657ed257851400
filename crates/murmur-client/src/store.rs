//! Persistence backends for conversation state.
//!
//! A store is a tiny key-value space with three fixed keys. Values are
//! opaque strings; encoding lives in [`crate::codec`].

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::errors::StoreError;

/// The persisted values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Per-peer message threads.
    History,
    /// Per-peer unread counts.
    Unread,
    /// Last successfully joined username.
    Username,
}

impl StoreKey {
    /// All keys, in a fixed order.
    pub const ALL: [Self; 3] = [Self::History, Self::Unread, Self::Username];

    /// File name used by [`FileStore`].
    pub fn file_name(self) -> &'static str {
        match self {
            Self::History => "history.json",
            Self::Unread => "unread.json",
            Self::Username => "username",
        }
    }
}

/// Durable key-value storage for client state.
pub trait ConversationStore: Send + Sync {
    /// Read a value. `Ok(None)` when nothing is stored.
    fn read(&self, key: StoreKey) -> Result<Option<String>, StoreError>;
    /// Replace a value.
    fn write(&self, key: StoreKey, value: &str) -> Result<(), StoreError>;
    /// Delete a value. Removing a missing value succeeds.
    fn remove(&self, key: StoreKey) -> Result<(), StoreError>;
}

/// One file per key under a data directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Store files under `dir`, created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: StoreKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

fn io_error(path: PathBuf) -> impl FnOnce(std::io::Error) -> StoreError {
    move |source| StoreError::Io { path, source }
}

impl ConversationStore for FileStore {
    fn read(&self, key: StoreKey) -> Result<Option<String>, StoreError> {
        let path = self.path(key);
        match std::fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(path)(e)),
        }
    }

    fn write(&self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(io_error(self.dir.clone()))?;
        let path = self.path(key);
        std::fs::write(&path, value).map_err(io_error(path.clone()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600));
        }
        Ok(())
    }

    fn remove(&self, key: StoreKey) -> Result<(), StoreError> {
        let path = self.path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(path)(e)),
        }
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<StoreKey, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with `values`.
    pub fn with_values<'a>(values: impl IntoIterator<Item = (StoreKey, &'a str)>) -> Self {
        let store = Self::new();
        {
            let mut map = store.values.lock();
            for (key, value) in values {
                let _ = map.insert(key, value.to_owned());
            }
        }
        store
    }
}

impl ConversationStore for MemoryStore {
    fn read(&self, key: StoreKey) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock().get(&key).cloned())
    }

    fn write(&self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        let _ = self.values.lock().insert(key, value.to_owned());
        Ok(())
    }

    fn remove(&self, key: StoreKey) -> Result<(), StoreError> {
        let _ = self.values.lock().remove(&key);
        Ok(())
    }
}
