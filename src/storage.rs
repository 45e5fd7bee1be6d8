// Durable key-value storage for the exercise and workout lists
use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};

use dirs_next as dirs;

pub const EXERCISES_STORAGE_KEY: &str = "exercises";
pub const WORKOUTS_STORAGE_KEY: &str = "workouts";

const DATA_DIR: &str = "training_log";

#[derive(Debug)]
pub enum StorageError {
    /// No durable store exists in this environment.
    Unavailable,
    Io(std::io::Error),
    Corrupt { key: String, source: serde_json::Error },
    Serialize(serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Unavailable => write!(f, "Storage is not available"),
            StorageError::Io(e) => write!(f, "Storage I/O failed: {e}"),
            StorageError::Corrupt { key, source } => {
                write!(f, "Stored value for '{key}' is unreadable: {source}")
            }
            StorageError::Serialize(e) => write!(f, "Could not serialize value: {e}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Unavailable => None,
            StorageError::Io(e) => Some(e),
            StorageError::Corrupt { source, .. } => Some(source),
            StorageError::Serialize(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

/// A store of text values addressed by string keys.
pub trait KeyValueStore {
    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous value.
    fn set_string(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Keeps one `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The durable store as seen by the rest of the application.
///
/// When no store could be opened the application runs session-only: loads
/// find nothing and every write reports [`StorageError::Unavailable`].
pub enum Persistence {
    Available(Box<dyn KeyValueStore>),
    Unavailable,
}

impl Persistence {
    /// Open the default file store.
    ///
    /// `dir_override` replaces the platform data directory. If neither is
    /// usable the result is [`Persistence::Unavailable`].
    pub fn open_default(dir_override: Option<&Path>) -> Self {
        let dir = match dir_override {
            Some(d) => Some(d.to_path_buf()),
            None => dirs::data_dir().map(|p| p.join(DATA_DIR)),
        };
        let Some(dir) = dir else {
            log::warn!("No data directory could be resolved");
            return Persistence::Unavailable;
        };
        match FileStore::open(&dir) {
            Ok(store) => {
                log::info!("Using storage directory {}", store.dir().display());
                Persistence::Available(Box::new(store))
            }
            Err(e) => {
                log::warn!("Cannot use storage directory {}: {e}", dir.display());
                Persistence::Unavailable
            }
        }
    }

    #[cfg(test)]
    pub fn memory() -> Self {
        Persistence::Available(Box::new(MemoryStore::default()))
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Persistence::Available(_))
    }

    /// Raw text stored under `key`, if any.
    pub fn raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            Persistence::Available(store) => store.get_string(key),
            Persistence::Unavailable => Ok(None),
        }
    }

    /// Read and deserialize the value under `key`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(text) = self.raw(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                key: key.to_string(),
                source,
            })
    }

    /// Serialize `value` and write it under `key`.
    pub fn store<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        let Persistence::Available(store) = self else {
            return Err(StorageError::Unavailable);
        };
        let text = serde_json::to_string(value).map_err(StorageError::Serialize)?;
        store.set_string(key, &text)
    }
}
