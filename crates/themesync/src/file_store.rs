//! Durable store backed by a JSON file.
//!
//! The file holds a flat JSON object of string values, so one file can be
//! shared by several keys (and several applications, if they agree on key
//! names). A missing file reads as empty; the file and its parent
//! directories are created on first write.
//!
//! ```rust
//! use themesync::env::ThemeStore;
//! use themesync::FileStore;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = FileStore::new(dir.path().join("prefs.json"));
//! store.write("theme", "dark").unwrap();
//!
//! let reopened = FileStore::new(dir.path().join("prefs.json"));
//! assert_eq!(reopened.read("theme").unwrap().as_deref(), Some("dark"));
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::env::ThemeStore;
use crate::ThemeError;

/// Key-value store persisted as a JSON object file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// A store at `path`. Nothing is touched until the first operation.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, ThemeError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|err| {
            ThemeError::storage(format!("{}: {}", self.path.display(), err))
        })
    }

    fn save(&self, values: &BTreeMap<String, String>) -> Result<(), ThemeError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(values)
            .map_err(|err| ThemeError::storage(err.to_string()))?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl ThemeStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, ThemeError> {
        Ok(self.load()?.remove(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), ThemeError> {
        let mut values = self.load()?;
        if values.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        values.insert(key.to_string(), value.to_string());
        self.save(&values)
    }

    fn remove(&self, key: &str) -> Result<(), ThemeError> {
        let mut values = self.load()?;
        if values.remove(key).is_none() {
            return Ok(());
        }
        self.save(&values)
    }
}
