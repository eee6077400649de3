//! JSON file persistence for client state

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::ClientResult;

/// One JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(base_path: impl Into<PathBuf>, filename: &str) -> Self {
        Self {
            path: base_path.into().join(filename),
        }
    }

    /// `None` when the file does not exist
    pub fn load<T: DeserializeOwned>(&self) -> ClientResult<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    pub fn save<T: Serialize>(&self, value: &T) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn remove(&self) -> ClientResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path(), "absent.json");
        assert_eq!(file.load::<String>().unwrap(), None);
        assert!(file.remove().is_ok());
    }

    #[test]
    fn test_save_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("nested/state"), "value.json");
        file.save(&vec![1, 2, 3]).unwrap();
        assert!(file.exists());
        assert_eq!(file.load::<Vec<i32>>().unwrap(), Some(vec![1, 2, 3]));

        file.remove().unwrap();
        assert!(!file.exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path(), "bad.json");
        std::fs::write(file.path(), "{not json").unwrap();
        assert!(file.load::<String>().is_err());
    }
}
