use std::path::{Path, PathBuf};
use std::fs;
use crate::core::error::Result;

/// Directory structure for data files
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub base_dir: PathBuf,      // Root directory
    pub meta_dir: PathBuf,      // Engine configuration snapshot
}

impl StorageLayout {
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let meta_dir = base_dir.join("meta");

        fs::create_dir_all(&meta_dir)?;

        Ok(StorageLayout {
            base_dir,
            meta_dir,
        })
    }

    /// All stored documents; the index is rebuilt from these on open
    pub fn documents_path(&self) -> PathBuf {
        self.base_dir.join("documents.json")
    }

    pub fn config_path(&self) -> PathBuf {
        self.meta_dir.join("engine.json")
    }
}
