//! services/kitchen/src/adapters/kv_file.rs
//!
//! A `KeyValueStore` that keeps one JSON file per key under a directory.
//! Writes go to a temporary sibling first and are renamed into place, so a
//! crash mid-write never leaves a half-written value behind.

use async_trait::async_trait;
use sous_core::ports::{KeyValueStore, PortError, PortResult};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

#[derive(Debug, Clone)]
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Creates the store, making sure its directory exists.
    pub async fn new(base_dir: impl Into<PathBuf>) -> PortResult<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).await.map_err(io_error)?;
        Ok(Self { base_dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_dir.join(format!("{}.json", file_name))
    }
}

fn io_error(e: std::io::Error) -> PortError {
    PortError::Unexpected(format!("file store I/O failed: {}", e))
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> PortResult<()> {
        let path = self.path_for(key);
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, value).await.map_err(io_error)?;
        fs::rename(&temp_path, &path).await.map_err(io_error)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(e)),
        }
    }
}
