use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::storage::traits::Storage;

/// File-backed storage: one `<key>.json` document per key under a
/// data directory. Saves write a temp file and rename it into place so
/// a crash mid-write never leaves a truncated document behind.
#[derive(Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.json"))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[async_trait]
impl Storage for JsonFileStore {
    async fn load(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Error::storage(key, err)),
        };

        let value = serde_json::from_slice(&bytes).map_err(|err| Error::storage(key, err))?;
        Ok(Some(value))
    }

    async fn save(&self, key: &str, value: &Value) -> Result<()> {
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|err| Error::storage(key, err))?;

        let bytes = serde_json::to_vec_pretty(value).map_err(|err| Error::storage(key, err))?;

        let path = self.path_for(key);
        let tmp = self.data_dir.join(format!("{key}.json.tmp"));
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|err| Error::storage(key, err))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|err| Error::storage(key, err))?;

        Ok(())
    }
}
