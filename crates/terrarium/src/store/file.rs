//! File-backed state store: one JSON document holding every record.
//!
//! Record values are themselves JSON (the tree, credentials, session
//! snapshots all serialize through serde), so the document keeps them
//! as nested values rather than encoded blobs. Writes go to a sibling
//! temp file first and rename over the target, so a crash mid-write
//! leaves the previous document intact.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::StateStore;
use crate::error::{PersistenceError, Result};

pub struct JsonFileStore {
    path: PathBuf,
    records: Mutex<BTreeMap<String, Value>>,
}

impl JsonFileStore {
    /// Open a store at `path`, reading the existing document if there
    /// is one.
    pub async fn open(path: impl AsRef<Path>) -> Result<JsonFileStore> {
        let path = path.as_ref().to_path_buf();
        let records = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(storage_error)?,
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(storage_error(err)),
        };
        Ok(JsonFileStore {
            path,
            records: Mutex::new(records),
        })
    }

    async fn flush(&self, records: &BTreeMap<String, Value>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(records).map_err(storage_error)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await.map_err(storage_error)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(storage_error)?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let records = self.records.lock().await;
        match records.get(key) {
            Some(value) => Ok(Some(serde_json::to_vec(value).map_err(storage_error)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let parsed: Value = serde_json::from_slice(&value).map_err(storage_error)?;
        let mut records = self.records.lock().await;
        records.insert(key.to_string(), parsed);
        self.flush(&records).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut records = self.records.lock().await;
        if records.remove(key).is_some() {
            self.flush(&records).await?;
        }
        Ok(())
    }
}

fn storage_error(err: impl std::fmt::Display) -> crate::error::Error {
    PersistenceError::Storage(err.to_string()).into()
}
