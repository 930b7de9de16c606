//! Persisted records and the quota gate.
//!
//! The whole tree serializes into a single record, so a save is
//! all-or-nothing from the store's point of view. Saves are checked
//! against a byte quota first; an over-quota save fails, and the live
//! tree is put back to the last persisted copy so memory and store
//! agree again.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::StateStore;
use crate::error::{PersistenceError, Result};
use crate::session::users::{CredentialBook, UserManager};
use crate::vfs::{Node, Vfs};

/// Record key for the serialized tree.
pub const KEY_TREE: &str = "vfs";
/// Record key for the credential book.
pub const KEY_CREDENTIALS: &str = "credentials";
/// Default state quota in content bytes.
pub const DEFAULT_QUOTA_BYTES: u64 = 10_000_000;

#[derive(Serialize, Deserialize)]
struct TreeRecord {
    root: Node,
}

/// Saves and loads the durable records through a [`StateStore`].
pub struct Persistence {
    store: Arc<dyn StateStore>,
    quota: u64,
}

impl Persistence {
    pub fn new(store: Arc<dyn StateStore>, quota: u64) -> Persistence {
        Persistence { store, quota }
    }

    pub fn quota(&self) -> u64 {
        self.quota
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Persist the tree. When the tree is over quota the save is
    /// rejected and the live tree reverts to the last persisted copy.
    pub async fn save_tree(&self, vfs: &Vfs) -> Result<()> {
        let used = vfs.total_size();
        if used > self.quota {
            warn!(used, quota = self.quota, "tree over quota, reverting to last save");
            match self.read_tree().await {
                Ok(Some(previous)) => vfs.restore(previous),
                Ok(None) => {}
                Err(err) => warn!(error = %err, "could not reload last saved tree"),
            }
            return Err(PersistenceError::QuotaExceeded {
                used,
                quota: self.quota,
            }
            .into());
        }
        let record = TreeRecord {
            root: vfs.snapshot(),
        };
        let bytes = serde_json::to_vec(&record)
            .map_err(|err| PersistenceError::Storage(err.to_string()))?;
        self.store.put(KEY_TREE, bytes).await
    }

    /// Replace the live tree with the persisted one. `false` when no
    /// tree has ever been saved.
    pub async fn load_tree(&self, vfs: &Vfs) -> Result<bool> {
        match self.read_tree().await? {
            Some(root) => {
                vfs.restore(root);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn read_tree(&self) -> Result<Option<Node>> {
        let Some(bytes) = self.store.get(KEY_TREE).await? else {
            return Ok(None);
        };
        let record: TreeRecord = serde_json::from_slice(&bytes)
            .map_err(|err| PersistenceError::Storage(err.to_string()))?;
        Ok(Some(record.root))
    }

    /// Persist the credential book.
    pub async fn save_credentials(&self, users: &UserManager) -> Result<()> {
        let book = users.export();
        let bytes =
            serde_json::to_vec(&book).map_err(|err| PersistenceError::Storage(err.to_string()))?;
        self.store.put(KEY_CREDENTIALS, bytes).await
    }

    /// Load the credential book. `false` when none was ever saved.
    pub async fn load_credentials(&self, users: &UserManager) -> Result<bool> {
        let Some(bytes) = self.store.get(KEY_CREDENTIALS).await? else {
            return Ok(false);
        };
        let book: CredentialBook = serde_json::from_slice(&bytes)
            .map_err(|err| PersistenceError::Storage(err.to_string()))?;
        users.import(book);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn small_persistence(quota: u64) -> Persistence {
        Persistence::new(Arc::new(MemoryStore::new()), quota)
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let persist = small_persistence(1_000);
        let fs = Vfs::new();
        fs.create_dir("/d", "root").unwrap();
        fs.write_file("/d/f", "root", "payload", false).unwrap();
        persist.save_tree(&fs).await.unwrap();

        let other = Vfs::new();
        assert!(persist.load_tree(&other).await.unwrap());
        assert_eq!(other.read_file("/d/f", "root").unwrap(), "payload");
    }

    #[tokio::test]
    async fn over_quota_save_reverts_to_last_saved() {
        let persist = small_persistence(10);
        let fs = Vfs::new();
        fs.write_file("/small", "root", "ok", false).unwrap();
        persist.save_tree(&fs).await.unwrap();
        let saved = serde_json::to_string(&fs.snapshot()).unwrap();

        fs.write_file("/big", "root", "way more than ten bytes", false)
            .unwrap();
        let err = persist.save_tree(&fs).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Persistence(PersistenceError::QuotaExceeded { .. })
        ));
        // Byte-for-byte back to the last good save.
        assert_eq!(serde_json::to_string(&fs.snapshot()).unwrap(), saved);
    }

    #[tokio::test]
    async fn load_reports_absence() {
        let persist = small_persistence(100);
        let fs = Vfs::new();
        assert!(!persist.load_tree(&fs).await.unwrap());
    }
}
