//! Multi-user session layer: accounts, credentials, snapshots.

pub mod snapshot;
pub mod users;

pub use snapshot::{Snapshot, SnapshotKind};
pub use users::{CredentialBook, UserManager, GUEST, SUPERUSER};

use std::sync::Arc;

use crate::error::{PersistenceError, Result};
use crate::store::StateStore;

/// Reads and writes per-user session snapshots in the state store,
/// one record per user and kind under `session:<user>:<kind>`.
pub struct SessionManager {
    store: Arc<dyn StateStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn StateStore>) -> SessionManager {
        SessionManager { store }
    }

    fn key(user: &str, kind: SnapshotKind) -> String {
        format!("session:{user}:{kind}")
    }

    pub async fn save(&self, user: &str, kind: SnapshotKind, snapshot: &Snapshot) -> Result<()> {
        let bytes = serde_json::to_vec(snapshot)
            .map_err(|err| PersistenceError::Storage(err.to_string()))?;
        self.store.put(&Self::key(user, kind), bytes).await
    }

    pub async fn load(&self, user: &str, kind: SnapshotKind) -> Result<Option<Snapshot>> {
        let Some(bytes) = self.store.get(&Self::key(user, kind)).await? else {
            return Ok(None);
        };
        let snapshot = serde_json::from_slice(&bytes)
            .map_err(|err| PersistenceError::Storage(err.to_string()))?;
        Ok(Some(snapshot))
    }

    /// Drop both snapshot records for a user, e.g. when the account is
    /// deleted.
    pub async fn clear(&self, user: &str) -> Result<()> {
        self.store.delete(&Self::key(user, SnapshotKind::Auto)).await?;
        self.store.delete(&Self::key(user, SnapshotKind::Manual)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn snapshots_are_kept_per_user_and_kind() {
        let sessions = SessionManager::new(Arc::new(MemoryStore::new()));
        let snap = Snapshot::new("/home/alice".into(), vec!["hi".into()], vec!["ls".into()]);
        sessions.save("alice", SnapshotKind::Auto, &snap).await.unwrap();

        assert!(sessions
            .load("alice", SnapshotKind::Manual)
            .await
            .unwrap()
            .is_none());
        assert!(sessions.load("bob", SnapshotKind::Auto).await.unwrap().is_none());

        let back = sessions
            .load("alice", SnapshotKind::Auto)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(back.cwd, "/home/alice");
        assert_eq!(back.history, vec!["ls".to_string()]);
        assert!(back.tree.is_none());
    }

    #[tokio::test]
    async fn clear_drops_both_kinds() {
        let sessions = SessionManager::new(Arc::new(MemoryStore::new()));
        let snap = Snapshot::new("/".into(), vec![], vec![]);
        sessions.save("u", SnapshotKind::Auto, &snap).await.unwrap();
        sessions.save("u", SnapshotKind::Manual, &snap).await.unwrap();
        sessions.clear("u").await.unwrap();
        assert!(sessions.load("u", SnapshotKind::Auto).await.unwrap().is_none());
        assert!(sessions.load("u", SnapshotKind::Manual).await.unwrap().is_none());
    }
}
