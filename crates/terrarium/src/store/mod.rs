//! Backing state stores.
//!
//! Everything the environment keeps across runs goes through one
//! narrow interface: opaque byte records under string keys. The tree,
//! the credential book, and session snapshots are all records; what
//! bytes mean is decided above this layer (see [`persist`]).

mod file;
mod memory;
mod persist;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use persist::{Persistence, DEFAULT_QUOTA_BYTES, KEY_CREDENTIALS, KEY_TREE};

use async_trait::async_trait;

use crate::error::Result;

/// A key-value record store. Implementations must be shareable across
/// tasks; terrarium handles one record per call and never assumes
/// transactions across keys.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Fetch a record, `None` when the key has never been written.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a record wholesale, replacing any previous value.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Drop a record. Unknown keys are fine.
    async fn delete(&self, key: &str) -> Result<()>;
}
