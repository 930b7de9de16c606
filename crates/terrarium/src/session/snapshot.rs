//! Session snapshots.
//!
//! A snapshot freezes one user's view of the environment: working
//! directory, visible screen log, command history, and (for manual
//! snapshots only) a deep copy of the whole tree. Automatic snapshots
//! are taken on every user switch; manual ones only by the `save`
//! command, and only `load` brings a tree back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::vfs::Node;

/// Which flavor of snapshot a record is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    /// Taken on user switch; never includes the tree.
    Auto,
    /// Taken by `save`; includes the tree.
    Manual,
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotKind::Auto => write!(f, "auto"),
            SnapshotKind::Manual => write!(f, "manual"),
        }
    }
}

/// One frozen session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub cwd: String,
    pub screen: Vec<String>,
    pub history: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree: Option<Node>,
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(cwd: String, screen: Vec<String>, history: Vec<String>) -> Snapshot {
        Snapshot {
            cwd,
            screen,
            history,
            tree: None,
            taken_at: Utc::now(),
        }
    }

    pub fn with_tree(mut self, tree: Node) -> Snapshot {
        self.tree = Some(tree);
        self
    }
}
