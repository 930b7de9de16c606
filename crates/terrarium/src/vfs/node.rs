//! Tree nodes: files and directories.
//!
//! A node carries its owner, permission mode, and modification time.
//! Files hold text content; directories hold named children in sorted
//! order so listings and serialized records come out deterministic.
//! The whole tree is `Clone` and `serde`-serializable, which is what
//! snapshots and the persisted record are built on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::mode::{Access, Mode};
use crate::session::users::SUPERUSER;

/// What a node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::File => write!(f, "file"),
            NodeKind::Directory => write!(f, "directory"),
        }
    }
}

/// A single node in the virtual tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    File {
        owner: String,
        mode: Mode,
        mtime: DateTime<Utc>,
        content: String,
    },
    Directory {
        owner: String,
        mode: Mode,
        mtime: DateTime<Utc>,
        children: BTreeMap<String, Node>,
    },
}

impl Node {
    /// New empty file with the default file mode.
    pub fn file(owner: impl Into<String>, content: impl Into<String>) -> Node {
        Node::File {
            owner: owner.into(),
            mode: Mode::FILE_DEFAULT,
            mtime: Utc::now(),
            content: content.into(),
        }
    }

    /// New empty directory with the default directory mode.
    pub fn dir(owner: impl Into<String>) -> Node {
        Node::Directory {
            owner: owner.into(),
            mode: Mode::DIR_DEFAULT,
            mtime: Utc::now(),
            children: BTreeMap::new(),
        }
    }

    pub fn with_mode(mut self, new_mode: Mode) -> Node {
        self.set_mode(new_mode);
        self
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::File { .. } => NodeKind::File,
            Node::Directory { .. } => NodeKind::Directory,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Node::Directory { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Node::File { .. })
    }

    pub fn owner(&self) -> &str {
        match self {
            Node::File { owner, .. } | Node::Directory { owner, .. } => owner,
        }
    }

    pub fn set_owner(&mut self, new_owner: impl Into<String>) {
        match self {
            Node::File { owner, .. } | Node::Directory { owner, .. } => *owner = new_owner.into(),
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            Node::File { mode, .. } | Node::Directory { mode, .. } => *mode,
        }
    }

    pub fn set_mode(&mut self, new_mode: Mode) {
        match self {
            Node::File { mode, .. } | Node::Directory { mode, .. } => *mode = new_mode,
        }
    }

    pub fn mtime(&self) -> DateTime<Utc> {
        match self {
            Node::File { mtime, .. } | Node::Directory { mtime, .. } => *mtime,
        }
    }

    pub fn set_mtime(&mut self, at: DateTime<Utc>) {
        match self {
            Node::File { mtime, .. } | Node::Directory { mtime, .. } => *mtime = at,
        }
    }

    pub fn children(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Node::Directory { children, .. } => Some(children),
            Node::File { .. } => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut BTreeMap<String, Node>> {
        match self {
            Node::Directory { children, .. } => Some(children),
            Node::File { .. } => None,
        }
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children().and_then(|c| c.get(name))
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            Node::File { content, .. } => Some(content),
            Node::Directory { .. } => None,
        }
    }

    /// Recursive size: files count their content bytes, directories sum
    /// their children. This is the number the state quota is checked
    /// against.
    pub fn size(&self) -> u64 {
        match self {
            Node::File { content, .. } => content.len() as u64,
            Node::Directory { children, .. } => children.values().map(Node::size).sum(),
        }
    }

    /// Does `user` hold `access` on this node? The superuser passes
    /// every check.
    pub fn permits(&self, user: &str, access: Access) -> bool {
        if user == SUPERUSER {
            return true;
        }
        if self.owner() == user {
            self.mode().owner_allows(access)
        } else {
            self.mode().other_allows(access)
        }
    }

    /// Cheap attribute snapshot for callers outside the tree lock.
    pub fn meta(&self) -> NodeMeta {
        NodeMeta {
            kind: self.kind(),
            owner: self.owner().to_string(),
            mode: self.mode(),
            mtime: self.mtime(),
            size: self.size(),
        }
    }
}

/// Attributes of a node, detached from the tree.
#[derive(Debug, Clone)]
pub struct NodeMeta {
    pub kind: NodeKind,
    pub owner: String,
    pub mode: Mode,
    pub mtime: DateTime<Utc>,
    pub size: u64,
}

impl NodeMeta {
    /// Same check as [`Node::permits`], usable after the lookup.
    pub fn permits(&self, user: &str, access: Access) -> bool {
        if user == SUPERUSER {
            return true;
        }
        if self.owner == user {
            self.mode.owner_allows(access)
        } else {
            self.mode.other_allows(access)
        }
    }
}
