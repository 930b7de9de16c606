//! Virtual file system.
//!
//! One tree of [`Node`]s behind an interior `RwLock`. Every operation
//! takes the acting user and resolves permissions inline: reaching a
//! node requires execute on each directory entered through, and a path
//! that is missing or unsearchable looks exactly the same from the
//! outside (absent). All paths handed to this layer are already
//! normalized absolute strings; see [`path::resolve`].

pub mod mode;
pub mod node;
pub mod path;

pub use mode::{Access, Mode};
pub use node::{Node, NodeKind, NodeMeta};

use chrono::Utc;
use std::sync::RwLock;

use crate::error::{Error, PathError, Result};
use crate::session::users::SUPERUSER;

/// The virtual tree. Cheap to share behind an `Arc`; each method locks
/// for the duration of the call only.
pub struct Vfs {
    root: RwLock<Node>,
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs {
    /// Bare tree: a root directory owned by the superuser.
    pub fn new() -> Vfs {
        Vfs {
            root: RwLock::new(Node::dir(SUPERUSER)),
        }
    }

    /// Attribute lookup. Missing nodes and nodes hidden behind an
    /// unsearchable directory both come back as `None`.
    pub fn metadata(&self, abs: &str, user: &str) -> Option<NodeMeta> {
        let root = self.root.read().unwrap();
        descend(&root, abs, user).map(Node::meta)
    }

    pub fn exists(&self, abs: &str, user: &str) -> bool {
        self.metadata(abs, user).is_some()
    }

    /// Read a file's content. Requires read permission on the file.
    pub fn read_file(&self, abs: &str, user: &str) -> Result<String> {
        let root = self.root.read().unwrap();
        let node = descend(&root, abs, user)
            .ok_or_else(|| PathError::NotFound(abs.to_string()))?;
        match node.content() {
            Some(content) => {
                if !node.permits(user, Access::Read) {
                    return Err(Error::PermissionDenied(abs.to_string()));
                }
                Ok(content.to_string())
            }
            None => Err(PathError::IsADirectory(abs.to_string()).into()),
        }
    }

    /// Write `content` to a file, creating it if missing. Appending
    /// inserts a single separating newline when the existing content
    /// does not already end with one.
    pub fn write_file(&self, abs: &str, user: &str, content: &str, append: bool) -> Result<()> {
        let Some(parent_abs) = path::parent(abs) else {
            return Err(PathError::IsADirectory("/".to_string()).into());
        };
        let Some(name) = path::file_name(abs) else {
            return Err(PathError::IsADirectory(abs.to_string()).into());
        };
        let mut root = self.root.write().unwrap();
        let container = enter_container(&mut root, &parent_abs, abs, user)?;

        if let Some(existing) = container.children_mut().and_then(|c| c.get_mut(name)) {
            if existing.is_dir() {
                return Err(PathError::IsADirectory(abs.to_string()).into());
            }
            if !existing.permits(user, Access::Write) {
                return Err(Error::PermissionDenied(abs.to_string()));
            }
            if let Node::File {
                content: old, mtime, ..
            } = existing
            {
                if append {
                    if !old.is_empty() && !old.ends_with('\n') {
                        old.push('\n');
                    }
                    old.push_str(content);
                } else {
                    *old = content.to_string();
                }
                *mtime = Utc::now();
            }
            return Ok(());
        }

        if !container.permits(user, Access::Write) {
            return Err(Error::PermissionDenied(parent_abs));
        }
        container.set_mtime(Utc::now());
        if let Some(children) = container.children_mut() {
            children.insert(name.to_string(), Node::file(user, content));
        }
        Ok(())
    }

    /// Create a single directory. The parent must already exist.
    pub fn create_dir(&self, abs: &str, user: &str) -> Result<()> {
        let Some(parent_abs) = path::parent(abs) else {
            return Err(PathError::AlreadyExists("/".to_string()).into());
        };
        let Some(name) = path::file_name(abs) else {
            return Err(PathError::AlreadyExists(abs.to_string()).into());
        };
        let mut root = self.root.write().unwrap();
        let container = enter_container(&mut root, &parent_abs, abs, user)?;
        if container.child(name).is_some() {
            return Err(PathError::AlreadyExists(abs.to_string()).into());
        }
        if !container.permits(user, Access::Write) {
            return Err(Error::PermissionDenied(parent_abs));
        }
        container.set_mtime(Utc::now());
        if let Some(children) = container.children_mut() {
            children.insert(name.to_string(), Node::dir(user));
        }
        Ok(())
    }

    /// Create every missing directory along `abs`. Directories created
    /// before a failure stay created.
    pub fn create_dir_all(&self, abs: &str, user: &str) -> Result<()> {
        let mut root = self.root.write().unwrap();
        let mut node = &mut *root;
        let mut walked = String::new();
        for seg in path::segments(abs) {
            if !node.is_dir() {
                let at = if walked.is_empty() { "/" } else { walked.as_str() };
                return Err(PathError::NotADirectory(at.to_string()).into());
            }
            if !node.permits(user, Access::Execute) {
                return Err(PathError::NotFound(abs.to_string()).into());
            }
            let missing = node.child(seg).is_none();
            if missing {
                if !node.permits(user, Access::Write) {
                    let at = if walked.is_empty() { "/" } else { walked.as_str() };
                    return Err(Error::PermissionDenied(at.to_string()));
                }
                node.set_mtime(Utc::now());
            }
            walked.push('/');
            walked.push_str(seg);
            let Some(children) = node.children_mut() else {
                return Err(Error::Internal(format!(
                    "directory lost its children during walk: {walked}"
                )));
            };
            node = children.entry(seg.to_string()).or_insert_with(|| Node::dir(user));
        }
        if !node.is_dir() {
            return Err(PathError::NotADirectory(abs.to_string()).into());
        }
        Ok(())
    }

    /// Create an empty file or refresh the modification time of an
    /// existing node.
    pub fn touch(&self, abs: &str, user: &str) -> Result<()> {
        if abs == "/" {
            let mut root = self.root.write().unwrap();
            if !root.permits(user, Access::Write) {
                return Err(Error::PermissionDenied(abs.to_string()));
            }
            root.set_mtime(Utc::now());
            return Ok(());
        }
        let Some(parent_abs) = path::parent(abs) else {
            return Err(PathError::NotFound(abs.to_string()).into());
        };
        let Some(name) = path::file_name(abs) else {
            return Err(PathError::NotFound(abs.to_string()).into());
        };
        let mut root = self.root.write().unwrap();
        let container = enter_container(&mut root, &parent_abs, abs, user)?;
        if let Some(existing) = container.children_mut().and_then(|c| c.get_mut(name)) {
            if !existing.permits(user, Access::Write) {
                return Err(Error::PermissionDenied(abs.to_string()));
            }
            existing.set_mtime(Utc::now());
            return Ok(());
        }
        if !container.permits(user, Access::Write) {
            return Err(Error::PermissionDenied(parent_abs));
        }
        container.set_mtime(Utc::now());
        if let Some(children) = container.children_mut() {
            children.insert(name.to_string(), Node::file(user, ""));
        }
        Ok(())
    }

    /// List a directory's entries in name order. Requires read
    /// permission on the directory.
    pub fn list_dir(&self, abs: &str, user: &str) -> Result<Vec<(String, NodeMeta)>> {
        let root = self.root.read().unwrap();
        let node = descend(&root, abs, user)
            .ok_or_else(|| PathError::NotFound(abs.to_string()))?;
        let Some(children) = node.children() else {
            return Err(PathError::NotADirectory(abs.to_string()).into());
        };
        if !node.permits(user, Access::Read) {
            return Err(Error::PermissionDenied(abs.to_string()));
        }
        Ok(children
            .iter()
            .map(|(name, child)| (name.clone(), child.meta()))
            .collect())
    }

    /// Delete a node, recursing when asked. Children go before their
    /// parent; a descendant that cannot be removed stays, and so does
    /// every ancestor up to the argument. With `force`, not-found and
    /// permission failures are swallowed and the call reports success.
    pub fn remove(&self, abs: &str, user: &str, recursive: bool, force: bool) -> Result<()> {
        if abs == "/" {
            return Err(Error::PermissionDenied("/".to_string()));
        }
        let Some(parent_abs) = path::parent(abs) else {
            return Err(PathError::NotFound(abs.to_string()).into());
        };
        let Some(name) = path::file_name(abs) else {
            return Err(PathError::NotFound(abs.to_string()).into());
        };
        let mut root = self.root.write().unwrap();
        let container = match enter_container(&mut root, &parent_abs, abs, user) {
            Ok(container) => container,
            Err(_) if force => return Ok(()),
            Err(err) => return Err(err),
        };
        let Some(target) = container.child(name) else {
            if force {
                return Ok(());
            }
            return Err(PathError::NotFound(abs.to_string()).into());
        };
        if target.is_dir() && !recursive {
            return Err(PathError::IsADirectory(abs.to_string()).into());
        }

        let mut failed = Vec::new();
        remove_child(container, name, abs, user, &mut failed);
        if failed.is_empty() || force {
            Ok(())
        } else {
            Err(Error::PermissionDenied(failed.join(", ")))
        }
    }

    /// Move a node. The destination may be an existing directory (the
    /// node keeps its name inside it) or a full target path. An
    /// existing file target is replaced; an existing directory target
    /// is refused.
    pub fn rename(&self, from: &str, to: &str, user: &str) -> Result<()> {
        if from == "/" {
            return Err(Error::PermissionDenied("/".to_string()));
        }
        let mut root = self.root.write().unwrap();

        let source = descend(&root, from, user)
            .ok_or_else(|| PathError::NotFound(from.to_string()))?;
        if !source.permits(user, Access::Write) {
            return Err(Error::PermissionDenied(from.to_string()));
        }

        let (dest_dir, dest_name) = destination_of(&root, from, to, user)?;
        let dest_final = path::join(&dest_dir, &dest_name);
        if dest_final == from {
            return Ok(());
        }
        if let Some(existing) = descend(&root, &dest_final, user) {
            if existing.is_dir() {
                return Err(PathError::AlreadyExists(dest_final).into());
            }
            if !existing.permits(user, Access::Write) {
                return Err(Error::PermissionDenied(dest_final));
            }
        }
        {
            let container = enter_container(&mut root, &dest_dir, &dest_final, user)?;
            if !container.permits(user, Access::Write) {
                return Err(Error::PermissionDenied(dest_dir));
            }
        }

        // Checks done; detach, then reattach.
        let source_parent = path::parent(from)
            .ok_or_else(|| Error::Internal(format!("no parent for {from}")))?;
        let src_name = path::file_name(from)
            .ok_or_else(|| Error::Internal(format!("no file name for {from}")))?
            .to_string();
        let node = {
            let container = enter_container(&mut root, &source_parent, from, user)?;
            container.set_mtime(Utc::now());
            container
                .children_mut()
                .and_then(|c| c.remove(&src_name))
                .ok_or_else(|| {
                    Error::Internal(format!("child missing from its expected parent: {from}"))
                })?
        };
        let container = enter_container(&mut root, &dest_dir, &dest_final, user)?;
        container.set_mtime(Utc::now());
        if let Some(children) = container.children_mut() {
            children.insert(dest_name, node);
        }
        Ok(())
    }

    /// Copy a node. Directories need `recursive`. The copy belongs to
    /// the acting user and gets fresh modification times throughout.
    pub fn copy(&self, from: &str, to: &str, user: &str, recursive: bool) -> Result<()> {
        let mut root = self.root.write().unwrap();

        let source = descend(&root, from, user)
            .ok_or_else(|| PathError::NotFound(from.to_string()))?;
        if !source.permits(user, Access::Read) {
            return Err(Error::PermissionDenied(from.to_string()));
        }
        if source.is_dir() && !recursive {
            return Err(PathError::IsADirectory(from.to_string()).into());
        }
        let mut duplicate = source.clone();
        rebrand(&mut duplicate, user);

        let (dest_dir, dest_name) = destination_of(&root, from, to, user)?;
        let dest_final = path::join(&dest_dir, &dest_name);
        if dest_final == from {
            return Err(PathError::AlreadyExists(dest_final).into());
        }
        if let Some(existing) = descend(&root, &dest_final, user) {
            if existing.is_dir() {
                return Err(PathError::AlreadyExists(dest_final).into());
            }
            if !existing.permits(user, Access::Write) {
                return Err(Error::PermissionDenied(dest_final));
            }
        }
        let container = enter_container(&mut root, &dest_dir, &dest_final, user)?;
        if !container.permits(user, Access::Write) {
            return Err(Error::PermissionDenied(dest_dir));
        }
        container.set_mtime(Utc::now());
        if let Some(children) = container.children_mut() {
            children.insert(dest_name, duplicate);
        }
        Ok(())
    }

    /// Change a node's permission mode. Only the owner and the
    /// superuser may.
    pub fn chmod(&self, abs: &str, user: &str, new_mode: Mode) -> Result<()> {
        let mut root = self.root.write().unwrap();
        let node = descend_mut(&mut root, abs, user)
            .ok_or_else(|| PathError::NotFound(abs.to_string()))?;
        if user != SUPERUSER && node.owner() != user {
            return Err(Error::PermissionDenied(abs.to_string()));
        }
        node.set_mode(new_mode);
        Ok(())
    }

    /// Reassign a node's owner. Superuser only.
    pub fn chown(&self, abs: &str, user: &str, new_owner: &str) -> Result<()> {
        if user != SUPERUSER {
            return Err(Error::PermissionDenied(abs.to_string()));
        }
        let mut root = self.root.write().unwrap();
        let node = descend_mut(&mut root, abs, user)
            .ok_or_else(|| PathError::NotFound(abs.to_string()))?;
        node.set_owner(new_owner);
        Ok(())
    }

    /// Total content bytes in the tree, the number checked against the
    /// state quota.
    pub fn total_size(&self) -> u64 {
        self.root.read().unwrap().size()
    }

    /// Deep copy of the whole tree.
    pub fn snapshot(&self) -> Node {
        self.root.read().unwrap().clone()
    }

    /// Replace the whole tree.
    pub fn restore(&self, tree: Node) {
        *self.root.write().unwrap() = tree;
    }
}

/// Walk to the node at `abs`. Entering a directory on the way requires
/// execute permission on it; the final node itself is returned without
/// any check. `None` covers both "missing" and "unsearchable".
fn descend<'a>(root: &'a Node, abs: &str, user: &str) -> Option<&'a Node> {
    let mut node = root;
    for seg in path::segments(abs) {
        if !node.is_dir() || !node.permits(user, Access::Execute) {
            return None;
        }
        node = node.child(seg)?;
    }
    Some(node)
}

fn descend_mut<'a>(root: &'a mut Node, abs: &str, user: &str) -> Option<&'a mut Node> {
    let mut node = root;
    for seg in path::segments(abs) {
        if !node.is_dir() || !node.permits(user, Access::Execute) {
            return None;
        }
        node = node.children_mut()?.get_mut(seg)?;
    }
    Some(node)
}

/// Walk to the directory that is about to be operated inside of.
/// `full` is the path of the child the caller is interested in; it is
/// what a not-found error should name. Entering the container itself
/// requires execute permission on it.
fn enter_container<'a>(
    root: &'a mut Node,
    dir_abs: &str,
    full: &str,
    user: &str,
) -> Result<&'a mut Node> {
    let Some(container) = descend_mut(root, dir_abs, user) else {
        return Err(PathError::NotFound(full.to_string()).into());
    };
    if !container.is_dir() {
        return Err(PathError::NotADirectory(dir_abs.to_string()).into());
    }
    if !container.permits(user, Access::Execute) {
        return Err(PathError::NotFound(full.to_string()).into());
    }
    Ok(container)
}

/// Resolve the (directory, name) a move or copy lands at: an existing
/// directory target keeps the source's name inside it, anything else
/// splits into parent and final segment.
fn destination_of(root: &Node, from: &str, to: &str, user: &str) -> Result<(String, String)> {
    if let Some(existing) = descend(root, to, user) {
        if existing.is_dir() {
            let name = path::file_name(from)
                .ok_or_else(|| Error::Internal(format!("no file name for {from}")))?;
            return Ok((to.to_string(), name.to_string()));
        }
    }
    let dir = path::parent(to).ok_or_else(|| PathError::AlreadyExists("/".to_string()))?;
    let name = path::file_name(to).ok_or_else(|| PathError::AlreadyExists(to.to_string()))?;
    Ok((dir, name.to_string()))
}

/// Post-order removal of `name` under `parent`. Paths that could not
/// be removed accumulate in `failed`; whatever was already deleted
/// stays deleted.
fn remove_child(parent: &mut Node, name: &str, abs: &str, user: &str, failed: &mut Vec<String>) {
    let is_dir = {
        let Some(child) = parent.child(name) else { return };
        child.is_dir()
    };
    if is_dir {
        let grandchildren: Vec<String> = parent
            .child(name)
            .and_then(Node::children)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default();
        if let Some(child) = parent.children_mut().and_then(|c| c.get_mut(name)) {
            for grandchild in grandchildren {
                let sub = path::join(abs, &grandchild);
                remove_child(child, &grandchild, &sub, user, failed);
            }
        }
    }
    let removable = {
        let Some(child) = parent.child(name) else { return };
        if !child.permits(user, Access::Write) {
            failed.push(abs.to_string());
            false
        } else {
            // A directory with survivors stays; its children already
            // reported themselves.
            !(child.is_dir() && child.children().is_some_and(|c| !c.is_empty()))
        }
    };
    if removable {
        if let Some(children) = parent.children_mut() {
            children.remove(name);
        }
        parent.set_mtime(Utc::now());
    }
}

/// Make a copied subtree the acting user's: their ownership, fresh
/// modification times, modes untouched.
fn rebrand(node: &mut Node, user: &str) {
    node.set_owner(user);
    node.set_mtime(Utc::now());
    if let Some(children) = node.children_mut() {
        for child in children.values_mut() {
            rebrand(child, user);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Vfs {
        let fs = Vfs::new();
        fs.create_dir("/home", SUPERUSER).unwrap();
        fs.create_dir("/home/guest", SUPERUSER).unwrap();
        fs.chown("/home/guest", SUPERUSER, "guest").unwrap();
        fs.create_dir("/tmp", SUPERUSER).unwrap();
        fs.chmod("/tmp", SUPERUSER, Mode::SHARED).unwrap();
        fs
    }

    #[test]
    fn write_then_read_round_trips() {
        let fs = seeded();
        fs.write_file("/home/guest/a.txt", "guest", "hello", false)
            .unwrap();
        assert_eq!(fs.read_file("/home/guest/a.txt", "guest").unwrap(), "hello");
    }

    #[test]
    fn append_separates_with_one_newline() {
        let fs = seeded();
        fs.write_file("/tmp/log", "guest", "one", false).unwrap();
        fs.write_file("/tmp/log", "guest", "two", true).unwrap();
        assert_eq!(fs.read_file("/tmp/log", "guest").unwrap(), "one\ntwo");

        fs.write_file("/tmp/log2", "guest", "one\n", false).unwrap();
        fs.write_file("/tmp/log2", "guest", "two\n", true).unwrap();
        assert_eq!(fs.read_file("/tmp/log2", "guest").unwrap(), "one\ntwo\n");
    }

    #[test]
    fn unsearchable_directory_hides_its_subtree() {
        let fs = seeded();
        fs.create_dir("/home/guest/inner", "guest").unwrap();
        fs.write_file("/home/guest/inner/f", "guest", "x", false)
            .unwrap();
        // Drop execute for everyone, including the owner.
        fs.chmod("/home/guest/inner", "guest", Mode::parse("66").unwrap())
            .unwrap();
        assert!(fs.metadata("/home/guest/inner/f", "guest").is_none());
        // The directory itself is still visible; the path does not
        // pass through it.
        assert!(fs.metadata("/home/guest/inner", "guest").is_some());
        // The superuser is unaffected.
        assert!(fs.metadata("/home/guest/inner/f", SUPERUSER).is_some());
    }

    #[test]
    fn create_dir_all_builds_the_whole_chain() {
        let fs = seeded();
        fs.create_dir_all("/home/guest/a/b/c", "guest").unwrap();
        assert!(fs.exists("/home/guest/a/b/c", "guest"));
        // Idempotent on an existing chain.
        fs.create_dir_all("/home/guest/a/b", "guest").unwrap();
    }

    #[test]
    fn create_dir_all_refuses_a_file_in_the_chain() {
        let fs = seeded();
        fs.write_file("/home/guest/plain", "guest", "", false).unwrap();
        let err = fs
            .create_dir_all("/home/guest/plain/deeper", "guest")
            .unwrap_err();
        assert!(matches!(err, Error::Path(PathError::NotADirectory(_))));
    }

    #[test]
    fn remove_missing_with_force_is_quiet() {
        let fs = seeded();
        assert!(fs.remove("/tmp/nothing", "guest", false, true).is_ok());
        assert!(fs.remove("/tmp/nothing", "guest", false, false).is_err());
    }

    #[test]
    fn recursive_remove_keeps_protected_descendants() {
        let fs = seeded();
        fs.create_dir("/tmp/work", "guest").unwrap();
        fs.write_file("/tmp/work/a", "guest", "x", false).unwrap();
        fs.create_dir("/tmp/work/keep", "guest").unwrap();
        fs.write_file("/tmp/work/keep/b", "guest", "y", false).unwrap();
        // keep/b belongs to root and nobody else may write it.
        fs.chown("/tmp/work/keep/b", SUPERUSER, SUPERUSER).unwrap();
        fs.chmod("/tmp/work/keep/b", SUPERUSER, Mode::parse("60").unwrap())
            .unwrap();

        let err = fs.remove("/tmp/work", "guest", true, false).unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
        // The deletable sibling is gone, the protected chain survives.
        assert!(!fs.exists("/tmp/work/a", SUPERUSER));
        assert!(fs.exists("/tmp/work/keep/b", SUPERUSER));
        assert!(fs.exists("/tmp/work", SUPERUSER));
    }

    #[test]
    fn rename_into_directory_keeps_the_name() {
        let fs = seeded();
        fs.write_file("/tmp/f", "guest", "data", false).unwrap();
        fs.create_dir("/tmp/d", "guest").unwrap();
        fs.rename("/tmp/f", "/tmp/d", "guest").unwrap();
        assert!(!fs.exists("/tmp/f", "guest"));
        assert_eq!(fs.read_file("/tmp/d/f", "guest").unwrap(), "data");
    }

    #[test]
    fn copy_directory_requires_recursive() {
        let fs = seeded();
        fs.create_dir("/tmp/src", "guest").unwrap();
        fs.write_file("/tmp/src/f", "guest", "v", false).unwrap();
        assert!(matches!(
            fs.copy("/tmp/src", "/tmp/dst", "guest", false),
            Err(Error::Path(PathError::IsADirectory(_)))
        ));
        fs.copy("/tmp/src", "/tmp/dst", "guest", true).unwrap();
        assert_eq!(fs.read_file("/tmp/dst/f", "guest").unwrap(), "v");
        assert_eq!(fs.read_file("/tmp/src/f", "guest").unwrap(), "v");
    }

    #[test]
    fn chmod_is_owner_or_superuser_only() {
        let fs = seeded();
        fs.write_file("/tmp/f", "guest", "x", false).unwrap();
        assert!(fs.chmod("/tmp/f", "alice", Mode::parse("77").unwrap()).is_err());
        assert!(fs.chmod("/tmp/f", "guest", Mode::parse("77").unwrap()).is_ok());
        assert!(fs.chmod("/tmp/f", SUPERUSER, Mode::parse("64").unwrap()).is_ok());
    }

    #[test]
    fn total_size_counts_content_bytes() {
        let fs = seeded();
        fs.write_file("/tmp/a", "guest", "12345", false).unwrap();
        fs.write_file("/tmp/b", "guest", "123", false).unwrap();
        assert_eq!(fs.total_size(), 8);
    }
}
