//! Pure path arithmetic over slash-separated strings.
//!
//! Every path handed to the tree is first resolved to a normalized
//! absolute form: relative paths join onto the working directory, `.`
//! disappears, `..` pops one level and clamps at the root, duplicate
//! slashes collapse. Resolution never touches the tree, so it cannot
//! fail; missing nodes surface later, at lookup time.

/// Resolve `path` against the working directory `cwd` into a normalized
/// absolute path. An empty `path` resolves to `cwd` itself.
pub fn resolve(path: &str, cwd: &str) -> String {
    if path.starts_with('/') {
        normalize(path)
    } else {
        let mut joined = String::from(cwd);
        if !joined.ends_with('/') {
            joined.push('/');
        }
        joined.push_str(path);
        normalize(&joined)
    }
}

/// Normalize an absolute path string.
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                // Above the root, `..` stays at the root.
                parts.pop();
            }
            name => parts.push(name),
        }
    }
    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}

/// Split a normalized absolute path into its segments. The root path
/// yields no segments.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Parent of a normalized absolute path. The root has none.
pub fn parent(path: &str) -> Option<String> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(idx) => Some(path[..idx].to_string()),
        None => None,
    }
}

/// Final segment of a normalized absolute path. The root has none.
pub fn file_name(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    path.rsplit('/').next().filter(|s| !s.is_empty())
}

/// Join a directory path and a child name.
pub fn join(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_join_onto_cwd() {
        assert_eq!(resolve("notes.txt", "/home/guest"), "/home/guest/notes.txt");
        assert_eq!(resolve("a/b", "/tmp"), "/tmp/a/b");
        assert_eq!(resolve("", "/home/guest"), "/home/guest");
    }

    #[test]
    fn absolute_paths_ignore_cwd() {
        assert_eq!(resolve("/etc/motd", "/home/guest"), "/etc/motd");
    }

    #[test]
    fn dot_and_dotdot_collapse() {
        assert_eq!(resolve("./a/./b", "/home"), "/home/a/b");
        assert_eq!(resolve("a/../b", "/home"), "/home/b");
        assert_eq!(resolve("../..", "/home/guest"), "/");
    }

    #[test]
    fn dotdot_clamps_at_root() {
        assert_eq!(resolve("../../../..", "/home"), "/");
        assert_eq!(normalize("/../../x"), "/x");
    }

    #[test]
    fn duplicate_and_trailing_slashes_collapse() {
        assert_eq!(normalize("//a///b//"), "/a/b");
        assert_eq!(resolve("dir/", "/home"), "/home/dir");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["/a/b/../c//./d", "/..", "///", "/x/y/z/"] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn parent_and_file_name() {
        assert_eq!(parent("/"), None);
        assert_eq!(parent("/a").as_deref(), Some("/"));
        assert_eq!(parent("/a/b").as_deref(), Some("/a"));
        assert_eq!(file_name("/"), None);
        assert_eq!(file_name("/a/b"), Some("b"));
    }

    #[test]
    fn join_handles_root() {
        assert_eq!(join("/", "tmp"), "/tmp");
        assert_eq!(join("/home", "guest"), "/home/guest");
    }
}
