//! Declarative command contracts.
//!
//! Every command declares what it accepts as plain data: its flags,
//! how many positional arguments it takes, and which positionals are
//! paths with what existence, kind, and permission requirements. The
//! executor checks an invocation against the contract before the
//! handler runs, so handler code starts from validated input and the
//! error messages come out uniform.

use std::collections::HashMap;

use crate::error::{Error, PathError, Result};
use crate::vfs::{path, Access, NodeKind, NodeMeta, Vfs};

/// A command's full contract, exposed by its handler.
pub struct CommandSpec {
    pub name: &'static str,
    /// One-line description shown by `help`.
    pub summary: &'static str,
    /// Usage string shown on arity violations and by `help <name>`.
    pub usage: &'static str,
    pub flags: &'static [FlagSpec],
    pub args: ArgCount,
    pub paths: &'static [PathSpec],
}

/// One accepted flag. Short forms combine (`-la` ≡ `-l -a`); a flag
/// that takes a value must come last in a combined group.
pub struct FlagSpec {
    pub long: &'static str,
    pub short: Option<char>,
    pub takes_value: bool,
}

/// Positional argument count contract.
#[derive(Debug, Clone, Copy)]
pub enum ArgCount {
    Any,
    Exactly(usize),
    AtLeast(usize),
    Between(usize, usize),
}

impl ArgCount {
    fn accepts(self, n: usize) -> bool {
        match self {
            ArgCount::Any => true,
            ArgCount::Exactly(want) => n == want,
            ArgCount::AtLeast(min) => n >= min,
            ArgCount::Between(min, max) => n >= min && n <= max,
        }
    }
}

/// Path requirements for one positional (or, with `rest`, for every
/// positional from `index` on).
pub struct PathSpec {
    /// Positional index the path sits at.
    pub index: usize,
    /// Apply to all positionals from `index` to the end.
    pub rest: bool,
    /// A missing positional is fine (e.g. stdin fallback).
    pub optional: bool,
    /// The node must already exist.
    pub must_exist: bool,
    /// Required node kind, when it must exist.
    pub kind: Option<NodeKind>,
    /// Permissions the acting user must hold on the existing node.
    pub access: &'static [Access],
}

impl PathSpec {
    /// An existing node at `index` with the given access.
    pub const fn existing(index: usize, access: &'static [Access]) -> PathSpec {
        PathSpec {
            index,
            rest: false,
            optional: false,
            must_exist: true,
            kind: None,
            access,
        }
    }

    /// An existing file at `index` with the given access.
    pub const fn existing_file(index: usize, access: &'static [Access]) -> PathSpec {
        PathSpec {
            kind: Some(NodeKind::File),
            ..PathSpec::existing(index, access)
        }
    }

    /// An existing directory at `index` with the given access.
    pub const fn existing_dir(index: usize, access: &'static [Access]) -> PathSpec {
        PathSpec {
            kind: Some(NodeKind::Directory),
            ..PathSpec::existing(index, access)
        }
    }

    /// A path at `index` that is resolved but not required to exist.
    pub const fn any(index: usize) -> PathSpec {
        PathSpec {
            index,
            rest: false,
            optional: false,
            must_exist: false,
            kind: None,
            access: &[],
        }
    }

    pub const fn rest(mut self) -> PathSpec {
        self.rest = true;
        self
    }

    pub const fn optional(mut self) -> PathSpec {
        self.optional = true;
        self
    }
}

/// A positional path after validation: what was typed, where it
/// resolved to, and the node's attributes when it exists.
#[derive(Debug, Clone)]
pub struct ResolvedPath {
    pub index: usize,
    pub raw: String,
    pub abs: String,
    pub meta: Option<NodeMeta>,
}

/// Flags and positionals after splitting.
#[derive(Debug)]
pub(crate) struct ParsedArgs {
    pub flags: HashMap<String, Option<String>>,
    pub positionals: Vec<String>,
}

/// Split raw arguments into declared flags and positionals.
pub(crate) fn parse_args(spec: &CommandSpec, args: &[String]) -> Result<ParsedArgs> {
    let mut flags: HashMap<String, Option<String>> = HashMap::new();
    let mut positionals = Vec::new();
    let mut iter = args.iter().peekable();
    let mut flags_closed = false;

    while let Some(arg) = iter.next() {
        if flags_closed || arg == "-" || !arg.starts_with('-') {
            positionals.push(arg.clone());
            continue;
        }
        if arg == "--" {
            flags_closed = true;
            continue;
        }
        if let Some(long) = arg.strip_prefix("--") {
            let (name, inline) = match long.split_once('=') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (long, None),
            };
            let flag = find_long(spec, name)
                .ok_or_else(|| Error::validation(spec.name, format!("unknown option '--{name}'")))?;
            let value = if flag.takes_value {
                match inline {
                    Some(value) => Some(value),
                    None => Some(take_value(spec, &mut iter, &format!("--{name}"))?),
                }
            } else {
                if inline.is_some() {
                    return Err(Error::validation(
                        spec.name,
                        format!("option '--{name}' takes no value"),
                    ));
                }
                None
            };
            flags.insert(flag.long.to_string(), value);
            continue;
        }
        // Combined shorts; only the last may take a value.
        let group: Vec<char> = arg[1..].chars().collect();
        for (pos, ch) in group.iter().enumerate() {
            let flag = find_short(spec, *ch)
                .ok_or_else(|| Error::validation(spec.name, format!("unknown option '-{ch}'")))?;
            let value = if flag.takes_value {
                if pos + 1 != group.len() {
                    return Err(Error::validation(
                        spec.name,
                        format!("option '-{ch}' must be last in '{arg}'"),
                    ));
                }
                Some(take_value(spec, &mut iter, &format!("-{ch}"))?)
            } else {
                None
            };
            flags.insert(flag.long.to_string(), value);
        }
    }

    Ok(ParsedArgs { flags, positionals })
}

fn take_value(
    spec: &CommandSpec,
    iter: &mut std::iter::Peekable<std::slice::Iter<'_, String>>,
    shown: &str,
) -> Result<String> {
    iter.next()
        .cloned()
        .ok_or_else(|| Error::validation(spec.name, format!("option '{shown}' requires a value")))
}

fn find_long<'a>(spec: &'a CommandSpec, name: &str) -> Option<&'a FlagSpec> {
    spec.flags.iter().find(|f| f.long == name)
}

fn find_short(spec: &CommandSpec, ch: char) -> Option<&FlagSpec> {
    spec.flags.iter().find(|f| f.short == Some(ch))
}

/// Enforce the positional-count contract.
pub(crate) fn check_count(spec: &CommandSpec, positionals: &[String]) -> Result<()> {
    if spec.args.accepts(positionals.len()) {
        Ok(())
    } else {
        Err(Error::validation(
            spec.name,
            format!("usage: {}", spec.usage),
        ))
    }
}

/// Resolve and validate every declared path positional.
pub(crate) fn resolve_paths(
    spec: &CommandSpec,
    positionals: &[String],
    vfs: &Vfs,
    cwd: &str,
    user: &str,
) -> Result<Vec<ResolvedPath>> {
    let mut resolved = Vec::new();
    for path_spec in spec.paths {
        let indexes: Vec<usize> = if path_spec.rest {
            (path_spec.index..positionals.len()).collect()
        } else {
            vec![path_spec.index]
        };
        for index in indexes {
            let Some(raw) = positionals.get(index) else {
                if path_spec.optional {
                    continue;
                }
                // Arity violations are caught by check_count; an
                // absent required path here means the contract and
                // count disagree.
                return Err(Error::Internal(format!(
                    "{}: path contract expects an argument at {index}",
                    spec.name
                )));
            };
            let abs = path::resolve(raw, cwd);
            let meta = vfs.metadata(&abs, user);
            match &meta {
                None => {
                    if path_spec.must_exist {
                        return Err(PathError::NotFound(raw.clone()).into());
                    }
                }
                Some(meta) => {
                    if let Some(kind) = path_spec.kind {
                        if meta.kind != kind {
                            return Err(match kind {
                                NodeKind::Directory => PathError::NotADirectory(raw.clone()),
                                NodeKind::File => PathError::IsADirectory(raw.clone()),
                            }
                            .into());
                        }
                    }
                    for access in path_spec.access {
                        if !meta.permits(user, *access) {
                            return Err(Error::PermissionDenied(raw.clone()));
                        }
                    }
                }
            }
            resolved.push(ResolvedPath {
                index,
                raw: raw.clone(),
                abs,
                meta,
            });
        }
    }
    Ok(resolved)
}
