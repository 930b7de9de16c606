//! Where-am-I commands: `ls`, `pwd`, `cd`.

use async_trait::async_trait;

use crate::error::Result;
use crate::exec::{
    ArgCount, CommandAction, CommandSpec, ExecOutcome, FlagSpec, Invocation, PathSpec,
};
use crate::session::users::home_dir;
use crate::vfs::{Access, NodeKind, NodeMeta};

use super::Command;

static LS_SPEC: CommandSpec = CommandSpec {
    name: "ls",
    summary: "list directory contents",
    usage: "ls [-l] [-a] [PATH]",
    flags: &[
        FlagSpec {
            long: "long",
            short: Some('l'),
            takes_value: false,
        },
        FlagSpec {
            long: "all",
            short: Some('a'),
            takes_value: false,
        },
    ],
    args: ArgCount::Between(0, 1),
    paths: &[PathSpec::existing(0, &[]).optional()],
};

fn long_entry(name: &str, meta: &NodeMeta) -> String {
    let kind = match meta.kind {
        NodeKind::Directory => 'd',
        NodeKind::File => '-',
    };
    format!(
        "{}{} {:<8} {:>8} {} {}\n",
        kind,
        meta.mode.render(),
        meta.owner,
        meta.size,
        meta.mtime.format("%Y-%m-%d %H:%M"),
        name
    )
}

/// `ls` - names in order, or `-l` rows with kind, mode, owner, size,
/// and modification time. Dotfiles stay hidden without `-a`.
pub struct Ls;

#[async_trait]
impl Command for Ls {
    fn spec(&self) -> &'static CommandSpec {
        &LS_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let long = invocation.has_flag("long");
        let all = invocation.has_flag("all");

        // A file argument lists just itself.
        if let Some(path) = invocation.path_at(0) {
            if let Some(meta) = &path.meta {
                if meta.kind == NodeKind::File {
                    let output = if long {
                        long_entry(&path.raw, meta)
                    } else {
                        format!("{}\n", path.raw)
                    };
                    return Ok(CommandAction::done(ExecOutcome::ok(output)));
                }
            }
        }

        let dir = invocation
            .path_at(0)
            .map(|p| p.abs.clone())
            .unwrap_or_else(|| invocation.cwd.clone());
        let mut output = String::new();
        for (name, meta) in invocation.vfs().list_dir(&dir, &invocation.user)? {
            if !all && name.starts_with('.') {
                continue;
            }
            if long {
                output.push_str(&long_entry(&name, &meta));
            } else {
                output.push_str(&name);
                output.push('\n');
            }
        }
        Ok(CommandAction::done(ExecOutcome::ok(output)))
    }
}

static PWD_SPEC: CommandSpec = CommandSpec {
    name: "pwd",
    summary: "print the working directory",
    usage: "pwd",
    flags: &[],
    args: ArgCount::Exactly(0),
    paths: &[],
};

/// `pwd` - the working directory, absolute and normalized.
pub struct Pwd;

#[async_trait]
impl Command for Pwd {
    fn spec(&self) -> &'static CommandSpec {
        &PWD_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        Ok(CommandAction::done(ExecOutcome::ok(format!(
            "{}\n",
            invocation.cwd
        ))))
    }
}

static CD_SPEC: CommandSpec = CommandSpec {
    name: "cd",
    summary: "change the working directory",
    usage: "cd [DIR]",
    flags: &[],
    args: ArgCount::Between(0, 1),
    paths: &[PathSpec::existing_dir(0, &[Access::Execute]).optional()],
};

/// `cd` - moves into a searchable directory; with no argument, the
/// user's home, falling back to the root.
pub struct Cd;

#[async_trait]
impl Command for Cd {
    fn spec(&self) -> &'static CommandSpec {
        &CD_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let target = match invocation.path_at(0) {
            Some(path) => path.abs.clone(),
            None => {
                let home = home_dir(&invocation.user);
                match invocation.vfs().metadata(&home, &invocation.user) {
                    Some(meta)
                        if meta.kind == NodeKind::Directory
                            && meta.permits(&invocation.user, Access::Execute) =>
                    {
                        home
                    }
                    _ => "/".to_string(),
                }
            }
        };
        invocation.world().set_cwd(&target);
        Ok(CommandAction::done(ExecOutcome::ok("")))
    }
}
