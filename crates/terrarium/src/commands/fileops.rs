//! File manipulation commands: `mkdir`, `touch`, `rm`, `mv`, `cp`,
//! `chmod`, `chown`.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::exec::{
    ArgCount, CommandAction, CommandSpec, ExecOutcome, FlagSpec, Invocation, PathSpec,
};
use crate::vfs::Mode;

use super::Command;

static MKDIR_SPEC: CommandSpec = CommandSpec {
    name: "mkdir",
    summary: "create directories",
    usage: "mkdir [-p] DIR...",
    flags: &[FlagSpec {
        long: "parents",
        short: Some('p'),
        takes_value: false,
    }],
    args: ArgCount::AtLeast(1),
    paths: &[PathSpec::any(0).rest()],
};

/// `mkdir` - creates directories; `-p` fills in missing ancestors and
/// tolerates existing ones.
pub struct Mkdir;

#[async_trait]
impl Command for Mkdir {
    fn spec(&self) -> &'static CommandSpec {
        &MKDIR_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let parents = invocation.has_flag("parents");
        for path in &invocation.paths {
            if parents {
                invocation.vfs().create_dir_all(&path.abs, &invocation.user)?;
            } else {
                invocation.vfs().create_dir(&path.abs, &invocation.user)?;
            }
        }
        Ok(CommandAction::done(ExecOutcome::ok("")))
    }
}

static TOUCH_SPEC: CommandSpec = CommandSpec {
    name: "touch",
    summary: "create empty files or refresh timestamps",
    usage: "touch FILE...",
    flags: &[],
    args: ArgCount::AtLeast(1),
    paths: &[PathSpec::any(0).rest()],
};

/// `touch` - empty file creation, or an mtime refresh for nodes that
/// already exist.
pub struct Touch;

#[async_trait]
impl Command for Touch {
    fn spec(&self) -> &'static CommandSpec {
        &TOUCH_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        for path in &invocation.paths {
            invocation.vfs().touch(&path.abs, &invocation.user)?;
        }
        Ok(CommandAction::done(ExecOutcome::ok("")))
    }
}

static RM_SPEC: CommandSpec = CommandSpec {
    name: "rm",
    summary: "delete files and directories",
    usage: "rm [-r] [-f] PATH...",
    flags: &[
        FlagSpec {
            long: "recursive",
            short: Some('r'),
            takes_value: false,
        },
        FlagSpec {
            long: "force",
            short: Some('f'),
            takes_value: false,
        },
    ],
    args: ArgCount::AtLeast(1),
    paths: &[PathSpec::any(0).rest()],
};

/// `rm` - deletes nodes. Directories need `-r`; `-f` swallows missing
/// targets and permission refusals but never a bare directory.
pub struct Rm;

#[async_trait]
impl Command for Rm {
    fn spec(&self) -> &'static CommandSpec {
        &RM_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let recursive = invocation.has_flag("recursive");
        let force = invocation.has_flag("force");
        for path in &invocation.paths {
            invocation
                .vfs()
                .remove(&path.abs, &invocation.user, recursive, force)?;
        }
        Ok(CommandAction::done(ExecOutcome::ok("")))
    }
}

static MV_SPEC: CommandSpec = CommandSpec {
    name: "mv",
    summary: "move or rename a node",
    usage: "mv SOURCE DEST",
    flags: &[],
    args: ArgCount::Exactly(2),
    paths: &[PathSpec::existing(0, &[]), PathSpec::any(1)],
};

/// `mv` - detaches the source and reattaches it at the destination,
/// keeping ownership and modes.
pub struct Mv;

#[async_trait]
impl Command for Mv {
    fn spec(&self) -> &'static CommandSpec {
        &MV_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let from = invocation.path_at(0).map(|p| p.abs.clone());
        let to = invocation.path_at(1).map(|p| p.abs.clone());
        let (Some(from), Some(to)) = (from, to) else {
            return Err(Error::Internal("mv: paths not resolved".to_string()));
        };
        invocation.vfs().rename(&from, &to, &invocation.user)?;
        Ok(CommandAction::done(ExecOutcome::ok("")))
    }
}

static CP_SPEC: CommandSpec = CommandSpec {
    name: "cp",
    summary: "copy a file or directory",
    usage: "cp [-r] SOURCE DEST",
    flags: &[FlagSpec {
        long: "recursive",
        short: Some('r'),
        takes_value: false,
    }],
    args: ArgCount::Exactly(2),
    paths: &[PathSpec::existing(0, &[]), PathSpec::any(1)],
};

/// `cp` - duplicates a node; the copy belongs to the acting user.
pub struct Cp;

#[async_trait]
impl Command for Cp {
    fn spec(&self) -> &'static CommandSpec {
        &CP_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let from = invocation.path_at(0).map(|p| p.abs.clone());
        let to = invocation.path_at(1).map(|p| p.abs.clone());
        let (Some(from), Some(to)) = (from, to) else {
            return Err(Error::Internal("cp: paths not resolved".to_string()));
        };
        let recursive = invocation.has_flag("recursive");
        invocation
            .vfs()
            .copy(&from, &to, &invocation.user, recursive)?;
        Ok(CommandAction::done(ExecOutcome::ok("")))
    }
}

static CHMOD_SPEC: CommandSpec = CommandSpec {
    name: "chmod",
    summary: "change a node's permission mode",
    usage: "chmod MODE PATH",
    flags: &[],
    args: ArgCount::Exactly(2),
    paths: &[PathSpec::existing(1, &[])],
};

/// `chmod` - sets the two-digit octal mode (owner class, other class).
/// Only the owner and root may.
pub struct Chmod;

#[async_trait]
impl Command for Chmod {
    fn spec(&self) -> &'static CommandSpec {
        &CHMOD_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let text = &invocation.args[0];
        let Some(mode) = Mode::parse(text) else {
            return Err(Error::validation("chmod", format!("invalid mode: {text}")));
        };
        let Some(path) = invocation.path_at(1) else {
            return Err(Error::Internal("chmod: path not resolved".to_string()));
        };
        invocation.vfs().chmod(&path.abs, &invocation.user, mode)?;
        Ok(CommandAction::done(ExecOutcome::ok("")))
    }
}

static CHOWN_SPEC: CommandSpec = CommandSpec {
    name: "chown",
    summary: "change a node's owner",
    usage: "chown USER PATH",
    flags: &[],
    args: ArgCount::Exactly(2),
    paths: &[PathSpec::existing(1, &[])],
};

/// `chown` - reassigns ownership to a registered user. Root only.
pub struct Chown;

#[async_trait]
impl Command for Chown {
    fn spec(&self) -> &'static CommandSpec {
        &CHOWN_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let owner = &invocation.args[0];
        if !invocation.users().exists(owner) {
            return Err(Error::validation("chown", format!("no such user: {owner}")));
        }
        let Some(path) = invocation.path_at(1) else {
            return Err(Error::Internal("chown: path not resolved".to_string()));
        };
        invocation
            .vfs()
            .chown(&path.abs, &invocation.user, owner)?;
        Ok(CommandAction::done(ExecOutcome::ok("")))
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::testing::{run_err, run_ok, sandbox};

    #[tokio::test]
    async fn mkdir_touch_and_remove() {
        let exec = sandbox();
        run_ok(&exec, "mkdir work").await;
        run_ok(&exec, "touch work/todo.txt").await;
        assert!(run_ok(&exec, "ls work").await.contains("todo.txt"));
        run_ok(&exec, "rm work/todo.txt").await;
        assert_eq!(run_ok(&exec, "ls work").await, "");
    }

    #[tokio::test]
    async fn mkdir_refuses_to_clobber() {
        let exec = sandbox();
        run_ok(&exec, "mkdir work").await;
        assert_eq!(
            run_err(&exec, "mkdir work").await,
            "mkdir: file exists: /home/guest/work"
        );
        run_ok(&exec, "mkdir -p work/a/b").await;
        assert!(run_ok(&exec, "ls work/a").await.contains("b"));
    }

    #[tokio::test]
    async fn rm_directory_needs_recursive() {
        let exec = sandbox();
        run_ok(&exec, "mkdir keep").await;
        assert_eq!(run_err(&exec, "rm keep").await, "rm: is a directory: /home/guest/keep");
        run_ok(&exec, "rm -r keep").await;
        assert_eq!(run_err(&exec, "ls keep").await, "ls: no such file or directory: keep");
    }

    #[tokio::test]
    async fn rm_force_swallows_missing_targets() {
        let exec = sandbox();
        run_ok(&exec, "rm -f ghost.txt").await;
        assert_eq!(
            run_err(&exec, "rm ghost.txt").await,
            "rm: no such file or directory: /home/guest/ghost.txt"
        );
    }

    #[tokio::test]
    async fn mv_renames_and_cp_duplicates() {
        let exec = sandbox();
        run_ok(&exec, "echo data > a.txt").await;
        run_ok(&exec, "mv a.txt b.txt").await;
        assert_eq!(run_ok(&exec, "cat b.txt").await, "data\n");
        assert_eq!(
            run_err(&exec, "cat a.txt").await,
            "cat: no such file or directory: a.txt"
        );
        run_ok(&exec, "cp b.txt c.txt").await;
        assert_eq!(run_ok(&exec, "cat c.txt").await, "data\n");
        assert_eq!(run_ok(&exec, "cat b.txt").await, "data\n");
    }

    #[tokio::test]
    async fn cp_directory_needs_recursive() {
        let exec = sandbox();
        run_ok(&exec, "mkdir src").await;
        run_ok(&exec, "echo x > src/f.txt").await;
        assert_eq!(run_err(&exec, "cp src dst").await, "cp: is a directory: /home/guest/src");
        run_ok(&exec, "cp -r src dst").await;
        assert_eq!(run_ok(&exec, "cat dst/f.txt").await, "x\n");
    }

    #[tokio::test]
    async fn chmod_validates_the_mode_text() {
        let exec = sandbox();
        run_ok(&exec, "touch guarded.txt").await;
        run_ok(&exec, "chmod 60 guarded.txt").await;
        assert!(run_ok(&exec, "ls -l").await.contains("rw-------"));
        assert_eq!(run_err(&exec, "chmod 99 guarded.txt").await, "chmod: invalid mode: 99");
        assert_eq!(run_err(&exec, "chmod rwx guarded.txt").await, "chmod: invalid mode: rwx");
    }

    #[tokio::test]
    async fn chown_requires_root_and_a_known_user() {
        let exec = sandbox();
        run_ok(&exec, "touch mine.txt").await;
        assert_eq!(
            run_err(&exec, "chown nobody mine.txt").await,
            "chown: no such user: nobody"
        );
        assert_eq!(
            run_err(&exec, "chown root mine.txt").await,
            "chown: permission denied: /home/guest/mine.txt"
        );
    }
}
