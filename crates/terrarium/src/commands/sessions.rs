//! Session commands: `save` and `load`.
//!
//! `save` captures the whole working state - directory, screen,
//! history, and a deep copy of the tree - under the active user.
//! `load` puts it back, but only after an explicit confirmation,
//! because it discards everything done since the save.

use async_trait::async_trait;
use tracing::info;

use crate::error::{Error, Result};
use crate::exec::{
    ArgCount, CommandAction, CommandSpec, ExecOutcome, Invocation, PendingAction, PromptRequest,
};
use crate::session::{Snapshot, SnapshotKind};

use super::Command;

static SAVE_SPEC: CommandSpec = CommandSpec {
    name: "save",
    summary: "save the session and the whole tree",
    usage: "save",
    flags: &[],
    args: ArgCount::Exactly(0),
    paths: &[],
};

/// `save` - manual snapshot, tree included.
pub struct Save;

#[async_trait]
impl Command for Save {
    fn spec(&self) -> &'static CommandSpec {
        &SAVE_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let world = invocation.world();
        let snapshot = Snapshot::new(
            world.cwd(),
            world.screen_lines(),
            world.history_lines(),
        )
        .with_tree(world.vfs.snapshot());
        world
            .sessions
            .save(&invocation.user, SnapshotKind::Manual, &snapshot)
            .await?;
        info!(user = %invocation.user, "session saved");
        Ok(CommandAction::done(ExecOutcome::ok("session saved\n")))
    }
}

static LOAD_SPEC: CommandSpec = CommandSpec {
    name: "load",
    summary: "restore the last saved session",
    usage: "load",
    flags: &[],
    args: ArgCount::Exactly(0),
    paths: &[],
};

/// `load` - asks before replacing the live state with the saved one.
pub struct Load;

#[async_trait]
impl Command for Load {
    fn spec(&self) -> &'static CommandSpec {
        &LOAD_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let world = invocation.world();
        let saved = world
            .sessions
            .load(&invocation.user, SnapshotKind::Manual)
            .await?;
        if saved.is_none() {
            return Err(Error::validation("load", "no saved session"));
        }
        if !invocation.interactive {
            return Err(Error::validation("load", "requires an interactive prompt"));
        }
        Ok(CommandAction::prompt(
            PromptRequest::visible("restore saved session? [y/N] "),
            PendingAction::ConfirmLoad,
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::testing::{run_err, run_ok, run_prompt, sandbox};

    #[tokio::test]
    async fn load_without_a_save_is_refused() {
        let exec = sandbox();
        assert_eq!(run_err(&exec, "load").await, "load: no saved session");
    }

    #[tokio::test]
    async fn save_and_confirmed_load_round_trip() {
        let exec = sandbox();
        run_ok(&exec, "echo important > keep.txt").await;
        run_ok(&exec, "save").await;
        run_ok(&exec, "rm keep.txt").await;
        assert_eq!(
            run_err(&exec, "cat keep.txt").await,
            "cat: no such file or directory: keep.txt"
        );

        let message = run_prompt(&exec, "load").await;
        assert_eq!(message, "restore saved session? [y/N] ");
        let outcome = exec.resolve_prompt("y").await.unwrap();
        assert_eq!(outcome.output, "session restored\n");
        assert_eq!(run_ok(&exec, "cat keep.txt").await, "important\n");
    }

    #[tokio::test]
    async fn declining_the_load_changes_nothing() {
        let exec = sandbox();
        run_ok(&exec, "echo v1 > state.txt").await;
        run_ok(&exec, "save").await;
        run_ok(&exec, "echo v2 > state.txt").await;

        run_prompt(&exec, "load").await;
        let outcome = exec.resolve_prompt("n").await.unwrap();
        assert_eq!(outcome.output, "load cancelled\n");
        assert_eq!(run_ok(&exec, "cat state.txt").await, "v2\n");
    }

    #[tokio::test]
    async fn snapshot_is_independent_of_later_edits() {
        let exec = sandbox();
        run_ok(&exec, "echo original > doc.txt").await;
        run_ok(&exec, "save").await;
        run_ok(&exec, "echo rewritten > doc.txt").await;
        run_ok(&exec, "echo extra > new.txt").await;

        run_prompt(&exec, "load").await;
        exec.resolve_prompt("yes").await.unwrap();
        assert_eq!(run_ok(&exec, "cat doc.txt").await, "original\n");
        assert_eq!(
            run_err(&exec, "cat new.txt").await,
            "cat: no such file or directory: new.txt"
        );
    }
}
