//! Execution-control commands: `run`, `jobs`, `delay`.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::exec::{
    ArgCount, CommandAction, CommandSpec, ExecOutcome, Invocation, PathSpec,
};
use crate::vfs::Access;

use super::Command;

static RUN_SPEC: CommandSpec = CommandSpec {
    name: "run",
    summary: "execute a script file line by line",
    usage: "run SCRIPT [ARG...]",
    flags: &[],
    args: ArgCount::AtLeast(1),
    paths: &[PathSpec::existing_file(0, &[Access::Read, Access::Execute])],
};

/// `run` - executes a script: comments stripped, `$1..$n`, `$@` and
/// `$#` substituted, first failing line aborts the rest. The file
/// needs both read and execute permission.
pub struct Run;

#[async_trait]
impl Command for Run {
    fn spec(&self) -> &'static CommandSpec {
        &RUN_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let Some(path) = invocation.path_at(0) else {
            return Err(Error::Internal("run: path not resolved".to_string()));
        };
        let source = invocation.vfs().read_file(&path.abs, &invocation.user)?;
        let args = invocation.args[1..].to_vec();
        let outcome = invocation.exec.run_script(&source, &args).await?;
        Ok(CommandAction::done(outcome))
    }
}

static JOBS_SPEC: CommandSpec = CommandSpec {
    name: "jobs",
    summary: "list background jobs",
    usage: "jobs",
    flags: &[],
    args: ArgCount::Exactly(0),
    paths: &[],
};

/// `jobs` - every job this environment has started, id order.
pub struct Jobs;

#[async_trait]
impl Command for Jobs {
    fn spec(&self) -> &'static CommandSpec {
        &JOBS_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let table = invocation.world().jobs.lock().await;
        let mut listing = String::new();
        for job in table.list() {
            listing.push_str(&format!("[{}] {:<8} {}\n", job.id, job.state, job.line));
        }
        Ok(CommandAction::done(ExecOutcome::ok(listing)))
    }
}

static DELAY_SPEC: CommandSpec = CommandSpec {
    name: "delay",
    summary: "wait for a number of milliseconds",
    usage: "delay MILLISECONDS",
    flags: &[],
    args: ArgCount::Exactly(1),
    paths: &[],
};

/// `delay` - a timed pause, mostly useful with `&`.
pub struct Delay;

#[async_trait]
impl Command for Delay {
    fn spec(&self) -> &'static CommandSpec {
        &DELAY_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let text = &invocation.args[0];
        let millis: u64 = text
            .parse()
            .map_err(|_| Error::validation("delay", format!("invalid duration: {text}")))?;
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(CommandAction::done(ExecOutcome::ok("")))
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::testing::{run_err, run_ok, sandbox};
    use crate::exec::JobState;

    #[tokio::test]
    async fn scripts_run_line_by_line() {
        let exec = sandbox();
        run_ok(&exec, "echo \"mkdir out\" > build.sh").await;
        run_ok(&exec, "echo \"echo made $1 > out/result.txt\" >> build.sh").await;
        run_ok(&exec, "chmod 74 build.sh").await;
        run_ok(&exec, "run build.sh widget").await;
        assert_eq!(run_ok(&exec, "cat out/result.txt").await, "made widget\n");
    }

    #[tokio::test]
    async fn scripts_need_execute_permission() {
        let exec = sandbox();
        run_ok(&exec, "echo \"echo hi\" > plain.sh").await;
        assert_eq!(
            run_err(&exec, "run plain.sh").await,
            "run: permission denied: plain.sh"
        );
    }

    #[tokio::test]
    async fn script_failure_names_the_line() {
        let exec = sandbox();
        run_ok(&exec, "echo \"echo first\" > bad.sh").await;
        run_ok(&exec, "echo \"cat missing.txt\" >> bad.sh").await;
        run_ok(&exec, "echo \"echo never\" >> bad.sh").await;
        run_ok(&exec, "chmod 74 bad.sh").await;
        assert_eq!(
            run_err(&exec, "run bad.sh").await,
            "run: line 2: cat: no such file or directory: missing.txt"
        );
    }

    #[tokio::test]
    async fn jobs_lists_started_pipelines() {
        let exec = sandbox();
        run_ok(&exec, "delay 5 &").await;
        run_ok(&exec, "delay 5 &").await;
        let listing = run_ok(&exec, "jobs").await;
        assert!(listing.contains("[1]"));
        assert!(listing.contains("[2]"));
        assert!(listing.contains("delay 5 &"));

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let table = exec.world.jobs.lock().await;
        assert!(table.list().iter().all(|job| job.state == JobState::Done));
    }

    #[tokio::test]
    async fn delay_validates_its_argument() {
        let exec = sandbox();
        assert_eq!(
            run_err(&exec, "delay soon").await,
            "delay: invalid duration: soon"
        );
    }
}
