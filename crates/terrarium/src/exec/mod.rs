//! Pipeline execution.
//!
//! The executor turns a parsed [`Pipeline`] into effects: it validates
//! each segment against its command contract, threads output into the
//! next segment's input, applies trailing redirection, spawns
//! background jobs, and persists the tree after successful runs.
//! Commands that need an answer from the user (passwords, load
//! confirmation) suspend into a pending prompt that must be resolved
//! before ordinary input is accepted again.

pub mod contract;
pub mod context;
pub mod jobs;
pub mod outcome;
pub mod prompt;
pub(crate) mod script;

use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

pub use contract::{ArgCount, CommandSpec, FlagSpec, PathSpec, ResolvedPath};
pub use context::Invocation;
pub use jobs::{Job, JobState, JobTable, SharedJobTable};
pub use outcome::{DisplayStyle, ExecOutcome};
pub use prompt::PromptRequest;

pub(crate) use context::World;
pub(crate) use prompt::{PendingAction, PendingPrompt};

use crate::commands::Registry;
use crate::error::{Error, Result};
use crate::session::users::home_dir;
use crate::session::{Snapshot, SnapshotKind};
use crate::shell::{self, Pipeline, RedirectMode, Segment};
use crate::vfs::path;

/// What a command handler produced: either a finished outcome, or a
/// request to ask the user something before finishing.
pub struct CommandAction {
    pub(crate) inner: ActionInner,
}

pub(crate) enum ActionInner {
    Done(ExecOutcome),
    Prompt(PromptRequest, PendingAction),
}

impl CommandAction {
    pub fn done(outcome: ExecOutcome) -> CommandAction {
        CommandAction {
            inner: ActionInner::Done(outcome),
        }
    }

    pub(crate) fn prompt(request: PromptRequest, action: PendingAction) -> CommandAction {
        CommandAction {
            inner: ActionInner::Prompt(request, action),
        }
    }
}

/// A failed line: the error plus the segment it came from, so the
/// surfaced message can carry the command name.
#[derive(Debug)]
pub(crate) struct LineFailure {
    pub command: Option<String>,
    pub error: Error,
}

impl LineFailure {
    pub(crate) fn bare(error: Error) -> LineFailure {
        LineFailure {
            command: None,
            error,
        }
    }

    pub(crate) fn in_command(command: &str, error: Error) -> LineFailure {
        LineFailure {
            command: Some(command.to_string()),
            error,
        }
    }

    /// One-line message. Errors that already name their command (or
    /// name no command at all) are not prefixed again.
    pub(crate) fn render(&self) -> String {
        match (&self.command, &self.error) {
            (Some(_), Error::Validation { .. })
            | (Some(_), Error::UnknownCommand(_))
            | (None, _) => self.error.to_string(),
            (Some(command), error) => format!("{command}: {error}"),
        }
    }
}

/// What running one input line produced.
pub(crate) enum LineEvent {
    /// Blank line; nothing ran.
    Idle,
    /// The pipeline finished with this outcome.
    Finished(ExecOutcome),
    /// A command suspended on a question; answer via
    /// [`Executor::resolve_prompt`].
    Asked(PromptRequest),
}

/// Executes parsed lines against a shared [`World`]. Cloning is cheap
/// and clones share all state, including the pending prompt slot.
#[derive(Clone)]
pub struct Executor {
    pub(crate) world: World,
    registry: Arc<Registry>,
    pending: Arc<RwLock<Option<PendingPrompt>>>,
}

impl Executor {
    pub(crate) fn new(world: World, registry: Registry) -> Executor {
        Executor {
            world,
            registry: Arc::new(registry),
            pending: Arc::new(RwLock::new(None)),
        }
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.pending.read().unwrap().is_some()
    }

    pub(crate) fn pending_request(&self) -> Option<PromptRequest> {
        self.pending
            .read()
            .unwrap()
            .as_ref()
            .map(|p| p.request.clone())
    }

    /// Parse and run one input line.
    pub(crate) async fn run_line(
        &self,
        line: &str,
        in_script: bool,
    ) -> std::result::Result<LineEvent, LineFailure> {
        let pipelines = shell::parse_line(line).map_err(LineFailure::bare)?;
        let Some(pipeline) = pipelines.into_iter().next() else {
            return Ok(LineEvent::Idle);
        };
        if pipeline.background {
            let id = self.spawn_background(pipeline, line).await;
            return Ok(LineEvent::Finished(ExecOutcome::notice(format!(
                "[{id}] {}\n",
                line.trim()
            ))));
        }
        self.run_pipeline(&pipeline, !in_script).await
    }

    /// Run a pipeline to completion in the caller's task. `may_prompt`
    /// admits prompts only where an answer can actually arrive:
    /// further narrowed to single-segment, unredirected pipelines.
    async fn run_pipeline(
        &self,
        pipeline: &Pipeline,
        may_prompt: bool,
    ) -> std::result::Result<LineEvent, LineFailure> {
        let interactive =
            may_prompt && pipeline.segments.len() == 1 && pipeline.redirect.is_none();
        let mut carried: Option<String> = None;
        let mut outcome = ExecOutcome::ok("");
        for segment in &pipeline.segments {
            let action = self
                .run_segment(segment, carried.take(), interactive)
                .await
                .map_err(|error| match &error {
                    Error::UnknownCommand(_) => LineFailure::bare(error),
                    _ => LineFailure::in_command(&segment.name, error),
                })?;
            match action.inner {
                ActionInner::Done(done) => {
                    carried = Some(done.output.clone());
                    outcome = done;
                }
                ActionInner::Prompt(request, action) => {
                    *self.pending.write().unwrap() = Some(PendingPrompt {
                        request: request.clone(),
                        action,
                    });
                    return Ok(LineEvent::Asked(request));
                }
            }
        }
        if let Some(redirect) = &pipeline.redirect {
            let last = pipeline.segments.last().map(|s| s.name.as_str());
            self.write_redirect(redirect, &outcome.output)
                .await
                .map_err(|error| match last {
                    Some(name) => LineFailure::in_command(name, error),
                    None => LineFailure::bare(error),
                })?;
            outcome = ExecOutcome::ok("");
        }
        self.persist_tree(pipeline).await?;
        Ok(LineEvent::Finished(outcome))
    }

    async fn run_segment(
        &self,
        segment: &Segment,
        stdin: Option<String>,
        interactive: bool,
    ) -> Result<CommandAction> {
        let Some(command) = self.registry.get(&segment.name) else {
            return Err(Error::UnknownCommand(segment.name.clone()));
        };
        let spec = command.spec();
        let parsed = contract::parse_args(spec, &segment.args)?;
        contract::check_count(spec, &parsed.positionals)?;
        let user = self.world.users.current();
        let cwd = self.world.cwd();
        let paths = contract::resolve_paths(spec, &parsed.positionals, &self.world.vfs, &cwd, &user)?;
        debug!(command = spec.name, user = %user, "running segment");
        let invocation = Invocation {
            exec: self.clone(),
            user,
            cwd,
            args: parsed.positionals,
            flags: parsed.flags,
            paths,
            stdin,
            interactive,
        };
        command.run(invocation).await
    }

    /// Write the final output into the redirect target, creating
    /// missing parents and the file itself.
    async fn write_redirect(&self, redirect: &shell::Redirect, output: &str) -> Result<()> {
        let user = self.world.users.current();
        let abs = path::resolve(&redirect.target, &self.world.cwd());
        if let Some(parent) = path::parent(&abs) {
            self.world.vfs.create_dir_all(&parent, &user)?;
        }
        let append = redirect.mode == RedirectMode::Append;
        self.world.vfs.write_file(&abs, &user, output, append)
    }

    /// Persist the tree after a successful pipeline. A quota overflow
    /// here has already reverted the tree; surface it as the line's
    /// failure, attributed to the last segment.
    async fn persist_tree(&self, pipeline: &Pipeline) -> std::result::Result<(), LineFailure> {
        self.world
            .persist
            .save_tree(&self.world.vfs)
            .await
            .map_err(|error| match pipeline.segments.last() {
                Some(segment) => LineFailure::in_command(&segment.name, error),
                None => LineFailure::bare(error),
            })
    }

    /// Register and detach a background pipeline. The acknowledgment
    /// id is returned immediately; completion is reported through the
    /// notice queue and the screen.
    async fn spawn_background(&self, pipeline: Pipeline, line: &str) -> u64 {
        let line = line.trim().to_string();
        let id = self.world.jobs.lock().await.register(&line);
        let exec = self.clone();
        let detached = Pipeline {
            background: false,
            ..pipeline
        };
        tokio::spawn(async move {
            let result = exec.run_pipeline(&detached, false).await;
            let mut jobs = exec.world.jobs.lock().await;
            match result {
                Ok(LineEvent::Finished(outcome)) => {
                    if !outcome.output.is_empty() {
                        jobs.push_notice(outcome.output.clone());
                        exec.world.screen_push(&outcome.output);
                    }
                    jobs.mark(id, JobState::Done);
                    let notice = format!("[{id}] done: {line}");
                    jobs.push_notice(notice.clone());
                    exec.world.screen_push(&notice);
                }
                Ok(_) => {
                    // Background pipelines cannot prompt or be blank.
                    jobs.mark(id, JobState::Failed);
                    warn!(id, "background pipeline ended in an impossible state");
                }
                Err(failure) => {
                    jobs.mark(id, JobState::Failed);
                    let rendered = failure.render();
                    warn!(id, error = %rendered, "background job failed");
                    let notice = format!("[{id}] failed: {line}: {rendered}");
                    jobs.push_notice(notice.clone());
                    exec.world.screen_push(&notice);
                }
            }
        });
        id
    }

    /// Answer the outstanding prompt.
    pub(crate) async fn resolve_prompt(
        &self,
        answer: &str,
    ) -> std::result::Result<ExecOutcome, LineFailure> {
        let Some(pending) = self.pending.write().unwrap().take() else {
            return Err(LineFailure::bare(Error::Internal(
                "no prompt is awaiting an answer".to_string(),
            )));
        };
        match pending.action {
            PendingAction::LoginPassword { user } => {
                if !self.world.users.verify(&user, answer) {
                    return Err(LineFailure::bare(Error::validation(
                        "login",
                        "incorrect password",
                    )));
                }
                self.switch_user(&user)
                    .await
                    .map_err(|e| LineFailure::in_command("login", e))?;
                Ok(ExecOutcome::ok(format!("logged in as {user}\n")))
            }
            PendingAction::NewPassword { user } => {
                if answer.is_empty() {
                    return Ok(ExecOutcome::notice("password unchanged\n"));
                }
                self.world.users.set_password(&user, Some(answer));
                self.world
                    .persist
                    .save_credentials(&self.world.users)
                    .await
                    .map_err(|e| LineFailure::in_command("passwd", e))?;
                Ok(ExecOutcome::ok(format!("password updated for {user}\n")))
            }
            PendingAction::ConfirmLoad => {
                let confirmed = matches!(answer.trim().to_lowercase().as_str(), "y" | "yes");
                if !confirmed {
                    return Ok(ExecOutcome::notice("load cancelled\n"));
                }
                self.restore_saved_session()
                    .await
                    .map_err(|e| LineFailure::in_command("load", e))?;
                Ok(ExecOutcome::notice("session restored\n"))
            }
        }
    }

    /// Replace the live terminal state and tree with the current
    /// user's manual snapshot, then persist the restored tree.
    async fn restore_saved_session(&self) -> Result<()> {
        let user = self.world.users.current();
        let Some(snapshot) = self
            .world
            .sessions
            .load(&user, SnapshotKind::Manual)
            .await?
        else {
            return Err(Error::validation("load", "no saved session"));
        };
        self.world.set_cwd(&snapshot.cwd);
        self.world.set_screen(snapshot.screen);
        self.world.set_history(snapshot.history);
        if let Some(tree) = snapshot.tree {
            self.world.vfs.restore(tree);
        }
        info!(user = %user, "restored saved session");
        self.world.persist.save_tree(&self.world.vfs).await
    }

    /// Switch the active user: snapshot the outgoing user's terminal
    /// state, then restore the incoming user's, or initialize a fresh
    /// one at their home directory.
    pub(crate) async fn switch_user(&self, target: &str) -> Result<()> {
        let current = self.world.users.current();
        let leaving = Snapshot::new(
            self.world.cwd(),
            self.world.screen_lines(),
            self.world.history_lines(),
        );
        self.world
            .sessions
            .save(&current, SnapshotKind::Auto, &leaving)
            .await?;
        self.world.users.set_current(target);
        match self.world.sessions.load(target, SnapshotKind::Auto).await? {
            Some(snapshot) => {
                let cwd = if self.world.vfs.exists(&snapshot.cwd, target) {
                    snapshot.cwd
                } else {
                    self.fallback_cwd(target)
                };
                self.world.set_cwd(&cwd);
                self.world.set_screen(snapshot.screen);
                self.world.set_history(snapshot.history);
            }
            None => {
                self.world.set_cwd(&self.fallback_cwd(target));
                self.world.screen_clear();
                self.world.set_history(Vec::new());
            }
        }
        info!(from = %current, to = %target, "switched user");
        Ok(())
    }

    fn fallback_cwd(&self, user: &str) -> String {
        let home = home_dir(user);
        if self.world.vfs.exists(&home, user) {
            home
        } else {
            "/".to_string()
        }
    }

    /// Run a script's lines in order, stopping at the first failure.
    /// Only one script may run at a time.
    pub(crate) async fn run_script(&self, source: &str, args: &[String]) -> Result<ExecOutcome> {
        let Some(_guard) = script::ScriptGuard::acquire(&self.world.script_running) else {
            return Err(Error::validation("run", "a script is already running"));
        };
        let mut outputs = Vec::new();
        for (index, raw) in source.lines().enumerate() {
            let stripped = script::strip_comment(raw);
            let line = script::substitute_args(stripped, args);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match self.run_line(line, true).await {
                Ok(LineEvent::Idle) => {}
                Ok(LineEvent::Finished(outcome)) => {
                    if !outcome.output.is_empty() {
                        outputs.push(outcome.output.trim_end_matches('\n').to_string());
                    }
                }
                Ok(LineEvent::Asked(_)) => {
                    return Err(Error::Internal(format!(
                        "script line {} raised a prompt",
                        index + 1
                    )));
                }
                Err(failure) => {
                    return Err(Error::validation(
                        "run",
                        format!("line {}: {}", index + 1, failure.render()),
                    ));
                }
            }
        }
        if outputs.is_empty() {
            Ok(ExecOutcome::ok(""))
        } else {
            Ok(ExecOutcome::ok(format!("{}\n", outputs.join("\n"))))
        }
    }
}
