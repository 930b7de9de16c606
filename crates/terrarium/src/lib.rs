//! Terrarium - a self-contained simulated operating environment.
//!
//! A hierarchical virtual filesystem with owner/other permissions, a
//! line-oriented shell with pipelines, redirection and background
//! jobs, and a multi-user session layer, all persisted atomically to a
//! pluggable backing store.
//!
//! # Example
//!
//! ```
//! use terrarium::{Submission, Terrarium};
//!
//! # tokio_test::block_on(async {
//! let terra = Terrarium::new().await.unwrap();
//!
//! let submission = terra.submit("echo hello > greeting.txt").await.unwrap();
//! assert!(matches!(submission, Submission::Done(outcome) if outcome.ok));
//!
//! match terra.submit("cat greeting.txt").await.unwrap() {
//!     Submission::Done(outcome) => assert_eq!(outcome.output, "hello\n"),
//!     Submission::Prompt(_) => unreachable!(),
//! }
//! # });
//! ```
//!
//! Commands that need an answer - passwords, the `load` confirmation -
//! come back as [`Submission::Prompt`]; feed the reply to
//! [`Terrarium::respond`]. Everything else resolves to
//! [`Submission::Done`].

pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod session;
pub mod shell;
pub mod store;
pub mod vfs;

pub use async_trait::async_trait;
pub use commands::{Command, Registry};
pub use config::Config;
pub use error::{Error, PathError, PersistenceError, Result};
pub use exec::{
    ArgCount, CommandAction, CommandSpec, DisplayStyle, ExecOutcome, FlagSpec, Invocation,
    PathSpec, PromptRequest,
};
pub use store::{JsonFileStore, MemoryStore, StateStore};

use std::sync::atomic::Ordering;
use std::sync::Arc;

use exec::{Executor, LineEvent, World};
use session::users::{home_dir, GUEST, SUPERUSER};
use store::DEFAULT_QUOTA_BYTES;
use vfs::{Mode, Vfs};

/// Lay down the directories a fresh environment starts with: homes for
/// the built-in users and a world-writable `/tmp`.
pub(crate) fn seed_tree(vfs: &Vfs) -> Result<()> {
    vfs.create_dir_all(&home_dir(GUEST), SUPERUSER)?;
    vfs.create_dir(&home_dir(SUPERUSER), SUPERUSER)?;
    vfs.chown(&home_dir(GUEST), SUPERUSER, GUEST)?;
    vfs.create_dir("/tmp", SUPERUSER)?;
    vfs.chmod("/tmp", SUPERUSER, Mode::SHARED)?;
    Ok(())
}

/// What one submitted line turned into.
pub enum Submission {
    /// The line ran to completion; failures arrive here too, as
    /// outcomes with `ok == false` and the message in `output`.
    Done(ExecOutcome),
    /// A command wants an answer before it finishes. Pass the reply to
    /// [`Terrarium::respond`]; until then ordinary input is refused.
    Prompt(PromptRequest),
}

/// Main entry point: one simulated environment.
///
/// All state lives behind shared handles, so `Terrarium` is cheap to
/// clone and safe to share; clones observe the same environment.
#[derive(Clone)]
pub struct Terrarium {
    exec: Executor,
}

impl Terrarium {
    /// A fresh in-memory environment with default settings.
    pub async fn new() -> Result<Terrarium> {
        TerrariumBuilder::new().build().await
    }

    pub fn builder() -> TerrariumBuilder {
        TerrariumBuilder::new()
    }

    /// Submit one command line.
    ///
    /// Refused with an error while a prompt is outstanding or a script
    /// is running; those are host-protocol misuses, not command
    /// failures. Command failures come back as [`Submission::Done`]
    /// with a failed outcome.
    pub async fn submit(&self, line: &str) -> Result<Submission> {
        if self.exec.has_pending() {
            return Err(Error::validation("shell", "a prompt awaits an answer"));
        }
        if self.exec.world.script_running.load(Ordering::SeqCst) {
            return Err(Error::validation("shell", "a script is still running"));
        }
        let trimmed = line.trim();
        self.exec
            .world
            .screen_push(&format!("{}{trimmed}", self.prompt()));
        if !trimmed.is_empty() {
            self.exec.world.history_push(trimmed);
        }
        match self.exec.run_line(trimmed, false).await {
            Ok(LineEvent::Idle) => Ok(Submission::Done(ExecOutcome::ok(""))),
            Ok(LineEvent::Finished(outcome)) => {
                if !outcome.output.is_empty() {
                    self.exec.world.screen_push(&outcome.output);
                }
                Ok(Submission::Done(outcome))
            }
            Ok(LineEvent::Asked(request)) => {
                self.exec.world.screen_push(&request.message);
                Ok(Submission::Prompt(request))
            }
            Err(failure) => {
                let message = failure.render();
                self.exec.world.screen_push(&message);
                Ok(Submission::Done(ExecOutcome::failure(message)))
            }
        }
    }

    /// Answer the outstanding prompt. Hidden-input answers are kept
    /// off the screen and out of the history.
    pub async fn respond(&self, answer: &str) -> Result<ExecOutcome> {
        let Some(request) = self.exec.pending_request() else {
            return Err(Error::validation("shell", "no prompt is waiting"));
        };
        if request.echo {
            self.exec.world.screen_push(answer);
        }
        match self.exec.resolve_prompt(answer).await {
            Ok(outcome) => {
                if !outcome.output.is_empty() {
                    self.exec.world.screen_push(&outcome.output);
                }
                Ok(outcome)
            }
            Err(failure) => {
                let message = failure.render();
                self.exec.world.screen_push(&message);
                Ok(ExecOutcome::failure(message))
            }
        }
    }

    /// True while a prompt from the last submission is unanswered.
    pub fn awaiting_input(&self) -> bool {
        self.exec.has_pending()
    }

    /// The outstanding prompt, when there is one.
    pub fn prompt_request(&self) -> Option<PromptRequest> {
        self.exec.pending_request()
    }

    /// The shell prompt for the current user and directory.
    pub fn prompt(&self) -> String {
        self.exec
            .world
            .config
            .prompt(&self.exec.world.users.current(), &self.exec.world.cwd())
    }

    /// Drain queued background-job notices, oldest first.
    pub async fn take_notices(&self) -> Vec<String> {
        self.exec.world.jobs.lock().await.take_notices()
    }

    pub fn current_user(&self) -> String {
        self.exec.world.users.current()
    }

    pub fn cwd(&self) -> String {
        self.exec.world.cwd()
    }

    /// The terminal transcript, one line per entry.
    pub fn screen(&self) -> Vec<String> {
        self.exec.world.screen_lines()
    }

    pub fn config(&self) -> &Config {
        &self.exec.world.config
    }

    /// Direct access to the tree, for hosts that seed or inspect files
    /// around the shell.
    pub fn vfs(&self) -> &Vfs {
        &self.exec.world.vfs
    }
}

/// Builder for a customized environment.
pub struct TerrariumBuilder {
    store: Option<Arc<dyn StateStore>>,
    quota: u64,
    config: Config,
    overlay: Option<String>,
    root_password: Option<String>,
    extra: Vec<Box<dyn Command>>,
}

impl Default for TerrariumBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TerrariumBuilder {
    pub fn new() -> TerrariumBuilder {
        TerrariumBuilder {
            store: None,
            quota: DEFAULT_QUOTA_BYTES,
            config: Config::default(),
            overlay: None,
            root_password: None,
            extra: Vec::new(),
        }
    }

    /// Use a custom backing store instead of a fresh in-memory one.
    pub fn store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Cap on the serialized tree size, in bytes.
    pub fn quota(mut self, bytes: u64) -> Self {
        self.quota = bytes;
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Apply a `key = value` overlay on top of the configuration.
    pub fn config_overlay(mut self, text: impl Into<String>) -> Self {
        self.overlay = Some(text.into());
        self
    }

    /// Give root a password. By default root, like every fresh
    /// account, has none and `login root` succeeds outright.
    pub fn root_password(mut self, password: impl Into<String>) -> Self {
        self.root_password = Some(password.into());
        self
    }

    /// Register an additional command, replacing any built-in with the
    /// same name.
    pub fn command(mut self, command: Box<dyn Command>) -> Self {
        self.extra.push(command);
        self
    }

    /// Build the environment: load persisted state when the store has
    /// any, seed a fresh tree otherwise, and boot into guest's home.
    pub async fn build(self) -> Result<Terrarium> {
        let mut config = self.config;
        if let Some(overlay) = &self.overlay {
            config.apply_overlay(overlay);
        }
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn StateStore>);
        let world = World::new(store, self.quota, config);

        if !world.persist.load_tree(&world.vfs).await? {
            seed_tree(&world.vfs)?;
        }
        world.persist.load_credentials(&world.users).await?;
        if let Some(password) = &self.root_password {
            world.users.set_password(SUPERUSER, Some(password.as_str()));
            world.persist.save_credentials(&world.users).await?;
        }
        // Baseline save: rollback always has a state to return to.
        world.persist.save_tree(&world.vfs).await?;

        let home = home_dir(GUEST);
        let boot_cwd = if world.vfs.exists(&home, GUEST) {
            home
        } else {
            "/".to_string()
        };
        world.set_cwd(&boot_cwd);
        if world.config.motd_enabled {
            let motd = world.config.motd_text.clone();
            world.screen_push(&motd);
        }

        let mut registry = Registry::with_defaults();
        for command in self.extra {
            registry.register(command);
        }
        Ok(Terrarium {
            exec: Executor::new(world, registry),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fresh() -> Terrarium {
        Terrarium::new().await.unwrap()
    }

    async fn done(terra: &Terrarium, line: &str) -> ExecOutcome {
        match terra.submit(line).await.unwrap() {
            Submission::Done(outcome) => outcome,
            Submission::Prompt(request) => panic!("unexpected prompt: {}", request.message),
        }
    }

    async fn prompted(terra: &Terrarium, line: &str) -> PromptRequest {
        match terra.submit(line).await.unwrap() {
            Submission::Prompt(request) => request,
            Submission::Done(outcome) => panic!("expected a prompt, got: {:?}", outcome.output),
        }
    }

    #[tokio::test]
    async fn echo_round_trip() {
        let terra = fresh().await;
        let outcome = done(&terra, "echo hello").await;
        assert!(outcome.ok);
        assert_eq!(outcome.output, "hello\n");
    }

    #[tokio::test]
    async fn boots_into_guest_home_with_motd() {
        let terra = fresh().await;
        assert_eq!(terra.current_user(), "guest");
        assert_eq!(terra.cwd(), "/home/guest");
        assert_eq!(terra.screen()[0], "welcome to terrarium");
        assert_eq!(terra.prompt(), "guest@terrarium:/home/guest$ ");
    }

    #[tokio::test]
    async fn pipeline_and_redirection_compose() {
        let terra = fresh().await;
        done(&terra, "echo one > list.txt").await;
        done(&terra, "echo two >> list.txt").await;
        let outcome = done(&terra, "cat list.txt | grep o | wc -l").await;
        assert_eq!(outcome.output, "       2\n");
    }

    #[tokio::test]
    async fn failures_come_back_as_failed_outcomes() {
        let terra = fresh().await;
        let outcome = done(&terra, "frobnicate now").await;
        assert!(!outcome.ok);
        assert_eq!(outcome.output, "command not found: frobnicate");
        assert_eq!(outcome.style, DisplayStyle::Error);

        let outcome = done(&terra, "echo 'unterminated").await;
        assert!(!outcome.ok);
        assert!(outcome.output.starts_with("lex error:"));
    }

    #[tokio::test]
    async fn screen_reads_like_a_terminal() {
        let terra = fresh().await;
        done(&terra, "echo visible").await;
        let screen = terra.screen();
        assert!(screen.contains(&"guest@terrarium:/home/guest$ echo visible".to_string()));
        assert!(screen.contains(&"visible".to_string()));
    }

    #[tokio::test]
    async fn prompt_blocks_ordinary_input_until_answered() {
        let terra = Terrarium::builder()
            .root_password("sesame")
            .build()
            .await
            .unwrap();
        let request = prompted(&terra, "login root").await;
        assert_eq!(request.message, "password for root: ");
        assert!(!request.echo);
        assert!(terra.awaiting_input());

        let refused = terra.submit("pwd").await;
        assert!(refused.is_err());

        let outcome = terra.respond("sesame").await.unwrap();
        assert_eq!(outcome.output, "logged in as root\n");
        assert_eq!(terra.current_user(), "root");
        assert!(!terra.awaiting_input());
    }

    #[tokio::test]
    async fn secrets_stay_out_of_history_and_screen() {
        let terra = Terrarium::builder()
            .root_password("sesame")
            .build()
            .await
            .unwrap();
        prompted(&terra, "login root").await;
        terra.respond("sesame").await.unwrap();
        let history = done(&terra, "history").await.output;
        assert!(history.contains("login root"));
        assert!(!history.contains("sesame"));
        assert!(!terra.screen().iter().any(|line| line.contains("sesame")));
    }

    #[tokio::test]
    async fn state_survives_a_rebuild_from_the_same_store() {
        let store = Arc::new(MemoryStore::new());
        {
            let terra = Terrarium::builder()
                .store(Arc::clone(&store) as Arc<dyn StateStore>)
                .build()
                .await
                .unwrap();
            done(&terra, "echo durable > /tmp/note.txt").await;
        }
        let terra = Terrarium::builder()
            .store(store as Arc<dyn StateStore>)
            .build()
            .await
            .unwrap();
        let outcome = done(&terra, "cat /tmp/note.txt").await;
        assert_eq!(outcome.output, "durable\n");
    }

    #[tokio::test]
    async fn credentials_survive_a_rebuild() {
        let store = Arc::new(MemoryStore::new());
        {
            let terra = Terrarium::builder()
                .store(Arc::clone(&store) as Arc<dyn StateStore>)
                .root_password("sesame")
                .build()
                .await
                .unwrap();
            done(&terra, "whoami").await;
        }
        let terra = Terrarium::builder()
            .store(store as Arc<dyn StateStore>)
            .build()
            .await
            .unwrap();
        let request = prompted(&terra, "login root").await;
        assert_eq!(request.message, "password for root: ");
        let outcome = terra.respond("sesame").await.unwrap();
        assert!(outcome.ok);
    }

    #[tokio::test]
    async fn quota_overflow_reverts_to_last_saved_state() {
        let terra = Terrarium::builder().quota(2_000).build().await.unwrap();
        done(&terra, "echo small > ok.txt").await;

        let line = format!("echo {} > big.txt", "x".repeat(4_000));
        let outcome = done(&terra, &line).await;
        assert!(!outcome.ok);
        assert!(outcome.output.contains("state quota exceeded"));

        let outcome = done(&terra, "cat big.txt").await;
        assert!(!outcome.ok);
        let outcome = done(&terra, "cat ok.txt").await;
        assert_eq!(outcome.output, "small\n");
    }

    #[tokio::test]
    async fn background_jobs_acknowledge_and_notify() {
        let terra = fresh().await;
        let outcome = done(&terra, "delay 5 &").await;
        assert_eq!(outcome.output, "[1] delay 5 &\n");
        assert_eq!(outcome.style, DisplayStyle::Notice);

        let outcome = done(&terra, "echo meanwhile").await;
        assert_eq!(outcome.output, "meanwhile\n");

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let notices = terra.take_notices().await;
        assert!(notices.iter().any(|n| n == "[1] done: delay 5 &"));
        assert!(terra.take_notices().await.is_empty());
    }

    #[tokio::test]
    async fn overlay_reshapes_the_prompt() {
        let terra = Terrarium::builder()
            .config_overlay("prompt.format = {user}:{cwd}> \nmotd.enabled = false\n")
            .build()
            .await
            .unwrap();
        assert_eq!(terra.prompt(), "guest:/home/guest> ");
        assert!(terra.screen().is_empty());
    }

    #[tokio::test]
    async fn custom_commands_join_the_registry() {
        struct Shout;

        static SHOUT_SPEC: CommandSpec = CommandSpec {
            name: "shout",
            summary: "uppercase the arguments",
            usage: "shout TEXT...",
            flags: &[],
            args: ArgCount::AtLeast(1),
            paths: &[],
        };

        #[async_trait]
        impl Command for Shout {
            fn spec(&self) -> &'static CommandSpec {
                &SHOUT_SPEC
            }

            async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
                Ok(CommandAction::done(ExecOutcome::ok(format!(
                    "{}\n",
                    invocation.args.join(" ").to_uppercase()
                ))))
            }
        }

        let terra = Terrarium::builder()
            .command(Box::new(Shout))
            .build()
            .await
            .unwrap();
        let outcome = done(&terra, "shout hey you").await;
        assert_eq!(outcome.output, "HEY YOU\n");
    }

    #[tokio::test]
    async fn scripts_reject_interactive_input_while_running() {
        let terra = fresh().await;
        done(&terra, "echo 'delay 40' > slow.sh").await;
        done(&terra, "chmod 74 slow.sh").await;
        let runner = {
            let terra = terra.clone();
            tokio::spawn(async move { terra.submit("run slow.sh").await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let refused = terra.submit("pwd").await;
        assert!(refused.is_err());
        let finished = runner.await.unwrap().unwrap();
        assert!(matches!(finished, Submission::Done(outcome) if outcome.ok));
        assert!(terra.submit("pwd").await.is_ok());
    }
}
