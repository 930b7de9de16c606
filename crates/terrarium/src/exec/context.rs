//! Shared world state and per-command invocation context.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};

use crate::config::Config;
use crate::exec::contract::ResolvedPath;
use crate::exec::jobs::{new_shared_job_table, SharedJobTable};
use crate::exec::Executor;
use crate::session::{SessionManager, UserManager};
use crate::store::{Persistence, StateStore};
use crate::vfs::{path, Vfs};

/// Interactive history is capped; the oldest entries fall off.
pub(crate) const HISTORY_LIMIT: usize = 100;

/// Everything the environment shares: the tree, the accounts, the
/// persistence layer, the job table, and the live terminal state.
/// Cloning is cheap; clones observe the same state.
#[derive(Clone)]
pub(crate) struct World {
    pub vfs: Arc<Vfs>,
    pub users: Arc<UserManager>,
    pub sessions: Arc<SessionManager>,
    pub persist: Arc<Persistence>,
    pub jobs: SharedJobTable,
    pub config: Arc<Config>,
    pub cwd: Arc<RwLock<String>>,
    pub screen: Arc<RwLock<Vec<String>>>,
    pub history: Arc<RwLock<Vec<String>>>,
    pub script_running: Arc<AtomicBool>,
}

impl World {
    pub fn new(store: Arc<dyn StateStore>, quota: u64, config: Config) -> World {
        World {
            vfs: Arc::new(Vfs::new()),
            users: Arc::new(UserManager::new()),
            sessions: Arc::new(SessionManager::new(Arc::clone(&store))),
            persist: Arc::new(Persistence::new(store, quota)),
            jobs: new_shared_job_table(),
            config: Arc::new(config),
            cwd: Arc::new(RwLock::new("/".to_string())),
            screen: Arc::new(RwLock::new(Vec::new())),
            history: Arc::new(RwLock::new(Vec::new())),
            script_running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cwd(&self) -> String {
        self.cwd.read().unwrap().clone()
    }

    pub fn set_cwd(&self, dir: &str) {
        *self.cwd.write().unwrap() = dir.to_string();
    }

    pub fn screen_push(&self, text: &str) {
        let mut screen = self.screen.write().unwrap();
        for line in text.lines() {
            screen.push(line.to_string());
        }
    }

    pub fn screen_clear(&self) {
        self.screen.write().unwrap().clear();
    }

    pub fn screen_lines(&self) -> Vec<String> {
        self.screen.read().unwrap().clone()
    }

    pub fn set_screen(&self, lines: Vec<String>) {
        *self.screen.write().unwrap() = lines;
    }

    pub fn history_push(&self, line: &str) {
        let mut history = self.history.write().unwrap();
        history.push(line.to_string());
        if history.len() > HISTORY_LIMIT {
            let excess = history.len() - HISTORY_LIMIT;
            history.drain(..excess);
        }
    }

    pub fn history_lines(&self) -> Vec<String> {
        self.history.read().unwrap().clone()
    }

    pub fn set_history(&self, lines: Vec<String>) {
        *self.history.write().unwrap() = lines;
    }
}

/// Validated input handed to a command handler: flags and positionals
/// already split, declared paths resolved, piped stdin attached.
pub struct Invocation {
    pub(crate) exec: Executor,
    pub user: String,
    pub cwd: String,
    pub args: Vec<String>,
    pub flags: HashMap<String, Option<String>>,
    pub paths: Vec<ResolvedPath>,
    pub stdin: Option<String>,
    /// True when the command may answer with a prompt: foreground,
    /// single-segment, unredirected, outside a script.
    pub interactive: bool,
}

impl Invocation {
    pub fn has_flag(&self, long: &str) -> bool {
        self.flags.contains_key(long)
    }

    pub fn flag_value(&self, long: &str) -> Option<&str> {
        self.flags.get(long).and_then(|v| v.as_deref())
    }

    /// The resolved path for positional `index`, when one was declared.
    pub fn path_at(&self, index: usize) -> Option<&ResolvedPath> {
        self.paths.iter().find(|p| p.index == index)
    }

    /// Resolve an arbitrary string against the invocation's cwd.
    pub fn resolve(&self, raw: &str) -> String {
        path::resolve(raw, &self.cwd)
    }

    pub fn vfs(&self) -> &Vfs {
        &self.exec.world.vfs
    }

    pub fn users(&self) -> &UserManager {
        &self.exec.world.users
    }

    pub(crate) fn world(&self) -> &World {
        &self.exec.world
    }
}
