//! Background job bookkeeping.
//!
//! Jobs get identifiers from one monotonic counter; an id is never
//! reused within an environment's lifetime. Completion notices queue
//! up here until the host drains them, so background results never
//! interleave into foreground output uninvited.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Lifecycle of one background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Done,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Running => write!(f, "running"),
            JobState::Done => write!(f, "done"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

/// One background job as the `jobs` command shows it.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: u64,
    pub line: String,
    pub state: JobState,
}

/// Job table for tracking background pipelines.
pub struct JobTable {
    jobs: BTreeMap<u64, Job>,
    next_id: u64,
    notices: Vec<String>,
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTable {
    pub fn new() -> Self {
        Self {
            jobs: BTreeMap::new(),
            next_id: 1,
            notices: Vec::new(),
        }
    }

    /// Register a job and hand out the next id. Ids are strictly
    /// increasing, regardless of completions in between.
    pub fn register(&mut self, line: &str) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.jobs.insert(
            id,
            Job {
                id,
                line: line.to_string(),
                state: JobState::Running,
            },
        );
        id
    }

    /// Record a job's final state.
    pub fn mark(&mut self, id: u64, state: JobState) {
        if let Some(job) = self.jobs.get_mut(&id) {
            job.state = state;
        }
    }

    /// Queue a line for the host to show when it next drains notices.
    pub fn push_notice(&mut self, text: impl Into<String>) {
        self.notices.push(text.into());
    }

    /// Drain queued completion notices in arrival order.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    /// Every known job, id order.
    pub fn list(&self) -> Vec<Job> {
        self.jobs.values().cloned().collect()
    }

    pub fn running_count(&self) -> usize {
        self.jobs
            .values()
            .filter(|j| j.state == JobState::Running)
            .count()
    }
}

/// Shared handle used by the executor and spawned jobs.
pub type SharedJobTable = Arc<Mutex<JobTable>>;

pub fn new_shared_job_table() -> SharedJobTable {
    Arc::new(Mutex::new(JobTable::new()))
}
