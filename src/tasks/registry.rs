//! Task registry: background work with single-delivery results.
//!
//! Lifecycle of an entry:
//! - `submit()` spawns the work and registers it as `Pending`
//! - the spawned work marks itself `Running`, then `Completed` with its text
//! - the first `poll()` that sees `Completed` returns the text and evicts the
//!   entry; every later poll for that id reports `NotFound`
//!
//! There is no expiry sweep. A completed task nobody polls stays registered
//! until `cancel()` or `abort_all()`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::TaskError;
use crate::tasks::state::{PollOutcome, TaskState};

/// Result text for work that ended without recording an output (panic or abort).
pub const ABANDONED_RESULT: &str = "Error: the background task ended without producing a result";

/// Opaque, collision-resistant task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A registered unit of background work.
#[derive(Debug)]
struct PendingTask {
    user_id: String,
    handle: JoinHandle<()>,
    state: TaskState,
    result: Option<String>,
    submitted_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl PendingTask {
    fn transition_to(&mut self, id: TaskId, target: TaskState) -> Result<(), TaskError> {
        if !self.state.can_transition_to(target) {
            return Err(TaskError::InvalidTransition {
                id: id.to_string(),
                state: self.state.to_string(),
                target: target.to_string(),
            });
        }
        self.state = target;
        Ok(())
    }

    fn complete(&mut self, id: TaskId, result: String) -> Result<(), TaskError> {
        self.transition_to(id, TaskState::Completed)?;
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}

type TaskMap = HashMap<TaskId, PendingTask>;

/// Registry of in-flight and completed-but-undelivered background tasks.
pub struct TaskRegistry {
    tasks: Arc<Mutex<TaskMap>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Spawn `work` and register it. Returns without waiting for the work.
    ///
    /// The lock is held across spawn and insert, so the work cannot record
    /// its result before its entry exists.
    pub async fn submit<F>(&self, user_id: &str, work: F) -> TaskId
    where
        F: Future<Output = String> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().await;

        let id = loop {
            let candidate = TaskId::new();
            if !tasks.contains_key(&candidate) {
                break candidate;
            }
        };

        let shared = Arc::clone(&self.tasks);
        let handle = tokio::spawn(async move {
            Self::mark_running(&shared, id).await;
            let output = work.await;
            Self::record_result(&shared, id, output).await;
        });

        tasks.insert(
            id,
            PendingTask {
                user_id: user_id.to_string(),
                handle,
                state: TaskState::Pending,
                result: None,
                submitted_at: Utc::now(),
                completed_at: None,
            },
        );
        drop(tasks);

        info!(task_id = %id, user_id, "Background task submitted");
        id
    }

    async fn mark_running(tasks: &Mutex<TaskMap>, id: TaskId) {
        let mut tasks = tasks.lock().await;
        if let Some(task) = tasks.get_mut(&id)
            && let Err(e) = task.transition_to(id, TaskState::Running)
        {
            debug!(task_id = %id, error = %e, "Skipped running transition");
        }
    }

    async fn record_result(tasks: &Mutex<TaskMap>, id: TaskId, output: String) {
        let mut tasks = tasks.lock().await;
        let Some(task) = tasks.get_mut(&id) else {
            debug!(task_id = %id, "Result dropped for evicted task");
            return;
        };
        match task.complete(id, output) {
            Ok(()) => {
                let elapsed = task
                    .completed_at
                    .map(|done| (done - task.submitted_at).num_milliseconds())
                    .unwrap_or_default();
                info!(task_id = %id, user_id = %task.user_id, elapsed_ms = elapsed, "Background task completed");
            }
            Err(e) => warn!(task_id = %id, error = %e, "Could not record task result"),
        }
    }

    /// Check a task. Read, mark-complete and evict happen under one lock.
    pub async fn poll(&self, id: TaskId) -> PollOutcome {
        let mut tasks = self.tasks.lock().await;

        match tasks.get_mut(&id) {
            None => {
                debug!(task_id = %id, "Poll for unknown task");
                return PollOutcome::NotFound;
            }
            Some(task) if !task.state.is_terminal() => {
                if !task.handle.is_finished() {
                    return PollOutcome::StillRunning;
                }
                warn!(task_id = %id, "Background task ended without a result");
                if let Err(e) = task.complete(id, ABANDONED_RESULT.to_string()) {
                    warn!(task_id = %id, error = %e, "Could not complete abandoned task");
                }
            }
            Some(_) => {}
        }

        let result = tasks
            .remove(&id)
            .and_then(|task| task.result)
            .unwrap_or_else(|| ABANDONED_RESULT.to_string());
        info!(task_id = %id, "Task result delivered and evicted");
        PollOutcome::Ready(result)
    }

    /// Poll by the string form of a task id. Unparseable ids are `NotFound`.
    pub async fn poll_str(&self, id: &str) -> PollOutcome {
        match id.parse::<TaskId>() {
            Ok(id) => self.poll(id).await,
            Err(_) => {
                debug!(task_id = id, "Poll with malformed task id");
                PollOutcome::NotFound
            }
        }
    }

    /// Abort a task's work and evict it. Returns false for unknown ids.
    pub async fn cancel(&self, id: TaskId) -> bool {
        let removed = self.tasks.lock().await.remove(&id);
        match removed {
            Some(task) => {
                if !task.handle.is_finished() {
                    task.handle.abort();
                }
                info!(task_id = %id, "Background task cancelled");
                true
            }
            None => false,
        }
    }

    /// Abort and evict every task.
    pub async fn abort_all(&self) {
        let mut tasks = self.tasks.lock().await;
        let count = tasks.len();
        for (_, task) in tasks.drain() {
            task.handle.abort();
        }
        if count > 0 {
            info!(count, "Aborted background tasks");
        }
    }

    /// Current state of a registered task.
    pub async fn state(&self, id: TaskId) -> Option<TaskState> {
        self.tasks.lock().await.get(&id).map(|t| t.state)
    }

    /// Number of registered (undelivered) tasks.
    pub async fn len(&self) -> usize {
        self.tasks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}
