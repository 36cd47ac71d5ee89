//! Turn router: the caller-facing entry point for conversation turns.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::backend::BackgroundInvoker;
use crate::config::RouterMode;
use crate::memory::{ConversationStore, DEFAULT_HISTORY_LIMIT, MessageRole, Metadata, transcript};
use crate::tasks::{PollOutcome, TaskId, TaskRegistry};
use crate::turn::inline::InlinePipeline;

pub const STATUS_MARKER: &str = "status:";
pub const REQUEST_NOT_FOUND: &str = "Request not found. Please submit a new query.";
pub const REQUEST_IN_PROGRESS: &str =
    "Your request is still being processed. Please check back in a moment.";
pub const REQUEST_CANCELLED: &str = "Your request has been cancelled.";

static TASK_ID_IN_CARRIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"status:\s*([0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})")
        .unwrap()
});

/// Build the string returned for a deferred turn.
pub fn carrier_message(task_id: impl std::fmt::Display) -> String {
    format!("Your request has been queued. Check back with {STATUS_MARKER}{task_id}")
}

/// Pull the task id back out of a carrier string.
pub fn extract_task_id(text: &str) -> Option<String> {
    TASK_ID_IN_CARRIER
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

enum Engine {
    Inline(InlinePipeline),
    Deferred {
        invoker: BackgroundInvoker,
        store: Arc<ConversationStore>,
    },
}

/// Routes a turn to the inline pipeline or to a background task, depending
/// on how it was constructed.
pub struct TurnRouter {
    engine: Engine,
    registry: Arc<TaskRegistry>,
    /// History window sent as context with deferred turns.
    history_limit: usize,
    /// One lock per user with a turn in flight, held for the whole turn.
    turn_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TurnRouter {
    /// Inline deployment. Status checks always report "not found".
    pub fn inline(pipeline: InlinePipeline) -> Self {
        Self {
            engine: Engine::Inline(pipeline),
            registry: Arc::new(TaskRegistry::new()),
            history_limit: DEFAULT_HISTORY_LIMIT,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Deferred deployment backed by the invoker's task registry.
    ///
    /// Prompts are recorded in `store` and the recent history is sent to the
    /// backend as context; the invoker records the replies.
    pub fn deferred(invoker: BackgroundInvoker, store: Arc<ConversationStore>) -> Self {
        let registry = Arc::clone(invoker.registry());
        let invoker = invoker.with_store(Arc::clone(&store));
        Self {
            engine: Engine::Deferred { invoker, store },
            registry,
            history_limit: DEFAULT_HISTORY_LIMIT,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Window for deferred context. Inline turns use the pipeline's own limit.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn mode(&self) -> RouterMode {
        match self.engine {
            Engine::Inline(_) => RouterMode::Inline,
            Engine::Deferred { .. } => RouterMode::Deferred,
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Process one user prompt.
    ///
    /// Inline: the finished reply. Deferred: a carrier string containing
    /// `status:<task_id>`.
    pub async fn process_conversation_turn(&self, user_id: &str, prompt: &str) -> String {
        let lock = self.user_lock(user_id).await;
        let reply = {
            let _turn = lock.lock().await;
            match &self.engine {
                Engine::Inline(pipeline) => pipeline.run(user_id, prompt).await,
                Engine::Deferred { invoker, store } => {
                    let history = store.history(user_id, self.history_limit).await;
                    let context = transcript(&history);
                    store
                        .append(user_id, MessageRole::User, prompt, Some(deferred_metadata()))
                        .await;

                    let task_id = invoker.submit(user_id, prompt, &context).await;
                    info!(user_id, task_id = %task_id, context_messages = history.len(), "Turn deferred");
                    carrier_message(task_id)
                }
            }
        };
        self.release_user_lock(user_id, lock).await;
        reply
    }

    /// Status check for a deferred turn.
    pub async fn poll(&self, task_id: &str) -> PollOutcome {
        self.registry.poll_str(task_id).await
    }

    /// Status check rendered as user-facing text.
    pub async fn check_request_status(&self, task_id: &str) -> String {
        match self.poll(task_id).await {
            PollOutcome::Ready(text) => text,
            PollOutcome::StillRunning => REQUEST_IN_PROGRESS.to_string(),
            PollOutcome::NotFound => REQUEST_NOT_FOUND.to_string(),
        }
    }

    /// Abandon a deferred turn. Its result will never be delivered.
    pub async fn cancel_request(&self, task_id: &str) -> String {
        let cancelled = match task_id.parse::<TaskId>() {
            Ok(id) => self.registry.cancel(id).await,
            Err(_) => false,
        };
        if cancelled {
            REQUEST_CANCELLED.to_string()
        } else {
            REQUEST_NOT_FOUND.to_string()
        }
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.turn_locks.lock().await;
        let lock = locks.entry(user_id.to_string()).or_default();
        debug!(user_id, "Acquired turn lock handle");
        Arc::clone(lock)
    }

    /// Drop the user's lock entry once no other turn holds or waits on it.
    /// Handles are only cloned under the map lock, so the count is stable here.
    async fn release_user_lock(&self, user_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.turn_locks.lock().await;
        // One reference in the map, one in `lock`.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(user_id);
        }
    }
}

fn deferred_metadata() -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("route".to_string(), serde_json::json!("deferred"));
    metadata
}
