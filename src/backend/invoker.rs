//! Runs slow chat-backend calls as registered background tasks.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::backend::ChatBackend;
use crate::error::BackendError;
use crate::memory::{ConversationStore, MessageRole, Metadata};
use crate::tasks::{TaskId, TaskRegistry};

/// Default bound on a single backend call.
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Submits backend calls to the task registry.
///
/// Every failure is folded into the task's result text, so pollers only ever
/// receive a string. With a store attached, successful replies are appended
/// to the user's log before the result becomes visible to pollers.
pub struct BackgroundInvoker {
    backend: Arc<dyn ChatBackend>,
    registry: Arc<TaskRegistry>,
    store: Option<Arc<ConversationStore>>,
    timeout: Duration,
}

impl BackgroundInvoker {
    pub fn new(backend: Arc<dyn ChatBackend>, registry: Arc<TaskRegistry>) -> Self {
        Self {
            backend,
            registry,
            store: None,
            timeout: DEFAULT_BACKEND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_store(mut self, store: Arc<ConversationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Start the backend call in the background and return its task id.
    pub async fn submit(&self, user_id: &str, prompt: &str, context: &str) -> TaskId {
        let call = BackendCall {
            backend: Arc::clone(&self.backend),
            store: self.store.clone(),
            user_id: user_id.to_string(),
            prompt: prompt.to_string(),
            context: context.to_string(),
            timeout: self.timeout,
        };
        self.registry.submit(user_id, call.run()).await
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }
}

struct BackendCall {
    backend: Arc<dyn ChatBackend>,
    store: Option<Arc<ConversationStore>>,
    user_id: String,
    prompt: String,
    context: String,
    timeout: Duration,
}

impl BackendCall {
    async fn run(self) -> String {
        let result =
            match tokio::time::timeout(self.timeout, self.backend.chat(&self.prompt, &self.context))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout(self.timeout)),
            };

        match result {
            Ok(text) => {
                if let Some(store) = &self.store {
                    let mut metadata = Metadata::new();
                    metadata.insert("route".to_string(), serde_json::json!("deferred"));
                    store
                        .append(&self.user_id, MessageRole::Assistant, text.clone(), Some(metadata))
                        .await;
                }
                text
            }
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "Chat backend call failed");
                format!("Error: {e}")
            }
        }
    }
}
