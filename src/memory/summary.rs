//! Conversation history summarization.

use std::sync::Arc;

use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::memory::conversation::{ConversationStore, DEFAULT_HISTORY_LIMIT, transcript};

pub const NO_HISTORY: &str = "No conversation history.";
pub const SUMMARY_UNAVAILABLE: &str = "Unable to generate a summary.";

/// Summarizes a user's history, optionally with an LLM.
pub struct HistorySummarizer {
    store: Arc<ConversationStore>,
    llm: Option<Arc<dyn LlmProvider>>,
    temperature: f32,
}

impl HistorySummarizer {
    pub fn new(store: Arc<ConversationStore>, llm: Option<Arc<dyn LlmProvider>>) -> Self {
        Self {
            store,
            llm,
            temperature: 0.3,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Summarize the last `DEFAULT_HISTORY_LIMIT` messages of `user_id`.
    ///
    /// Without an LLM this only reports the message count.
    pub async fn summarize(&self, user_id: &str) -> String {
        let history = self.store.history(user_id, DEFAULT_HISTORY_LIMIT).await;
        if history.is_empty() {
            return NO_HISTORY.to_string();
        }

        let Some(llm) = &self.llm else {
            return format!("Conversation history contains {} messages.", history.len());
        };

        let conversation = transcript(&history);
        let prompt = format!(
            "Below is a conversation between a user and an assistant. \
             Summarize the main points briefly.\n\n{conversation}"
        );

        let request =
            CompletionRequest::new(vec![ChatMessage::user(prompt)]).with_temperature(self.temperature);
        match llm.complete(request).await {
            Ok(response) => response.content.trim().to_string(),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "History summarization failed");
                SUMMARY_UNAVAILABLE.to_string()
            }
        }
    }
}
