//! Inline turn pipeline: classify, answer, record.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::memory::{ConversationStore, DEFAULT_HISTORY_LIMIT, Message, MessageRole, Metadata};
use crate::support::TechnicalSupport;
use crate::turn::envelope::AnswerEnvelope;
use crate::turn::prompts;

/// Reply used when the casual-chat call fails.
pub const CASUAL_FALLBACK: &str =
    "Sorry, I can't reply right now. Please try again in a moment.";

/// Which path a prompt took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Casual,
    Technical,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Casual => write!(f, "casual"),
            Self::Technical => write!(f, "technical"),
        }
    }
}

/// Synchronous turn processing against the LLM and retriever.
pub struct InlinePipeline {
    llm: Arc<dyn LlmProvider>,
    support: TechnicalSupport,
    store: Arc<ConversationStore>,
    temperature: f32,
    history_limit: usize,
}

impl InlinePipeline {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        support: TechnicalSupport,
        store: Arc<ConversationStore>,
    ) -> Self {
        Self {
            llm,
            support,
            store,
            temperature: 0.3,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Run one turn and record both sides of it.
    ///
    /// Callers serialize turns per user; the history read and the two appends
    /// are not atomic on their own.
    pub async fn run(&self, user_id: &str, prompt: &str) -> String {
        let history = self.store.history(user_id, self.history_limit).await;

        let route = self.classify(prompt).await;
        let (reply, metadata) = match route {
            Route::Casual => self.casual_reply(prompt, &history).await,
            Route::Technical => self.technical_reply(prompt, &history).await,
        };

        self.store
            .append(user_id, MessageRole::User, prompt, None)
            .await;
        self.store
            .append(user_id, MessageRole::Assistant, reply.clone(), Some(metadata))
            .await;

        info!(user_id, route = %route, reply_len = reply.len(), "Turn completed");
        reply
    }

    /// Classify `prompt`. A failed classification call routes to the
    /// technical path, which degrades to a drafted answer on its own.
    pub async fn classify(&self, prompt: &str) -> Route {
        let request = CompletionRequest::new(vec![ChatMessage::user(
            prompts::classification_prompt(prompt),
        )])
        .with_temperature(self.temperature);

        match self.llm.complete(request).await {
            Ok(response) if response.content.trim() == prompts::CASUAL_MARKER => Route::Casual,
            Ok(_) => Route::Technical,
            Err(e) => {
                warn!(error = %e, "Classification failed; using technical path");
                Route::Technical
            }
        }
    }

    async fn casual_reply(&self, prompt: &str, history: &[Message]) -> (String, Metadata) {
        let mut messages = vec![ChatMessage::system(prompts::ASSISTANT_PERSONA)];
        messages.extend(history.iter().map(Message::to_chat_message));
        messages.push(ChatMessage::user(prompts::casual_prompt(prompt)));

        let request = CompletionRequest::new(messages).with_temperature(self.temperature);
        let reply = match self.llm.complete(request).await {
            Ok(response) => response.content.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "Casual reply failed");
                CASUAL_FALLBACK.to_string()
            }
        };

        (reply, route_metadata(Route::Casual))
    }

    async fn technical_reply(&self, prompt: &str, history: &[Message]) -> (String, Metadata) {
        let material = self.support.lookup(prompt, history).await;

        let request = CompletionRequest::new(vec![ChatMessage::user(
            prompts::formatting_prompt(&material.reference_text, &material.draft),
        )])
        .with_temperature(self.temperature);

        let mut metadata = route_metadata(Route::Technical);
        metadata.insert(
            "sources".to_string(),
            serde_json::json!(material.documents.len()),
        );

        let reply = match self.llm.complete(request).await {
            Ok(response) => match AnswerEnvelope::parse(&response.content) {
                Some(envelope) => {
                    if let Some(score) = envelope.confidence_score() {
                        metadata.insert("confidence".to_string(), serde_json::json!(score));
                    }
                    envelope.render()
                }
                None => response.content,
            },
            Err(e) => {
                warn!(error = %e, "Formatting call failed; returning draft answer");
                material.draft
            }
        };

        (reply, metadata)
    }
}

fn route_metadata(route: Route) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("route".to_string(), serde_json::json!(route.to_string()));
    metadata
}
