//! Conversation tools: the operations a client calls to talk to the assistant.

use std::sync::Arc;

use async_trait::async_trait;

use crate::memory::HistorySummarizer;
use crate::tools::tool::{Tool, ToolError, ToolOutput, require_str};
use crate::turn::TurnRouter;

// ── process_conversation_turn ───────────────────────────────────────

/// Submit one user prompt. Inline deployments answer directly; deferred
/// deployments answer with a carrier containing `status:<task_id>`.
pub struct ProcessConversationTurnTool {
    router: Arc<TurnRouter>,
}

impl ProcessConversationTurnTool {
    pub fn new(router: Arc<TurnRouter>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl Tool for ProcessConversationTurnTool {
    fn name(&self) -> &str {
        "process_conversation_turn"
    }

    fn description(&self) -> &str {
        "Process a user's prompt and return the assistant's reply. If the reply \
         contains 'status:<id>', the answer is being prepared in the background; \
         fetch it with check_request_status."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "user_id": {
                    "type": "string",
                    "description": "Identifier of the user whose conversation this is"
                },
                "prompt": {
                    "type": "string",
                    "description": "The user's message"
                }
            },
            "required": ["user_id", "prompt"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();
        let user_id = require_str(self.name(), &params, "user_id")?;
        let prompt = require_str(self.name(), &params, "prompt")?;

        let reply = self.router.process_conversation_turn(user_id, prompt).await;
        Ok(ToolOutput::text(reply, start.elapsed()))
    }
}

// ── check_request_status ────────────────────────────────────────────

/// Fetch the result of a deferred turn. A result is handed out once.
pub struct CheckRequestStatusTool {
    router: Arc<TurnRouter>,
}

impl CheckRequestStatusTool {
    pub fn new(router: Arc<TurnRouter>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl Tool for CheckRequestStatusTool {
    fn name(&self) -> &str {
        "check_request_status"
    }

    fn description(&self) -> &str {
        "Check on a request queued by process_conversation_turn. Returns the \
         answer once it is ready; each answer is returned only once."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "string",
                    "description": "The id that followed 'status:' in the queued reply"
                }
            },
            "required": ["task_id"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();
        let task_id = require_str(self.name(), &params, "task_id")?;

        let text = self.router.check_request_status(task_id).await;
        Ok(ToolOutput::text(text, start.elapsed()))
    }
}

// ── cancel_request ──────────────────────────────────────────────────

/// Abandon a deferred turn the client no longer wants.
pub struct CancelRequestTool {
    router: Arc<TurnRouter>,
}

impl CancelRequestTool {
    pub fn new(router: Arc<TurnRouter>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl Tool for CancelRequestTool {
    fn name(&self) -> &str {
        "cancel_request"
    }

    fn description(&self) -> &str {
        "Cancel a request queued by process_conversation_turn. Its answer \
         will not be delivered."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "string",
                    "description": "The id that followed 'status:' in the queued reply"
                }
            },
            "required": ["task_id"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();
        let task_id = require_str(self.name(), &params, "task_id")?;

        let text = self.router.cancel_request(task_id).await;
        Ok(ToolOutput::text(text, start.elapsed()))
    }
}

// ── summarize_history ───────────────────────────────────────────────

/// Summarize a user's conversation so far.
pub struct SummarizeHistoryTool {
    summarizer: Arc<HistorySummarizer>,
}

impl SummarizeHistoryTool {
    pub fn new(summarizer: Arc<HistorySummarizer>) -> Self {
        Self { summarizer }
    }
}

#[async_trait]
impl Tool for SummarizeHistoryTool {
    fn name(&self) -> &str {
        "summarize_history"
    }

    fn description(&self) -> &str {
        "Summarize the conversation history of a user: main topics, open \
         questions and any decisions reached."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "user_id": {
                    "type": "string",
                    "description": "Identifier of the user whose history to summarize"
                }
            },
            "required": ["user_id"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();
        let user_id = require_str(self.name(), &params, "user_id")?;

        let summary = self.summarizer.summarize(user_id).await;
        Ok(ToolOutput::text(summary, start.elapsed()))
    }
}
