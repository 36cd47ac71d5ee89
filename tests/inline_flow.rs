//! Inline turn flow driven through the tool registry with a stub LLM.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use convo_assist::error::LlmError;
use convo_assist::llm::{CompletionRequest, CompletionResponse, LlmProvider};
use convo_assist::memory::{ConversationStore, HistorySummarizer, MessageRole};
use convo_assist::retrieval::FixedCorpusRetriever;
use convo_assist::support::TechnicalSupport;
use convo_assist::tools::{ToolRegistry, conversation_tools};
use convo_assist::turn::{InlinePipeline, REQUEST_NOT_FOUND, TurnRouter};

/// Answers by looking at what kind of prompt it was given.
struct StubLlm {
    casual_delay: Duration,
    replies: AtomicUsize,
}

impl StubLlm {
    fn new(casual_delay: Duration) -> Self {
        Self {
            casual_delay,
            replies: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let last = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let content = if last.starts_with("Decide whether") {
            let casual = ["hello", "thanks"].iter().any(|w| last.contains(w));
            let verdict = if casual { "True" } else { "False" };
            verdict.to_string()
        } else if last.contains("<knowledge_base>") {
            r#"```json
{"answer": "Check the heater cartridge.", "confidence": 0.8, "related_questions": ["What temperature?"]}
```"#
                .to_string()
        } else if last.starts_with("Below is a conversation") {
            "The user greeted the assistant and asked about sealing.".to_string()
        } else {
            tokio::time::sleep(self.casual_delay).await;
            let n = self.replies.fetch_add(1, Ordering::SeqCst) + 1;
            format!("reply #{n}")
        };

        Ok(CompletionResponse { content })
    }
}

struct Harness {
    store: Arc<ConversationStore>,
    tools: ToolRegistry,
}

async fn harness(casual_delay: Duration) -> Harness {
    let llm: Arc<dyn LlmProvider> = Arc::new(StubLlm::new(casual_delay));
    let store = Arc::new(ConversationStore::new());
    let pipeline = InlinePipeline::new(
        Arc::clone(&llm),
        TechnicalSupport::new(Arc::new(FixedCorpusRetriever::sample())),
        Arc::clone(&store),
    );
    let router = Arc::new(TurnRouter::inline(pipeline));
    let summarizer = Arc::new(HistorySummarizer::new(Arc::clone(&store), Some(llm)));
    let tools = conversation_tools(router, summarizer).await;
    Harness { store, tools }
}

async fn turn(tools: &ToolRegistry, user_id: &str, prompt: &str) -> String {
    tools
        .execute(
            "process_conversation_turn",
            serde_json::json!({"user_id": user_id, "prompt": prompt}),
        )
        .await
        .unwrap()
        .as_text()
}

#[tokio::test]
async fn casual_and_technical_turns_are_recorded() {
    let h = harness(Duration::ZERO).await;

    assert_eq!(turn(&h.tools, "u1", "hello").await, "reply #1");
    let technical = turn(&h.tools, "u1", "The sealing jaw does not heat up").await;
    assert_eq!(
        technical,
        "Answer: Check the heater cartridge.\n\nConfidence: 0.8\n\nRelated questions:\n- What temperature?"
    );

    let history = h.store.history("u1", 500).await;
    let roles: Vec<_> = history.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::User,
            MessageRole::Assistant
        ]
    );
    assert_eq!(history[0].content, "hello");
    assert_eq!(history[3].content, technical);
    assert_eq!(history[3].metadata["route"], "technical");

    // Other users are unaffected.
    assert!(h.store.history("u2", 500).await.is_empty());
}

#[tokio::test]
async fn inline_status_checks_report_not_found() {
    let h = harness(Duration::ZERO).await;
    let reply = turn(&h.tools, "u1", "hello").await;
    assert!(!reply.contains("status:"));

    let status = h
        .tools
        .execute(
            "check_request_status",
            serde_json::json!({"task_id": "00000000-0000-0000-0000-000000000000"}),
        )
        .await
        .unwrap();
    assert_eq!(status.as_text(), REQUEST_NOT_FOUND);
}

#[tokio::test]
async fn summary_uses_the_llm() {
    let h = harness(Duration::ZERO).await;

    let empty = h
        .tools
        .execute("summarize_history", serde_json::json!({"user_id": "u1"}))
        .await
        .unwrap();
    assert_eq!(empty.as_text(), "No conversation history.");

    turn(&h.tools, "u1", "hello").await;
    let summary = h
        .tools
        .execute("summarize_history", serde_json::json!({"user_id": "u1"}))
        .await
        .unwrap();
    assert_eq!(
        summary.as_text(),
        "The user greeted the assistant and asked about sealing."
    );
}

#[tokio::test(start_paused = true)]
async fn concurrent_turns_for_one_user_do_not_interleave() {
    let h = Arc::new(harness(Duration::from_secs(1)).await);

    let first = {
        let h = Arc::clone(&h);
        tokio::spawn(async move { turn(&h.tools, "u1", "hello there").await })
    };
    let second = {
        let h = Arc::clone(&h);
        tokio::spawn(async move { turn(&h.tools, "u1", "thanks a lot").await })
    };
    first.await.unwrap();
    second.await.unwrap();

    let history = h.store.history("u1", 500).await;
    assert_eq!(history.len(), 4);
    for pair in history.chunks(2) {
        assert_eq!(pair[0].role, MessageRole::User);
        assert_eq!(pair[1].role, MessageRole::Assistant);
    }
    // Each reply follows its own prompt.
    let replies: Vec<_> = history
        .iter()
        .filter(|m| m.role == MessageRole::Assistant)
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(replies, vec!["reply #1", "reply #2"]);
}
