//! Bridges rig's `CompletionModel` to our `LlmProvider` trait.

use async_trait::async_trait;
use rig::agent::AgentBuilder;
use rig::completion::{Chat, CompletionModel};
use rig::message::Message;

use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, Role};

/// Upper bound on generated tokens; Anthropic rejects requests without one.
const DEFAULT_MAX_TOKENS: u64 = 2048;

/// `LlmProvider` backed by any rig completion model.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
    provider: &'static str,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str, provider: &'static str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            provider,
        }
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let split = split_request(&request.messages)?;

        let mut builder = AgentBuilder::new(self.model.clone()).max_tokens(DEFAULT_MAX_TOKENS);
        if let Some(preamble) = split.preamble.as_deref() {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }
        let agent = builder.build();

        let history: Vec<Message> = split
            .history
            .into_iter()
            .map(|m| match m.role {
                Role::Assistant => Message::assistant(m.content),
                _ => Message::user(m.content),
            })
            .collect();

        tracing::debug!(
            provider = self.provider,
            model = %self.model_name,
            history_len = history.len(),
            "Sending completion request"
        );

        let content = agent
            .chat(split.prompt, history)
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: self.provider.to_string(),
                reason: e.to_string(),
            })?;

        Ok(CompletionResponse { content })
    }
}

/// A request reshaped for rig's agent API.
#[derive(Debug, PartialEq)]
struct SplitRequest {
    preamble: Option<String>,
    history: Vec<ChatMessage>,
    prompt: String,
}

/// System messages become the preamble, the final user message becomes the
/// prompt, everything in between is chat history.
fn split_request(messages: &[ChatMessage]) -> Result<SplitRequest, LlmError> {
    let (last, rest) = messages
        .split_last()
        .ok_or_else(|| LlmError::InvalidRequest("no messages".to_string()))?;
    if last.role != Role::User {
        return Err(LlmError::InvalidRequest(
            "last message must come from the user".to_string(),
        ));
    }

    let system: Vec<&str> = rest
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    let preamble = (!system.is_empty()).then(|| system.join("\n\n"));

    let history = rest
        .iter()
        .filter(|m| m.role != Role::System)
        .cloned()
        .collect();

    Ok(SplitRequest {
        preamble,
        history,
        prompt: last.content.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_single_user_message() {
        let split = split_request(&[ChatMessage::user("hi")]).unwrap();
        assert_eq!(split.preamble, None);
        assert!(split.history.is_empty());
        assert_eq!(split.prompt, "hi");
    }

    #[test]
    fn split_collects_system_and_history() {
        let split = split_request(&[
            ChatMessage::system("be brief"),
            ChatMessage::user("hello"),
            ChatMessage::assistant("hi there"),
            ChatMessage::system("answer in English"),
            ChatMessage::user("what is a sealer?"),
        ])
        .unwrap();

        assert_eq!(split.preamble.as_deref(), Some("be brief\n\nanswer in English"));
        assert_eq!(
            split.history,
            vec![ChatMessage::user("hello"), ChatMessage::assistant("hi there")]
        );
        assert_eq!(split.prompt, "what is a sealer?");
    }

    #[test]
    fn split_rejects_empty_and_trailing_assistant() {
        assert!(split_request(&[]).is_err());
        assert!(split_request(&[ChatMessage::assistant("done")]).is_err());
    }
}
