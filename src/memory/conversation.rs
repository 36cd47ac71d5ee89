//! Per-user conversation log.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::llm::ChatMessage;

/// Default number of messages returned by a history read.
pub const DEFAULT_HISTORY_LIMIT: usize = 500;

/// Who authored a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// Extra per-message metadata.
pub type Metadata = HashMap<String, serde_json::Value>;

/// A stored message. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: Metadata,
}

impl Message {
    /// Convert to a model-facing chat message.
    pub fn to_chat_message(&self) -> ChatMessage {
        match self.role {
            MessageRole::User => ChatMessage::user(&self.content),
            MessageRole::Assistant => ChatMessage::assistant(&self.content),
        }
    }
}

/// Render messages as `role: content` lines, oldest first.
pub fn transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Append-only, in-memory message log keyed by user id.
///
/// Storage is unbounded; only reads are windowed. Contents do not survive a
/// process restart.
#[derive(Debug, Default)]
pub struct ConversationStore {
    logs: RwLock<HashMap<String, Vec<Message>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one message to `user_id`'s log, creating the log if needed.
    pub async fn append(
        &self,
        user_id: &str,
        role: MessageRole,
        content: impl Into<String>,
        metadata: Option<Metadata>,
    ) {
        let message = Message {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: metadata.unwrap_or_default(),
        };

        let mut logs = self.logs.write().await;
        let log = logs.entry(user_id.to_string()).or_default();
        log.push(message);
        debug!(user_id, role = %role, len = log.len(), "Message appended");
    }

    /// The most recent `limit` messages for `user_id`, oldest first.
    ///
    /// Unknown users and a zero limit both yield an empty list.
    pub async fn history(&self, user_id: &str, limit: usize) -> Vec<Message> {
        let logs = self.logs.read().await;
        match logs.get(user_id) {
            Some(log) => {
                let start = log.len().saturating_sub(limit);
                log[start..].to_vec()
            }
            None => Vec::new(),
        }
    }

    /// Number of messages stored for `user_id`.
    pub async fn len(&self, user_id: &str) -> usize {
        self.logs.read().await.get(user_id).map_or(0, Vec::len)
    }

    /// Users with at least one stored message.
    pub async fn users(&self) -> Vec<String> {
        self.logs.read().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transcript_lists_roles() {
        let store = ConversationStore::new();
        assert_eq!(transcript(&store.history("u1", 10).await), "");

        store.append("u1", MessageRole::User, "hello", None).await;
        store
            .append("u1", MessageRole::Assistant, "hi there", None)
            .await;
        assert_eq!(
            transcript(&store.history("u1", 10).await),
            "user: hello\nassistant: hi there"
        );
    }

    #[tokio::test]
    async fn history_returns_turn_in_order() {
        let store = ConversationStore::new();
        store.append("u1", MessageRole::User, "hello", None).await;
        store
            .append("u1", MessageRole::Assistant, "hi there", None)
            .await;

        let history = store.history("u1", DEFAULT_HISTORY_LIMIT).await;
        let pairs: Vec<_> = history
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (MessageRole::User, "hello"),
                (MessageRole::Assistant, "hi there")
            ]
        );
    }

    #[tokio::test]
    async fn history_keeps_last_n_in_chronological_order() {
        let store = ConversationStore::new();
        for i in 0..10 {
            store
                .append("u1", MessageRole::User, i.to_string(), None)
                .await;
        }

        let last_3: Vec<_> = store
            .history("u1", 3)
            .await
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(last_3, vec!["7", "8", "9"]);

        assert_eq!(store.history("u1", 50).await.len(), 10);
        assert_eq!(store.len("u1").await, 10);
    }

    #[tokio::test]
    async fn unknown_user_and_zero_limit_are_empty() {
        let store = ConversationStore::new();
        assert!(store.history("nobody", 10).await.is_empty());
        assert!(store.history("nobody", 1).await.is_empty());

        store.append("u1", MessageRole::User, "hi", None).await;
        assert!(store.history("u1", 0).await.is_empty());
    }

    #[tokio::test]
    async fn logs_are_isolated_per_user() {
        let store = ConversationStore::new();
        store.append("alice", MessageRole::User, "a", None).await;
        store.append("bob", MessageRole::User, "b", None).await;

        assert_eq!(store.history("alice", 10).await[0].content, "a");
        assert_eq!(store.history("bob", 10).await[0].content, "b");

        let mut users = store.users().await;
        users.sort();
        assert_eq!(users, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn metadata_is_kept() {
        let store = ConversationStore::new();
        let mut metadata = Metadata::new();
        metadata.insert("route".to_string(), serde_json::json!("technical"));
        store
            .append("u1", MessageRole::Assistant, "answer", Some(metadata))
            .await;

        let stored = &store.history("u1", 1).await[0];
        assert_eq!(stored.metadata["route"], "technical");
    }

    #[test]
    fn message_serializes_lowercase_role() {
        let message = Message {
            role: MessageRole::Assistant,
            content: "ok".to_string(),
            timestamp: Utc::now(),
            metadata: Metadata::new(),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "assistant");
        assert!(json.get("metadata").is_none());
    }
}
