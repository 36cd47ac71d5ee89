//! Conversation memory: the per-user message log and its summarizer.

pub mod conversation;
pub mod summary;

pub use conversation::{
    ConversationStore, DEFAULT_HISTORY_LIMIT, Message, MessageRole, Metadata, transcript,
};
pub use summary::HistorySummarizer;
