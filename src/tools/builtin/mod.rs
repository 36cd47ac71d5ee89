//! Built-in tools for conversation turns, deferred requests and history summaries.

pub mod conversation;

pub use conversation::{
    CancelRequestTool, CheckRequestStatusTool, ProcessConversationTurnTool, SummarizeHistoryTool,
};
