//! Tool abstraction for the operations clients can call.

pub mod builtin;
pub mod registry;
pub mod tool;

use std::sync::Arc;

pub use registry::ToolRegistry;
pub use tool::*;

use crate::memory::HistorySummarizer;
use crate::turn::TurnRouter;

/// Registry holding the conversation tools.
pub async fn conversation_tools(
    router: Arc<TurnRouter>,
    summarizer: Arc<HistorySummarizer>,
) -> ToolRegistry {
    let registry = ToolRegistry::new();
    registry
        .register(Arc::new(builtin::ProcessConversationTurnTool::new(
            Arc::clone(&router),
        )))
        .await;
    registry
        .register(Arc::new(builtin::CheckRequestStatusTool::new(
            Arc::clone(&router),
        )))
        .await;
    registry
        .register(Arc::new(builtin::CancelRequestTool::new(router)))
        .await;
    registry
        .register(Arc::new(builtin::SummarizeHistoryTool::new(summarizer)))
        .await;
    registry
}
