//! Conversation turns: routing, the inline pipeline, prompts and answer formatting.

pub mod envelope;
pub mod inline;
pub mod prompts;
pub mod router;

pub use inline::{InlinePipeline, Route};
pub use router::{
    REQUEST_CANCELLED, REQUEST_IN_PROGRESS, REQUEST_NOT_FOUND, TurnRouter, carrier_message, extract_task_id,
};
