//! Convo Assist: conversational technical-support assistant core.

pub mod backend;
pub mod channels;
pub mod config;
pub mod error;
pub mod llm;
pub mod logging;
pub mod memory;
pub mod retrieval;
pub mod support;
pub mod tasks;
pub mod tools;
pub mod turn;
