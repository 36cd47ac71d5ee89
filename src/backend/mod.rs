//! Remote chat backend used in deferred mode.

pub mod http;
pub mod invoker;

pub use http::{ChatBackend, HttpChatBackend};
pub use invoker::{BackgroundInvoker, DEFAULT_BACKEND_TIMEOUT};
