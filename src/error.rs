//! Error types for Convo Assist.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Chat backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors from the remote chat backend used in deferred mode.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("could not reach chat backend: {0}")]
    Connection(String),

    #[error("chat backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed chat backend response: {0}")]
    InvalidResponse(String),
}

/// Document retrieval errors.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("Retriever request failed: {0}")]
    RequestFailed(String),

    #[error("Retriever returned status {status}")]
    Status { status: u16 },

    #[error("Malformed retriever response: {0}")]
    InvalidResponse(String),
}

/// Tool invocation errors.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool {name} not found")]
    NotFound { name: String },

    #[error("Invalid parameters for tool {name}: {reason}")]
    InvalidParameters { name: String, reason: String },
}

/// Background task errors.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Task {id} cannot transition from {state} to {target}")]
    InvalidTransition {
        id: String,
        state: String,
        target: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_timeout_message_mentions_timed_out() {
        let err = BackendError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "request timed out after 30s");
    }

    #[test]
    fn config_error_converts_into_top_level() {
        let err: Error = ConfigError::MissingRequired {
            key: "OPENAI_API_KEY".to_string(),
            hint: "export OPENAI_API_KEY=sk-...".to_string(),
        }
        .into();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
