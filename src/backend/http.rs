//! HTTP client for the remote chat backend.
//!
//! Wire format: `POST <url>` with header `X-API-Key: <key>` and body
//! `{"prompt": "...", "context": "..."}`; a successful reply is
//! `{"response": "..."}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::BackendError;

/// Header carrying the backend API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// A slow chat service reached in deferred mode.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, prompt: &str, context: &str) -> Result<String, BackendError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    prompt: &'a str,
    context: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    response: String,
}

/// `ChatBackend` over HTTP with a client-level timeout.
#[derive(Debug, Clone)]
pub struct HttpChatBackend {
    client: Client,
    url: String,
    api_key: SecretString,
    timeout: Duration,
}

impl HttpChatBackend {
    pub fn new(
        url: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            api_key,
            timeout,
        })
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn chat(&self, prompt: &str, context: &str) -> Result<String, BackendError> {
        debug!(url = %self.url, prompt_len = prompt.len(), "Calling chat backend");

        let response = self
            .client
            .post(&self.url)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .json(&ChatRequest { prompt, context })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout(self.timeout)
                } else {
                    error!(url = %self.url, error = %e, "Chat backend request failed");
                    BackendError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        let parsed = response.json::<ChatResponse>().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout(self.timeout)
            } else {
                BackendError::InvalidResponse(e.to_string())
            }
        })?;
        Ok(parsed.response)
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
