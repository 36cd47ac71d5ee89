//! Retriever backed by a remote search service.
//!
//! `POST <url>` with `{"query": "...", "history": [{"role", "content"}, ...]}`,
//! answered by `{"documents": [{"content": "...", "metadata": {...}}]}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;
use crate::memory::{Message, MessageRole};
use crate::retrieval::{Document, Retriever};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
struct RetrieveRequest<'a> {
    query: &'a str,
    history: Vec<HistoryEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct HistoryEntry<'a> {
    role: MessageRole,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct RetrieveResponse {
    documents: Vec<Document>,
}

pub struct LiveRetriever {
    client: Client,
    url: String,
}

impl LiveRetriever {
    pub fn new(url: impl Into<String>) -> Result<Self, RetrievalError> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| RetrievalError::RequestFailed(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Retriever for LiveRetriever {
    fn name(&self) -> &str {
        "live"
    }

    async fn retrieve(
        &self,
        query: &str,
        history: &[Message],
    ) -> Result<Vec<Document>, RetrievalError> {
        let body = RetrieveRequest {
            query,
            history: history
                .iter()
                .map(|m| HistoryEntry {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::Status {
                status: status.as_u16(),
            });
        }

        let parsed: RetrieveResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::InvalidResponse(e.to_string()))?;
        tracing::debug!(count = parsed.documents.len(), "Documents retrieved");
        Ok(parsed.documents)
    }
}
