//! Fixed in-memory corpus, returned in full for every query.

use async_trait::async_trait;

use crate::error::RetrievalError;
use crate::memory::Message;
use crate::retrieval::{Document, Retriever};

pub struct FixedCorpusRetriever {
    documents: Vec<Document>,
}

impl FixedCorpusRetriever {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Sample manuals used when no live retriever is configured.
    pub fn sample() -> Self {
        Self::new(vec![
            Document::new("Sample document 1. Covers packaging technology.")
                .with_metadata("source", "Technical manual")
                .with_metadata("section", "Packaging technology"),
            Document::new("Sample document 2. Covers equipment maintenance.")
                .with_metadata("source", "Maintenance manual")
                .with_metadata("section", "Equipment maintenance"),
            Document::new("Sample document 3. Covers troubleshooting.")
                .with_metadata("source", "Troubleshooting guide")
                .with_metadata("section", "Common issues"),
        ])
    }
}

#[async_trait]
impl Retriever for FixedCorpusRetriever {
    fn name(&self) -> &str {
        "fixed_corpus"
    }

    async fn retrieve(
        &self,
        _query: &str,
        _history: &[Message],
    ) -> Result<Vec<Document>, RetrievalError> {
        Ok(self.documents.clone())
    }
}
