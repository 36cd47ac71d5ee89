//! Technical support desk: retrieval plus a drafted answer.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::memory::Message;
use crate::retrieval::{Document, Retriever};

/// Material gathered for one technical question.
#[derive(Debug, Clone)]
pub struct SupportMaterial {
    pub documents: Vec<Document>,
    /// Documents rendered as a numbered reference block for the formatter.
    pub reference_text: String,
    /// Technical answer before formatting.
    pub draft: String,
}

pub struct TechnicalSupport {
    retriever: Arc<dyn Retriever>,
}

impl TechnicalSupport {
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self { retriever }
    }

    /// Retrieve documents for `question` and draft an answer from them.
    ///
    /// Retrieval failures degrade to an empty document set.
    pub async fn lookup(&self, question: &str, history: &[Message]) -> SupportMaterial {
        let documents = match self.retriever.retrieve(question, history).await {
            Ok(docs) => docs,
            Err(e) => {
                warn!(retriever = self.retriever.name(), error = %e, "Retrieval failed");
                Vec::new()
            }
        };
        debug!(
            retriever = self.retriever.name(),
            count = documents.len(),
            "Support material gathered"
        );

        SupportMaterial {
            reference_text: render_references(&documents),
            draft: draft_answer(question, &documents),
            documents,
        }
    }
}

fn render_references(documents: &[Document]) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            let metadata =
                serde_json::to_string(&doc.metadata).unwrap_or_else(|_| "{}".to_string());
            format!(
                "Document {}:\nContent: {}\nMetadata: {}\n\n",
                i + 1,
                doc.content,
                metadata
            )
        })
        .collect()
}

fn draft_answer(question: &str, documents: &[Document]) -> String {
    let sources: Vec<String> = documents
        .iter()
        .filter_map(|doc| {
            let source = doc.metadata.get("source")?.as_str()?;
            Some(match doc.metadata.get("section").and_then(|s| s.as_str()) {
                Some(section) => format!("{source} ({section})"),
                None => source.to_string(),
            })
        })
        .collect();

    if sources.is_empty() {
        format!(
            "Regarding your question \"{question}\", no matching reference material was found. \
             Please contact the technical department for assistance."
        )
    } else {
        format!(
            "Regarding your question \"{question}\", we recommend consulting the relevant \
             sections of: {}.",
            sources.join("; ")
        )
    }
}
