//! Structured answer envelope produced by the formatting call.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").unwrap());

/// Formatted technical answer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnswerEnvelope {
    pub answer: String,
    /// Models return this as either a number or a string.
    #[serde(default)]
    pub confidence: serde_json::Value,
    #[serde(default)]
    pub related_questions: Vec<String>,
}

impl AnswerEnvelope {
    /// Parse model output, tolerating a surrounding Markdown code fence.
    pub fn parse(raw: &str) -> Option<Self> {
        let body = CODE_FENCE
            .captures(raw)
            .and_then(|c| c.get(1))
            .map_or(raw, |m| m.as_str());
        serde_json::from_str(body.trim()).ok()
    }

    /// Numeric confidence, if the model gave one.
    pub fn confidence_score(&self) -> Option<f64> {
        match &self.confidence {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn render(&self) -> String {
        let confidence = match &self.confidence {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => "n/a".to_string(),
            other => other.to_string(),
        };

        let mut out = format!("Answer: {}\n\nConfidence: {}", self.answer, confidence);
        if !self.related_questions.is_empty() {
            out.push_str("\n\nRelated questions:");
            for question in &self.related_questions {
                out.push_str("\n- ");
                out.push_str(question);
            }
        }
        out
    }
}
