//! Turning raw model text into typed results.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::prompt::NO_ANSWER;

/// Summary used when the model's risk analysis is not parseable JSON.
pub const UNPARSEABLE_SUMMARY: &str = "Could not parse analysis output.";

const MAX_PARAPHRASES: usize = 5;

static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-*]\s*").unwrap());

/// Risk analysis response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAnalysis {
    pub summary: String,
    pub detailed: String,
}

impl RiskAnalysis {
    /// Result for a document with no text.
    pub fn empty_document() -> Self {
        Self {
            summary: "Empty document".to_string(),
            detailed: String::new(),
        }
    }
}

/// Trim, then strip one leading ```` ```json ```` or ```` ``` ```` and one
/// trailing ```` ``` ````. Fences in the middle of the text are left alone.
pub fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    }
    if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parse a risk analysis, degrading to a placeholder summary when the text
/// is not a JSON object.
pub fn parse_risk_analysis(raw: &str) -> RiskAnalysis {
    let text = strip_fences(raw);

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => RiskAnalysis {
            summary: field_text(map.get("summary")),
            detailed: field_text(map.get("detailed")),
        },
        Ok(other) => {
            warn!("Risk analysis JSON is not an object: {}", other);
            degraded(text)
        }
        Err(e) => {
            warn!("Risk analysis is not valid JSON: {}", e);
            degraded(text)
        }
    }
}

fn degraded(text: &str) -> RiskAnalysis {
    RiskAnalysis {
        summary: UNPARSEABLE_SUMMARY.to_string(),
        detailed: text.to_string(),
    }
}

/// Models sometimes return bullet arrays instead of a string.
fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Some(other) => other.to_string(),
    }
}

/// Trimmed answer text, or the no-answer sentinel when empty.
pub fn normalize_answer(raw: &str) -> String {
    let answer = raw.trim();
    if answer.is_empty() {
        NO_ANSWER.to_string()
    } else {
        answer.to_string()
    }
}

/// One paraphrase per non-blank line, bullets stripped, at most five.
pub fn parse_paraphrases(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| BULLET.replace(line.trim(), "").trim().to_string())
        .filter(|line| !line.is_empty())
        .take(MAX_PARAPHRASES)
        .collect()
}
