//! Static question list and stored answers, read from the data directory.
//!
//! Files are re-read on every request so edits show up without a restart.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

pub const QUESTIONS_FILE: &str = "questions_short.txt";
pub const RESPONSES_FILE: &str = "responses.json";

#[derive(Debug, Clone, Deserialize)]
pub struct StoredResponse {
    pub question: String,
    pub answer: String,
}

/// Non-blank trimmed lines of the questions file.
pub async fn load_questions(data_dir: &Path) -> Result<Vec<String>> {
    let path = data_dir.join(QUESTIONS_FILE);
    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read questions: {:?}", path))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Result of a stored-response lookup.
#[derive(Debug, PartialEq, Eq)]
pub enum Lookup {
    Found(String),
    NoMatch,
    /// The responses file does not exist.
    Unavailable,
}

/// Find the stored answer whose question matches exactly.
pub async fn find_response(data_dir: &Path, question: &str) -> Result<Lookup> {
    let path = data_dir.join(RESPONSES_FILE);
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Ok(Lookup::Unavailable);
    }

    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read responses: {:?}", path))?;
    let responses: Vec<StoredResponse> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse responses: {:?}", path))?;

    Ok(responses
        .into_iter()
        .find(|r| r.question == question)
        .map(|r| Lookup::Found(r.answer))
        .unwrap_or(Lookup::NoMatch))
}
