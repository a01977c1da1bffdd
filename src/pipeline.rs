//! Request pipeline: prompt, model call, normalization, classification.
//!
//! Each function makes at most one model call and never retries. Callers are
//! responsible for validation and for disposing of the uploaded file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::gemini::{LanguageModel, ModelRequest};
use crate::normalize::{self, RiskAnalysis};
use crate::prompt;
use crate::sentiment::{self, Sentiment};

/// Fixed confidence shown next to every model answer.
pub const ANSWER_PROBABILITY: &str = "99.0%";

/// One answer in the question-answering response array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub probability: String,
    pub analyse: Sentiment,
}

/// Answer `question` from `document`. The document must already be non-blank.
pub async fn answer_question(
    model: &dyn LanguageModel,
    document: &str,
    question: &str,
) -> Result<Vec<Answer>> {
    let request = ModelRequest::text(prompt::question_prompt(document, question));

    debug!("Asking {} a question over {} chars", model.name(), document.chars().count());
    let raw = model
        .generate(&request)
        .await
        .context("Question answering failed")?;

    let answer = normalize::normalize_answer(&raw);
    let analyse = sentiment::classify(&answer);
    info!("Answer ready ({} chars, {:?})", answer.len(), analyse);

    Ok(vec![Answer {
        answer,
        probability: ANSWER_PROBABILITY.to_string(),
        analyse,
    }])
}

/// Risk analysis of `document`. Blank documents short-circuit without a
/// model call; unparseable model output degrades instead of failing.
pub async fn analyze_risks(model: &dyn LanguageModel, document: &str) -> Result<RiskAnalysis> {
    if document.trim().is_empty() {
        info!("Empty document, skipping risk analysis");
        return Ok(RiskAnalysis::empty_document());
    }

    let request = ModelRequest::json(prompt::risk_prompt(document));

    debug!("Requesting risk analysis from {}", model.name());
    let raw = model.generate(&request).await.context("Risk analysis failed")?;
    debug!("Raw risk analysis length: {} chars", raw.len());

    Ok(normalize::parse_risk_analysis(&raw))
}

/// Up to five paraphrases of `text`, or `text` itself if the model gave none.
pub async fn paraphrase(model: &dyn LanguageModel, text: &str) -> Result<Vec<String>> {
    let request = ModelRequest::text(prompt::paraphrase_prompt(text));
    let raw = model.generate(&request).await.context("Paraphrase failed")?;

    let paraphrases = normalize::parse_paraphrases(&raw);
    if paraphrases.is_empty() {
        debug!("Model returned no paraphrases, echoing input");
        return Ok(vec![text.trim().to_string()]);
    }
    Ok(paraphrases)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted model that records the requests it receives.
    pub struct StubModel {
        reply: Result<String, String>,
        pub requests: Mutex<Vec<ModelRequest>>,
        calls: AtomicUsize,
    }

    impl StubModel {
        pub fn replying(text: impl Into<String>) -> Self {
            Self {
                reply: Ok(text.into()),
                requests: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(message: impl Into<String>) -> Self {
            Self {
                reply: Err(message.into()),
                requests: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_prompt(&self) -> Option<String> {
            self.requests.lock().unwrap().last().map(|r| r.prompt.clone())
        }
    }

    #[async_trait::async_trait]
    impl LanguageModel for StubModel {
        fn name(&self) -> &str {
            "stub"
        }

        async fn generate(&self, request: &ModelRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            self.reply.clone().map_err(|e| anyhow::anyhow!(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StubModel;
    use super::*;
    use crate::normalize::UNPARSEABLE_SUMMARY;
    use crate::prompt::{NO_ANSWER, TRUNCATION_MARKER};

    #[tokio::test]
    async fn test_answer_shape() {
        let model = StubModel::replying("  The Licensor grants a worldwide license. ");
        let answers = answer_question(&model, "contract text", "What is granted?")
            .await
            .unwrap();
        assert_eq!(
            answers,
            vec![Answer {
                answer: "The Licensor grants a worldwide license.".to_string(),
                probability: "99.0%".to_string(),
                analyse: Sentiment::Positive,
            }]
        );
        let prompt = model.last_prompt().unwrap();
        assert!(prompt.contains("contract text"));
        assert!(prompt.contains("What is granted?"));
        assert!(!model.requests.lock().unwrap()[0].json_response);
    }

    #[tokio::test]
    async fn test_empty_answer_is_sentinel() {
        let model = StubModel::replying("");
        let answers = answer_question(&model, "doc", "q").await.unwrap();
        assert_eq!(answers[0].answer, NO_ANSWER);
        assert_eq!(answers[0].analyse, Sentiment::Neutral);
    }

    #[tokio::test]
    async fn test_answer_model_error_propagates() {
        let model = StubModel::failing("connection reset");
        let err = answer_question(&model, "doc", "q").await.unwrap_err();
        assert!(format!("{:#}", err).contains("connection reset"));
    }

    #[tokio::test]
    async fn test_long_document_truncated_in_prompt() {
        let model = StubModel::replying("ok");
        let doc = "z".repeat(prompt::QA_CONTEXT_BUDGET * 2);
        answer_question(&model, &doc, "q").await.unwrap();
        let sent = model.last_prompt().unwrap();
        assert!(sent.contains(TRUNCATION_MARKER));
        assert!(!sent.contains(&doc));
    }

    #[tokio::test]
    async fn test_risk_empty_document_skips_model() {
        let model = StubModel::replying("unused");
        let analysis = analyze_risks(&model, "  \n\t").await.unwrap();
        assert_eq!(analysis, RiskAnalysis::empty_document());
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_risk_parses_fenced_json() {
        let model = StubModel::replying("```json\n{\"summary\": \"s\", \"detailed\": \"d\"}\n```");
        let analysis = analyze_risks(&model, "doc").await.unwrap();
        assert_eq!(analysis.summary, "s");
        assert_eq!(analysis.detailed, "d");
        assert!(model.requests.lock().unwrap()[0].json_response);
    }

    #[tokio::test]
    async fn test_risk_degrades_on_prose() {
        let model = StubModel::replying("I think the contract is fine.");
        let analysis = analyze_risks(&model, "doc").await.unwrap();
        assert_eq!(analysis.summary, UNPARSEABLE_SUMMARY);
        assert_eq!(analysis.detailed, "I think the contract is fine.");
    }

    #[tokio::test]
    async fn test_risk_model_error_is_error() {
        let model = StubModel::failing("503 Service Unavailable");
        assert!(analyze_risks(&model, "doc").await.is_err());
    }

    #[tokio::test]
    async fn test_paraphrase_lines_and_fallback() {
        let model = StubModel::replying("- One\n- Two\n- Three");
        assert_eq!(
            paraphrase(&model, "Original.").await.unwrap(),
            vec!["One", "Two", "Three"]
        );

        let model = StubModel::replying("   ");
        assert_eq!(paraphrase(&model, " Original. ").await.unwrap(), vec!["Original."]);
    }
}
