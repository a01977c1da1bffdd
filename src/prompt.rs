//! Prompt templates and context truncation.

/// Character budget for document text in question-answering prompts.
pub const QA_CONTEXT_BUDGET: usize = 20_000;

/// Character budget for document text in risk-analysis prompts.
pub const RISK_CONTEXT_BUDGET: usize = 30_000;

/// Appended to document text that was cut to fit its budget.
pub const TRUNCATION_MARKER: &str = "\n\n... [truncated for length]";

/// Sentinel the model is told to emit when the context has no answer.
pub const NO_ANSWER: &str = "No answer found in document";

/// Cut `text` to at most `budget` characters, appending the marker if anything
/// was dropped. A plain prefix cut on character boundaries.
pub fn truncate_context(text: &str, budget: usize) -> String {
    match text.char_indices().nth(budget) {
        None => text.to_string(),
        Some((end, _)) => {
            let mut out = String::with_capacity(end + TRUNCATION_MARKER.len());
            out.push_str(&text[..end]);
            out.push_str(TRUNCATION_MARKER);
            out
        }
    }
}

/// Question-answering prompt. Instructions follow the context so truncation
/// never touches them.
pub fn question_prompt(document: &str, question: &str) -> String {
    format!(
        "Context:\n{}\n\nQuestion:\n{}\n\nAnswer ONLY from context. If not found, say \"{}\". Be concise.",
        truncate_context(document, QA_CONTEXT_BUDGET),
        question.trim(),
        NO_ANSWER
    )
}

/// Risk-analysis prompt asking for a bare `{summary, detailed}` JSON object.
pub fn risk_prompt(document: &str) -> String {
    format!(
        r#"Analyze the following legal contract for risks, loopholes, and liabilities.

CONTEXT:
{}

Return a valid JSON with exactly two keys:
1. "summary": Top 3-5 critical risks as plain text.
2. "detailed": Comprehensive explanation citing specific clauses.

Do NOT include markdown code fences. Just raw JSON."#,
        truncate_context(document, RISK_CONTEXT_BUDGET)
    )
}

pub fn paraphrase_prompt(text: &str) -> String {
    format!(
        "Paraphrase the following sentence in 3 different ways:\n'{}'\nOutput ONLY the paraphrased sentences, one per line. No numbering or bullets.",
        text.trim()
    )
}
