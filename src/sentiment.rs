//! Keyword heuristic labelling an answer as favorable or not.
//!
//! Each listed term scores at most once: it either appears somewhere in the
//! lower-cased answer or it does not, and repeats of the same term add
//! nothing. Matching is plain substring containment, so "terminat" also hits
//! "termination" and "risk" hits "asterisk".

use serde::{Deserialize, Serialize};

const POSITIVE_TERMS: [&str; 6] = ["complies", "allows", "grants", "provides", "includes", "covered"];

const NEGATIVE_TERMS: [&str; 7] = [
    "does not",
    "shall not",
    "prohibited",
    "terminat",
    "risk",
    "penalty",
    "liable",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// Net keyword score: +1 per positive term present, -1 per negative term present.
pub fn score(answer: &str) -> i32 {
    let lower = answer.to_lowercase();
    let hits = |terms: &[&str]| terms.iter().filter(|t| lower.contains(*t)).count() as i32;
    hits(&POSITIVE_TERMS) - hits(&NEGATIVE_TERMS)
}

pub fn classify(answer: &str) -> Sentiment {
    match score(answer) {
        s if s > 0 => Sentiment::Positive,
        s if s < 0 => Sentiment::Negative,
        _ => Sentiment::Neutral,
    }
}
