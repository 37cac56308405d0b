//! Keyword Extractor: deterministic, frequency-ranked keywords from free text.
//!
//! Tokens keep internal `+`, `#`, `.` and `-` so that "C++", "C#" and "Node.js"
//! survive intact. Trailing `.` / `-` (sentence punctuation, dangling hyphens) are
//! trimmed. Tokens start only at a word boundary, so ASCII runs inside accented or
//! digit-prefixed words ("résumé", "100gbps") are not emitted. Ties in frequency keep
//! first-occurrence order.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Maximum number of keywords returned.
pub const MAX_KEYWORDS: usize = 50;
const MIN_TOKEN_LEN: usize = 3;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did",
    "will", "would", "could", "should", "may", "might", "must", "shall", "can", "this", "that",
    "these", "those", "i", "you", "he", "she", "it", "we", "they",
];

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-z][a-z0-9+#.\-]*").expect("token pattern is valid"));

/// Returns up to 50 keywords ordered by descending frequency.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();

    // (token, count) in first-occurrence order
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for token in TOKEN_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().trim_end_matches(['.', '-']))
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN && !STOP_WORDS.contains(t))
    {
        match index.get(token) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(token, counts.len());
                counts.push((token, 1));
            }
        }
    }

    // sort_by is stable, so equal counts keep first-occurrence order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(|(token, _)| token.to_string())
        .collect()
}
