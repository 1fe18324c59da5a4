//! Deterministic keyword extraction from abstract text.

use indexmap::IndexMap;

use crate::constants::keywords::{MIN_TOKEN_LEN, STOPWORDS, DEFAULT_TOP_K};
use crate::types::Keyword;

/// Extract up to `top_k` salient keywords from `abstract_text`.
///
/// Tokens are alphabetic-leading runs of letters/digits/hyphen/apostrophe,
/// lowercased; tokens shorter than [`MIN_TOKEN_LEN`] and stopwords are
/// dropped. Ranking is by descending frequency with ties broken by first
/// appearance in the token stream, so the output is stable for a given
/// input. Pure: no external state, no randomness.
pub fn extract_keywords(abstract_text: &str, top_k: usize) -> Vec<Keyword> {
    if top_k == 0 {
        return Vec::new();
    }
    let mut counts: IndexMap<Keyword, usize> = IndexMap::new();
    for token in tokenize(abstract_text) {
        if token.len() < MIN_TOKEN_LEN || STOPWORDS.contains(&token.as_str()) {
            continue;
        }
        *counts.entry(token).or_insert(0) += 1;
    }
    let mut ranked: Vec<(Keyword, usize)> = counts.into_iter().collect();
    // Stable sort keeps insertion (first-occurrence) order for equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(top_k)
        .map(|(token, _)| token)
        .collect()
}

/// Extract keywords with the default cap.
pub fn extract_default(abstract_text: &str) -> Vec<Keyword> {
    extract_keywords(abstract_text, DEFAULT_TOP_K)
}

/// Split text into lowercase tokens: an ASCII letter followed by any run
/// of letters, digits, hyphens, or apostrophes.
fn tokenize(text: &str) -> Vec<Keyword> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if current.is_empty() {
            if ch.is_ascii_alphabetic() {
                current.push(ch.to_ascii_lowercase());
            }
        } else if ch.is_ascii_alphanumeric() || ch == '-' || ch == '\'' {
            current.push(ch.to_ascii_lowercase());
        } else {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_by_count_then_first_appearance() {
        let keywords = extract_keywords(
            "We propose a new method for robust learning robust robust",
            3,
        );
        assert_eq!(keywords, vec!["robust", "new", "learning"]);
    }

    #[test]
    fn extraction_is_deterministic() {
        let text = "Graph neural networks learn graph structure from graph data.";
        assert_eq!(extract_keywords(text, 5), extract_keywords(text, 5));
    }

    #[test]
    fn drops_stopwords_and_short_tokens() {
        let keywords = extract_keywords("The a an of to X is QA on GPU", 10);
        assert!(!keywords.iter().any(|k| STOPWORDS.contains(&k.as_str())));
        assert!(keywords.iter().all(|k| k.len() >= MIN_TOKEN_LEN));
        assert_eq!(keywords, vec!["qa", "gpu"]);
    }

    #[test]
    fn tokens_keep_hyphens_apostrophes_and_digits() {
        let keywords = extract_keywords("Zero-shot zero-shot GPT-4 doesn't 3D", 10);
        assert_eq!(keywords, vec!["zero-shot", "gpt-4", "doesn't"]);
    }

    #[test]
    fn tokens_must_start_with_a_letter() {
        let keywords = extract_keywords("42 1960s resnet50", 10);
        // "1960s" yields no token ("s" is too short); digits never lead.
        assert_eq!(keywords, vec!["resnet50"]);
    }

    #[test]
    fn respects_top_k_and_zero() {
        let text = "alpha beta gamma delta epsilon";
        assert_eq!(extract_keywords(text, 2), vec!["alpha", "beta"]);
        assert!(extract_keywords(text, 0).is_empty());
        assert_eq!(extract_default(text).len(), 5);
    }

    #[test]
    fn empty_abstract_yields_nothing() {
        assert!(extract_keywords("", 10).is_empty());
    }
}
