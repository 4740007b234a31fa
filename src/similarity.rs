//! Multi-signal line similarity: content, context, and their weighted sum.
//!
//! Grounded line-for-line on the original `similarity.py`: the content
//! term normalizes identifiers/numbers to `VAR`/`NUM` tokens before a
//! normalized edit distance; the context term is a hand-rolled TF-IDF
//! cosine (the teacher has no TF-IDF dependency and hand-rolls SimHash
//! itself, so this crate does the same rather than reaching for a heavy
//! vectorizer crate).

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d+\b").unwrap())
}

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[_a-zA-Z]\w*\b").unwrap())
}

/// Replace integer literals with `NUM`, then identifier tokens with
/// `VAR`. Order matters: numbers are substituted first so the
/// identifier regex never has a chance to re-tokenize `NUM` (in practice
/// `NUM` itself would also match `\w+`, but by then there is nothing
/// left distinguishing it from any other token, so doing numbers first
/// keeps literal digit runs from leaking into content comparison as if
/// they were names).
pub fn normalize_code(line: &str) -> String {
    let after_numbers = number_re().replace_all(line, "NUM");
    identifier_re().replace_all(&after_numbers, "VAR").into_owned()
}

/// `1 − Levenshtein(a′,b′)/max(|a′|,|b′|)` over VAR/NUM-normalized text.
/// Both empty → 1.0; exactly one empty → 0.0.
pub fn content_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let norm_a = normalize_code(a);
    let norm_b = normalize_code(b);

    let distance = strsim::levenshtein(&norm_a, &norm_b);
    let max_len = norm_a.chars().count().max(norm_b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (distance as f64 / max_len as f64)
}

/// Cosine similarity over a hand-rolled TF-IDF vectorization of two
/// context strings (the two-document "corpus" is exactly `{a, b}`,
/// matching `TfidfVectorizer().fit([a_context, b_context])` in the
/// original). Empty input on either side, or an empty resulting
/// vocabulary, yields 0.0 — the latter emits a one-time advisory via
/// the caller-supplied `warn_once` hook rather than raising.
pub fn context_similarity(a_context: &str, b_context: &str, mut warn_once: impl FnMut()) -> f64 {
    if a_context.trim().is_empty() || b_context.trim().is_empty() {
        return 0.0;
    }

    let tokens_a = tokenize(a_context);
    let tokens_b = tokenize(b_context);

    let mut vocabulary: Vec<String> = Vec::new();
    for tok in tokens_a.iter().chain(tokens_b.iter()) {
        if !vocabulary.contains(tok) {
            vocabulary.push(tok.clone());
        }
    }

    if vocabulary.is_empty() {
        warn_once();
        return 0.0;
    }

    let docs = [tokens_a, tokens_b];
    let mut doc_freq: HashMap<&str, usize> = HashMap::new();
    for term in &vocabulary {
        let df = docs.iter().filter(|d| d.contains(term)).count();
        doc_freq.insert(term.as_str(), df);
    }

    let tfidf = |doc: &[String]| -> Vec<f64> {
        let total = doc.len().max(1) as f64;
        vocabulary
            .iter()
            .map(|term| {
                let tf = doc.iter().filter(|t| *t == term).count() as f64 / total;
                let df = *doc_freq.get(term.as_str()).unwrap_or(&0) as f64;
                // Smoothed IDF, matching scikit-learn's default smoothing:
                // idf = ln((1+n)/(1+df)) + 1, n = number of documents (2).
                let idf = ((1.0 + docs.len() as f64) / (1.0 + df)).ln() + 1.0;
                tf * idf
            })
            .collect()
    };

    let vec_a = tfidf(&docs[0]);
    let vec_b = tfidf(&docs[1]);
    cosine_similarity(&vec_a, &vec_b)
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// `wc·content + wx·context`. Defaults (0.6, 0.4) for primary matching;
/// callers may pass (0.7, 0.3) in reorder detection.
pub fn combined_similarity(
    a: &str,
    b: &str,
    a_context: &str,
    b_context: &str,
    weights: (f64, f64),
    warn_once: impl FnMut(),
) -> f64 {
    let (wc, wx) = weights;
    let c_sim = content_similarity(a, b);
    let x_sim = context_similarity(a_context, b_context, warn_once);
    wc * c_sim + wx * x_sim
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_similarity_both_empty() {
        assert_eq!(content_similarity("", ""), 1.0);
    }

    #[test]
    fn test_content_similarity_one_empty() {
        assert_eq!(content_similarity("a", ""), 0.0);
        assert_eq!(content_similarity("", "a"), 0.0);
    }

    #[test]
    fn test_content_similarity_identical() {
        assert_eq!(content_similarity("a = 1;", "a = 1;"), 1.0);
    }

    #[test]
    fn test_content_similarity_renamed_identifier_still_high() {
        // Different identifier, same structure -> both collapse to VAR.
        let sim = content_similarity("int countTb = 0;", "int countType = 0;");
        assert!(sim > 0.9, "expected high structural similarity, got {sim}");
    }

    #[test]
    fn test_normalize_code_replaces_numbers_and_identifiers() {
        assert_eq!(normalize_code("x = 42;"), "VAR VAR VAR;");
    }

    #[test]
    fn test_context_similarity_empty_side() {
        assert_eq!(context_similarity("", "something", || {}), 0.0);
        assert_eq!(context_similarity("something", "", || {}), 0.0);
    }

    #[test]
    fn test_context_similarity_identical_strings_is_one() {
        let sim = context_similarity("a b c", "a b c", || {});
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_context_similarity_disjoint_is_zero() {
        let sim = context_similarity("alpha beta", "gamma delta", || {});
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn test_combined_similarity_weights() {
        let score = combined_similarity("a = 1;", "a = 1;", "x", "x", (0.6, 0.4), || {});
        assert!((score - 1.0).abs() < 1e-9);
    }
}
