//! Catalog of known semantically-equivalent rewrite shapes.
//!
//! Grounded on `matcher.py::_detect_semantic_equivalences` /
//! `_check_semantic_patterns`. The three entries are specific to this
//! codebase's own refactoring history (a field-consolidation onto
//! `this.resolvedType`, a return-simplification, and a null-check
//! restructuring) rather than general Java idioms — carried over
//! verbatim since the structural passes key off these exact shapes.

use regex::Regex;
use std::sync::OnceLock;

struct SemanticPattern {
    old_re: &'static str,
    new_re: &'static str,
    confidence: f64,
}

const PATTERNS: &[SemanticPattern] = &[
    SemanticPattern {
        old_re: r"(\w+)\.id",
        new_re: r"this\.resolvedType\.id",
        confidence: 0.8,
    },
    SemanticPattern {
        old_re: r"return\s+this\.expressionType\s*=\s*\w+\s*=\s*.*",
        new_re: r"return\s+this\.resolvedType",
        confidence: 0.7,
    },
    SemanticPattern {
        old_re: r"if\s*\(\s*\w+\s*==\s*null\s*\)\s*return\s+null",
        new_re: r"if\s*\(\s*\w+\s*!=\s*null\s*\)\s*\{",
        confidence: 0.6,
    },
];

fn compiled_pairs() -> &'static Vec<(Regex, Regex, f64)> {
    static CACHE: OnceLock<Vec<(Regex, Regex, f64)>> = OnceLock::new();
    CACHE.get_or_init(|| {
        PATTERNS
            .iter()
            .map(|p| {
                (
                    Regex::new(p.old_re).unwrap(),
                    Regex::new(p.new_re).unwrap(),
                    p.confidence,
                )
            })
            .collect()
    })
}

/// The compiled catalog, exposed for callers (the matcher's semantic-
/// pattern pass) that need to scan old/new shapes independently rather
/// than through the paired `semantic_usage_boost` check.
pub fn catalog() -> &'static Vec<(Regex, Regex, f64)> {
    compiled_pairs()
}

/// The largest `confidence * 0.5` among catalog entries whose old shape
/// matches `old_line` and whose new shape matches `new_line`; 0.0 if
/// none match. Every entry is checked (not just the first hit), taking
/// the max boost across all matching entries.
pub fn semantic_usage_boost(old_line: &str, new_line: &str) -> f64 {
    let mut boost = 0.0_f64;
    for (old_re, new_re, confidence) in compiled_pairs() {
        if old_re.is_match(old_line) && new_re.is_match(new_line) {
            boost = boost.max(confidence * 0.5);
        }
    }
    boost
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_consolidation_pattern_matches() {
        let boost = semantic_usage_boost("fieldBinding.id", "this.resolvedType.id");
        assert_eq!(boost, 0.4);
    }

    #[test]
    fn test_conditional_restructuring_pattern_matches() {
        let boost = semantic_usage_boost(
            "if (x == null) return null",
            "if (x != null) {",
        );
        assert_eq!(boost, 0.3);
    }

    #[test]
    fn test_no_match_is_zero() {
        assert_eq!(semantic_usage_boost("foo()", "bar()"), 0.0);
    }

    #[test]
    fn test_best_of_multiple_matches_wins() {
        // Both the field-consolidation and nothing else should match here;
        // confirms boost is the matching entry's own value, not a sum.
        let boost = semantic_usage_boost("x.id", "this.resolvedType.id");
        assert_eq!(boost, 0.4);
    }
}
