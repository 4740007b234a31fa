//! Field-declaration extraction and field-usage-replacement detection.
//!
//! Grounded on `matcher.py::_extract_fields`, `_detect_field_changes`,
//! `_detect_field_usage_replacements`, `_extract_field_usage_pattern`,
//! `_find_field_replacement`, `_calculate_replacement_confidence`,
//! `_extract_replacement_pattern`, `_get_expected_replacement_area`.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::similarity::combined_similarity;
use crate::types::ScopeMap;

fn field_decl_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:public|private|protected)\s+(?:\w+\s+)+\s*(\w+)\s*;").unwrap())
}

/// Declaration-like field names found in `lines`.
pub fn extract_fields(lines: &[String]) -> HashSet<String> {
    let mut fields = HashSet::new();
    for line in lines {
        for caps in field_decl_re().captures_iter(line) {
            fields.insert(caps[1].to_string());
        }
    }
    fields
}

/// Find the single field declared on the old side, absent on the new
/// side, whose removal triggers usage-replacement analysis. Picks the
/// lexicographically smallest removed name if several qualify, for
/// determinism (the original iterates a hash-ordered `set` and the last
/// one visited wins — not reproducible across runs, so this crate picks
/// a fixed, deterministic tie-break instead).
pub fn detect_removed_field(old_lines: &[String], new_lines: &[String]) -> Option<(usize, String)> {
    let old_fields = extract_fields(old_lines);
    let new_fields = extract_fields(new_lines);

    let mut removed: Vec<&String> = old_fields.difference(&new_fields).collect();
    removed.sort();

    let field = removed.into_iter().next()?.clone();

    for (i, line) in old_lines.iter().enumerate() {
        let looks_like_decl = ["public", "private", "protected"]
            .iter()
            .any(|m| line.contains(m));
        if line.contains(field.as_str()) && looks_like_decl {
            return Some((i, field));
        }
    }
    None
}

/// One usage site's classified access pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsagePattern {
    MemberAccess(String),
    Equality(String),
    Assignment,
    Cast,
}

impl UsagePattern {
    fn describe(&self, field: &str) -> String {
        match self {
            UsagePattern::MemberAccess(member) => format!("{field}.{member}"),
            UsagePattern::Equality(rhs) => format!("{field} == {rhs}"),
            UsagePattern::Assignment => format!("{field} assignment"),
            UsagePattern::Cast => format!("({field})"),
        }
    }
}

fn member_access_re(field: &str) -> Regex {
    Regex::new(&format!(r"{}\.(\w+)", regex::escape(field))).unwrap()
}
fn equality_re(field: &str) -> Regex {
    Regex::new(&format!(r"{}\s*==\s*(\w+)", regex::escape(field))).unwrap()
}
fn assignment_re(field: &str) -> Regex {
    Regex::new(&format!(r"{}\s*=\s*", regex::escape(field))).unwrap()
}
fn cast_re(field: &str) -> Regex {
    Regex::new(&format!(r"\(\s*{}\s*\)", regex::escape(field))).unwrap()
}

/// Classify how `field` is used on `line`, in priority order member
/// access, equality, assignment, cast.
pub fn classify_usage(line: &str, field: &str) -> Option<(UsagePattern, String)> {
    if let Some(caps) = member_access_re(field).captures(line) {
        let pattern = UsagePattern::MemberAccess(caps[1].to_string());
        let desc = pattern.describe(field);
        return Some((pattern, desc));
    }
    if let Some(caps) = equality_re(field).captures(line) {
        let pattern = UsagePattern::Equality(caps[1].to_string());
        let desc = pattern.describe(field);
        return Some((pattern, desc));
    }
    if assignment_re(field).is_match(line) {
        let pattern = UsagePattern::Assignment;
        let desc = pattern.describe(field);
        return Some((pattern, desc));
    }
    if cast_re(field).is_match(line) {
        let pattern = UsagePattern::Cast;
        let desc = pattern.describe(field);
        return Some((pattern, desc));
    }
    None
}

/// The window of new-side indices a replacement is expected in: ±15
/// around `old_idx`, widened to cover the new side's matching scope
/// when one exists.
pub fn expected_replacement_area(
    old_idx: usize,
    new_len: usize,
    old_scope_name: &str,
    new_scopes: &ScopeMap,
) -> Vec<usize> {
    let mut start = old_idx.saturating_sub(15);
    let mut end = (old_idx + 15).min(new_len);

    if let Some(range) = new_scopes.range_of(old_scope_name) {
        start = start.min(range.start);
        end = end.max(range.end);
    }

    (start..end).collect()
}

/// Result of the best replacement search for one old usage site.
#[derive(Debug, Clone)]
pub struct FieldReplacement {
    pub pattern: String,
    pub line_idx: usize,
    pub confidence: f64,
}

/// Find the new-side line most likely to be the replacement for
/// `old_pattern`, scanning `expected_area`.
pub fn find_field_replacement(
    old_pattern: &str,
    new_lines: &[String],
    removed_field: &str,
    expected_area: &[usize],
) -> Option<FieldReplacement> {
    let field_re = Regex::new(&format!(r"\b{}\b", regex::escape(removed_field))).unwrap();

    let mut best: Option<FieldReplacement> = None;
    let mut best_confidence = 0.0;

    for &new_idx in expected_area {
        let new_line = &new_lines[new_idx];
        if field_re.is_match(new_line) {
            continue;
        }

        let confidence = replacement_confidence(old_pattern, new_line, removed_field);

        if confidence > best_confidence {
            best_confidence = confidence;
            best = Some(FieldReplacement {
                pattern: extract_replacement_pattern(new_line, removed_field, old_pattern),
                line_idx: new_idx,
                confidence,
            });
        }
    }

    if best_confidence > 0.3 {
        best
    } else {
        None
    }
}

fn replacement_confidence(old_pattern: &str, new_line: &str, removed_field: &str) -> f64 {
    let mut confidence = 0.0;

    if old_pattern.contains(".id") && new_line.contains(".id") {
        confidence += 0.7;
    } else if old_pattern.contains("==") && new_line.contains("==") {
        let old_type = old_pattern.rsplit("==").next().unwrap_or("").trim();
        let eq_re = Regex::new(r"==\s*(\w+)").unwrap();
        if let Some(caps) = eq_re.captures(new_line) {
            if old_type == &caps[1] {
                confidence += 0.9;
            } else {
                confidence += 0.4;
            }
        } else {
            confidence += 0.4;
        }
    } else if old_pattern.contains("assignment") && new_line.contains('=') {
        confidence += 0.5;
    }

    let field_re = Regex::new(&format!(r"\b{}\b", regex::escape(removed_field))).unwrap();
    let old_simple = field_re.replace_all(old_pattern, "FIELD").into_owned();
    let binding_re = Regex::new(r"\b\w+Binding\b").unwrap();
    let new_simple = binding_re.replace_all(new_line, "TYPE").into_owned();

    if combined_similarity(&old_simple, &new_simple, "", "", (0.6, 0.4), || {}) > 0.5 {
        confidence += 0.3;
    }

    confidence.min(1.0)
}

fn extract_replacement_pattern(line: &str, _removed_field: &str, old_pattern: &str) -> String {
    if old_pattern.contains(".id") {
        let re = Regex::new(r"(\w+\.id)").unwrap();
        if let Some(caps) = re.captures(line) {
            return caps[1].to_string();
        }
    }
    if old_pattern.contains("==") {
        let re = Regex::new(r"(\w+\s*==\s*\w+)").unwrap();
        if let Some(caps) = re.captures(line) {
            return caps[1].to_string();
        }
    }
    if line.contains('=') && old_pattern.contains("assignment") {
        let mut parts = line.splitn(2, '=');
        if let (Some(lhs), Some(_)) = (parts.next(), parts.next()) {
            return format!("{} = ...", lhs.trim());
        }
    }

    let words: Vec<&str> = line.split_whitespace().collect();
    if !words.is_empty() {
        if let Some(dotted) = words.iter().find(|w| w.contains('.')) {
            return dotted.to_string();
        }
        if words[0].len() > 3 {
            return words[0].to_string();
        }
        return line.chars().take(30).collect();
    }
    line.chars().take(30).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extract_fields() {
        let src = lines(&["private TypeBinding fieldBinding;", "int x;"]);
        let fields = extract_fields(&src);
        assert!(fields.contains("fieldBinding"));
        assert!(!fields.contains("x"));
    }

    #[test]
    fn test_detect_removed_field() {
        let old = lines(&["private TypeBinding fieldBinding;", "return fieldBinding.id;"]);
        let new = lines(&["return this.resolvedType.id;"]);
        let (idx, name) = detect_removed_field(&old, &new).unwrap();
        assert_eq!(idx, 0);
        assert_eq!(name, "fieldBinding");
    }

    #[test]
    fn test_classify_member_access() {
        let (pattern, desc) = classify_usage("return fieldBinding.id;", "fieldBinding").unwrap();
        assert_eq!(pattern, UsagePattern::MemberAccess("id".to_string()));
        assert_eq!(desc, "fieldBinding.id");
    }

    #[test]
    fn test_classify_assignment() {
        let (pattern, _) = classify_usage("fieldBinding = null;", "fieldBinding").unwrap();
        assert_eq!(pattern, UsagePattern::Assignment);
    }
}
