//! Split detection: recognize an old line that was broken across
//! several new lines.
//!
//! Two rules, tried in order. The additive rule runs first and is a
//! new extension beyond the original algorithm (its own split
//! heuristics gate on `len(old_line) >= 20`, which rejects short
//! additive expressions like `x = a + b + c;` outright — this crate's
//! own worked example needs the group accepted on reconstruction alone,
//! with no length or similarity gate). The fallback is the original's
//! generic `_is_likely_split_candidate` / `_extend_split_group_safely`
//! / `_validate_split` pipeline, grounded on `matcher.py` lines
//! 1314-1417, operating on raw (comment/whitespace-trimmed, but
//! punctuation-preserving) text since it keys off `;` and brace
//! literals that the content normalizer strips.

use std::collections::{HashSet, VecDeque};

use crate::similarity::combined_similarity;
use crate::types::{LineSide, Mapping, Matches};

const GENERIC_MAX_GROUP: usize = 5;

/// Parse `lhs = term (+ term)+;` into the assigned name and its additive
/// terms, in order. `None` if the line isn't shaped like an additive
/// assignment (no top-level `=`, or fewer than two `+`-joined terms).
fn parse_additive_assignment(line: &str) -> Option<(String, Vec<String>)> {
    let eq_pos = line.find('=')?;
    if line[eq_pos..].starts_with("==") {
        return None;
    }
    let lhs = line[..eq_pos].trim().to_string();
    if lhs.is_empty() {
        return None;
    }
    let rhs = line[eq_pos + 1..].trim().trim_end_matches(';').trim();
    if !rhs.contains('+') {
        return None;
    }
    let terms: Vec<String> = rhs.split('+').map(|t| t.trim().to_string()).collect();
    if terms.len() < 2 || terms.iter().any(|t| t.is_empty()) {
        return None;
    }
    Some((lhs, terms))
}

/// Consume a prefix of `remaining` that `body` (one new line, `;`/lhs
/// stripped) accounts for: either `lhs = term (+ term)*` consuming
/// however many terms appear, or `lhs += term` consuming exactly one.
/// Returns the count consumed, 0 if `body` doesn't match either shape
/// or doesn't line up with what's still expected next.
fn consume_terms(body: &str, lhs: &str, remaining: &mut VecDeque<String>) -> usize {
    if let Some(rhs) = body.strip_prefix(&format!("{lhs} +=")).or_else(|| body.strip_prefix(&format!("{lhs}+="))) {
        let term = rhs.trim();
        if remaining.front().map(String::as_str) == Some(term) {
            remaining.pop_front();
            return 1;
        }
        return 0;
    }

    if let Some(rhs) = body.strip_prefix(&format!("{lhs} =")).or_else(|| body.strip_prefix(&format!("{lhs}="))) {
        let parts: Vec<&str> = rhs.split('+').map(|p| p.trim()).collect();
        if parts.is_empty() || parts.iter().any(|p| p.is_empty()) {
            return 0;
        }
        let mut consumed = 0;
        for part in &parts {
            if remaining.front().map(String::as_str) == Some(*part) {
                remaining.pop_front();
                consumed += 1;
            } else {
                break;
            }
        }
        if consumed == parts.len() {
            return consumed;
        }
        return 0;
    }

    0
}

/// If `old_line` is an additive assignment (`x = a + b + c;`-shaped)
/// and the new lines starting at `start_idx` account for every term in
/// order — as an initial `lhs = ...` chunk followed by `lhs += term`
/// continuations — return the group of new indices involved. Bypasses
/// every length/similarity gate the generic rule applies:
/// reconstruction of the term sequence is itself the proof.
fn try_additive_split(old_line: &str, new_lines: &LineSide, start_idx: usize) -> Option<Vec<usize>> {
    let (lhs, terms) = parse_additive_assignment(old_line)?;
    let mut remaining: VecDeque<String> = terms.into_iter().collect();

    let mut group = Vec::new();
    let max_idx = (start_idx + GENERIC_MAX_GROUP).min(new_lines.len());

    for idx in start_idx..max_idx {
        if remaining.is_empty() {
            break;
        }
        let line = new_lines.raw(idx).trim();
        if line.is_empty() {
            continue;
        }
        let body = line.trim_end_matches(';').trim();
        if consume_terms(body, &lhs, &mut remaining) == 0 {
            return None;
        }
        group.push(idx);
    }

    if remaining.is_empty() && group.len() > 1 {
        Some(group)
    } else {
        None
    }
}

fn is_likely_split_candidate(old_line: &str, new_lines: &LineSide, start_idx: usize) -> bool {
    let current_text = new_lines.raw(start_idx).trim();

    if old_line.chars().count() < 20 || current_text.chars().count() < 10 {
        return false;
    }
    if matches!(old_line, "{" | "}" | "};") || matches!(current_text, "{" | "}" | "};") {
        return false;
    }
    if old_line.starts_with("import ") || old_line.starts_with("public ") || old_line.starts_with("private ") {
        return false;
    }

    let current_similarity = combined_similarity(old_line, current_text, "", "", (0.6, 0.4), || {});
    if current_similarity > 0.9 {
        return false;
    }

    let indicators = [
        (current_text.chars().count() as f64) < (old_line.chars().count() as f64) * 0.6,
        old_line.ends_with(';') && !current_text.ends_with(';'),
        old_line.contains(';') && old_line.matches(';').count() > 1 && !current_text.contains(';'),
        (old_line.contains('=') && old_line.contains('(')) && old_line.chars().count() > 40,
    ];

    indicators.iter().any(|&i| i)
}

fn extend_split_group_safely(
    old_line: &str,
    new_lines: &LineSide,
    start_idx: usize,
    threshold_increase: f64,
) -> Vec<usize> {
    let mut group = vec![start_idx];
    let mut combined_text = new_lines.raw(start_idx).trim().to_string();
    let mut best_score = combined_similarity(old_line, &combined_text, "", "", (0.6, 0.4), || {});

    let max_split_size = GENERIC_MAX_GROUP.min(old_line.chars().count() / 20).max(1);

    let end = (start_idx + max_split_size + 1).min(new_lines.len());
    for next_idx in (start_idx + 1)..end {
        let next_line = new_lines.raw(next_idx).trim();
        if next_line.is_empty() || matches!(next_line, "{" | "}" | "};") {
            continue;
        }

        let test_combined = format!("{combined_text} {next_line}");
        let test_score = combined_similarity(old_line, &test_combined, "", "", (0.6, 0.4), || {});

        if test_score > best_score + threshold_increase.max(0.05) {
            group.push(next_idx);
            combined_text = test_combined;
            best_score = test_score;
        } else {
            break;
        }
    }

    group
}

fn validate_split(old_line: &str, split_group: &[usize], new_lines: &LineSide) -> bool {
    if split_group.len() < 2 {
        return false;
    }

    let combined_text = split_group
        .iter()
        .map(|&idx| new_lines.raw(idx).trim())
        .collect::<Vec<_>>()
        .join(" ");

    let mut best_individual_score = 0.0_f64;
    for &idx in split_group {
        let individual = combined_similarity(old_line, new_lines.raw(idx).trim(), "", "", (0.6, 0.4), || {});
        best_individual_score = best_individual_score.max(individual);
    }

    let combined_score = combined_similarity(old_line, &combined_text, "", "", (0.6, 0.4), || {});
    if combined_score < best_individual_score + 0.1 {
        return false;
    }

    let old_tokens: HashSet<String> = tokenize_lower(old_line);
    let combined_tokens: HashSet<String> = tokenize_lower(&combined_text);

    let overlap = old_tokens.intersection(&combined_tokens).count();
    if (overlap as f64) < (old_tokens.len() as f64) * 0.6 {
        return false;
    }

    true
}

fn tokenize_lower(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect()
}

/// For every resolved match, check whether the old line was split
/// across several new lines; widen that match's value to the full
/// group when so.
pub fn detect_splits(old: &LineSide, new: &LineSide, matches: &Matches, threshold_increase: f64) -> Mapping {
    let mut updated = Mapping::new();

    for (&old_idx, m) in matches {
        let old_line = old.raw(old_idx).trim();
        let mut group = vec![m.new_index];

        if let Some(additive_group) = try_additive_split(old_line, new, m.new_index) {
            if additive_group.len() > 1 {
                group = additive_group;
            }
        } else if is_likely_split_candidate(old_line, new, m.new_index) {
            let extended = extend_split_group_safely(old_line, new, m.new_index, threshold_increase);
            if extended.len() > 1 && validate_split(old_line, &extended, new) {
                group = extended;
            }
        }

        updated.insert(old_idx, group);
    }

    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NormalizeOptions;
    use crate::types::Match;

    fn side(lines: &[&str]) -> LineSide {
        let raw: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
        LineSide::from_raw_lines(&raw, NormalizeOptions::default())
    }

    #[test]
    fn test_additive_split_reconstructs_group() {
        let old = side(&["x = a + b + c;"]);
        let new = side(&["x = a + b;", "x += c;"]);

        let mut matches = Matches::new();
        matches.insert(0, Match { old_index: 0, new_index: 0, score: 0.5 });

        let result = detect_splits(&old, &new, &matches, 0.01);
        assert_eq!(result.get(&0).unwrap(), &vec![0, 1]);
    }

    #[test]
    fn test_no_split_for_short_identical_line() {
        let old = side(&["a = 1;"]);
        let new = side(&["a = 1;"]);

        let mut matches = Matches::new();
        matches.insert(0, Match { old_index: 0, new_index: 0, score: 1.0 });

        let result = detect_splits(&old, &new, &matches, 0.01);
        assert_eq!(result.get(&0).unwrap(), &vec![0]);
    }

    #[test]
    fn test_is_likely_split_candidate_rejects_short_old_line() {
        let new = side(&["something"]);
        assert!(!is_likely_split_candidate("short", &new, 0));
    }
}
