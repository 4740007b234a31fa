//! The core seven-pass line matcher.
//!
//! Grounded on `matcher.py::best_match_for_each_line` and its
//! `_find_enhanced_structural_matches` / `_find_remaining_structural_matches`
//! / `_is_control_flow_line` helpers. Builds a sparse similarity matrix
//! over candidate pairs only (the original allocates a dense
//! `n_old x n_new` matrix; this crate bounds it to the candidate set,
//! per the stated complexity budget), then runs seven passes in strict
//! order, each one only touching old lines still unmatched.

use rayon::prelude::*;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use crate::config::MatchConfig;
use crate::similarity::combined_similarity;
use crate::structural::StructuralAnalysis;
use crate::types::{CandidateSet, LineSide, Match, Matches};

fn control_flow_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:if|else|for|while|return|switch|case)\b").unwrap())
}

pub fn is_control_flow_line(line: &str) -> bool {
    control_flow_re().is_match(line)
}

/// Emits the TF-IDF empty-vocabulary advisory at most once per matcher run.
/// Shared across the parallel rows of `build_similarity_matrix`, so the
/// "once" flag is an atomic rather than a plain bool.
#[derive(Default)]
struct WarnOnce(AtomicBool);

impl WarnOnce {
    fn warn(&self) {
        if !self.0.swap(true, Ordering::Relaxed) {
            tracing::warn!("context_similarity: empty vocabulary, defaulting to 0.0");
        }
    }
}

type SimMatrix = HashMap<(usize, usize), f64>;

/// One row (old line) of the similarity matrix is independent of every
/// other row, so rows are populated in parallel across old-line indices.
fn build_similarity_matrix(
    old: &LineSide,
    new: &LineSide,
    candidates: &CandidateSet,
    context_window: usize,
    warner: &WarnOnce,
) -> SimMatrix {
    let rows: Vec<((usize, usize), f64)> = candidates
        .par_iter()
        .flat_map(|(&old_idx, new_indices)| {
            let old_context = old.context(old_idx, context_window);
            new_indices
                .par_iter()
                .map(|&new_idx| {
                    let new_context = new.context(new_idx, context_window);
                    let score = combined_similarity(
                        old.normalized(old_idx),
                        new.normalized(new_idx),
                        &old_context,
                        &new_context,
                        (0.6, 0.4),
                        || warner.warn(),
                    );
                    ((old_idx, new_idx), score)
                })
                .collect::<Vec<_>>()
        })
        .collect();

    rows.into_iter().collect()
}

/// Seven-pass matching: exact, enhanced-structural, control-flow,
/// local-neighborhood, remaining-structural cleanup, global, forced.
pub fn match_lines(
    old: &LineSide,
    new: &LineSide,
    candidates: &CandidateSet,
    structural: &StructuralAnalysis,
    config: &MatchConfig,
) -> Matches {
    let warner = WarnOnce::default();
    let matrix = build_similarity_matrix(old, new, candidates, config.context_window.min(2), &warner);

    let n_old = old.len();
    let n_new = new.len();
    let empty: Vec<usize> = Vec::new();

    let mut matches: Matches = Matches::new();
    let mut used_new: HashSet<usize> = HashSet::new();

    // PASS 1: exact (first candidate over 0.95, in candidate order).
    for i in 0..n_old {
        for &j in candidates.get(&i).unwrap_or(&empty) {
            let score = *matrix.get(&(i, j)).unwrap_or(&0.0);
            if score > 0.95 && !used_new.contains(&j) {
                matches.insert(i, Match { old_index: i, new_index: j, score });
                used_new.insert(j);
                break;
            }
        }
    }

    // PASS 2: enhanced structural (field replacements, logic rewrites, semantic patterns).
    let enhanced = find_enhanced_structural_matches(old, new, &matrix, candidates, structural);
    for (old_idx, (new_idx, score)) in enhanced {
        if !matches.contains_key(&old_idx) && !used_new.contains(&new_idx) {
            matches.insert(old_idx, Match { old_index: old_idx, new_index: new_idx, score });
            used_new.insert(new_idx);
        }
    }

    // PASS 3: control-flow-aware, position-penalized by /15.
    for i in 0..n_old {
        if matches.contains_key(&i) {
            continue;
        }
        let old_line = old.normalized(i);
        if !(is_control_flow_line(old_line) || old_line.contains("return")) {
            continue;
        }

        let mut best: Option<(usize, f64)> = None;
        for &j in candidates.get(&i).unwrap_or(&empty) {
            if used_new.contains(&j) {
                continue;
            }
            let new_line = new.normalized(j);
            let score = *matrix.get(&(i, j)).unwrap_or(&0.0);
            if (is_control_flow_line(new_line) || new_line.contains("return")) && score > 0.6 {
                let position_penalty = (i.abs_diff(j)) as f64 / 15.0;
                let adjusted = score * (1.0 - position_penalty);
                if best.map(|(_, b)| adjusted > b).unwrap_or(true) {
                    best = Some((j, adjusted));
                }
            }
        }

        if let Some((j, score)) = best {
            matches.insert(i, Match { old_index: i, new_index: j, score });
            used_new.insert(j);
        }
    }

    // PASS 4: local neighborhood, +-10, position-penalized by /25, accept > 0.5.
    for i in 0..n_old {
        if matches.contains_key(&i) {
            continue;
        }
        let search_start = i.saturating_sub(10);
        let search_end = (i + 11).min(n_new);

        let mut best: Option<(usize, f64)> = None;
        let own_candidates = candidates.get(&i).unwrap_or(&empty);
        for j in search_start..search_end {
            if used_new.contains(&j) || !own_candidates.contains(&j) {
                continue;
            }
            let score = *matrix.get(&(i, j)).unwrap_or(&0.0);
            let position_penalty = (i.abs_diff(j)) as f64 / 25.0;
            let adjusted = score * (1.0 - position_penalty);
            if adjusted > 0.5 && best.map(|(_, b)| adjusted > b).unwrap_or(true) {
                best = Some((j, adjusted));
            }
        }

        if let Some((j, score)) = best {
            matches.insert(i, Match { old_index: i, new_index: j, score });
            used_new.insert(j);
        }
    }

    // PASS 5: remaining structural cleanup (field replacements missed above).
    let remaining = find_remaining_structural_matches(structural, &matches, &used_new, new.len());
    for (old_idx, (new_idx, score)) in remaining {
        if !matches.contains_key(&old_idx) && !used_new.contains(&new_idx) {
            matches.insert(old_idx, Match { old_index: old_idx, new_index: new_idx, score });
            used_new.insert(new_idx);
        }
    }

    // PASS 6: global search, accept over `config.match_threshold`.
    for i in 0..n_old {
        if matches.contains_key(&i) {
            continue;
        }
        let mut best: Option<(usize, f64)> = None;
        for &j in candidates.get(&i).unwrap_or(&empty) {
            if used_new.contains(&j) {
                continue;
            }
            let score = *matrix.get(&(i, j)).unwrap_or(&0.0);
            if score > config.match_threshold && best.map(|(_, b)| score > b).unwrap_or(true) {
                best = Some((j, score));
            }
        }
        if let Some((j, score)) = best {
            matches.insert(i, Match { old_index: i, new_index: j, score });
            used_new.insert(j);
        }
    }

    // PASS 7: forced best-effort, no used-index exclusion at all (collisions
    // are deliberately allowed here for `resolve_conflicts` to clean up).
    for i in 0..n_old {
        if matches.contains_key(&i) {
            continue;
        }
        let mut best: Option<(usize, f64)> = None;
        for &j in candidates.get(&i).unwrap_or(&empty) {
            let score = *matrix.get(&(i, j)).unwrap_or(&0.0);
            if best.map(|(_, b)| score > b).unwrap_or(true) {
                best = Some((j, score));
            }
        }
        if let Some((j, score)) = best {
            if score > 0.2 {
                matches.insert(i, Match { old_index: i, new_index: j, score });
            }
        }
    }

    matches
}

fn find_enhanced_structural_matches(
    old: &LineSide,
    new: &LineSide,
    matrix: &SimMatrix,
    candidates: &CandidateSet,
    structural: &StructuralAnalysis,
) -> HashMap<usize, (usize, f64)> {
    let mut structural_matches: HashMap<usize, (usize, f64)> = HashMap::new();
    let empty: Vec<usize> = Vec::new();

    // 1. Field-replacement matches.
    for (&old_idx, replacement) in &structural.field_usage_replacements {
        let new_idx = replacement.line_idx;
        if new_idx >= new.len() {
            continue;
        }
        let score = combined_similarity(old.normalized(old_idx), new.normalized(new_idx), "", "", (0.6, 0.4), || {});
        let min_score = 0.4 + (replacement.confidence * 0.5);
        let boosted = score.max(min_score);
        if boosted > 0.4 {
            structural_matches.insert(old_idx, (new_idx, boosted.min(1.0)));
        }
    }

    // 2. Logic-rewrite matches, interpolating position within the method.
    for rewrite in &structural.logic_rewrites {
        let Some(old_range) = structural.old_scopes.range_of(&rewrite.method_name) else {
            continue;
        };
        let Some(new_range) = structural.new_scopes.range_of(&rewrite.method_name) else {
            continue;
        };

        let old_size = old_range.end - old_range.start;
        let new_size = new_range.end - new_range.start;

        for old_idx in old_range.clone() {
            if structural_matches.contains_key(&old_idx) {
                continue;
            }

            let relative_pos = (old_idx - old_range.start) as f64 / old_size.max(1) as f64;
            let expected_new_idx = new_range.start + (relative_pos * new_size as f64) as usize;

            let search_start = expected_new_idx.saturating_sub(10).max(new_range.start);
            let search_end = (expected_new_idx + 11).min(new_range.end);

            let own_candidates = candidates.get(&old_idx).unwrap_or(&empty);
            let mut best: Option<(usize, f64)> = None;
            for new_idx in search_start..search_end {
                if !own_candidates.contains(&new_idx) {
                    continue;
                }
                let score = *matrix.get(&(old_idx, new_idx)).unwrap_or(&0.0);
                let boosted = (score + rewrite.confidence * 0.3).min(1.0);
                if boosted > 0.4 && best.map(|(_, b)| boosted > b).unwrap_or(true) {
                    best = Some((new_idx, boosted));
                }
            }

            if let Some(found) = best {
                structural_matches.insert(old_idx, found);
            }
        }
    }

    // 3. Predefined semantic patterns, scanned in catalog order. Matched
    // against raw text: the catalog's shapes key off literal `(`/`)`/`{`
    // that the normalizer strips.
    for old_idx in 0..old.len() {
        if structural_matches.contains_key(&old_idx) {
            continue;
        }
        let old_line = old.raw(old_idx);

        let mut found = false;
        for (old_re, new_re, confidence) in crate::structural::patterns::catalog() {
            if !old_re.is_match(old_line) {
                continue;
            }
            for new_idx in 0..new.len() {
                if structural_matches.values().any(|&(n, _)| n == new_idx) {
                    continue;
                }
                let new_line = new.raw(new_idx);
                if new_re.is_match(new_line) {
                    let own_candidates = candidates.get(&old_idx).unwrap_or(&empty);
                    let base_score = if own_candidates.contains(&new_idx) {
                        *matrix.get(&(old_idx, new_idx)).unwrap_or(&0.0)
                    } else {
                        0.3
                    };
                    let boosted = (base_score + confidence * 0.4).min(1.0);
                    if boosted > 0.5 {
                        structural_matches.insert(old_idx, (new_idx, boosted));
                        found = true;
                        break;
                    }
                }
            }
            if found {
                break;
            }
        }
    }

    structural_matches
}

fn find_remaining_structural_matches(
    structural: &StructuralAnalysis,
    existing_matches: &Matches,
    used_new: &HashSet<usize>,
    new_len: usize,
) -> HashMap<usize, (usize, f64)> {
    let mut remaining = HashMap::new();

    for (&old_idx, replacement) in &structural.field_usage_replacements {
        if existing_matches.contains_key(&old_idx) {
            continue;
        }
        let new_idx = replacement.line_idx;
        if used_new.contains(&new_idx) || new_idx >= new_len {
            continue;
        }
        let min_score = 0.4 + (replacement.confidence * 0.5);
        if min_score > 0.4 {
            remaining.insert(old_idx, (new_idx, min_score.min(1.0)));
        }
    }

    remaining
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NormalizeOptions;
    use crate::types::LineSide;

    fn side(lines: &[&str]) -> LineSide {
        let raw: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
        LineSide::from_raw_lines(&raw, NormalizeOptions::default())
    }

    #[test]
    fn test_is_control_flow_line() {
        assert!(is_control_flow_line("if x == 1"));
        assert!(is_control_flow_line("return y"));
        assert!(!is_control_flow_line("x = 1"));
    }

    #[test]
    fn test_match_lines_identical_sides_is_identity() {
        let old = side(&["a = 1;", "b = 2;", "c = 3;"]);
        let new = side(&["a = 1;", "b = 2;", "c = 3;"]);
        let mut candidates = CandidateSet::new();
        candidates.insert(0, vec![0, 1, 2]);
        candidates.insert(1, vec![1, 0, 2]);
        candidates.insert(2, vec![2, 0, 1]);

        let structural = crate::structural::StructuralAnalysis::analyze(
            &["a = 1;".to_string(), "b = 2;".to_string(), "c = 3;".to_string()],
            &["a = 1;".to_string(), "b = 2;".to_string(), "c = 3;".to_string()],
        );
        let config = MatchConfig::default();

        let matches = match_lines(&old, &new, &candidates, &structural, &config);
        assert_eq!(matches.get(&0).unwrap().new_index, 0);
        assert_eq!(matches.get(&1).unwrap().new_index, 1);
        assert_eq!(matches.get(&2).unwrap().new_index, 2);
    }
}
