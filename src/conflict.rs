//! Conflict resolution: collapse many-old-lines-map-to-one-new-line
//! collisions left behind by Pass 7's deliberately unchecked forcing.
//!
//! Grounded on `matcher.py::resolve_conflicts`,
//! `_is_semantically_reasonable_match`, `_find_valid_alternative`.

use std::collections::{HashMap, HashSet};

use crate::types::{LineSide, Match, Matches};

/// Reject replacement targets that are syntactically impossible or
/// garbage: lone braces, import lines, a bare declaration header, lines
/// too short to carry real content, or a stray closing brace.
pub fn is_semantically_reasonable_match(new_line: &str) -> bool {
    let new_line = new_line.trim();

    let nonsense = new_line.starts_with("public ") && new_line.contains(';')
        || new_line.starts_with("import ")
        || matches!(new_line, "{" | "}" | "};")
        || new_line.chars().count() < 10
        || (new_line.contains('}') && !new_line.contains('{') && !new_line.contains("class"));

    !nonsense
}

fn find_valid_alternative(
    original_new_idx: usize,
    new_lines: &LineSide,
    resolved: &Matches,
) -> Option<usize> {
    let n_new = new_lines.len() as i64;
    for offset in (-15..=15).filter(|&o| o != 0) {
        let test_idx = original_new_idx as i64 + offset;
        if test_idx < 0 || test_idx >= n_new {
            continue;
        }
        let test_idx = test_idx as usize;
        if resolved.values().any(|m| m.new_index == test_idx) {
            continue;
        }
        if is_semantically_reasonable_match(new_lines.raw(test_idx)) {
            return Some(test_idx);
        }
    }
    None
}

/// Resolve many-to-one collisions: the highest-scoring old line keeps
/// the contested new line; losers are dropped unless they look
/// structurally motivated (or score highly), sit far enough from the
/// winner, and the target passes the reasonableness filter — in which
/// case a nearby free line is salvaged for them at their *original*
/// score, not rescored against the new target.
pub fn resolve_conflicts(
    matches: &Matches,
    new_lines: &LineSide,
    structurally_motivated: &HashSet<usize>,
) -> Matches {
    let mut new_to_old: HashMap<usize, Vec<(usize, f64)>> = HashMap::new();
    for m in matches.values() {
        new_to_old.entry(m.new_index).or_default().push((m.old_index, m.score));
    }

    let mut resolved: Matches = Matches::new();

    let mut new_indices: Vec<&usize> = new_to_old.keys().collect();
    new_indices.sort();

    for &new_idx in new_indices {
        let old_items = &new_to_old[&new_idx];
        if old_items.len() == 1 {
            let (old_idx, score) = old_items[0];
            resolved.insert(old_idx, Match { old_index: old_idx, new_index: new_idx, score });
            continue;
        }

        let mut sorted_items = old_items.clone();
        sorted_items.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then(a.0.cmp(&b.0)));

        let (best_old_idx, best_score) = sorted_items[0];
        resolved.insert(best_old_idx, Match { old_index: best_old_idx, new_index: new_idx, score: best_score });

        for &(old_idx, score) in &sorted_items[1..] {
            let is_structural = structurally_motivated.contains(&old_idx);
            let is_high_confidence = score > 0.8;
            let has_sufficient_distance = old_idx.abs_diff(best_old_idx) > 5;
            let is_reasonable = is_semantically_reasonable_match(new_lines.raw(new_idx));

            if (is_structural || is_high_confidence) && has_sufficient_distance && is_reasonable {
                if let Some(alt) = find_valid_alternative(new_idx, new_lines, &resolved) {
                    if alt != new_idx {
                        resolved.insert(old_idx, Match { old_index: old_idx, new_index: alt, score });
                    }
                }
            }
        }
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NormalizeOptions;

    fn side(lines: &[&str]) -> LineSide {
        let raw: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
        LineSide::from_raw_lines(&raw, NormalizeOptions::default())
    }

    #[test]
    fn test_reasonable_match_rejects_lone_brace() {
        assert!(!is_semantically_reasonable_match("}"));
    }

    #[test]
    fn test_reasonable_match_rejects_import() {
        assert!(!is_semantically_reasonable_match("import java.util.List;"));
    }

    #[test]
    fn test_reasonable_match_accepts_normal_line() {
        assert!(is_semantically_reasonable_match("return this.resolvedType;"));
    }

    #[test]
    fn test_resolve_single_mapping_passthrough() {
        let new = side(&["a = 1;", "b = 2;"]);
        let mut matches = Matches::new();
        matches.insert(0, Match { old_index: 0, new_index: 0, score: 0.9 });
        matches.insert(1, Match { old_index: 1, new_index: 1, score: 0.9 });

        let resolved = resolve_conflicts(&matches, &new, &HashSet::new());
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn test_resolve_conflict_keeps_highest_score() {
        let new = side(&["target line goes here", "other line content"]);
        let mut matches = Matches::new();
        matches.insert(0, Match { old_index: 0, new_index: 0, score: 0.9 });
        matches.insert(10, Match { old_index: 10, new_index: 0, score: 0.3 });

        let resolved = resolve_conflicts(&matches, &new, &HashSet::new());
        assert_eq!(resolved.get(&0).unwrap().new_index, 0);
    }
}
