//! lhdiff_core: a line-granularity source-line matching engine in the
//! LHDiff tradition — SimHash candidate generation, multi-signal
//! similarity, a seven-pass structural matcher, conflict resolution,
//! reorder detection, and split detection.
//!
//! The algorithmic core is total: every function here returns a value
//! for any well-formed input, never panics, never returns `Result`.
//! The one real failure mode, reading a file into a `LineSide`, lives
//! at the I/O boundary (`LineSide::from_path`) and surfaces as
//! [`error::CoreError`].

pub mod config;
pub mod conflict;
pub mod error;
pub mod fingerprint;
pub mod matcher;
pub mod normalize;
pub mod reorder;
pub mod similarity;
pub mod split;
pub mod structural;
pub mod types;

use std::collections::HashSet;

pub use config::{MatchConfig, NormalizeOptions};
pub use error::CoreError;
pub use types::{CandidateSet, Line, LineSide, Mapping, Match, Matches};

fn side_pair(old_lines: &[String], new_lines: &[String], opts: NormalizeOptions) -> (LineSide, LineSide) {
    (
        LineSide::from_raw_lines(old_lines, opts),
        LineSide::from_raw_lines(new_lines, opts),
    )
}

/// Split raw text into normalized lines. Thin wrapper over
/// [`normalize::normalize`] for callers who only want the canonical
/// form and don't need fingerprints.
pub fn normalize(raw_text: &str, opts: NormalizeOptions) -> Vec<String> {
    let raw_lines: Vec<String> = raw_text.lines().map(|l| l.to_string()).collect();
    normalize::normalize(&raw_lines, opts)
}

/// For every old line, up to `k` candidate new-line indices by SimHash
/// distance.
pub fn build_simhash_candidates(old_lines: &[String], new_lines: &[String], k: usize) -> CandidateSet {
    let (old, new) = side_pair(old_lines, new_lines, NormalizeOptions::default());
    fingerprint::build_candidates(&old, &new, k)
}

/// Run the seven-pass matcher over a candidate set, using `threshold`
/// as Pass 6's (global search) acceptance gate — the one caller-tunable
/// knob the original algorithm's own dead `threshold` parameter never
/// actually wired up.
pub fn match_lines(old_lines: &[String], new_lines: &[String], candidates: &CandidateSet, threshold: f64) -> Matches {
    let (old, new) = side_pair(old_lines, new_lines, NormalizeOptions::default());
    let structural = structural::StructuralAnalysis::analyze(old_lines, new_lines);
    let config = MatchConfig { match_threshold: threshold, ..MatchConfig::default() };
    matcher::match_lines(&old, &new, candidates, &structural, &config)
}

/// Collapse many-to-one collisions left by Pass 7's deliberate forcing.
///
/// This free function has no access to the old side, so it cannot know
/// which losing matches are structurally motivated; it treats none of
/// them as such, falling back to the salvage gate's other two
/// conditions (high confidence, sufficient distance). [`Matcher::run`]
/// computes and passes the real structurally-motivated set.
pub fn resolve_conflicts(matches: &Matches, new_lines: &[String]) -> Matches {
    let new = LineSide::from_raw_lines(new_lines, NormalizeOptions::default());
    conflict::resolve_conflicts(matches, &new, &HashSet::new())
}

/// Align leftover unmatched old lines against unclaimed new lines,
/// using `threshold` as the acceptance gate.
pub fn detect_reorders(old_lines: &[String], new_lines: &[String], matches: &Matches, threshold: f64) -> Matches {
    let (old, new) = side_pair(old_lines, new_lines, NormalizeOptions::default());
    let structural = structural::StructuralAnalysis::analyze(old_lines, new_lines);
    let config = MatchConfig { reorder_threshold: threshold, ..MatchConfig::default() };
    reorder::detect_reorders(&old, &new, matches, &structural, &config)
}

/// Widen any match whose old line was broken across several new lines.
pub fn detect_splits(old_lines: &[String], new_lines: &[String], matches: &Matches, threshold_increase: f64) -> Mapping {
    let (old, new) = side_pair(old_lines, new_lines, NormalizeOptions::default());
    split::detect_splits(&old, &new, matches, threshold_increase)
}

/// Owns the per-comparison caches (the two `LineSide`s, the structural
/// analysis) across the whole pipeline, the class-based variant
/// spec.md names as canonical. The free functions above each rebuild
/// this state from scratch; construct a `Matcher` directly when running
/// the full pipeline once per pair, or when conflict resolution needs
/// real structural-motivation information.
pub struct Matcher {
    old: LineSide,
    new: LineSide,
    structural: structural::StructuralAnalysis,
    config: MatchConfig,
}

impl Matcher {
    pub fn new(old_lines: &[String], new_lines: &[String], config: MatchConfig) -> Self {
        let (old, new) = side_pair(old_lines, new_lines, NormalizeOptions::default());
        let structural = structural::StructuralAnalysis::analyze(old_lines, new_lines);
        Self { old, new, structural, config }
    }

    /// Run the full pipeline: candidates, match, resolve conflicts,
    /// reorder, split.
    pub fn run(&self) -> Mapping {
        let candidates = fingerprint::build_candidates(&self.old, &self.new, self.config.candidate_k);
        let matched = matcher::match_lines(&self.old, &self.new, &candidates, &self.structural, &self.config);
        let motivated = self.structural.motivated_old_indices();
        let resolved = conflict::resolve_conflicts(&matched, &self.new, &motivated);
        let reordered = reorder::detect_reorders(&self.old, &self.new, &resolved, &self.structural, &self.config);
        split::detect_splits(&self.old, &self.new, &reordered, self.config.split_threshold_increase)
    }

    pub fn old(&self) -> &LineSide {
        &self.old
    }

    pub fn new_side(&self) -> &LineSide {
        &self.new
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_matcher_run_identity_on_identical_sides() {
        let src = lines(&["a = 1;", "b = 2;", "c = 3;"]);
        let matcher = Matcher::new(&src, &src, MatchConfig::default());
        let mapping = matcher.run();
        assert_eq!(mapping.get(&0).unwrap(), &vec![0]);
        assert_eq!(mapping.get(&1).unwrap(), &vec![1]);
        assert_eq!(mapping.get(&2).unwrap(), &vec![2]);
    }

    #[test]
    fn test_free_functions_compose_end_to_end() {
        let old = lines(&["a = 1;", "b = 2;"]);
        let new = lines(&["a = 1;", "b = 2;"]);
        let candidates = build_simhash_candidates(&old, &new, 5);
        let matched = match_lines(&old, &new, &candidates, 0.45);
        let resolved = resolve_conflicts(&matched, &new);
        let reordered = detect_reorders(&old, &new, &resolved, 0.4);
        let mapping = detect_splits(&old, &new, &reordered, 0.01);
        assert_eq!(mapping.len(), 2);
    }

    #[test]
    fn test_normalize_free_function() {
        let out = normalize("a = 1;\n  b = 2;  ", NormalizeOptions::default());
        assert_eq!(out, vec!["a = 1".to_string(), "b = 2".to_string()]);
    }
}
