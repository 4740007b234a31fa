//! Tunable knobs for the matching pipeline
//!
//! Bundles every threshold and window size spec'd out across the
//! normalizer, candidate generator, similarity function, and matcher
//! passes into a single value, the way `CompareConfig` bundles CLI-
//! tunable knobs for the folder-comparison pipeline.

/// Options controlling line normalization.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    /// Strip `//`, `#`, and same-line `/* */` comments.
    pub remove_comments: bool,
    /// Lowercase every line after whitespace/comment normalization.
    pub lowercase: bool,
}

/// Configuration for the end-to-end matching pipeline.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Candidates per old line from the SimHash index.
    pub candidate_k: usize,
    /// Context window half-width (lines above/below) for context_similarity.
    pub context_window: usize,
    /// Acceptance threshold for `match_lines` / Pass 6 ("global") gate.
    pub match_threshold: f64,
    /// Acceptance threshold for `detect_reorders`.
    pub reorder_threshold: f64,
    /// Minimum improvement required for split-group greedy extension.
    pub split_threshold_increase: f64,
    /// Content/context weight pair used by the primary matcher passes.
    pub primary_weights: (f64, f64),
    /// Content/context weight pair used by the reorder pass.
    pub reorder_weights: (f64, f64),
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            candidate_k: 15,
            context_window: 4,
            match_threshold: 0.45,
            reorder_threshold: 0.4,
            split_threshold_increase: 0.01,
            primary_weights: (0.6, 0.4),
            reorder_weights: (0.7, 0.3),
        }
    }
}
