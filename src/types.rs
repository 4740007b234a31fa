//! Core data types shared across the matching pipeline.
//!
//! Mirrors the shape of `compare_it`'s `types.rs`: plain data, `Default`
//! impls where a sensible default exists, `serde` derives on anything
//! that crosses the external-interface boundary.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::ops::Range;
use std::path::Path;

use crate::config::NormalizeOptions;
use crate::error::CoreError;
use crate::normalize::normalize;

/// One textual line, identified by a zero-based index into its side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    /// Zero-based index into the owning `LineSide`.
    pub index: usize,
    /// Raw text, bytes preserved modulo trailing newline.
    pub raw: String,
    /// Whitespace-collapsed, comment-stripped canonical form.
    pub normalized: String,
    /// 64-bit SimHash fingerprint of the normalized form.
    pub fingerprint: u64,
}

/// An ordered, immutable sequence of `Line`s for one side (old or new).
#[derive(Debug, Clone)]
pub struct LineSide {
    lines: Vec<Line>,
}

impl LineSide {
    /// Build a `LineSide` from raw lines, normalizing and fingerprinting each.
    pub fn from_raw_lines(raw_lines: &[String], opts: NormalizeOptions) -> Self {
        let normalized = normalize(raw_lines, opts);
        let lines = raw_lines
            .par_iter()
            .zip(normalized.into_par_iter())
            .enumerate()
            .map(|(index, (raw, normalized))| {
                let fingerprint = crate::fingerprint::simhash(&normalized);
                Line {
                    index,
                    raw: raw.clone(),
                    normalized,
                    fingerprint,
                }
            })
            .collect();
        Self { lines }
    }

    /// Read a file and split it into lines, the one place this crate's
    /// core can actually fail: the file system, not the algorithm.
    pub fn from_path(path: &Path, opts: NormalizeOptions) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw_lines: Vec<String> = text.lines().map(|l| l.to_string()).collect();
        Ok(Self::from_raw_lines(&raw_lines, opts))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, index: usize) -> &Line {
        &self.lines[index]
    }

    pub fn raw(&self, index: usize) -> &str {
        &self.lines[index].raw
    }

    pub fn normalized(&self, index: usize) -> &str {
        &self.lines[index].normalized
    }

    pub fn fingerprint(&self, index: usize) -> u64 {
        self.lines[index].fingerprint
    }

    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }

    pub fn normalized_lines(&self) -> Vec<&str> {
        self.lines.iter().map(|l| l.normalized.as_str()).collect()
    }

    /// Build the ±window context string centered on `index`.
    pub fn context(&self, index: usize, window: usize) -> String {
        let start = index.saturating_sub(window);
        let end = (index + window + 1).min(self.lines.len());
        self.lines[start..end]
            .iter()
            .map(|l| l.normalized.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// For a source line, a bounded list of target-side indices plausibly
/// corresponding to it, ordered by ascending Hamming distance (ties by
/// ascending index).
pub type CandidateSet = BTreeMap<usize, Vec<usize>>;

/// A single alignment decision: `old_index` maps to `new_index` with
/// confidence `score`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Match {
    pub old_index: usize,
    pub new_index: usize,
    pub score: f64,
}

/// Old index -> winning `Match`, before split detection fans any entry
/// out into a multi-element `Mapping` value.
pub type Matches = BTreeMap<usize, Match>;

/// Old index -> non-empty list of new indices. A single-element list is
/// a 1-to-1 survivor; multi-element denotes a split. Old indices absent
/// from the keyset are deletions; new indices that never appear in any
/// value are insertions.
pub type Mapping = BTreeMap<usize, Vec<usize>>;

/// A detected method/function scope: half-open index range `[start, end)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodBoundary {
    pub name: String,
    pub range: Range<usize>,
}

/// Pseudo-scope name used for lines outside any detected method boundary.
pub const GLOBAL_SCOPE: &str = "global";

/// All detected method boundaries for one side, plus lookup helpers.
#[derive(Debug, Clone, Default)]
pub struct ScopeMap {
    boundaries: Vec<MethodBoundary>,
}

impl ScopeMap {
    pub fn new(boundaries: Vec<MethodBoundary>) -> Self {
        Self { boundaries }
    }

    /// The scope name containing `index`, or `"global"` if none.
    pub fn scope_at(&self, index: usize) -> &str {
        self.boundaries
            .iter()
            .find(|b| b.range.contains(&index))
            .map(|b| b.name.as_str())
            .unwrap_or(GLOBAL_SCOPE)
    }

    /// The `[start, end)` range of a named scope, if detected.
    pub fn range_of(&self, name: &str) -> Option<Range<usize>> {
        self.boundaries
            .iter()
            .find(|b| b.name == name)
            .map(|b| b.range.clone())
    }

    pub fn iter(&self) -> impl Iterator<Item = &MethodBoundary> {
        self.boundaries.iter()
    }

    pub fn names(&self) -> HashSet<&str> {
        self.boundaries.iter().map(|b| b.name.as_str()).collect()
    }
}

/// Operation tags used to profile how a variable is used at a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Assignment,
    Comparison,
    Return,
    MethodCall,
    Instantiation,
    FieldAccess,
    IdAccess,
}

/// Per-variable usage profile built from local identifier extraction.
#[derive(Debug, Clone, Default)]
pub struct VariableContext {
    pub name: String,
    pub usage_count: usize,
    pub scopes: HashSet<String>,
    pub operations: HashSet<Operation>,
    /// Normalized neighborhood strings (the line each usage appeared on,
    /// with the variable itself masked out).
    pub neighborhoods: HashSet<String>,
    pub declaration_context: Option<String>,
}

impl VariableContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}
