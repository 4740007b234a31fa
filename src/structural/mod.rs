//! Structural pre-analysis: method boundaries, field-removal
//! replacements, logic rewrites, semantic-equivalence patterns, and
//! variable renames. Populated once per old/new pair before the
//! multi-pass matcher runs, mirroring `DiffMatcher.detect_structural_changes`.

pub mod fields;
pub mod methods;
pub mod patterns;
pub mod renames;
pub mod rewrites;

use std::collections::{HashMap, HashSet};

use crate::types::ScopeMap;

/// All structural findings for one old/new comparison, computed once
/// up front and consulted by every matcher pass that needs it.
pub struct StructuralAnalysis {
    pub old_scopes: ScopeMap,
    pub new_scopes: ScopeMap,
    pub removed_field: Option<(usize, String)>,
    pub field_usage_replacements: HashMap<usize, fields::FieldReplacement>,
    pub logic_rewrites: Vec<rewrites::LogicRewrite>,
    pub variable_renames: HashMap<String, String>,
}

impl StructuralAnalysis {
    /// Run every structural pass over the raw (unnormalized) line
    /// vectors. Field-usage and method-boundary detection rely on
    /// surviving punctuation (`{`, `}`, `;`), so this takes the lines
    /// before they go through the normalizer's punctuation stripping.
    pub fn analyze(old_lines: &[String], new_lines: &[String]) -> Self {
        let old_scopes = methods::find_method_boundaries(old_lines);
        let new_scopes = methods::find_method_boundaries(new_lines);

        let removed_field = fields::detect_removed_field(old_lines, new_lines);

        let mut field_usage_replacements = HashMap::new();
        if let Some((_, ref field_name)) = removed_field {
            let field_re = regex::Regex::new(&format!(r"\b{}\b", regex::escape(field_name))).unwrap();
            for (i, line) in old_lines.iter().enumerate() {
                if !field_re.is_match(line) {
                    continue;
                }
                let Some((_, old_pattern)) = fields::classify_usage(line, field_name) else {
                    continue;
                };
                let old_scope_name = old_scopes.scope_at(i);
                let area = fields::expected_replacement_area(i, new_lines.len(), old_scope_name, &new_scopes);
                if let Some(replacement) = fields::find_field_replacement(&old_pattern, new_lines, field_name, &area) {
                    field_usage_replacements.insert(i, replacement);
                }
            }
        }

        let logic_rewrites = rewrites::detect_logic_rewrites(old_lines, new_lines, &old_scopes, &new_scopes);
        let variable_renames = renames::detect_variable_renames(old_lines, new_lines, &old_scopes, &new_scopes);

        Self {
            old_scopes,
            new_scopes,
            removed_field,
            field_usage_replacements,
            logic_rewrites,
            variable_renames,
        }
    }

    /// Old indices backed by some structural finding (a field-usage
    /// replacement, or falling inside a method with a detected logic
    /// rewrite). Used by conflict resolution's salvage gate to tell a
    /// structurally-motivated loser from a merely high-scoring one.
    pub fn motivated_old_indices(&self) -> HashSet<usize> {
        let mut motivated: HashSet<usize> = self.field_usage_replacements.keys().copied().collect();
        for rewrite in &self.logic_rewrites {
            if let Some(range) = self.old_scopes.range_of(&rewrite.method_name) {
                motivated.extend(range);
            }
        }
        motivated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_analyze_runs_all_passes_without_panic() {
        let old = lines(&[
            "private TypeBinding fieldBinding;",
            "void m() {",
            "  return fieldBinding.id;",
            "}",
        ]);
        let new = lines(&[
            "void m() {",
            "  return this.resolvedType.id;",
            "}",
        ]);
        let analysis = StructuralAnalysis::analyze(&old, &new);
        assert!(analysis.removed_field.is_some());
    }
}
