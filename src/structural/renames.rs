//! Variable-rename detection: four independent strategies unioned by
//! "higher confidence wins", followed by a final validation gate.
//!
//! Grounded on `matcher.py::_detect_variable_renames` and its
//! supporting `_build_variable_contexts` / `_find_variable_renames_by_*`
//! / `_contexts_are_compatible` / `_validate_rename` helpers.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use crate::types::{Operation, ScopeMap, VariableContext};

fn identifier_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[a-z][a-zA-Z0-9]*\b").unwrap())
}

fn type_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z][a-zA-Z0-9]*\b").unwrap())
}

fn digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d+\b").unwrap())
}

const JAVA_KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "return", "new", "this", "super", "null", "true", "false", "final",
];
const COMMON_TYPES: &[&str] = &[
    "int", "long", "double", "float", "boolean", "char", "byte", "short", "void", "String",
];

/// Candidate variable names on a line: lowercase-led identifiers, minus
/// keywords/primitive type names/anything too short to be meaningful.
/// Declaration-ish lines (class/interface/enum/visibility headers) are
/// skipped entirely.
pub fn extract_variables_from_line(line: &str) -> Vec<String> {
    for marker in ["class ", "interface ", "enum ", "public ", "private ", "protected "] {
        if line.contains(marker) {
            return Vec::new();
        }
    }

    identifier_word_re()
        .find_iter(line)
        .map(|m| m.as_str().to_string())
        .filter(|w| !JAVA_KEYWORDS.contains(&w.as_str()))
        .filter(|w| !COMMON_TYPES.contains(&w.as_str()))
        .filter(|w| w.len() > 2)
        .collect()
}

/// Which operations `var` participates in on `line`. Non-exclusive; a
/// single line can register several.
pub fn extract_operations_from_line(line: &str, var: &str) -> HashSet<Operation> {
    let mut ops = HashSet::new();
    let var_re = Regex::new(&format!(r"\b{}\b", regex::escape(var))).unwrap();
    if !var_re.is_match(line) {
        return ops;
    }

    if line.contains(".id") && line.contains(var) {
        ops.insert(Operation::IdAccess);
    }
    if line.contains("==") && line.contains(var) {
        ops.insert(Operation::Comparison);
    }
    if line.contains('=') && line.split('=').next().is_some_and(|lhs| lhs.contains(var)) {
        ops.insert(Operation::Assignment);
    }
    if line.contains("return") && line.contains(var) {
        ops.insert(Operation::Return);
    }
    if line.contains('(') && line.contains(var) {
        ops.insert(Operation::MethodCall);
    }
    if line.contains("new ") && line.contains(var) {
        ops.insert(Operation::Instantiation);
    }
    if line.contains('.') && line.split('.').next().is_some_and(|lhs| lhs.contains(var)) {
        ops.insert(Operation::FieldAccess);
    }

    ops
}

/// Best-effort type name for a declaration or cast on `line`.
pub fn extract_declaration_context(line: &str) -> Option<String> {
    let decl_re = Regex::new(r"(\w+)\s+(\w+)\s*=").unwrap();
    if let Some(caps) = decl_re.captures(line) {
        return Some(caps[1].to_string());
    }
    let cast_re = Regex::new(r"\(\s*(\w+)\s*\)").unwrap();
    if let Some(caps) = cast_re.captures(line) {
        return Some(caps[1].to_string());
    }
    None
}

/// Mask identifiers/type names/numbers down to `VAR`/`TYPE`/`NUM` so
/// surrounding-context strings can be fuzzy-matched across renames.
pub fn normalize_context(context: &str) -> String {
    let step1 = identifier_word_re().replace_all(context, "VAR");
    let step2 = type_word_re().replace_all(&step1, "TYPE");
    digits_re().replace_all(&step2, "NUM").into_owned()
}

fn record_usage(
    contexts: &mut HashMap<String, VariableContext>,
    lines: &[String],
    i: usize,
    var: &str,
    scopes: &ScopeMap,
) {
    let entry = contexts
        .entry(var.to_string())
        .or_insert_with(|| VariableContext::new(var));
    entry.usage_count += 1;
    entry.scopes.insert(scopes.scope_at(i).to_string());
    entry
        .operations
        .extend(extract_operations_from_line(&lines[i], var));

    let start = i.saturating_sub(3);
    let end = (i + 4).min(lines.len());
    let surrounding = lines[start..end].join(" ");
    entry.neighborhoods.insert(normalize_context(&surrounding));

    let line = &lines[i];
    if line.contains('=') && line.split('=').next().is_some_and(|lhs| lhs.contains(var)) {
        entry.declaration_context = extract_declaration_context(line);
    }
}

/// Build per-variable usage profiles for both sides.
pub fn build_variable_contexts(
    old_lines: &[String],
    new_lines: &[String],
    old_scopes: &ScopeMap,
    new_scopes: &ScopeMap,
) -> (HashMap<String, VariableContext>, HashMap<String, VariableContext>) {
    let mut old_contexts = HashMap::new();
    for (i, line) in old_lines.iter().enumerate() {
        for var in extract_variables_from_line(line) {
            record_usage(&mut old_contexts, old_lines, i, &var, old_scopes);
        }
    }

    let mut new_contexts = HashMap::new();
    for (i, line) in new_lines.iter().enumerate() {
        for var in extract_variables_from_line(line) {
            record_usage(&mut new_contexts, new_lines, i, &var, new_scopes);
        }
    }

    (old_contexts, new_contexts)
}

/// Weighted overlap of scopes (0.3), operations (0.4), and surrounding
/// contexts (0.3) between two variable profiles.
pub fn calculate_context_similarity(old_ctx: &VariableContext, new_ctx: &VariableContext) -> f64 {
    let mut similarity = 0.0;

    let method_union = old_ctx.scopes.union(&new_ctx.scopes).count();
    if method_union > 0 {
        let overlap = old_ctx.scopes.intersection(&new_ctx.scopes).count();
        similarity += (overlap as f64 / method_union as f64) * 0.3;
    }

    let op_union = old_ctx.operations.union(&new_ctx.operations).count();
    if op_union > 0 {
        let overlap = old_ctx.operations.intersection(&new_ctx.operations).count();
        similarity += (overlap as f64 / op_union as f64) * 0.4;
    }

    let ctx_union = old_ctx.neighborhoods.union(&new_ctx.neighborhoods).count();
    if ctx_union > 0 {
        let overlap = old_ctx.neighborhoods.intersection(&new_ctx.neighborhoods).count();
        similarity += (overlap as f64 / ctx_union as f64) * 0.3;
    }

    similarity
}

fn contexts_are_compatible(
    old_var: &str,
    new_var: &str,
    old_contexts: &HashMap<String, VariableContext>,
    new_contexts: &HashMap<String, VariableContext>,
) -> bool {
    let (Some(old_ctx), Some(new_ctx)) = (old_contexts.get(old_var), new_contexts.get(new_var)) else {
        return false;
    };
    if old_ctx.scopes.is_disjoint(&new_ctx.scopes) {
        return false;
    }
    if old_ctx.operations.is_disjoint(&new_ctx.operations) {
        return false;
    }
    true
}

/// Stage 1: match by usage-context similarity alone. Both sides need
/// at least 2 usages; best score above 0.6 wins.
pub fn find_variable_renames_by_context(
    old_contexts: &HashMap<String, VariableContext>,
    new_contexts: &HashMap<String, VariableContext>,
) -> HashMap<String, (String, f64)> {
    let mut renames = HashMap::new();

    let mut old_vars: Vec<&String> = old_contexts.keys().collect();
    old_vars.sort();

    for old_var in old_vars {
        let old_ctx = &old_contexts[old_var];
        if old_ctx.usage_count < 2 {
            continue;
        }

        let mut best_match: Option<String> = None;
        let mut best_score = 0.0;

        let mut new_vars: Vec<&String> = new_contexts.keys().collect();
        new_vars.sort();
        for new_var in new_vars {
            let new_ctx = &new_contexts[new_var];
            if new_ctx.usage_count < 2 {
                continue;
            }
            let score = calculate_context_similarity(old_ctx, new_ctx);
            if score > best_score && score > 0.6 {
                best_score = score;
                best_match = Some(new_var.clone());
            }
        }

        if let Some(new_var) = best_match {
            renames.insert(old_var.clone(), (new_var, best_score));
        }
    }

    renames
}

struct NamePattern {
    re: &'static str,
    replacement: &'static str,
    confidence: f64,
}

const COMMON_RENAME_PATTERNS: &[NamePattern] = &[
    NamePattern { re: r"^(\w+)Tb", replacement: "${1}Type", confidence: 0.9 },
    NamePattern { re: r"^(\w+)Temp", replacement: "$1", confidence: 0.7 },
    NamePattern { re: r"^(\w+)Var", replacement: "$1", confidence: 0.7 },
    NamePattern { re: r"^(\w+)Old", replacement: "$1", confidence: 0.6 },
    NamePattern { re: r"^(\w+)New", replacement: "$1", confidence: 0.6 },
    NamePattern { re: r"^(\w+)Binding", replacement: "${1}Type", confidence: 0.8 },
];

/// Stage 2: match by a known suffix-rewrite catalog (`xTb -> xType`,
/// `xTemp -> x`, ...). First pattern (in catalog order) whose rewrite
/// lands on an existing new-side variable, with compatible contexts,
/// wins.
pub fn find_variable_renames_by_pattern(
    old_contexts: &HashMap<String, VariableContext>,
    new_contexts: &HashMap<String, VariableContext>,
) -> HashMap<String, (String, f64)> {
    let mut renames = HashMap::new();

    let mut old_vars: Vec<&String> = old_contexts.keys().collect();
    old_vars.sort();

    for old_var in old_vars {
        for p in COMMON_RENAME_PATTERNS {
            let re = Regex::new(p.re).unwrap();
            if re.is_match(old_var) {
                let potential_new = re.replace(old_var, p.replacement).into_owned();
                if new_contexts.contains_key(&potential_new)
                    && contexts_are_compatible(old_var, &potential_new, old_contexts, new_contexts)
                {
                    renames.insert(old_var.clone(), (potential_new, p.confidence));
                    break;
                }
            }
        }
    }

    renames
}

/// Stage 4: variables sharing a base name (`xTb`, `yTb`, ...) that were
/// plausibly renamed together onto the same suffix convention.
pub fn find_paired_variable_renames(
    old_contexts: &HashMap<String, VariableContext>,
    new_contexts: &HashMap<String, VariableContext>,
) -> HashMap<String, (String, f64)> {
    let mut renames = HashMap::new();
    let mut grouped: HashMap<String, Vec<String>> = HashMap::new();

    let mut old_vars: Vec<&String> = old_contexts.keys().collect();
    old_vars.sort();

    for old_var in &old_vars {
        for suffix_re in [r"^(\w+)Tb", r"^(\w+)Binding"] {
            let re = Regex::new(suffix_re).unwrap();
            if let Some(caps) = re.captures(old_var.as_str()) {
                let base = caps[1].to_string();
                grouped.entry(base).or_default().push((*old_var).clone());
            }
        }
    }

    let mut bases: Vec<&String> = grouped.keys().collect();
    bases.sort();

    for base in bases {
        let group = &grouped[base];
        if group.len() < 2 {
            continue;
        }

        let mut potential_new_vars = Vec::new();
        for suffix in ["Type", ""] {
            let candidate = format!("{base}{suffix}");
            if new_contexts.contains_key(&candidate) {
                potential_new_vars.push(candidate);
            }
        }

        for (i, old_var) in group.iter().enumerate() {
            if let Some(new_var) = potential_new_vars.get(i) {
                if contexts_are_compatible(old_var, new_var, old_contexts, new_contexts) {
                    renames.insert(old_var.clone(), (new_var.clone(), 0.85));
                }
            }
        }
    }

    renames
}

struct NameSimilarityPattern {
    re: &'static str,
    replacement: &'static str,
    confidence: f64,
}

const NAME_SIMILARITY_PATTERNS: &[NameSimilarityPattern] = &[
    NameSimilarityPattern { re: r"^(\w+)Tb", replacement: "${1}Type", confidence: 0.9 },
    NameSimilarityPattern { re: r"^(\w+)Binding", replacement: "${1}Type", confidence: 0.8 },
    NameSimilarityPattern { re: r"^temp(\w+)", replacement: "$1", confidence: 0.7 },
    NameSimilarityPattern { re: r"^old(\w+)", replacement: "$1", confidence: 0.6 },
    NameSimilarityPattern { re: r"^new(\w+)", replacement: "$1", confidence: 0.6 },
];

/// Name similarity: exact match, a known rewrite pattern, or else
/// Levenshtein-based with a +0.2 bonus (capped at 1.0) for a shared
/// 3+ character prefix.
pub fn calculate_name_similarity(old_name: &str, new_name: &str) -> f64 {
    if old_name == new_name {
        return 1.0;
    }

    for p in NAME_SIMILARITY_PATTERNS {
        let re = Regex::new(p.re).unwrap();
        if re.is_match(old_name) {
            let rewritten = re.replace(old_name, p.replacement);
            if rewritten == new_name {
                return p.confidence;
            }
        }
    }

    let max_len = old_name.chars().count().max(new_name.chars().count());
    if max_len == 0 {
        return 0.0;
    }

    let distance = strsim::levenshtein(old_name, new_name);
    let mut similarity = 1.0 - (distance as f64 / max_len as f64);

    let common_prefix = old_name
        .chars()
        .zip(new_name.chars())
        .take_while(|(a, b)| a == b)
        .count();
    if common_prefix >= 3 {
        similarity = (similarity + 0.2).min(1.0);
    }

    similarity
}

/// Stage 3: Levenshtein name similarity (weight 0.3) combined with
/// usage-context similarity (weight 0.7); best score above 0.65 wins.
pub fn find_variable_renames_by_semantic_similarity(
    old_contexts: &HashMap<String, VariableContext>,
    new_contexts: &HashMap<String, VariableContext>,
) -> HashMap<String, (String, f64)> {
    let mut renames = HashMap::new();

    let mut old_vars: Vec<&String> = old_contexts.keys().collect();
    old_vars.sort();

    for old_var in old_vars {
        let old_ctx = &old_contexts[old_var];
        if old_ctx.usage_count < 2 {
            continue;
        }

        let mut best_match: Option<String> = None;
        let mut best_score = 0.0;

        let mut new_vars: Vec<&String> = new_contexts.keys().collect();
        new_vars.sort();
        for new_var in new_vars {
            let new_ctx = &new_contexts[new_var];
            if new_ctx.usage_count < 2 {
                continue;
            }
            let name_sim = calculate_name_similarity(old_var, new_var);
            let ctx_sim = calculate_context_similarity(old_ctx, new_ctx);
            let combined = name_sim * 0.3 + ctx_sim * 0.7;

            if combined > best_score && combined > 0.65 {
                best_score = combined;
                best_match = Some(new_var.clone());
            }
        }

        if let Some(new_var) = best_match {
            renames.insert(old_var.clone(), (new_var, best_score));
        }
    }

    renames
}

fn validate_rename(
    old_var: &str,
    new_var: &str,
    old_contexts: &HashMap<String, VariableContext>,
    new_contexts: &HashMap<String, VariableContext>,
    new_lines: &[String],
) -> bool {
    let old_re = Regex::new(&format!(r"\b{}\b", regex::escape(old_var))).unwrap();
    if new_lines.iter().any(|line| old_re.is_match(line)) {
        return false;
    }

    let (Some(old_ctx), Some(new_ctx)) = (old_contexts.get(old_var), new_contexts.get(new_var)) else {
        return false;
    };

    if old_ctx.operations.is_disjoint(&new_ctx.operations) {
        return false;
    }
    if old_ctx.scopes.is_disjoint(&new_ctx.scopes) {
        return false;
    }

    true
}

/// Run all four rename strategies, keep the highest-confidence
/// candidate per old variable, then apply the final validation gate
/// (confidence > 0.7, old name absent from the new side, and
/// operations/scopes intersecting).
pub fn detect_variable_renames(
    old_lines: &[String],
    new_lines: &[String],
    old_scopes: &ScopeMap,
    new_scopes: &ScopeMap,
) -> HashMap<String, String> {
    let (old_contexts, new_contexts) = build_variable_contexts(old_lines, new_lines, old_scopes, new_scopes);

    let mut all_renames: HashMap<String, (String, f64)> = HashMap::new();

    let merge = |all: &mut HashMap<String, (String, f64)>, stage: HashMap<String, (String, f64)>| {
        for (old_var, (new_var, conf)) in stage {
            match all.get(&old_var) {
                Some((_, existing_conf)) if *existing_conf >= conf => {}
                _ => {
                    all.insert(old_var, (new_var, conf));
                }
            }
        }
    };

    merge(&mut all_renames, find_variable_renames_by_context(&old_contexts, &new_contexts));
    merge(&mut all_renames, find_variable_renames_by_pattern(&old_contexts, &new_contexts));
    merge(
        &mut all_renames,
        find_variable_renames_by_semantic_similarity(&old_contexts, &new_contexts),
    );
    merge(&mut all_renames, find_paired_variable_renames(&old_contexts, &new_contexts));

    let mut validated = HashMap::new();
    for (old_var, (new_var, confidence)) in all_renames {
        if confidence > 0.7 && validate_rename(&old_var, &new_var, &old_contexts, &new_contexts, new_lines) {
            validated.insert(old_var, new_var);
        }
    }

    validated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_variables_skips_keywords_and_short_names() {
        let vars = extract_variables_from_line("if (countType == null) return;");
        assert!(vars.contains(&"countType".to_string()));
        assert!(!vars.contains(&"if".to_string()));
    }

    #[test]
    fn test_extract_variables_skips_declarations() {
        assert!(extract_variables_from_line("public class Foo {").is_empty());
    }

    #[test]
    fn test_name_similarity_exact_match() {
        assert_eq!(calculate_name_similarity("countTb", "countTb"), 1.0);
    }

    #[test]
    fn test_name_similarity_tb_to_type_pattern() {
        assert_eq!(calculate_name_similarity("countTb", "countType"), 0.9);
    }

    #[test]
    fn test_name_similarity_prefix_bonus() {
        let a = calculate_name_similarity("countAlpha", "countBeta");
        assert!(a > 0.0);
    }

    #[test]
    fn test_normalize_context_masks_tokens() {
        let out = normalize_context("int Foo = 42");
        assert_eq!(out, "VAR TYPE = NUM");
    }
}
