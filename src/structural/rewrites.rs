//! Logic-rewrite detection: compares control-flow feature counts
//! between same-named methods on each side.
//!
//! Grounded on `matcher.py::_analyze_control_flow`, `_is_major_rewrite`,
//! `_calculate_rewrite_confidence`, `_detect_logic_rewrites`.

use crate::types::ScopeMap;

/// Cyclomatic-complexity-adjacent feature counts for one method body.
/// `nested_blocks` is tracked in the original but never read anywhere
/// downstream; it is dropped here rather than carried as dead weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlFlowFeatures {
    pub early_returns: usize,
    pub conditional_blocks: usize,
    pub null_checks: usize,
    pub assignments: usize,
}

/// Count control-flow features over a method's line range. `brace_level`
/// tracks nesting so `return` only counts as an early return once inside
/// a block.
pub fn analyze_control_flow(method_lines: &[String]) -> ControlFlowFeatures {
    let mut features = ControlFlowFeatures::default();
    let mut brace_level: i64 = 0;

    for line in method_lines {
        let stripped = line.trim();

        if stripped.contains("return") && brace_level > 0 {
            features.early_returns += 1;
        }

        if ["if", "else", "for", "while"]
            .iter()
            .any(|kw| stripped.contains(kw))
        {
            features.conditional_blocks += 1;
        }

        if stripped.contains("!= null") || stripped.contains("== null") {
            features.null_checks += 1;
        }

        if stripped.contains('=') && !stripped.starts_with("if") && !stripped.starts_with("while") {
            features.assignments += 1;
        }

        brace_level += line.matches('{').count() as i64;
        brace_level -= line.matches('}').count() as i64;
    }

    features
}

/// A rewrite is "major" when early returns or conditional-block counts
/// shift by 2 or more between the old and new method body.
pub fn is_major_rewrite(old_flow: &ControlFlowFeatures, new_flow: &ControlFlowFeatures) -> bool {
    let early_return_change = old_flow.early_returns.abs_diff(new_flow.early_returns) >= 2;
    let conditional_change = old_flow.conditional_blocks.abs_diff(new_flow.conditional_blocks) >= 2;
    early_return_change || conditional_change
}

/// Fixed confidence schedule: +0.4 for any early-return delta, +0.3 for
/// any conditional-block delta, +0.2 for any null-check delta, capped
/// at 1.0.
pub fn calculate_rewrite_confidence(old_flow: &ControlFlowFeatures, new_flow: &ControlFlowFeatures) -> f64 {
    let mut confidence = 0.0;
    if old_flow.early_returns != new_flow.early_returns {
        confidence += 0.4;
    }
    if old_flow.conditional_blocks != new_flow.conditional_blocks {
        confidence += 0.3;
    }
    if old_flow.null_checks != new_flow.null_checks {
        confidence += 0.2;
    }
    confidence.min(1.0)
}

/// One detected rewrite: the method name, both flow fingerprints, each
/// side's starting line, and the confidence score.
#[derive(Debug, Clone)]
pub struct LogicRewrite {
    pub method_name: String,
    pub old_flow: ControlFlowFeatures,
    pub new_flow: ControlFlowFeatures,
    pub old_start: usize,
    pub new_start: usize,
    pub confidence: f64,
}

/// Compare methods present on both sides (matched by name) and report
/// the ones whose control flow shifted enough to call a rewrite.
pub fn detect_logic_rewrites(
    old_lines: &[String],
    new_lines: &[String],
    old_scopes: &ScopeMap,
    new_scopes: &ScopeMap,
) -> Vec<LogicRewrite> {
    let mut rewrites = Vec::new();

    for old_method in old_scopes.iter() {
        let Some(new_method) = new_scopes.iter().find(|m| m.name == old_method.name) else {
            continue;
        };

        let old_flow = analyze_control_flow(&old_lines[old_method.range.clone()]);
        let new_flow = analyze_control_flow(&new_lines[new_method.range.clone()]);

        if is_major_rewrite(&old_flow, &new_flow) {
            rewrites.push(LogicRewrite {
                method_name: old_method.name.clone(),
                confidence: calculate_rewrite_confidence(&old_flow, &new_flow),
                old_start: old_method.range.start,
                new_start: new_method.range.start,
                old_flow,
                new_flow,
            });
        }
    }

    rewrites
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MethodBoundary;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_analyze_control_flow_counts() {
        let body = lines(&[
            "void m() {",
            "  if (x == null) {",
            "    return;",
            "  }",
            "  y = 1;",
            "}",
        ]);
        let flow = analyze_control_flow(&body);
        assert_eq!(flow.conditional_blocks, 1);
        assert_eq!(flow.null_checks, 1);
        assert_eq!(flow.early_returns, 1);
        assert_eq!(flow.assignments, 1);
    }

    #[test]
    fn test_is_major_rewrite_requires_delta_of_two() {
        let a = ControlFlowFeatures {
            early_returns: 1,
            ..Default::default()
        };
        let b = ControlFlowFeatures {
            early_returns: 2,
            ..Default::default()
        };
        assert!(!is_major_rewrite(&a, &b));

        let c = ControlFlowFeatures {
            early_returns: 3,
            ..Default::default()
        };
        assert!(is_major_rewrite(&a, &c));
    }

    #[test]
    fn test_calculate_rewrite_confidence_schedule() {
        let old_flow = ControlFlowFeatures {
            early_returns: 0,
            conditional_blocks: 0,
            null_checks: 0,
            assignments: 0,
        };
        let new_flow = ControlFlowFeatures {
            early_returns: 3,
            conditional_blocks: 3,
            null_checks: 1,
            assignments: 0,
        };
        assert_eq!(calculate_rewrite_confidence(&old_flow, &new_flow), 0.9);
    }

    #[test]
    fn test_detect_logic_rewrites_matches_by_method_name() {
        let old = lines(&[
            "void m() {",
            "  if (a) {",
            "    return;",
            "  }",
            "}",
        ]);
        let new = lines(&[
            "void m() {",
            "  if (a) { return; }",
            "  if (b) { return; }",
            "  if (c) { return; }",
            "}",
        ]);
        let old_scopes = ScopeMap::new(vec![MethodBoundary {
            name: "m".to_string(),
            range: 0..5,
        }]);
        let new_scopes = ScopeMap::new(vec![MethodBoundary {
            name: "m".to_string(),
            range: 0..5,
        }]);
        let rewrites = detect_logic_rewrites(&old, &new, &old_scopes, &new_scopes);
        assert_eq!(rewrites.len(), 1);
        assert_eq!(rewrites[0].method_name, "m");
    }
}
