//! Method/function boundary detection via brace-balance tracking.
//!
//! Grounded on `matcher.py::_find_method_boundaries` / `_get_method_context`.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::types::{MethodBoundary, ScopeMap};

fn method_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:public|private|protected)?\s*(?:\w+\s+)*(\w+)\s*\(").unwrap()
    })
}

/// Scan raw lines for method headers, tracking brace balance from each
/// header until it returns to or below zero. A name re-declared later
/// overwrites its earlier range, matching a plain-dict assignment in
/// the original.
pub fn find_method_boundaries(lines: &[String]) -> ScopeMap {
    let mut boundaries: HashMap<String, (usize, usize)> = HashMap::new();
    let mut current_method: Option<String> = None;
    let mut brace_count: i64 = 0;
    let mut method_start = 0usize;

    for (i, line) in lines.iter().enumerate() {
        let stripped = line.trim();
        if let Some(caps) = method_header_re().captures(stripped) {
            if current_method.is_none() {
                current_method = Some(caps[1].to_string());
                method_start = i;
                brace_count = 0;
            }
            brace_count += line.matches('{').count() as i64;
        } else if current_method.is_some() {
            brace_count += line.matches('{').count() as i64;
            brace_count -= line.matches('}').count() as i64;

            if brace_count <= 0 && line.contains('}') {
                let name = current_method.take().unwrap();
                boundaries.insert(name, (method_start, i));
                brace_count = 0;
            }
        }
    }

    let list = boundaries
        .into_iter()
        .map(|(name, (start, end))| MethodBoundary {
            name,
            // Python ranges are inclusive [start, end]; widen to a
            // half-open range covering the same index set.
            range: start..(end + 1),
        })
        .collect();

    ScopeMap::new(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_method_boundary() {
        let src = lines(&[
            "public void foo() {",
            "  int x = 1;",
            "  return;",
            "}",
        ]);
        let scopes = find_method_boundaries(&src);
        assert_eq!(scopes.scope_at(1), "foo");
        assert_eq!(scopes.scope_at(3), "foo");
    }

    #[test]
    fn test_lines_outside_method_are_global() {
        let src = lines(&["int x = 1;", "public void foo() {", "}"]);
        let scopes = find_method_boundaries(&src);
        assert_eq!(scopes.scope_at(0), "global");
    }

    #[test]
    fn test_no_methods_all_global() {
        let src = lines(&["a = 1;", "b = 2;"]);
        let scopes = find_method_boundaries(&src);
        assert_eq!(scopes.scope_at(0), "global");
        assert_eq!(scopes.scope_at(1), "global");
    }

    #[test]
    fn test_two_sequential_methods() {
        let src = lines(&[
            "void a() {",
            "  x = 1;",
            "}",
            "void b() {",
            "  y = 2;",
            "}",
        ]);
        let scopes = find_method_boundaries(&src);
        assert_eq!(scopes.scope_at(1), "a");
        assert_eq!(scopes.scope_at(4), "b");
    }
}
