//! Line normalization: the Normalizer component.
//!
//! Converts raw text lines into comparable canonical lines. Two passes:
//! a per-line transform (trim, collapse whitespace, strip same-line
//! comments, strip structural-noise punctuation, optional lowercasing),
//! then a second pass over the whole vector erasing lines that fall
//! inside a block comment spanning line boundaries.

use regex::Regex;
use std::sync::OnceLock;

use crate::config::NormalizeOptions;

const STRIPPED_PUNCTUATION: &[char] = &[';', ',', '(', ')', '{', '}', '[', ']'];

fn inline_block_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/\*.*?\*/").unwrap())
}

/// Normalize a vector of raw lines. Output length always equals input
/// length (empty lines are preserved as empty strings). Never fails;
/// malformed encodings are the caller's concern (lossy-decoded before
/// reaching this function).
pub fn normalize(raw_lines: &[String], opts: NormalizeOptions) -> Vec<String> {
    let mut lines: Vec<String> = raw_lines.iter().map(|l| normalize_line(l, opts)).collect();
    if opts.remove_comments {
        erase_multiline_block_comments(&mut lines);
    }
    lines
}

fn normalize_line(line: &str, opts: NormalizeOptions) -> String {
    let mut s = line.trim().to_string();
    s = collapse_whitespace(&s);

    if opts.remove_comments {
        s = strip_after(&s, "//");
        s = strip_after(&s, "#");
        s = inline_block_comment_re().replace_all(&s, "").to_string();
    }

    s = collapse_whitespace(&s.replace(STRIPPED_PUNCTUATION, " "));

    if opts.lowercase {
        s = s.to_lowercase();
    }

    s.trim().to_string()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_after(s: &str, marker: &str) -> String {
    match s.find(marker) {
        Some(pos) => s[..pos].to_string(),
        None => s.to_string(),
    }
}

/// Erase lines that fall inside a block comment spanning line
/// boundaries. Three delimiter families are recognized: `/* */`,
/// `''' '''`, `""" """`. Nesting is unsupported; the first matching
/// closer wins.
fn erase_multiline_block_comments(lines: &mut [String]) {
    erase_family(lines, "/*", "*/");
    erase_family(lines, "'''", "'''");
    erase_family(lines, "\"\"\"", "\"\"\"");
}

fn erase_family(lines: &mut [String], open: &str, close: &str) {
    let mut i = 0;
    while i < lines.len() {
        let Some(open_pos) = lines[i].find(open) else {
            i += 1;
            continue;
        };
        let after_open = open_pos + open.len();
        if lines[i][after_open..].find(close).is_some() {
            // Closes on the same line; same-line pairs are not this
            // pass's concern.
            i += 1;
            continue;
        }

        lines[i].truncate(open_pos);
        lines[i] = lines[i].trim_end().to_string();
        let mut j = i + 1;
        while j < lines.len() {
            if let Some(close_pos) = lines[j].find(close) {
                lines[j] = lines[j][close_pos + close.len()..].trim_start().to_string();
                j += 1;
                break;
            } else {
                lines[j] = String::new();
                j += 1;
            }
        }
        i = j;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_length_preservation() {
        let raw = lines(&["a", "", "  b  ", "c"]);
        let opts = NormalizeOptions::default();
        assert_eq!(normalize(&raw, opts).len(), raw.len());
    }

    #[test]
    fn test_empty_input() {
        let raw: Vec<String> = Vec::new();
        assert!(normalize(&raw, NormalizeOptions::default()).is_empty());
    }

    #[test]
    fn test_whitespace_collapse_and_trim() {
        let raw = lines(&["  a    b   c  "]);
        let out = normalize(&raw, NormalizeOptions::default());
        assert_eq!(out[0], "a b c");
    }

    #[test]
    fn test_strips_line_comments() {
        let opts = NormalizeOptions {
            remove_comments: true,
            lowercase: false,
        };
        let raw = lines(&["a = 1; // trailing comment", "b = 2 # hash comment"]);
        let out = normalize(&raw, opts);
        assert_eq!(out[0], "a = 1");
        assert_eq!(out[1], "b = 2");
    }

    #[test]
    fn test_strips_inline_block_comment() {
        let opts = NormalizeOptions {
            remove_comments: true,
            lowercase: false,
        };
        let raw = lines(&["a /* noise */ b"]);
        let out = normalize(&raw, opts);
        assert_eq!(out[0], "a b");
    }

    #[test]
    fn test_strips_structural_punctuation() {
        let raw = lines(&["foo(a, b) { return; }"]);
        let out = normalize(&raw, NormalizeOptions::default());
        assert_eq!(out[0], "foo a b return");
    }

    #[test]
    fn test_lowercase_option() {
        let opts = NormalizeOptions {
            remove_comments: false,
            lowercase: true,
        };
        let raw = lines(&["HELLO World"]);
        assert_eq!(normalize(&raw, opts)[0], "hello world");
    }

    #[test]
    fn test_multiline_block_comment_erasure() {
        let raw = lines(&["a /* start", "middle", "end */ b"]);
        let opts = NormalizeOptions {
            remove_comments: true,
            lowercase: false,
        };
        let out = normalize(&raw, opts);
        assert_eq!(out[0], "a");
        assert_eq!(out[1], "");
        assert_eq!(out[2], "b");
    }

    #[test]
    fn test_idempotent() {
        let raw = lines(&[
            "  a   b  // c",
            "int x = foo(1, 2);",
            "/* open",
            "mid",
            "close */ tail",
        ]);
        let opts = NormalizeOptions {
            remove_comments: true,
            lowercase: true,
        };
        let once = normalize(&raw, opts);
        let twice = normalize(&once, opts);
        assert_eq!(once, twice);
    }
}
