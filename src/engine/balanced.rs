//! Balanced delimiter scanning
//!
//! Many regex engines cannot express a pattern that refers to itself, which is
//! what "a brace group containing brace groups" needs. Instead of a recursive
//! regex, a balanced group is matched by walking the input and keeping a depth
//! counter.
//!
//! # Example
//!
//! ```
//! use tagscan::engine::balanced::scan_balanced;
//!
//! assert_eq!(scan_balanced("{a{b}c} tail", 0, '{', '}'), Some(7));
//! assert_eq!(scan_balanced("{a{b}c", 0, '{', '}'), None);
//! ```

/// Scan a balanced group starting at byte offset `pos`
///
/// The character at `pos` must be `open`. Every `open` increments the depth,
/// every `close` decrements it, and all other characters (including other
/// kinds of delimiters) are ordinary data.
///
/// # Returns
///
/// * `Some(end)` - byte offset just past the `close` that brings the depth back to zero
/// * `None` - no group starts at `pos`, or the input ends before it is closed
pub fn scan_balanced(input: &str, pos: usize, open: char, close: char) -> Option<usize> {
    let rest = input.get(pos..)?;
    let mut chars = rest.char_indices();

    match chars.next() {
        Some((_, c)) if c == open => {}
        _ => return None,
    }

    let mut depth = 1usize;
    for (idx, c) in chars {
        if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(pos + idx + c.len_utf8());
            }
        } else if c == open {
            depth += 1;
        }
    }

    None
}

/// Description of a delimiter pair for error messages and traces
pub fn describe(open: char, close: char) -> String {
    format!("balanced {}...{}", open, close)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_group() {
        assert_eq!(scan_balanced("{}", 0, '{', '}'), Some(2));
        assert_eq!(scan_balanced("(a)", 0, '(', ')'), Some(3));
    }

    #[test]
    fn test_nested_group() {
        assert_eq!(scan_balanced("{a{b}c}", 0, '{', '}'), Some(7));
        assert_eq!(scan_balanced("{{{}}}rest", 0, '{', '}'), Some(6));
    }

    #[test]
    fn test_unbalanced_fails() {
        assert_eq!(scan_balanced("{a{b}c", 0, '{', '}'), None);
        assert_eq!(scan_balanced("{", 0, '{', '}'), None);
    }

    #[test]
    fn test_must_start_with_open() {
        assert_eq!(scan_balanced("a{}", 0, '{', '}'), None);
        assert_eq!(scan_balanced("}", 0, '{', '}'), None);
        assert_eq!(scan_balanced("", 0, '{', '}'), None);
    }

    #[test]
    fn test_other_delimiters_are_opaque() {
        assert_eq!(scan_balanced("{ (] [) }", 0, '{', '}'), Some(9));
        assert_eq!(scan_balanced("(a{)", 0, '(', ')'), Some(4));
    }

    #[test]
    fn test_offset_start() {
        let input = "fn x() { y }";
        assert_eq!(scan_balanced(input, 4, '(', ')'), Some(6));
        assert_eq!(scan_balanced(input, 7, '{', '}'), Some(12));
    }

    #[test]
    fn test_multibyte_content() {
        let input = "{ 世界 {é} }";
        assert_eq!(scan_balanced(input, 0, '{', '}'), Some(input.len()));
    }

    #[test]
    fn test_offset_out_of_range() {
        assert_eq!(scan_balanced("{}", 10, '{', '}'), None);
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe('<', '>'), "balanced <...>");
    }
}
