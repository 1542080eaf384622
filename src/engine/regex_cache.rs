//! Thread-local regex cache for pattern compilation
//!
//! Primitive atoms and standalone token recognizers are regex fragments that
//! must only match at the current position. Fragments are compiled once,
//! wrapped as `^(?:fragment)`, and cached per thread.

use hashbrown::HashMap;
use regex::Regex;
use std::cell::RefCell;

thread_local! {
    /// Thread-local cache of compiled, start-anchored regex patterns
    static REGEX_CACHE: RefCell<HashMap<String, Regex>> = RefCell::new(HashMap::new());
}

/// Compile `pattern` anchored at the start of the haystack
pub fn compile_anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})", pattern))
}

/// Get or compile an anchored regex pattern
///
/// # Returns
/// * `Ok(Regex)` if the pattern is valid
/// * `Err(regex::Error)` describing why the pattern failed to compile
pub fn get_or_compile(pattern: &str) -> Result<Regex, regex::Error> {
    REGEX_CACHE.with(|cache| {
        if let Some(regex) = cache.borrow().get(pattern) {
            return Ok(regex.clone());
        }

        let regex = compile_anchored(pattern)?;
        cache
            .borrow_mut()
            .insert(pattern.to_string(), regex.clone());
        Ok(regex)
    })
}

/// Clear the regex cache
pub fn clear_cache() {
    REGEX_CACHE.with(|cache| cache.borrow_mut().clear());
}

/// Get the number of cached patterns
pub fn cache_size() -> usize {
    REGEX_CACHE.with(|cache| cache.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_compilation() {
        clear_cache();

        assert!(get_or_compile("[0-9]+").is_ok());
        assert_eq!(cache_size(), 1);

        assert!(get_or_compile("[0-9]+").is_ok());
        assert_eq!(cache_size(), 1);

        assert!(get_or_compile("[a-z]+").is_ok());
        assert_eq!(cache_size(), 2);
    }

    #[test]
    fn test_invalid_pattern() {
        clear_cache();

        assert!(get_or_compile("[invalid").is_err());
        assert_eq!(cache_size(), 0);
    }

    #[test]
    fn test_matches_are_anchored() {
        let r = get_or_compile("[a-z]+").unwrap();
        assert!(r.find("123abc").is_none());

        let m = r.find("hello_world").unwrap();
        assert_eq!(m.as_str(), "hello");
    }

    #[test]
    fn test_alternation_is_grouped_before_anchoring() {
        let r = get_or_compile("ab|cd").unwrap();
        assert!(r.is_match("cd"));
        assert!(!r.is_match("xcd"));
    }
}
