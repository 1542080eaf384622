//! Source Location Utilities
//!
//! This module tracks positions in the text being tokenized. A [`Position`] is
//! advanced by feeding it the text that was consumed, so it never needs to
//! rescan the input from the beginning.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in source text
///
/// `offset` counts bytes from the start of the input; `line` is 1-based and
/// `column` is the 0-based number of characters since the last newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Line number (1-based)
    pub line: usize,
    /// Column number (0-based, counted in characters)
    pub column: usize,
    /// Byte offset from start of input
    pub offset: usize,
}

impl Position {
    /// Create a new position
    #[inline]
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }

    /// Create a position at the start of input
    #[inline]
    pub fn start() -> Self {
        Self {
            line: 1,
            column: 0,
            offset: 0,
        }
    }

    /// Return a copy of this position advanced past `text`
    #[must_use]
    pub fn update(&self, text: &str) -> Self {
        let mut next = *self;
        next.update_mut(text);
        next
    }

    /// Advance this position past `text` in place
    ///
    /// Returns `self` so updates can be chained.
    pub fn update_mut(&mut self, text: &str) -> &mut Self {
        self.offset += text.len();

        let bytes = text.as_bytes();
        match memchr::memrchr(b'\n', bytes) {
            Some(last) => {
                self.line += memchr::memchr_iter(b'\n', bytes).count();
                self.column = text[last + 1..].chars().count();
            }
            None => self.column += text.chars().count(),
        }
        self
    }

    /// The position reached after consuming all of `text` from the start
    pub fn replay(text: &str) -> Self {
        Self::start().update(text)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::start()
    }
}

/// Get the line content at a given offset
pub fn line_at_offset(input: &str, offset: usize) -> &str {
    let mut offset = offset.min(input.len());
    while !input.is_char_boundary(offset) {
        offset -= 1;
    }

    let line_start = input[..offset].rfind('\n').map(|pos| pos + 1).unwrap_or(0);
    let line_end = input[offset..]
        .find('\n')
        .map(|pos| offset + pos)
        .unwrap_or(input.len());

    &input[line_start..line_end]
}

/// Shorten `text` to at most `max_chars` characters for diagnostics
///
/// Appends `...` when anything was cut off.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
