//! Pattern matcher
//!
//! This module evaluates a [`PatternSet`] against text. Matching is anchored:
//! an atom either matches starting exactly at the given offset or it fails.
//! Alternatives are ordered (first success wins) and repetitions are greedy
//! without backtracking into them, so a match is always deterministic.
//!
//! An ordinary mismatch is `Ok(None)`. `Err` is reserved for conditions that
//! mean the pattern set itself is broken, such as unbounded recursion.

use super::balanced::scan_balanced;
use super::error::MatchError;
use super::pattern::{Atom, PatternSet};
use super::regex_cache;
use std::ops::Range;

/// Default maximum depth of nested rule references
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 512;

/// A named span recorded by a capture atom
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSpan {
    /// Capture name
    pub name: String,
    /// Byte range in the matched input
    pub range: Range<usize>,
}

/// A successful anchored match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// Byte offset where the match starts
    pub start: usize,
    /// Byte offset just past the match
    pub end: usize,
    /// Captures in the order they completed
    pub captures: Vec<CaptureSpan>,
}

impl PatternMatch {
    /// Length of the match in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the match is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The matched text
    pub fn as_str<'i>(&self, input: &'i str) -> &'i str {
        &input[self.start..self.end]
    }

    /// Range of the last capture named `name`
    pub fn get(&self, name: &str) -> Option<Range<usize>> {
        self.captures
            .iter()
            .rev()
            .find(|c| c.name == name)
            .map(|c| c.range.clone())
    }

    /// Text of the last capture named `name`
    pub fn text<'i>(&self, input: &'i str, name: &str) -> Option<&'i str> {
        self.get(name).map(|range| &input[range])
    }

    /// Text of every capture named `name`, in order
    pub fn all<'i>(&self, input: &'i str, name: &str) -> Vec<&'i str> {
        self.captures
            .iter()
            .filter(|c| c.name == name)
            .map(|c| &input[c.range.clone()])
            .collect()
    }
}

/// Evaluates atoms of a pattern set over one input
pub struct PatternMatcher<'a> {
    set: &'a PatternSet,
    input: &'a str,
    captures: Vec<CaptureSpan>,
    depth: usize,
    max_depth: usize,
}

impl<'a> PatternMatcher<'a> {
    /// Create a matcher with the default recursion limit
    pub fn new(set: &'a PatternSet, input: &'a str) -> Self {
        Self {
            set,
            input,
            captures: Vec::new(),
            depth: 0,
            max_depth: DEFAULT_MAX_RECURSION_DEPTH,
        }
    }

    /// Set the maximum depth of nested rule references
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Match atom `atom_id` anchored at byte offset `pos`
    pub fn match_atom(
        &mut self,
        atom_id: usize,
        pos: usize,
    ) -> Result<Option<PatternMatch>, MatchError> {
        self.captures.clear();
        self.depth = 0;
        if !self.input.is_char_boundary(pos) {
            return Ok(None);
        }
        Ok(self.try_atom(atom_id, pos)?.map(|end| PatternMatch {
            start: pos,
            end,
            captures: std::mem::take(&mut self.captures),
        }))
    }

    /// Try to match an atom at the given position, returning the end offset
    fn try_atom(&mut self, atom_id: usize, pos: usize) -> Result<Option<usize>, MatchError> {
        let set = self.set;
        let atom = set
            .atom(atom_id)
            .ok_or(MatchError::InvalidAtom { index: atom_id })?;

        match atom {
            Atom::Literal { text } => Ok(self.input[pos..]
                .starts_with(text.as_str())
                .then(|| pos + text.len())),
            Atom::Re { pattern } => self.match_re(pattern, pos),
            Atom::Sequence { atoms } => self.match_sequence(atoms, pos),
            Atom::Alternative { atoms } => self.match_alternative(atoms, pos),
            Atom::Repetition { atom, min, max } => self.match_repetition(*atom, *min, *max, pos),
            Atom::Optional { atom } => {
                let mark = self.captures.len();
                match self.try_atom(*atom, pos)? {
                    Some(end) => Ok(Some(end)),
                    None => {
                        self.captures.truncate(mark);
                        Ok(Some(pos))
                    }
                }
            }
            Atom::SeparatedList { element, separator } => {
                self.match_list(*element, *separator, pos)
            }
            Atom::Balanced { open, close, .. } => Ok(scan_balanced(self.input, pos, *open, *close)),
            Atom::Capture { name, atom } => {
                let end = self.try_atom(*atom, pos)?;
                if let Some(end) = end {
                    self.captures.push(CaptureSpan {
                        name: name.clone(),
                        range: pos..end,
                    });
                }
                Ok(end)
            }
            Atom::Entity { atom } => {
                self.depth += 1;
                if self.depth > self.max_depth {
                    return Err(MatchError::RecursionLimitExceeded {
                        depth: self.depth,
                        max_depth: self.max_depth,
                    });
                }
                let result = self.try_atom(*atom, pos);
                self.depth -= 1;
                result
            }
            Atom::Lookahead { atom, positive } => {
                let mark = self.captures.len();
                let matched = self.try_atom(*atom, pos)?.is_some();
                self.captures.truncate(mark);
                Ok((matched == *positive).then_some(pos))
            }
        }
    }

    fn match_re(&mut self, pattern: &str, pos: usize) -> Result<Option<usize>, MatchError> {
        let regex = regex_cache::get_or_compile(pattern).map_err(|e| MatchError::InvalidRegex {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(regex.find(&self.input[pos..]).map(|m| pos + m.end()))
    }

    fn match_sequence(&mut self, atoms: &[usize], pos: usize) -> Result<Option<usize>, MatchError> {
        let mark = self.captures.len();
        let mut current = pos;
        for &atom_id in atoms {
            match self.try_atom(atom_id, current)? {
                Some(end) => current = end,
                None => {
                    self.captures.truncate(mark);
                    return Ok(None);
                }
            }
        }
        Ok(Some(current))
    }

    fn match_alternative(
        &mut self,
        atoms: &[usize],
        pos: usize,
    ) -> Result<Option<usize>, MatchError> {
        let mark = self.captures.len();
        for &atom_id in atoms {
            if let Some(end) = self.try_atom(atom_id, pos)? {
                return Ok(Some(end));
            }
            self.captures.truncate(mark);
        }
        Ok(None)
    }

    fn match_repetition(
        &mut self,
        atom_id: usize,
        min: usize,
        max: Option<usize>,
        pos: usize,
    ) -> Result<Option<usize>, MatchError> {
        let start_mark = self.captures.len();
        let mut current = pos;
        let mut count = 0;

        while max.map_or(true, |max| count < max) {
            let mark = self.captures.len();
            match self.try_atom(atom_id, current)? {
                Some(end) if end > current => {
                    current = end;
                    count += 1;
                }
                Some(_) => {
                    // an empty match would repeat forever; it satisfies any minimum
                    count = count.max(min);
                    break;
                }
                None => {
                    self.captures.truncate(mark);
                    break;
                }
            }
        }

        if count < min {
            self.captures.truncate(start_mark);
            return Ok(None);
        }
        Ok(Some(current))
    }

    fn match_list(
        &mut self,
        element: usize,
        separator: usize,
        pos: usize,
    ) -> Result<Option<usize>, MatchError> {
        let Some(mut current) = self.try_atom(element, pos)? else {
            return Ok(None);
        };

        loop {
            let mark = self.captures.len();
            let sep_start = self.skip_whitespace(current);
            let Some(sep_end) = self.try_atom(separator, sep_start)? else {
                self.captures.truncate(mark);
                break;
            };
            let element_start = self.skip_whitespace(sep_end);
            match self.try_atom(element, element_start)? {
                Some(end) if end > current => current = end,
                _ => {
                    self.captures.truncate(mark);
                    break;
                }
            }
        }

        Ok(Some(current))
    }

    fn skip_whitespace(&self, pos: usize) -> usize {
        let rest = &self.input[pos..];
        pos + (rest.len() - rest.trim_start().len())
    }
}

impl PatternSet {
    /// Match atom `atom_id` anchored at `pos` in `input`
    pub fn match_at(
        &self,
        atom_id: usize,
        input: &str,
        pos: usize,
    ) -> Result<Option<PatternMatch>, MatchError> {
        PatternMatcher::new(self, input).match_atom(atom_id, pos)
    }

    /// Match the named rule at the start of `input`
    pub fn match_rule(&self, name: &str, input: &str) -> Result<Option<PatternMatch>, MatchError> {
        let atom_id = self.rule(name).ok_or_else(|| MatchError::UnknownRule {
            name: name.to_string(),
        })?;
        self.match_at(atom_id, input, 0)
    }

    /// Find every non-overlapping occurrence of the named rule in `input`
    ///
    /// Positions are tried left to right; after a match the search resumes at
    /// its end, otherwise one character further on.
    pub fn find_all(&self, name: &str, input: &str) -> Result<Vec<PatternMatch>, MatchError> {
        let atom_id = self.rule(name).ok_or_else(|| MatchError::UnknownRule {
            name: name.to_string(),
        })?;

        let mut matcher = PatternMatcher::new(self, input);
        let mut found = Vec::new();
        let mut pos = 0;
        while pos < input.len() {
            match matcher.match_atom(atom_id, pos)? {
                Some(m) if !m.is_empty() => {
                    pos = m.end;
                    found.push(m);
                }
                _ => {
                    pos += input[pos..].chars().next().map_or(1, char::len_utf8);
                }
            }
        }
        Ok(found)
    }
}
