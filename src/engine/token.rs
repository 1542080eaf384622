//! Token definitions
//!
//! A token definition pairs a kind name with a recognizer and a fetch
//! strategy. The recognizer decides whether the head of the buffer is this
//! kind of token; the fetch strategy decides what value the token carries and
//! how much of the buffer it consumes.
//!
//! Definitions are compiled against a [`PatternSet`] into a [`TokenGrammar`],
//! an ordered list of [`TokenMatcher`]s. Order is the only disambiguation rule:
//! the engine takes the first matcher that succeeds.
//!
//! # Example
//!
//! ```
//! use tagscan::engine::pattern_dsl::*;
//! use tagscan::engine::token::{FetchStrategy, TokenDef, TokenGrammar};
//!
//! let patterns = PatternBuilder::new()
//!     .rule("word", re("[a-z]+").capture("w"))
//!     .build()
//!     .unwrap();
//!
//! let grammar = TokenGrammar::builder(patterns)
//!     .token(TokenDef::new("space").regex(r"\s+").discard())
//!     .token(TokenDef::new("word").rule("word").fetch(FetchStrategy::capture("w")))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(grammar.kinds(), vec!["space", "word"]);
//! ```

use super::error::{DefinitionError, FetchError, MatchError, TokenizeError};
use super::matcher::{CaptureSpan, PatternMatch, PatternMatcher, DEFAULT_MAX_RECURSION_DEPTH};
use super::pattern::PatternSet;
use super::regex_cache;
use super::source_location::Position;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Token values
// ============================================================================

/// Value carried by a token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenValue {
    /// Plain text
    Text(String),
    /// Named captures in match order
    Captures(Vec<(String, String)>),
    /// A richer record built by a custom fetch
    Data(serde_json::Value),
}

impl TokenValue {
    /// The text of a [`TokenValue::Text`]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TokenValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The last capture named `name` of a [`TokenValue::Captures`]
    pub fn capture(&self, name: &str) -> Option<&str> {
        match self {
            TokenValue::Captures(captures) => captures
                .iter()
                .rev()
                .find(|(n, _)| n == name)
                .map(|(_, text)| text.as_str()),
            _ => None,
        }
    }

    /// Decode the value into a typed record
    ///
    /// Text decodes from a JSON string, captures from a JSON object keyed by
    /// capture name (later captures win), data as is.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let value = match self {
            TokenValue::Text(text) => serde_json::Value::String(text.clone()),
            TokenValue::Captures(captures) => serde_json::Value::Object(
                captures
                    .iter()
                    .map(|(n, t)| (n.clone(), serde_json::Value::String(t.clone())))
                    .collect(),
            ),
            TokenValue::Data(data) => data.clone(),
        };
        serde_json::from_value(value)
    }
}

/// A token produced by the engine
///
/// Immutable once produced; `position` is a snapshot of where the token
/// started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Token kind
    pub kind: String,
    /// Fetched value
    pub value: TokenValue,
    /// Exact text removed from the buffer
    pub raw: String,
    /// Position of the first character of `raw`
    pub position: Position,
}

impl Token {
    /// The token's text value, falling back to the raw text
    pub fn text(&self) -> &str {
        self.value.as_text().unwrap_or(&self.raw)
    }

    /// Position just past the token
    pub fn end_position(&self) -> Position {
        self.position.update(&self.raw)
    }
}

/// Result of a successful fetch
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    /// Value for the token
    pub value: TokenValue,
    /// Number of bytes to remove from the head of the buffer
    pub consumed: usize,
}

impl Fetched {
    /// Create a fetch result
    pub fn new(value: TokenValue, consumed: usize) -> Self {
        Self { value, consumed }
    }

    /// A text value consuming `consumed` bytes
    pub fn text(text: impl Into<String>, consumed: usize) -> Self {
        Self::new(TokenValue::Text(text.into()), consumed)
    }
}

// ============================================================================
// Fetch strategies
// ============================================================================

/// Signature of a custom fetch
///
/// Receives the whole remaining buffer and the recognizer's match. May consume
/// more or less than the match, and may return `Ok(None)` to decline.
pub type CustomFetch =
    Box<dyn Fn(&str, &PatternMatch) -> Result<Option<Fetched>, FetchError> + Send + Sync>;

/// How a matched token becomes a value
pub enum FetchStrategy {
    /// The whole match as text
    WholeMatch,
    /// One named capture as text
    Capture {
        /// Capture name
        name: String,
        /// Strip surrounding whitespace
        trim: bool,
    },
    /// All named captures
    Captures,
    /// A caller-supplied function
    Custom(CustomFetch),
}

impl FetchStrategy {
    /// Fetch one capture verbatim
    pub fn capture(name: &str) -> Self {
        FetchStrategy::Capture {
            name: name.to_string(),
            trim: false,
        }
    }

    /// Fetch one capture with surrounding whitespace removed
    pub fn trimmed_capture(name: &str) -> Self {
        FetchStrategy::Capture {
            name: name.to_string(),
            trim: true,
        }
    }

    /// Fetch with a custom function
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str, &PatternMatch) -> Result<Option<Fetched>, FetchError> + Send + Sync + 'static,
    {
        FetchStrategy::Custom(Box::new(f))
    }

    fn apply(&self, buffer: &str, m: &PatternMatch) -> Result<Option<Fetched>, FetchError> {
        match self {
            FetchStrategy::WholeMatch => Ok(Some(Fetched::text(m.as_str(buffer), m.end))),
            FetchStrategy::Capture { name, trim } => {
                let text = m.text(buffer, name).unwrap_or("");
                let text = if *trim { text.trim() } else { text };
                Ok(Some(Fetched::text(text, m.end)))
            }
            FetchStrategy::Captures => {
                let captures = m
                    .captures
                    .iter()
                    .map(|c| (c.name.clone(), buffer[c.range.clone()].to_string()))
                    .collect();
                Ok(Some(Fetched::new(TokenValue::Captures(captures), m.end)))
            }
            FetchStrategy::Custom(f) => f(buffer, m),
        }
    }
}

impl Default for FetchStrategy {
    fn default() -> Self {
        FetchStrategy::WholeMatch
    }
}

impl fmt::Debug for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStrategy::WholeMatch => f.write_str("WholeMatch"),
            FetchStrategy::Capture { name, trim } => f
                .debug_struct("Capture")
                .field("name", name)
                .field("trim", trim)
                .finish(),
            FetchStrategy::Captures => f.write_str("Captures"),
            FetchStrategy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// ============================================================================
// Token matchers
// ============================================================================

/// What a matcher may use while fetching
#[derive(Debug, Clone, Copy)]
pub struct FetchContext<'a> {
    /// The grammar's pattern set
    pub patterns: &'a PatternSet,
    /// Maximum depth of nested rule references
    pub max_depth: usize,
}

impl<'a> FetchContext<'a> {
    /// Create a context with the default recursion limit
    pub fn new(patterns: &'a PatternSet) -> Self {
        Self {
            patterns,
            max_depth: DEFAULT_MAX_RECURSION_DEPTH,
        }
    }

    /// Match an atom at the head of `buffer`
    pub fn match_head(&self, atom: usize, buffer: &str) -> Result<Option<PatternMatch>, MatchError> {
        PatternMatcher::new(self.patterns, buffer)
            .with_max_depth(self.max_depth)
            .match_atom(atom, 0)
    }
}

/// One candidate the engine tries at each step
///
/// The engine only sees this trait, so grammars can mix compiled
/// [`TokenDef`]s with hand-written matchers.
pub trait TokenMatcher: Send + Sync {
    /// Kind name of the tokens this matcher produces
    fn kind(&self) -> &str;

    /// Whether matched text is consumed without emitting a token
    fn is_discarded(&self) -> bool {
        false
    }

    /// Try to fetch a token from the head of `buffer`
    ///
    /// `Ok(None)` means "not this kind of token".
    fn fetch(&self, ctx: &FetchContext<'_>, buffer: &str) -> Result<Option<Fetched>, TokenizeError>;
}

/// Declarative token definition
#[derive(Debug)]
pub struct TokenDef {
    kind: String,
    rule: Option<String>,
    regex: Option<String>,
    fetch: FetchStrategy,
    discard: bool,
}

impl TokenDef {
    /// Start a definition for `kind`
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            rule: None,
            regex: None,
            fetch: FetchStrategy::WholeMatch,
            discard: false,
        }
    }

    /// Recognize the token with a named rule of the pattern set
    pub fn rule(mut self, name: &str) -> Self {
        self.rule = Some(name.to_string());
        self
    }

    /// Recognize the token with a standalone regex
    ///
    /// Named groups of the regex become captures.
    pub fn regex(mut self, source: &str) -> Self {
        self.regex = Some(source.to_string());
        self
    }

    /// Set the fetch strategy
    pub fn fetch(mut self, strategy: FetchStrategy) -> Self {
        self.fetch = strategy;
        self
    }

    /// Consume matches without emitting tokens
    pub fn discard(mut self) -> Self {
        self.discard = true;
        self
    }

    /// Kind name
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Validate the definition and compile it against `patterns`
    pub fn compile(self, patterns: &PatternSet) -> Result<CompiledToken, DefinitionError> {
        let kind = self.kind;

        if self.discard && !matches!(self.fetch, FetchStrategy::WholeMatch) {
            return Err(DefinitionError::ConflictingArguments {
                kind,
                message: "a discarded token cannot have a value-producing fetch".to_string(),
            });
        }

        let recognizer = match (self.rule, self.regex) {
            (Some(_), Some(_)) => {
                return Err(DefinitionError::ConflictingArguments {
                    kind,
                    message: "both a rule and a regex were given".to_string(),
                })
            }
            (None, None) => return Err(DefinitionError::MissingPattern { kind }),
            (Some(name), None) => {
                let atom = patterns
                    .rule(&name)
                    .ok_or_else(|| DefinitionError::UnresolvedRule { name: name.clone() })?;
                Recognizer::Rule { name, atom }
            }
            (None, Some(source)) => {
                let regex = regex_cache::compile_anchored(&source).map_err(|e| {
                    DefinitionError::InvalidRegex {
                        pattern: source.clone(),
                        reason: e.to_string(),
                    }
                })?;
                Recognizer::Regex { regex }
            }
        };

        if let FetchStrategy::Capture { name, .. } = &self.fetch {
            let known = match &recognizer {
                Recognizer::Rule { atom, .. } => patterns.capture_names(*atom).contains(name),
                Recognizer::Regex { regex } => regex.capture_names().flatten().any(|n| n == name),
            };
            if !known {
                return Err(DefinitionError::InvalidFetch {
                    kind,
                    message: format!("the recognizer never captures '{}'", name),
                });
            }
        }

        Ok(CompiledToken {
            kind,
            recognizer,
            fetch: self.fetch,
            discard: self.discard,
        })
    }
}

#[derive(Debug)]
enum Recognizer {
    Rule { name: String, atom: usize },
    Regex { regex: Regex },
}

/// A validated token definition, ready to be tried by the engine
#[derive(Debug)]
pub struct CompiledToken {
    kind: String,
    recognizer: Recognizer,
    fetch: FetchStrategy,
    discard: bool,
}

impl CompiledToken {
    /// Name of the rule this token is recognized by, if any
    pub fn rule_name(&self) -> Option<&str> {
        match &self.recognizer {
            Recognizer::Rule { name, .. } => Some(name),
            Recognizer::Regex { .. } => None,
        }
    }

    fn recognize(
        &self,
        ctx: &FetchContext<'_>,
        buffer: &str,
    ) -> Result<Option<PatternMatch>, MatchError> {
        match &self.recognizer {
            Recognizer::Rule { atom, .. } => ctx.match_head(*atom, buffer),
            Recognizer::Regex { regex } => Ok(regex.captures(buffer).map(|caps| {
                let captures = regex
                    .capture_names()
                    .enumerate()
                    .filter_map(|(i, name)| {
                        let name = name?;
                        let group = caps.get(i)?;
                        Some(CaptureSpan {
                            name: name.to_string(),
                            range: group.range(),
                        })
                    })
                    .collect();
                PatternMatch {
                    start: 0,
                    end: caps.get(0).map_or(0, |m| m.end()),
                    captures,
                }
            })),
        }
    }
}

impl TokenMatcher for CompiledToken {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn is_discarded(&self) -> bool {
        self.discard
    }

    fn fetch(&self, ctx: &FetchContext<'_>, buffer: &str) -> Result<Option<Fetched>, TokenizeError> {
        let Some(m) = self.recognize(ctx, buffer)? else {
            return Ok(None);
        };
        self.fetch
            .apply(buffer, &m)
            .map_err(|e| TokenizeError::Fetch {
                kind: self.kind.clone(),
                message: e.message,
            })
    }
}

// ============================================================================
// Token grammar
// ============================================================================

/// An ordered list of token matchers over one pattern set
pub struct TokenGrammar {
    patterns: PatternSet,
    matchers: Vec<Box<dyn TokenMatcher>>,
}

impl TokenGrammar {
    /// Start building a grammar over `patterns`
    pub fn builder(patterns: PatternSet) -> TokenGrammarBuilder {
        TokenGrammarBuilder {
            patterns,
            matchers: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// The grammar's pattern set
    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Matchers in the order they are tried
    pub fn matchers(&self) -> &[Box<dyn TokenMatcher>] {
        &self.matchers
    }

    /// Token kinds in the order they are tried
    pub fn kinds(&self) -> Vec<&str> {
        self.matchers.iter().map(|m| m.kind()).collect()
    }

    /// Number of matchers
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    /// Whether the grammar has no matchers
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl fmt::Debug for TokenGrammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrammar")
            .field("kinds", &self.kinds())
            .field("rules", &self.patterns.rule_names().len())
            .finish()
    }
}

/// Builder for [`TokenGrammar`]
pub struct TokenGrammarBuilder {
    patterns: PatternSet,
    matchers: Vec<Box<dyn TokenMatcher>>,
    errors: Vec<DefinitionError>,
}

impl TokenGrammarBuilder {
    /// Append a declarative token definition
    pub fn token(mut self, def: TokenDef) -> Self {
        match def.compile(&self.patterns) {
            Ok(compiled) => self.matchers.push(Box::new(compiled)),
            Err(e) => self.errors.push(e),
        }
        self
    }

    /// Append a hand-written matcher
    pub fn matcher(mut self, matcher: Box<dyn TokenMatcher>) -> Self {
        self.matchers.push(matcher);
        self
    }

    /// Finish the grammar
    ///
    /// # Errors
    /// Returns the first error found in any token definition.
    pub fn build(self) -> Result<TokenGrammar, DefinitionError> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(error);
        }
        log_debug!("Built token grammar with {} matchers", self.matchers.len());
        Ok(TokenGrammar {
            patterns: self.patterns,
            matchers: self.matchers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::pattern_dsl::*;

    fn word_patterns() -> PatternSet {
        PatternBuilder::new()
            .rule(
                "pair",
                re("[a-z]+").capture("key").then(lit("=")).then(re("[0-9]+").capture("val")),
            )
            .build()
            .unwrap()
    }

    fn fetch_one(def: TokenDef, patterns: &PatternSet, buffer: &str) -> Option<Fetched> {
        let compiled = def.compile(patterns).unwrap();
        compiled.fetch(&FetchContext::new(patterns), buffer).unwrap()
    }

    #[test]
    fn test_whole_match() {
        let patterns = word_patterns();
        let fetched = fetch_one(TokenDef::new("pair").rule("pair"), &patterns, "a=1 rest").unwrap();
        assert_eq!(fetched, Fetched::text("a=1", 3));
    }

    #[test]
    fn test_capture_and_captures() {
        let patterns = word_patterns();
        let fetched = fetch_one(
            TokenDef::new("pair").rule("pair").fetch(FetchStrategy::capture("val")),
            &patterns,
            "ab=42",
        )
        .unwrap();
        assert_eq!(fetched, Fetched::text("42", 5));

        let fetched = fetch_one(
            TokenDef::new("pair").rule("pair").fetch(FetchStrategy::Captures),
            &patterns,
            "ab=42",
        )
        .unwrap();
        assert_eq!(fetched.value.capture("key"), Some("ab"));
        assert_eq!(fetched.value.capture("val"), Some("42"));
    }

    #[test]
    fn test_regex_named_groups_are_captures() {
        let patterns = PatternSet::new();
        let fetched = fetch_one(
            TokenDef::new("heading")
                .regex(r"#+(?P<title>[^\n]*)\n?")
                .fetch(FetchStrategy::trimmed_capture("title")),
            &patterns,
            "## Title \nbody",
        )
        .unwrap();
        assert_eq!(fetched, Fetched::text("Title", 10));
    }

    #[test]
    fn test_regex_is_anchored() {
        let patterns = PatternSet::new();
        assert!(fetch_one(TokenDef::new("num").regex("[0-9]+"), &patterns, "x1").is_none());
    }

    #[test]
    fn test_custom_fetch_may_consume_more() {
        let patterns = PatternSet::new();
        let def = TokenDef::new("line").regex("#").fetch(FetchStrategy::custom(|buffer, _m| {
            let end = buffer.find('\n').map_or(buffer.len(), |i| i + 1);
            Ok(Some(Fetched::text(buffer[..end].trim_end(), end)))
        }));
        let fetched = fetch_one(def, &patterns, "# all of it\nnext").unwrap();
        assert_eq!(fetched, Fetched::text("# all of it", 12));
    }

    #[test]
    fn test_custom_fetch_error() {
        let patterns = PatternSet::new();
        let compiled = TokenDef::new("bad")
            .regex("x")
            .fetch(FetchStrategy::custom(|_, _| Err(FetchError::new("nope"))))
            .compile(&patterns)
            .unwrap();
        let err = compiled.fetch(&FetchContext::new(&patterns), "x").unwrap_err();
        assert_eq!(
            err,
            TokenizeError::Fetch {
                kind: "bad".to_string(),
                message: "nope".to_string()
            }
        );
    }

    #[test]
    fn test_conflicting_recognizers() {
        let patterns = word_patterns();
        let result = TokenDef::new("x").rule("pair").regex("x").compile(&patterns);
        assert!(matches!(result, Err(DefinitionError::ConflictingArguments { .. })));
    }

    #[test]
    fn test_missing_recognizer() {
        let result = TokenDef::new("x").compile(&PatternSet::new());
        assert_eq!(
            result.unwrap_err(),
            DefinitionError::MissingPattern {
                kind: "x".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_rule() {
        let result = TokenDef::new("x").rule("nope").compile(&PatternSet::new());
        assert!(matches!(result, Err(DefinitionError::UnresolvedRule { .. })));
    }

    #[test]
    fn test_capture_must_exist() {
        let patterns = word_patterns();
        let result = TokenDef::new("x")
            .rule("pair")
            .fetch(FetchStrategy::capture("missing"))
            .compile(&patterns);
        assert!(matches!(result, Err(DefinitionError::InvalidFetch { .. })));

        let result = TokenDef::new("x")
            .regex("(?P<a>a)")
            .fetch(FetchStrategy::capture("b"))
            .compile(&patterns);
        assert!(matches!(result, Err(DefinitionError::InvalidFetch { .. })));
    }

    #[test]
    fn test_discard_with_value_fetch_conflicts() {
        let result = TokenDef::new("x")
            .regex("(?P<a>a)")
            .fetch(FetchStrategy::capture("a"))
            .discard()
            .compile(&PatternSet::new());
        assert!(matches!(result, Err(DefinitionError::ConflictingArguments { .. })));
    }

    #[test]
    fn test_grammar_builder_reports_first_error() {
        let result = TokenGrammar::builder(PatternSet::new())
            .token(TokenDef::new("ok").regex("a"))
            .token(TokenDef::new("broken").regex("[oops"))
            .token(TokenDef::new("missing"))
            .build();
        assert!(matches!(result, Err(DefinitionError::InvalidRegex { .. })));
    }

    #[test]
    fn test_decode_captures() {
        #[derive(Deserialize)]
        struct Pair {
            key: String,
            val: String,
        }
        let value = TokenValue::Captures(vec![
            ("key".to_string(), "a".to_string()),
            ("val".to_string(), "1".to_string()),
        ]);
        let pair: Pair = value.decode().unwrap();
        assert_eq!(pair.key, "a");
        assert_eq!(pair.val, "1");
    }

    #[test]
    fn test_token_end_position() {
        let token = Token {
            kind: "block".to_string(),
            value: TokenValue::Text("x".to_string()),
            raw: "{\n  x\n}".to_string(),
            position: Position::new(2, 4, 10),
        };
        assert_eq!(token.end_position(), Position::new(4, 1, 17));
        assert_eq!(token.text(), "x");
    }
}
