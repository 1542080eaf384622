//! Tokenizing engine
//!
//! A [`ParseState`] owns one input text and walks it from the front. Each
//! [`step`](ParseState::step) tries the grammar's matchers in order against
//! the remaining buffer, removes what the first successful matcher consumed,
//! and returns the resulting token stamped with the position where it
//! started.
//!
//! Every step either consumes at least one byte or ends the run, so a run over
//! a finite buffer takes at most `buffer.len()` steps.
//!
//! # Example
//!
//! ```
//! use tagscan::engine::pattern::PatternSet;
//! use tagscan::engine::token::{TokenDef, TokenGrammar};
//! use tagscan::engine::tokenizer::ParseState;
//!
//! let grammar = TokenGrammar::builder(PatternSet::new())
//!     .token(TokenDef::new("space").regex(r"\s+").discard())
//!     .token(TokenDef::new("number").regex("[0-9]+"))
//!     .build()
//!     .unwrap();
//!
//! let tokens = ParseState::new(&grammar, "12 345\n6").run().unwrap();
//! let texts: Vec<&str> = tokens.iter().map(|t| t.text()).collect();
//! assert_eq!(texts, vec!["12", "345", "6"]);
//! assert_eq!(tokens[2].position.to_string(), "2:0");
//! ```

use super::config::TokenizerOptions;
use super::error::TokenizeError;
use super::sink::{TokenCollector, TokenSink};
use super::source_location::Position;
use super::token::{Fetched, FetchContext, Token, TokenGrammar};
use std::io::{self, Write};

/// File label used when none is given
pub const DEFAULT_FILE_LABEL: &str = "<input>";

/// Outcome of a single step
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// A token was produced
    Token(Token),
    /// Input was consumed by a discarded definition
    Skipped,
    /// Nothing left to do
    Done,
}

/// State of one tokenizing run
pub struct ParseState<'g> {
    grammar: &'g TokenGrammar,
    source: String,
    cursor: usize,
    position: Position,
    file: String,
    options: TokenizerOptions,
    previous: Option<Token>,
    terminated: bool,
    dump: Option<Box<dyn Write + 'g>>,
}

impl<'g> ParseState<'g> {
    /// Create a run over `input` with default options
    pub fn new(grammar: &'g TokenGrammar, input: impl Into<String>) -> Self {
        Self {
            grammar,
            source: input.into(),
            cursor: 0,
            position: Position::start(),
            file: DEFAULT_FILE_LABEL.to_string(),
            options: TokenizerOptions::default(),
            previous: None,
            terminated: false,
            dump: None,
        }
    }

    /// Set the file label used in diagnostics and dumps
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    /// Start counting from `start` instead of `1:0`
    ///
    /// Used when the input is a fragment of a larger text.
    pub fn with_start(mut self, start: Position) -> Self {
        self.position = start;
        self
    }

    /// Set run options
    pub fn with_options(mut self, options: TokenizerOptions) -> Self {
        self.options = options;
        self
    }

    /// Send the token dump to `writer` instead of stderr
    pub fn with_dump_writer(mut self, writer: impl Write + 'g) -> Self {
        self.dump = Some(Box::new(writer));
        self
    }

    /// The remaining, not yet consumed input
    pub fn buffer(&self) -> &str {
        &self.source[self.cursor..]
    }

    /// The full original input
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Position of the head of the buffer
    pub fn position(&self) -> Position {
        self.position
    }

    /// File label
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Active options
    pub fn options(&self) -> &TokenizerOptions {
        &self.options
    }

    /// The most recently emitted token
    pub fn previous_token(&self) -> Option<&Token> {
        self.previous.as_ref()
    }

    /// Request that the run stop before the next step
    pub fn terminate(&mut self) {
        self.terminated = true;
    }

    /// Whether the run has nothing left to do
    pub fn is_done(&self) -> bool {
        self.terminated || self.cursor >= self.source.len()
    }

    /// Perform one step
    ///
    /// # Errors
    /// * [`TokenizeError::Grammar`] - no matcher accepted the head of the buffer
    /// * [`TokenizeError::ZeroProgress`] - a matcher succeeded without consuming
    /// * [`TokenizeError::ContractViolation`] - a matcher consumed an impossible span
    /// * errors raised by the matchers themselves
    pub fn step(&mut self) -> Result<Step, TokenizeError> {
        if self.is_done() {
            return Ok(Step::Done);
        }

        if self.options.trim_input {
            let buffer = self.buffer();
            let skip = buffer.len() - buffer.trim_start().len();
            if skip > 0 {
                self.advance(skip);
            }
            if self.is_done() {
                return Ok(Step::Done);
            }
        }

        let grammar = self.grammar;
        let ctx = FetchContext {
            patterns: grammar.patterns(),
            max_depth: self.options.max_recursion_depth,
        };

        for matcher in grammar.matchers() {
            let Some(Fetched { value, consumed }) = matcher.fetch(&ctx, self.buffer())? else {
                continue;
            };
            self.check_consumed(matcher.kind(), consumed)?;

            let position = self.position;
            let raw = self.buffer()[..consumed].to_string();
            self.advance(consumed);

            if matcher.is_discarded() {
                return Ok(Step::Skipped);
            }

            let token = Token {
                kind: matcher.kind().to_string(),
                value,
                raw,
                position,
            };
            self.previous = Some(token.clone());
            return Ok(Step::Token(token));
        }

        Err(TokenizeError::grammar(
            self.file.clone(),
            self.position,
            self.buffer(),
        ))
    }

    /// Run to completion, collecting tokens
    pub fn run(&mut self) -> Result<Vec<Token>, TokenizeError> {
        self.run_with(TokenCollector::new())
    }

    /// Run to completion, feeding tokens to `sink`
    ///
    /// Stops early when the sink breaks or [`terminate`](Self::terminate) was
    /// called; the sink's `finish` is still called in both cases.
    pub fn run_with<S: TokenSink>(&mut self, mut sink: S) -> Result<S::Output, TokenizeError> {
        log_debug!(
            "Tokenizing {} ({} bytes, {} matchers)",
            self.file,
            self.source.len(),
            self.grammar.len()
        );
        sink.on_start(&self.source)?;

        loop {
            let token = match self.step() {
                Ok(Step::Token(token)) => token,
                Ok(Step::Skipped) => continue,
                Ok(Step::Done) => break,
                Err(e) => {
                    log_debug!(
                        "Tokenizing {} failed: {} in line {:?}",
                        self.file,
                        e,
                        super::source_location::line_at_offset(&self.source, self.cursor)
                    );
                    return Err(e);
                }
            };
            if self.options.dump_tokens {
                self.dump_token(&token)?;
            }
            if sink.on_token(token)?.is_break() {
                self.terminate();
            }
        }

        log_debug!("Tokenizing {} finished at {}", self.file, self.position);
        Ok(sink.finish()?)
    }

    fn check_consumed(&self, kind: &str, consumed: usize) -> Result<(), TokenizeError> {
        let buffer = self.buffer();
        let message = if consumed == 0 {
            return Err(TokenizeError::ZeroProgress {
                file: self.file.clone(),
                position: self.position,
                kind: kind.to_string(),
            });
        } else if consumed > buffer.len() {
            format!(
                "consumed {} bytes but only {} remain",
                consumed,
                buffer.len()
            )
        } else if !buffer.is_char_boundary(consumed) {
            format!("consumed {} bytes, which splits a character", consumed)
        } else {
            return Ok(());
        };

        Err(TokenizeError::ContractViolation {
            file: self.file.clone(),
            position: self.position,
            kind: kind.to_string(),
            message,
        })
    }

    fn advance(&mut self, len: usize) {
        let end = self.cursor + len;
        self.position.update_mut(&self.source[self.cursor..end]);
        self.cursor = end;
    }

    fn dump_token(&mut self, token: &Token) -> Result<(), TokenizeError> {
        let line = format!(
            "{}:{}:{}: {} {:?}",
            self.file, token.position.line, token.position.column, token.kind, token.raw
        );
        let result = match self.dump.as_mut() {
            Some(writer) => writeln!(writer, "{}", line),
            None => writeln!(io::stderr(), "{}", line),
        };
        result.map_err(|e| TokenizeError::Dump {
            message: e.to_string(),
        })
    }
}

/// Tokenize `input` with default options
pub fn tokenize(grammar: &TokenGrammar, input: &str) -> Result<Vec<Token>, TokenizeError> {
    ParseState::new(grammar, input).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::MatchError;
    use crate::engine::pattern::PatternSet;
    use crate::engine::pattern_dsl::*;
    use crate::engine::sink::SinkResult;
    use crate::engine::token::{FetchStrategy, TokenDef, TokenValue};
    use std::ops::ControlFlow;

    fn words() -> TokenGrammar {
        TokenGrammar::builder(PatternSet::new())
            .token(TokenDef::new("space").regex(r"[ \t\n]+").discard())
            .token(TokenDef::new("keyword").regex(r"fn\b"))
            .token(TokenDef::new("word").regex("[a-z]+"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_first_listed_wins() {
        let grammar = words();
        let tokens = tokenize(&grammar, "fn fnord").unwrap();
        let kinds: Vec<&str> = tokens.iter().map(|t| t.kind.as_str()).collect();
        assert_eq!(kinds, vec!["keyword", "word"]);
    }

    #[test]
    fn test_first_listed_wins_over_longer_match() {
        let grammar = TokenGrammar::builder(PatternSet::new())
            .token(TokenDef::new("short").regex("a"))
            .token(TokenDef::new("long").regex("a+"))
            .build()
            .unwrap();
        let tokens = tokenize(&grammar, "aaa").unwrap();
        let kinds: Vec<&str> = tokens.iter().map(|t| t.kind.as_str()).collect();
        assert_eq!(kinds, vec!["short", "short", "short"]);
        assert_eq!(tokens[2].position, Position::new(1, 2, 2));
    }

    #[test]
    fn test_positions_are_snapshots() {
        let grammar = words();
        let tokens = tokenize(&grammar, "ab\n  cd ef").unwrap();
        let positions: Vec<Position> = tokens.iter().map(|t| t.position).collect();
        assert_eq!(
            positions,
            vec![
                Position::new(1, 0, 0),
                Position::new(2, 2, 5),
                Position::new(2, 5, 8)
            ]
        );
    }

    #[test]
    fn test_step_by_step() {
        let grammar = words();
        let mut state = ParseState::new(&grammar, "ab cd");
        assert!(matches!(state.step().unwrap(), Step::Token(t) if t.raw == "ab"));
        assert_eq!(state.buffer(), " cd");
        assert_eq!(state.step().unwrap(), Step::Skipped);
        assert!(matches!(state.step().unwrap(), Step::Token(t) if t.raw == "cd"));
        assert_eq!(state.step().unwrap(), Step::Done);
        assert_eq!(state.previous_token().map(|t| t.raw.as_str()), Some("cd"));
        assert_eq!(state.source(), "ab cd");
    }

    #[test]
    fn test_empty_input() {
        let grammar = words();
        assert!(tokenize(&grammar, "").unwrap().is_empty());
    }

    #[test]
    fn test_grammar_error() {
        let grammar = words();
        let err = ParseState::new(&grammar, "ab\n  %%%")
            .with_file("notes.md")
            .run()
            .unwrap_err();
        assert_eq!(err.to_string(), "notes.md:2:2: Parse error on \"%%%\"");
    }

    #[test]
    fn test_zero_progress_is_fatal() {
        let grammar = TokenGrammar::builder(PatternSet::new())
            .token(TokenDef::new("nothing").regex("x*"))
            .build()
            .unwrap();
        let err = tokenize(&grammar, "abc").unwrap_err();
        assert!(matches!(err, TokenizeError::ZeroProgress { ref kind, .. } if kind == "nothing"));
    }

    #[test]
    fn test_overlong_consumption_is_a_contract_violation() {
        let grammar = TokenGrammar::builder(PatternSet::new())
            .token(
                TokenDef::new("greedy")
                    .regex("a")
                    .fetch(FetchStrategy::custom(|buffer, _| {
                        Ok(Some(Fetched::text("", buffer.len() + 1)))
                    })),
            )
            .build()
            .unwrap();
        let err = tokenize(&grammar, "aaa").unwrap_err();
        assert!(matches!(err, TokenizeError::ContractViolation { .. }));
    }

    #[test]
    fn test_split_character_is_a_contract_violation() {
        let grammar = TokenGrammar::builder(PatternSet::new())
            .token(
                TokenDef::new("half")
                    .regex("é")
                    .fetch(FetchStrategy::custom(|_, _| Ok(Some(Fetched::text("", 1))))),
            )
            .build()
            .unwrap();
        let err = tokenize(&grammar, "é").unwrap_err();
        assert!(err.to_string().contains("splits a character"));
    }

    #[test]
    fn test_trim_input() {
        let grammar = TokenGrammar::builder(PatternSet::new())
            .token(TokenDef::new("word").regex("[a-z]+"))
            .build()
            .unwrap();
        let tokens = ParseState::new(&grammar, "  ab\n cd  ")
            .with_options(TokenizerOptions::default().with_trim_input(true))
            .run()
            .unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].position, Position::new(2, 1, 6));
    }

    #[test]
    fn test_custom_start_position() {
        let grammar = words();
        let tokens = ParseState::new(&grammar, "ab")
            .with_start(Position::new(10, 4, 200))
            .run()
            .unwrap();
        assert_eq!(tokens[0].position, Position::new(10, 4, 200));
    }

    #[test]
    fn test_dump_tokens() {
        let grammar = words();
        let mut out = Vec::new();
        ParseState::new(&grammar, "fn x")
            .with_file("a.rs")
            .with_options(TokenizerOptions::default().with_dump_tokens(true))
            .with_dump_writer(&mut out)
            .run()
            .unwrap();
        let dump = String::from_utf8(out).unwrap();
        assert_eq!(dump, "a.rs:1:0: keyword \"fn\"\na.rs:1:3: word \"x\"\n");
    }

    #[test]
    fn test_sink_can_stop_the_run() {
        struct FirstOnly(Option<Token>);
        impl TokenSink for FirstOnly {
            type Output = Option<Token>;
            fn on_token(&mut self, token: Token) -> SinkResult<ControlFlow<()>> {
                self.0 = Some(token);
                Ok(ControlFlow::Break(()))
            }
            fn finish(&mut self) -> SinkResult<Option<Token>> {
                Ok(self.0.take())
            }
        }

        let grammar = words();
        let mut state = ParseState::new(&grammar, "ab cd %%%");
        let first = state.run_with(FirstOnly(None)).unwrap();
        assert_eq!(first.map(|t| t.raw), Some("ab".to_string()));
        assert_eq!(state.buffer(), " cd %%%");
        assert!(state.is_done());
    }

    #[test]
    fn test_terminate_before_run() {
        let grammar = words();
        let mut state = ParseState::new(&grammar, "%%%");
        state.terminate();
        assert!(state.run().unwrap().is_empty());
    }

    #[test]
    fn test_recursion_limit_from_options() {
        let patterns = PatternBuilder::new()
            .rule("loop", ref_("loop").then(lit("x")))
            .build()
            .unwrap();
        let grammar = TokenGrammar::builder(patterns)
            .token(TokenDef::new("loop").rule("loop"))
            .build()
            .unwrap();
        let err = ParseState::new(&grammar, "xx")
            .with_options(TokenizerOptions::default().with_max_recursion_depth(8))
            .run()
            .unwrap_err();
        assert_eq!(
            err,
            TokenizeError::Pattern(MatchError::RecursionLimitExceeded {
                depth: 9,
                max_depth: 8
            })
        );
    }

    #[test]
    fn test_rule_token_with_balanced_body() {
        let patterns = PatternBuilder::new()
            .rule(
                "block",
                re("[a-z]+").capture("name").then(ws()).then(balanced('{', '}').capture("body")),
            )
            .build()
            .unwrap();
        let grammar = TokenGrammar::builder(patterns)
            .token(TokenDef::new("ws").regex(r"\s+").discard())
            .token(TokenDef::new("block").rule("block").fetch(FetchStrategy::Captures))
            .build()
            .unwrap();
        let tokens = tokenize(&grammar, "a {x{y}}\nb {}").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].value.capture("body"), Some("{x{y}}"));
        assert_eq!(
            tokens[1].value,
            TokenValue::Captures(vec![
                ("name".to_string(), "b".to_string()),
                ("body".to_string(), "{}".to_string())
            ])
        );
    }
}
