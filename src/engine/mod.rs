//! Tokenizing pattern engine
//!
//! This module contains the language-independent core: pattern construction
//! and matching, token definitions, and the tokenizing run itself.
//!
//! # Module Organization
//!
//! ## Positions
//! - [`source_location`] - Line/column/offset tracking
//!
//! ## Patterns
//! - [`pattern`] - Atom arena and named rules ([`PatternSet`])
//! - [`pattern_dsl`] - Pattern combinator DSL ([`PatternBuilder`])
//! - [`matcher`] - Anchored pattern evaluation
//! - [`balanced`] - Balanced delimiter scanning
//! - [`regex_cache`] - Thread-local cache of anchored regexes
//!
//! ## Tokenizing
//! - [`token`] - Token definitions and grammars
//! - [`tokenizer`] - The step-wise engine ([`ParseState`])
//! - [`sink`] - Accumulation hooks
//! - [`config`] - Run options
//! - [`parallel`] - Batch tokenizing
//!
//! ## Error Handling
//! - [`error`] - Error types for every layer

// ============================================================================
// Module Declarations
// ============================================================================

pub mod balanced;
pub mod config;
pub mod error;
pub mod matcher;
pub mod pattern;
pub mod pattern_dsl;
pub mod regex_cache;
pub mod sink;
pub mod source_location;
pub mod token;
pub mod tokenizer;

// Batch tokenizing (always available, uses rayon when feature is enabled)
pub mod parallel;

// ============================================================================
// Core Types
// ============================================================================

pub use config::{ConfigError, TokenizerOptions};
pub use error::{DefinitionError, FetchError, MatchError, TokenizeError, PREVIEW_CHARS};
pub use matcher::{CaptureSpan, PatternMatch, PatternMatcher, DEFAULT_MAX_RECURSION_DEPTH};
pub use pattern::{Atom, PatternSet};
pub use pattern_dsl::{Parslet, ParsletExt, PatternBuilder};
pub use sink::{KindFilter, SinkError, SinkResult, TokenCollector, TokenSink};
pub use source_location::Position;
pub use token::{
    CompiledToken, CustomFetch, FetchContext, FetchStrategy, Fetched, Token, TokenDef,
    TokenGrammar, TokenGrammarBuilder, TokenMatcher, TokenValue,
};
pub use tokenizer::{tokenize, ParseState, Step, DEFAULT_FILE_LABEL};

// ============================================================================
// Batch Tokenizing
// ============================================================================

pub use parallel::{tokenize_batch, tokenize_batch_owned};
