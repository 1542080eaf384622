//! Tagscan - Tokenizing Pattern Engine for Tagged Code Regions
//!
//! Tagscan splits text into typed tokens using ordered token definitions built
//! from a small PEG-style pattern language. On top of the engine it ships
//! pattern sets for Rust source, tagged example regions and documentation
//! fences, and an index that checks documentation examples against the
//! sources they were copied from.
//!
//! It provides:
//! - Position tracking by line, column and byte offset
//! - A pattern DSL with balanced groups, separated lists and recursion
//! - Token definitions with pluggable fetch strategies
//! - A step-wise tokenizer with precise grammar errors
//! - Accumulation hooks for custom token consumers
//! - Rust item patterns and tagged region extraction
//!
//! ## Quick Start
//!
//! ```rust
//! use tagscan::prelude::*;
//!
//! let grammar = TokenGrammar::builder(PatternSet::new())
//!     .token(TokenDef::new("space").regex(r"\s+").discard())
//!     .token(TokenDef::new("number").regex("[0-9]+"))
//!     .token(TokenDef::new("word").regex("[a-z]+"))
//!     .build()
//!     .unwrap();
//!
//! let tokens = tokenize(&grammar, "abc 42").unwrap();
//! assert_eq!(tokens[1].kind, "number");
//! assert_eq!(tokens[1].position.column, 4);
//!
//! let err = tokenize(&grammar, "abc %%%").unwrap_err();
//! assert_eq!(err.to_string(), "<input>:1:4: Parse error on \"%%%\"");
//! ```
//!
//! ## Using the Pattern DSL
//!
//! ```rust
//! use tagscan::engine::pattern_dsl::*;
//!
//! let patterns = PatternBuilder::new()
//!     .rule("call", re("[a-z]+").capture("name").then(balanced('(', ')').capture("args")))
//!     .build()
//!     .unwrap();
//!
//! let m = patterns.match_rule("call", "f(a, (b))").unwrap().unwrap();
//! assert_eq!(m.text("f(a, (b))", "args"), Some("(a, (b))"));
//! ```
//!
//! ## Feature Flags
//!
//! - `logging` - Enable debug logging using the `log` crate
//! - `parallel` - Tokenize batches on rayon's thread pool

// Lint configuration for production quality
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all)]
#![allow(clippy::new_without_default)]
#![allow(clippy::module_inception)]

/// Logging macros - no-op when logging feature is disabled
#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

/// Logging macros - use log crate when logging feature is enabled
#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

// Prelude module for convenient imports
pub mod prelude;

// Language-independent core
pub mod engine;

// Rust, tagged region and documentation patterns
pub mod syntax;

// Region index and documentation checks
pub mod snippets;

/// Re-export commonly used types for convenience
pub use engine::{
    tokenize, FetchStrategy, ParseState, PatternBuilder, PatternSet, Position, Token, TokenDef,
    TokenGrammar, TokenSink, TokenValue, TokenizeError, TokenizerOptions,
};
pub use snippets::{Snippet, SnippetIndex, SnippetMismatch};
