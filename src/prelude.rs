//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from tagscan.
//! Importing this module with a wildcard import brings the core types into scope:
//!
//! ```
//! use tagscan::prelude::*;
//! ```
//!
//! # Re-exported Items
//!
//! ## Core Types
//! - [`Position`] - Line/column/offset position
//! - [`Token`] - A token produced by a run
//! - [`TokenDef`] - Token definition builder
//! - [`TokenGrammar`] - Ordered, compiled token definitions
//! - [`ParseState`] - Step-wise tokenizer
//! - [`TokenizeError`] - Errors that end a run
//!
//! ## Pattern DSL
//! - [`lit()`], [`re()`], [`keyword()`] - Terminals
//! - [`seq()`], [`choice()`], [`dynamic()`] - Composition
//! - [`list()`], [`balanced()`], [`recursive()`] - Structured patterns
//! - [`PatternBuilder`] - Builder for pattern sets
//! - [`Parslet`] - Trait for pattern types
//! - [`ParsletExt`] - Extension trait for combinators
//!
//! ## Sinks
//! - [`TokenSink`] - Accumulation hook trait
//! - [`TokenCollector`] - Collects tokens in order
//! - [`KindFilter`] - Forwards only selected kinds
//!
//! ## Snippets
//! - [`TagSyntax`] - Tag comment syntax
//! - [`SnippetIndex`] - Region index and example checks

// ============================================================================
// Core Types
// ============================================================================

pub use crate::engine::{
    tokenize, DefinitionError, FetchStrategy, Fetched, ParseState, PatternMatch, PatternSet,
    Position, Step, Token, TokenDef, TokenGrammar, TokenValue, TokenizeError, TokenizerOptions,
};

// ============================================================================
// Pattern DSL
// ============================================================================

pub use crate::engine::pattern_dsl::{
    any, balanced, choice, dynamic, keyword, list, lit, re, recursive, ref_, seq, ws, ws1,
    Parslet, ParsletExt, PatternBuilder,
};

// ============================================================================
// Sinks
// ============================================================================

pub use crate::engine::sink::{KindFilter, SinkError, SinkResult, TokenCollector, TokenSink};

// ============================================================================
// Snippets
// ============================================================================

pub use crate::snippets::{Snippet, SnippetIndex, SnippetMismatch};
pub use crate::syntax::{DocExample, DocExtractor, TagSyntax, TaggedRegion};
