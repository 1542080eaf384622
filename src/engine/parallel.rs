//! Batch tokenizing
//!
//! Tokenizes many independent inputs with one grammar. Each input gets its
//! own [`ParseState`], so runs never share a buffer or a position.
//!
//! # Feature Flag
//!
//! With the `parallel` feature the inputs are spread over rayon's thread pool;
//! without it they are processed one after another. Results are in input order
//! either way.
//!
//! # Example
//!
//! ```
//! use tagscan::engine::config::TokenizerOptions;
//! use tagscan::engine::parallel::tokenize_batch;
//! use tagscan::engine::pattern::PatternSet;
//! use tagscan::engine::token::{TokenDef, TokenGrammar};
//!
//! let grammar = TokenGrammar::builder(PatternSet::new())
//!     .token(TokenDef::new("word").regex("[a-z]+"))
//!     .build()
//!     .unwrap();
//!
//! let results = tokenize_batch(
//!     &grammar,
//!     &[("a.txt", "abc"), ("b.txt", "12")],
//!     &TokenizerOptions::default(),
//! );
//! assert!(results[0].is_ok());
//! assert!(results[1].is_err());
//! ```

use super::config::TokenizerOptions;
use super::error::TokenizeError;
use super::token::{Token, TokenGrammar};
use super::tokenizer::ParseState;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

fn tokenize_one(
    grammar: &TokenGrammar,
    file: &str,
    input: &str,
    options: &TokenizerOptions,
) -> Result<Vec<Token>, TokenizeError> {
    ParseState::new(grammar, input)
        .with_file(file)
        .with_options(options.clone())
        .run()
}

/// Tokenize `(file label, text)` pairs in parallel
///
/// # Returns
/// One result per input, in the same order as `inputs`
#[cfg(feature = "rayon")]
pub fn tokenize_batch(
    grammar: &TokenGrammar,
    inputs: &[(&str, &str)],
    options: &TokenizerOptions,
) -> Vec<Result<Vec<Token>, TokenizeError>> {
    inputs
        .par_iter()
        .map(|(file, input)| tokenize_one(grammar, file, input, options))
        .collect()
}

/// Tokenize `(file label, text)` pairs sequentially (fallback without rayon)
#[cfg(not(feature = "rayon"))]
pub fn tokenize_batch(
    grammar: &TokenGrammar,
    inputs: &[(&str, &str)],
    options: &TokenizerOptions,
) -> Vec<Result<Vec<Token>, TokenizeError>> {
    inputs
        .iter()
        .map(|(file, input)| tokenize_one(grammar, file, input, options))
        .collect()
}

/// Tokenize owned `(file label, text)` pairs in parallel
#[cfg(feature = "rayon")]
pub fn tokenize_batch_owned(
    grammar: &TokenGrammar,
    inputs: Vec<(String, String)>,
    options: &TokenizerOptions,
) -> Vec<Result<Vec<Token>, TokenizeError>> {
    inputs
        .into_par_iter()
        .map(|(file, input)| tokenize_one(grammar, &file, &input, options))
        .collect()
}

/// Tokenize owned `(file label, text)` pairs sequentially (fallback)
#[cfg(not(feature = "rayon"))]
pub fn tokenize_batch_owned(
    grammar: &TokenGrammar,
    inputs: Vec<(String, String)>,
    options: &TokenizerOptions,
) -> Vec<Result<Vec<Token>, TokenizeError>> {
    inputs
        .into_iter()
        .map(|(file, input)| tokenize_one(grammar, &file, &input, options))
        .collect()
}
