//! Accumulation hooks for tokenizing runs
//!
//! A [`TokenSink`] receives tokens as the engine produces them, so a consumer
//! can build whatever it needs (a plain list, an index, a counter) in a single
//! pass. The engine never looks at what the sink builds.
//!
//! # Example
//!
//! ```
//! use std::ops::ControlFlow;
//! use tagscan::engine::sink::{SinkResult, TokenSink};
//! use tagscan::engine::token::Token;
//!
//! // Counts tokens of one kind and stops after the first three
//! struct FirstThree {
//!     kind: &'static str,
//!     seen: usize,
//! }
//!
//! impl TokenSink for FirstThree {
//!     type Output = usize;
//!
//!     fn on_token(&mut self, token: Token) -> SinkResult<ControlFlow<()>> {
//!         if token.kind == self.kind {
//!             self.seen += 1;
//!         }
//!         if self.seen == 3 {
//!             return Ok(ControlFlow::Break(()));
//!         }
//!         Ok(ControlFlow::Continue(()))
//!     }
//!
//!     fn finish(&mut self) -> SinkResult<usize> {
//!         Ok(self.seen)
//!     }
//! }
//! ```

use super::token::Token;
use std::ops::ControlFlow;

/// Result of a sink operation
pub type SinkResult<T> = Result<T, SinkError>;

/// Errors raised by an accumulation hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// A token arrived that the sink cannot place
    UnexpectedToken {
        /// Kind of the token
        kind: String,
        /// Why it was rejected
        message: String,
    },
    /// Token value had the wrong shape
    TypeMismatch {
        /// Expected shape
        expected: String,
        /// Actual shape found
        actual: String,
    },
    /// Custom error from a sink
    Custom {
        /// Custom error message
        message: String,
    },
}

impl SinkError {
    /// Create a custom sink error
    pub fn custom(message: impl Into<String>) -> Self {
        SinkError::Custom {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::UnexpectedToken { kind, message } => {
                write!(f, "Unexpected token '{}': {}", kind, message)
            }
            SinkError::TypeMismatch { expected, actual } => {
                write!(f, "Type mismatch: expected {}, got {}", expected, actual)
            }
            SinkError::Custom { message } => write!(f, "Sink error: {}", message),
        }
    }
}

impl std::error::Error for SinkError {}

/// Receiver for the tokens of one run
///
/// # Event Flow
///
/// ```text
/// on_start(source)
///   on_token(token)      // once per emitted token, in order
///   ...
/// finish()               // only when the run ends without error
/// ```
///
/// Returning `ControlFlow::Break(())` from `on_token` ends the run early and
/// still calls `finish`. Returning `Err` aborts the run with
/// [`TokenizeError::Sink`](super::error::TokenizeError::Sink).
pub trait TokenSink {
    /// The value produced at the end of the run
    type Output;

    /// Called once before the first token with the full input text
    fn on_start(&mut self, _source: &str) -> SinkResult<()> {
        Ok(())
    }

    /// Called for every emitted (non-discarded) token
    fn on_token(&mut self, token: Token) -> SinkResult<ControlFlow<()>>;

    /// Called once after the last token
    fn finish(&mut self) -> SinkResult<Self::Output>;
}

/// Default sink: collects tokens in order
#[derive(Debug, Default)]
pub struct TokenCollector {
    tokens: Vec<Token>,
}

impl TokenCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self { tokens: Vec::new() }
    }
}

impl TokenSink for TokenCollector {
    type Output = Vec<Token>;

    fn on_token(&mut self, token: Token) -> SinkResult<ControlFlow<()>> {
        self.tokens.push(token);
        Ok(ControlFlow::Continue(()))
    }

    fn finish(&mut self) -> SinkResult<Vec<Token>> {
        Ok(std::mem::take(&mut self.tokens))
    }
}

/// Sink that keeps only tokens of the given kinds
#[derive(Debug)]
pub struct KindFilter<S> {
    kinds: Vec<String>,
    inner: S,
}

impl<S: TokenSink> KindFilter<S> {
    /// Wrap `inner`, forwarding only tokens whose kind is listed
    pub fn new(kinds: &[&str], inner: S) -> Self {
        Self {
            kinds: kinds.iter().map(|k| k.to_string()).collect(),
            inner,
        }
    }
}

impl<S: TokenSink> TokenSink for KindFilter<S> {
    type Output = S::Output;

    fn on_start(&mut self, source: &str) -> SinkResult<()> {
        self.inner.on_start(source)
    }

    fn on_token(&mut self, token: Token) -> SinkResult<ControlFlow<()>> {
        if self.kinds.iter().any(|k| *k == token.kind) {
            self.inner.on_token(token)
        } else {
            Ok(ControlFlow::Continue(()))
        }
    }

    fn finish(&mut self) -> SinkResult<S::Output> {
        self.inner.finish()
    }
}
