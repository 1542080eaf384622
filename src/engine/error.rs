//! Error types for pattern construction, matching and tokenizing
//!
//! Errors fall into three groups:
//!
//! - [`DefinitionError`] - raised while a pattern set or token grammar is
//!   assembled, before any input is seen
//! - [`MatchError`] - fatal conditions while evaluating a pattern (an ordinary
//!   mismatch is not an error, it is `Ok(None)`)
//! - [`TokenizeError`] - everything that ends a tokenizing run
//!
//! # Example Output
//!
//! ```text
//! notes.md:3:4: Parse error on "%%%not-a-token%%%"
//! ```

use super::sink::SinkError;
use super::source_location::Position;
use std::fmt;

/// Maximum number of characters of unmatched input shown in a grammar error
pub const PREVIEW_CHARS: usize = 32;

/// Fatal error while evaluating a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// Rule references nested deeper than the configured limit
    ///
    /// This is how left recursion (a rule reaching itself without consuming
    /// input) surfaces.
    RecursionLimitExceeded {
        /// Depth that was reached
        depth: usize,
        /// Maximum allowed depth
        max_depth: usize,
    },

    /// A regex atom failed to compile
    InvalidRegex {
        /// The offending pattern
        pattern: String,
        /// Compiler message
        reason: String,
    },

    /// An atom index that does not exist in the pattern set
    InvalidAtom {
        /// The bad index
        index: usize,
    },

    /// A rule name that does not exist in the pattern set
    UnknownRule {
        /// The missing rule
        name: String,
    },
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::RecursionLimitExceeded { depth, max_depth } => write!(
                f,
                "Recursion limit exceeded: depth {} exceeds limit of {}",
                depth, max_depth
            ),
            MatchError::InvalidRegex { pattern, reason } => {
                write!(f, "Invalid regex pattern {:?}: {}", pattern, reason)
            }
            MatchError::InvalidAtom { index } => write!(f, "Invalid atom index {}", index),
            MatchError::UnknownRule { name } => write!(f, "Unknown rule '{}'", name),
        }
    }
}

impl std::error::Error for MatchError {}

/// Construction-time usage error
///
/// Raised when a pattern set or a token grammar is built, never while it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// A regex fragment does not compile
    InvalidRegex {
        /// The offending pattern
        pattern: String,
        /// Compiler message
        reason: String,
    },

    /// A rule reference names a rule that was never defined
    UnresolvedRule {
        /// Name of the missing rule
        name: String,
    },

    /// The same rule name was defined twice
    DuplicateRule {
        /// The duplicated name
        name: String,
    },

    /// A balanced group needs two distinct delimiters
    InvalidDelimiters {
        /// Opening delimiter
        open: char,
        /// Closing delimiter
        close: char,
    },

    /// A token definition has no recognizer
    MissingPattern {
        /// Token kind
        kind: String,
    },

    /// A token definition was given arguments that cannot be combined
    ConflictingArguments {
        /// Token kind
        kind: String,
        /// What conflicts
        message: String,
    },

    /// The fetch strategy cannot work with the token's recognizer
    InvalidFetch {
        /// Token kind
        kind: String,
        /// Why the strategy is invalid
        message: String,
    },
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionError::InvalidRegex { pattern, reason } => {
                write!(f, "Invalid regex pattern {:?}: {}", pattern, reason)
            }
            DefinitionError::UnresolvedRule { name } => {
                write!(f, "Reference to undefined rule '{}'", name)
            }
            DefinitionError::DuplicateRule { name } => {
                write!(f, "Rule '{}' is defined more than once", name)
            }
            DefinitionError::InvalidDelimiters { open, close } => write!(
                f,
                "{} needs two distinct delimiters",
                super::balanced::describe(*open, *close)
            ),
            DefinitionError::MissingPattern { kind } => {
                write!(f, "Token '{}' has neither a rule nor a regex", kind)
            }
            DefinitionError::ConflictingArguments { kind, message } => {
                write!(f, "Conflicting arguments for token '{}': {}", kind, message)
            }
            DefinitionError::InvalidFetch { kind, message } => {
                write!(f, "Invalid fetch strategy for token '{}': {}", kind, message)
            }
        }
    }
}

impl std::error::Error for DefinitionError {}

/// Error reported by a custom fetch strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    /// Error message
    pub message: String,
}

impl FetchError {
    /// Create a new fetch error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FetchError {}

/// Error that ends a tokenizing run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// No token definition matched the head of the buffer
    Grammar {
        /// File label used for diagnostics
        file: String,
        /// Where the unmatched input starts
        position: Position,
        /// Up to [`PREVIEW_CHARS`] characters of the unmatched input
        preview: String,
    },

    /// A token definition reported success but consumed nothing
    ///
    /// This is a defect in the grammar; continuing would loop forever.
    ZeroProgress {
        /// File label used for diagnostics
        file: String,
        /// Where the run stalled
        position: Position,
        /// Kind of the offending token definition
        kind: String,
    },

    /// A fetch reported a span that cannot be removed from the buffer
    ContractViolation {
        /// File label used for diagnostics
        file: String,
        /// Where the step started
        position: Position,
        /// Kind of the offending token definition
        kind: String,
        /// What was wrong
        message: String,
    },

    /// Pattern evaluation failed fatally
    Pattern(MatchError),

    /// A custom fetch strategy failed
    Fetch {
        /// Kind of the token being fetched
        kind: String,
        /// Error message
        message: String,
    },

    /// The accumulation hook rejected a token
    Sink(SinkError),

    /// Writing the token dump failed
    Dump {
        /// Error message
        message: String,
    },
}

impl TokenizeError {
    /// Build a grammar error for the unmatched `remaining` input
    pub fn grammar(file: impl Into<String>, position: Position, remaining: &str) -> Self {
        TokenizeError::Grammar {
            file: file.into(),
            position,
            preview: super::source_location::preview(remaining, PREVIEW_CHARS),
        }
    }

    /// The position the error refers to, if it has one
    pub fn position(&self) -> Option<Position> {
        match self {
            TokenizeError::Grammar { position, .. }
            | TokenizeError::ZeroProgress { position, .. }
            | TokenizeError::ContractViolation { position, .. } => Some(*position),
            _ => None,
        }
    }

    /// Whether this is an ordinary no-match error rather than a grammar defect
    pub fn is_grammar_error(&self) -> bool {
        matches!(self, TokenizeError::Grammar { .. })
    }
}

impl fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenizeError::Grammar {
                file,
                position,
                preview,
            } => write!(
                f,
                "{}:{}:{}: Parse error on \"{}\"",
                file, position.line, position.column, preview
            ),
            TokenizeError::ZeroProgress {
                file,
                position,
                kind,
            } => write!(
                f,
                "{}:{}:{}: Token '{}' matched without consuming input",
                file, position.line, position.column, kind
            ),
            TokenizeError::ContractViolation {
                file,
                position,
                kind,
                message,
            } => write!(
                f,
                "{}:{}:{}: Token '{}' broke the fetch contract: {}",
                file, position.line, position.column, kind, message
            ),
            TokenizeError::Pattern(e) => write!(f, "Pattern error: {}", e),
            TokenizeError::Fetch { kind, message } => {
                write!(f, "Fetch failed for token '{}': {}", kind, message)
            }
            TokenizeError::Sink(e) => write!(f, "{}", e),
            TokenizeError::Dump { message } => write!(f, "Token dump failed: {}", message),
        }
    }
}

impl std::error::Error for TokenizeError {}

impl From<MatchError> for TokenizeError {
    fn from(e: MatchError) -> Self {
        TokenizeError::Pattern(e)
    }
}

impl From<SinkError> for TokenizeError {
    fn from(e: SinkError) -> Self {
        TokenizeError::Sink(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar_error_format() {
        let err = TokenizeError::grammar("lib.rs", Position::new(3, 4, 20), "%%% rest");
        assert_eq!(err.to_string(), "lib.rs:3:4: Parse error on \"%%% rest\"");
        assert!(err.is_grammar_error());
        assert_eq!(err.position(), Some(Position::new(3, 4, 20)));
    }

    #[test]
    fn test_grammar_error_preview_is_truncated() {
        let remaining = "x".repeat(40);
        let err = TokenizeError::grammar("<input>", Position::start(), &remaining);
        let expected = format!("<input>:1:0: Parse error on \"{}...\"", "x".repeat(32));
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn test_zero_progress_is_not_a_grammar_error() {
        let err = TokenizeError::ZeroProgress {
            file: "a.rs".to_string(),
            position: Position::start(),
            kind: "empty".to_string(),
        };
        assert!(!err.is_grammar_error());
        assert!(err.to_string().contains("without consuming input"));
    }

    #[test]
    fn test_match_error_conversion() {
        let err: TokenizeError = MatchError::RecursionLimitExceeded {
            depth: 11,
            max_depth: 10,
        }
        .into();
        assert_eq!(err.position(), None);
        assert!(err.to_string().contains("Recursion limit exceeded"));
    }

    #[test]
    fn test_definition_error_display() {
        let err = DefinitionError::UnresolvedRule {
            name: "item".to_string(),
        };
        assert_eq!(err.to_string(), "Reference to undefined rule 'item'");
    }
}
