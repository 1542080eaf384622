//! Tokenizer options
//!
//! Options arrive as a plain JSON object. Missing keys take their defaults,
//! unknown keys are rejected, and [`TokenizerOptions::inherit`] layers a
//! partial object over options inherited from a parent configuration.
//!
//! ```
//! use tagscan::engine::config::TokenizerOptions;
//!
//! let options = TokenizerOptions::from_json(r#"{ "trim_input": true }"#).unwrap();
//! assert!(options.trim_input);
//! assert!(!options.dump_tokens);
//! ```

use super::matcher::DEFAULT_MAX_RECURSION_DEPTH;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Options for a tokenizing run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokenizerOptions {
    /// Skip leading whitespace before every step
    pub trim_input: bool,
    /// Write every emitted token to the dump stream
    pub dump_tokens: bool,
    /// Maximum depth of nested rule references while matching
    pub max_recursion_depth: usize,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self {
            trim_input: false,
            dump_tokens: false,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
        }
    }
}

impl TokenizerOptions {
    /// Parse options from a JSON object
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Convert options from an already parsed JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Layer `overrides` (a partial options object) over `parent`
    ///
    /// Keys absent from `overrides` keep the parent's value. Neither input is
    /// modified.
    pub fn inherit(parent: &Self, overrides: &serde_json::Value) -> Result<Self, ConfigError> {
        let serde_json::Value::Object(overrides) = overrides else {
            return Err(ConfigError::NotAnObject);
        };
        let mut merged = match serde_json::to_value(parent)? {
            serde_json::Value::Object(map) => map,
            _ => return Err(ConfigError::NotAnObject),
        };
        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }
        Self::from_value(serde_json::Value::Object(merged))
    }

    /// Set whether leading whitespace is skipped
    pub fn with_trim_input(mut self, trim_input: bool) -> Self {
        self.trim_input = trim_input;
        self
    }

    /// Set whether emitted tokens are dumped
    pub fn with_dump_tokens(mut self, dump_tokens: bool) -> Self {
        self.dump_tokens = dump_tokens;
        self
    }

    /// Set the recursion limit
    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = depth;
        self
    }
}

/// Error loading tokenizer options
#[derive(Debug)]
pub enum ConfigError {
    /// The options were not a JSON object
    NotAnObject,
    /// The object had an unknown key or a value of the wrong type
    Invalid(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NotAnObject => f.write_str("Tokenizer options must be a JSON object"),
            ConfigError::Invalid(e) => write!(f, "Invalid tokenizer options: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Invalid(e) => Some(e),
            ConfigError::NotAnObject => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Invalid(e)
    }
}
