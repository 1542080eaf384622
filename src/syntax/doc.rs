//! Documentation examples
//!
//! Finds fenced code blocks in `///` and `//!` comments. The fence's info
//! string names the language, optional flags and `key="value"` attributes:
//!
//! ```text
//! //! ```rust,ignore file="examples/create-resolve.rs" id="resolve"
//! //! assert_eq!(Ok("Kibbles"), basic_pool.resolve(cat));
//! //! ```
//! ```
//!
//! `file` and `id` point at the tagged region the example was copied from.

use crate::engine::error::{DefinitionError, FetchError, TokenizeError};
use crate::engine::matcher::PatternMatch;
use crate::engine::pattern_dsl::*;
use crate::engine::source_location::Position;
use crate::engine::token::{FetchStrategy, Fetched, TokenDef, TokenGrammar, TokenValue};
use crate::engine::tokenizer::ParseState;
use serde::{Deserialize, Serialize};
// Ordered so fences serialize and compare deterministically
use std::collections::BTreeMap;

const DOC_PREFIX: &str = r"[ \t]*(?:///|//!)";

/// Define the `doc_fence` rule on `builder`
///
/// Captures `info` (the text after the opening backticks) and `body` (the
/// comment lines between the fences, prefixes included).
pub fn install(builder: &mut PatternBuilder) {
    let close = || re(format!(r"{DOC_PREFIX}[ \t]*```[ \t]*(?:\n|$)"));

    builder.rule_mut(
        "doc_fence",
        re(format!(r"{DOC_PREFIX}[ \t]?```"))
            .then(re(r"[^\n]*").capture("info"))
            .then(lit("\n"))
            .then(
                close()
                    .not_ahead()
                    .then(re(format!(r"{DOC_PREFIX}[^\n]*\n")))
                    .many()
                    .capture("body"),
            )
            .then(close()),
    );
}

/// A fenced block as fetched from the buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocFence {
    /// Language, e.g. `rust`
    pub lang: String,
    /// Flags after the language, e.g. `ignore`, `compile_fail`
    pub flags: Vec<String>,
    /// `key=value` attributes
    pub params: BTreeMap<String, serde_json::Value>,
    /// The code with comment prefixes removed
    pub code: String,
}

/// A documentation example with its location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocExample {
    /// File the documentation comment is in
    pub file: String,
    /// Position of the opening fence
    pub position: Position,
    /// Parsed fence
    pub fence: DocFence,
}

impl DocExample {
    /// Example source file named by the `file` attribute
    pub fn source(&self) -> Option<&str> {
        self.param("file")
    }

    /// Region id named by the `id` attribute
    pub fn id(&self) -> Option<&str> {
        self.param("id")
    }

    /// A string attribute
    pub fn param(&self, key: &str) -> Option<&str> {
        self.fence.params.get(key).and_then(|v| v.as_str())
    }

    /// The example code
    pub fn code(&self) -> &str {
        &self.fence.code
    }

    /// Whether the fence carries `flag`
    pub fn has_flag(&self, flag: &str) -> bool {
        self.fence.flags.iter().any(|f| f == flag)
    }
}

/// Split an info string on whitespace outside quotes and brackets
fn split_info(info: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut start = None;
    let mut quoted = false;
    let mut depth = 0usize;

    for (i, c) in info.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '[' if !quoted => depth += 1,
            ']' if !quoted => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && !quoted && depth == 0 => {
                if let Some(s) = start.take() {
                    words.push(&info[s..i]);
                }
                continue;
            }
            _ => {}
        }
        start.get_or_insert(i);
    }
    if let Some(s) = start {
        words.push(&info[s..]);
    }
    words
}

fn param_value(raw: &str) -> serde_json::Value {
    if raw.starts_with('[') {
        if let Ok(value) = serde_json::from_str(raw) {
            return value;
        }
    }
    let unquoted = raw
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(raw);
    serde_json::Value::String(unquoted.to_string())
}

/// Parse a fence info string such as `rust,ignore file="a.rs" id="x"`
pub fn parse_info(info: &str) -> (String, Vec<String>, BTreeMap<String, serde_json::Value>) {
    let mut lang = String::new();
    let mut flags = Vec::new();
    let mut params = BTreeMap::new();

    for (i, word) in split_info(info.trim()).into_iter().enumerate() {
        match word.split_once('=') {
            Some((key, value)) => {
                params.insert(key.to_string(), param_value(value));
            }
            None if i == 0 => {
                let mut parts = word.split(',').map(str::trim);
                lang = parts.next().unwrap_or_default().to_string();
                flags.extend(parts.filter(|p| !p.is_empty()).map(str::to_string));
            }
            None => flags.push(word.to_string()),
        }
    }

    (lang, flags, params)
}

/// Remove the comment prefix (and one following space) from each line
pub fn strip_doc_prefix(body: &str) -> String {
    body.lines()
        .map(|line| {
            let line = line.trim_start();
            let rest = line
                .strip_prefix("///")
                .or_else(|| line.strip_prefix("//!"))
                .unwrap_or(line);
            rest.strip_prefix(' ').unwrap_or(rest)
        })
        .fold(String::new(), |mut code, line| {
            code.push_str(line);
            code.push('\n');
            code
        })
}

fn fetch_fence(buffer: &str, m: &PatternMatch) -> Result<Option<Fetched>, FetchError> {
    let info = m.text(buffer, "info").unwrap_or("");
    let body = m.text(buffer, "body").unwrap_or("");
    let (lang, flags, params) = parse_info(info);
    let fence = DocFence {
        lang,
        flags,
        params,
        code: strip_doc_prefix(body),
    };
    let value = serde_json::to_value(&fence).map_err(|e| FetchError::new(e.to_string()))?;
    Ok(Some(Fetched::new(TokenValue::Data(value), m.end)))
}

/// Token kind of fences in [`doc_grammar`]
pub const FENCE_KIND: &str = "doc_fence";

/// Token grammar that emits only documentation fences
pub fn doc_grammar() -> Result<TokenGrammar, DefinitionError> {
    let mut builder = PatternBuilder::new();
    install(&mut builder);
    let patterns = builder.build()?;

    TokenGrammar::builder(patterns)
        .token(
            TokenDef::new(FENCE_KIND)
                .rule("doc_fence")
                .fetch(FetchStrategy::custom(fetch_fence)),
        )
        .token(TokenDef::new("line").regex(r"[^\n]*\n|[^\n]+").discard())
        .build()
}

/// Extracts documentation examples from source files
#[derive(Debug)]
pub struct DocExtractor {
    grammar: TokenGrammar,
}

impl DocExtractor {
    /// Create an extractor
    pub fn new() -> Result<Self, DefinitionError> {
        Ok(Self {
            grammar: doc_grammar()?,
        })
    }

    /// All fenced examples in `text`
    pub fn extract(&self, file: &str, text: &str) -> Result<Vec<DocExample>, TokenizeError> {
        let tokens = ParseState::new(&self.grammar, text).with_file(file).run()?;
        tokens
            .into_iter()
            .map(|token| {
                let fence: DocFence = token.value.decode().map_err(|e| TokenizeError::Fetch {
                    kind: token.kind.clone(),
                    message: e.to_string(),
                })?;
                Ok(DocExample {
                    file: file.to_string(),
                    position: token.position,
                    fence,
                })
            })
            .collect()
    }
}
