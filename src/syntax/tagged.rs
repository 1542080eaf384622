//! Tagged regions
//!
//! Example sources mark the code that documentation quotes with tag comments.
//! Two forms are recognized, both using a configurable marker (a backtick by
//! default):
//!
//! ```text
//! //` id=create {          a tagged region: every line up to the
//! let pool = Pool::new();  matching close line is content
//! //` }
//!
//! /*` id=inline */ {       a tagged block: the content of the brace
//!     let x = 1;           block that follows the comment
//! }
//! ```
//!
//! Regions nest. An inner region is part of the outer region's content, and
//! its own open and close lines balance so the outer close line is found
//! correctly.

use crate::engine::error::{DefinitionError, FetchError};
use crate::engine::matcher::PatternMatch;
use crate::engine::pattern_dsl::*;
use crate::engine::token::{
    FetchStrategy, Fetched, Token, TokenDef, TokenGrammar, TokenValue,
};
use serde::{Deserialize, Serialize};

/// Default tag marker
pub const DEFAULT_MARKER: &str = "`";

/// Tag name of regions whose content is left out of whole-file examples
pub const IGNORE_TAG: &str = "ignore";

/// The comment syntax used for tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSyntax {
    marker: String,
}

impl TagSyntax {
    /// Use `marker` right after the comment opener
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// The marker text
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Pattern for a tagged region
    ///
    /// With `Some(tag)` only regions with exactly that tag match; with `None`
    /// any tag does. Captures `tag` and `content`.
    pub fn region(&self, tag: Option<&str>) -> TaggedRegionPattern {
        TaggedRegionPattern {
            marker: self.marker.clone(),
            tag: tag.map(str::to_string),
        }
    }

    /// Pattern for a tagged block
    ///
    /// Captures `tag` and `content` (the text between the braces).
    pub fn block(&self, tag: Option<&str>) -> TaggedBlockPattern {
        TaggedBlockPattern {
            marker: self.marker.clone(),
            tag: tag.map(str::to_string),
        }
    }
}

impl Default for TagSyntax {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER)
    }
}

/// A tag name: `ignore`, `id=create`, `id="example"`
fn any_tag() -> Re {
    re(r#"[^\s{}"]+(?:"[^"]*")?"#)
}

fn tag_pattern(tag: &Option<String>) -> Dynamic {
    match tag {
        Some(tag) => dynamic(lit(tag.as_str())),
        None => dynamic(any_tag()),
    }
}

fn line_opener(marker: &str) -> impl Parslet {
    re(r"[ \t]*//[ \t]*")
        .then(lit(marker))
        .then(re(r"[ \t]*"))
}

fn close_line(marker: &str) -> impl Parslet {
    line_opener(marker).then(re(r"\}[^\n]*(?:\n|$)"))
}

const OPEN_TAIL: &str = r"[ \t]*\{[ \t]*(?:\r?\n|$)";

/// Pattern built by [`TagSyntax::region`]
#[derive(Debug, Clone)]
pub struct TaggedRegionPattern {
    marker: String,
    tag: Option<String>,
}

impl Parslet for TaggedRegionPattern {
    fn build(self, builder: &mut PatternBuilder) -> usize {
        let marker = self.marker;

        // Inner regions carry no captures, so the outer region's `tag` and
        // `content` stay the last ones recorded.
        let nested = {
            let marker = marker.clone();
            recursive("tagged_region", move |nested| {
                line_opener(&marker)
                    .then(any_tag())
                    .then(re(OPEN_TAIL))
                    .then(nested.or(body_line(&marker)).many())
                    .then(close_line(&marker))
            })
        };

        line_opener(&marker)
            .then(tag_pattern(&self.tag).capture("tag"))
            .then(re(OPEN_TAIL))
            .then(nested.or(body_line(&marker)).many().capture("content"))
            .then(close_line(&marker))
            .build(builder)
    }
}

fn body_line(marker: &str) -> impl Parslet {
    close_line(marker)
        .not_ahead()
        .then(re(r"[^\n]*\n|[^\n]+"))
}

/// Pattern built by [`TagSyntax::block`]
#[derive(Debug, Clone)]
pub struct TaggedBlockPattern {
    marker: String,
    tag: Option<String>,
}

impl Parslet for TaggedBlockPattern {
    fn build(self, builder: &mut PatternBuilder) -> usize {
        // Text inside a brace block, with nested blocks balanced
        let inner = recursive("block_content", |inner| {
            choice(vec![
                dynamic(re(r"[^{}]+")),
                dynamic(lit("{").then(inner).then(lit("}"))),
            ])
            .many()
        });

        lit("/*")
            .then(re(r"[ \t]*"))
            .then(lit(self.marker.as_str()))
            .then(re(r"[ \t]*"))
            .then(tag_pattern(&self.tag).capture("tag"))
            .then(re(r"[ \t]*\*/"))
            .then(ws())
            .then(lit("{"))
            .then(inner.capture("content"))
            .then(lit("}"))
            .build(builder)
    }
}

// ============================================================================
// Region records
// ============================================================================

/// Which form a region was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionStyle {
    /// `//` open and close lines
    Region,
    /// `/*` comment followed by a brace block
    Block,
}

/// A tagged region as fetched from the buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedRegion {
    /// Form of the region
    pub style: RegionStyle,
    /// Full tag text, e.g. `id=create`
    pub tag: String,
    /// Identifier from an `id=` tag
    pub id: Option<String>,
    /// Text between the open and close markers
    pub content: String,
    /// Byte offset of `content` within the token's raw text
    pub content_offset: usize,
}

impl TaggedRegion {
    /// Decode the region carried by a region token
    pub fn from_token(token: &Token) -> Option<Self> {
        match token.value {
            TokenValue::Data(_) => token.value.decode().ok(),
            _ => None,
        }
    }

    /// Whether this region is excluded from whole-file examples
    pub fn is_ignored(&self) -> bool {
        self.tag == IGNORE_TAG
    }
}

/// Identifier named by a tag: `id=x` and `id="x"` give `x`
pub fn tag_id(tag: &str) -> Option<&str> {
    let value = tag.strip_prefix("id=")?;
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    (!value.is_empty()).then_some(value)
}

fn fetch_region(
    style: RegionStyle,
) -> impl Fn(&str, &PatternMatch) -> Result<Option<Fetched>, FetchError> + Send + Sync + 'static
{
    move |buffer, m| {
        let tag = m
            .text(buffer, "tag")
            .ok_or_else(|| FetchError::new("tagged region without a tag"))?;
        let content = m
            .get("content")
            .ok_or_else(|| FetchError::new("tagged region without content"))?;
        let region = TaggedRegion {
            style,
            tag: tag.to_string(),
            id: tag_id(tag).map(str::to_string),
            content: buffer[content.clone()].to_string(),
            content_offset: content.start,
        };
        let value = serde_json::to_value(&region).map_err(|e| FetchError::new(e.to_string()))?;
        Ok(Some(Fetched::new(TokenValue::Data(value), m.end)))
    }
}

/// Token kind of tagged regions in [`region_grammar`]
pub const REGION_KIND: &str = "region";

/// Define `tagged_region` and `tagged_block` rules for `tag` on `builder`
pub fn install(builder: &mut PatternBuilder, syntax: &TagSyntax, tag: Option<&str>) {
    builder.rule_mut("tagged_region", syntax.region(tag));
    builder.rule_mut("tagged_block", syntax.block(tag));
}

/// Token definitions for both region forms, as [`TaggedRegion`] data
///
/// Expects the rules defined by [`install`].
pub fn region_tokens() -> [TokenDef; 2] {
    [
        TokenDef::new(REGION_KIND)
            .rule("tagged_region")
            .fetch(FetchStrategy::custom(fetch_region(RegionStyle::Region))),
        block_token("tagged_block"),
    ]
}

/// Token definition reading a tagged block matched by `rule`
///
/// `rule` may match text before the block comment, such as indentation.
pub fn block_token(rule: &str) -> TokenDef {
    TokenDef::new(REGION_KIND)
        .rule(rule)
        .fetch(FetchStrategy::custom(fetch_region(RegionStyle::Block)))
}

/// Token grammar that emits only tagged regions
///
/// Everything else is consumed and discarded. Block comments are skipped
/// whole, so a tag inside a commented-out block is not a region.
pub fn region_grammar(syntax: &TagSyntax, tag: Option<&str>) -> Result<TokenGrammar, DefinitionError> {
    let mut builder = PatternBuilder::new();
    install(&mut builder, syntax, tag);
    super::rust::install(&mut builder);
    let patterns = builder.build()?;

    let [region, block] = region_tokens();
    TokenGrammar::builder(patterns)
        .token(region)
        .token(block)
        .token(TokenDef::new("comment").rule("block_comment").discard())
        .token(TokenDef::new("text").regex(r"[^/\n]+|/|\n").discard())
        .build()
}
