//! Snippet index
//!
//! Collects the tagged regions of example sources and checks documentation
//! examples against them. A documentation example names its origin with the
//! `file` attribute and, optionally, a region with `id`:
//!
//! ```text
//! /// ```rust,ignore file="examples/create-resolve.rs" id="resolve"
//! /// assert_eq!(Ok("Kibbles"), basic_pool.resolve(cat));
//! /// ```
//! ```
//!
//! Without `id` the example is compared with the whole-file outline of the
//! source: leading comments, `//!` lines and `extern crate` declarations are
//! dropped, `ignore` regions are left out and the body of `fn main()` is
//! unwrapped in place.
//!
//! # Example
//!
//! ```
//! use tagscan::snippets::SnippetIndex;
//!
//! let mut index = SnippetIndex::new().unwrap();
//! index
//!     .scan_source("examples/demo.rs", "fn main() {\n    //` id=greet {\n    hello();\n    //` }\n}\n")
//!     .unwrap();
//!
//! let snippet = index.get("examples/demo.rs", "greet").unwrap();
//! assert_eq!(snippet.content, "    hello();\n");
//! assert_eq!(snippet.position.line, 3);
//! ```

use crate::engine::error::{DefinitionError, TokenizeError};
use crate::engine::pattern_dsl::*;
use crate::engine::sink::{SinkError, SinkResult, TokenSink};
use crate::engine::source_location::Position;
use crate::engine::token::{FetchStrategy, Token, TokenDef, TokenGrammar};
use crate::engine::tokenizer::ParseState;
use crate::syntax::doc::{DocExample, DocExtractor};
use crate::syntax::rust::{self, CrateImport};
use crate::syntax::tagged::{self, RegionStyle, TagSyntax, TaggedRegion, REGION_KIND};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::ControlFlow;

/// A tagged region recorded in the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// Source file label
    pub file: String,
    /// Full tag text
    pub tag: String,
    /// Identifier from an `id=` tag
    pub id: Option<String>,
    /// Form the region was written in
    pub style: RegionStyle,
    /// Region content, verbatim
    pub content: String,
    /// Position of the first character of `content`
    pub position: Position,
}

/// A documentation example that does not agree with its source
#[derive(Debug, Clone, PartialEq)]
pub enum SnippetMismatch {
    /// The named file or region is not in the index
    Missing {
        /// The example
        example: DocExample,
    },
    /// The example differs from the indexed text
    Mismatch {
        /// The example
        example: DocExample,
        /// Normalized indexed text
        expected: String,
        /// Normalized example text
        found: String,
    },
}

impl SnippetMismatch {
    /// The example this result is about
    pub fn example(&self) -> &DocExample {
        match self {
            SnippetMismatch::Missing { example } | SnippetMismatch::Mismatch { example, .. } => {
                example
            }
        }
    }
}

impl fmt::Display for SnippetMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let example = self.example();
        let source = example.source().unwrap_or_default();
        let target = match example.id() {
            Some(id) => format!("{}#{}", source, id),
            None => source.to_string(),
        };
        write!(f, "{}:{}: ", example.file, example.position)?;
        match self {
            SnippetMismatch::Missing { .. } => write!(f, "example source {} not found", target),
            SnippetMismatch::Mismatch { .. } => {
                write!(f, "example does not match {}", target)
            }
        }
    }
}

/// Remove the indentation common to all non-blank lines
pub fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    let mut out = String::with_capacity(text.len());
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if !line.trim().is_empty() {
            out.push_str(&line[indent..]);
        }
    }
    if text.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Text as compared by [`SnippetIndex::verify`]
///
/// Dedented, with trailing whitespace and leading and trailing blank lines
/// removed.
pub fn normalize(text: &str) -> String {
    let dedented = dedent(text);
    let lines: Vec<&str> = dedented.lines().map(str::trim_end).collect();
    let first = lines.iter().position(|l| !l.is_empty());
    let last = lines.iter().rposition(|l| !l.is_empty());
    match (first, last) {
        (Some(first), Some(last)) => lines[first..=last].join("\n"),
        _ => String::new(),
    }
}

/// Sink turning region tokens into snippets
struct RegionCollector<'a> {
    file: &'a str,
    snippets: Vec<Snippet>,
}

impl TokenSink for RegionCollector<'_> {
    type Output = Vec<Snippet>;

    fn on_token(&mut self, token: Token) -> SinkResult<ControlFlow<()>> {
        let region = TaggedRegion::from_token(&token).ok_or_else(|| SinkError::TypeMismatch {
            expected: "tagged region".to_string(),
            actual: format!("{:?}", token.value),
        })?;
        let opener = token
            .raw
            .get(..region.content_offset)
            .ok_or_else(|| SinkError::UnexpectedToken {
                kind: token.kind.clone(),
                message: format!("content offset {} outside the token", region.content_offset),
            })?;

        self.snippets.push(Snippet {
            file: self.file.to_string(),
            position: token.position.update(opener),
            tag: region.tag,
            id: region.id,
            style: region.style,
            content: region.content,
        });
        Ok(ControlFlow::Continue(()))
    }

    fn finish(&mut self) -> SinkResult<Vec<Snippet>> {
        Ok(std::mem::take(&mut self.snippets))
    }
}

/// Token grammar for whole-file outlines
fn outline_grammar(syntax: &TagSyntax) -> Result<TokenGrammar, DefinitionError> {
    let mut builder = PatternBuilder::new();
    tagged::install(&mut builder, syntax, None);
    rust::install(&mut builder);
    builder.rule_mut(
        "extern_crate_line",
        re(r"[ \t]*")
            .then(ref_("extern_crate"))
            .then(re(r"[ \t]*(?:\n|$)")),
    );
    builder.rule_mut(
        "main_fn",
        re(r"[ \t]*fn[ \t]+main[ \t]*\(\)[ \t]*")
            .then(balanced('{', '}').capture("body"))
            .then(re(r"[ \t]*(?:\n|$)")),
    );
    // Outline tokens start at line starts, so indentation belongs to the block
    builder.rule_mut(
        "indented_block",
        re(r"[ \t]+").then(ref_("tagged_block")),
    );
    let patterns = builder.build()?;

    let [region, block] = tagged::region_tokens();
    TokenGrammar::builder(patterns)
        .token(region)
        .token(block)
        .token(tagged::block_token("indented_block"))
        .token(
            TokenDef::new("extern_crate")
                .rule("extern_crate_line")
                .fetch(FetchStrategy::custom(rust::fetch_crate_import)),
        )
        .token(
            TokenDef::new("main")
                .rule("main_fn")
                .fetch(FetchStrategy::capture("body")),
        )
        .token(TokenDef::new("block_comment").rule("block_comment"))
        .token(TokenDef::new("line").regex(r"[^\n]*\n|[^\n]+"))
        .build()
}

fn unwrap_braces(body: &str) -> &str {
    let inner = body
        .strip_prefix('{')
        .and_then(|b| b.strip_suffix('}'))
        .unwrap_or(body);
    inner
        .strip_prefix("\r\n")
        .or_else(|| inner.strip_prefix('\n'))
        .unwrap_or(inner)
}

fn leading_indent(raw: &str) -> &str {
    let rest = raw.trim_start_matches(|c: char| c == ' ' || c == '\t');
    &raw[..raw.len() - rest.len()]
}

/// Index of tagged regions across example sources
#[derive(Debug)]
pub struct SnippetIndex {
    regions: TokenGrammar,
    outline: TokenGrammar,
    docs: DocExtractor,
    snippets: Vec<Snippet>,
    by_id: HashMap<String, HashMap<String, usize>>,
    whole_files: HashMap<String, String>,
    imports: HashMap<String, Vec<CrateImport>>,
}

impl SnippetIndex {
    /// Create an index for the default tag marker
    pub fn new() -> Result<Self, DefinitionError> {
        Self::with_syntax(TagSyntax::default())
    }

    /// Create an index for a custom tag marker
    pub fn with_syntax(syntax: TagSyntax) -> Result<Self, DefinitionError> {
        Ok(Self {
            regions: tagged::region_grammar(&syntax, None)?,
            outline: outline_grammar(&syntax)?,
            docs: DocExtractor::new()?,
            snippets: Vec::new(),
            by_id: HashMap::new(),
            whole_files: HashMap::new(),
            imports: HashMap::new(),
        })
    }

    /// Index the regions and whole-file outline of one source file
    ///
    /// Scanning a file again replaces what was recorded for it.
    ///
    /// # Returns
    /// Number of regions found, nested ones included
    pub fn scan_source(&mut self, file: &str, text: &str) -> Result<usize, TokenizeError> {
        let mut found = Vec::new();
        self.scan_regions(file, text, Position::start(), &mut found)?;
        let mut imports = Vec::new();
        let outline = self.outline(file, text, true, &mut imports)?;

        self.remove_file(file);
        let count = found.len();
        for snippet in found {
            self.insert(snippet);
        }
        self.whole_files.insert(file.to_string(), outline);
        self.imports.insert(file.to_string(), imports);

        log_debug!("Indexed {}: {} regions", file, count);
        Ok(count)
    }

    fn scan_regions(
        &self,
        file: &str,
        text: &str,
        start: Position,
        found: &mut Vec<Snippet>,
    ) -> Result<(), TokenizeError> {
        let regions = ParseState::new(&self.regions, text)
            .with_file(file)
            .with_start(start)
            .run_with(RegionCollector {
                file,
                snippets: Vec::new(),
            })?;

        for snippet in regions {
            let content = snippet.content.clone();
            let position = snippet.position;
            found.push(snippet);
            self.scan_regions(file, &content, position, found)?;
        }
        Ok(())
    }

    fn insert(&mut self, snippet: Snippet) {
        if let Some(id) = &snippet.id {
            let ids = self.by_id.entry(snippet.file.clone()).or_default();
            if ids.contains_key(id) {
                log_debug!("{}: duplicate region id {}, keeping the first", snippet.file, id);
            } else {
                ids.insert(id.clone(), self.snippets.len());
            }
        }
        self.snippets.push(snippet);
    }

    fn remove_file(&mut self, file: &str) {
        self.whole_files.remove(file);
        self.imports.remove(file);
        if self.by_id.remove(file).is_none() && !self.snippets.iter().any(|s| s.file == file) {
            return;
        }
        self.snippets.retain(|s| s.file != file);

        self.by_id.clear();
        for (i, snippet) in self.snippets.iter().enumerate() {
            if let Some(id) = &snippet.id {
                self.by_id
                    .entry(snippet.file.clone())
                    .or_default()
                    .entry(id.clone())
                    .or_insert(i);
            }
        }
    }

    fn outline(
        &self,
        file: &str,
        text: &str,
        mut header: bool,
        imports: &mut Vec<CrateImport>,
    ) -> Result<String, TokenizeError> {
        let tokens = ParseState::new(&self.outline, text).with_file(file).run()?;
        let mut out = String::with_capacity(text.len());

        for token in tokens {
            match token.kind.as_str() {
                REGION_KIND => {
                    header = false;
                    let region =
                        TaggedRegion::from_token(&token).ok_or_else(|| TokenizeError::Fetch {
                            kind: token.kind.clone(),
                            message: "region token without region data".to_string(),
                        })?;
                    if region.is_ignored() {
                        continue;
                    }
                    let inner = self.outline(file, &region.content, false, imports)?;
                    match region.style {
                        RegionStyle::Region => out.push_str(&inner),
                        RegionStyle::Block => {
                            out.push_str(leading_indent(&token.raw));
                            out.push('{');
                            out.push_str(&inner);
                            out.push('}');
                        }
                    }
                }
                "extern_crate" => imports.extend(CrateImport::from_token(&token)),
                "main" => {
                    header = false;
                    let body = dedent(unwrap_braces(token.text()));
                    out.push_str(&self.outline(file, &body, false, imports)?);
                }
                _ => {
                    let line = token.raw.trim();
                    if line.starts_with("//!") {
                        continue;
                    }
                    if header
                        && (line.is_empty()
                            || line.starts_with("//")
                            || token.kind == "block_comment")
                    {
                        continue;
                    }
                    header = false;
                    out.push_str(&token.raw);
                }
            }
        }
        Ok(out)
    }

    /// Region `id` of `file`
    pub fn get(&self, file: &str, id: &str) -> Option<&Snippet> {
        let index = *self.by_id.get(file)?.get(id)?;
        self.snippets.get(index)
    }

    /// All regions, outer regions before the regions they contain
    pub fn snippets(&self) -> &[Snippet] {
        &self.snippets
    }

    /// Regions of one file
    pub fn snippets_in<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a Snippet> + 'a {
        self.snippets.iter().filter(move |s| s.file == file)
    }

    /// Number of indexed regions
    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    /// Whether no regions are indexed
    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    /// Whole-file outline of `file`
    pub fn whole_file(&self, file: &str) -> Option<&str> {
        self.whole_files.get(file).map(String::as_str)
    }

    /// `extern crate` declarations dropped from the outline of `file`
    pub fn crate_imports(&self, file: &str) -> &[CrateImport] {
        self.imports.get(file).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Compare documentation examples with the indexed sources
    ///
    /// Examples without a `file` attribute are not checked.
    pub fn verify(&self, examples: &[DocExample]) -> Vec<SnippetMismatch> {
        let mut problems = Vec::new();
        for example in examples {
            let Some(source) = example.source() else {
                continue;
            };
            let expected = match example.id() {
                Some(id) => self.get(source, id).map(|s| s.content.as_str()),
                None => self.whole_file(source),
            };
            let Some(expected) = expected else {
                problems.push(SnippetMismatch::Missing {
                    example: example.clone(),
                });
                continue;
            };

            let expected = normalize(expected);
            let found = normalize(example.code());
            if expected != found {
                problems.push(SnippetMismatch::Mismatch {
                    example: example.clone(),
                    expected,
                    found,
                });
            }
        }
        problems
    }

    /// Extract the examples in documented source `text` and verify them
    pub fn check_docs(&self, file: &str, text: &str) -> Result<Vec<SnippetMismatch>, TokenizeError> {
        let examples = self.docs.extract(file, text)?;
        Ok(self.verify(&examples))
    }
}
