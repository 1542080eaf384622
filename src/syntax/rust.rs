//! Rust syntax patterns
//!
//! Named patterns for the parts of Rust needed to locate items in source and
//! documentation text. They recognize shapes, not meaning: a `fn_decl` is
//! "the word `fn`, a name, optional generics, a parenthesised parameter list,
//! an optional return type and where-clause, then a brace block or `;`".
//! Bodies and parameter lists are balanced groups, so their contents are never
//! inspected.
//!
//! # Rules
//!
//! | Rule | Captures |
//! |------|----------|
//! | `fn_decl` | `name`, `generics`, `params`, `ret`, `where`, `body` |
//! | `trait_decl` | `name`, `generics`, `supertraits`, `where`, `body` |
//! | `impl_decl` | `generics`, `trait`, `self_ty`, `where`, `body` |
//! | `mod_decl` | `name`, `body` |
//! | `use_decl` | `tree` |
//! | `extern_crate` | `name`, `alias` |
//! | `doc_comment` | `text` |
//!
//! Building blocks without captures: `ident`, `lifetime`, `path`,
//! `generic_args`, `generic_params`, `type`, `trait_ref`, `bound`, `bounds`,
//! `bounded_type`, `where_clause`, `visibility`, `attribute`, `use_tree`,
//! `line_comment`, `block_comment`, `block_doc_comment`, `string_lit`,
//! `raw_string_lit`, `char_lit`, `literal`.
//!
//! # Example
//!
//! ```
//! use tagscan::engine::pattern_dsl::PatternBuilder;
//! use tagscan::syntax::rust;
//!
//! let mut builder = PatternBuilder::new();
//! rust::install(&mut builder);
//! let patterns = builder.build().unwrap();
//!
//! let input = "pub fn get<K: Hash>(&self, key: K) -> Option<&V> where K: Eq { None }";
//! let m = patterns.match_rule("fn_decl", input).unwrap().unwrap();
//! assert_eq!(m.text(input, "name"), Some("get"));
//! assert_eq!(m.text(input, "ret"), Some("Option<&V>"));
//! assert_eq!(m.end, input.len());
//! ```

use crate::engine::error::{DefinitionError, FetchError};
use crate::engine::matcher::PatternMatch;
use crate::engine::pattern_dsl::*;
use crate::engine::token::{FetchStrategy, Fetched, Token, TokenDef, TokenGrammar, TokenValue};
use serde::{Deserialize, Serialize};

const IDENT: &str = r"(?:r#)?[A-Za-z_][A-Za-z0-9_]*";

/// Define every Rust rule on `builder`
pub fn install(builder: &mut PatternBuilder) {
    install_names(builder);
    install_types(builder);
    install_items(builder);
    install_comments(builder);
    install_literals(builder);
}

fn install_names(builder: &mut PatternBuilder) {
    builder.rule_mut("ident", re(IDENT));
    builder.rule_mut("lifetime", re(r"'[A-Za-z_][A-Za-z0-9_]*"));

    // `Vec<T>` in types, `Vec::<T>` in expressions
    builder.rule_mut(
        "path_segment",
        ref_("ident").then(
            ws().then(lit("::").optional())
                .then(ws())
                .then(ref_("generic_args"))
                .optional(),
        ),
    );
    builder.rule_mut(
        "path",
        lit("::")
            .optional()
            .then(list(ref_("path_segment"), lit("::"))),
    );

    builder.rule_mut(
        "visibility",
        keyword("pub").then(ws().then(balanced('(', ')')).optional()),
    );
    builder.rule_mut(
        "attribute",
        re("#!?").then(ws()).then(balanced('[', ']')),
    );
}

fn install_types(builder: &mut PatternBuilder) {
    let ret_type = || {
        ws().then(lit("->"))
            .then(ws())
            .then(ref_("type"))
            .optional()
    };

    let generic_arg = choice(vec![
        dynamic(ref_("lifetime")),
        dynamic(
            ref_("ident")
                .then(ws())
                .then(lit("="))
                .then(ws())
                .then(ref_("type")),
        ),
        dynamic(balanced('{', '}')),
        dynamic(re(r"-?[0-9][0-9_]*")),
        dynamic(ref_("type")),
    ]);
    builder.rule_mut("generic_arg", generic_arg);
    builder.rule_mut("generic_args", angle_list("generic_arg"));

    let generic_param = choice(vec![
        dynamic(
            ref_("lifetime").then(
                ws().then(lit(":"))
                    .then(ws())
                    .then(list(ref_("lifetime"), lit("+")))
                    .optional(),
            ),
        ),
        dynamic(
            keyword("const")
                .then(ws())
                .then(ref_("ident"))
                .then(ws())
                .then(lit(":"))
                .then(ws())
                .then(ref_("type"))
                .then(
                    ws().then(lit("="))
                        .then(ws())
                        .then(ref_("generic_arg"))
                        .optional(),
                ),
        ),
        dynamic(
            ref_("ident")
                .then(
                    ws().then(lit(":"))
                        .then(ws())
                        .then(ref_("bounds").optional())
                        .optional(),
                )
                .then(
                    ws().then(lit("="))
                        .then(ws())
                        .then(ref_("type"))
                        .optional(),
                ),
        ),
    ]);
    builder.rule_mut("generic_param", generic_param);
    builder.rule_mut("generic_params", angle_list("generic_param"));

    // A path, optionally with `Fn(A) -> B` sugar
    builder.rule_mut(
        "trait_ref",
        ref_("path").then(ws().then(balanced('(', ')')).then(ret_type()).optional()),
    );

    let higher_ranked = || {
        keyword("for")
            .then(ws())
            .then(ref_("generic_params"))
            .then(ws())
    };

    builder.rule_mut(
        "bound",
        choice(vec![
            dynamic(ref_("lifetime")),
            dynamic(
                lit("?")
                    .optional()
                    .then(higher_ranked().optional())
                    .then(ref_("trait_ref")),
            ),
            dynamic(balanced('(', ')')),
        ]),
    );
    builder.rule_mut("bounds", list(ref_("bound"), lit("+")));

    let type_ = choice(vec![
        dynamic(
            lit("&")
                .then(ws())
                .then(ref_("lifetime").then(ws()).optional())
                .then(keyword("mut").then(ws()).optional())
                .then(ref_("type")),
        ),
        dynamic(
            lit("*")
                .then(ws())
                .then(re(r"(?:const|mut)\b"))
                .then(ws())
                .then(ref_("type")),
        ),
        dynamic(balanced('(', ')')),
        dynamic(balanced('[', ']')),
        dynamic(re(r"(?:dyn|impl)\b").then(ws()).then(ref_("bounds"))),
        dynamic(
            higher_ranked()
                .optional()
                .then(re(r#"(?:unsafe\s+)?(?:extern\s+(?:"[^"]*"\s*)?)?fn\b"#))
                .then(ws())
                .then(balanced('(', ')'))
                .then(ret_type()),
        ),
        dynamic(lit("!")),
        dynamic(ref_("trait_ref")),
    ]);
    builder.rule_mut("type", type_);

    builder.rule_mut(
        "bounded_type",
        choice(vec![
            dynamic(
                ref_("lifetime")
                    .then(ws())
                    .then(lit(":"))
                    .then(ws())
                    .then(list(ref_("lifetime"), lit("+"))),
            ),
            dynamic(
                higher_ranked()
                    .optional()
                    .then(ref_("type"))
                    .then(ws())
                    .then(lit(":"))
                    .then(ws().then(ref_("bounds")).optional()),
            ),
        ]),
    );
    builder.rule_mut(
        "where_clause",
        keyword("where")
            .then(ws())
            .then(list(ref_("bounded_type"), lit(",")))
            .then(ws().then(lit(",")).optional()),
    );
}

/// `<` item, item, ... `>` with an optional trailing comma
fn angle_list(item: &str) -> impl Parslet {
    lit("<")
        .then(ws())
        .then(
            list(ref_(item), lit(","))
                .then(ws())
                .then(lit(",").optional())
                .optional(),
        )
        .then(ws())
        .then(lit(">"))
}

fn install_items(builder: &mut PatternBuilder) {
    let vis = || ref_("visibility").then(ws()).optional();
    let where_ = || ref_("where_clause").capture("where").then(ws()).optional();
    let generics = || ref_("generic_params").capture("generics").then(ws()).optional();

    builder.rule_mut(
        "fn_decl",
        vis()
            .then(re(
                r#"(?:(?:const|async|unsafe)\s+|extern\s+(?:"[^"]*"\s+)?)*"#,
            ))
            .then(keyword("fn"))
            .then(ws())
            .then(ref_("ident").capture("name"))
            .then(ws())
            .then(generics())
            .then(balanced('(', ')').capture("params"))
            .then(ws())
            .then(
                lit("->")
                    .then(ws())
                    .then(ref_("type").capture("ret"))
                    .then(ws())
                    .optional(),
            )
            .then(where_())
            .then(balanced('{', '}').capture("body").or(lit(";"))),
    );

    builder.rule_mut(
        "trait_decl",
        vis()
            .then(keyword("unsafe").then(ws()).optional())
            .then(keyword("auto").then(ws()).optional())
            .then(keyword("trait"))
            .then(ws())
            .then(ref_("ident").capture("name"))
            .then(ws())
            .then(generics())
            .then(
                lit(":")
                    .then(ws())
                    .then(ref_("bounds").capture("supertraits"))
                    .then(ws())
                    .optional(),
            )
            .then(where_())
            .then(balanced('{', '}').capture("body")),
    );

    builder.rule_mut(
        "impl_decl",
        keyword("unsafe")
            .then(ws())
            .optional()
            .then(keyword("impl"))
            .then(ws())
            .then(generics())
            .then(
                lit("!")
                    .optional()
                    .then(ref_("trait_ref").capture("trait"))
                    .then(ws())
                    .then(keyword("for"))
                    .then(ws())
                    .optional(),
            )
            .then(ref_("type").capture("self_ty"))
            .then(ws())
            .then(where_())
            .then(balanced('{', '}').capture("body")),
    );

    builder.rule_mut(
        "mod_decl",
        vis()
            .then(keyword("mod"))
            .then(ws())
            .then(ref_("ident").capture("name"))
            .then(ws())
            .then(balanced('{', '}').capture("body").or(lit(";"))),
    );

    builder.rule_mut(
        "use_tree",
        lit("::")
            .optional()
            .then(
                ref_("ident")
                    .then(ws())
                    .then(lit("::"))
                    .then(ws())
                    .many(),
            )
            .then(choice(vec![
                dynamic(lit("*")),
                dynamic(
                    lit("{")
                        .then(ws())
                        .then(list(ref_("use_tree"), lit(",")).then(ws()).optional())
                        .then(lit(",").optional())
                        .then(ws())
                        .then(lit("}")),
                ),
                dynamic(
                    ref_("ident").then(
                        ws1()
                            .then(keyword("as"))
                            .then(ws())
                            .then(ref_("ident"))
                            .optional(),
                    ),
                ),
            ])),
    );
    builder.rule_mut(
        "use_decl",
        vis()
            .then(keyword("use"))
            .then(ws())
            .then(ref_("use_tree").capture("tree"))
            .then(ws())
            .then(lit(";")),
    );

    builder.rule_mut(
        "extern_crate",
        vis()
            .then(keyword("extern"))
            .then(ws())
            .then(keyword("crate"))
            .then(ws())
            .then(ref_("ident").capture("name"))
            .then(
                ws1()
                    .then(keyword("as"))
                    .then(ws())
                    .then(ref_("ident").capture("alias"))
                    .optional(),
            )
            .then(ws())
            .then(lit(";")),
    );
}

fn install_comments(builder: &mut PatternBuilder) {
    builder.rule_mut(
        "line_comment",
        re(r"////[^\n]*").or(lit("//")
            .then(re("[/!]").not_ahead())
            .then(re(r"[^\n]*"))),
    );
    builder.rule_mut(
        "doc_comment",
        lit("///")
            .then(lit("/").not_ahead())
            .then(re(r"[^\n]*").capture("text"))
            .or(lit("//!").then(re(r"[^\n]*").capture("text"))),
    );

    // Block comments nest in Rust
    builder.rule_mut(
        "block_comment",
        recursive("block_comment", |nested| {
            lit("/*")
                .then(
                    choice(vec![
                        dynamic(nested),
                        dynamic(re(r"[^*/]+")),
                        dynamic(lit("*/").not_ahead().then(any())),
                    ])
                    .many(),
                )
                .then(lit("*/"))
        }),
    );
    builder.rule_mut(
        "block_doc_comment",
        lit("/**")
            .then(re("[*/]").not_ahead())
            .or(lit("/*!"))
            .lookahead()
            .then(ref_("block_comment")),
    );
}

fn install_literals(builder: &mut PatternBuilder) {
    builder.rule_mut("string_lit", re(r#"b?"(?:[^"\\]|\\(?s:.))*""#));
    builder.rule_mut(
        "raw_string_lit",
        choice(
            (0..=4)
                .map(|hashes| {
                    let fence = "#".repeat(hashes);
                    re(format!(r#"b?r{fence}"(?s:.*?)"{fence}"#))
                })
                .collect(),
        ),
    );
    builder.rule_mut(
        "char_lit",
        re(r"b?'(?:[^'\\\n]|\\(?:x[0-9a-fA-F]{2}|u\{[0-9a-fA-F]{1,6}\}|.))'"),
    );
    builder.rule_mut(
        "literal",
        choice(vec![
            ref_("raw_string_lit"),
            ref_("string_lit"),
            ref_("char_lit"),
        ]),
    );
}

// ============================================================================
// Crate imports
// ============================================================================

/// An `extern crate` declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrateImport {
    /// Crate name
    pub name: String,
    /// Name given with `as`, if any
    pub alias: Option<String>,
}

impl CrateImport {
    /// The name the crate is known by inside the importing module
    pub fn effective_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Decode the import carried by an `extern_crate` token
    pub fn from_token(token: &Token) -> Option<Self> {
        match token.value {
            TokenValue::Data(_) => token.value.decode().ok(),
            _ => None,
        }
    }
}

/// Fetch an `extern_crate` match as a [`CrateImport`] record
pub fn fetch_crate_import(buffer: &str, m: &PatternMatch) -> Result<Option<Fetched>, FetchError> {
    let name = m
        .text(buffer, "name")
        .ok_or_else(|| FetchError::new("extern crate declaration without a name"))?;
    let import = CrateImport {
        name: name.to_string(),
        alias: m.text(buffer, "alias").map(str::to_string),
    };
    let value = serde_json::to_value(&import).map_err(|e| FetchError::new(e.to_string()))?;
    Ok(Some(Fetched::new(TokenValue::Data(value), m.end)))
}

// ============================================================================
// Item grammar
// ============================================================================

/// Token grammar that splits Rust source into items, comments and leftovers
///
/// Every input tokenizes: text that is not a recognized item falls through to
/// `literal`, `lifetime`, `ident` or `other` tokens. Whitespace is discarded.
pub fn item_grammar() -> Result<TokenGrammar, DefinitionError> {
    let mut builder = PatternBuilder::new();
    install(&mut builder);
    let patterns = builder.build()?;

    TokenGrammar::builder(patterns)
        .token(TokenDef::new("space").regex(r"\s+").discard())
        .token(
            TokenDef::new("doc_comment")
                .rule("doc_comment")
                .fetch(FetchStrategy::trimmed_capture("text")),
        )
        .token(TokenDef::new("comment").rule("line_comment"))
        .token(TokenDef::new("block_doc_comment").rule("block_doc_comment"))
        .token(TokenDef::new("block_comment").rule("block_comment"))
        .token(TokenDef::new("attribute").rule("attribute"))
        .token(
            TokenDef::new("extern_crate")
                .rule("extern_crate")
                .fetch(FetchStrategy::custom(fetch_crate_import)),
        )
        .token(
            TokenDef::new("use")
                .rule("use_decl")
                .fetch(FetchStrategy::trimmed_capture("tree")),
        )
        .token(TokenDef::new("mod").rule("mod_decl").fetch(FetchStrategy::Captures))
        .token(TokenDef::new("fn").rule("fn_decl").fetch(FetchStrategy::Captures))
        .token(TokenDef::new("trait").rule("trait_decl").fetch(FetchStrategy::Captures))
        .token(TokenDef::new("impl").rule("impl_decl").fetch(FetchStrategy::Captures))
        .token(TokenDef::new("literal").rule("literal"))
        .token(TokenDef::new("lifetime").rule("lifetime"))
        .token(TokenDef::new("ident").rule("ident"))
        .token(TokenDef::new("other").regex(r"\w+|\S"))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::pattern::PatternSet;
    use crate::engine::tokenizer::tokenize;

    fn patterns() -> PatternSet {
        let mut builder = PatternBuilder::new();
        install(&mut builder);
        builder.build().unwrap()
    }

    fn full_match(patterns: &PatternSet, rule: &str, input: &str) -> bool {
        matches!(patterns.match_rule(rule, input), Ok(Some(m)) if m.end == input.len())
    }

    #[test]
    fn test_nested_generic_types() {
        let p = patterns();
        assert!(full_match(&p, "type", "Vec<HashMap<K, Vec<V>>>"));
        assert!(full_match(&p, "type", "&'a mut [u8]"));
        assert!(full_match(&p, "type", "Box<dyn Fn(u8) -> u8 + Send + 'static>"));
        assert!(full_match(&p, "type", "Iterator<Item = &'a str>"));
        assert!(full_match(&p, "type", "*const T"));
        assert!(full_match(&p, "type", "(u8, String)"));
        assert!(full_match(&p, "type", "::std::collections::HashMap<String, usize>"));
        assert!(full_match(&p, "type", "T::Owned"));
    }

    #[test]
    fn test_generic_params() {
        let p = patterns();
        assert!(full_match(&p, "generic_params", "<T: ?Sized, I = usize>"));
        assert!(full_match(&p, "generic_params", "<'a, 'b: 'a, T: 'a + Clone,>"));
        assert!(full_match(&p, "generic_params", "<const N: usize>"));
    }

    #[test]
    fn test_where_clause_with_trailing_comma() {
        let p = patterns();
        let input = "where T: ToOwned + Eq + Hash,\n      T::Owned: Eq + Hash + Clone,\n      I: SymbolId,";
        assert!(full_match(&p, "where_clause", input));
    }

    #[test]
    fn test_fn_without_optional_parts() {
        let p = patterns();
        let input = "fn main() {\n    run();\n}";
        let m = p.match_rule("fn_decl", input).unwrap().unwrap();
        assert_eq!(m.end, input.len());
        assert_eq!(m.text(input, "name"), Some("main"));
        assert!(m.get("generics").is_none());
        assert!(m.get("ret").is_none());
        assert!(m.get("where").is_none());
    }

    #[test]
    fn test_fn_with_every_part() {
        let p = patterns();
        let input = "pub(crate) unsafe fn resolve<'a, T>(&'a self, sym: T) -> Result<&'a str>\n    where T: Symbol,\n{ body() }";
        let m = p.match_rule("fn_decl", input).unwrap().unwrap();
        assert_eq!(m.end, input.len());
        assert_eq!(m.text(input, "generics"), Some("<'a, T>"));
        assert_eq!(m.text(input, "params"), Some("(&'a self, sym: T)"));
        assert_eq!(m.text(input, "ret"), Some("Result<&'a str>"));
        assert_eq!(m.text(input, "where"), Some("where T: Symbol,"));
        assert_eq!(m.text(input, "body"), Some("{ body() }"));
    }

    #[test]
    fn test_fn_signature_in_trait() {
        let p = patterns();
        let input = "fn len(&self) -> usize;";
        assert!(full_match(&p, "fn_decl", input));
    }

    #[test]
    fn test_impl_decl() {
        let p = patterns();
        let input = "impl<T: ?Sized, I> Clone for Pool<T, I>\n    where T: ToOwned,\n{\n    fn clone(&self) -> Self { todo() }\n}";
        let m = p.match_rule("impl_decl", input).unwrap().unwrap();
        assert_eq!(m.end, input.len());
        assert_eq!(m.text(input, "trait"), Some("Clone"));
        assert_eq!(m.text(input, "self_ty"), Some("Pool<T, I>"));

        let inherent = "impl<W> Inline<W> { }";
        let m = p.match_rule("impl_decl", inherent).unwrap().unwrap();
        assert!(m.get("trait").is_none());
        assert_eq!(m.text(inherent, "self_ty"), Some("Inline<W>"));
    }

    #[test]
    fn test_trait_decl() {
        let p = patterns();
        let input = "pub trait Resolve: Intern + Sized where Self: 'static { type Input; }";
        let m = p.match_rule("trait_decl", input).unwrap().unwrap();
        assert_eq!(m.end, input.len());
        assert_eq!(m.text(input, "name"), Some("Resolve"));
        assert_eq!(m.text(input, "supertraits"), Some("Intern + Sized"));
    }

    #[test]
    fn test_use_trees() {
        let p = patterns();
        assert!(full_match(&p, "use_decl", "use symtern::prelude::*;"));
        assert!(full_match(&p, "use_decl", "use std::{fmt, io::{self, Write as W},};"));
        assert!(full_match(&p, "use_decl", "pub use self::basic::Pool;"));
        assert!(!full_match(&p, "use_decl", "use std::{fmt;"));
    }

    #[test]
    fn test_mod_decl() {
        let p = patterns();
        assert!(full_match(&p, "mod_decl", "pub mod adaptors;"));
        assert!(full_match(&p, "mod_decl", "mod tests { fn a() {} }"));
    }

    #[test]
    fn test_comments() {
        let p = patterns();
        assert!(full_match(&p, "line_comment", "// plain"));
        assert!(full_match(&p, "line_comment", "//// not a doc comment"));
        assert!(!full_match(&p, "line_comment", "/// doc"));
        assert!(full_match(&p, "doc_comment", "/// doc"));
        assert!(full_match(&p, "doc_comment", "//! inner doc"));
        assert!(full_match(&p, "block_comment", "/* a /* nested */ b */"));
        assert!(!full_match(&p, "block_comment", "/* a /* unclosed */"));
        assert!(full_match(&p, "block_doc_comment", "/** doc */"));
        assert!(!full_match(&p, "block_doc_comment", "/**/"));
        assert!(!full_match(&p, "block_doc_comment", "/*** banner ***/"));
    }

    #[test]
    fn test_literals() {
        let p = patterns();
        assert!(full_match(&p, "literal", r#""a \" b""#));
        assert!(full_match(&p, "literal", r###"r##"a "# b"##"###));
        assert!(full_match(&p, "literal", r"'\n'"));
        assert!(full_match(&p, "literal", "b'x'"));
        assert!(!full_match(&p, "literal", "'a"));
    }

    #[test]
    fn test_extern_crate() {
        let p = patterns();
        let input = "extern crate symtern as sym;";
        let m = p.match_rule("extern_crate", input).unwrap().unwrap();
        assert_eq!(m.text(input, "name"), Some("symtern"));
        assert_eq!(m.text(input, "alias"), Some("sym"));
    }

    #[test]
    fn test_crate_import_effective_name() {
        let plain = CrateImport {
            name: "symtern".to_string(),
            alias: None,
        };
        let aliased = CrateImport {
            name: "symtern".to_string(),
            alias: Some("sym".to_string()),
        };
        assert_eq!(plain.effective_name(), "symtern");
        assert_eq!(aliased.effective_name(), "sym");
    }

    #[test]
    fn test_item_grammar() {
        let grammar = item_grammar().unwrap();
        let input = "//! Crate docs\nextern crate symtern;\nuse symtern::Pool;\n\n/// Run it\n#[inline]\npub fn run(x: u8) -> u8 { x + 1 }\n\nstruct S;\n";
        let tokens = tokenize(&grammar, input).unwrap();
        let kinds: Vec<&str> = tokens.iter().map(|t| t.kind.as_str()).collect();
        assert_eq!(
            kinds,
            vec![
                "doc_comment",
                "extern_crate",
                "use",
                "doc_comment",
                "attribute",
                "fn",
                "ident",
                "ident",
                "other"
            ]
        );
        assert_eq!(tokens[0].text(), "Crate docs");
        assert_eq!(tokens[2].text(), "symtern::Pool");
        assert_eq!(tokens[5].value.capture("name"), Some("run"));
        assert_eq!(tokens[5].position.line, 7);

        let import = CrateImport::from_token(&tokens[1]).unwrap();
        assert_eq!(import.name, "symtern");
        assert_eq!(import.effective_name(), "symtern");
    }
}
