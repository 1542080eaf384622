//! Integration tests for the snippet index
//!
//! These tests index small example programs, extract documentation examples
//! from a library source and check the two against each other.

use tagscan::prelude::*;
use tagscan::snippets::normalize;
use tagscan::syntax::tagged::RegionStyle;

const CREATE_RESOLVE: &str = r#"// Copyright (C) The Interner Authors
//
// Licensed under the MIT license.
//! Examples for the documentation in src/traits.rs.
extern crate interner;

fn main() {
    {
        //` id=create {
        use interner::prelude::*;
        use interner::Pool;

        let mut pool = Pool::<str, u16>::new();
        let cat = pool.intern("Kibbles").expect("interning failed");
        //` }

        //` id=resolve {
        assert_eq!(Ok("Kibbles"), pool.resolve(cat));
        //` }
    }
}

//` ignore {
fn helper() -> Result<(), interner::Error> {
    /*` id=inline */ {
        let x = 1;
    }
    Ok(())
}
//` }
"#;

const ANYTHING: &str = r#"// Copyright (C) The Interner Authors
//! The pool is generic over the interned type.
extern crate interner;
use interner::prelude::*;
use interner::Pool;

#[derive(Clone, Eq, PartialEq, Hash)]
struct Wobble {
    whee: Vec<u32>
}

fn main() {
    let mut pool = Pool::<_, u8>::new();
    assert!(pool.intern(&Wobble { whee: vec![1, 2, 3] }).is_ok());
}
"#;

const TRAITS: &str = r#"//! # Symbol creation
//!
//! ```rust file="examples/create-resolve.rs" id="create"
//! use interner::prelude::*;
//! use interner::Pool;
//!
//! let mut pool = Pool::<str, u16>::new();
//! let cat = pool.intern("Kibbles").expect("interning failed");
//! ```
//!
//! ```rust,ignore file="examples/create-resolve.rs" id="resolve"
//! assert_eq!(Ok("Kibbles"), pool.resolve(cat));
//! ```
//!
//! ```rust file="examples/anything.rs"
//! use interner::prelude::*;
//! use interner::Pool;
//!
//! #[derive(Clone, Eq, PartialEq, Hash)]
//! struct Wobble {
//!     whee: Vec<u32>
//! }
//!
//! let mut pool = Pool::<_, u8>::new();
//! assert!(pool.intern(&Wobble { whee: vec![1, 2, 3] }).is_ok());
//! ```

/// Resolve a symbol.
///
/// ```rust,ignore file="examples/create-resolve.rs" id="resolve"
/// assert_eq!(Ok("Fido"), pool.resolve(cat));
/// ```
///
/// ```rust,ignore
/// pool.resolve(sym);
/// ```
pub trait Resolve {}
"#;

fn index() -> SnippetIndex {
    let mut index = SnippetIndex::new().unwrap();
    index
        .scan_source("examples/create-resolve.rs", CREATE_RESOLVE)
        .unwrap();
    index.scan_source("examples/anything.rs", ANYTHING).unwrap();
    index
}

// ============================================================================
// Indexing
// ============================================================================

#[test]
fn test_regions_are_indexed_by_file_and_id() {
    let index = index();
    let file = "examples/create-resolve.rs";

    // create, resolve, ignore and the block nested in the ignored region
    assert_eq!(index.snippets_in(file).count(), 4);

    let create = index.get(file, "create").unwrap();
    assert_eq!(create.position.line, 10);
    assert_eq!(create.position.column, 0);
    assert!(create.content.starts_with("        use interner::prelude::*;\n"));

    let resolve = index.get(file, "resolve").unwrap();
    assert_eq!(
        normalize(&resolve.content),
        "assert_eq!(Ok(\"Kibbles\"), pool.resolve(cat));"
    );
    assert_eq!(
        &CREATE_RESOLVE[resolve.position.offset..][..resolve.content.len()],
        resolve.content
    );
}

#[test]
fn test_region_nested_in_ignored_region() {
    let index = index();
    let inline = index.get("examples/create-resolve.rs", "inline").unwrap();
    assert_eq!(inline.style, RegionStyle::Block);
    assert_eq!(normalize(&inline.content), "let x = 1;");
    assert_eq!(inline.position.line, 25);
}

#[test]
fn test_whole_file_outline() {
    let index = index();
    let outline = index.whole_file("examples/anything.rs").unwrap();
    assert_eq!(
        outline,
        "use interner::prelude::*;\nuse interner::Pool;\n\n#[derive(Clone, Eq, PartialEq, Hash)]\nstruct Wobble {\n    whee: Vec<u32>\n}\n\nlet mut pool = Pool::<_, u8>::new();\nassert!(pool.intern(&Wobble { whee: vec![1, 2, 3] }).is_ok());\n"
    );
    assert_eq!(index.crate_imports("examples/anything.rs")[0].name, "interner");
}

#[test]
fn test_ignored_region_is_left_out_of_outline() {
    let index = index();
    let outline = index.whole_file("examples/create-resolve.rs").unwrap();
    assert!(!outline.contains("helper"));
    assert!(outline.contains("pool.resolve(cat)"));
    assert!(!outline.contains("//`"));
}

// ============================================================================
// Checking Documentation
// ============================================================================

#[test]
fn test_check_docs_reports_only_stale_examples() {
    let index = index();
    let problems = index.check_docs("src/traits.rs", TRAITS).unwrap();

    assert_eq!(problems.len(), 1, "{:?}", problems);
    match &problems[0] {
        SnippetMismatch::Mismatch {
            example,
            expected,
            found,
        } => {
            assert_eq!(example.id(), Some("resolve"));
            assert_eq!(example.position.line, 30);
            assert!(expected.contains("Kibbles"));
            assert!(found.contains("Fido"));
        }
        other => panic!("expected a mismatch, got {:?}", other),
    }
    assert_eq!(
        problems[0].to_string(),
        "src/traits.rs:30:0: example does not match examples/create-resolve.rs#resolve"
    );
}

#[test]
fn test_examples_for_unknown_sources_are_missing() {
    let index = SnippetIndex::new().unwrap();
    let examples = DocExtractor::new()
        .unwrap()
        .extract("src/traits.rs", TRAITS)
        .unwrap();
    assert_eq!(examples.len(), 5);

    let problems = index.verify(&examples);
    assert_eq!(problems.len(), 4);
    assert!(problems
        .iter()
        .all(|p| matches!(p, SnippetMismatch::Missing { .. })));
}

#[test]
fn test_custom_marker() {
    let mut index = SnippetIndex::with_syntax(TagSyntax::new("tag:")).unwrap();
    index
        .scan_source("demo.rs", "// tag: id=demo {\nfn demo() {}\n// tag: }\n//` id=other {\nx\n//` }\n")
        .unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index.get("demo.rs", "demo").unwrap().content.trim(), "fn demo() {}");
    assert!(index.get("demo.rs", "other").is_none());
}
