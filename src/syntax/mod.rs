//! Pattern sets built on the engine
//!
//! - [`rust`] - Rust item, type and comment patterns
//! - [`tagged`] - Tagged regions in example sources
//! - [`doc`] - Fenced examples in documentation comments

pub mod doc;
pub mod rust;
pub mod tagged;

pub use doc::{DocExample, DocExtractor, DocFence};
pub use rust::CrateImport;
pub use tagged::{RegionStyle, TagSyntax, TaggedRegion};
