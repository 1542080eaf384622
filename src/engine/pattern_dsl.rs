//! Pattern DSL - composable pattern construction
//!
//! This module provides a fluent, composable API for assembling patterns.
//! Every combinator implements [`Parslet`]; building one appends atoms to a
//! [`PatternBuilder`], which is the construction context for a single pattern
//! set.
//!
//! # Example
//!
//! ```rust
//! use tagscan::engine::pattern_dsl::*;
//!
//! let patterns = PatternBuilder::new()
//!     .rule("ident", re("[A-Za-z_][A-Za-z0-9_]*"))
//!     .rule("args", list(ref_("ident"), lit(",")))
//!     .rule("block", balanced('{', '}'))
//!     .build()
//!     .unwrap();
//!
//! assert!(patterns.has_rule("args"));
//! ```
//!
//! # Fresh names
//!
//! Self-referential patterns need rule names that cannot collide with each
//! other, even when several are nested inside one larger pattern. The builder
//! owns a counter for that purpose: [`PatternBuilder::fresh_name`] returns
//! `prefix#0`, `prefix#1`, ... and the counter only ever moves forward. A new
//! builder starts again at zero, so two builds of the same grammar produce the
//! same names.

use super::error::DefinitionError;
use super::pattern::{Atom, PatternSet};
use super::regex_cache;
use hashbrown::HashMap;

/// Parslet trait - implemented by all pattern combinators
pub trait Parslet {
    /// Append this parslet's atoms to the builder and return the root index
    fn build(self, builder: &mut PatternBuilder) -> usize;
}

/// Construction context for one pattern set
pub struct PatternBuilder {
    /// All atoms built so far
    atoms: Vec<Atom>,

    /// Named rules and their atom indices
    rules: HashMap<String, usize>,

    /// Entity atoms waiting for their rule to be resolved
    pending_refs: Vec<(usize, String)>,

    /// Fresh-name generator state
    next_name: usize,

    /// Usage errors found while building, reported by `build()`
    errors: Vec<DefinitionError>,
}

impl PatternBuilder {
    /// Create a new pattern builder
    pub fn new() -> Self {
        Self {
            atoms: Vec::new(),
            rules: HashMap::new(),
            pending_refs: Vec::new(),
            next_name: 0,
            errors: Vec::new(),
        }
    }

    /// Add a named rule
    pub fn rule(mut self, name: &str, parslet: impl Parslet) -> Self {
        self.rule_mut(name, parslet);
        self
    }

    /// Add a named rule (mutable version for helper functions)
    pub fn rule_mut(&mut self, name: &str, parslet: impl Parslet) -> &mut Self {
        let atom_idx = parslet.build(self);
        self.define_rule(name.to_string(), atom_idx);
        self
    }

    /// Bind a rule name to an already built atom
    pub fn define_rule(&mut self, name: String, atom_idx: usize) {
        if self.rules.contains_key(&name) {
            self.errors.push(DefinitionError::DuplicateRule { name });
            return;
        }
        self.rules.insert(name, atom_idx);
    }

    /// Add an atom directly
    pub fn add_atom(&mut self, atom: Atom) -> usize {
        let idx = self.atoms.len();
        self.atoms.push(atom);
        idx
    }

    /// Register a forward reference
    pub fn add_forward_ref(&mut self, atom_idx: usize, rule_name: String) {
        self.pending_refs.push((atom_idx, rule_name));
    }

    /// Record a usage error to be reported by `build()`
    pub fn add_error(&mut self, error: DefinitionError) {
        self.errors.push(error);
    }

    /// Draw a new unique name from this builder's generator
    pub fn fresh_name(&mut self, prefix: &str) -> String {
        let name = format!("{}#{}", prefix, self.next_name);
        self.next_name += 1;
        name
    }

    /// Get the current number of atoms
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Whether a rule of this name has been defined
    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Build the final pattern set
    ///
    /// # Errors
    /// Returns the first usage error recorded while building, a
    /// [`DefinitionError::UnresolvedRule`] for a dangling reference, or a
    /// [`DefinitionError::InvalidRegex`] for a regex that does not compile.
    pub fn build(self) -> Result<PatternSet, DefinitionError> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(error);
        }

        let mut atoms = self.atoms;
        for (idx, rule_name) in self.pending_refs {
            let target = self
                .rules
                .get(&rule_name)
                .copied()
                .ok_or(DefinitionError::UnresolvedRule { name: rule_name })?;
            if let Some(Atom::Entity { atom }) = atoms.get_mut(idx) {
                *atom = target;
            }
        }

        for atom in &atoms {
            if let Atom::Re { pattern } = atom {
                regex_cache::get_or_compile(pattern).map_err(|e| {
                    DefinitionError::InvalidRegex {
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    }
                })?;
            }
        }

        log_debug!(
            "Built pattern set: {} atoms, {} rules",
            atoms.len(),
            self.rules.len()
        );

        Ok(PatternSet {
            atoms,
            rules: self.rules,
        })
    }
}

impl Default for PatternBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Parser Combinators - Fundamental Building Blocks
// ============================================================================

/// Match literal text
#[derive(Debug, Clone)]
pub struct Lit(pub String);

impl Lit {
    /// The literal escaped for use inside a regex fragment
    pub fn escaped(&self) -> String {
        regex::escape(&self.0)
    }
}

impl Parslet for Lit {
    fn build(self, builder: &mut PatternBuilder) -> usize {
        builder.add_atom(Atom::Literal { text: self.0 })
    }
}

/// Match a regex fragment at the current position
#[derive(Debug, Clone)]
pub struct Re(pub String);

impl Parslet for Re {
    fn build(self, builder: &mut PatternBuilder) -> usize {
        builder.add_atom(Atom::Re { pattern: self.0 })
    }
}

/// A reference to a named rule (for recursive patterns)
#[derive(Debug, Clone)]
pub struct Ref(pub String);

impl Parslet for Ref {
    fn build(self, builder: &mut PatternBuilder) -> usize {
        let atom_idx = builder.add_atom(Atom::Entity { atom: 0 }); // Placeholder
        builder.add_forward_ref(atom_idx, self.0);
        atom_idx
    }
}

/// Sequence of two parslets (A then B)
#[derive(Debug, Clone)]
pub struct Sequence2<A, B> {
    first: A,
    second: B,
}

impl<A: Parslet, B: Parslet> Parslet for Sequence2<A, B> {
    fn build(self, builder: &mut PatternBuilder) -> usize {
        let first_idx = self.first.build(builder);
        let second_idx = self.second.build(builder);
        builder.add_atom(Atom::Sequence {
            atoms: vec![first_idx, second_idx],
        })
    }
}

/// Alternative of two parslets (tries A, then B)
#[derive(Debug, Clone)]
pub struct Alternative2<A, B> {
    first: A,
    second: B,
}

impl<A: Parslet, B: Parslet> Parslet for Alternative2<A, B> {
    fn build(self, builder: &mut PatternBuilder) -> usize {
        let first_idx = self.first.build(builder);
        let second_idx = self.second.build(builder);
        builder.add_atom(Atom::Alternative {
            atoms: vec![first_idx, second_idx],
        })
    }
}

/// Repetition (A.repeat(n, m) matches A n to m times)
#[derive(Debug, Clone)]
pub struct Repeat<P> {
    inner: P,
    min: usize,
    max: Option<usize>,
}

impl<P: Parslet> Parslet for Repeat<P> {
    fn build(self, builder: &mut PatternBuilder) -> usize {
        let inner_idx = self.inner.build(builder);
        builder.add_atom(Atom::Repetition {
            atom: inner_idx,
            min: self.min,
            max: self.max,
        })
    }
}

/// Optional clause
#[derive(Debug, Clone)]
pub struct Opt<P> {
    inner: P,
}

impl<P: Parslet> Parslet for Opt<P> {
    fn build(self, builder: &mut PatternBuilder) -> usize {
        let inner_idx = self.inner.build(builder);
        builder.add_atom(Atom::Optional { atom: inner_idx })
    }
}

/// Named capture
#[derive(Debug, Clone)]
pub struct Capture<P> {
    inner: P,
    name: String,
}

impl<P: Parslet> Parslet for Capture<P> {
    fn build(self, builder: &mut PatternBuilder) -> usize {
        let inner_idx = self.inner.build(builder);
        builder.add_atom(Atom::Capture {
            name: self.name,
            atom: inner_idx,
        })
    }
}

/// Lookahead (doesn't consume input)
#[derive(Debug, Clone)]
pub struct Lookahead<P> {
    inner: P,
    positive: bool,
}

impl<P: Parslet> Parslet for Lookahead<P> {
    fn build(self, builder: &mut PatternBuilder) -> usize {
        let inner_idx = self.inner.build(builder);
        builder.add_atom(Atom::Lookahead {
            atom: inner_idx,
            positive: self.positive,
        })
    }
}

/// Separated list: one or more elements with separators in between
#[derive(Debug, Clone)]
pub struct List<E, S> {
    element: E,
    separator: S,
}

impl<E: Parslet, S: Parslet> Parslet for List<E, S> {
    fn build(self, builder: &mut PatternBuilder) -> usize {
        let element = self.element.build(builder);
        let separator = self.separator.build(builder);
        builder.add_atom(Atom::SeparatedList { element, separator })
    }
}

/// Balanced delimiter group
#[derive(Debug, Clone, Copy)]
pub struct Balanced {
    open: char,
    close: char,
}

impl Parslet for Balanced {
    fn build(self, builder: &mut PatternBuilder) -> usize {
        if self.open == self.close {
            builder.add_error(DefinitionError::InvalidDelimiters {
                open: self.open,
                close: self.close,
            });
        }
        let name = builder.fresh_name("balanced");
        builder.add_atom(Atom::Balanced {
            name,
            open: self.open,
            close: self.close,
        })
    }
}

/// A self-referential rule under a fresh name
pub struct Recursive<F> {
    prefix: String,
    body: F,
}

impl<F, P> Parslet for Recursive<F>
where
    F: FnOnce(Ref) -> P,
    P: Parslet,
{
    fn build(self, builder: &mut PatternBuilder) -> usize {
        let name = builder.fresh_name(&self.prefix);
        let atom_idx = (self.body)(Ref(name.clone())).build(builder);
        builder.define_rule(name, atom_idx);
        atom_idx
    }
}

/// A type-erased parslet (for heterogeneous sequences/choices)
pub struct Dynamic(Box<dyn DynParslet>);

/// Trait for type-erased parslets
pub trait DynParslet {
    /// Build this parslet into a pattern set
    fn build_boxed(self: Box<Self>, builder: &mut PatternBuilder) -> usize;
}

impl<P: Parslet> DynParslet for P {
    fn build_boxed(self: Box<Self>, builder: &mut PatternBuilder) -> usize {
        (*self).build(builder)
    }
}

impl Parslet for Dynamic {
    fn build(self, builder: &mut PatternBuilder) -> usize {
        self.0.build_boxed(builder)
    }
}

/// A sequence of multiple parslets
pub struct Sequence<P>(pub Vec<P>);

impl<P: Parslet> Parslet for Sequence<P> {
    fn build(self, builder: &mut PatternBuilder) -> usize {
        let indices: Vec<usize> = self.0.into_iter().map(|p| p.build(builder)).collect();
        builder.add_atom(Atom::Sequence { atoms: indices })
    }
}

/// A choice of multiple parslets
pub struct Choice<P>(pub Vec<P>);

impl<P: Parslet> Parslet for Choice<P> {
    fn build(self, builder: &mut PatternBuilder) -> usize {
        let indices: Vec<usize> = self.0.into_iter().map(|p| p.build(builder)).collect();
        builder.add_atom(Atom::Alternative { atoms: indices })
    }
}

// ============================================================================
// Extension trait for Parslet
// ============================================================================

/// Extension trait for Parslet with builder methods
pub trait ParsletExt: Parslet + Sized {
    /// Capture the matched span under `name`
    fn capture(self, name: &str) -> Capture<Self> {
        Capture {
            inner: self,
            name: name.to_string(),
        }
    }

    /// Repeat this pattern
    fn repeat(self, min: usize, max: Option<usize>) -> Repeat<Self> {
        Repeat {
            inner: self,
            min,
            max,
        }
    }

    /// Match zero or more times
    fn many(self) -> Repeat<Self> {
        self.repeat(0, None)
    }

    /// Match one or more times
    fn many1(self) -> Repeat<Self> {
        self.repeat(1, None)
    }

    /// Match optionally
    fn optional(self) -> Opt<Self> {
        Opt { inner: self }
    }

    /// Positive lookahead (must match, doesn't consume)
    fn lookahead(self) -> Lookahead<Self> {
        Lookahead {
            inner: self,
            positive: true,
        }
    }

    /// Negative lookahead (must NOT match, doesn't consume)
    fn not_ahead(self) -> Lookahead<Self> {
        Lookahead {
            inner: self,
            positive: false,
        }
    }

    /// Sequence: A then B
    fn then<B: Parslet>(self, other: B) -> Sequence2<Self, B> {
        Sequence2 {
            first: self,
            second: other,
        }
    }

    /// Alternative: A or B
    fn or<B: Parslet>(self, other: B) -> Alternative2<Self, B> {
        Alternative2 {
            first: self,
            second: other,
        }
    }
}

impl<P: Parslet> ParsletExt for P {}

// ============================================================================
// Convenience Functions
// ============================================================================

/// Match literal text
pub fn lit(text: impl Into<String>) -> Lit {
    Lit(text.into())
}

/// Match a regex fragment
pub fn re(pattern: impl Into<String>) -> Re {
    Re(pattern.into())
}

/// Match a whole word: the literal followed by a word boundary
pub fn keyword(word: &str) -> Re {
    Re(format!(r"{}\b", regex::escape(word)))
}

/// Match any single character, including newlines
pub fn any() -> Re {
    Re("(?s:.)".to_string())
}

/// Optional whitespace (including newlines)
pub fn ws() -> Re {
    Re(r"\s*".to_string())
}

/// Required whitespace (including newlines)
pub fn ws1() -> Re {
    Re(r"\s+".to_string())
}

/// Reference another rule by name
pub fn ref_(name: &str) -> Ref {
    Ref(name.to_string())
}

/// Sequence of parslets
pub fn seq<P: Parslet>(parslets: Vec<P>) -> Sequence<P> {
    Sequence(parslets)
}

/// Ordered choice of parslets
pub fn choice<P: Parslet>(parslets: Vec<P>) -> Choice<P> {
    Choice(parslets)
}

/// Erase a parslet's type so it can sit in a `seq` or `choice` with others
pub fn dynamic<P: Parslet + 'static>(p: P) -> Dynamic {
    Dynamic(Box::new(p))
}

/// One or more `element`s separated by `separator`
pub fn list<E: Parslet, S: Parslet>(element: E, separator: S) -> List<E, S> {
    List { element, separator }
}

/// Balanced group delimited by `open` and `close`
pub fn balanced(open: char, close: char) -> Balanced {
    Balanced { open, close }
}

/// Define a self-referential pattern
///
/// `body` receives a reference to the pattern being defined, registered under
/// a fresh rule name drawn from the builder.
///
/// ```rust
/// use tagscan::engine::pattern_dsl::*;
///
/// // nested parenthesised words: (a (b c) d)
/// let group = recursive("group", |group| {
///     lit("(")
///         .then(dynamic(re(r"[^()]+")).or(group).many())
///         .then(lit(")"))
/// });
/// let patterns = PatternBuilder::new().rule("group", group).build().unwrap();
/// assert_eq!(patterns.match_rule("group", "(a (b c) d)").unwrap().unwrap().end, 11);
/// ```
pub fn recursive<F, P>(prefix: &str, body: F) -> Recursive<F>
where
    F: FnOnce(Ref) -> P,
    P: Parslet,
{
    Recursive {
        prefix: prefix.to_string(),
        body,
    }
}
