//! Pattern types
//!
//! This module defines the in-memory representation of built patterns. A
//! [`PatternSet`] is an arena of [`Atom`]s that refer to each other by index,
//! plus a table of named rules. Rule references ([`Atom::Entity`]) are what
//! make self-referential patterns possible.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

/// Atom types that make up a pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Atom {
    /// Match literal text verbatim
    Literal {
        /// The text to match
        text: String,
    },

    /// Match a regex fragment anchored at the current position
    Re {
        /// The regex source
        pattern: String,
    },

    /// Match multiple atoms in sequence
    Sequence {
        /// Indices into atoms array
        atoms: Vec<usize>,
    },

    /// Try alternatives in order, first success wins
    Alternative {
        /// Indices into atoms array
        atoms: Vec<usize>,
    },

    /// Repeat an atom (greedy, with min/max)
    Repetition {
        /// Index into atoms array
        atom: usize,
        /// Minimum number of repetitions
        min: usize,
        /// Maximum number of repetitions (None = unlimited)
        max: Option<usize>,
    },

    /// Match an atom or nothing
    Optional {
        /// Index into atoms array
        atom: usize,
    },

    /// One or more elements separated by a separator
    ///
    /// Whitespace is allowed on either side of each separator. A trailing
    /// separator is not part of the list.
    SeparatedList {
        /// Element atom
        element: usize,
        /// Separator atom
        separator: usize,
    },

    /// A delimiter pair with balanced nesting
    Balanced {
        /// Unique name drawn from the builder's generator
        name: String,
        /// Opening delimiter
        open: char,
        /// Closing delimiter
        close: char,
    },

    /// Record the span matched by an atom under a name
    Capture {
        /// Capture name
        name: String,
        /// Index into atoms array
        atom: usize,
    },

    /// Reference to a rule's atom (resolved when the set is built)
    Entity {
        /// Index into atoms array
        atom: usize,
    },

    /// Lookahead (doesn't consume input)
    Lookahead {
        /// Index into atoms array
        atom: usize,
        /// Whether this is a positive lookahead
        positive: bool,
    },
}

impl Atom {
    /// Short name of the atom's variant
    pub fn type_name(&self) -> &'static str {
        match self {
            Atom::Literal { .. } => "literal",
            Atom::Re { .. } => "re",
            Atom::Sequence { .. } => "sequence",
            Atom::Alternative { .. } => "alternative",
            Atom::Repetition { .. } => "repetition",
            Atom::Optional { .. } => "optional",
            Atom::SeparatedList { .. } => "list",
            Atom::Balanced { .. } => "balanced",
            Atom::Capture { .. } => "capture",
            Atom::Entity { .. } => "entity",
            Atom::Lookahead { .. } => "lookahead",
        }
    }

    /// Indices of the atoms this atom refers to
    pub fn children(&self) -> Vec<usize> {
        match self {
            Atom::Literal { .. } | Atom::Re { .. } | Atom::Balanced { .. } => Vec::new(),
            Atom::Sequence { atoms } | Atom::Alternative { atoms } => atoms.clone(),
            Atom::SeparatedList { element, separator } => vec![*element, *separator],
            Atom::Repetition { atom, .. }
            | Atom::Optional { atom }
            | Atom::Capture { atom, .. }
            | Atom::Entity { atom }
            | Atom::Lookahead { atom, .. } => vec![*atom],
        }
    }
}

/// A complete, validated set of patterns
///
/// Produced by [`PatternBuilder::build`](super::pattern_dsl::PatternBuilder::build).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSet {
    pub(crate) atoms: Vec<Atom>,
    pub(crate) rules: HashMap<String, usize>,
}

impl PatternSet {
    /// Create an empty pattern set
    pub fn new() -> Self {
        Self {
            atoms: Vec::new(),
            rules: HashMap::new(),
        }
    }

    /// Get an atom by index
    #[inline]
    pub fn atom(&self, idx: usize) -> Option<&Atom> {
        self.atoms.get(idx)
    }

    /// Get total atom count
    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Look up a named rule
    #[inline]
    pub fn rule(&self, name: &str) -> Option<usize> {
        self.rules.get(name).copied()
    }

    /// Whether a rule with this name exists
    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// All rule names, sorted
    pub fn rule_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Names of all captures reachable from `root`, following rule references
    pub fn capture_names(&self, root: usize) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        let mut names = Vec::new();

        while let Some(idx) = stack.pop() {
            if !seen.insert(idx) {
                continue;
            }
            let Some(atom) = self.atoms.get(idx) else {
                continue;
            };
            if let Atom::Capture { name, .. } = atom {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
            stack.extend(atom.children());
        }

        names
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::new()
    }
}
