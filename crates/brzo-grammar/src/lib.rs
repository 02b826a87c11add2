//! The language algebra of the brzo derivative parser.
//!
//! A grammar is a graph of [`Node`]s stored in a [`Grammar`] arena and
//! addressed by [`NodeId`] handles. Recursive rules are closed by pointing a
//! delegate node at the rule body, so the graph may be cyclic; every walk in
//! this crate tolerates revisiting a handle.
//!
//! ```
//! use brzo_grammar::Grammar;
//!
//! // X = 'a' X | eps
//! let mut g: Grammar<char> = Grammar::new();
//! let a = g.literal('a');
//! let x = g.delegate();
//! let ax = g.then(a, x);
//! let eps = g.eps();
//! let body = g.or(ax, eps);
//! g.set_target(x, body).unwrap();
//! assert_eq!(g.render(x), "#3:(or (seq 'a' #3) eps)");
//! ```

use std::fmt::Debug;
use std::hash::Hash;

pub mod equality;
pub mod error;
pub mod grammar;
pub mod node;
pub mod render;
pub mod tree;

pub use error::{GrammarError, GrammarResult};
pub use grammar::{Grammar, Placeholder};
pub use node::{Matcher, Node, NodeId, Origin};
pub use tree::{display_forest, singleton, Forest, MapFn, Reducer, Tree};

/// The bound every token type satisfies.
pub trait Token: Clone + Ord + Hash + Debug {}

impl<T: Clone + Ord + Hash + Debug> Token for T {}
