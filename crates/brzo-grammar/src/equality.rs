//! Structural equality over cyclic grammar graphs.
//!
//! Two nodes are equal when they have the same variant and equal children,
//! with three refinements:
//!
//! - Union is commutative;
//! - a delegate is compared as its target;
//! - Eps nodes are equal whatever trees they carry;
//! - nested reductions compare as one chain of reducers, so
//!   `Reduction(Reduction(x, g), f)` equals `Reduction(x, compose(f, g))`.
//!
//! Comparison is coinductive: a pair of nodes under comparison is assumed
//! equal while its children are compared, so revisiting the pair through a
//! cycle succeeds instead of recursing forever. An assumption is withdrawn
//! when the comparison that introduced it fails.

use rustc_hash::FxHashSet;

use crate::grammar::Grammar;
use crate::node::{Node, NodeId};
use crate::tree::Reducer;
use crate::Token;

struct Equality<'g, T> {
    grammar: &'g Grammar<T>,
    assumed: FxHashSet<(NodeId, NodeId)>,
}

impl<'g, T: Token> Equality<'g, T> {
    fn eq(&mut self, a: NodeId, b: NodeId) -> bool {
        let a = self.grammar.resolve(a);
        let b = self.grammar.resolve(b);
        if a == b || self.assumed.contains(&(a, b)) || self.assumed.contains(&(b, a)) {
            return true;
        }

        let (Some(left), Some(right)) = (self.grammar.get(a), self.grammar.get(b)) else {
            return false;
        };

        match (left, right) {
            (Node::Empty, Node::Empty) => true,
            (Node::Eps(_), Node::Eps(_)) => true,
            (Node::Token(m1), Node::Token(m2)) => m1 == m2,
            (Node::Union(..), Node::Union(..))
            | (Node::Sequence(..), Node::Sequence(..))
            | (Node::Repetition(_), Node::Repetition(_)) => {
                self.assumed.insert((a, b));
                let equal = self.children_eq(left, right);
                if !equal {
                    self.assumed.remove(&(a, b));
                }
                equal
            }
            (Node::Reduction(..), Node::Reduction(..)) => {
                self.assumed.insert((a, b));
                let (reducers_a, body_a) = self.reduction_chain(a);
                let (reducers_b, body_b) = self.reduction_chain(b);
                let equal = reducers_a == reducers_b && self.eq(body_a, body_b);
                if !equal {
                    self.assumed.remove(&(a, b));
                }
                equal
            }
            // Unset delegates only equal themselves, which was checked above.
            _ => false,
        }
    }

    fn children_eq(&mut self, left: &Node<T>, right: &Node<T>) -> bool {
        match (left, right) {
            (Node::Union(l1, r1), Node::Union(l2, r2)) => {
                (self.eq(*l1, *l2) && self.eq(*r1, *r2)) || (self.eq(*l1, *r2) && self.eq(*r1, *l2))
            }
            (Node::Sequence(f1, s1), Node::Sequence(f2, s2)) => self.eq(*f1, *f2) && self.eq(*s1, *s2),
            (Node::Repetition(p1), Node::Repetition(p2)) => self.eq(*p1, *p2),
            _ => false,
        }
    }

    /// The reducers applied on the way down from `id`, outermost first, and
    /// the node below the last reduction. Stops early on a reduction cycle.
    fn reduction_chain(&self, id: NodeId) -> (Vec<&'g Reducer<T>>, NodeId) {
        let grammar = self.grammar;
        let mut reducers = Vec::new();
        let mut seen = FxHashSet::default();
        let mut current = grammar.resolve(id);
        while let Some(Node::Reduction(inner, reducer)) = grammar.get(current) {
            if !seen.insert(current) {
                break;
            }
            flatten(reducer, &mut reducers);
            current = grammar.resolve(*inner);
        }
        (reducers, current)
    }
}

fn flatten<'r, T>(reducer: &'r Reducer<T>, out: &mut Vec<&'r Reducer<T>>) {
    match reducer {
        Reducer::Compose(outer, inner) => {
            flatten(outer, out);
            flatten(inner, out);
        }
        single => out.push(single),
    }
}

impl<T: Token> Grammar<T> {
    /// Structural equality of the languages rooted at `a` and `b`.
    ///
    /// Terminates on cyclic graphs, including graphs whose cycles run only
    /// through delegates.
    pub fn equal(&self, a: NodeId, b: NodeId) -> bool {
        Equality { grammar: self, assumed: FxHashSet::default() }.eq(a, b)
    }
}
