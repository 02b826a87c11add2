//! Parse-forest equations.
//!
//! The forest of a node is the set of trees its empty-string matches
//! produce. Forests are set-valued least fixed points: bottom is the empty
//! set and a cycle contributes whatever trees it has accumulated so far.
//! An infinitely ambiguous grammar has an infinite forest, which is why the
//! engine solves these with a pass limit that grows with the graph.

use std::sync::Arc;

use brzo_fixpoint::{Equations, Solver};
use brzo_grammar::{Forest, Grammar, Node, NodeId, Token, Tree};
use brzo_memo::WeakMemo;

pub struct ForestEquations<'a, T> {
    pub grammar: &'a Grammar<T>,
    pub known: &'a WeakMemo<NodeId, Arc<Forest<T>>>,
}

impl<T: Token> Equations for ForestEquations<'_, T> {
    type Key = NodeId;
    type Value = Forest<T>;

    fn bottom(&self) -> Forest<T> {
        Forest::new()
    }

    fn known(&self, key: NodeId) -> Option<Forest<T>> {
        self.known.peek(&key).map(|forest| forest.as_ref().clone())
    }

    fn evaluate(&self, key: NodeId, solver: &mut Solver<'_, Self>) -> Forest<T> {
        match &self.grammar[key] {
            Node::Empty | Node::Token(_) | Node::Delegate(None) => Forest::new(),
            Node::Eps(trees) => trees.as_ref().clone(),
            Node::Union(left, right) => {
                let mut trees = solver.value(*left);
                trees.extend(solver.value(*right));
                trees
            }
            Node::Sequence(first, second) => {
                let firsts = solver.value(*first);
                let seconds = solver.value(*second);
                cross(&firsts, &seconds)
            }
            // Consumed iterations are already folded in by `Cons` reducers
            // above the repetition, so only the zero-iteration list is left.
            Node::Repetition(inner) => {
                solver.value(*inner);
                Forest::from([Tree::List(Vec::new())])
            }
            Node::Reduction(inner, reducer) => reducer.apply_all(&solver.value(*inner)),
            Node::Delegate(Some(target)) => solver.value(*target),
        }
    }
}

/// Pairs every tree of `firsts` with every tree of `seconds`.
pub fn cross<T: Token>(firsts: &Forest<T>, seconds: &Forest<T>) -> Forest<T> {
    let mut out = Forest::new();
    for first in firsts {
        for second in seconds {
            out.insert(Tree::pair(first.clone(), second.clone()));
        }
    }
    out
}
