//! Boolean properties of grammar nodes, as least fixed points.
//!
//! Each property is a system of [`Equations`] over the node graph. Values
//! already established for a node (kept in the engine's memo tables) are fed
//! back to the solver as known constants.
//!
//! Every equation evaluates all of its children, even when the result is
//! already decided, so a converged solution carries a value for every node
//! reachable from the root.

use brzo_fixpoint::{least_fixed_point, Equations, Solver};
use brzo_grammar::{Grammar, Node, NodeId, Token};
use brzo_memo::WeakMemo;

/// "Does this node accept the empty string?"
pub struct Nullability<'a, T> {
    pub grammar: &'a Grammar<T>,
    pub known: &'a WeakMemo<NodeId, bool>,
}

impl<T: Token> Equations for Nullability<'_, T> {
    type Key = NodeId;
    type Value = bool;

    fn bottom(&self) -> bool {
        false
    }

    fn known(&self, key: NodeId) -> Option<bool> {
        self.known.peek(&key).copied()
    }

    fn evaluate(&self, key: NodeId, solver: &mut Solver<'_, Self>) -> bool {
        match &self.grammar[key] {
            Node::Empty | Node::Token(_) | Node::Delegate(None) => false,
            Node::Eps(_) | Node::Repetition(_) => true,
            Node::Union(left, right) => {
                let left = solver.value(*left);
                let right = solver.value(*right);
                left || right
            }
            Node::Sequence(first, second) => {
                let first = solver.value(*first);
                let second = solver.value(*second);
                first && second
            }
            Node::Reduction(inner, _) | Node::Delegate(Some(inner)) => solver.value(*inner),
        }
    }
}

/// "Does this node accept at least one string?"
///
/// A node is empty exactly when it is not inhabited. Solving inhabitation
/// from `false` gives the least fixed point; solving emptiness from `false`
/// would wrongly call `X = 'a' X` non-empty.
pub struct Inhabitation<'a, T> {
    pub grammar: &'a Grammar<T>,
    pub known: &'a WeakMemo<NodeId, bool>,
}

impl<T: Token> Equations for Inhabitation<'_, T> {
    type Key = NodeId;
    type Value = bool;

    fn bottom(&self) -> bool {
        false
    }

    fn known(&self, key: NodeId) -> Option<bool> {
        self.known.peek(&key).copied()
    }

    fn evaluate(&self, key: NodeId, solver: &mut Solver<'_, Self>) -> bool {
        match &self.grammar[key] {
            Node::Empty | Node::Delegate(None) => false,
            Node::Eps(_) | Node::Token(_) => true,
            // Zero iterations are always available.
            Node::Repetition(inner) => {
                solver.value(*inner);
                true
            }
            Node::Union(left, right) => {
                let left = solver.value(*left);
                let right = solver.value(*right);
                left || right
            }
            Node::Sequence(first, second) => {
                let first = solver.value(*first);
                let second = solver.value(*second);
                first && second
            }
            Node::Reduction(inner, _) | Node::Delegate(Some(inner)) => solver.value(*inner),
        }
    }
}

/// "Does this node accept some non-empty string?"
///
/// A nullable node that cannot consume a token accepts only the empty
/// string; compaction folds such nodes into a single Eps leaf.
pub struct Consumption<'a, T> {
    pub grammar: &'a Grammar<T>,
    pub known: &'a WeakMemo<NodeId, bool>,
    /// Established inhabitation values, needed for sequences.
    pub inhabited: &'a WeakMemo<NodeId, bool>,
}

impl<T: Token> Consumption<'_, T> {
    fn inhabited(&self, id: NodeId) -> bool {
        match self.inhabited.peek(&id) {
            Some(value) => *value,
            None => least_fixed_point(&Inhabitation { grammar: self.grammar, known: self.inhabited }, id),
        }
    }
}

impl<T: Token> Equations for Consumption<'_, T> {
    type Key = NodeId;
    type Value = bool;

    fn bottom(&self) -> bool {
        false
    }

    fn known(&self, key: NodeId) -> Option<bool> {
        self.known.peek(&key).copied()
    }

    fn evaluate(&self, key: NodeId, solver: &mut Solver<'_, Self>) -> bool {
        match &self.grammar[key] {
            Node::Empty | Node::Eps(_) | Node::Delegate(None) => false,
            Node::Token(_) => true,
            Node::Union(left, right) => {
                let left = solver.value(*left);
                let right = solver.value(*right);
                left || right
            }
            Node::Sequence(first, second) => {
                let first_consumes = solver.value(*first);
                let second_consumes = solver.value(*second);
                (first_consumes && self.inhabited(*second)) || (second_consumes && self.inhabited(*first))
            }
            Node::Repetition(inner) | Node::Reduction(inner, _) | Node::Delegate(Some(inner)) => {
                solver.value(*inner)
            }
        }
    }
}
