//! Grammar node variants and the handles that refer to them.

use std::fmt;
use std::sync::Arc;

use brzo_memo::Anchored;

use crate::tree::{display_forest, Forest, Reducer};

/// A generational handle to a node of a [`Grammar`](crate::Grammar).
///
/// The generation changes whenever the arena slot is recycled, so a handle
/// to a collected node is never mistaken for the node that replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

impl Anchored<NodeId> for NodeId {
    fn anchors(&self, visit: &mut dyn FnMut(NodeId)) {
        visit(*self)
    }
}

/// A token predicate.
#[derive(Clone)]
pub enum Matcher<T> {
    /// Matches tokens equal to the value.
    Literal(T),
    /// Matches tokens the predicate accepts.
    Predicate(Arc<dyn Fn(&T) -> bool + Send + Sync>),
}

impl<T: PartialEq> Matcher<T> {
    pub fn matches(&self, token: &T) -> bool {
        match self {
            Matcher::Literal(expected) => expected == token,
            Matcher::Predicate(predicate) => predicate(token),
        }
    }
}

impl<T: PartialEq> PartialEq for Matcher<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Matcher::Literal(a), Matcher::Literal(b)) => a == b,
            (Matcher::Predicate(a), Matcher::Predicate(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Matcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Literal(value) => write!(f, "{:?}", value),
            Matcher::Predicate(predicate) => write!(f, "pred@{:p}", Arc::as_ptr(predicate) as *const ()),
        }
    }
}

/// A node of the language algebra.
///
/// Every variant except `Delegate` is immutable once allocated. A delegate
/// starts out empty and is pointed at its target exactly once, which is how
/// recursive rules close their cycles.
#[derive(Clone)]
pub enum Node<T> {
    /// The empty language.
    Empty,
    /// The language of the empty string, carrying the trees matched so far.
    Eps(Arc<Forest<T>>),
    /// One token accepted by the matcher.
    Token(Matcher<T>),
    Union(NodeId, NodeId),
    Sequence(NodeId, NodeId),
    /// Kleene star.
    Repetition(NodeId),
    /// Same language as the inner node, with every tree passed through the reducer.
    Reduction(NodeId, Reducer<T>),
    Delegate(Option<NodeId>),
}

impl<T> Node<T> {
    /// The handles this node points at.
    pub fn children(&self) -> impl Iterator<Item = NodeId> {
        let (first, second) = match self {
            Node::Empty | Node::Eps(_) | Node::Token(_) => (None, None),
            Node::Union(left, right) => (Some(*left), Some(*right)),
            Node::Sequence(first, second) => (Some(*first), Some(*second)),
            Node::Repetition(inner) | Node::Reduction(inner, _) => (Some(*inner), None),
            Node::Delegate(target) => (*target, None),
        };
        first.into_iter().chain(second)
    }

    /// Short variant name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Empty => "empty",
            Node::Eps(_) => "eps",
            Node::Token(_) => "token",
            Node::Union(..) => "union",
            Node::Sequence(..) => "sequence",
            Node::Repetition(_) => "repetition",
            Node::Reduction(..) => "reduction",
            Node::Delegate(_) => "delegate",
        }
    }

    pub fn is_delegate(&self) -> bool {
        matches!(self, Node::Delegate(_))
    }
}

impl<T: fmt::Debug> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Empty => write!(f, "Empty"),
            Node::Eps(forest) => write!(f, "Eps({})", display_forest(forest)),
            Node::Token(matcher) => write!(f, "Token({:?})", matcher),
            Node::Union(l, r) => write!(f, "Union({}, {})", l, r),
            Node::Sequence(a, b) => write!(f, "Sequence({}, {})", a, b),
            Node::Repetition(inner) => write!(f, "Repetition({})", inner),
            Node::Reduction(inner, reducer) => write!(f, "Reduction({}, {:?})", inner, reducer),
            Node::Delegate(Some(target)) => write!(f, "Delegate({})", target),
            Node::Delegate(None) => write!(f, "Delegate(?)"),
        }
    }
}

/// Who allocated a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Built through the grammar construction API; never collected.
    Grammar,
    /// Produced by derivation or compaction; collected once unreachable.
    Derived,
}
