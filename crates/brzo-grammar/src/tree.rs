//! Parse trees, parse forests and the reducers that rewrite them.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use brzo_memo::Anchored;

use crate::node::NodeId;

/// A parse tree over tokens of type `T`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tree<T> {
    /// The tree of the empty match.
    Nil,
    /// A single matched token.
    Leaf(T),
    /// The trees of two consecutive matches.
    Pair(Box<Tree<T>>, Box<Tree<T>>),
    /// The trees of the iterations of a repetition.
    List(Vec<Tree<T>>),
}

/// The set of trees a nullable node produces.
pub type Forest<T> = BTreeSet<Tree<T>>;

impl<T> Tree<T> {
    pub fn leaf(token: T) -> Self {
        Tree::Leaf(token)
    }

    pub fn pair(left: Tree<T>, right: Tree<T>) -> Self {
        Tree::Pair(Box::new(left), Box::new(right))
    }

    /// The matched tokens, in input order.
    pub fn leaves(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'t>(&'t self, out: &mut Vec<&'t T>) {
        match self {
            Tree::Nil => {}
            Tree::Leaf(token) => out.push(token),
            Tree::Pair(left, right) => {
                left.collect_leaves(out);
                right.collect_leaves(out);
            }
            Tree::List(items) => {
                for item in items {
                    item.collect_leaves(out);
                }
            }
        }
    }
}

impl Tree<char> {
    /// The matched characters concatenated.
    pub fn text(&self) -> String {
        self.leaves().into_iter().collect()
    }
}

impl<T: fmt::Debug> fmt::Display for Tree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tree::Nil => write!(f, "()"),
            Tree::Leaf(token) => write!(f, "{:?}", token),
            Tree::Pair(left, right) => write!(f, "({} . {})", left, right),
            Tree::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// A forest holding exactly `tree`.
pub fn singleton<T: Ord>(tree: Tree<T>) -> Forest<T> {
    BTreeSet::from([tree])
}

/// Formats a forest as `{t1, t2, ...}`.
pub fn display_forest<T: fmt::Debug>(forest: &Forest<T>) -> String {
    let trees: Vec<String> = forest.iter().map(|tree| tree.to_string()).collect();
    format!("{{{}}}", trees.join(", "))
}

impl<T> Anchored<NodeId> for Forest<T> {
    fn anchors(&self, _visit: &mut dyn FnMut(NodeId)) {}
}

/// A user-supplied tree transformation.
pub type MapFn<T> = Arc<dyn Fn(Tree<T>) -> Tree<T> + Send + Sync>;

/// Rewrites the trees produced by a Reduction node.
///
/// Reducers compare by construction, never by behaviour: two `Map` reducers
/// are equal only if they share the same closure allocation, while the
/// built-in reducers compare structurally.
#[derive(Clone)]
pub enum Reducer<T> {
    /// Apply a user function to each tree.
    Map(MapFn<T>),
    /// Pair every tree of the forest on the left of each tree.
    Prepend(Arc<Forest<T>>),
    /// Pair every tree of the forest on the right of each tree.
    Append(Arc<Forest<T>>),
    /// Fold `(head . [rest..])` into `[head rest..]`.
    Cons,
    /// `outer` after `inner`.
    Compose(Arc<Reducer<T>>, Arc<Reducer<T>>),
}

impl<T: Clone + Ord> Reducer<T> {
    pub fn map(f: impl Fn(Tree<T>) -> Tree<T> + Send + Sync + 'static) -> Self {
        Reducer::Map(Arc::new(f))
    }

    pub fn compose(outer: Reducer<T>, inner: Reducer<T>) -> Self {
        Reducer::Compose(Arc::new(outer), Arc::new(inner))
    }

    /// The trees `tree` is rewritten into.
    pub fn apply(&self, tree: &Tree<T>) -> Forest<T> {
        match self {
            Reducer::Map(f) => singleton(f(tree.clone())),
            Reducer::Prepend(prefix) => prefix
                .iter()
                .map(|left| Tree::pair(left.clone(), tree.clone()))
                .collect(),
            Reducer::Append(suffix) => suffix
                .iter()
                .map(|right| Tree::pair(tree.clone(), right.clone()))
                .collect(),
            Reducer::Cons => singleton(cons(tree)),
            Reducer::Compose(outer, inner) => outer.apply_all(&inner.apply(tree)),
        }
    }

    /// Rewrites every tree of `forest`.
    pub fn apply_all(&self, forest: &Forest<T>) -> Forest<T> {
        forest.iter().flat_map(|tree| self.apply(tree)).collect()
    }
}

fn cons<T: Clone>(tree: &Tree<T>) -> Tree<T> {
    match tree {
        Tree::Pair(head, rest) => match rest.as_ref() {
            Tree::List(items) => {
                let mut list = Vec::with_capacity(items.len() + 1);
                list.push(head.as_ref().clone());
                list.extend(items.iter().cloned());
                Tree::List(list)
            }
            _ => tree.clone(),
        },
        _ => tree.clone(),
    }
}

impl<T: PartialEq> PartialEq for Reducer<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Reducer::Map(a), Reducer::Map(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            (Reducer::Prepend(a), Reducer::Prepend(b)) => a == b,
            (Reducer::Append(a), Reducer::Append(b)) => a == b,
            (Reducer::Cons, Reducer::Cons) => true,
            (Reducer::Compose(o1, i1), Reducer::Compose(o2, i2)) => o1 == o2 && i1 == i2,
            _ => false,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Reducer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reducer::Map(func) => write!(f, "map@{:p}", Arc::as_ptr(func) as *const ()),
            Reducer::Prepend(forest) => write!(f, "prepend {}", display_forest(forest)),
            Reducer::Append(forest) => write!(f, "append {}", display_forest(forest)),
            Reducer::Cons => write!(f, "cons"),
            Reducer::Compose(outer, inner) => write!(f, "compose({:?}, {:?})", outer, inner),
        }
    }
}
