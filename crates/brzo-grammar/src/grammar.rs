//! The node arena and the grammar construction API.

use std::ops::Index;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use slab::Slab;

use crate::error::{GrammarError, GrammarResult};
use crate::node::{Matcher, Node, NodeId, Origin};
use crate::tree::{singleton, Forest, Reducer, Tree};
use crate::Token;

struct Slot<T> {
    node: Node<T>,
    origin: Origin,
    generation: u32,
}

/// A delegate allocated to stand in for a result that is still being built.
///
/// It is consumed by [`Grammar::fill`], so each placeholder is patched once.
#[derive(Debug)]
#[must_use = "a placeholder must be filled"]
pub struct Placeholder(NodeId);

impl Placeholder {
    pub fn id(&self) -> NodeId {
        self.0
    }
}

/// Arena owning every node of one grammar and of the derivatives taken from it.
///
/// Nodes are addressed by [`NodeId`] handles, so the graph may be cyclic
/// without any ownership cycle. Nodes built through the construction API are
/// kept for the life of the grammar; nodes produced while parsing are freed
/// by [`Grammar::collect`] once nothing live refers to them.
pub struct Grammar<T> {
    slots: Slab<Slot<T>>,
    /// Bumped by every collection; stamped into the handles allocated after it.
    epoch: u32,
    empty: NodeId,
    eps: NodeId,
}

impl<T: Token> Default for Grammar<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Token> Grammar<T> {
    /// Creates an arena holding only the flyweight `empty` and `eps` nodes.
    pub fn new() -> Self {
        let placeholder = NodeId { index: 0, generation: 0 };
        let mut grammar = Grammar { slots: Slab::new(), epoch: 0, empty: placeholder, eps: placeholder };
        grammar.empty = grammar.alloc(Node::Empty, Origin::Grammar);
        grammar.eps = grammar.alloc(Node::Eps(Arc::new(singleton(Tree::Nil))), Origin::Grammar);
        grammar
    }

    // --- Construction API ---

    /// The empty language. Always the same node.
    pub fn empty(&self) -> NodeId {
        self.empty
    }

    /// The language of the empty string. Always the same node.
    pub fn eps(&self) -> NodeId {
        self.eps
    }

    /// Accepts exactly the token `value`.
    pub fn literal(&mut self, value: T) -> NodeId {
        self.alloc(Node::Token(Matcher::Literal(value)), Origin::Grammar)
    }

    /// Accepts any single token `predicate` holds for.
    pub fn token_matching(&mut self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> NodeId {
        self.alloc(Node::Token(Matcher::Predicate(Arc::new(predicate))), Origin::Grammar)
    }

    pub fn union(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.alloc(Node::Union(left, right), Origin::Grammar)
    }

    /// Alias of [`Grammar::union`].
    pub fn or(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.union(left, right)
    }

    /// `first` followed by `second`.
    pub fn then(&mut self, first: NodeId, second: NodeId) -> NodeId {
        self.alloc(Node::Sequence(first, second), Origin::Grammar)
    }

    /// Zero or more repetitions of `inner`.
    pub fn star(&mut self, inner: NodeId) -> NodeId {
        self.alloc(Node::Repetition(inner), Origin::Grammar)
    }

    /// Same language as `inner`, with `f` applied to every tree it produces.
    pub fn reduce(&mut self, inner: NodeId, f: impl Fn(Tree<T>) -> Tree<T> + Send + Sync + 'static) -> NodeId {
        self.alloc(Node::Reduction(inner, Reducer::map(f)), Origin::Grammar)
    }

    /// Same language as `inner`, with trees passed through `reducer`.
    pub fn reduce_with(&mut self, inner: NodeId, reducer: Reducer<T>) -> NodeId {
        self.alloc(Node::Reduction(inner, reducer), Origin::Grammar)
    }

    /// A placeholder for a rule that is defined later (or refers to itself).
    pub fn delegate(&mut self) -> NodeId {
        self.alloc(Node::Delegate(None), Origin::Grammar)
    }

    /// Points `delegate` at `target`. Allowed once per delegate.
    pub fn set_target(&mut self, delegate: NodeId, target: NodeId) -> GrammarResult<()> {
        if !self.contains(target) {
            return Err(GrammarError::StaleHandle(target));
        }
        let slot = self.slot_mut(delegate).ok_or(GrammarError::StaleHandle(delegate))?;
        match slot.node {
            Node::Delegate(None) => {
                slot.node = Node::Delegate(Some(target));
                Ok(())
            }
            Node::Delegate(Some(current)) => Err(GrammarError::DelegateAlreadySet { delegate, current }),
            _ => Err(GrammarError::NotADelegate(delegate)),
        }
    }

    // --- Allocation used by derivation and compaction ---

    /// Allocates `node` in the arena.
    pub fn alloc(&mut self, node: Node<T>, origin: Origin) -> NodeId {
        let generation = self.epoch;
        let index = self.slots.insert(Slot { node, origin, generation });
        NodeId { index: index as u32, generation }
    }

    /// An Eps node carrying `forest`.
    pub fn eps_with(&mut self, forest: Forest<T>, origin: Origin) -> NodeId {
        self.alloc(Node::Eps(Arc::new(forest)), origin)
    }

    /// Allocates an empty derived delegate.
    pub fn placeholder(&mut self) -> Placeholder {
        Placeholder(self.alloc(Node::Delegate(None), Origin::Derived))
    }

    /// Points `placeholder` at `target` and returns the placeholder's handle.
    pub fn fill(&mut self, placeholder: Placeholder, target: NodeId) -> NodeId {
        let id = placeholder.0;
        if let Some(slot) = self.slot_mut(id) {
            slot.node = Node::Delegate(Some(target));
        }
        id
    }

    // --- Lookup ---

    pub fn get(&self, id: NodeId) -> Option<&Node<T>> {
        self.slot(id).map(|slot| &slot.node)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slot(id).is_some()
    }

    pub fn origin(&self, id: NodeId) -> Option<Origin> {
        self.slot(id).map(|slot| slot.origin)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Follows delegate targets until a non-delegate node, an unset delegate,
    /// or a cycle made only of delegates.
    pub fn resolve(&self, id: NodeId) -> NodeId {
        let mut current = id;
        let mut seen: Vec<NodeId> = Vec::new();
        while let Some(Node::Delegate(Some(target))) = self.get(current) {
            if seen.contains(target) {
                break;
            }
            seen.push(current);
            current = *target;
        }
        current
    }

    fn slot(&self, id: NodeId) -> Option<&Slot<T>> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
    }

    fn slot_mut(&mut self, id: NodeId) -> Option<&mut Slot<T>> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
    }

    // --- Graph walks ---

    /// Every live node reachable from `roots`, roots included.
    pub fn reachable(&self, roots: impl IntoIterator<Item = NodeId>) -> FxHashSet<NodeId> {
        let mut seen = FxHashSet::default();
        let mut stack: Vec<NodeId> = roots.into_iter().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            if seen.insert(id) {
                stack.extend(node.children());
            }
        }
        seen
    }

    /// Checks that every node reachable from `root` is live and that every
    /// reachable delegate has been given a target.
    pub fn validate(&self, root: NodeId) -> GrammarResult<()> {
        let mut seen = FxHashSet::default();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let node = self.get(id).ok_or(GrammarError::StaleHandle(id))?;
            if let Node::Delegate(None) = node {
                return Err(GrammarError::UnresolvedDelegate(id));
            }
            stack.extend(node.children());
        }
        Ok(())
    }

    /// Frees every derived node that is reachable neither from `roots` nor
    /// from a node built through the construction API. Returns the number of
    /// nodes freed.
    ///
    /// Handles to freed nodes become stale; handles allocated afterwards
    /// carry a new generation.
    pub fn collect(&mut self, roots: impl IntoIterator<Item = NodeId>) -> usize {
        let pinned = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.origin == Origin::Grammar)
            .map(|(index, slot)| NodeId { index: index as u32, generation: slot.generation });
        let live = self.reachable(roots.into_iter().chain(pinned.collect::<Vec<_>>()));

        let dead: Vec<usize> = self
            .slots
            .iter()
            .filter(|(index, slot)| {
                let id = NodeId { index: *index as u32, generation: slot.generation };
                slot.origin == Origin::Derived && !live.contains(&id)
            })
            .map(|(index, _)| index)
            .collect();
        for index in &dead {
            self.slots.remove(*index);
        }
        self.epoch = self.epoch.wrapping_add(1);

        log::debug!("collected {} derived nodes, {} live", dead.len(), self.slots.len());
        dead.len()
    }
}

impl<T: Token> Index<NodeId> for Grammar<T> {
    type Output = Node<T>;

    /// Panics if `id` is stale, like indexing a slab with a vacant key.
    fn index(&self, id: NodeId) -> &Node<T> {
        match self.get(id) {
            Some(node) => node,
            None => panic!("stale node handle {} (generation {})", id, id.generation),
        }
    }
}
