//! The engine's memo tables.

use std::sync::Arc;

use brzo_grammar::{Forest, Grammar, NodeId, Token};
use brzo_memo::{Anchored, MemoStats, WeakMemo};

/// Key of a memoized derivative: the node and the token it was taken by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeriveKey<T> {
    pub node: NodeId,
    pub token: T,
}

impl<T> Anchored<NodeId> for DeriveKey<T> {
    fn anchors(&self, visit: &mut dyn FnMut(NodeId)) {
        visit(self.node)
    }
}

/// One table per memoized operation.
pub struct MemoTables<T> {
    pub derive: WeakMemo<DeriveKey<T>, NodeId>,
    pub compact: WeakMemo<NodeId, NodeId>,
    pub nullable: WeakMemo<NodeId, bool>,
    pub inhabited: WeakMemo<NodeId, bool>,
    pub consuming: WeakMemo<NodeId, bool>,
    pub forest: WeakMemo<NodeId, Arc<Forest<T>>>,
}

impl<T: Token> Default for MemoTables<T> {
    fn default() -> Self {
        Self {
            derive: WeakMemo::new(),
            compact: WeakMemo::new(),
            nullable: WeakMemo::new(),
            inhabited: WeakMemo::new(),
            consuming: WeakMemo::new(),
            forest: WeakMemo::new(),
        }
    }
}

/// Per-table statistics, as reported by [`Engine::memo_stats`](crate::Engine::memo_stats).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub derive: MemoStats,
    pub compact: MemoStats,
    pub nullable: MemoStats,
    pub inhabited: MemoStats,
    pub consuming: MemoStats,
    pub forest: MemoStats,
}

impl<T: Token> MemoTables<T> {
    /// Drops every entry that mentions a node `grammar` no longer holds.
    pub fn sweep(&mut self, grammar: &Grammar<T>) -> usize {
        let is_live = |id: NodeId| grammar.contains(id);
        self.derive.sweep(is_live)
            + self.compact.sweep(is_live)
            + self.nullable.sweep(is_live)
            + self.inhabited.sweep(is_live)
            + self.consuming.sweep(is_live)
            + self.forest.sweep(is_live)
    }

    pub fn len(&self) -> usize {
        self.derive.len()
            + self.compact.len()
            + self.nullable.len()
            + self.inhabited.len()
            + self.consuming.len()
            + self.forest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            derive: self.derive.stats(),
            compact: self.compact.stats(),
            nullable: self.nullable.stats(),
            inhabited: self.inhabited.stats(),
            consuming: self.consuming.stats(),
            forest: self.forest.stats(),
        }
    }
}
