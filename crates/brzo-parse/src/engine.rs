//! Derivation, compaction, analysis queries and the driver loop.

use std::sync::Arc;

use brzo_fixpoint::Solver;
use brzo_grammar::{singleton, Forest, Grammar, Node, NodeId, Origin, Reducer, Token, Tree};
use brzo_stream::TokenStream;

use crate::analysis::{Consumption, Inhabitation, Nullability};
use crate::config::EngineConfig;
use crate::error::ParseResult;
use crate::forest::ForestEquations;
use crate::memo::{DeriveKey, EngineStats, MemoTables};

/// Result of a step-limited parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome<T> {
    /// All input was consumed; the trees of every successful parse.
    Complete(Forest<T>),
    /// The step limit was reached with input left.
    Halted {
        /// The derivative after `consumed` tokens.
        node: NodeId,
        consumed: usize,
    },
}

impl<T> ParseOutcome<T> {
    pub fn is_complete(&self) -> bool {
        matches!(self, ParseOutcome::Complete(_))
    }

    pub fn into_forest(self) -> Option<Forest<T>> {
        match self {
            ParseOutcome::Complete(forest) => Some(forest),
            ParseOutcome::Halted { .. } => None,
        }
    }
}

/// Owns a grammar together with the memo tables of every operation run on it.
///
/// All memoized operations take `&mut self`: an engine is used from one
/// thread at a time, and each fixed-point query builds its own [`Solver`].
pub struct Engine<T> {
    grammar: Grammar<T>,
    config: EngineConfig,
    memo: MemoTables<T>,
}

impl<T: Token> Engine<T> {
    pub fn new(grammar: Grammar<T>) -> Self {
        Self::with_config(grammar, EngineConfig::default())
    }

    pub fn with_config(grammar: Grammar<T>, config: EngineConfig) -> Self {
        Self { grammar, config, memo: MemoTables::default() }
    }

    pub fn grammar(&self) -> &Grammar<T> {
        &self.grammar
    }

    /// Mutable access for extending the grammar.
    ///
    /// Nodes are immutable once built and delegates are patched once, so
    /// memoized results stay valid when the grammar grows.
    pub fn grammar_mut(&mut self) -> &mut Grammar<T> {
        &mut self.grammar
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn memo_stats(&self) -> EngineStats {
        self.memo.stats()
    }

    /// Total number of memoized results across all tables.
    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    // --- Derivative ---

    /// The derivative of `id` by `token`: the language of the suffixes left
    /// after `token` is consumed from the strings `id` accepts.
    pub fn derive(&mut self, id: NodeId, token: &T) -> NodeId {
        let key = DeriveKey { node: id, token: token.clone() };
        if let Some(done) = self.memo.derive.lookup(&key) {
            return done;
        }

        let result = match self.grammar[id].clone() {
            Node::Empty | Node::Eps(_) | Node::Delegate(None) => self.grammar.empty(),
            Node::Token(matcher) => {
                if matcher.matches(token) {
                    self.grammar.eps_with(singleton(Tree::leaf(token.clone())), Origin::Derived)
                } else {
                    self.grammar.empty()
                }
            }
            Node::Union(left, right) => {
                let left = self.derive(left, token);
                let right = self.derive(right, token);
                self.grammar.alloc(Node::Union(left, right), Origin::Derived)
            }
            Node::Sequence(first, second) => {
                let first_derived = self.derive(first, token);
                let consumed_in_first = self.grammar.alloc(Node::Sequence(first_derived, second), Origin::Derived);
                if self.is_nullable(first) {
                    // `first` matched the empty string: keep its trees in front
                    // of the derivative of `second`.
                    let trees = self.forest_of(first);
                    let kept = self.eps_carrying(trees);
                    let second_derived = self.derive(second, token);
                    let consumed_in_second = self.grammar.alloc(Node::Sequence(kept, second_derived), Origin::Derived);
                    self.grammar.alloc(Node::Union(consumed_in_first, consumed_in_second), Origin::Derived)
                } else {
                    consumed_in_first
                }
            }
            Node::Repetition(inner) => {
                let inner_derived = self.derive(inner, token);
                let step = self.grammar.alloc(Node::Sequence(inner_derived, id), Origin::Derived);
                self.grammar.alloc(Node::Reduction(step, Reducer::Cons), Origin::Derived)
            }
            Node::Reduction(inner, reducer) => {
                let inner_derived = self.derive(inner, token);
                self.grammar.alloc(Node::Reduction(inner_derived, reducer), Origin::Derived)
            }
            Node::Delegate(Some(target)) => {
                // Recursive rules reach this delegate again while its
                // derivative is being built; they get the placeholder.
                let placeholder = self.grammar.placeholder();
                self.memo.derive.insert(key.clone(), placeholder.id());
                let derived = self.derive(target, token);
                self.grammar.fill(placeholder, derived);
                derived
            }
        };

        self.memo.derive.insert(key, result);
        result
    }

    // --- Compaction ---

    /// Rewrites `id` into a smaller node accepting the same language with
    /// the same trees.
    pub fn compact(&mut self, id: NodeId) -> NodeId {
        if let Some(done) = self.memo.compact.lookup(&id) {
            return done;
        }

        let result = match self.grammar[id].clone() {
            Node::Empty | Node::Eps(_) | Node::Token(_) => id,
            _ if self.is_empty(id) => self.grammar.empty(),
            _ if self.is_null_only(id) => {
                let trees = self.forest_of(id);
                self.eps_carrying(trees)
            }
            Node::Union(left, right) => {
                if self.is_empty(left) {
                    self.compact(right)
                } else if self.is_empty(right) {
                    self.compact(left)
                } else {
                    let left = self.compact(left);
                    let right = self.compact(right);
                    self.grammar.alloc(Node::Union(left, right), Origin::Derived)
                }
            }
            Node::Sequence(first, second) => {
                if self.is_null_only(first) {
                    let trees = self.forest_of(first);
                    let second = self.compact(second);
                    self.fused_reduction(second, Reducer::Prepend(trees))
                } else if self.is_null_only(second) {
                    let trees = self.forest_of(second);
                    let first = self.compact(first);
                    self.fused_reduction(first, Reducer::Append(trees))
                } else {
                    let first = self.compact(first);
                    let second = self.compact(second);
                    self.grammar.alloc(Node::Sequence(first, second), Origin::Derived)
                }
            }
            Node::Repetition(inner) => {
                if self.is_empty(inner) {
                    self.grammar.eps_with(singleton(Tree::List(Vec::new())), Origin::Derived)
                } else {
                    let inner = self.compact(inner);
                    self.grammar.alloc(Node::Repetition(inner), Origin::Derived)
                }
            }
            Node::Reduction(inner, reducer) => {
                let inner = self.compact(inner);
                self.fused_reduction(inner, reducer)
            }
            Node::Delegate(Some(target)) => {
                let placeholder = self.grammar.placeholder();
                self.memo.compact.insert(id, placeholder.id());
                let compacted = self.compact(target);
                self.grammar.fill(placeholder, compacted);
                compacted
            }
            Node::Delegate(None) => id,
        };

        self.memo.compact.insert(id, result);
        result
    }

    /// `Reduction(inner, reducer)` for an already compacted `inner`, folded
    /// into a single reduction when `inner` is one itself.
    fn fused_reduction(&mut self, inner: NodeId, reducer: Reducer<T>) -> NodeId {
        let node = match &self.grammar[inner] {
            Node::Reduction(innermost, inner_reducer) => {
                Node::Reduction(*innermost, Reducer::compose(reducer, inner_reducer.clone()))
            }
            _ => Node::Reduction(inner, reducer),
        };
        self.grammar.alloc(node, Origin::Derived)
    }

    /// An Eps node carrying `trees`; the shared `eps()` node for `{()}`.
    fn eps_carrying(&mut self, trees: Arc<Forest<T>>) -> NodeId {
        if trees.len() == 1 && trees.contains(&Tree::Nil) {
            self.grammar.eps()
        } else {
            self.grammar.alloc(Node::Eps(trees), Origin::Derived)
        }
    }

    // --- Analyses ---

    /// True if `id` accepts the empty string.
    pub fn is_nullable(&mut self, id: NodeId) -> bool {
        if let Some(value) = self.memo.nullable.lookup(&id) {
            return value;
        }
        let solution = Solver::new(&Nullability { grammar: &self.grammar, known: &self.memo.nullable }).solve(id);
        self.memo.nullable.extend(solution.values);
        solution.value
    }

    /// True if `id` accepts no string at all.
    pub fn is_empty(&mut self, id: NodeId) -> bool {
        !self.is_inhabited(id)
    }

    fn is_inhabited(&mut self, id: NodeId) -> bool {
        if let Some(value) = self.memo.inhabited.lookup(&id) {
            return value;
        }
        let solution = Solver::new(&Inhabitation { grammar: &self.grammar, known: &self.memo.inhabited }).solve(id);
        self.memo.inhabited.extend(solution.values);
        solution.value
    }

    /// True if `id` accepts some non-empty string.
    pub fn is_consuming(&mut self, id: NodeId) -> bool {
        if let Some(value) = self.memo.consuming.lookup(&id) {
            return value;
        }
        // Fills the inhabitation table for everything reachable from `id`.
        self.is_inhabited(id);
        let equations = Consumption {
            grammar: &self.grammar,
            known: &self.memo.consuming,
            inhabited: &self.memo.inhabited,
        };
        let solution = Solver::new(&equations).solve(id);
        self.memo.consuming.extend(solution.values);
        solution.value
    }

    /// True if `id` accepts the empty string and nothing else.
    pub fn is_null_only(&mut self, id: NodeId) -> bool {
        self.is_nullable(id) && !self.is_consuming(id)
    }

    // --- Parse forests ---

    /// The trees produced by the empty-string matches of `id`; empty when
    /// `id` is not nullable.
    pub fn parse_forest(&mut self, id: NodeId) -> Forest<T> {
        self.forest_of(id).as_ref().clone()
    }

    fn forest_of(&mut self, id: NodeId) -> Arc<Forest<T>> {
        if let Some(trees) = self.memo.forest.lookup(&id) {
            return trees;
        }
        let equations = ForestEquations { grammar: &self.grammar, known: &self.memo.forest };
        let solver = match self.config.forest_pass_limit {
            0 => Solver::new(&equations),
            floor => Solver::new(&equations).with_scaled_pass_limit(floor),
        };
        let solution = solver.solve(id);
        let trees = Arc::new(solution.value);
        // A truncated solution is an under-approximation; never cache it.
        if solution.converged {
            self.memo
                .forest
                .extend(solution.values.into_iter().map(|(node, trees)| (node, Arc::new(trees))));
            self.memo.forest.insert(id, trees.clone());
        }
        trees
    }

    // --- Driver ---

    /// True if the whole of `stream` is a string of the language of `root`.
    pub fn recognises<S>(&mut self, root: NodeId, mut stream: S) -> ParseResult<bool>
    where
        S: TokenStream<Token = T>,
    {
        self.grammar.validate(root)?;
        let mut node = root;
        let mut steps = 0;
        while stream.has_next() {
            let token = stream.next_token()?;
            node = self.derive(node, &token);
            steps += 1;
            log::debug!("recognise step {}: {:?} -> {} ({} nodes)", steps, token, node, self.grammar.len());
            self.maybe_collect(steps, node);
        }
        Ok(self.is_nullable(node))
    }

    /// Every parse tree of `stream` under `root`. An empty forest means the
    /// input was rejected.
    pub fn parse<S>(&mut self, root: NodeId, stream: S) -> ParseResult<Forest<T>>
    where
        S: TokenStream<Token = T>,
    {
        let outcome = self.parse_with_limit(root, stream, None)?;
        Ok(outcome.into_forest().unwrap_or_default())
    }

    /// Like [`Engine::parse`], but stops once `limit` tokens have been
    /// consumed while input remains, returning the derivative reached.
    pub fn parse_with_limit<S>(&mut self, root: NodeId, mut stream: S, limit: Option<usize>) -> ParseResult<ParseOutcome<T>>
    where
        S: TokenStream<Token = T>,
    {
        self.grammar.validate(root)?;
        let mut node = root;
        let mut consumed = 0;
        while stream.has_next() {
            if limit.map_or(false, |limit| consumed >= limit) {
                log::debug!("parse halted after {} tokens at {}", consumed, node);
                return Ok(ParseOutcome::Halted { node, consumed });
            }
            let token = stream.next_token()?;
            let derived = self.derive(node, &token);
            node = if self.config.compact { self.compact(derived) } else { derived };
            consumed += 1;
            log::debug!("parse step {}: {:?} -> {} ({} nodes)", consumed, token, node, self.grammar.len());
            self.maybe_collect(consumed, node);
        }
        Ok(ParseOutcome::Complete(self.parse_forest(node)))
    }

    fn maybe_collect(&mut self, steps: usize, current: NodeId) {
        let interval = self.config.collect_interval;
        if interval > 0 && steps % interval == 0 {
            self.collect_garbage([current]);
        }
    }

    // --- Collection ---

    /// Frees derived nodes unreachable from `roots` (and from the grammar's
    /// own nodes), then drops every memoized result that mentions them.
    /// Returns the number of nodes freed.
    pub fn collect_garbage(&mut self, roots: impl IntoIterator<Item = NodeId>) -> usize {
        let freed = self.grammar.collect(roots);
        let evicted = self.memo.sweep(&self.grammar);
        log::debug!("collection freed {} nodes, evicted {} memo entries", freed, evicted);
        freed
    }
}
