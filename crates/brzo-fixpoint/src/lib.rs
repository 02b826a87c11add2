//! Least fixed point evaluation over possibly cyclic graphs.
//!
//! Properties such as "does this node accept the empty string" are defined by
//! equations that refer to the same property of other nodes. When the graph
//! contains cycles, evaluating those equations by plain recursion never ends.
//! The [`Solver`] instead runs repeated passes over the graph reachable from a
//! root:
//!
//! - every node is evaluated at most once per pass;
//! - a node reached again within the same pass (a cycle) answers with its
//!   current approximation, or the bottom value if it has none yet;
//! - if any approximation moved during a pass, another pass is run.
//!
//! For monotone equations over a finite graph the approximations can only
//! climb a finite lattice, so the passes stop at the least fixed point.
//!
//! All scratch state (approximations, the visited set, the changed flag) lives
//! in the `Solver` value created for a single top-level query, so independent
//! queries never share mutable state.

use std::fmt::Debug;
use std::hash::Hash;

use rustc_hash::{FxHashMap, FxHashSet};

/// A system of monotone equations, one per key.
pub trait Equations {
    /// Identifies a node of the graph.
    type Key: Copy + Eq + Hash + Debug;
    /// The property computed for each node.
    type Value: Clone + PartialEq + Debug;

    /// The starting approximation for every node.
    fn bottom(&self) -> Self::Value;

    /// A value already established by an earlier query, if any.
    ///
    /// Known values are used as constants and never re-evaluated.
    fn known(&self, _key: Self::Key) -> Option<Self::Value> {
        None
    }

    /// Evaluates the equation for `key`, asking `solver` for the values of
    /// the nodes it depends on.
    fn evaluate(&self, key: Self::Key, solver: &mut Solver<'_, Self>) -> Self::Value
    where
        Self: Sized;
}

/// The outcome of a top-level query.
#[derive(Debug, Clone)]
pub struct Solution<K, V> {
    /// The value computed for the root.
    pub value: V,
    /// Values of every node evaluated during the final pass.
    ///
    /// When `converged` is set these are the least fixed point values of
    /// those nodes, and may be cached by the caller.
    pub values: FxHashMap<K, V>,
    /// Number of passes run.
    pub passes: usize,
    /// False when the pass limit stopped evaluation early.
    pub converged: bool,
}

/// When a [`Solver`] gives up on a query that is still changing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassLimit {
    /// After exactly this many passes.
    Fixed(usize),
    /// After this many passes, or two more than the number of nodes
    /// evaluated so far, whichever is larger.
    Scaled(usize),
}

/// Per-query evaluation state.
pub struct Solver<'e, E: Equations> {
    equations: &'e E,
    /// Current approximation for every node evaluated so far.
    cache: FxHashMap<E::Key, E::Value>,
    /// Nodes evaluated during the current pass.
    visited: FxHashSet<E::Key>,
    /// Whether any approximation moved during the current pass.
    changed: bool,
    passes: usize,
    pass_limit: Option<PassLimit>,
}

impl<'e, E: Equations> Solver<'e, E> {
    pub fn new(equations: &'e E) -> Self {
        Self {
            equations,
            cache: FxHashMap::default(),
            visited: FxHashSet::default(),
            changed: false,
            passes: 0,
            pass_limit: None,
        }
    }

    /// Stops after `limit` passes even if the values are still moving.
    ///
    /// Needed for equations whose lattice has no finite height, such as sets
    /// of parse trees of an infinitely ambiguous grammar.
    pub fn with_pass_limit(mut self, limit: usize) -> Self {
        self.pass_limit = Some(PassLimit::Fixed(limit.max(1)));
        self
    }

    /// Like [`Solver::with_pass_limit`], but the limit is at least two more
    /// than the number of nodes evaluated, so a value can travel the whole
    /// reachable graph before the solver gives up. `floor` is the minimum.
    pub fn with_scaled_pass_limit(mut self, floor: usize) -> Self {
        self.pass_limit = Some(PassLimit::Scaled(floor.max(1)));
        self
    }

    /// Runs passes from `root` until nothing changes (or the pass limit is hit).
    pub fn solve(mut self, root: E::Key) -> Solution<E::Key, E::Value> {
        loop {
            self.passes += 1;
            self.changed = false;
            self.visited.clear();

            let value = self.value(root);
            log::trace!(
                "fixpoint pass {} from {:?}: changed = {}, evaluated {} nodes",
                self.passes,
                root,
                self.changed,
                self.visited.len()
            );

            let limit_hit = match self.pass_limit {
                None => false,
                Some(PassLimit::Fixed(limit)) => self.passes >= limit,
                Some(PassLimit::Scaled(floor)) => self.passes >= floor.max(self.cache.len() + 2),
            };
            if !self.changed || limit_hit {
                if self.changed {
                    log::warn!(
                        "fixpoint from {:?} stopped after {} passes without converging",
                        root,
                        self.passes
                    );
                }
                return self.finish(value);
            }
        }
    }

    /// Returns the value of `key` for the current pass.
    ///
    /// Called from [`Equations::evaluate`] for each dependency.
    pub fn value(&mut self, key: E::Key) -> E::Value {
        if let Some(value) = self.equations.known(key) {
            return value;
        }

        if !self.visited.insert(key) {
            // Already on this pass: answer with the approximation so far.
            return self.current(key);
        }

        let previous = self.current(key);
        let equations = self.equations;
        let next = equations.evaluate(key, self);
        if next != previous {
            self.changed = true;
        }
        self.cache.insert(key, next.clone());
        next
    }

    fn current(&self, key: E::Key) -> E::Value {
        self.cache
            .get(&key)
            .cloned()
            .unwrap_or_else(|| self.equations.bottom())
    }

    fn finish(mut self, value: E::Value) -> Solution<E::Key, E::Value> {
        let converged = !self.changed;
        let visited = std::mem::take(&mut self.visited);
        let values = visited
            .into_iter()
            .filter_map(|key| self.cache.remove(&key).map(|value| (key, value)))
            .collect();
        Solution { value, values, passes: self.passes, converged }
    }
}

/// Convenience wrapper: solve `equations` from `root` with no pass limit.
pub fn least_fixed_point<E: Equations>(equations: &E, root: E::Key) -> E::Value {
    Solver::new(equations).solve(root).value
}
