//! S-expression rendering of grammar graphs, for logs and snapshot tests.

use std::fmt::Write;

use rustc_hash::FxHashSet;

use crate::grammar::Grammar;
use crate::node::{Matcher, Node, NodeId};
use crate::tree::{display_forest, Reducer, Tree};
use crate::Token;

impl<T: Token> Grammar<T> {
    /// Renders the graph rooted at `root`.
    ///
    /// A delegate is printed as `#n:target` the first time it is reached and
    /// as `#n` afterwards, which is what keeps cyclic graphs finite.
    pub fn render(&self, root: NodeId) -> String {
        let mut out = String::new();
        let mut seen = FxHashSet::default();
        self.render_into(root, &mut seen, &mut out);
        out
    }

    fn render_into(&self, id: NodeId, seen: &mut FxHashSet<NodeId>, out: &mut String) {
        let Some(node) = self.get(id) else {
            let _ = write!(out, "<stale {}>", id);
            return;
        };
        match node {
            Node::Empty => out.push_str("empty"),
            Node::Eps(forest) => {
                if forest.len() == 1 && forest.contains(&Tree::Nil) {
                    out.push_str("eps");
                } else {
                    let _ = write!(out, "(eps {})", display_forest(forest));
                }
            }
            Node::Token(Matcher::Literal(value)) => {
                let _ = write!(out, "{:?}", value);
            }
            Node::Token(Matcher::Predicate(_)) => out.push_str("<pred>"),
            Node::Union(left, right) => self.render_list("or", &[*left, *right], seen, out),
            Node::Sequence(first, second) => self.render_list("seq", &[*first, *second], seen, out),
            Node::Repetition(inner) => self.render_list("star", &[*inner], seen, out),
            Node::Reduction(inner, reducer) => {
                out.push_str("(red ");
                render_reducer(reducer, out);
                out.push(' ');
                self.render_into(*inner, seen, out);
                out.push(')');
            }
            Node::Delegate(target) => {
                let _ = write!(out, "{}", id);
                if seen.insert(id) {
                    out.push(':');
                    match target {
                        Some(target) => self.render_into(*target, seen, out),
                        None => out.push('?'),
                    }
                }
            }
        }
    }

    fn render_list(&self, head: &str, children: &[NodeId], seen: &mut FxHashSet<NodeId>, out: &mut String) {
        out.push('(');
        out.push_str(head);
        for child in children {
            out.push(' ');
            self.render_into(*child, seen, out);
        }
        out.push(')');
    }
}

fn render_reducer<T: Token>(reducer: &Reducer<T>, out: &mut String) {
    match reducer {
        Reducer::Map(_) => out.push_str("map"),
        Reducer::Prepend(forest) => {
            let _ = write!(out, "(prepend {})", display_forest(forest));
        }
        Reducer::Append(forest) => {
            let _ = write!(out, "(append {})", display_forest(forest));
        }
        Reducer::Cons => out.push_str("cons"),
        Reducer::Compose(outer, inner) => {
            out.push_str("(compose ");
            render_reducer(outer, out);
            out.push(' ');
            render_reducer(inner, out);
            out.push(')');
        }
    }
}
