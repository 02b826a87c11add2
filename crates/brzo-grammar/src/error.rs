use thiserror::Error;
use miette::Diagnostic;

use crate::node::NodeId;

/// Errors raised while assembling or validating a grammar graph.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum GrammarError {
    #[error("Node {0} is not live in this grammar")]
    #[diagnostic(
        code(brzo_grammar::stale_handle),
        help("derived nodes are freed by collection; keep the handles you need as collection roots")
    )]
    StaleHandle(NodeId),

    #[error("Node {0} is not a delegate and cannot be back-patched")]
    #[diagnostic(code(brzo_grammar::not_a_delegate))]
    NotADelegate(NodeId),

    #[error("Delegate {delegate} already points at {current}")]
    #[diagnostic(
        code(brzo_grammar::delegate_already_set),
        help("a delegate is back-patched exactly once, when its recursive rule is closed")
    )]
    DelegateAlreadySet { delegate: NodeId, current: NodeId },

    #[error("Delegate {0} was never given a target")]
    #[diagnostic(
        code(brzo_grammar::unresolved_delegate),
        help("call `set_target` on every delegate before parsing")
    )]
    UnresolvedDelegate(NodeId),
}

pub type GrammarResult<T> = Result<T, GrammarError>;
