use thiserror::Error;
use miette::Diagnostic;

/// Errors raised by token streams.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum StreamError {
    /// `next_token` was called with no input left.
    #[error("End of stream reached at position {position}")]
    #[diagnostic(
        code(brzo_stream::end_of_stream),
        help("check `has_next` before pulling another token")
    )]
    EndOfStream { position: usize },
}

pub type StreamResult<T> = Result<T, StreamError>;
