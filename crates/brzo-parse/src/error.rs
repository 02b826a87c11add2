use thiserror::Error;
use miette::Diagnostic;

use brzo_grammar::GrammarError;
use brzo_stream::StreamError;

/// Errors surfaced by the driver.
///
/// Derivation, compaction and the analyses are total over a validated
/// grammar graph, so every variant here comes either from the token stream
/// or from validating the graph before the first token is consumed.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Grammar(#[from] GrammarError),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Errors raised while loading an [`EngineConfig`](crate::EngineConfig).
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid engine configuration: {0}")]
    #[diagnostic(
        code(brzo_parse::invalid_config),
        help("known keys are `compact`, `collect_interval` and `forest_pass_limit`")
    )]
    Invalid(String),
}
