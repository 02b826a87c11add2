//! Parsing with derivatives.
//!
//! The [`Engine`] takes the derivative of a grammar node by each input
//! token in turn. The input is accepted when the final derivative accepts
//! the empty string, and its parse trees are the trees that derivative
//! produces for the empty match. Between steps the derivative is compacted
//! so its size tracks the live parse state rather than the input length.
//!
//! ```
//! use brzo_grammar::Grammar;
//! use brzo_parse::Engine;
//! use brzo_stream::StrStream;
//!
//! let mut g: Grammar<char> = Grammar::new();
//! let a = g.literal('a');
//! let b = g.literal('b');
//! let ab = g.then(a, b);
//!
//! let mut engine = Engine::new(g);
//! assert!(engine.recognises(ab, StrStream::new("ab")).unwrap());
//! let forest = engine.parse(ab, StrStream::new("ab")).unwrap();
//! let texts: Vec<String> = forest.iter().map(|tree| tree.text()).collect();
//! assert_eq!(texts, ["ab"]);
//! ```

pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod forest;
pub mod memo;

pub use config::EngineConfig;
pub use engine::{Engine, ParseOutcome};
pub use error::{ConfigError, ParseError, ParseResult};
pub use memo::EngineStats;
