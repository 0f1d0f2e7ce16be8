//! Services module - the tagging pipeline.
//!
//! Leaf first:
//!
//! - [`lexer`]: token stream over brace-family source text
//! - [`BlockParser`]: one declaration unit into a [`DeclarationBlock`](crate::models::DeclarationBlock)
//! - [`BlockReplacementEngine`] / [`ReplacementSession`]: applies the tag rules to one block
//! - [`CodeModel`]: splits a file into blocks and reassembles it
//! - [`TaggingService`]: walks the target, rewrites files, reports results
//!
//! Everything below [`TaggingService`] is pure: no I/O and no shared state,
//! so files can be processed in parallel by an external driver.

pub mod block_parser;
pub mod code_model;
pub mod lexer;
pub mod replacement;
pub mod tagging;

pub use block_parser::{BlockParser, HeaderScan, classify};
pub use code_model::{CodeModel, FileRewrite};
pub use replacement::{BlockReplacementEngine, ReplacementOutcome, ReplacementSession, RuleSkip, SessionState};
pub use tagging::{FsSourceStore, SourceStore, TaggingService};
