//! Iterative AST rewriting engine for JavaScript deobfuscation.
//!
//! The pipeline: [`Restringer`] parses a script through the
//! `restringer-parser` collaborator, drives the rewrite-rule library
//! ([`rules`]) to a fixpoint via [`driver::apply_iteratively`], consults the
//! sandboxed [`evaluator`] for runtime-dependent rewrites, and emits the
//! cleaned source. All tree mutation is staged on the [`Arborist`] and
//! committed atomically between rule passes.

pub mod analysis;
pub mod arborist;
pub mod cache;
pub mod config;
pub mod context;
pub mod driver;
pub mod evaluator;
pub mod processors;
mod restringer;
pub mod rules;

pub use arborist::Arborist;
pub use config::{DeobfuscateOptions, IterationBudget};
pub use driver::apply_iteratively;
pub use restringer::Restringer;
pub use rules::{safe_rules, unsafe_rules, NamedRule};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("parse error: {0}")]
    Parse(#[from] restringer_parser::ParserError),

    #[error("commit failed: {0}")]
    Commit(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
