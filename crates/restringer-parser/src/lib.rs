//! JavaScript front-end for the restringer deobfuscation engine: lexer,
//! arena AST, recursive-descent parser and deterministic code generator.
//!
//! The engine crate treats this one as its "source ↔ tree" collaborator:
//! [`parser::parse_program`] turns text into an [`ast::Ast`], rewrite rules
//! edit the arena, and [`codegen::emit_program`] turns it back into text.

pub mod ast;
pub mod codegen;
pub mod lexer;
pub mod parser;
pub mod span;

pub use ast::{Ast, Node, NodeId, NodeKind};
pub use codegen::{emit_expression, emit_program, emit_statement};
pub use parser::{parse_program, ParserError};
pub use span::Span;
