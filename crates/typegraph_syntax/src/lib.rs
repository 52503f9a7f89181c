//! Syntax layer for typegraph.
//!
//! Directives can only be attached to generated types and fields through
//! syntax nodes, so this crate provides:
//! - `token`: Token kinds and token structures
//! - `lexer`: Tokenization of directive source
//! - `parser`: Recursive descent parser for directive annotations
//! - `ast`: Owned syntax nodes and their printed form
//! - `synth`: Synthesis of definition nodes from directive annotations

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod synth;
pub mod token;

pub use ast::*;
pub use lexer::Lexer;
pub use parser::{parse_directives, ParseResult};
pub use synth::DirectiveAnnotation;
pub use token::{Token, TokenKind};
