//! Crate root: wires together the compilation pipeline.
//!
//! - `tokenizer` turns source text into a pull-based token stream.
//! - `parser` builds the typed AST and collects type warnings.
//! - `codegen` collects literals, lays out storage and lowers the AST into
//!   x86-64 assembly, resolving names through `symbol`.
//! - `error` holds the fatal error type and warnings shared by every stage.
//! - `config` describes how the command-line driver is invoked.

pub mod ast;
pub mod codegen;
pub mod config;
pub mod error;
pub mod parser;
pub mod symbol;
pub mod tokenizer;
pub mod ty;

use std::fs;
use std::path::Path;

use snafu::ResultExt;
use tracing::info;

use crate::error::IoSnafu;

pub use ast::Program;
pub use error::{CompileError, CompileResult, Warning, WarningKind};

/// Tokenize and parse a source string.
pub fn parse_source(source: &str) -> CompileResult<Program> {
  parser::parse_program(tokenizer::Tokenizer::new(source))
}

/// Compile a source string into assembly text.
pub fn generate_assembly(source: &str) -> CompileResult<String> {
  let program = parse_source(source)?;
  codegen::generate(&program)
}

pub fn read_source(path: &Path) -> CompileResult<String> {
  fs::read_to_string(path).context(IoSnafu { path })
}

pub fn write_assembly(path: &Path, asm: &str) -> CompileResult<()> {
  fs::write(path, asm).context(IoSnafu { path })?;
  info!(path = %path.display(), bytes = asm.len(), "wrote assembly");
  Ok(())
}
