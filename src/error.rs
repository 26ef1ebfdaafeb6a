//! Shared error utilities used across the compilation pipeline.
//!
//! Every fatal condition is a `CompileError` returned with `?` up to the
//! driver; the first one stops compilation. Non-fatal diagnostics are
//! `Warning`s and never change control flow.

use std::fmt;
use std::path::PathBuf;

use snafu::Snafu;

use crate::ty::VarType;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
  #[snafu(display("[Parser Error] {message} (line {line})"))]
  Syntax { line: usize, message: String },

  #[snafu(display("[Lexer Error] unterminated {kind} literal (line {line})"))]
  UnterminatedLiteral { line: usize, kind: &'static str },

  #[snafu(display("[Codegen Error] Undefined variable: {name}"))]
  UndefinedVariable { name: String },

  #[snafu(display("[Codegen Error] Literal '{text}' of type {ty} not found"))]
  MissingLiteral { text: String, ty: VarType },

  #[snafu(display("failed to access {}: {source}", path.display()))]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },
}

impl CompileError {
  /// Construct a syntax error anchored at a source line.
  pub fn syntax(line: usize, message: impl Into<String>) -> Self {
    Self::Syntax {
      line,
      message: message.into(),
    }
  }
}

/// What a non-fatal diagnostic is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
  /// Arithmetic over operands of different types; both sides become float.
  MixedOperands { left: VarType, right: VarType },
  /// A declaration whose initializer kept a different type.
  AssignmentMismatch {
    name: String,
    declared: VarType,
    assigned: VarType,
  },
}

/// A diagnostic that is reported but lets compilation continue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
  pub line: usize,
  pub kind: WarningKind,
}

impl fmt::Display for Warning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let line = self.line;
    match &self.kind {
      WarningKind::MixedOperands { left, right } => {
        let promoted = if left.is_float() { right } else { left };
        write!(
          f,
          "[Parser Warning] Mixing {left} and {right} in expression: promoting {promoted} to float (line {line})"
        )
      }
      WarningKind::AssignmentMismatch {
        name,
        declared,
        assigned,
      } => write!(
        f,
        "[Parser Warning] Type mismatch in assignment to '{name}': declared {declared}, assigned {assigned} (line {line}). Implicit conversion applied."
      ),
    }
  }
}
