//! Program representation shared by the parser and the code generator.
//!
//! Nodes are built once by the parser and only read afterwards. Each node
//! owns its children, and every node reports a result type: declared for
//! declarations and literals, inferred for expressions.

use std::fmt;

use crate::error::Warning;
use crate::ty::VarType;

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  And,
  Or,
  Xor,
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
}

impl BinaryOp {
  pub fn is_arithmetic(self) -> bool {
    matches!(
      self,
      BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div
    )
  }

  pub fn is_logical(self) -> bool {
    matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Xor)
  }

  pub fn symbol(self) -> &'static str {
    match self {
      BinaryOp::Add => "+",
      BinaryOp::Sub => "-",
      BinaryOp::Mul => "*",
      BinaryOp::Div => "/",
      BinaryOp::And => "&&",
      BinaryOp::Or => "||",
      BinaryOp::Xor => "^",
      BinaryOp::Eq => "==",
      BinaryOp::Ne => "!=",
      BinaryOp::Lt => "<",
      BinaryOp::Le => "<=",
      BinaryOp::Gt => ">",
      BinaryOp::Ge => ">=",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
  Not,
  Neg,
}

impl UnaryOp {
  pub fn symbol(self) -> &'static str {
    match self {
      UnaryOp::Not => "!",
      UnaryOp::Neg => "-",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
  VarDecl {
    declared_type: VarType,
    name: String,
    initializer: Box<AstNode>,
  },
  /// `text` is the literal as written: `3.14`, `true`, `'a'`, or the body of
  /// a string literal without its quotes.
  Literal {
    text: String,
    ty: VarType,
  },
  Identifier {
    name: String,
    ty: VarType,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<AstNode>,
    rhs: Box<AstNode>,
    ty: VarType,
  },
  Unary {
    op: UnaryOp,
    operand: Box<AstNode>,
    ty: VarType,
  },
  If {
    condition: Box<AstNode>,
    then_branch: Vec<AstNode>,
    else_branch: Option<Vec<AstNode>>,
  },
}

impl AstNode {
  pub fn var_decl(declared_type: VarType, name: impl Into<String>, initializer: AstNode) -> Self {
    Self::VarDecl {
      declared_type,
      name: name.into(),
      initializer: Box::new(initializer),
    }
  }

  pub fn literal(text: impl Into<String>, ty: VarType) -> Self {
    Self::Literal {
      text: text.into(),
      ty,
    }
  }

  /// Identifiers are typed `int` until code generation resolves them.
  pub fn identifier(name: impl Into<String>) -> Self {
    Self::Identifier {
      name: name.into(),
      ty: VarType::Int,
    }
  }

  pub fn binary(op: BinaryOp, lhs: AstNode, rhs: AstNode, ty: VarType) -> Self {
    Self::Binary {
      op,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
      ty,
    }
  }

  pub fn unary(op: UnaryOp, operand: AstNode, ty: VarType) -> Self {
    Self::Unary {
      op,
      operand: Box::new(operand),
      ty,
    }
  }

  pub fn if_statement(
    condition: AstNode,
    then_branch: Vec<AstNode>,
    else_branch: Option<Vec<AstNode>>,
  ) -> Self {
    Self::If {
      condition: Box::new(condition),
      then_branch,
      else_branch,
    }
  }

  pub fn result_type(&self) -> VarType {
    match self {
      AstNode::VarDecl { declared_type, .. } => *declared_type,
      AstNode::Literal { ty, .. }
      | AstNode::Identifier { ty, .. }
      | AstNode::Binary { ty, .. }
      | AstNode::Unary { ty, .. } => *ty,
      AstNode::If { .. } => VarType::Unknown,
    }
  }

  /// Overwrite the inferred type of an expression node in place. Statements
  /// keep their declared type.
  pub fn coerce(&mut self, to: VarType) {
    match self {
      AstNode::Literal { ty, .. }
      | AstNode::Identifier { ty, .. }
      | AstNode::Binary { ty, .. }
      | AstNode::Unary { ty, .. } => *ty = to,
      AstNode::VarDecl { .. } | AstNode::If { .. } => {}
    }
  }
}

impl fmt::Display for AstNode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AstNode::Literal { text, ty: VarType::String } => write!(f, "\"{text}\""),
      AstNode::Literal { text, .. } => f.write_str(text),
      AstNode::Identifier { name, .. } => f.write_str(name),
      AstNode::Binary { op, lhs, rhs, .. } => write!(f, "({lhs} {} {rhs})", op.symbol()),
      AstNode::Unary { op, operand, .. } => write!(f, "({}{operand})", op.symbol()),
      AstNode::VarDecl {
        declared_type,
        name,
        initializer,
      } => write!(f, "VarDecl: type={declared_type} name={name} value={initializer}"),
      AstNode::If {
        condition,
        then_branch,
        else_branch,
      } => {
        writeln!(f, "IfStatement: condition={condition}")?;
        write!(f, "Then:")?;
        for stmt in then_branch {
          write!(f, "\n  {}", indent(stmt))?;
        }
        if let Some(else_branch) = else_branch {
          write!(f, "\nElse:")?;
          for stmt in else_branch {
            write!(f, "\n  {}", indent(stmt))?;
          }
        }
        Ok(())
      }
    }
  }
}

fn indent(stmt: &AstNode) -> String {
  stmt.to_string().replace('\n', "\n  ")
}

/// A parsed compilation unit: top-level statements in source order plus the
/// warnings raised while building them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
  pub statements: Vec<AstNode>,
  pub warnings: Vec<Warning>,
}

impl fmt::Display for Program {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for stmt in &self.statements {
      writeln!(f, "{stmt}")?;
    }
    Ok(())
  }
}
