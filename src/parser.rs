//! Recursive-descent parser producing a statement list and expression AST.
//!
//! Expressions are parsed with one helper per precedence level, lowest first.
//! Result types are inferred while nodes are built: comparisons and logical
//! operators yield `bool`, mixed arithmetic promotes both sides to `float`.
//! Type mismatches are warnings; anything the grammar rejects is fatal.

use tracing::{debug, warn};

use crate::ast::{AstNode, BinaryOp, Program, UnaryOp};
use crate::error::{CompileError, CompileResult, Warning, WarningKind};
use crate::tokenizer::{Token, TokenKind, TokenSource, describe_token};
use crate::ty::VarType;

/// Parse a whole compilation unit. The first syntax error aborts parsing.
pub fn parse_program(source: impl TokenSource) -> CompileResult<Program> {
  let mut stream = TokenStream::new(Box::new(source))?;
  let mut statements = Vec::new();

  while !stream.is_eof() {
    statements.push(parse_stmt(&mut stream)?);
  }

  debug!(
    statements = statements.len(),
    warnings = stream.warnings.len(),
    "parsed program"
  );
  Ok(Program {
    statements,
    warnings: stream.warnings,
  })
}

fn parse_stmt(stream: &mut TokenStream) -> CompileResult<AstNode> {
  match stream.current.kind {
    TokenKind::If => parse_if(stream),
    kind if declared_type(kind).is_some() => parse_var_decl(stream),
    _ => Err(stream.error(format!(
      "Expected type keyword or IF, got {}",
      describe_token(&stream.current)
    ))),
  }
}

fn declared_type(kind: TokenKind) -> Option<VarType> {
  match kind {
    TokenKind::Int => Some(VarType::Int),
    TokenKind::Float => Some(VarType::Float),
    TokenKind::Bool => Some(VarType::Bool),
    TokenKind::Char => Some(VarType::Char),
    TokenKind::String => Some(VarType::String),
    _ => None,
  }
}

fn parse_var_decl(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let Some(declared) = declared_type(stream.current.kind) else {
    return Err(stream.error(format!(
      "Expected type keyword, got {}",
      describe_token(&stream.current)
    )));
  };
  stream.advance()?;

  let name = stream.expect(TokenKind::Ident)?.text;
  stream.expect(TokenKind::Assign)?;
  let mut value = parse_expr(stream)?;

  match (declared, value.result_type()) {
    (VarType::Bool, _) => value.coerce(VarType::Bool),
    (VarType::Int | VarType::Float, VarType::Bool) => value.coerce(VarType::Int),
    _ => {}
  }

  let assigned = value.result_type();
  if assigned != declared {
    stream.warn(WarningKind::AssignmentMismatch {
      name: name.clone(),
      declared,
      assigned,
    });
  }

  stream.expect(TokenKind::Semicolon)?;
  Ok(AstNode::var_decl(declared, name, value))
}

fn parse_if(stream: &mut TokenStream) -> CompileResult<AstNode> {
  stream.expect(TokenKind::If)?;
  stream.expect(TokenKind::LParen)?;
  let condition = parse_expr(stream)?;
  stream.expect(TokenKind::RParen)?;
  let then_branch = parse_block(stream)?;

  let else_branch = if stream.consume(TokenKind::Else)? {
    if stream.current.kind == TokenKind::If {
      Some(vec![parse_if(stream)?])
    } else {
      Some(parse_block(stream)?)
    }
  } else {
    None
  };

  Ok(AstNode::if_statement(condition, then_branch, else_branch))
}

fn parse_block(stream: &mut TokenStream) -> CompileResult<Vec<AstNode>> {
  stream.expect(TokenKind::LBrace)?;
  let mut stmts = Vec::new();
  while !matches!(stream.current.kind, TokenKind::RBrace | TokenKind::Eof) {
    stmts.push(parse_stmt(stream)?);
  }
  stream.expect(TokenKind::RBrace)?;
  Ok(stmts)
}

fn parse_expr(stream: &mut TokenStream) -> CompileResult<AstNode> {
  parse_logical_or(stream)
}

type Level = fn(&mut TokenStream) -> CompileResult<AstNode>;

/// Left-associative loop shared by every binary precedence level.
fn parse_binary_level(
  stream: &mut TokenStream,
  operand: Level,
  operators: &[(TokenKind, BinaryOp)],
) -> CompileResult<AstNode> {
  let mut node = operand(stream)?;

  while let Some(&(kind, op)) = operators
    .iter()
    .find(|(kind, _)| *kind == stream.current.kind)
  {
    stream.expect(kind)?;
    let rhs = operand(stream)?;
    node = make_binary(stream, op, node, rhs);
  }

  Ok(node)
}

fn parse_logical_or(stream: &mut TokenStream) -> CompileResult<AstNode> {
  parse_binary_level(stream, parse_logical_xor, &[(TokenKind::Or, BinaryOp::Or)])
}

fn parse_logical_xor(stream: &mut TokenStream) -> CompileResult<AstNode> {
  parse_binary_level(stream, parse_logical_and, &[(TokenKind::Xor, BinaryOp::Xor)])
}

fn parse_logical_and(stream: &mut TokenStream) -> CompileResult<AstNode> {
  parse_binary_level(stream, parse_equality, &[(TokenKind::And, BinaryOp::And)])
}

fn parse_equality(stream: &mut TokenStream) -> CompileResult<AstNode> {
  parse_binary_level(
    stream,
    parse_comparison,
    &[(TokenKind::Eq, BinaryOp::Eq), (TokenKind::Ne, BinaryOp::Ne)],
  )
}

fn parse_comparison(stream: &mut TokenStream) -> CompileResult<AstNode> {
  parse_binary_level(
    stream,
    parse_term,
    &[
      (TokenKind::Lt, BinaryOp::Lt),
      (TokenKind::Gt, BinaryOp::Gt),
      (TokenKind::Le, BinaryOp::Le),
      (TokenKind::Ge, BinaryOp::Ge),
    ],
  )
}

fn parse_term(stream: &mut TokenStream) -> CompileResult<AstNode> {
  parse_binary_level(
    stream,
    parse_factor_ops,
    &[
      (TokenKind::Plus, BinaryOp::Add),
      (TokenKind::Minus, BinaryOp::Sub),
    ],
  )
}

fn parse_factor_ops(stream: &mut TokenStream) -> CompileResult<AstNode> {
  parse_binary_level(
    stream,
    parse_unary,
    &[
      (TokenKind::Star, BinaryOp::Mul),
      (TokenKind::Slash, BinaryOp::Div),
    ],
  )
}

fn parse_unary(stream: &mut TokenStream) -> CompileResult<AstNode> {
  if stream.consume(TokenKind::Not)? {
    let operand = parse_unary(stream)?;
    return Ok(AstNode::unary(UnaryOp::Not, operand, VarType::Bool));
  }

  if stream.consume(TokenKind::Minus)? {
    let operand = parse_unary(stream)?;
    let ty = operand.result_type();
    return Ok(AstNode::unary(UnaryOp::Neg, operand, ty));
  }

  parse_factor(stream)
}

fn parse_factor(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let token = stream.current.clone();
  let node = match token.kind {
    TokenKind::Number => {
      if token.text.parse::<f64>().is_err() {
        return Err(stream.error(format!("Malformed number '{}'", token.text)));
      }
      let ty = if token.text.contains('.') {
        VarType::Float
      } else {
        VarType::Int
      };
      if ty == VarType::Int && token.text.parse::<i64>().is_err() {
        return Err(stream.error(format!(
          "Integer literal '{}' does not fit in 64 bits",
          token.text
        )));
      }
      AstNode::literal(token.text, ty)
    }
    TokenKind::BoolLiteral => AstNode::literal(token.text, VarType::Bool),
    TokenKind::CharLiteral => AstNode::literal(token.text, VarType::Char),
    TokenKind::StringLiteral => AstNode::literal(token.text, VarType::String),
    TokenKind::Ident => AstNode::identifier(token.text),
    TokenKind::LParen => {
      stream.advance()?;
      let node = parse_expr(stream)?;
      stream.expect(TokenKind::RParen)?;
      return Ok(node);
    }
    _ => {
      return Err(stream.error(format!(
        "Unexpected token: {}",
        describe_token(&token)
      )));
    }
  };
  stream.advance()?;
  Ok(node)
}

/// Build a binary node, applying the result-type rules.
fn make_binary(
  stream: &mut TokenStream,
  op: BinaryOp,
  mut lhs: AstNode,
  mut rhs: AstNode,
) -> AstNode {
  if !op.is_arithmetic() {
    return AstNode::binary(op, lhs, rhs, VarType::Bool);
  }

  let (left, right) = (lhs.result_type(), rhs.result_type());
  if left == right {
    return AstNode::binary(op, lhs, rhs, left);
  }

  stream.warn(WarningKind::MixedOperands { left, right });
  lhs.coerce(VarType::Float);
  rhs.coerce(VarType::Float);
  AstNode::binary(op, lhs, rhs, VarType::Float)
}

/// One-token lookahead over a non-rewindable token source.
struct TokenStream<'a> {
  source: Box<dyn TokenSource + 'a>,
  current: Token,
  warnings: Vec<Warning>,
}

impl<'a> TokenStream<'a> {
  fn new(mut source: Box<dyn TokenSource + 'a>) -> CompileResult<Self> {
    let current = source.next_token()?;
    Ok(Self {
      source,
      current,
      warnings: Vec::new(),
    })
  }

  fn advance(&mut self) -> CompileResult<Token> {
    let next = self.source.next_token()?;
    Ok(std::mem::replace(&mut self.current, next))
  }

  /// Consume the current token if it has the given kind.
  fn consume(&mut self, kind: TokenKind) -> CompileResult<bool> {
    if self.current.kind == kind {
      self.advance()?;
      return Ok(true);
    }
    Ok(false)
  }

  /// Consume and return the current token, failing if its kind differs.
  fn expect(&mut self, kind: TokenKind) -> CompileResult<Token> {
    if self.current.kind != kind {
      return Err(self.error(format!(
        "Expected {kind}, got {}",
        describe_token(&self.current)
      )));
    }
    self.advance()
  }

  fn is_eof(&self) -> bool {
    self.current.kind == TokenKind::Eof
  }

  fn error(&self, message: String) -> CompileError {
    CompileError::syntax(self.current.line, message)
  }

  fn warn(&mut self, kind: WarningKind) {
    let warning = Warning {
      line: self.current.line,
      kind,
    };
    warn!("{warning}");
    self.warnings.push(warning);
  }
}
