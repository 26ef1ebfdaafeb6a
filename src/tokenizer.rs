//! Lexical analysis: turns source text into a pull-based token stream.
//!
//! The parser only ever asks for the next token, so the tokenizer is a cursor
//! over the input rather than a pre-built vector. Multi-character operators
//! are matched before single-character ones to avoid ambiguity.

use std::fmt;

use crate::error::{CompileResult, UnterminatedLiteralSnafu};

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Eof,
  Int,
  Float,
  Bool,
  Char,
  String,
  Ident,
  Number,
  BoolLiteral,
  CharLiteral,
  StringLiteral,
  Assign,
  Plus,
  Minus,
  Star,
  Slash,
  And,
  Or,
  Not,
  Xor,
  Eq,
  Ne,
  Lt,
  Gt,
  Le,
  Ge,
  If,
  Else,
  Semicolon,
  LParen,
  RParen,
  LBrace,
  RBrace,
  Error,
}

impl TokenKind {
  pub fn name(self) -> &'static str {
    match self {
      TokenKind::Eof => "EOF",
      TokenKind::Int => "INT",
      TokenKind::Float => "FLOAT",
      TokenKind::Bool => "BOOL",
      TokenKind::Char => "CHAR",
      TokenKind::String => "STRING",
      TokenKind::Ident => "IDENTIFIER",
      TokenKind::Number => "NUMBER",
      TokenKind::BoolLiteral => "BOOL_LITERAL",
      TokenKind::CharLiteral => "CHAR_LITERAL",
      TokenKind::StringLiteral => "STRING_LITERAL",
      TokenKind::Assign => "ASSIGN",
      TokenKind::Plus => "PLUS",
      TokenKind::Minus => "MINUS",
      TokenKind::Star => "STAR",
      TokenKind::Slash => "SLASH",
      TokenKind::And => "AND",
      TokenKind::Or => "OR",
      TokenKind::Not => "NOT",
      TokenKind::Xor => "XOR",
      TokenKind::Eq => "EQ",
      TokenKind::Ne => "NEQ",
      TokenKind::Lt => "LT",
      TokenKind::Gt => "GT",
      TokenKind::Le => "LEQ",
      TokenKind::Ge => "GEQ",
      TokenKind::If => "IF",
      TokenKind::Else => "ELSE",
      TokenKind::Semicolon => "SEMICOLON",
      TokenKind::LParen => "LPAREN",
      TokenKind::RParen => "RPAREN",
      TokenKind::LBrace => "LBRACE",
      TokenKind::RBrace => "RBRACE",
      TokenKind::Error => "ERROR",
    }
  }
}

impl fmt::Display for TokenKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// A classified lexeme. `text` is empty for structural tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub text: String,
  pub line: usize,
}

impl Token {
  pub fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
    Self {
      kind,
      text: text.into(),
      line,
    }
  }

  fn structural(kind: TokenKind, line: usize) -> Self {
    Self::new(kind, String::new(), line)
  }
}

/// Source of tokens consumed by the parser. Calls after the end of input keep
/// returning `Eof`.
pub trait TokenSource {
  fn next_token(&mut self) -> CompileResult<Token>;
}

/// Replays a fixed token list, then `Eof`. Handy when tokens come from
/// somewhere other than [`Tokenizer`].
impl TokenSource for std::vec::IntoIter<Token> {
  fn next_token(&mut self) -> CompileResult<Token> {
    Ok(self.next().unwrap_or_else(|| Token::structural(TokenKind::Eof, 0)))
  }
}

/// Scanner over an in-memory source string.
pub struct Tokenizer<'a> {
  input: &'a str,
  pos: usize,
  line: usize,
}

impl<'a> Tokenizer<'a> {
  pub fn new(input: &'a str) -> Self {
    Self {
      input,
      pos: 0,
      line: 1,
    }
  }

  fn peek_byte(&self) -> Option<u8> {
    self.input.as_bytes().get(self.pos).copied()
  }

  fn skip_trivia(&mut self) {
    while let Some(c) = self.peek_byte() {
      if c == b'\n' {
        self.line += 1;
        self.pos += 1;
      } else if c.is_ascii_whitespace() {
        self.pos += 1;
      } else if self.input[self.pos..].starts_with("//") {
        while let Some(c) = self.peek_byte()
          && c != b'\n'
        {
          self.pos += 1;
        }
      } else {
        break;
      }
    }
  }

  fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
    let start = self.pos;
    while let Some(c) = self.peek_byte()
      && pred(c)
    {
      self.pos += 1;
    }
    &self.input[start..self.pos]
  }

  /// Scan a quoted literal, returning the text between the quotes with escape
  /// sequences left as written.
  fn quoted(&mut self, quote: u8, kind: &'static str) -> CompileResult<&'a str> {
    let line = self.line;
    self.pos += 1;
    let start = self.pos;
    loop {
      match self.peek_byte() {
        Some(c) if c == quote => {
          let body = &self.input[start..self.pos];
          self.pos += 1;
          return Ok(body);
        }
        // an escaped newline still ends the literal
        Some(b'\\')
          if !matches!(self.input.as_bytes().get(self.pos + 1), None | Some(b'\n')) =>
        {
          self.pos += 2
        }
        Some(b'\n') | None => return UnterminatedLiteralSnafu { line, kind }.fail(),
        Some(_) => self.pos += 1,
      }
    }
  }
}

impl TokenSource for Tokenizer<'_> {
  fn next_token(&mut self) -> CompileResult<Token> {
    self.skip_trivia();
    let line = self.line;

    let Some(c) = self.peek_byte() else {
      return Ok(Token::structural(TokenKind::Eof, line));
    };

    if c.is_ascii_alphabetic() || c == b'_' {
      let word = self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_');
      let kind = match word {
        "int" => TokenKind::Int,
        "float" => TokenKind::Float,
        "bool" => TokenKind::Bool,
        "char" => TokenKind::Char,
        "string" => TokenKind::String,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "true" | "false" => TokenKind::BoolLiteral,
        _ => TokenKind::Ident,
      };
      return Ok(Token::new(kind, word, line));
    }

    if c.is_ascii_digit() {
      let number = self.take_while(|c| c.is_ascii_digit() || c == b'.');
      return Ok(Token::new(TokenKind::Number, number, line));
    }

    if c == b'\'' {
      let body = self.quoted(b'\'', "char")?;
      return Ok(Token::new(TokenKind::CharLiteral, format!("'{body}'"), line));
    }

    if c == b'"' {
      let body = self.quoted(b'"', "string")?;
      return Ok(Token::new(TokenKind::StringLiteral, body, line));
    }

    let rest = &self.input[self.pos..];
    if let Some((op, kind)) = [
      ("==", TokenKind::Eq),
      ("!=", TokenKind::Ne),
      ("<=", TokenKind::Le),
      (">=", TokenKind::Ge),
      ("&&", TokenKind::And),
      ("||", TokenKind::Or),
    ]
    .into_iter()
    .find(|(op, _)| rest.starts_with(op))
    {
      self.pos += op.len();
      return Ok(Token::structural(kind, line));
    }

    let kind = match c {
      b'=' => TokenKind::Assign,
      b'+' => TokenKind::Plus,
      b'-' => TokenKind::Minus,
      b'*' => TokenKind::Star,
      b'/' => TokenKind::Slash,
      b'!' => TokenKind::Not,
      b'^' => TokenKind::Xor,
      b'<' => TokenKind::Lt,
      b'>' => TokenKind::Gt,
      b';' => TokenKind::Semicolon,
      b'(' => TokenKind::LParen,
      b')' => TokenKind::RParen,
      b'{' => TokenKind::LBrace,
      b'}' => TokenKind::RBrace,
      _ => {
        let invalid = rest.chars().next().unwrap_or('\0');
        self.pos += invalid.len_utf8();
        return Ok(Token::new(TokenKind::Error, invalid.to_string(), line));
      }
    };
    self.pos += 1;
    Ok(Token::structural(kind, line))
  }
}

/// Drain a source string into a vector, including the trailing `Eof`.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let mut tokenizer = Tokenizer::new(input);
  let mut tokens = Vec::new();
  loop {
    let token = tokenizer.next_token()?;
    let done = token.kind == TokenKind::Eof;
    tokens.push(token);
    if done {
      return Ok(tokens);
    }
  }
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: &Token) -> String {
  if token.text.is_empty() {
    token.kind.to_string()
  } else {
    format!("{} '{}'", token.kind, token.text)
  }
}
