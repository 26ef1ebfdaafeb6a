//! Static storage for non-integer literals.
//!
//! One pre-order pass over the program registers every float, bool, char and
//! string literal under its `(text, type)` key. The first encounter assigns the
//! next `L_literal_<n>` label; later encounters reuse it.

use std::collections::HashMap;

use crate::ast::AstNode;
use crate::error::{CompileResult, MissingLiteralSnafu};
use crate::ty::VarType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralEntry {
  pub label: String,
  pub text: String,
  pub ty: VarType,
}

impl LiteralEntry {
  /// Storage directive for the read-only section.
  pub fn directive(&self) -> String {
    match self.ty {
      VarType::Float => format!(".double {:?}", scalar(&self.text).unwrap_or(0.0)),
      VarType::String => format!(".string \"{}\"", self.text),
      VarType::Bool => {
        let truthy = scalar(&self.text).map_or(!self.text.is_empty(), |v| v != 0.0);
        format!(".quad {}", u8::from(truthy))
      }
      _ => format!(".quad {}", immediate(&self.text)),
    }
  }
}

#[derive(Debug, Default)]
pub struct LiteralTable {
  entries: Vec<LiteralEntry>,
  index: HashMap<(String, VarType), usize>,
}

impl LiteralTable {
  pub fn collect(statements: &[AstNode]) -> Self {
    let mut table = Self::default();
    for stmt in statements {
      table.visit(stmt);
    }
    table
  }

  fn visit(&mut self, node: &AstNode) {
    match node {
      AstNode::Literal { text, ty } => {
        if ty.needs_literal_storage() {
          self.add(text, *ty);
        }
      }
      AstNode::Identifier { .. } => {}
      AstNode::VarDecl { initializer, .. } => self.visit(initializer),
      AstNode::Binary { lhs, rhs, .. } => {
        self.visit(lhs);
        self.visit(rhs);
      }
      AstNode::Unary { operand, .. } => self.visit(operand),
      AstNode::If {
        condition,
        then_branch,
        else_branch,
      } => {
        self.visit(condition);
        for stmt in then_branch {
          self.visit(stmt);
        }
        for stmt in else_branch.iter().flatten() {
          self.visit(stmt);
        }
      }
    }
  }

  fn add(&mut self, text: &str, ty: VarType) {
    let key = (text.to_string(), ty);
    if self.index.contains_key(&key) {
      return;
    }
    let label = format!("L_literal_{}", self.entries.len());
    self.index.insert(key, self.entries.len());
    self.entries.push(LiteralEntry {
      label,
      text: text.to_string(),
      ty,
    });
  }

  /// Label registered for `(text, ty)`. A miss means the collector and the
  /// emitter walked different trees.
  pub fn label(&self, text: &str, ty: VarType) -> CompileResult<&str> {
    match self.index.get(&(text.to_string(), ty)) {
      Some(&i) => Ok(&self.entries[i].label),
      None => MissingLiteralSnafu { text, ty }.fail(),
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = &LiteralEntry> {
    self.entries.iter()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Numeric reading of a literal's text: numbers as written, `true`/`false` as
/// 1/0, char literals as their code point.
pub fn scalar(text: &str) -> Option<f64> {
  match text {
    "true" => return Some(1.0),
    "false" => return Some(0.0),
    _ => {}
  }
  if let Some(body) = text
    .strip_prefix('\'')
    .and_then(|rest| rest.strip_suffix('\''))
  {
    return char_code(body).map(f64::from);
  }
  text.parse().ok()
}

/// Integer immediate for a literal lowered as an `int`.
pub fn immediate(text: &str) -> String {
  if text.bytes().all(|b| b.is_ascii_digit()) && !text.is_empty() {
    return text.to_string();
  }
  scalar(text).map_or_else(|| "0".to_string(), |v| (v.trunc() as i64).to_string())
}

fn char_code(body: &str) -> Option<u32> {
  let mut chars = body.chars();
  let first = chars.next()?;
  if first != '\\' {
    return Some(first as u32);
  }
  let code = match chars.next()? {
    'n' => '\n',
    't' => '\t',
    'r' => '\r',
    '0' => '\0',
    other => other,
  };
  Some(code as u32)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parser::parse_program;
  use crate::tokenizer::Tokenizer;

  fn collect(src: &str) -> LiteralTable {
    let program = parse_program(Tokenizer::new(src)).unwrap();
    LiteralTable::collect(&program.statements)
  }

  fn summary(table: &LiteralTable) -> Vec<(String, String, VarType)> {
    table
      .iter()
      .map(|e| (e.label.clone(), e.text.clone(), e.ty))
      .collect()
  }

  #[test]
  fn integers_are_never_collected() {
    let table = collect("int a = 1 + 2 * 3;");
    assert!(table.is_empty());
  }

  #[test]
  fn first_encounter_order_with_dedup() {
    let table = collect(
      "float a = 1.5; bool b = true; float c = 1.5 * 2.5; char d = 'x'; string s = \"hi\"; bool e = true;",
    );
    assert_eq!(
      summary(&table),
      vec![
        ("L_literal_0".into(), "1.5".into(), VarType::Float),
        ("L_literal_1".into(), "true".into(), VarType::Bool),
        ("L_literal_2".into(), "2.5".into(), VarType::Float),
        ("L_literal_3".into(), "'x'".into(), VarType::Char),
        ("L_literal_4".into(), "hi".into(), VarType::String),
      ]
    );
  }

  #[test]
  fn same_text_different_type_gets_new_label() {
    // `1` is an int in the first declaration and forced to bool in the second.
    let table = collect("float a = 1 + 0.5; bool b = 1;");
    assert_eq!(
      summary(&table),
      vec![
        ("L_literal_0".into(), "1".into(), VarType::Float),
        ("L_literal_1".into(), "0.5".into(), VarType::Float),
        ("L_literal_2".into(), "1".into(), VarType::Bool),
      ]
    );
  }

  #[test]
  fn descends_into_if_branches() {
    let table = collect(
      "int x = 1; if (x > 0.5) { float y = 2.5; } else { string s = \"no\"; }",
    );
    let labels: Vec<_> = table.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(labels, vec!["0.5", "2.5", "no"]);
  }

  #[test]
  fn collection_is_idempotent() {
    let program = parse_program(Tokenizer::new(
      "float a = 2.0 * 3.5; if (a > 1.0) { bool t = false; }",
    ))
    .unwrap();
    let first = LiteralTable::collect(&program.statements);
    let second = LiteralTable::collect(&program.statements);
    assert_eq!(summary(&first), summary(&second));
  }

  #[test]
  fn lookup_miss_is_an_error() {
    let table = collect("float a = 1.5;");
    assert_eq!(table.label("1.5", VarType::Float).unwrap(), "L_literal_0");
    assert!(table.label("1.5", VarType::Bool).is_err());
  }

  #[test]
  fn directives_per_type() {
    let entry = |text: &str, ty| LiteralEntry {
      label: "L".into(),
      text: text.into(),
      ty,
    };
    assert_eq!(entry("3.14", VarType::Float).directive(), ".double 3.14");
    assert_eq!(entry("1", VarType::Float).directive(), ".double 1.0");
    assert_eq!(entry("true", VarType::Bool).directive(), ".quad 1");
    assert_eq!(entry("false", VarType::Bool).directive(), ".quad 0");
    assert_eq!(entry("0", VarType::Bool).directive(), ".quad 0");
    assert_eq!(entry("'a'", VarType::Char).directive(), ".quad 97");
    assert_eq!(entry("'\\n'", VarType::Char).directive(), ".quad 10");
    assert_eq!(entry("hello", VarType::String).directive(), ".string \"hello\"");
  }

  #[test]
  fn immediates() {
    assert_eq!(immediate("42"), "42");
    assert_eq!(immediate("true"), "1");
    assert_eq!(immediate("'A'"), "65");
  }
}
