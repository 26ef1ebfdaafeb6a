//! Flat name → symbol table used while emitting code.
//!
//! There are no nested scopes: a later insertion under the same name shadows
//! the earlier one for every lookup that follows it. All insertions are kept
//! in order so the full history stays inspectable.

use std::collections::HashMap;

use crate::ty::VarType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
  pub name: String,
  pub ty: VarType,
  /// Assembly label of the storage slot this name currently resolves to.
  pub label: String,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
  symbols: Vec<Symbol>,
  newest: HashMap<String, usize>,
}

impl SymbolTable {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, name: &str, ty: VarType, label: impl Into<String>) -> &Symbol {
    let index = self.symbols.len();
    self.symbols.push(Symbol {
      name: name.to_string(),
      ty,
      label: label.into(),
    });
    self.newest.insert(name.to_string(), index);
    &self.symbols[index]
  }

  /// Most recently inserted symbol with this name.
  pub fn lookup(&self, name: &str) -> Option<&Symbol> {
    self.newest.get(name).map(|&index| &self.symbols[index])
  }

  /// Every insertion, oldest first.
  pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
    self.symbols.iter()
  }

  pub fn len(&self) -> usize {
    self.symbols.len()
  }

  pub fn is_empty(&self) -> bool {
    self.symbols.is_empty()
  }
}
