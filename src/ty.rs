//! Value types understood by the front-end and the emitter.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarType {
  Unknown,
  Int,
  Float,
  Bool,
  Char,
  String,
}

impl VarType {
  pub fn is_float(self) -> bool {
    matches!(self, VarType::Float)
  }

  /// Types that get a slot in the read-only literal section instead of being
  /// embedded as an immediate.
  pub fn needs_literal_storage(self) -> bool {
    matches!(
      self,
      VarType::Float | VarType::Bool | VarType::Char | VarType::String
    )
  }

  pub fn name(self) -> &'static str {
    match self {
      VarType::Unknown => "unknown",
      VarType::Int => "int",
      VarType::Float => "float",
      VarType::Bool => "bool",
      VarType::Char => "char",
      VarType::String => "string",
    }
  }
}

impl fmt::Display for VarType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_int_and_unknown_skip_literal_storage() {
    assert!(!VarType::Int.needs_literal_storage());
    assert!(!VarType::Unknown.needs_literal_storage());
    assert!(VarType::Float.needs_literal_storage());
    assert!(VarType::Bool.needs_literal_storage());
    assert!(VarType::Char.needs_literal_storage());
    assert!(VarType::String.needs_literal_storage());
  }

  #[test]
  fn display_uses_source_keyword() {
    assert_eq!(VarType::Float.to_string(), "float");
    assert_eq!(VarType::String.to_string(), "string");
  }
}
