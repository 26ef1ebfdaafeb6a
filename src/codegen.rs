//! Code generation: lower the parsed program into Intel-syntax x86-64 assembly.
//!
//! Output has three sections in a fixed order: read-only literal slots, one
//! zeroed slot per declared variable, then the instructions of `main`. Integer
//! values live in `rax` (scratch `rdi`), floating values in `xmm0` (scratch
//! `xmm1`). Binary operators evaluate their right operand first, park it,
//! evaluate the left operand into the accumulator, then restore the right one
//! into the scratch register.

mod literals;

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::ast::{AstNode, BinaryOp, Program, UnaryOp};
use crate::error::{CompileError, CompileResult, UndefinedVariableSnafu};
use crate::symbol::{Symbol, SymbolTable};
use crate::ty::VarType;

pub use literals::{LiteralEntry, LiteralTable};

/// Emit assembly for a whole program.
pub fn generate(program: &Program) -> CompileResult<String> {
  CodeGen::new(&program.statements).generate()
}

/// Register class an expression value ends up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reg {
  /// `rax`
  Int,
  /// `xmm0`
  Float,
}

impl Reg {
  fn of(ty: VarType) -> Self {
    if ty.is_float() { Reg::Float } else { Reg::Int }
  }
}

/// Hands out one distinct storage label per textual declaration. Running two
/// namers over the same statements in the same order yields the same labels.
#[derive(Default)]
struct SlotNamer {
  seen: HashMap<String, usize>,
}

impl SlotNamer {
  fn next(&mut self, name: &str) -> String {
    let count = self.seen.entry(name.to_string()).or_insert(0);
    let label = match *count {
      0 => format!("var_{name}"),
      k => format!("var_{name}.{k}"),
    };
    *count += 1;
    label
  }
}

struct CodeGen<'a> {
  statements: &'a [AstNode],
  literals: LiteralTable,
  symbols: SymbolTable,
  slots: SlotNamer,
  if_count: usize,
  asm: String,
}

impl<'a> CodeGen<'a> {
  fn new(statements: &'a [AstNode]) -> Self {
    Self {
      statements,
      literals: LiteralTable::collect(statements),
      symbols: SymbolTable::new(),
      slots: SlotNamer::default(),
      if_count: 0,
      asm: String::new(),
    }
  }

  fn emit(&mut self, instr: impl AsRef<str>) {
    self.asm.push_str("    ");
    self.asm.push_str(instr.as_ref());
    self.asm.push('\n');
  }

  fn label(&mut self, name: &str) {
    self.asm.push_str(name);
    self.asm.push_str(":\n");
  }

  fn generate(mut self) -> CompileResult<String> {
    debug!(literals = self.literals.len(), "emitting sections");

    self.emit(".intel_syntax noprefix");
    self.emit(".section .rodata");
    let rodata: Vec<String> = self
      .literals
      .iter()
      .map(|entry| format!("{}: {}\n", entry.label, entry.directive()))
      .collect();
    self.asm.extend(rodata);

    self.emit(".data");
    self.emit_data_section();

    self.emit(".text");
    self.emit(".global main");
    self.label("main");

    let exit = match self.emit_statements(self.statements)? {
      Some(name) => Some(self.lookup(&name)?.clone()),
      None => None,
    };
    match exit {
      Some(symbol) if symbol.ty.is_float() => {
        self.emit(format!("movsd xmm0, [rip + {}]", symbol.label));
        self.emit("cvttsd2si rax, xmm0");
      }
      Some(symbol) => self.emit(format!("mov rax, [rip + {}]", symbol.label)),
      None => self.emit("mov rax, 0"),
    }
    self.emit("ret");
    self.emit(".section .note.GNU-stack,\"\",@progbits");

    debug!(
      symbols = self.symbols.len(),
      if_statements = self.if_count,
      "code generation finished"
    );
    Ok(self.asm)
  }

  /// One zeroed slot per declaration, in the order the text section will
  /// reach them, including declarations inside if branches.
  fn emit_data_section(&mut self) {
    fn walk(stmts: &[AstNode], namer: &mut SlotNamer, out: &mut String) {
      for stmt in stmts {
        match stmt {
          AstNode::VarDecl {
            declared_type,
            name,
            ..
          } => {
            let init = if declared_type.is_float() {
              ".double 0.0"
            } else {
              ".quad 0"
            };
            out.push_str(&format!("{}: {init}\n", namer.next(name)));
          }
          AstNode::If {
            then_branch,
            else_branch,
            ..
          } => {
            walk(then_branch, namer, out);
            walk(else_branch.as_deref().unwrap_or_default(), namer, out);
          }
          _ => {}
        }
      }
    }

    let mut namer = SlotNamer::default();
    walk(self.statements, &mut namer, &mut self.asm);
  }

  /// Emit a statement sequence, returning the name bound by its last
  /// declaration, if any. The exit value re-resolves that name, so a later
  /// redeclaration inside a branch is what `main` returns.
  fn emit_statements(&mut self, stmts: &[AstNode]) -> CompileResult<Option<String>> {
    let mut last = None;
    for stmt in stmts {
      if let Some(name) = self.emit_stmt(stmt)? {
        last = Some(name);
      }
    }
    Ok(last)
  }

  fn emit_stmt(&mut self, stmt: &AstNode) -> CompileResult<Option<String>> {
    match stmt {
      AstNode::VarDecl {
        declared_type,
        name,
        initializer,
      } => {
        trace!(%name, ty = %declared_type, "declaration");
        let reg = Reg::of(*declared_type);
        self.emit_into(initializer, reg)?;

        let label = self.slots.next(name);
        match reg {
          Reg::Float => self.emit(format!("movsd [rip + {label}], xmm0")),
          Reg::Int => self.emit(format!("mov [rip + {label}], rax")),
        }
        self.symbols.insert(name, *declared_type, label);
        Ok(Some(name.clone()))
      }
      AstNode::If {
        condition,
        then_branch,
        else_branch,
      } => {
        let id = self.if_count;
        self.if_count += 1;
        let else_label = format!("L_else_{id}");
        let end_label = format!("L_end_{id}");
        trace!(id, has_else = else_branch.is_some(), "if statement");

        self.emit_condition(condition)?;
        self.emit("cmp rax, 0");
        match else_branch {
          Some(_) => self.emit(format!("je {else_label}")),
          None => self.emit(format!("je {end_label}")),
        }
        self.emit_statements(then_branch)?;
        self.emit(format!("jmp {end_label}"));
        if let Some(else_branch) = else_branch {
          self.label(&else_label);
          self.emit_statements(else_branch)?;
        }
        self.label(&end_label);
        Ok(None)
      }
      other => {
        self.emit_expr(other)?;
        Ok(None)
      }
    }
  }

  /// Emit `node` and leave its value in the accumulator of class `want`.
  fn emit_into(&mut self, node: &AstNode, want: Reg) -> CompileResult<()> {
    let got = self.emit_expr(node)?;
    self.convert(got, want);
    Ok(())
  }

  fn convert(&mut self, from: Reg, to: Reg) {
    match (from, to) {
      (Reg::Int, Reg::Float) => self.emit("cvtsi2sd xmm0, rax"),
      (Reg::Float, Reg::Int) => self.emit("cvttsd2si rax, xmm0"),
      _ => {}
    }
  }

  fn save(&mut self, reg: Reg) {
    match reg {
      Reg::Int => self.emit("push rax"),
      Reg::Float => {
        self.emit("sub rsp, 8");
        self.emit("movsd [rsp], xmm0");
      }
    }
  }

  fn restore(&mut self, reg: Reg) {
    match reg {
      Reg::Int => self.emit("pop rdi"),
      Reg::Float => {
        self.emit("movsd xmm1, [rsp]");
        self.emit("add rsp, 8");
      }
    }
  }

  fn lookup(&self, name: &str) -> CompileResult<&Symbol> {
    match self.symbols.lookup(name) {
      Some(symbol) => Ok(symbol),
      None => UndefinedVariableSnafu { name }.fail(),
    }
  }

  /// Register class `node` will produce, resolving identifiers through the
  /// symbol table. Arithmetic is floating when its annotated type is, or when
  /// any operand turns out to be a floating variable.
  fn value_reg(&self, node: &AstNode) -> CompileResult<Reg> {
    let reg = match node {
      AstNode::Identifier { name, .. } => Reg::of(self.lookup(name)?.ty),
      AstNode::Literal { ty, .. } => Reg::of(*ty),
      AstNode::Binary { op, lhs, rhs, ty } if op.is_arithmetic() => {
        if Reg::of(*ty) == Reg::Float
          || self.value_reg(lhs)? == Reg::Float
          || self.value_reg(rhs)? == Reg::Float
        {
          Reg::Float
        } else {
          Reg::Int
        }
      }
      AstNode::Unary {
        op: UnaryOp::Neg,
        operand,
        ty,
      } => {
        if Reg::of(*ty) == Reg::Float {
          Reg::Float
        } else {
          self.value_reg(operand)?
        }
      }
      _ => Reg::Int,
    };
    Ok(reg)
  }

  /// Emit stack-free code for an expression, returning where the value is.
  fn emit_expr(&mut self, node: &AstNode) -> CompileResult<Reg> {
    match node {
      AstNode::Literal { text, ty } => match ty {
        VarType::Float => {
          let label = self.literals.label(text, *ty)?.to_string();
          self.emit(format!("movsd xmm0, [rip + {label}]"));
          Ok(Reg::Float)
        }
        VarType::Bool | VarType::Char => {
          let label = self.literals.label(text, *ty)?.to_string();
          self.emit(format!("mov rax, [rip + {label}]"));
          Ok(Reg::Int)
        }
        VarType::String => {
          let label = self.literals.label(text, *ty)?.to_string();
          self.emit(format!("lea rax, [rip + {label}]"));
          Ok(Reg::Int)
        }
        VarType::Int | VarType::Unknown => {
          self.emit(format!("mov rax, {}", literals::immediate(text)));
          Ok(Reg::Int)
        }
      },
      AstNode::Identifier { name, .. } => {
        let symbol = self.lookup(name)?;
        let (reg, instr) = if symbol.ty.is_float() {
          (Reg::Float, format!("movsd xmm0, [rip + {}]", symbol.label))
        } else {
          (Reg::Int, format!("mov rax, [rip + {}]", symbol.label))
        };
        self.emit(instr);
        Ok(reg)
      }
      AstNode::Binary { op, lhs, rhs, .. } => {
        if op.is_arithmetic() {
          let reg = self.value_reg(node)?;
          self.emit_arithmetic(*op, lhs, rhs, reg)
        } else if op.is_logical() {
          self.emit_logical(*op, lhs, rhs)
        } else {
          self.emit_comparison(*op, lhs, rhs)
        }
      }
      AstNode::Unary {
        op: UnaryOp::Not,
        operand,
        ..
      } => {
        self.emit_condition(operand)?;
        self.emit("cmp rax, 0");
        self.emit("sete al");
        self.emit("movzx rax, al");
        Ok(Reg::Int)
      }
      AstNode::Unary {
        op: UnaryOp::Neg,
        operand,
        ..
      } => {
        let reg = self.value_reg(node)?;
        self.emit_into(operand, reg)?;
        match reg {
          Reg::Int => self.emit("neg rax"),
          Reg::Float => {
            self.emit("movq rax, xmm0");
            self.emit("btc rax, 63");
            self.emit("movq xmm0, rax");
          }
        }
        Ok(reg)
      }
      AstNode::VarDecl { .. } | AstNode::If { .. } => Err(CompileError::syntax(
        0,
        "statement used where an expression was expected",
      )),
    }
  }

  fn emit_arithmetic(
    &mut self,
    op: BinaryOp,
    lhs: &AstNode,
    rhs: &AstNode,
    reg: Reg,
  ) -> CompileResult<Reg> {
    self.emit_into(rhs, reg)?;
    self.save(reg);
    self.emit_into(lhs, reg)?;
    self.restore(reg);

    match (reg, op) {
      (Reg::Int, BinaryOp::Add) => self.emit("add rax, rdi"),
      (Reg::Int, BinaryOp::Sub) => self.emit("sub rax, rdi"),
      (Reg::Int, BinaryOp::Mul) => self.emit("imul rax, rdi"),
      (Reg::Int, BinaryOp::Div) => {
        self.emit("cqo");
        self.emit("idiv rdi");
      }
      (Reg::Float, BinaryOp::Add) => self.emit("addsd xmm0, xmm1"),
      (Reg::Float, BinaryOp::Sub) => self.emit("subsd xmm0, xmm1"),
      (Reg::Float, BinaryOp::Mul) => self.emit("mulsd xmm0, xmm1"),
      (Reg::Float, BinaryOp::Div) => self.emit("divsd xmm0, xmm1"),
      (_, other) => {
        return Err(CompileError::syntax(
          0,
          format!("'{}' is not an arithmetic operator", other.symbol()),
        ));
      }
    }
    Ok(reg)
  }

  /// Comparisons leave 0 or 1 in `rax`. Operands are compared as doubles
  /// when either side is floating.
  fn emit_comparison(&mut self, op: BinaryOp, lhs: &AstNode, rhs: &AstNode) -> CompileResult<Reg> {
    let reg = if self.value_reg(lhs)? == Reg::Float || self.value_reg(rhs)? == Reg::Float {
      Reg::Float
    } else {
      Reg::Int
    };

    self.emit_into(rhs, reg)?;
    self.save(reg);
    self.emit_into(lhs, reg)?;
    self.restore(reg);

    let (signed, unsigned) = condition_codes(op);
    let (compare, cc) = match reg {
      Reg::Int => ("cmp rax, rdi", signed),
      Reg::Float => ("ucomisd xmm0, xmm1", unsigned),
    };
    self.emit(compare);
    self.emit(format!("set{cc} al"));
    self.emit("movzx rax, al");
    Ok(Reg::Int)
  }

  /// `&&`, `||` and `^` on operands normalised to 0/1.
  fn emit_logical(&mut self, op: BinaryOp, lhs: &AstNode, rhs: &AstNode) -> CompileResult<Reg> {
    self.emit_truthy(rhs)?;
    self.save(Reg::Int);
    self.emit_truthy(lhs)?;
    self.restore(Reg::Int);
    let instr = match op {
      BinaryOp::And => "and rax, rdi",
      BinaryOp::Or => "or rax, rdi",
      _ => "xor rax, rdi",
    };
    self.emit(instr);
    Ok(Reg::Int)
  }

  /// Leave a value in `rax` that is zero exactly when `node` is false.
  fn emit_condition(&mut self, node: &AstNode) -> CompileResult<()> {
    if self.emit_expr(node)? == Reg::Float {
      self.emit("xorpd xmm1, xmm1");
      self.emit("ucomisd xmm0, xmm1");
      self.emit("setne al");
      self.emit("movzx rax, al");
    }
    Ok(())
  }

  /// Like [`Self::emit_condition`], but the result is exactly 0 or 1.
  fn emit_truthy(&mut self, node: &AstNode) -> CompileResult<()> {
    self.emit_condition(node)?;
    self.emit("cmp rax, 0");
    self.emit("setne al");
    self.emit("movzx rax, al");
    Ok(())
  }
}

/// `set<cc>` suffixes for a comparison: signed integer form, then the form
/// for `ucomisd` flags.
fn condition_codes(op: BinaryOp) -> (&'static str, &'static str) {
  match op {
    BinaryOp::Eq => ("e", "e"),
    BinaryOp::Ne => ("ne", "ne"),
    BinaryOp::Lt => ("l", "b"),
    BinaryOp::Le => ("le", "be"),
    BinaryOp::Gt => ("g", "a"),
    BinaryOp::Ge => ("ge", "ae"),
    _ => ("ne", "ne"),
  }
}
