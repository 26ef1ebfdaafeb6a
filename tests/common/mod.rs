//! Interpreter for the x86-64 subset the code generator emits, so tests can
//! check what a compiled program computes without assembling it.

#![allow(dead_code)]

use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
enum Flags {
  Unset,
  Int(i64, i64),
  Float(f64, f64),
}

#[derive(Debug)]
pub struct Machine {
  pub rax: u64,
  rdi: u64,
  xmm: [f64; 2],
  stack: Vec<u64>,
  memory: HashMap<String, u64>,
  addresses: HashMap<String, u64>,
  flags: Flags,
  /// Labels written by store instructions, in execution order.
  pub stores: Vec<String>,
}

impl Machine {
  pub fn exit_value(&self) -> i64 {
    self.rax as i64
  }

  pub fn quad(&self, label: &str) -> i64 {
    self.memory[label] as i64
  }

  pub fn double(&self, label: &str) -> f64 {
    f64::from_bits(self.memory[label])
  }

  fn mem_label(operand: &str) -> Option<&str> {
    operand
      .strip_prefix("[rip + ")
      .and_then(|rest| rest.strip_suffix(']'))
  }

  fn xmm_index(operand: &str) -> usize {
    match operand {
      "xmm0" => 0,
      "xmm1" => 1,
      other => panic!("unknown xmm register {other}"),
    }
  }

  fn top(&mut self) -> &mut u64 {
    self.stack.last_mut().expect("stack underflow")
  }

  fn condition(&self, cc: &str) -> bool {
    match self.flags {
      Flags::Int(a, b) => match cc {
        "e" => a == b,
        "ne" => a != b,
        "l" => a < b,
        "le" => a <= b,
        "g" => a > b,
        "ge" => a >= b,
        "b" => (a as u64) < (b as u64),
        "be" => (a as u64) <= (b as u64),
        "a" => (a as u64) > (b as u64),
        "ae" => (a as u64) >= (b as u64),
        other => panic!("unknown condition {other}"),
      },
      Flags::Float(a, b) => match cc {
        "e" => a == b,
        "ne" => a != b,
        "b" => a < b,
        "be" => a <= b,
        "a" => a > b,
        "ae" => a >= b,
        other => panic!("condition {other} after ucomisd"),
      },
      Flags::Unset => panic!("flags read before being set"),
    }
  }
}

struct Instr {
  op: String,
  args: Vec<String>,
}

/// Load data sections, then execute `main` until `ret`.
pub fn run(asm: &str) -> Machine {
  let mut machine = Machine {
    rax: 0,
    rdi: 0,
    xmm: [0.0; 2],
    stack: Vec::new(),
    memory: HashMap::new(),
    addresses: HashMap::new(),
    flags: Flags::Unset,
    stores: Vec::new(),
  };

  let mut code = Vec::new();
  let mut labels = HashMap::new();
  let mut in_text = false;

  for raw in asm.lines() {
    let line = raw.trim();
    if line.is_empty() {
      continue;
    }
    if line == "main:" {
      in_text = true;
      continue;
    }
    if line.starts_with('.') {
      continue;
    }
    if let Some((label, directive)) = line.split_once(": .") {
      let address = 0x1000 + 8 * machine.addresses.len() as u64;
      machine.addresses.insert(label.to_string(), address);
      let (kind, value) = directive.split_once(' ').expect("directive value");
      let bits = match kind {
        "double" => value.parse::<f64>().expect("double").to_bits(),
        "quad" => value.parse::<i64>().expect("quad") as u64,
        "string" => address,
        other => panic!("unknown directive .{other}"),
      };
      machine.memory.insert(label.to_string(), bits);
      continue;
    }
    assert!(in_text, "instruction outside main: {line}");
    if let Some(label) = line.strip_suffix(':') {
      labels.insert(label.to_string(), code.len());
      continue;
    }
    let (op, rest) = line.split_once(' ').unwrap_or((line, ""));
    let args = rest
      .split(',')
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(String::from)
      .collect();
    code.push(Instr {
      op: op.to_string(),
      args,
    });
  }

  let mut pc = 0;
  let mut steps = 0;
  loop {
    steps += 1;
    assert!(steps < 100_000, "program did not terminate");
    let instr = code.get(pc).expect("fell off the end of main");
    pc += 1;
    let a: Vec<&str> = instr.args.iter().map(String::as_str).collect();

    match (instr.op.as_str(), a.as_slice()) {
      ("ret", []) => break,
      ("mov", ["rax", src]) => {
        machine.rax = match Machine::mem_label(src) {
          Some(label) => machine.memory[label],
          None => src.parse::<i64>().expect("immediate") as u64,
        };
      }
      ("mov", [dst, "rax"]) => {
        let label = Machine::mem_label(dst).expect("store target");
        machine.memory.insert(label.to_string(), machine.rax);
        machine.stores.push(label.to_string());
      }
      ("movsd", ["[rsp]", "xmm0"]) => {
        let bits = machine.xmm[0].to_bits();
        *machine.top() = bits;
      }
      ("movsd", ["xmm1", "[rsp]"]) => machine.xmm[1] = f64::from_bits(*machine.top()),
      ("movsd", [dst, "xmm0"]) => {
        let label = Machine::mem_label(dst).expect("store target");
        machine
          .memory
          .insert(label.to_string(), machine.xmm[0].to_bits());
        machine.stores.push(label.to_string());
      }
      ("movsd", [reg, src]) => {
        let label = Machine::mem_label(src).expect("load source");
        machine.xmm[Machine::xmm_index(reg)] = f64::from_bits(machine.memory[label]);
      }
      ("lea", ["rax", src]) => {
        let label = Machine::mem_label(src).expect("address");
        machine.rax = machine.addresses[label];
      }
      ("push", ["rax"]) => machine.stack.push(machine.rax),
      ("pop", ["rdi"]) => machine.rdi = machine.stack.pop().expect("stack underflow"),
      ("sub", ["rsp", "8"]) => machine.stack.push(0),
      ("add", ["rsp", "8"]) => {
        machine.stack.pop().expect("stack underflow");
      }
      ("add", ["rax", "rdi"]) => machine.rax = machine.rax.wrapping_add(machine.rdi),
      ("sub", ["rax", "rdi"]) => machine.rax = machine.rax.wrapping_sub(machine.rdi),
      ("imul", ["rax", "rdi"]) => {
        machine.rax = (machine.rax as i64).wrapping_mul(machine.rdi as i64) as u64
      }
      ("cqo", []) => {}
      ("idiv", ["rdi"]) => machine.rax = ((machine.rax as i64) / (machine.rdi as i64)) as u64,
      ("and", ["rax", "rdi"]) => machine.rax &= machine.rdi,
      ("or", ["rax", "rdi"]) => machine.rax |= machine.rdi,
      ("xor", ["rax", "rdi"]) => machine.rax ^= machine.rdi,
      ("addsd", ["xmm0", "xmm1"]) => machine.xmm[0] += machine.xmm[1],
      ("subsd", ["xmm0", "xmm1"]) => machine.xmm[0] -= machine.xmm[1],
      ("mulsd", ["xmm0", "xmm1"]) => machine.xmm[0] *= machine.xmm[1],
      ("divsd", ["xmm0", "xmm1"]) => machine.xmm[0] /= machine.xmm[1],
      ("cmp", ["rax", "rdi"]) => machine.flags = Flags::Int(machine.rax as i64, machine.rdi as i64),
      ("cmp", ["rax", "0"]) => machine.flags = Flags::Int(machine.rax as i64, 0),
      ("ucomisd", ["xmm0", "xmm1"]) => machine.flags = Flags::Float(machine.xmm[0], machine.xmm[1]),
      ("xorpd", ["xmm1", "xmm1"]) => machine.xmm[1] = 0.0,
      (set, ["al"]) if set.starts_with("set") => {
        let bit = u64::from(machine.condition(&set[3..]));
        machine.rax = (machine.rax & !0xff) | bit;
      }
      ("movzx", ["rax", "al"]) => machine.rax &= 0xff,
      ("cvtsi2sd", ["xmm0", "rax"]) => machine.xmm[0] = machine.rax as i64 as f64,
      ("cvttsd2si", ["rax", "xmm0"]) => machine.rax = machine.xmm[0].trunc() as i64 as u64,
      ("neg", ["rax"]) => machine.rax = (machine.rax as i64).wrapping_neg() as u64,
      ("movq", ["rax", "xmm0"]) => machine.rax = machine.xmm[0].to_bits(),
      ("movq", ["xmm0", "rax"]) => machine.xmm[0] = f64::from_bits(machine.rax),
      ("btc", ["rax", "63"]) => machine.rax ^= 1 << 63,
      ("je", [target]) => {
        if machine.condition("e") {
          pc = labels[*target];
        }
      }
      ("jmp", [target]) => pc = labels[*target],
      (op, args) => panic!("unsupported instruction: {op} {args:?}"),
    }
  }

  assert!(machine.stack.is_empty(), "unbalanced stack at exit");
  machine
}
