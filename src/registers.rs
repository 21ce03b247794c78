use std::fmt;

use crate::error::{EvalError, EvalResult};
use crate::value::Value;

/// The machine's register names.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Register {
    /// Expression under evaluation.
    Exp,
    /// Current environment.
    Env,
    /// Unevaluated remainder: parameters, operands or body.
    Unev,
    /// Accumulated argument list.
    Argl,
    /// Procedure being applied.
    Proc,
    /// Where to resume once `val` is ready.
    Cont,
    /// Last computed result.
    Val,
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Register::Exp => "exp",
            Register::Env => "env",
            Register::Unev => "unev",
            Register::Argl => "argl",
            Register::Proc => "proc",
            Register::Cont => "cont",
            Register::Val => "val",
        };
        f.write_str(name)
    }
}

/// The register file. Each register holds exactly one value at a time.
#[derive(Clone, Copy, Debug)]
pub struct Registers {
    pub exp: Value,
    pub env: Value,
    pub unev: Value,
    pub argl: Value,
    pub proc_: Value,
    pub cont: Value,
    pub val: Value,
}

impl Registers {
    pub fn new() -> Self {
        Registers {
            exp: Value::Null,
            env: Value::Null,
            unev: Value::Null,
            argl: Value::Null,
            proc_: Value::Null,
            cont: Value::Null,
            val: Value::Null,
        }
    }

    pub fn get(&self, reg: Register) -> Value {
        match reg {
            Register::Exp => self.exp,
            Register::Env => self.env,
            Register::Unev => self.unev,
            Register::Argl => self.argl,
            Register::Proc => self.proc_,
            Register::Cont => self.cont,
            Register::Val => self.val,
        }
    }

    pub fn set(&mut self, reg: Register, value: Value) {
        let slot = match reg {
            Register::Exp => &mut self.exp,
            Register::Env => &mut self.env,
            Register::Unev => &mut self.unev,
            Register::Argl => &mut self.argl,
            Register::Proc => &mut self.proc_,
            Register::Cont => &mut self.cont,
            Register::Val => &mut self.val,
        };
        *slot = value;
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

/// A group of registers saved and restored as one unit.
///
/// `save` pushes the registers in listed order and `restore` pops them in
/// reverse, so the two halves of a save/restore pair can never disagree on
/// ordering as long as both name the same group.
#[derive(Clone, Copy, Debug)]
pub struct Snapshot {
    pub name: &'static str,
    pub registers: &'static [Register],
}

impl Snapshot {
    pub const fn new(name: &'static str, registers: &'static [Register]) -> Self {
        Snapshot { name, registers }
    }
}

/// The continuation of the caller, kept across a whole application or `begin`.
pub const CALLER: Snapshot = Snapshot::new("caller", &[Register::Cont]);
/// Environment and operand list kept across evaluation of the operator.
pub const OPERATOR: Snapshot = Snapshot::new("operator", &[Register::Env, Register::Unev]);
/// The procedure kept across evaluation of its operands.
pub const PROCEDURE: Snapshot = Snapshot::new("procedure", &[Register::Proc]);
/// The arguments accumulated so far, kept across evaluation of the next operand.
pub const ARGUMENTS: Snapshot = Snapshot::new("arguments", &[Register::Argl]);
/// Environment and remaining operands kept across a non-final operand.
pub const OPERAND: Snapshot = Snapshot::new("operand", &[Register::Env, Register::Unev]);
/// Remaining body and environment kept across a non-final body expression.
pub const SEQUENCE: Snapshot = Snapshot::new("sequence", &[Register::Unev, Register::Env]);
/// The whole `if` form kept across evaluation of its predicate.
pub const IF_DECISION: Snapshot =
    Snapshot::new("if-decision", &[Register::Exp, Register::Env, Register::Cont]);
/// Target name kept across evaluation of the value of `set!` or `define`.
pub const BINDING: Snapshot =
    Snapshot::new("binding", &[Register::Unev, Register::Env, Register::Cont]);

/// One saved register value, tagged with the register it came from.
#[derive(Clone, Copy, Debug)]
pub struct Saved {
    pub register: Register,
    pub value: Value,
}

/// The explicit control stack.
#[derive(Default)]
pub struct Stack {
    items: Vec<Saved>,
    pushes: u64,
    max_depth: usize,
}

impl Stack {
    pub fn new() -> Self {
        Stack::default()
    }

    /// Empty the stack and reset its statistics.
    pub fn initialize(&mut self) {
        self.items.clear();
        self.pushes = 0;
        self.max_depth = 0;
    }

    pub fn push(&mut self, register: Register, value: Value) {
        self.items.push(Saved { register, value });
        self.pushes += 1;
        self.max_depth = self.max_depth.max(self.items.len());
    }

    /// Pop the top entry, which must have been saved from `register`.
    pub fn pop(&mut self, register: Register) -> EvalResult<Value> {
        let top = self.items.pop().ok_or(EvalError::StackUnderflow(register))?;
        if top.register != register {
            return Err(EvalError::StackDiscipline {
                expected: register,
                found: top.register,
            });
        }
        Ok(top.value)
    }

    /// Push every register of `group`, in order.
    pub fn save(&mut self, group: Snapshot, regs: &Registers) {
        for &reg in group.registers {
            self.push(reg, regs.get(reg));
        }
    }

    /// Pop every register of `group`, in reverse order, back into `regs`.
    pub fn restore(&mut self, group: Snapshot, regs: &mut Registers) -> EvalResult<()> {
        for &reg in group.registers.iter().rev() {
            let value = self.pop(reg)?;
            regs.set(reg, value);
        }
        Ok(())
    }

    pub fn depth(&self) -> usize {
        self.items.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn total_pushes(&self) -> u64 {
        self.pushes
    }
}
