use std::fmt;

use crate::error::{EvalError, EvalResult};
use crate::eval::Label;

/// Unique identifier for an interned atom (name, quoted symbol or string text).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtomId(pub u32);

/// Index into the cons-cell heap.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairId(pub u32);

/// Index into the primitive procedure table.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimitiveId(pub u16);

/// The opaque native payload of a `Function` value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Callable {
    /// A native procedure from the primitive table.
    Primitive(PrimitiveId),
    /// A machine state the evaluator can resume at.
    Label(Label),
}

/// The fundamental value. Copy semantics: pair data lives in the heap,
/// textual data lives in the symbol table.
#[derive(Clone, Copy)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(AtomId),
    /// A quoted atom, written `'abc`.
    Symbol(AtomId),
    /// An identifier.
    Name(AtomId),
    Pair(PairId),
    Null,
    Function(Callable),
}

/// Discriminant of a [`Value`], used in diagnostics.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Kind {
    Integer,
    Float,
    Boolean,
    String,
    Symbol,
    Name,
    Pair,
    Null,
    Function,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Value {
    pub fn kind(self) -> Kind {
        match self {
            Value::Integer(_) => Kind::Integer,
            Value::Float(_) => Kind::Float,
            Value::Boolean(_) => Kind::Boolean,
            Value::String(_) => Kind::String,
            Value::Symbol(_) => Kind::Symbol,
            Value::Name(_) => Kind::Name,
            Value::Pair(_) => Kind::Pair,
            Value::Null => Kind::Null,
            Value::Function(_) => Kind::Function,
        }
    }

    pub fn is_pair(self) -> bool {
        matches!(self, Value::Pair(_))
    }

    pub fn is_null(self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_number(self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    pub fn is_string(self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_symbol(self) -> bool {
        matches!(self, Value::Symbol(_))
    }

    pub fn is_name(self) -> bool {
        matches!(self, Value::Name(_))
    }

    pub fn as_pair(self) -> Option<PairId> {
        match self {
            Value::Pair(id) => Some(id),
            _ => None,
        }
    }

    /// Numeric value promoted to floating point, or None for non-numbers.
    pub fn as_f64(self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(n as f64),
            Value::Float(x) => Some(x),
            _ => None,
        }
    }

    /// Returns true if `self` is the name `atom`.
    pub fn is_name_of(self, atom: AtomId) -> bool {
        matches!(self, Value::Name(id) if id == atom)
    }

    /// The boolean payload. Only Booleans have a truth value.
    pub fn truth(self) -> EvalResult<bool> {
        match self {
            Value::Boolean(b) => Ok(b),
            other => Err(EvalError::Type(format!(
                "truth test on {}, expected Boolean",
                other.kind()
            ))),
        }
    }

    /// Kind-sensitive scalar equality.
    ///
    /// Values of different kinds are never equal. Null and Function compare
    /// equal to any value of the same kind. Pairs are deliberately not
    /// comparable: pair graphs may be cyclic, so the language refuses
    /// structural pair comparison rather than attempting it.
    pub fn structural_eq(self, other: Value) -> EvalResult<bool> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(a == b),
            (Value::Float(a), Value::Float(b)) => Ok(a == b),
            (Value::Boolean(a), Value::Boolean(b)) => Ok(a == b),
            (Value::String(a), Value::String(b))
            | (Value::Symbol(a), Value::Symbol(b))
            | (Value::Name(a), Value::Name(b)) => Ok(a == b),
            (Value::Null, Value::Null) => Ok(true),
            (Value::Function(_), Value::Function(_)) => Ok(true),
            (Value::Pair(_), Value::Pair(_)) => {
                Err(EvalError::Type("cannot compare pairs".into()))
            }
            _ => Ok(false),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "Integer({})", n),
            Value::Float(x) => write!(f, "Float({:?})", x),
            Value::Boolean(b) => write!(f, "Boolean({})", b),
            Value::String(id) => write!(f, "String({})", id.0),
            Value::Symbol(id) => write!(f, "Symbol({})", id.0),
            Value::Name(id) => write!(f, "Name({})", id.0),
            Value::Pair(id) => write!(f, "Pair({})", id.0),
            Value::Null => write!(f, "Null"),
            Value::Function(c) => write!(f, "Function({:?})", c),
        }
    }
}

impl fmt::Debug for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AtomId({})", self.0)
    }
}

impl fmt::Debug for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PairId({})", self.0)
    }
}

impl fmt::Debug for PrimitiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrimitiveId({})", self.0)
    }
}
