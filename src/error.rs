use std::fmt;

use crate::registers::Register;

/// Which side of a parameter/argument mismatch was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArityKind {
    TooMany,
    TooFew,
}

impl fmt::Display for ArityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArityKind::TooMany => write!(f, "too many"),
            ArityKind::TooFew => write!(f, "too few"),
        }
    }
}

/// Errors raised while reading or evaluating a program.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// An operation was applied to a value of the wrong kind.
    #[error("type error: {0}")]
    Type(String),

    /// Lookup or assignment of a name bound nowhere in the environment chain.
    #[error("unbound variable: {0}")]
    UnboundVariable(String),

    /// Parameter/argument count mismatch.
    #[error("{kind} arguments supplied: expected {expected}, got {got}")]
    Arity {
        kind: ArityKind,
        expected: usize,
        got: usize,
    },

    /// Malformed special or derived form.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Dispatch fell through every recognized expression type.
    #[error("unknown expression type: {0}")]
    UnknownExpression(String),

    /// The operator evaluated to something that is neither primitive nor compound.
    #[error("unknown procedure type: {0}")]
    UnknownProcedure(String),

    /// Malformed source text.
    #[error("read error at byte {pos}: {message}")]
    Read { pos: usize, message: String },

    /// Step counter exhausted; likely an infinite loop.
    #[error("step limit of {0} exceeded")]
    StepLimit(u64),

    /// Heap capacity exceeded.
    #[error("heap capacity of {0} cells exceeded")]
    HeapOverflow(usize),

    /// Failure writing program output.
    #[error("i/o error: {0}")]
    Io(String),

    /// A restore popped an entry saved from a different register.
    #[error("stack discipline violated: restoring {expected} but top of stack holds {found}")]
    StackDiscipline { expected: Register, found: Register },

    /// A restore found the stack empty.
    #[error("stack underflow while restoring {0}")]
    StackUnderflow(Register),
}

impl From<std::io::Error> for EvalError {
    fn from(err: std::io::Error) -> Self {
        EvalError::Io(err.to_string())
    }
}

pub type EvalResult<T> = Result<T, EvalError>;
