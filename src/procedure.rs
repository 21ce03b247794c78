use crate::error::{EvalError, EvalResult};
use crate::heap::Heap;
use crate::symbol::sym;
use crate::syntax::is_tagged_list;
use crate::value::{Callable, PrimitiveId, Value};

// Procedures are tagged lists:
//   (primitive <function>)
//   (procedure params body env)

/// Build `(primitive <function>)`.
pub fn make_primitive(heap: &mut Heap, id: PrimitiveId) -> EvalResult<Value> {
    heap.list(&[
        Value::Name(sym::PRIMITIVE),
        Value::Function(Callable::Primitive(id)),
    ])
}

/// Build `(procedure params body env)`. The environment is captured by
/// reference, so later mutation of its frames is visible to the closure.
pub fn make_procedure(
    heap: &mut Heap,
    parameters: Value,
    body: Value,
    env: Value,
) -> EvalResult<Value> {
    heap.list(&[Value::Name(sym::PROCEDURE), parameters, body, env])
}

pub fn is_primitive(heap: &Heap, val: Value) -> bool {
    is_tagged_list(heap, val, sym::PRIMITIVE)
}

pub fn is_compound(heap: &Heap, val: Value) -> bool {
    is_tagged_list(heap, val, sym::PROCEDURE)
}

pub fn parameters(heap: &Heap, proc_: Value) -> EvalResult<Value> {
    heap.cadr(proc_)
}

pub fn body(heap: &Heap, proc_: Value) -> EvalResult<Value> {
    heap.caddr(proc_)
}

pub fn environment(heap: &Heap, proc_: Value) -> EvalResult<Value> {
    heap.cadddr(proc_)
}

/// The table index behind a primitive procedure.
pub fn implementation(heap: &Heap, proc_: Value) -> EvalResult<PrimitiveId> {
    match heap.cadr(proc_)? {
        Value::Function(Callable::Primitive(id)) => Ok(id),
        other => Err(EvalError::Type(format!(
            "primitive implementation is {}, expected Function",
            other.kind()
        ))),
    }
}
