//! Recognizers, selectors and rewriters for the special forms.
//!
//! Everything here works on plain value trees; nothing is evaluated.
//! Selectors extract parts by fixed position and fail with a type error
//! when the form is too short.

use crate::error::{EvalError, EvalResult};
use crate::heap::Heap;
use crate::symbol::sym;
use crate::value::{AtomId, Value};

/// Returns true if `val` is a pair whose first element is the name `tag`.
pub fn is_tagged_list(heap: &Heap, val: Value, tag: AtomId) -> bool {
    match val {
        Value::Pair(id) => heap.car(id).is_name_of(tag),
        _ => false,
    }
}

// ----------------------------------------------------------------------------
// Self-evaluating expressions, variables, quotations
// ----------------------------------------------------------------------------

pub fn is_self_evaluating(exp: Value) -> bool {
    matches!(
        exp,
        Value::Integer(_) | Value::Float(_) | Value::String(_) | Value::Boolean(_)
    )
}

pub fn is_variable(exp: Value) -> bool {
    exp.is_name()
}

/// A quoted atom (`'abc`) is read as a Symbol value.
pub fn is_quoted(exp: Value) -> bool {
    exp.is_symbol()
}

pub fn text_of_quotation(exp: Value) -> Value {
    exp
}

// ----------------------------------------------------------------------------
// (set! name value)
// ----------------------------------------------------------------------------

pub fn is_assignment(heap: &Heap, exp: Value) -> bool {
    is_tagged_list(heap, exp, sym::SET)
}

pub fn assignment_variable(heap: &Heap, exp: Value) -> EvalResult<Value> {
    heap.cadr(exp)
}

pub fn assignment_value(heap: &Heap, exp: Value) -> EvalResult<Value> {
    heap.caddr(exp)
}

// ----------------------------------------------------------------------------
// (define name value) | (define (name . params) . body)
// ----------------------------------------------------------------------------

pub fn is_definition(heap: &Heap, exp: Value) -> bool {
    is_tagged_list(heap, exp, sym::DEFINE)
}

pub fn definition_variable(heap: &Heap, exp: Value) -> EvalResult<Value> {
    let target = heap.cadr(exp)?;
    if target.is_name() {
        Ok(target)
    } else {
        heap.first(target)
    }
}

/// The value expression. The procedure shorthand is rewritten into a lambda.
pub fn definition_value(heap: &mut Heap, exp: Value) -> EvalResult<Value> {
    let target = heap.cadr(exp)?;
    if target.is_name() {
        heap.caddr(exp)
    } else {
        let params = heap.second(target)?;
        let body = heap.cddr(exp)?;
        make_lambda(heap, params, body)
    }
}

// ----------------------------------------------------------------------------
// (lambda params . body)
// ----------------------------------------------------------------------------

pub fn is_lambda(heap: &Heap, exp: Value) -> bool {
    is_tagged_list(heap, exp, sym::LAMBDA)
}

pub fn lambda_parameters(heap: &Heap, exp: Value) -> EvalResult<Value> {
    heap.cadr(exp)
}

pub fn lambda_body(heap: &Heap, exp: Value) -> EvalResult<Value> {
    heap.cddr(exp)
}

pub fn make_lambda(heap: &mut Heap, params: Value, body: Value) -> EvalResult<Value> {
    let rest = heap.cons(params, body)?;
    heap.cons(Value::Name(sym::LAMBDA), rest)
}

// ----------------------------------------------------------------------------
// (if predicate consequent [alternative])
// ----------------------------------------------------------------------------

pub fn is_if(heap: &Heap, exp: Value) -> bool {
    is_tagged_list(heap, exp, sym::IF)
}

pub fn if_predicate(heap: &Heap, exp: Value) -> EvalResult<Value> {
    heap.cadr(exp)
}

pub fn if_consequent(heap: &Heap, exp: Value) -> EvalResult<Value> {
    heap.caddr(exp)
}

/// The alternative, or Boolean false when the form has none.
pub fn if_alternative(heap: &Heap, exp: Value) -> EvalResult<Value> {
    let rest = heap.cdddr(exp)?;
    if rest.is_null() {
        Ok(Value::Boolean(false))
    } else {
        heap.first(rest)
    }
}

pub fn make_if(
    heap: &mut Heap,
    predicate: Value,
    consequent: Value,
    alternative: Value,
) -> EvalResult<Value> {
    heap.list(&[Value::Name(sym::IF), predicate, consequent, alternative])
}

// ----------------------------------------------------------------------------
// (begin . actions) and sequences
// ----------------------------------------------------------------------------

pub fn is_begin(heap: &Heap, exp: Value) -> bool {
    is_tagged_list(heap, exp, sym::BEGIN)
}

pub fn begin_actions(heap: &Heap, exp: Value) -> EvalResult<Value> {
    heap.second(exp)
}

pub fn is_last_exp(heap: &Heap, seq: Value) -> EvalResult<bool> {
    Ok(heap.second(seq)?.is_null())
}

pub fn first_exp(heap: &Heap, seq: Value) -> EvalResult<Value> {
    heap.first(seq)
}

pub fn rest_exps(heap: &Heap, seq: Value) -> EvalResult<Value> {
    heap.second(seq)
}

/// Collapse a body: a single expression stands alone, several are wrapped
/// in `begin`, an empty body stays Null.
pub fn sequence_to_exp(heap: &mut Heap, seq: Value) -> EvalResult<Value> {
    if seq.is_null() {
        Ok(seq)
    } else if is_last_exp(heap, seq)? {
        first_exp(heap, seq)
    } else {
        make_begin(heap, seq)
    }
}

pub fn make_begin(heap: &mut Heap, seq: Value) -> EvalResult<Value> {
    heap.cons(Value::Name(sym::BEGIN), seq)
}

// ----------------------------------------------------------------------------
// (cond (predicate . actions) ... [(else . actions)])
// ----------------------------------------------------------------------------

pub fn is_cond(heap: &Heap, exp: Value) -> bool {
    is_tagged_list(heap, exp, sym::COND)
}

pub fn cond_clauses(heap: &Heap, exp: Value) -> EvalResult<Value> {
    heap.second(exp)
}

pub fn cond_predicate(heap: &Heap, clause: Value) -> EvalResult<Value> {
    heap.first(clause)
}

pub fn cond_actions(heap: &Heap, clause: Value) -> EvalResult<Value> {
    heap.second(clause)
}

pub fn is_cond_else_clause(heap: &Heap, clause: Value) -> EvalResult<bool> {
    Ok(cond_predicate(heap, clause)?.is_name_of(sym::ELSE))
}

/// Rewrite `cond` into nested `if`s. No clause matching yields false.
pub fn cond_to_if(heap: &mut Heap, exp: Value) -> EvalResult<Value> {
    let clauses = cond_clauses(heap, exp)?;
    expand_clauses(heap, clauses)
}

fn expand_clauses(heap: &mut Heap, clauses: Value) -> EvalResult<Value> {
    let clauses = heap.list_to_vec(clauses)?;
    let last = clauses.len().saturating_sub(1);
    for (i, &clause) in clauses.iter().enumerate() {
        if is_cond_else_clause(heap, clause)? && i != last {
            return Err(EvalError::Syntax("else clause isn't last in cond".into()));
        }
        if cond_actions(heap, clause)?.is_null() {
            return Err(EvalError::Syntax("cond clause without actions".into()));
        }
    }

    let mut expansion = Value::Boolean(false);
    for &clause in clauses.iter().rev() {
        let actions = cond_actions(heap, clause)?;
        let body = sequence_to_exp(heap, actions)?;
        expansion = if is_cond_else_clause(heap, clause)? {
            body
        } else {
            let predicate = cond_predicate(heap, clause)?;
            make_if(heap, predicate, body, expansion)?
        };
    }
    Ok(expansion)
}

// ----------------------------------------------------------------------------
// (let ((name value) ...) . body)
// ----------------------------------------------------------------------------

pub fn is_let(heap: &Heap, exp: Value) -> bool {
    is_tagged_list(heap, exp, sym::LET)
}

pub fn let_bindings(heap: &Heap, exp: Value) -> EvalResult<Value> {
    heap.cadr(exp)
}

pub fn let_body(heap: &Heap, exp: Value) -> EvalResult<Value> {
    heap.cddr(exp)
}

/// Rewrite `let` into `((lambda (names...) body...) values...)`.
pub fn let_to_combination(heap: &mut Heap, exp: Value) -> EvalResult<Value> {
    let bindings = heap.list_to_vec(let_bindings(heap, exp)?)?;
    let mut names = Vec::with_capacity(bindings.len());
    let mut values = Vec::with_capacity(bindings.len());
    for binding in bindings {
        names.push(heap.first(binding)?);
        values.push(heap.cadr(binding)?);
    }
    let params = heap.list(&names)?;
    let body = let_body(heap, exp)?;
    let lambda = make_lambda(heap, params, body)?;
    let operands = heap.list(&values)?;
    make_application(heap, lambda, operands)
}

// ----------------------------------------------------------------------------
// Applications: any other pair
// ----------------------------------------------------------------------------

pub fn is_application(exp: Value) -> bool {
    exp.is_pair()
}

pub fn operator(heap: &Heap, exp: Value) -> EvalResult<Value> {
    heap.first(exp)
}

pub fn operands(heap: &Heap, exp: Value) -> EvalResult<Value> {
    heap.second(exp)
}

pub fn has_no_operands(ops: Value) -> bool {
    ops.is_null()
}

pub fn first_operand(heap: &Heap, ops: Value) -> EvalResult<Value> {
    heap.first(ops)
}

pub fn rest_operands(heap: &Heap, ops: Value) -> EvalResult<Value> {
    heap.second(ops)
}

pub fn is_last_operand(heap: &Heap, ops: Value) -> EvalResult<bool> {
    Ok(heap.second(ops)?.is_null())
}

pub fn make_application(heap: &mut Heap, operator: Value, operands: Value) -> EvalResult<Value> {
    heap.cons(operator, operands)
}
