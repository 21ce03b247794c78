use crate::heap::Heap;
use crate::primitives;
use crate::procedure;
use crate::symbol::SymbolTable;
use crate::value::{Callable, PrimitiveId, Value};

/// Nesting (and list length) past which output is elided.
const MAX_DEPTH: usize = 1000;

/// Render a value to a string.
///
/// Compound procedures print without their environment, which would
/// otherwise contain the procedure itself.
pub fn print_val(val: Value, heap: &Heap, symbols: &SymbolTable) -> String {
    let mut out = String::new();
    print_inner(val, heap, symbols, &mut out, 0);
    out
}

fn print_inner(val: Value, heap: &Heap, symbols: &SymbolTable, out: &mut String, depth: usize) {
    if depth > MAX_DEPTH {
        out.push_str("...");
        return;
    }

    match val {
        Value::Integer(n) => out.push_str(&n.to_string()),
        Value::Float(x) => out.push_str(&format_float(x)),
        Value::Boolean(true) => out.push_str("true"),
        Value::Boolean(false) => out.push_str("false"),
        Value::String(id) => {
            out.push('"');
            out.push_str(symbols.name(id));
            out.push('"');
        }
        Value::Symbol(id) => {
            out.push('\'');
            out.push_str(symbols.name(id));
        }
        Value::Name(id) => out.push_str(symbols.name(id)),
        Value::Null => out.push_str("()"),
        Value::Function(Callable::Primitive(id)) => print_primitive(id, out),
        Value::Function(Callable::Label(label)) => out.push_str(&format!("<label {:?}>", label)),
        Value::Pair(_) => {
            if procedure::is_primitive(heap, val) {
                match procedure::implementation(heap, val) {
                    Ok(id) => print_primitive(id, out),
                    Err(_) => print_list(val, heap, symbols, out, depth),
                }
            } else if procedure::is_compound(heap, val) {
                print_compound(val, heap, symbols, out, depth);
            } else {
                print_list(val, heap, symbols, out, depth);
            }
        }
    }
}

/// Plain decimal, never exponent form; integral values keep one fractional digit.
fn format_float(x: f64) -> String {
    let mut s = x.to_string();
    if x.is_finite() && !s.contains('.') {
        s.push_str(".0");
    }
    s
}

fn print_primitive(id: PrimitiveId, out: &mut String) {
    match primitives::get(id) {
        Some(prim) => {
            out.push_str("<primitive ");
            out.push_str(prim.name);
            out.push('>');
        }
        None => out.push_str("<primitive>"),
    }
}

fn print_compound(val: Value, heap: &Heap, symbols: &SymbolTable, out: &mut String, depth: usize) {
    out.push_str("(compound-procedure ");
    match procedure::parameters(heap, val) {
        Ok(params) => print_inner(params, heap, symbols, out, depth + 1),
        Err(_) => out.push_str("?"),
    }
    out.push(' ');
    match procedure::body(heap, val) {
        Ok(body) => print_inner(body, heap, symbols, out, depth + 1),
        Err(_) => out.push_str("?"),
    }
    out.push_str(" <procedure-env>)");
}

fn print_list(val: Value, heap: &Heap, symbols: &SymbolTable, out: &mut String, depth: usize) {
    let Value::Pair(id) = val else {
        return print_inner(val, heap, symbols, out, depth);
    };
    out.push('(');
    print_inner(heap.car(id), heap, symbols, out, depth + 1);

    // Each step along the spine counts toward the limit so cyclic tails end.
    let mut current = heap.cdr(id);
    let mut steps = depth;
    loop {
        steps += 1;
        if steps > MAX_DEPTH {
            out.push_str(" ...");
            break;
        }
        match current {
            Value::Null => break,
            Value::Pair(pid) => {
                out.push(' ');
                print_inner(heap.car(pid), heap, symbols, out, depth + 1);
                current = heap.cdr(pid);
            }
            other => {
                out.push_str(" . ");
                print_inner(other, heap, symbols, out, depth + 1);
                break;
            }
        }
    }
    out.push(')');
}
