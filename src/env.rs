use crate::error::{ArityKind, EvalError, EvalResult};
use crate::heap::Heap;
use crate::primitives;
use crate::procedure;
use crate::symbol::{sym, SymbolTable};
use crate::value::{PrimitiveId, Value};

// An environment is a chain `(frame . enclosing)` ending at the empty
// environment sentinel. A frame is `(variables . values)`, two parallel
// lists of equal length.

/// The distinguished empty environment. Distinct from Null.
pub const EMPTY_ENV: Value = Value::Pair(Heap::EMPTY_ENV);

pub fn is_empty_env(env: Value) -> bool {
    env.as_pair() == Some(Heap::EMPTY_ENV)
}

/// Build the initial global environment: one frame binding every primitive,
/// plus `true` and `false`.
pub fn build_global_env(heap: &mut Heap, symbols: &mut SymbolTable) -> EvalResult<Value> {
    let mut names = Vec::with_capacity(primitives::PRIMITIVES.len());
    let mut objects = Vec::with_capacity(primitives::PRIMITIVES.len());
    for (index, prim) in primitives::PRIMITIVES.iter().enumerate() {
        names.push(Value::Name(symbols.intern(prim.name)));
        objects.push(procedure::make_primitive(heap, PrimitiveId(index as u16))?);
    }
    let vars = heap.list(&names)?;
    let vals = heap.list(&objects)?;
    let env = extend(vars, vals, EMPTY_ENV, heap)?;

    define(Value::Name(sym::TRUE), Value::Boolean(true), env, heap)?;
    define(Value::Name(sym::FALSE), Value::Boolean(false), env, heap)?;
    Ok(env)
}

/// Cons a new frame binding `vars` to `vals` onto `base`.
pub fn extend(vars: Value, vals: Value, base: Value, heap: &mut Heap) -> EvalResult<Value> {
    let expected = heap.length(vars)?;
    let got = heap.length(vals)?;
    if expected != got {
        let kind = if got > expected {
            ArityKind::TooMany
        } else {
            ArityKind::TooFew
        };
        return Err(EvalError::Arity {
            kind,
            expected,
            got,
        });
    }
    let frame = heap.cons(vars, vals)?;
    heap.cons(frame, base)
}

/// Find the value cell bound to `name` in one frame.
/// Returns the pair of the value list whose first field holds the binding.
fn scan_frame(name: Value, frame: Value, heap: &Heap) -> EvalResult<Option<Value>> {
    let mut vars = heap.first(frame)?;
    let mut vals = heap.second(frame)?;
    while let Value::Pair(var_cell) = vars {
        if name.structural_eq(heap.car(var_cell))? {
            return Ok(Some(vals));
        }
        vars = heap.cdr(var_cell);
        vals = heap.second(vals)?;
    }
    Ok(None)
}

/// Walk the chain outward to the cell bound to `name`.
fn find_binding(name: Value, env: Value, heap: &Heap, symbols: &SymbolTable) -> EvalResult<Value> {
    let mut current = env;
    loop {
        if is_empty_env(current) {
            return Err(EvalError::UnboundVariable(describe(name, symbols)));
        }
        let frame = heap.first(current)?;
        if let Some(cell) = scan_frame(name, frame, heap)? {
            return Ok(cell);
        }
        current = heap.second(current)?;
    }
}

pub fn lookup(name: Value, env: Value, heap: &Heap, symbols: &SymbolTable) -> EvalResult<Value> {
    let cell = find_binding(name, env, heap, symbols)?;
    heap.first(cell)
}

/// `set!`: overwrite the nearest existing binding in place.
pub fn assign(
    name: Value,
    val: Value,
    env: Value,
    heap: &mut Heap,
    symbols: &SymbolTable,
) -> EvalResult<()> {
    let cell = find_binding(name, env, heap, symbols)?;
    heap.set_first(cell, val)
}

/// `define`: bind in the innermost frame only. Rebinding overwrites in
/// place, a new name is prepended to the frame.
pub fn define(name: Value, val: Value, env: Value, heap: &mut Heap) -> EvalResult<()> {
    let frame = heap.first(env)?;
    if let Some(cell) = scan_frame(name, frame, heap)? {
        return heap.set_first(cell, val);
    }
    let vars = heap.first(frame)?;
    let vals = heap.second(frame)?;
    let vars = heap.cons(name, vars)?;
    let vals = heap.cons(val, vals)?;
    heap.set_first(frame, vars)?;
    heap.set_second(frame, vals)
}

fn describe(name: Value, symbols: &SymbolTable) -> String {
    match name {
        Value::Name(id) | Value::Symbol(id) | Value::String(id) => symbols.name(id).to_string(),
        other => format!("<{}>", other.kind()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Fixture {
        heap: Heap,
        symbols: SymbolTable,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                heap: Heap::new(1024),
                symbols: SymbolTable::new(),
            }
        }

        fn name(&mut self, text: &str) -> Value {
            Value::Name(self.symbols.intern(text))
        }

        fn frame(&mut self, names: &[&str], vals: &[i64], base: Value) -> Value {
            let names: Vec<Value> = names.iter().map(|n| self.name(n)).collect();
            let vals: Vec<Value> = vals.iter().map(|&n| Value::Integer(n)).collect();
            let vars = self.heap.list(&names).unwrap();
            let vals = self.heap.list(&vals).unwrap();
            extend(vars, vals, base, &mut self.heap).unwrap()
        }

        fn lookup_int(&mut self, text: &str, env: Value) -> EvalResult<i64> {
            let name = self.name(text);
            match lookup(name, env, &self.heap, &self.symbols)? {
                Value::Integer(n) => Ok(n),
                other => panic!("expected integer, got {:?}", other),
            }
        }
    }

    #[test]
    fn lookup_walks_outward() {
        let mut fx = Fixture::new();
        let outer = fx.frame(&["x", "y"], &[1, 2], EMPTY_ENV);
        let inner = fx.frame(&["y"], &[20], outer);
        assert_eq!(fx.lookup_int("x", inner), Ok(1));
        assert_eq!(fx.lookup_int("y", inner), Ok(20));
        assert_eq!(fx.lookup_int("y", outer), Ok(2));
    }

    #[test]
    fn unbound_name_fails() {
        let mut fx = Fixture::new();
        let env = fx.frame(&["x"], &[1], EMPTY_ENV);
        assert_eq!(
            fx.lookup_int("nope", env),
            Err(EvalError::UnboundVariable("nope".into()))
        );
    }

    #[test]
    fn define_then_lookup() {
        let mut fx = Fixture::new();
        let env = fx.frame(&[], &[], EMPTY_ENV);
        let n = fx.name("n");
        assert!(lookup(n, env, &fx.heap, &fx.symbols).is_err());
        define(n, Value::Integer(5), env, &mut fx.heap).unwrap();
        assert_eq!(fx.lookup_int("n", env), Ok(5));
        define(n, Value::Integer(6), env, &mut fx.heap).unwrap();
        assert_eq!(fx.lookup_int("n", env), Ok(6));
        let frame = fx.heap.first(env).unwrap();
        let vars = fx.heap.first(frame).unwrap();
        assert_eq!(fx.heap.length(vars), Ok(1));
    }

    #[test]
    fn define_only_touches_innermost_frame() {
        let mut fx = Fixture::new();
        let outer = fx.frame(&["x"], &[1], EMPTY_ENV);
        let inner = fx.frame(&[], &[], outer);
        let x = fx.name("x");
        define(x, Value::Integer(99), inner, &mut fx.heap).unwrap();
        assert_eq!(fx.lookup_int("x", inner), Ok(99));
        assert_eq!(fx.lookup_int("x", outer), Ok(1));
    }

    #[test]
    fn assign_overwrites_nearest_binding() {
        let mut fx = Fixture::new();
        let outer = fx.frame(&["x"], &[1], EMPTY_ENV);
        let inner = fx.frame(&["y"], &[2], outer);
        let x = fx.name("x");
        assign(x, Value::Integer(7), inner, &mut fx.heap, &fx.symbols).unwrap();
        assert_eq!(fx.lookup_int("x", outer), Ok(7));

        let missing = fx.name("missing");
        assert_eq!(
            assign(missing, Value::Null, inner, &mut fx.heap, &fx.symbols),
            Err(EvalError::UnboundVariable("missing".into()))
        );
    }

    #[test]
    fn extend_reports_arity_direction() {
        let mut fx = Fixture::new();
        let a = fx.name("a");
        let vars = fx.heap.list(&[a]).unwrap();
        let two = fx.heap.list(&[Value::Integer(1), Value::Integer(2)]).unwrap();

        assert!(matches!(
            extend(vars, two, EMPTY_ENV, &mut fx.heap),
            Err(EvalError::Arity { kind: ArityKind::TooMany, expected: 1, got: 2 })
        ));
        assert!(matches!(
            extend(vars, Value::Null, EMPTY_ENV, &mut fx.heap),
            Err(EvalError::Arity { kind: ArityKind::TooFew, expected: 1, got: 0 })
        ));
        assert!(matches!(
            extend(Value::Null, vars, EMPTY_ENV, &mut fx.heap),
            Err(EvalError::Arity { kind: ArityKind::TooMany, expected: 0, got: 1 })
        ));
    }

    #[test]
    fn global_env_binds_primitives_and_booleans() {
        let mut fx = Fixture::new();
        let env = build_global_env(&mut fx.heap, &mut fx.symbols).unwrap();
        let plus = fx.name("+");
        let proc_ = lookup(plus, env, &fx.heap, &fx.symbols).unwrap();
        assert!(procedure::is_primitive(&fx.heap, proc_));
        let t = lookup(Value::Name(sym::TRUE), env, &fx.heap, &fx.symbols).unwrap();
        assert!(matches!(t, Value::Boolean(true)));
    }

    #[test]
    fn empty_env_is_not_null() {
        assert!(is_empty_env(EMPTY_ENV));
        assert!(!is_empty_env(Value::Null));
    }
}
