use std::io::Write;

use crate::error::{ArityKind, EvalError, EvalResult};
use crate::heap::Heap;
use crate::printer;
use crate::symbol::{sym, SymbolTable};
use crate::value::{PrimitiveId, Value};

/// What a native procedure may touch while it runs.
pub struct PrimitiveContext<'a> {
    pub heap: &'a mut Heap,
    pub symbols: &'a SymbolTable,
    pub out: &'a mut dyn Write,
}

/// Native procedures receive their evaluated arguments as a proper list.
pub type PrimitiveFn = fn(&mut PrimitiveContext<'_>, Value) -> EvalResult<Value>;

pub struct Primitive {
    pub name: &'static str,
    pub func: PrimitiveFn,
}

/// Every primitive bound in the initial global frame.
pub static PRIMITIVES: &[Primitive] = &[
    Primitive { name: "+", func: prim_plus },
    Primitive { name: "-", func: prim_minus },
    Primitive { name: "*", func: prim_times },
    Primitive { name: "=", func: prim_equal },
    Primitive { name: "eq?", func: prim_equal },
    Primitive { name: ">", func: prim_greater },
    Primitive { name: "<", func: prim_less },
    Primitive { name: "or", func: prim_or },
    Primitive { name: "and", func: prim_and },
    Primitive { name: "display", func: prim_display },
    Primitive { name: "newline", func: prim_newline },
];

pub fn get(id: PrimitiveId) -> Option<&'static Primitive> {
    PRIMITIVES.get(id.0 as usize)
}

/// Dispatch a primitive call by table index.
pub fn call_primitive(id: PrimitiveId, ctx: &mut PrimitiveContext<'_>, args: Value) -> EvalResult<Value> {
    let prim = get(id)
        .ok_or_else(|| EvalError::Type(format!("no primitive at index {}", id.0)))?;
    (prim.func)(ctx, args)
}

fn ok() -> Value {
    Value::String(sym::OK)
}

fn number(op: &str, val: Value) -> EvalResult<f64> {
    val.as_f64().ok_or_else(|| {
        EvalError::Type(format!("{} is only allowed on numbers, got {}", op, val.kind()))
    })
}

fn exactly_one(ctx: &PrimitiveContext<'_>, args: Value) -> EvalResult<Value> {
    let items = ctx.heap.list_to_vec(args)?;
    match items.as_slice() {
        [a] => Ok(*a),
        _ => Err(EvalError::Arity {
            kind: if items.len() > 1 {
                ArityKind::TooMany
            } else {
                ArityKind::TooFew
            },
            expected: 1,
            got: items.len(),
        }),
    }
}

fn exactly_two(ctx: &PrimitiveContext<'_>, args: Value) -> EvalResult<(Value, Value)> {
    let items = ctx.heap.list_to_vec(args)?;
    match items.as_slice() {
        [a, b] => Ok((*a, *b)),
        _ => Err(EvalError::Arity {
            kind: if items.len() > 2 {
                ArityKind::TooMany
            } else {
                ArityKind::TooFew
            },
            expected: 2,
            got: items.len(),
        }),
    }
}

// Arithmetic always answers a Float, even for integer-only operands.

fn prim_plus(ctx: &mut PrimitiveContext<'_>, args: Value) -> EvalResult<Value> {
    let mut sum = 0.0;
    for v in ctx.heap.list_to_vec(args)? {
        sum += number("+", v)?;
    }
    Ok(Value::Float(sum))
}

fn prim_minus(ctx: &mut PrimitiveContext<'_>, args: Value) -> EvalResult<Value> {
    let items = ctx.heap.list_to_vec(args)?;
    let (first, rest) = items.split_first().ok_or(EvalError::Arity {
        kind: ArityKind::TooFew,
        expected: 1,
        got: 0,
    })?;
    let mut result = number("-", *first)?;
    for &v in rest {
        result -= number("-", v)?;
    }
    Ok(Value::Float(result))
}

fn prim_times(ctx: &mut PrimitiveContext<'_>, args: Value) -> EvalResult<Value> {
    let mut product = 1.0;
    for v in ctx.heap.list_to_vec(args)? {
        product *= number("*", v)?;
    }
    Ok(Value::Float(product))
}

/// `=` / `eq?`: numeric equality across Integer and Float, structural
/// equality otherwise.
fn prim_equal(ctx: &mut PrimitiveContext<'_>, args: Value) -> EvalResult<Value> {
    let (a, b) = exactly_two(ctx, args)?;
    let equal = match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a.structural_eq(b)?,
    };
    Ok(Value::Boolean(equal))
}

fn prim_greater(ctx: &mut PrimitiveContext<'_>, args: Value) -> EvalResult<Value> {
    let (a, b) = exactly_two(ctx, args)?;
    Ok(Value::Boolean(number("comparison", a)? > number("comparison", b)?))
}

fn prim_less(ctx: &mut PrimitiveContext<'_>, args: Value) -> EvalResult<Value> {
    let (a, b) = exactly_two(ctx, args)?;
    Ok(Value::Boolean(number("comparison", a)? < number("comparison", b)?))
}

fn prim_or(ctx: &mut PrimitiveContext<'_>, args: Value) -> EvalResult<Value> {
    let mut current = args;
    while let Value::Pair(id) = current {
        if ctx.heap.car(id).truth()? {
            return Ok(Value::Boolean(true));
        }
        current = ctx.heap.cdr(id);
    }
    Ok(Value::Boolean(false))
}

fn prim_and(ctx: &mut PrimitiveContext<'_>, args: Value) -> EvalResult<Value> {
    let mut current = args;
    while let Value::Pair(id) = current {
        if !ctx.heap.car(id).truth()? {
            return Ok(Value::Boolean(false));
        }
        current = ctx.heap.cdr(id);
    }
    Ok(Value::Boolean(true))
}

fn prim_display(ctx: &mut PrimitiveContext<'_>, args: Value) -> EvalResult<Value> {
    let val = exactly_one(ctx, args)?;
    let text = printer::print_val(val, ctx.heap, ctx.symbols);
    ctx.out.write_all(text.as_bytes())?;
    Ok(ok())
}

fn prim_newline(ctx: &mut PrimitiveContext<'_>, _args: Value) -> EvalResult<Value> {
    ctx.out.write_all(b"\n")?;
    Ok(ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Fixture {
        heap: Heap,
        symbols: SymbolTable,
        out: Vec<u8>,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                heap: Heap::new(1024),
                symbols: SymbolTable::new(),
                out: Vec::new(),
            }
        }

        fn call(&mut self, name: &str, args: &[Value]) -> EvalResult<Value> {
            let index = PRIMITIVES
                .iter()
                .position(|p| p.name == name)
                .expect("primitive exists");
            let args = self.heap.list(args).unwrap();
            let mut ctx = PrimitiveContext {
                heap: &mut self.heap,
                symbols: &self.symbols,
                out: &mut self.out,
            };
            call_primitive(PrimitiveId(index as u16), &mut ctx, args)
        }

        fn float(&mut self, name: &str, args: &[Value]) -> f64 {
            match self.call(name, args) {
                Ok(Value::Float(x)) => x,
                other => panic!("expected float, got {:?}", other),
            }
        }

        fn boolean(&mut self, name: &str, args: &[Value]) -> bool {
            match self.call(name, args) {
                Ok(Value::Boolean(b)) => b,
                other => panic!("expected boolean, got {:?}", other),
            }
        }
    }

    use Value::{Boolean as B, Float as F, Integer as I};

    #[test]
    fn arithmetic_promotes_to_float() {
        let mut fx = Fixture::new();
        assert_eq!(fx.float("+", &[I(1), I(2)]), 3.0);
        assert_eq!(fx.float("-", &[I(10), I(3), I(2)]), 5.0);
        assert_eq!(fx.float("-", &[I(4)]), 4.0);
        assert_eq!(fx.float("*", &[I(2), F(1.5)]), 3.0);
    }

    #[test]
    fn empty_sum_and_product_are_identities() {
        let mut fx = Fixture::new();
        assert_eq!(fx.float("+", &[]), 0.0);
        assert_eq!(fx.float("*", &[]), 1.0);
    }

    #[test]
    fn minus_needs_an_operand() {
        let mut fx = Fixture::new();
        assert!(matches!(
            fx.call("-", &[]),
            Err(EvalError::Arity { kind: ArityKind::TooFew, .. })
        ));
    }

    #[test]
    fn arithmetic_rejects_non_numbers() {
        let mut fx = Fixture::new();
        assert!(matches!(fx.call("+", &[I(1), B(true)]), Err(EvalError::Type(_))));
    }

    #[test]
    fn comparisons() {
        let mut fx = Fixture::new();
        assert!(fx.boolean(">", &[I(3), I(2)]));
        assert!(!fx.boolean("<", &[I(3), F(2.5)]));
        assert!(fx.boolean("=", &[I(2), F(2.0)]));
        assert!(fx.boolean("eq?", &[B(true), B(true)]));
        assert!(!fx.boolean("eq?", &[B(true), I(1)]));
        assert!(matches!(fx.call(">", &[I(1), B(false)]), Err(EvalError::Type(_))));
        assert!(matches!(
            fx.call("<", &[I(1)]),
            Err(EvalError::Arity { kind: ArityKind::TooFew, expected: 2, got: 1 })
        ));
    }

    #[test]
    fn equality_on_pairs_fails() {
        let mut fx = Fixture::new();
        let p = fx.heap.cons(I(1), I(2)).unwrap();
        assert!(matches!(fx.call("eq?", &[p, p]), Err(EvalError::Type(_))));
    }

    #[test]
    fn logic_short_circuits() {
        let mut fx = Fixture::new();
        assert!(fx.boolean("or", &[B(false), B(true), I(7)]));
        assert!(!fx.boolean("and", &[B(false), I(7)]));
        assert!(fx.boolean("and", &[]));
        assert!(!fx.boolean("or", &[]));
        assert!(matches!(fx.call("and", &[B(true), I(7)]), Err(EvalError::Type(_))));
    }

    #[test]
    fn display_and_newline_write_output() {
        let mut fx = Fixture::new();
        let result = fx.call("display", &[I(42)]).unwrap();
        assert!(matches!(result, Value::String(id) if id == sym::OK));
        fx.call("newline", &[]).unwrap();
        assert_eq!(String::from_utf8(fx.out.clone()).unwrap(), "42\n");
    }

    #[test]
    fn display_takes_exactly_one_argument() {
        let mut fx = Fixture::new();
        assert_eq!(
            fx.call("display", &[]).err(),
            Some(EvalError::Arity { kind: ArityKind::TooFew, expected: 1, got: 0 })
        );
        assert_eq!(
            fx.call("display", &[I(1), I(2)]).err(),
            Some(EvalError::Arity { kind: ArityKind::TooMany, expected: 1, got: 2 })
        );
        assert_eq!(fx.out, Vec::<u8>::new());
    }
}
