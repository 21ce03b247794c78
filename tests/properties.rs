use proptest::prelude::*;

use regscheme::env;
use regscheme::heap::Heap;
use regscheme::symbol::SymbolTable;
use regscheme::{ArityKind, EvalError, Machine, MachineConfig, Value};

fn ints(heap: &mut Heap, xs: &[i64]) -> Value {
    let items: Vec<Value> = xs.iter().map(|&n| Value::Integer(n)).collect();
    heap.list(&items).unwrap()
}

fn to_ints(heap: &Heap, list: Value) -> Vec<i64> {
    heap.list_to_vec(list)
        .unwrap()
        .into_iter()
        .map(|v| match v {
            Value::Integer(n) => n,
            other => panic!("expected integer, got {:?}", other),
        })
        .collect()
}

fn eval_float(src: &str) -> f64 {
    let mut m = Machine::with_output(MachineConfig::default(), Vec::new()).unwrap();
    match m.eval_str(src) {
        Ok(Value::Float(x)) => x,
        other => panic!("expected float from {}, got {:?}", src, other),
    }
}

proptest! {
    #[test]
    fn append_concatenates_and_preserves_inputs(
        a in prop::collection::vec(any::<i64>(), 0..20),
        b in prop::collection::vec(any::<i64>(), 0..20),
    ) {
        let mut heap = Heap::new(1024);
        let l1 = ints(&mut heap, &a);
        let l2 = ints(&mut heap, &b);
        let joined = heap.append(l1, l2).unwrap();

        prop_assert_eq!(heap.length(joined).unwrap(), a.len() + b.len());
        let expected: Vec<i64> = a.iter().chain(b.iter()).copied().collect();
        prop_assert_eq!(to_ints(&heap, joined), expected);
        prop_assert_eq!(to_ints(&heap, l1), a);
        prop_assert_eq!(to_ints(&heap, l2), b);
    }

    #[test]
    fn extend_rejects_mismatched_lengths(vars in 0usize..8, vals in 0usize..8) {
        let mut heap = Heap::new(1024);
        let mut symbols = SymbolTable::new();
        let names: Vec<Value> = (0..vars)
            .map(|i| Value::Name(symbols.intern(&format!("v{}", i))))
            .collect();
        let values: Vec<Value> = (0..vals).map(|i| Value::Integer(i as i64)).collect();
        let names = heap.list(&names).unwrap();
        let values = heap.list(&values).unwrap();

        let result = env::extend(names, values, env::EMPTY_ENV, &mut heap);
        if vars == vals {
            prop_assert!(result.is_ok());
        } else {
            let kind = if vals > vars { ArityKind::TooMany } else { ArityKind::TooFew };
            prop_assert_eq!(
                result.err(),
                Some(EvalError::Arity { kind, expected: vars, got: vals })
            );
        }
    }

    #[test]
    fn define_makes_an_unbound_name_visible(n in "[a-z]{1,8}", v in any::<i64>()) {
        let mut heap = Heap::new(1024);
        let mut symbols = SymbolTable::new();
        let env = env::build_global_env(&mut heap, &mut symbols).unwrap();
        let name = Value::Name(symbols.intern(&format!("user-{}", n)));

        let before = env::lookup(name, env, &heap, &symbols);
        prop_assert!(matches!(before, Err(EvalError::UnboundVariable(_))));

        env::define(name, Value::Integer(v), env, &mut heap).unwrap();
        let after = env::lookup(name, env, &heap, &symbols);
        prop_assert!(matches!(after, Ok(Value::Integer(x)) if x == v));
    }

    #[test]
    fn arithmetic_always_yields_floats(a in -10_000i64..10_000, b in -10_000i64..10_000) {
        prop_assert_eq!(eval_float(&format!("(+ {} {})", a, b)), (a + b) as f64);
        prop_assert_eq!(eval_float(&format!("(- {} {})", a, b)), (a - b) as f64);
        prop_assert_eq!(eval_float(&format!("(* {} {})", a, b)), (a * b) as f64);
    }

    #[test]
    fn let_is_an_immediately_applied_lambda(a in -1_000i64..1_000, b in -1_000i64..1_000) {
        let via_let = eval_float(&format!("(let ((x {}) (y {})) (- x y))", a, b));
        let via_lambda = eval_float(&format!("((lambda (x y) (- x y)) {} {})", a, b));
        prop_assert_eq!(via_let, via_lambda);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn tail_recursion_depth_is_independent_of_iterations(n in 1u32..3_000) {
        let depth = |count: u32| {
            let mut m = Machine::with_output(MachineConfig::default(), Vec::new()).unwrap();
            let src = format!(
                "(define (loop i) (if (= i 0) 'done (loop (- i 1)))) (loop {})",
                count
            );
            m.eval_str(&src).unwrap();
            m.stack.max_depth()
        };
        prop_assert_eq!(depth(n), depth(1));
    }
}
