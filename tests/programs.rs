//! Whole programs driven through the public API with captured output.

use pretty_assertions::assert_eq;
use regscheme::{EvalError, EvalResult, Machine, MachineConfig};

fn machine() -> Machine<Vec<u8>> {
    Machine::with_output(MachineConfig::default(), Vec::new()).unwrap()
}

/// Run `src` the way the binary does and return (result, output).
fn run(src: &str) -> (EvalResult<()>, String) {
    let mut m = machine();
    let result = m
        .read_all(src)
        .and_then(|forms| m.program(&forms))
        .and_then(|p| m.run(p))
        .map(|_| ());
    let out = String::from_utf8(m.output().clone()).unwrap();
    (result, out)
}

fn output_of(src: &str) -> String {
    let (result, out) = run(src);
    if let Err(e) = result {
        panic!("program failed: {}\noutput so far: {}", e, out);
    }
    out
}

#[test]
fn factorial_demo() {
    assert_eq!(
        output_of(include_str!("../demos/factorial.scm")),
        "3628800.0\n3628800.0\n"
    );
}

#[test]
fn counter_demo() {
    assert_eq!(output_of(include_str!("../demos/counter.scm")), "3.0\n2.0\n");
}

#[test]
fn classify_demo() {
    assert_eq!(
        output_of(include_str!("../demos/classify.scm")),
        "'negative\n'zero\n'small\n'large\n"
    );
}

#[test]
fn mutual_recursion_in_tail_position() {
    let src = "
        (define (even? n) (if (= n 0) true (odd? (- n 1))))
        (define (odd? n) (if (= n 0) false (even? (- n 1))))
        (even? 5001)";
    assert_eq!(output_of(src), "false\n");
}

#[test]
fn higher_order_procedures() {
    let src = "
        (define (compose f g) (lambda (x) (f (g x))))
        (define (inc x) (+ x 1))
        (define (double x) (* x 2))
        ((compose inc double) 5)";
    assert_eq!(output_of(src), "11.0\n");
}

#[test]
fn accumulate_with_an_iterative_helper() {
    let src = "
        (define (sum-to n)
          (define (go i acc)
            (if (> i n) acc (go (+ i 1) (+ acc i))))
          (go 1 0))
        (sum-to 100)";
    assert_eq!(output_of(src), "5050.0\n");
}

#[test]
fn inner_define_shadows_without_touching_globals() {
    let src = "
        (define x 'global)
        (define (f) (define x 'local) x)
        (display (f))
        (newline)
        x";
    assert_eq!(output_of(src), "'local\n'global\n");
}

#[test]
fn set_reaches_the_nearest_enclosing_binding() {
    let src = "
        (define x 1)
        (define (bump) (set! x (+ x 10)))
        (bump)
        (bump)
        x";
    assert_eq!(output_of(src), "21.0\n");
}

#[test]
fn display_renders_each_kind() {
    let src = "
        (display 1) (newline)
        (display 2.5) (newline)
        (display \"text\") (newline)
        (display 'sym) (newline)
        (display true) (newline)
        (display +) (newline)
        (display (lambda (a b) a))";
    assert_eq!(
        output_of(src),
        concat!(
            "1\n2.5\n\"text\"\n'sym\ntrue\n<primitive +>\n",
            "(compound-procedure (a b) (a) <procedure-env>)",
            "\"ok\"\n",
        )
    );
}

#[test]
fn large_and_small_floats_print_in_plain_decimal() {
    let src = "(* 100000000 100000000) (display 0.00001)";
    assert_eq!(output_of(src), "10000000000000000.0\n0.00001\"ok\"\n");
}

#[test]
fn cond_without_a_match_is_false() {
    assert_eq!(output_of("(cond ((= 1 2) 'a) ((= 1 3) 'b))"), "false\n");
}

#[test]
fn let_with_body_sequence() {
    let src = "(let ((a 2) (b 3)) (display a) (newline) (* a b))";
    assert_eq!(output_of(src), "2\n6.0\n");
}

#[test]
fn errors_abort_after_partial_output() {
    let (result, out) = run("(display 'before) (newline) (car 1) (display 'after)");
    assert!(matches!(result, Err(EvalError::UnboundVariable(name)) if name == "car"));
    assert_eq!(out, "'before\n");
}

#[test]
fn applying_a_number_reports_unknown_procedure() {
    let (result, out) = run("(define x 3) (x 1)");
    assert!(matches!(result, Err(EvalError::UnknownProcedure(_))));
    assert_eq!(out, "\"unknown procedure type error\"\n");
}

#[test]
fn truth_tests_demand_booleans() {
    let (result, _) = run("(if 0 'yes 'no)");
    assert!(matches!(result, Err(EvalError::Type(_))));
}

#[test]
fn read_errors_surface_before_evaluation() {
    let (result, out) = run("(display 1) (+ 1");
    assert!(matches!(result, Err(EvalError::Read { pos: 12, .. })));
    assert_eq!(out, "");
}

#[test]
fn heap_capacity_is_enforced() {
    let config = MachineConfig {
        heap_capacity: 2_000,
        ..MachineConfig::default()
    };
    let mut m = Machine::with_output(config, Vec::new()).unwrap();
    let result = m.eval_str("(define (loop n) (if (= n 0) 'done (loop (- n 1)))) (loop 10000)");
    assert!(matches!(result, Err(EvalError::HeapOverflow(2_000))));
}

#[test]
fn forms_can_be_evaluated_one_at_a_time() {
    let mut m = machine();
    let forms = m
        .read_all("(define x 2) (undefined-thing) (* x 21)")
        .unwrap();
    let results: Vec<bool> = forms.iter().map(|&f| m.run(f).is_ok()).collect();
    assert_eq!(results, vec![true, false, true]);
    assert_eq!(
        String::from_utf8(m.output().clone()).unwrap(),
        "\"ok\"\n42.0\n"
    );
}
