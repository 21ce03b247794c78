use std::fmt;
use std::io::{self, Write};

use tracing::{debug, trace, warn};

use crate::env;
use crate::error::{EvalError, EvalResult};
use crate::heap::Heap;
use crate::primitives::{self, PrimitiveContext};
use crate::printer;
use crate::procedure;
use crate::reader::Reader;
use crate::registers::{
    Registers, Snapshot, Stack, ARGUMENTS, BINDING, CALLER, IF_DECISION, OPERAND, OPERATOR,
    PROCEDURE, SEQUENCE,
};
use crate::symbol::{sym, SymbolTable};
use crate::syntax;
use crate::value::{Callable, Value};

/// Tunables for a machine instance.
#[derive(Clone, Copy, Debug)]
pub struct MachineConfig {
    /// Maximum number of cons cells the heap may hold.
    pub heap_capacity: usize,
    /// Maximum number of machine steps per top-level evaluation.
    pub max_steps: u64,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            heap_capacity: 16 * 1024 * 1024,
            max_steps: u64::MAX,
        }
    }
}

/// Counters describing the last top-level evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stats {
    pub steps: u64,
    pub total_pushes: u64,
    pub max_depth: usize,
    pub heap_cells: usize,
    pub atoms: usize,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "steps={} pushes={} max-depth={} heap-cells={} atoms={}",
            self.steps, self.total_pushes, self.max_depth, self.heap_cells, self.atoms
        )
    }
}

/// A state the machine can be in. Every handler ends by naming the next one.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Label {
    EvalDispatch,
    EvSelfEval,
    EvVariable,
    EvQuoted,
    EvAssignment,
    EvAssignmentDone,
    EvDefinition,
    EvDefinitionDone,
    EvIf,
    EvIfDecide,
    EvIfConsequent,
    EvIfAlternative,
    EvLambda,
    EvBegin,
    EvCond,
    EvLet,
    EvApplication,
    EvApplDidOperator,
    EvApplOperandLoop,
    EvApplAccumulateArg,
    EvApplLastArg,
    EvApplAccumLastArg,
    ApplyDispatch,
    PrimitiveApply,
    CompoundApply,
    EvSequence,
    EvSequenceContinue,
    EvSequenceLastExp,
    UnknownExpressionType,
    UnknownProcedureType,
    SignalError,
    PrintResult,
    Done,
}

fn label(l: Label) -> Value {
    Value::Function(Callable::Label(l))
}

/// The explicit-control evaluation machine.
/// All interpreter state lives here: heap, atoms, registers and stack.
pub struct Machine<W: Write = io::Stdout> {
    pub heap: Heap,
    pub symbols: SymbolTable,
    /// The global environment, shared by every top-level evaluation.
    pub global_env: Value,
    pub regs: Registers,
    pub stack: Stack,

    /// Steps taken by the current (or last) top-level evaluation.
    steps: u64,
    max_steps: u64,
    /// Set when the machine is routed to `signal-error`.
    fault: Option<EvalError>,
    out: W,
}

impl Machine<io::Stdout> {
    /// A machine writing to standard output.
    pub fn new(config: MachineConfig) -> EvalResult<Self> {
        Machine::with_output(config, io::stdout())
    }
}

impl<W: Write> Machine<W> {
    pub fn with_output(config: MachineConfig, out: W) -> EvalResult<Self> {
        let mut heap = Heap::new(config.heap_capacity);
        let mut symbols = SymbolTable::new();
        let global_env = env::build_global_env(&mut heap, &mut symbols)?;
        Ok(Machine {
            heap,
            symbols,
            global_env,
            regs: Registers::new(),
            stack: Stack::new(),
            steps: 0,
            max_steps: config.max_steps,
            fault: None,
            out,
        })
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn output_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn stats(&self) -> Stats {
        Stats {
            steps: self.steps,
            total_pushes: self.stack.total_pushes(),
            max_depth: self.stack.max_depth(),
            heap_cells: self.heap.total_cells(),
            atoms: self.symbols.count(),
        }
    }

    /// Parse every top-level form of `src` into the heap.
    pub fn read_all(&mut self, src: &str) -> EvalResult<Vec<Value>> {
        Reader::new(src, &mut self.heap, &mut self.symbols).read_all()
    }

    /// Wrap top-level forms in an implicit `begin`.
    pub fn program(&mut self, forms: &[Value]) -> EvalResult<Value> {
        let seq = self.heap.list(forms)?;
        syntax::make_begin(&mut self.heap, seq)
    }

    /// Read and evaluate a whole program, returning the last value.
    pub fn eval_str(&mut self, src: &str) -> EvalResult<Value> {
        let forms = self.read_all(src)?;
        let program = self.program(&forms)?;
        self.eval(program)
    }

    /// Evaluate `expr` in the global environment and return the result.
    pub fn eval(&mut self, expr: Value) -> EvalResult<Value> {
        self.start(expr, Label::Done)
    }

    /// Evaluate `expr` and print the result through the `print-result` state.
    pub fn run(&mut self, expr: Value) -> EvalResult<Value> {
        self.start(expr, Label::PrintResult)
    }

    /// Render a value the way `display` does.
    pub fn render(&self, val: Value) -> String {
        printer::print_val(val, &self.heap, &self.symbols)
    }

    // ========================================================================
    // The trampoline
    // ========================================================================

    fn start(&mut self, expr: Value, finish: Label) -> EvalResult<Value> {
        self.stack.initialize();
        self.steps = 0;
        self.fault = None;
        self.regs.exp = expr;
        self.regs.env = self.global_env;
        self.regs.cont = label(finish);
        debug!(heap_cells = self.heap.total_cells(), "evaluation started");

        let mut next = Label::EvalDispatch;
        while next != Label::Done {
            self.steps += 1;
            if self.steps > self.max_steps {
                return Err(EvalError::StepLimit(self.max_steps));
            }
            trace!(state = ?next, depth = self.stack.depth(), "step");
            next = self.step(next)?;
        }

        debug!(
            steps = self.steps,
            max_depth = self.stack.max_depth(),
            "evaluation finished"
        );
        match self.fault.take() {
            Some(err) => Err(err),
            None => Ok(self.regs.val),
        }
    }

    fn step(&mut self, state: Label) -> EvalResult<Label> {
        match state {
            Label::EvalDispatch => self.eval_dispatch(),
            Label::EvSelfEval => self.ev_self_eval(),
            Label::EvVariable => self.ev_variable(),
            Label::EvQuoted => self.ev_quoted(),
            Label::EvAssignment => self.ev_assignment(),
            Label::EvAssignmentDone => self.ev_assignment_done(),
            Label::EvDefinition => self.ev_definition(),
            Label::EvDefinitionDone => self.ev_definition_done(),
            Label::EvIf => self.ev_if(),
            Label::EvIfDecide => self.ev_if_decide(),
            Label::EvIfConsequent => self.ev_if_consequent(),
            Label::EvIfAlternative => self.ev_if_alternative(),
            Label::EvLambda => self.ev_lambda(),
            Label::EvBegin => self.ev_begin(),
            Label::EvCond => self.ev_cond(),
            Label::EvLet => self.ev_let(),
            Label::EvApplication => self.ev_application(),
            Label::EvApplDidOperator => self.ev_appl_did_operator(),
            Label::EvApplOperandLoop => self.ev_appl_operand_loop(),
            Label::EvApplAccumulateArg => self.ev_appl_accumulate_arg(),
            Label::EvApplLastArg => self.ev_appl_last_arg(),
            Label::EvApplAccumLastArg => self.ev_appl_accum_last_arg(),
            Label::ApplyDispatch => self.apply_dispatch(),
            Label::PrimitiveApply => self.primitive_apply(),
            Label::CompoundApply => self.compound_apply(),
            Label::EvSequence => self.ev_sequence(),
            Label::EvSequenceContinue => self.ev_sequence_continue(),
            Label::EvSequenceLastExp => self.ev_sequence_last_exp(),
            Label::UnknownExpressionType => self.unknown_expression_type(),
            Label::UnknownProcedureType => self.unknown_procedure_type(),
            Label::SignalError => self.signal_error(),
            Label::PrintResult => self.print_result(),
            Label::Done => Ok(Label::Done),
        }
    }

    fn save(&mut self, group: Snapshot) {
        self.stack.save(group, &self.regs);
    }

    fn restore(&mut self, group: Snapshot) -> EvalResult<()> {
        self.stack.restore(group, &mut self.regs)
    }

    /// Jump to whatever label the `cont` register holds.
    fn resume(&self) -> EvalResult<Label> {
        match self.regs.cont {
            Value::Function(Callable::Label(l)) => Ok(l),
            other => Err(EvalError::Type(format!(
                "cont register holds {}, expected a label",
                other.kind()
            ))),
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Classify `exp`. The order matters: application is the fallback for
    /// every pair, so it is tested last.
    fn eval_dispatch(&mut self) -> EvalResult<Label> {
        let exp = self.regs.exp;
        let heap = &self.heap;
        let next = if syntax::is_self_evaluating(exp) {
            Label::EvSelfEval
        } else if syntax::is_variable(exp) {
            Label::EvVariable
        } else if syntax::is_quoted(exp) {
            Label::EvQuoted
        } else if syntax::is_assignment(heap, exp) {
            Label::EvAssignment
        } else if syntax::is_definition(heap, exp) {
            Label::EvDefinition
        } else if syntax::is_if(heap, exp) {
            Label::EvIf
        } else if syntax::is_lambda(heap, exp) {
            Label::EvLambda
        } else if syntax::is_begin(heap, exp) {
            Label::EvBegin
        } else if syntax::is_cond(heap, exp) {
            Label::EvCond
        } else if syntax::is_let(heap, exp) {
            Label::EvLet
        } else if syntax::is_application(exp) {
            Label::EvApplication
        } else {
            Label::UnknownExpressionType
        };
        Ok(next)
    }

    fn ev_self_eval(&mut self) -> EvalResult<Label> {
        self.regs.val = self.regs.exp;
        self.resume()
    }

    fn ev_variable(&mut self) -> EvalResult<Label> {
        self.regs.val = env::lookup(self.regs.exp, self.regs.env, &self.heap, &self.symbols)?;
        self.resume()
    }

    fn ev_quoted(&mut self) -> EvalResult<Label> {
        self.regs.val = syntax::text_of_quotation(self.regs.exp);
        self.resume()
    }

    fn ev_lambda(&mut self) -> EvalResult<Label> {
        self.regs.unev = syntax::lambda_parameters(&self.heap, self.regs.exp)?;
        self.regs.exp = syntax::lambda_body(&self.heap, self.regs.exp)?;
        self.regs.val =
            procedure::make_procedure(&mut self.heap, self.regs.unev, self.regs.exp, self.regs.env)?;
        self.resume()
    }

    // Derived forms are rewritten in place and dispatched again under the
    // same continuation, so they keep tail position.

    fn ev_cond(&mut self) -> EvalResult<Label> {
        self.regs.exp = syntax::cond_to_if(&mut self.heap, self.regs.exp)?;
        Ok(Label::EvalDispatch)
    }

    fn ev_let(&mut self) -> EvalResult<Label> {
        self.regs.exp = syntax::let_to_combination(&mut self.heap, self.regs.exp)?;
        Ok(Label::EvalDispatch)
    }

    // ========================================================================
    // Applications
    // ========================================================================

    fn ev_application(&mut self) -> EvalResult<Label> {
        self.regs.unev = syntax::operands(&self.heap, self.regs.exp)?;
        self.save(CALLER);
        self.save(OPERATOR);
        self.regs.exp = syntax::operator(&self.heap, self.regs.exp)?;
        self.regs.cont = label(Label::EvApplDidOperator);
        Ok(Label::EvalDispatch)
    }

    fn ev_appl_did_operator(&mut self) -> EvalResult<Label> {
        self.restore(OPERATOR)?;
        self.regs.argl = Value::Null;
        self.regs.proc_ = self.regs.val;
        if syntax::has_no_operands(self.regs.unev) {
            return Ok(Label::ApplyDispatch);
        }
        self.save(PROCEDURE);
        Ok(Label::EvApplOperandLoop)
    }

    fn ev_appl_operand_loop(&mut self) -> EvalResult<Label> {
        self.save(ARGUMENTS);
        self.regs.exp = syntax::first_operand(&self.heap, self.regs.unev)?;
        if syntax::is_last_operand(&self.heap, self.regs.unev)? {
            return Ok(Label::EvApplLastArg);
        }
        self.save(OPERAND);
        self.regs.cont = label(Label::EvApplAccumulateArg);
        Ok(Label::EvalDispatch)
    }

    fn ev_appl_accumulate_arg(&mut self) -> EvalResult<Label> {
        self.restore(OPERAND)?;
        self.restore(ARGUMENTS)?;
        self.regs.argl = self.adjoin_arg(self.regs.val, self.regs.argl)?;
        self.regs.unev = syntax::rest_operands(&self.heap, self.regs.unev)?;
        Ok(Label::EvApplOperandLoop)
    }

    /// The last operand needs neither `env` nor `unev` afterwards.
    fn ev_appl_last_arg(&mut self) -> EvalResult<Label> {
        self.regs.cont = label(Label::EvApplAccumLastArg);
        Ok(Label::EvalDispatch)
    }

    fn ev_appl_accum_last_arg(&mut self) -> EvalResult<Label> {
        self.restore(ARGUMENTS)?;
        self.regs.argl = self.adjoin_arg(self.regs.val, self.regs.argl)?;
        self.restore(PROCEDURE)?;
        Ok(Label::ApplyDispatch)
    }

    fn adjoin_arg(&mut self, arg: Value, argl: Value) -> EvalResult<Value> {
        let single = self.heap.list(&[arg])?;
        self.heap.append(argl, single)
    }

    // From here on the caller's continuation is on top of the stack.

    fn apply_dispatch(&mut self) -> EvalResult<Label> {
        let proc_ = self.regs.proc_;
        if procedure::is_primitive(&self.heap, proc_) {
            Ok(Label::PrimitiveApply)
        } else if procedure::is_compound(&self.heap, proc_) {
            Ok(Label::CompoundApply)
        } else {
            Ok(Label::UnknownProcedureType)
        }
    }

    fn primitive_apply(&mut self) -> EvalResult<Label> {
        let id = procedure::implementation(&self.heap, self.regs.proc_)?;
        let mut ctx = PrimitiveContext {
            heap: &mut self.heap,
            symbols: &self.symbols,
            out: &mut self.out,
        };
        self.regs.val = primitives::call_primitive(id, &mut ctx, self.regs.argl)?;
        self.restore(CALLER)?;
        self.resume()
    }

    /// Bind parameters in a new frame over the captured environment and run
    /// the body. No save here: the body's last expression resumes the
    /// caller directly, which keeps tail calls in constant stack.
    fn compound_apply(&mut self) -> EvalResult<Label> {
        let proc_ = self.regs.proc_;
        self.regs.unev = procedure::parameters(&self.heap, proc_)?;
        self.regs.env = procedure::environment(&self.heap, proc_)?;
        self.regs.env = env::extend(self.regs.unev, self.regs.argl, self.regs.env, &mut self.heap)?;
        self.regs.unev = procedure::body(&self.heap, proc_)?;
        Ok(Label::EvSequence)
    }

    // ========================================================================
    // Sequences
    // ========================================================================

    fn ev_begin(&mut self) -> EvalResult<Label> {
        self.regs.unev = syntax::begin_actions(&self.heap, self.regs.exp)?;
        self.save(CALLER);
        Ok(Label::EvSequence)
    }

    fn ev_sequence(&mut self) -> EvalResult<Label> {
        if self.regs.unev.is_null() {
            return Err(EvalError::Syntax("empty sequence".into()));
        }
        self.regs.exp = syntax::first_exp(&self.heap, self.regs.unev)?;
        if syntax::is_last_exp(&self.heap, self.regs.unev)? {
            return Ok(Label::EvSequenceLastExp);
        }
        self.save(SEQUENCE);
        self.regs.cont = label(Label::EvSequenceContinue);
        Ok(Label::EvalDispatch)
    }

    fn ev_sequence_continue(&mut self) -> EvalResult<Label> {
        self.restore(SEQUENCE)?;
        self.regs.unev = syntax::rest_exps(&self.heap, self.regs.unev)?;
        Ok(Label::EvSequence)
    }

    fn ev_sequence_last_exp(&mut self) -> EvalResult<Label> {
        self.restore(CALLER)?;
        Ok(Label::EvalDispatch)
    }

    // ========================================================================
    // Conditionals
    // ========================================================================

    fn ev_if(&mut self) -> EvalResult<Label> {
        self.save(IF_DECISION);
        self.regs.cont = label(Label::EvIfDecide);
        self.regs.exp = syntax::if_predicate(&self.heap, self.regs.exp)?;
        Ok(Label::EvalDispatch)
    }

    fn ev_if_decide(&mut self) -> EvalResult<Label> {
        self.restore(IF_DECISION)?;
        if self.regs.val.truth()? {
            Ok(Label::EvIfConsequent)
        } else {
            Ok(Label::EvIfAlternative)
        }
    }

    fn ev_if_consequent(&mut self) -> EvalResult<Label> {
        self.regs.exp = syntax::if_consequent(&self.heap, self.regs.exp)?;
        Ok(Label::EvalDispatch)
    }

    fn ev_if_alternative(&mut self) -> EvalResult<Label> {
        self.regs.exp = syntax::if_alternative(&self.heap, self.regs.exp)?;
        Ok(Label::EvalDispatch)
    }

    // ========================================================================
    // Assignment and definition
    // ========================================================================

    fn ev_assignment(&mut self) -> EvalResult<Label> {
        self.regs.unev = syntax::assignment_variable(&self.heap, self.regs.exp)?;
        self.regs.exp = syntax::assignment_value(&self.heap, self.regs.exp)?;
        self.save(BINDING);
        self.regs.cont = label(Label::EvAssignmentDone);
        Ok(Label::EvalDispatch)
    }

    fn ev_assignment_done(&mut self) -> EvalResult<Label> {
        self.restore(BINDING)?;
        env::assign(
            self.regs.unev,
            self.regs.val,
            self.regs.env,
            &mut self.heap,
            &self.symbols,
        )?;
        self.regs.val = Value::String(sym::OK);
        self.resume()
    }

    fn ev_definition(&mut self) -> EvalResult<Label> {
        self.regs.unev = syntax::definition_variable(&self.heap, self.regs.exp)?;
        self.regs.exp = syntax::definition_value(&mut self.heap, self.regs.exp)?;
        self.save(BINDING);
        self.regs.cont = label(Label::EvDefinitionDone);
        Ok(Label::EvalDispatch)
    }

    fn ev_definition_done(&mut self) -> EvalResult<Label> {
        self.restore(BINDING)?;
        env::define(self.regs.unev, self.regs.val, self.regs.env, &mut self.heap)?;
        self.regs.val = Value::String(sym::OK);
        self.resume()
    }

    // ========================================================================
    // Error states and termination
    // ========================================================================

    fn unknown_expression_type(&mut self) -> EvalResult<Label> {
        self.fault = Some(EvalError::UnknownExpression(self.render(self.regs.exp)));
        self.regs.val = Value::String(sym::UNKNOWN_EXPRESSION);
        Ok(Label::SignalError)
    }

    fn unknown_procedure_type(&mut self) -> EvalResult<Label> {
        self.restore(CALLER)?;
        self.fault = Some(EvalError::UnknownProcedure(self.render(self.regs.proc_)));
        self.regs.val = Value::String(sym::UNKNOWN_PROCEDURE);
        Ok(Label::SignalError)
    }

    fn signal_error(&mut self) -> EvalResult<Label> {
        if let Some(fault) = &self.fault {
            warn!(%fault, "machine halted");
        }
        self.user_print(self.regs.val)?;
        Ok(Label::Done)
    }

    fn print_result(&mut self) -> EvalResult<Label> {
        self.user_print(self.regs.val)?;
        Ok(Label::Done)
    }

    fn user_print(&mut self, val: Value) -> EvalResult<()> {
        let text = self.render(val);
        writeln!(self.out, "{}", text)?;
        Ok(())
    }
}
