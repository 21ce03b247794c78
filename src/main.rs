use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use regscheme::{init_tracing, EvalResult, Machine, MachineConfig, Value};

/// Run a Scheme program on the explicit-control register machine.
#[derive(Parser, Debug)]
#[command(name = "regscheme", version)]
struct Args {
    /// Source file to evaluate
    file: PathBuf,

    /// Maximum number of cons cells the heap may allocate. Cells are never
    /// reclaimed, so usage grows with every iteration, tail loops included
    #[arg(long, value_name = "N")]
    heap_cells: Option<usize>,

    /// Abort an evaluation after this many machine steps
    #[arg(long, value_name = "N")]
    max_steps: Option<u64>,

    /// Evaluate each top-level form on its own and keep going after errors
    #[arg(long)]
    per_form: bool,

    /// Print machine statistics to stderr when finished
    #[arg(long)]
    stats: bool,

    /// Log every machine step to stderr
    #[arg(long)]
    trace: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.trace);

    let source = match std::fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read {}: {}", args.file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut config = MachineConfig::default();
    if let Some(cells) = args.heap_cells {
        config.heap_capacity = cells;
    }
    if let Some(steps) = args.max_steps {
        config.max_steps = steps;
    }

    let mut machine = match Machine::new(config) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let forms = match machine.read_all(&source) {
        Ok(forms) => forms,
        Err(e) => {
            eprintln!("error: {}: {}", args.file.display(), e);
            return ExitCode::FAILURE;
        }
    };
    info!(forms = forms.len(), file = %args.file.display(), "program loaded");

    let ok = if args.per_form {
        run_per_form(&mut machine, &forms)
    } else {
        run_program(&mut machine, &forms)
    };

    let flushed = flush_output(&mut machine);
    if args.stats {
        eprintln!("{}", machine.stats());
    }
    if ok && flushed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// The whole file as one implicit `begin`; the first error aborts.
fn run_program<W: Write>(machine: &mut Machine<W>, forms: &[Value]) -> bool {
    if forms.is_empty() {
        return true;
    }
    let result: EvalResult<Value> = machine.program(forms).and_then(|p| machine.run(p));
    match result {
        Ok(_) => true,
        Err(e) => {
            flush_output(machine);
            eprintln!("error: {}", e);
            false
        }
    }
}

/// Each form separately, printing every result; errors are reported and skipped.
fn run_per_form<W: Write>(machine: &mut Machine<W>, forms: &[Value]) -> bool {
    let mut ok = true;
    for (index, &form) in forms.iter().enumerate() {
        if let Err(e) = machine.run(form) {
            flush_output(machine);
            eprintln!("error in form {}: {}", index + 1, e);
            ok = false;
        }
    }
    ok
}

/// Flush program output, reporting a failure on stderr.
fn flush_output<W: Write>(machine: &mut Machine<W>) -> bool {
    match machine.output_mut().flush() {
        Ok(()) => true,
        Err(e) => {
            eprintln!("error: cannot flush output: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use pretty_assertions::assert_eq;

    use super::*;

    /// Accepts writes but fails every flush, like a closed pipe.
    struct BrokenPipe(Vec<u8>);

    impl Write for BrokenPipe {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }
    }

    #[test]
    fn flush_failures_are_reported() {
        let mut machine =
            Machine::with_output(MachineConfig::default(), BrokenPipe(Vec::new())).unwrap();
        assert!(!flush_output(&mut machine));

        let mut machine = Machine::with_output(MachineConfig::default(), Vec::new()).unwrap();
        assert!(flush_output(&mut machine));
    }

    #[test]
    fn a_failing_form_fails_the_run() {
        let mut machine = Machine::with_output(MachineConfig::default(), Vec::new()).unwrap();
        let forms = machine.read_all("(define x 1) (nope) x").unwrap();
        assert!(!run_per_form(&mut machine, &forms));
        assert_eq!(String::from_utf8(machine.output().clone()).unwrap(), "\"ok\"\n1\n");
    }
}
