//! A small Scheme dialect evaluated by an explicit-control register machine.
//!
//! Source text is read into cons cells on an arena [`heap::Heap`]; the
//! [`eval::Machine`] then walks the tree with seven registers and an explicit
//! stack instead of native recursion, so deep recursion never touches the
//! host stack and tail calls run in constant space.

pub mod env;
pub mod error;
pub mod eval;
pub mod heap;
pub mod primitives;
pub mod printer;
pub mod procedure;
pub mod reader;
pub mod registers;
pub mod symbol;
pub mod syntax;
pub mod value;

pub use error::{ArityKind, EvalError, EvalResult};
pub use eval::{Label, Machine, MachineConfig, Stats};
pub use value::Value;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install the log subscriber.
///
/// Filters come from `RUST_LOG`; nothing is installed when it is unset,
/// unless `trace_machine` asks for every machine step. Safe to call more
/// than once.
pub fn init_tracing(trace_machine: bool) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = if trace_machine {
            EnvFilter::new("regscheme=trace")
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(filter)
            .init();
    });
}
