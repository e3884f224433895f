//! Model validation: in-process contract checks and the isolated runner

pub mod checker;
pub mod harness;
pub mod runner;
pub mod status;

pub use checker::{check_registry, validate, CheckOptions, ConsoleReporter, RecordingReporter, Reporter};
pub use runner::{Candidate, RunState, Runner, RuntimeSource, Scratch, ValidationRun};
pub use status::{CheckOutcome, ModelReport, ValidationStatus};
