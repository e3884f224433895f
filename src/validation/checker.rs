//! Contract checker
//!
//! Exercises the minimal model contract: `get_output` must be implemented and the
//! model must produce output for its own dummy input without failing. Output is
//! never compared against `dummy_output`. Failures, including panics, are
//! reported and folded into the returned boolean; nothing is raised to the caller.

use crate::context::Marmot;
use crate::error::ModelError;
use crate::models::model::LoadedModel;
use crate::models::spec::{Kwargs, ModelSpec};
use crate::validation::status::{CheckOutcome, ModelReport, ValidationStatus};
use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Notice printed once when any model in a batch fails
pub const FATAL_NOTICE: &str = "Fatal error: Models are not wrapped correctly. \
Please refer to the documentation and messages above and fix accordingly.";

/// Sink for check outcomes
pub trait Reporter {
    fn report(&mut self, outcome: &CheckOutcome);

    /// Free-form line (headers, load failures, the fatal notice)
    fn notice(&mut self, _message: &str) {}
}

/// Prints ✔/✘ lines to stdout
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&mut self, outcome: &CheckOutcome) {
        let mark = if outcome.passed { "✔" } else { "✘" };
        println!("  {mark} {}", outcome.detail);
    }

    fn notice(&mut self, message: &str) {
        println!("{message}");
    }
}

/// Collects outcomes in memory
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub outcomes: Vec<CheckOutcome>,
    pub notices: Vec<String>,
}

impl Reporter for RecordingReporter {
    fn report(&mut self, outcome: &CheckOutcome) {
        self.outcomes.push(outcome.clone());
    }

    fn notice(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions {
    /// Stop after the first failed check
    pub short_circuit: bool,
}

/// Run the contract checks against `model`
pub fn validate(model: &LoadedModel, options: CheckOptions, reporter: &mut dyn Reporter) -> bool {
    let implemented = check_implemented(model, reporter);
    if !implemented && options.short_circuit {
        return false;
    }

    let output = check_output(model, reporter);
    implemented && output
}

fn check_implemented(model: &LoadedModel, reporter: &mut dyn Reporter) -> bool {
    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| model.get_output(&Value::Null))) {
        Ok(Err(ModelError::NotImplemented(_))) => {
            CheckOutcome::fail("get_output", "get_output is not implemented")
        }
        // Any other result, including a failure on the empty input, counts as implemented
        _ => CheckOutcome::pass("get_output", "get_output is implemented"),
    };

    reporter.report(&outcome);
    outcome.passed
}

fn check_output(model: &LoadedModel, reporter: &mut dyn Reporter) -> bool {
    let input = model.dummy_input().unwrap_or(Value::Null);

    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| model.get_output(&input))) {
        Ok(Ok(_)) => CheckOutcome::pass("output", "model generates output correctly"),
        Ok(Err(e)) => CheckOutcome::fail("output", format!("model output error ({e})")),
        Err(payload) => CheckOutcome::fail(
            "output",
            format!("model output error (panicked: {})", panic_message(payload.as_ref())),
        ),
    };

    reporter.report(&outcome);
    outcome.passed
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Load and check every registered model
///
/// One model failing never stops the batch. The fatal notice is emitted once at
/// the end when anything failed.
pub fn check_registry(marmot: &mut Marmot, reporter: &mut dyn Reporter) -> ValidationStatus {
    // Load registered specs directly; their ids may contain `:`
    let specs: Vec<Arc<ModelSpec>> = marmot
        .registry()
        .ids()
        .filter_map(|id| marmot.registry().lookup(id))
        .collect();
    let mut reports = Vec::with_capacity(specs.len());

    for spec in specs {
        let id = spec.id().to_string();
        reporter.notice(&format!("==> Checking model `{id}`"));

        let model = match marmot.load(spec, Kwargs::new()) {
            Ok(model) => model,
            Err(e) => {
                reporter.notice(&format!(
                    "  Error: Cannot load model {id}. Check if the entry point is defined correctly. {e}"
                ));
                reports.push(ModelReport {
                    id,
                    loaded: false,
                    error: Some(e.to_string()),
                    checks: Vec::new(),
                });
                continue;
            }
        };

        let mut recorder = RecordingReporter::default();
        validate(&model, CheckOptions { short_circuit: true }, &mut recorder);
        for outcome in &recorder.outcomes {
            reporter.report(outcome);
        }

        reports.push(ModelReport {
            id,
            loaded: true,
            error: None,
            checks: recorder.outcomes,
        });
    }

    let status = ValidationStatus::from_reports(reports);
    if !status.passed {
        reporter.notice(FATAL_NOTICE);
    }
    status
}
