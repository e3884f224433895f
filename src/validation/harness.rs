//! Entry point of the generated check binary
//!
//! The runner generates a tiny crate whose `main` calls [`main`] with the
//! candidate's `register` function. The binary registers the candidate's models
//! into a fresh context, checks all of them and writes a [`ValidationStatus`]
//! record to the path given as its first argument.

use crate::config::Config;
use crate::context::Marmot;
use crate::error::Result;
use crate::models::registry::Registry;
use crate::validation::checker::{check_registry, ConsoleReporter, Reporter};
use crate::validation::status::ValidationStatus;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Run the harness for a candidate's `register` function
pub fn main<F>(register: F) -> ExitCode
where
    F: FnOnce(&mut Registry) -> Result<()>,
{
    let Some(status_path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        eprintln!("usage: marmot-harness <status-file>");
        return ExitCode::from(2);
    };

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Using default config: {e}");
        Config::default()
    });
    let marmot = Marmot::from_config(&config.registry);

    let status = run_in(marmot, register, &mut ConsoleReporter);
    if let Err(e) = status.save(&status_path) {
        eprintln!("Failed to write status record: {e}");
        return ExitCode::FAILURE;
    }

    if status.passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Register the candidate's models into a fresh context and check them
pub fn run<F>(register: F, reporter: &mut dyn Reporter) -> ValidationStatus
where
    F: FnOnce(&mut Registry) -> Result<()>,
{
    run_in(Marmot::new(), register, reporter)
}

/// Register the candidate's models into `marmot` and check them
pub fn run_in<F>(mut marmot: Marmot, register: F, reporter: &mut dyn Reporter) -> ValidationStatus
where
    F: FnOnce(&mut Registry) -> Result<()>,
{
    let registered = panic::catch_unwind(AssertUnwindSafe(|| register(marmot.registry_mut())));
    let failure = match registered {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(_) => Some("registration panicked".to_string()),
    };

    if let Some(error) = failure {
        reporter.notice(&format!(
            "Fatal error: Failed to load module. Please check that `register` registers \
             the models correctly.\n{error}"
        ));
        return ValidationStatus::module_failure(error);
    }

    check_registry(&mut marmot, reporter)
}

/// Source of the generated `main.rs` for a candidate crate module
#[must_use]
pub fn main_source(module: &str) -> String {
    format!(
        "// Generated by marmot for validation runs.\n\
         fn main() -> std::process::ExitCode {{\n    \
         marmot::validation::harness::main(|registry| {module}::register(registry))\n\
         }}\n"
    )
}

/// Path of the status record inside an environment directory
#[must_use]
pub fn status_path(env_dir: &Path) -> PathBuf {
    env_dir.join("status.json")
}
