use anyhow::Context;
use clap::{Parser, Subcommand};
use marmot::config::Config;
use marmot::store::{self, HttpModelStore, ModelStore};
use marmot::validation::runner::{self, Runner};
use marmot::validation::ValidationRun;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "marmot")]
#[command(about = "Validate, package and publish model crates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a model crate in an isolated environment
    Validate {
        /// Candidate crate directory
        path: PathBuf,
        /// Install the marmot runtime from this local checkout
        #[arg(long)]
        repo: Option<PathBuf>,
    },
    /// Validate a model crate, then package and upload it
    Upload {
        /// Candidate crate directory
        path: PathBuf,
        /// Install the marmot runtime from this local checkout
        #[arg(long)]
        repo: Option<PathBuf>,
    },
    /// List model categories available in the store
    Categories,
    /// Download and extract a published module
    Fetch {
        /// Module name as published in the store
        module: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("marmot=info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = Config::load().context("Failed to load config")?;

    match cli.command {
        Commands::Validate { path, repo } => {
            let mut runner = Runner::new(&config.validation, repo.as_deref())?;
            let scratch = runner.scratch();
            Ok(validate(&mut runner, &scratch, &path)?)
        }
        Commands::Upload { path, repo } => {
            let mut runner = Runner::new(&config.validation, repo.as_deref())?;
            let scratch = runner.scratch();
            if !validate(&mut runner, &scratch, &path)? {
                return Ok(false);
            }

            println!("==> Uploading {}", path.display());
            let store = HttpModelStore::new(&config.store);
            let name = store::publish(&store, &path, scratch.tmp_dir())
                .await
                .with_context(|| format!("Failed to upload {}", path.display()))?;
            println!("==> Published `{name}` to {}", store.base_url());
            Ok(true)
        }
        Commands::Categories => {
            let store = HttpModelStore::new(&config.store);
            let categories = store.categories().await?;

            let mut names: Vec<_> = categories.keys().collect();
            names.sort();
            for name in names {
                let versions: Vec<String> =
                    categories[name].iter().map(|v| format!("v{v}")).collect();
                println!("{name}: {}", versions.join(", "));
            }
            Ok(true)
        }
        Commands::Fetch { module } => {
            let store = HttpModelStore::new(&config.store);
            let dest_root = std::env::current_dir()?;
            let dest = store::fetch_module(&store, &module, &dest_root)
                .await
                .with_context(|| format!("Failed to fetch {module}"))?;
            println!("==> Fetched `{module}` into {}", dest.display());
            Ok(true)
        }
    }
}

/// Run the isolated validation pipeline and print the outcome
fn validate(runner: &mut Runner, scratch: &runner::Scratch, path: &Path) -> anyhow::Result<bool> {
    println!("==> Checking file requirements");
    let mut complete = true;
    for (file, present) in runner::check_file_requirements(path) {
        let mark = if present { "✔" } else { "✘" };
        println!("  {mark} {file}");
        complete &= present;
    }
    if !complete {
        println!("Required files are missing from {}", path.display());
        return Ok(false);
    }

    let run: ValidationRun = runner
        .run(scratch, path)
        .with_context(|| format!("Validation of {} did not complete", path.display()))?;

    if !run.output.is_empty() {
        println!("{}", run.output);
    }
    tracing::info!("Validation finished in state {}", run.state);

    if run.passed() {
        println!("==> Validation passed");
    } else {
        println!("==> Validation failed");
        for id in run.status.failed_models() {
            println!("  ✘ {id}");
        }
    }
    Ok(run.passed())
}
