//! Isolated validation runner
//!
//! One run walks `Init -> EnvironmentProvisioned -> DependenciesInstalled ->
//! Executed -> {Passed, Failed}`, or ends in `Aborted` when a step fails. The
//! disposable environment is a generated harness crate with its own target
//! directory, so the candidate's dependencies never touch the caller's build.
//! Child processes are awaited without a timeout.

use crate::config::schema::ValidationConfig;
use crate::error::{MarmotError, Result};
use crate::validation::harness;
use crate::validation::status::ValidationStatus;
use serde::Deserialize;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use subprocess::{Exec, Redirection};

/// Fixed name of the disposable environment directory
pub const VALIDATION_ENV_DIR: &str = ".marmot-validation-env";

/// Fixed name of the temporary working directory (archives)
pub const TMP_DIR: &str = ".marmot-tmp";

const HARNESS_PACKAGE: &str = "marmot-harness";
const SUPPORTED_PLATFORMS: &[&str] = &["linux", "macos", "windows"];

/// Files a candidate directory must contain
pub const REQUIRED_FILES: &[&str] = &["Cargo.toml", "src/lib.rs"];

/// State of a validation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    EnvironmentProvisioned,
    DependenciesInstalled,
    Executed,
    Passed,
    Failed,
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "INIT"),
            Self::EnvironmentProvisioned => write!(f, "ENVIRONMENT_PROVISIONED"),
            Self::DependenciesInstalled => write!(f, "DEPENDENCIES_INSTALLED"),
            Self::Executed => write!(f, "EXECUTED"),
            Self::Passed => write!(f, "PASSED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// Where the marmot runtime is installed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeSource {
    Registry { version: String },
    Git { url: String },
    Path(PathBuf),
}

impl RuntimeSource {
    /// Pick the source from config, with a local repository override taking precedence
    #[must_use]
    pub fn from_config(config: &ValidationConfig, repo: Option<&Path>) -> Self {
        if let Some(path) = repo.or(config.runtime_path.as_deref()) {
            return Self::Path(path.to_path_buf());
        }
        if let Some(url) = &config.runtime_git {
            return Self::Git { url: url.clone() };
        }
        Self::Registry {
            version: config
                .runtime_version
                .clone()
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
        }
    }

    fn cargo_add_args(&self) -> Vec<OsString> {
        match self {
            Self::Registry { version } => vec![format!("marmot@{version}").into()],
            Self::Git { url } => vec!["marmot".into(), "--git".into(), url.into()],
            Self::Path(path) => vec!["marmot".into(), "--path".into(), path.into()],
        }
    }
}

#[derive(Deserialize)]
struct CargoManifest {
    package: CargoPackage,
}

#[derive(Deserialize)]
struct CargoPackage {
    name: String,
}

/// A candidate crate directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub dir: PathBuf,
    pub package: String,
    pub module: String,
}

impl Candidate {
    /// Read the candidate's package name from its `Cargo.toml`
    pub fn open(dir: &Path) -> Result<Self> {
        let dir = dir.canonicalize()?;
        let manifest_path = dir.join("Cargo.toml");
        let content = fs::read_to_string(&manifest_path).map_err(|e| {
            MarmotError::ValidationExecution(format!(
                "Cannot read {}: {e}",
                manifest_path.display()
            ))
        })?;

        let manifest: CargoManifest = toml::from_str(&content).map_err(|e| {
            MarmotError::ValidationExecution(format!("Invalid candidate Cargo.toml: {e}"))
        })?;

        let package = manifest.package.name;
        Ok(Self {
            dir,
            module: package.replace('-', "_"),
            package,
        })
    }
}

/// Report which required files exist in `dir`
pub fn check_file_requirements(dir: &Path) -> Vec<(&'static str, bool)> {
    REQUIRED_FILES
        .iter()
        .map(|file| (*file, dir.join(file).exists()))
        .collect()
}

/// Disposable environment and temporary directory of one run
///
/// Both directories are removed when the value is dropped.
#[derive(Debug)]
pub struct Scratch {
    env_dir: PathBuf,
    tmp_dir: PathBuf,
}

impl Scratch {
    #[must_use]
    pub fn new(work_dir: &Path) -> Self {
        Self {
            env_dir: work_dir.join(VALIDATION_ENV_DIR),
            tmp_dir: work_dir.join(TMP_DIR),
        }
    }

    #[must_use]
    pub fn env_dir(&self) -> &Path {
        &self.env_dir
    }

    #[must_use]
    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    /// Remove both directories if present
    pub fn cleanup(&self) {
        for dir in [&self.env_dir, &self.tmp_dir] {
            if dir.exists() {
                if let Err(e) = fs::remove_dir_all(dir) {
                    tracing::warn!("Failed to remove {}: {e}", dir.display());
                }
            }
        }
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        tracing::info!("Cleaning up validation directories");
        self.cleanup();
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct ValidationRun {
    pub state: RunState,
    pub status: ValidationStatus,
    /// Combined stdout and stderr of the check process
    pub output: String,
}

impl ValidationRun {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.state == RunState::Passed
    }
}

/// Drives one validation run against a candidate directory
#[derive(Debug)]
pub struct Runner {
    cargo: Option<PathBuf>,
    work_dir: PathBuf,
    runtime: RuntimeSource,
    state: RunState,
}

impl Runner {
    /// Create a runner from config
    ///
    /// `repo` installs the runtime from a local checkout instead of the configured source.
    pub fn new(config: &ValidationConfig, repo: Option<&Path>) -> Result<Self> {
        let work_dir = match &config.work_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };

        Ok(Self {
            cargo: config.cargo.clone(),
            work_dir,
            runtime: RuntimeSource::from_config(config, repo),
            state: RunState::Init,
        })
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Scratch directories for a run rooted at the work dir
    #[must_use]
    pub fn scratch(&self) -> Scratch {
        Scratch::new(&self.work_dir)
    }

    /// Validate a candidate in a scratch area that is torn down before returning
    pub fn validate(&mut self, candidate_dir: &Path) -> Result<ValidationRun> {
        let scratch = self.scratch();
        self.run(&scratch, candidate_dir)
    }

    /// Validate a candidate inside `scratch`
    ///
    /// The environment directory is removed before returning; the temporary
    /// directory is left for packaging and removed when `scratch` drops.
    pub fn run(&mut self, scratch: &Scratch, candidate_dir: &Path) -> Result<ValidationRun> {
        self.state = RunState::Init;

        let result = self.run_steps(scratch, candidate_dir);
        if result.is_err() {
            self.transition(RunState::Aborted);
        }

        if scratch.env_dir().exists() {
            if let Err(e) = fs::remove_dir_all(scratch.env_dir()) {
                tracing::warn!("Failed to remove {}: {e}", scratch.env_dir().display());
            }
        }

        result
    }

    fn run_steps(&mut self, scratch: &Scratch, candidate_dir: &Path) -> Result<ValidationRun> {
        let candidate = Candidate::open(candidate_dir)?;
        let env_dir = scratch.env_dir();

        self.provision(env_dir)?;
        self.install(env_dir, &candidate)?;
        let output = self.execute(env_dir, &candidate)?;

        let status = ValidationStatus::load(&harness::status_path(env_dir)).map_err(|e| {
            MarmotError::ValidationExecution(format!("{e}\n\nCheck process output:\n{output}"))
        })?;

        let state = if status.passed {
            RunState::Passed
        } else {
            RunState::Failed
        };
        self.transition(state);

        Ok(ValidationRun {
            state,
            status,
            output,
        })
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!("Validation run {} -> {}", self.state, next);
        self.state = next;
    }

    fn cargo_path(&self) -> Result<PathBuf> {
        if let Some(cargo) = &self.cargo {
            return Ok(cargo.clone());
        }
        which::which("cargo").map_err(|_| {
            MarmotError::EnvironmentProvision("cargo binary not found in PATH".to_string())
        })
    }

    /// Create a fresh harness crate at the fixed environment path
    ///
    /// The manifest is written directly with its own `[workspace]` table, so an
    /// enclosing cargo workspace never picks the harness up as a member.
    fn provision(&mut self, env_dir: &Path) -> Result<()> {
        let os = std::env::consts::OS;
        if !SUPPORTED_PLATFORMS.contains(&os) {
            return Err(MarmotError::EnvironmentProvision(format!(
                "OS not supported: {os}"
            )));
        }

        let (ok, output) = self
            .cargo(env_dir, &[OsString::from("--version")])
            .map_err(MarmotError::EnvironmentProvision)?;
        if !ok {
            return Err(MarmotError::EnvironmentProvision(output));
        }
        tracing::debug!("Using {output}");

        if env_dir.exists() {
            fs::remove_dir_all(env_dir)?;
        }

        println!(
            "==> Creating new environment for validation ({})",
            env_dir.display()
        );

        fs::create_dir_all(env_dir.join("src"))?;
        fs::write(env_dir.join("Cargo.toml"), harness_manifest())?;
        fs::write(env_dir.join("src").join("main.rs"), "fn main() {}\n")?;

        self.transition(RunState::EnvironmentProvisioned);
        Ok(())
    }

    /// Install the runtime, then the candidate and its declared dependencies
    fn install(&mut self, env_dir: &Path, candidate: &Candidate) -> Result<()> {
        let manifest = env_dir.join("Cargo.toml");

        println!("==> Installing marmot runtime");
        let mut args = manifest_args("add", &manifest);
        args.extend(self.runtime.cargo_add_args());
        self.install_step(env_dir, "runtime", &args)?;

        println!("==> Installing candidate `{}`", candidate.package);
        let mut args = manifest_args("add", &manifest);
        args.extend([
            OsString::from(&candidate.package),
            "--path".into(),
            candidate.dir.clone().into(),
        ]);
        self.install_step(env_dir, "candidate", &args)?;

        self.install_step(env_dir, "fetch", &manifest_args("fetch", &manifest))?;

        self.transition(RunState::DependenciesInstalled);
        Ok(())
    }

    fn install_step(&self, env_dir: &Path, step: &str, args: &[OsString]) -> Result<()> {
        let (ok, output) = self
            .cargo(env_dir, args)
            .map_err(|output| MarmotError::DependencyInstall {
                step: step.to_string(),
                output,
            })?;
        if !ok {
            return Err(MarmotError::DependencyInstall {
                step: step.to_string(),
                output,
            });
        }
        Ok(())
    }

    /// Build and run the harness binary, returning its combined output
    fn execute(&mut self, env_dir: &Path, candidate: &Candidate) -> Result<String> {
        fs::write(
            env_dir.join("src").join("main.rs"),
            harness::main_source(&candidate.module),
        )?;

        println!("==> Checking models of `{}`", candidate.package);
        let manifest = env_dir.join("Cargo.toml");
        let mut args = manifest_args("run", &manifest);
        args.extend([
            "--quiet".into(),
            "--".into(),
            harness::status_path(env_dir).into(),
        ]);

        let (_, output) = self
            .cargo(env_dir, &args)
            .map_err(MarmotError::ValidationExecution)?;

        self.transition(RunState::Executed);
        Ok(output)
    }

    /// Run cargo, returning (success, combined stdout and stderr)
    fn cargo(&self, env_dir: &Path, args: &[OsString]) -> std::result::Result<(bool, String), String> {
        let cargo = self.cargo_path().map_err(|e| e.to_string())?;
        tracing::debug!("Running {} {:?}", cargo.display(), args);

        let capture = Exec::cmd(&cargo)
            .args(args)
            .env("CARGO_TARGET_DIR", env_dir.join("target"))
            .cwd(&self.work_dir)
            .stdout(Redirection::Pipe)
            .stderr(Redirection::Merge)
            .capture()
            .map_err(|e| format!("Failed to spawn {}: {e}", cargo.display()))?;

        Ok((capture.success(), capture.stdout_str().trim().to_string()))
    }
}

/// Manifest of the harness crate, a workspace root of its own
fn harness_manifest() -> String {
    format!(
        "[package]\n\
         name = \"{HARNESS_PACKAGE}\"\n\
         version = \"0.0.0\"\n\
         edition = \"2021\"\n\
         publish = false\n\
         \n\
         [workspace]\n\
         \n\
         [dependencies]\n"
    )
}

fn manifest_args(command: &str, manifest: &Path) -> Vec<OsString> {
    vec![command.into(), "--manifest-path".into(), manifest.into()]
}
