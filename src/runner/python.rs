//! Python runner
//!
//! Samples run with the interpreter of an isolated virtual environment that
//! has the configured packages installed. A sample prints an envelope
//! either as JSON or as a Python dict.

use async_trait::async_trait;
use serde_json::Value;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use super::process::{run_command, run_setup_command, Execution};
use super::{excerpt, parse_envelope, pyliteral, OutputError, ParsedResponse, SampleRunner};
use crate::common::{Config, Error, Result};
use crate::sample::Language;

pub struct PythonRunner {
    venv_dir: PathBuf,
    packages: Vec<String>,
    recreate: bool,
    setup_timeout: Duration,
    sample_timeout: Duration,
    /// Venv interpreter, set once the environment is provisioned
    interpreter: Option<PathBuf>,
}

impl PythonRunner {
    pub fn new(config: &Config) -> Self {
        Self {
            venv_dir: config.environments_dir.join(&config.virtualenv_name),
            packages: config.python_packages.clone(),
            recreate: config.always_create_environments,
            setup_timeout: config.environment_timeout,
            sample_timeout: config.sample_timeout,
            interpreter: None,
        }
    }
}

#[async_trait]
impl SampleRunner for PythonRunner {
    fn language(&self) -> Language {
        Language::Python
    }

    async fn ensure_environment(&mut self) -> Result<()> {
        if self.interpreter.is_some() {
            return Ok(());
        }

        if self.recreate && self.venv_dir.exists() {
            debug!(path = %self.venv_dir.display(), "removing existing virtualenv");
            std::fs::remove_dir_all(&self.venv_dir)?;
        }

        let venv_python = get_venv_python(&self.venv_dir);
        if !venv_python.exists() {
            let python = find_python()?;
            info!(path = %self.venv_dir.display(), "Creating Python virtualenv");
            if let Some(parent) = self.venv_dir.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let venv_arg = self.venv_dir.as_os_str();
            run_setup_command(
                "python",
                &python,
                &[OsStr::new("-m"), OsStr::new("venv"), venv_arg],
                None,
                self.setup_timeout,
            )
            .await?;

            if !self.packages.is_empty() {
                info!(packages = ?self.packages, "Installing Python packages");
                let mut args = vec!["-m", "pip", "install", "--quiet"];
                args.extend(self.packages.iter().map(String::as_str));
                run_setup_command("python", &venv_python, &args, None, self.setup_timeout).await?;
            }
        } else {
            debug!(path = %venv_python.display(), "reusing virtualenv");
        }

        self.interpreter = Some(venv_python);
        Ok(())
    }

    async fn execute(&self, prepared: &Path) -> Result<Execution> {
        let interpreter = self
            .interpreter
            .as_deref()
            .ok_or_else(|| Error::provision("python", "environment not provisioned"))?;
        run_command(interpreter, &[prepared], None, self.sample_timeout).await
    }

    fn parse(&self, stdout: &str) -> std::result::Result<ParsedResponse, OutputError> {
        parse_python_output(stdout)
    }
}

/// Decode a printed envelope, as JSON or as a Python literal
pub fn parse_python_output(stdout: &str) -> std::result::Result<ParsedResponse, OutputError> {
    let text = stdout.trim();
    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(_) => pyliteral::parse(text)
            .map_err(|e| OutputError::Parse(format!("{} in '{}'", e, excerpt(text))))?,
    };
    parse_envelope(value)
}

/// Find a Python 3 interpreter to create the virtualenv with
fn find_python() -> Result<PathBuf> {
    ["python3", "python"]
        .iter()
        .find_map(|cmd| which::which(cmd).ok())
        .ok_or_else(|| Error::InterpreterNotFound("python3".to_string()))
}

/// Get the path to Python in a venv
fn get_venv_python(venv_dir: &Path) -> PathBuf {
    if cfg!(windows) {
        venv_dir.join("Scripts").join("python.exe")
    } else {
        venv_dir.join("bin").join("python")
    }
}
