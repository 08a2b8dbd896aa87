//! JavaScript runner
//!
//! Samples run with `node` inside a local project directory where the
//! configured npm packages are installed, so `require()` resolves them.
//! A sample prints a JSON envelope.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use super::process::{run_command, run_setup_command, Execution};
use super::{excerpt, parse_envelope, OutputError, ParsedResponse, SampleRunner};
use crate::common::{Config, Error, Result};
use crate::sample::Language;

pub struct NodeRunner {
    project_dir: PathBuf,
    packages: Vec<String>,
    recreate: bool,
    setup_timeout: Duration,
    sample_timeout: Duration,
    /// `node` binary, set once the project is provisioned
    node: Option<PathBuf>,
}

impl NodeRunner {
    pub fn new(config: &Config) -> Self {
        Self {
            project_dir: config.environments_dir.join(&config.node_project_name),
            packages: config.node_packages.clone(),
            recreate: config.always_create_environments,
            setup_timeout: config.environment_timeout,
            sample_timeout: config.sample_timeout,
            node: None,
        }
    }

    /// Whether every configured package is already installed
    fn packages_installed(&self) -> bool {
        let modules = self.project_dir.join("node_modules");
        modules.is_dir() && self.packages.iter().all(|pkg| modules.join(pkg).exists())
    }
}

#[async_trait]
impl SampleRunner for NodeRunner {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    async fn ensure_environment(&mut self) -> Result<()> {
        if self.node.is_some() {
            return Ok(());
        }

        let node = which::which("node").map_err(|_| Error::InterpreterNotFound("node".to_string()))?;

        if self.recreate && self.project_dir.exists() {
            debug!(path = %self.project_dir.display(), "removing existing node project");
            std::fs::remove_dir_all(&self.project_dir)?;
        }
        std::fs::create_dir_all(&self.project_dir)?;

        if !self.packages.is_empty() && !self.packages_installed() {
            let npm = which::which("npm").map_err(|_| Error::InterpreterNotFound("npm".to_string()))?;
            info!(path = %self.project_dir.display(), packages = ?self.packages, "Installing npm packages");
            let mut args = vec!["install", "--silent", "--no-audit", "--no-fund"];
            args.extend(self.packages.iter().map(String::as_str));
            run_setup_command("node", &npm, &args, Some(self.project_dir.as_path()), self.setup_timeout)
                .await?;
        } else {
            debug!(path = %self.project_dir.display(), "reusing node project");
        }

        self.node = Some(node);
        Ok(())
    }

    fn work_dir(&self) -> Option<&Path> {
        Some(self.project_dir.as_path())
    }

    async fn execute(&self, prepared: &Path) -> Result<Execution> {
        let node = self
            .node
            .as_deref()
            .ok_or_else(|| Error::provision("node", "environment not provisioned"))?;
        run_command(node, &[prepared], Some(self.project_dir.as_path()), self.sample_timeout).await
    }

    fn parse(&self, stdout: &str) -> std::result::Result<ParsedResponse, OutputError> {
        parse_node_output(stdout)
    }
}

/// Decode a printed JSON envelope
pub fn parse_node_output(stdout: &str) -> std::result::Result<ParsedResponse, OutputError> {
    let text = stdout.trim();
    let value: Value = serde_json::from_str(text)
        .map_err(|e| OutputError::Parse(format!("{} in '{}'", e, excerpt(text))))?;
    parse_envelope(value)
}
