//! Shell runner
//!
//! Shell samples are `curl` invocations run with `bash`. They print the
//! raw HTTP response (`curl -i`), which is parsed as a status line, headers
//! and a JSON body.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

use super::process::{run_command, Execution};
use super::{excerpt, OutputError, ParsedResponse, SampleRunner};
use crate::common::{Config, Result};
use crate::sample::Language;

static STATUS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^HTTP/\S+ (\d{3})(?:\s|$)").expect("valid regex"));

pub struct ShellRunner {
    sample_timeout: Duration,
    bash: Option<PathBuf>,
}

impl ShellRunner {
    pub fn new(config: &Config) -> Self {
        Self {
            sample_timeout: config.sample_timeout,
            bash: None,
        }
    }

    fn bash(&self) -> &Path {
        self.bash.as_deref().unwrap_or(Path::new("bash"))
    }
}

#[async_trait]
impl SampleRunner for ShellRunner {
    fn language(&self) -> Language {
        Language::Shell
    }

    async fn ensure_environment(&mut self) -> Result<()> {
        if self.bash.is_none() {
            let bash = which::which("bash").unwrap_or_else(|_| PathBuf::from("bash"));
            debug!(path = %bash.display(), "using bash");
            self.bash = Some(bash);
        }
        Ok(())
    }

    async fn execute(&self, prepared: &Path) -> Result<Execution> {
        run_command(self.bash(), &[prepared], None, self.sample_timeout).await
    }

    fn parse(&self, stdout: &str) -> std::result::Result<ParsedResponse, OutputError> {
        parse_http_response(stdout)
    }
}

/// Parse a raw HTTP response as printed by `curl -i`
///
/// Interim `1xx` responses are skipped. A 204 has no body. A body that is
/// not JSON is a parse error unless the status already reports an error,
/// in which case the body is dropped and the status is kept.
pub fn parse_http_response(stdout: &str) -> std::result::Result<ParsedResponse, OutputError> {
    let text = stdout.replace('\r', "");
    let mut rest = text.trim_start();

    loop {
        let (head, body) = rest.split_once("\n\n").unwrap_or((rest, ""));
        let status_line = head.lines().next().unwrap_or_default();
        let caps = STATUS_LINE.captures(status_line).ok_or_else(|| {
            OutputError::Parse(format!("no HTTP status line in '{}'", excerpt(status_line)))
        })?;
        let status: u16 = caps[1]
            .parse()
            .map_err(|_| OutputError::Parse(format!("invalid status code '{}'", &caps[1])))?;

        let body = body.trim();
        if (100..200).contains(&status) && STATUS_LINE.is_match(body) {
            rest = body;
            continue;
        }

        if status == 204 {
            return Ok(ParsedResponse { body: None, status });
        }
        if body.is_empty() {
            if status >= 400 {
                return Ok(ParsedResponse { body: None, status });
            }
            return Err(OutputError::Parse(format!("empty body with status {}", status)));
        }

        return match serde_json::from_str::<Value>(body) {
            Ok(value) => Ok(ParsedResponse { body: Some(value), status }),
            Err(_) if status >= 400 => Ok(ParsedResponse { body: None, status }),
            Err(e) => Err(OutputError::Parse(format!(
                "body is not JSON ({}): '{}'",
                e,
                excerpt(body)
            ))),
        };
    }
}
