//! Per-language sample execution
//!
//! Every language implements [`SampleRunner`]: provision an environment
//! once, write a substituted copy of the sample, run it under a timeout and
//! turn its stdout into a [`ParsedResponse`]. [`run_sample`] drives those
//! steps and assembles the [`ExecutionOutcome`] the same way for every
//! language.

pub mod node;
pub mod process;
pub mod pyliteral;
pub mod python;
pub mod shell;
pub mod substitution;

pub use process::{CommandResult, Execution};
pub use substitution::SubstitutionSet;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempPath;
use thiserror::Error;
use tracing::{debug, warn};

use crate::common::{Config, Result};
use crate::edn;
use crate::sample::{Language, Sample};

/// Why a sample failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// The process exceeded its wall-clock budget
    Timeout,
    /// The process exited with a non-zero status
    NonZeroExit,
    /// The output could not be decoded at all
    ParseError,
    /// The output decoded but lacked required fields
    SchemaMismatch,
    /// The response carried a status of 400 or above
    BadRequest,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Timeout => "timeout",
            FailureReason::NonZeroExit => "non-zero exit",
            FailureReason::ParseError => "parse error",
            FailureReason::SchemaMismatch => "schema mismatch",
            FailureReason::BadRequest => "bad request",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Problems decoding a sample's stdout
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OutputError {
    #[error("cannot parse output: {0}")]
    Parse(String),

    #[error("output does not conform to the expected format: {0}")]
    Schema(String),
}

impl OutputError {
    pub fn reason(&self) -> FailureReason {
        match self {
            OutputError::Parse(_) => FailureReason::ParseError,
            OutputError::Schema(_) => FailureReason::SchemaMismatch,
        }
    }
}

/// Normalized response printed by a sample
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub body: Option<Value>,
    pub status: u16,
}

/// Result of executing one sample
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub sample: Sample,
    pub passed: bool,
    pub status: Option<u16>,
    /// Parsed response body; attribute renames are applied when stored
    pub body: Option<Value>,
    /// Raw process result, absent on timeout
    pub command: Option<CommandResult>,
    pub reason: Option<FailureReason>,
    /// Human readable detail for a failure
    pub detail: Option<String>,
    /// The substituted source that was executed
    pub source_code: String,
    pub duration: Duration,
}

/// A substituted copy of a sample on disk
///
/// The file is removed when this value is dropped.
#[derive(Debug)]
pub struct PreparedSample {
    pub path: TempPath,
    pub source: String,
}

/// Write `source` into a fresh temporary file in `dir` (or the system temp
/// dir) whose name ends with `suffix`
pub fn write_prepared(dir: Option<&Path>, suffix: &str, source: String) -> Result<PreparedSample> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("sample-").suffix(suffix);
    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    file.write_all(source.as_bytes())?;
    file.flush()?;

    Ok(PreparedSample {
        path: file.into_temp_path(),
        source,
    })
}

/// Capability shared by all language runners
#[async_trait]
pub trait SampleRunner: Send + Sync {
    fn language(&self) -> Language;

    /// Provision the execution environment; repeated calls are no-ops
    async fn ensure_environment(&mut self) -> Result<()>;

    /// Directory prepared samples are written to
    fn work_dir(&self) -> Option<&Path> {
        None
    }

    /// Write a substituted copy of the sample's source
    fn prepare(&self, sample: &Sample, subs: &SubstitutionSet) -> Result<PreparedSample> {
        let source = subs.apply(&sample.source()?);
        let suffix = match sample.path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!(".{}", ext),
            None => ".sh".to_string(),
        };
        write_prepared(self.work_dir(), &suffix, source)
    }

    /// Run a prepared sample under the runner's timeout
    async fn execute(&self, prepared: &Path) -> Result<Execution>;

    /// Decode the sample's stdout
    fn parse(&self, stdout: &str) -> std::result::Result<ParsedResponse, OutputError>;
}

/// Create the runner for a language
pub fn runner_for(language: Language, config: &Config) -> Box<dyn SampleRunner> {
    match language {
        Language::JavaScript => Box::new(node::NodeRunner::new(config)),
        Language::Python => Box::new(python::PythonRunner::new(config)),
        Language::Shell => Box::new(shell::ShellRunner::new(config)),
    }
}

/// Run one sample end to end
///
/// `subs` holds configuration, ancestor and prerequisite substitutions;
/// example values from the sample's companion file are merged on top.
/// A sample that cannot be read, prepared or spawned fails like one that
/// exits non-zero, with the error as its detail, so the session moves on.
pub async fn run_sample(
    runner: &dyn SampleRunner,
    sample: &Sample,
    subs: SubstitutionSet,
    companion_file_name: &str,
) -> ExecutionOutcome {
    let started = Instant::now();
    match try_run_sample(runner, sample, subs, companion_file_name, started).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(sample = %sample, "Sample could not be run: {}", e);
            ExecutionOutcome {
                sample: sample.clone(),
                passed: false,
                status: None,
                body: None,
                command: None,
                reason: Some(FailureReason::NonZeroExit),
                detail: Some(format!("could not run sample: {}", e)),
                source_code: String::new(),
                duration: started.elapsed(),
            }
        }
    }
}

async fn try_run_sample(
    runner: &dyn SampleRunner,
    sample: &Sample,
    mut subs: SubstitutionSet,
    companion_file_name: &str,
    started: Instant,
) -> Result<ExecutionOutcome> {
    let raw = sample.source()?;
    if let Some(dir) = sample.path.parent() {
        let companion = dir.join(companion_file_name);
        match edn::load_examples(&companion) {
            Ok(examples) => subs.merge(substitution::example_substitutions(&raw, &examples)),
            Err(e) => warn!(sample = %sample, "Ignoring companion file: {}", e),
        }
    }
    debug!(sample = %sample, substitutions = subs.len(), "preparing sample");

    let prepared = runner.prepare(sample, &subs)?;
    let execution = runner.execute(&prepared.path).await?;
    let PreparedSample { path, source } = prepared;
    drop(path);

    Ok(assemble_outcome(
        sample.clone(),
        source,
        execution,
        |stdout| runner.parse(stdout),
        started.elapsed(),
    ))
}

/// Classify a finished execution
///
/// Timeout and non-zero exit are decided before the output is looked at;
/// a decodable response with status 400 or above is a bad request.
pub fn assemble_outcome<P>(
    sample: Sample,
    source_code: String,
    execution: Execution,
    parse: P,
    duration: Duration,
) -> ExecutionOutcome
where
    P: FnOnce(&str) -> std::result::Result<ParsedResponse, OutputError>,
{
    let mut outcome = ExecutionOutcome {
        sample,
        passed: false,
        status: None,
        body: None,
        command: None,
        reason: None,
        detail: None,
        source_code,
        duration,
    };

    let result = match execution {
        Execution::TimedOut => {
            outcome.reason = Some(FailureReason::Timeout);
            outcome.detail = Some(format!("timed out after {:.1}s", duration.as_secs_f64()));
            return outcome;
        }
        Execution::Completed(result) => result,
    };

    if result.exit_code != 0 {
        outcome.reason = Some(FailureReason::NonZeroExit);
        outcome.detail = Some(format!("exited with code {}", result.exit_code));
        outcome.command = Some(result);
        return outcome;
    }

    match parse(&result.stdout) {
        Err(e) => {
            outcome.reason = Some(e.reason());
            outcome.detail = Some(e.to_string());
        }
        Ok(response) => {
            outcome.status = Some(response.status);
            outcome.body = response.body;
            if response.status >= 400 {
                outcome.reason = Some(FailureReason::BadRequest);
                outcome.detail = Some(format!("status code {}", response.status));
            } else {
                outcome.passed = true;
            }
        }
    }
    outcome.command = Some(result);
    outcome
}

/// Decode the `{"code": ..., "raw_body": ...}` envelope printed by
/// structured-language samples
///
/// `raw_body` may be an object, an array, or a JSON-encoded string. A 204
/// response has a null body and may omit `raw_body`.
pub fn parse_envelope(value: Value) -> std::result::Result<ParsedResponse, OutputError> {
    let Value::Object(mut envelope) = value else {
        return Err(OutputError::Schema(format!(
            "expected an object with 'code' and 'raw_body', got {}",
            value
        )));
    };

    if let Some(extra) = envelope.keys().find(|k| *k != "code" && *k != "raw_body") {
        return Err(OutputError::Schema(format!("unexpected key '{}'", extra)));
    }

    let status = match envelope.get("code") {
        None => return Err(OutputError::Schema("missing 'code'".to_string())),
        Some(code) => code
            .as_u64()
            .and_then(|c| u16::try_from(c).ok())
            .ok_or_else(|| OutputError::Schema(format!("'code' is not a status code: {}", code)))?,
    };

    if status == 204 {
        return Ok(ParsedResponse { body: None, status });
    }

    let body = match envelope.remove("raw_body") {
        None => return Err(OutputError::Schema("missing 'raw_body'".to_string())),
        Some(Value::Null) => None,
        Some(Value::String(text)) => Some(
            serde_json::from_str(&text)
                .map_err(|e| OutputError::Parse(format!("'raw_body' is not valid JSON: {}", e)))?,
        ),
        Some(other) => Some(other),
    };

    Ok(ParsedResponse { body, status })
}

/// Shorten process output for messages
pub(crate) fn excerpt(text: &str) -> String {
    const LIMIT: usize = 120;
    let text = text.trim();
    match text.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
