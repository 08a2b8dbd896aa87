//! Console report of a test session

use colored::Colorize;
use std::io::{self, Write};
use std::time::Duration;

use crate::runner::{ExecutionOutcome, FailureReason};
use crate::sample::{Language, Sample};

/// Outcomes of a finished session
#[derive(Debug, Default)]
pub struct SessionReport {
    pub outcomes: Vec<ExecutionOutcome>,
}

impl SessionReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    /// Sum of the samples' own durations
    pub fn time_spent(&self) -> Duration {
        self.outcomes.iter().map(|o| o.duration).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExecutionOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }
}

/// Writes progress and the final report
///
/// With `debug` set, passed samples are explained as well.
pub struct Reporter {
    debug: bool,
    sample_timeout: Duration,
    out: Box<dyn Write + Send>,
}

impl Reporter {
    pub fn new(debug: bool, sample_timeout: Duration, out: Box<dyn Write + Send>) -> Self {
        Self {
            debug,
            sample_timeout,
            out,
        }
    }

    pub fn stdout(debug: bool, sample_timeout: Duration) -> Self {
        Self::new(debug, sample_timeout, Box::new(io::stdout()))
    }

    pub fn language_started(&mut self, language: Language) {
        let _ = writeln!(self.out, "======== {} ========", language.display_name());
    }

    pub fn sample_started(&mut self, sample: &Sample) {
        let _ = write!(self.out, "{:>6}: {} ", sample.method.as_str(), sample.name);
        let _ = self.out.flush();
    }

    pub fn sample_finished(&mut self, outcome: &ExecutionOutcome) {
        let status = if outcome.passed {
            "[PASSED]".green()
        } else {
            "[FAILED]".red()
        };
        let _ = writeln!(self.out, "{}", status);
    }

    /// Explanations, the list of failed samples and the totals
    pub fn session_finished(&mut self, report: &SessionReport) {
        let _ = writeln!(self.out);
        for outcome in &report.outcomes {
            if !outcome.passed || self.debug {
                self.explain(outcome);
            }
        }

        let conclusion = if report.failed() > 0 {
            let _ = writeln!(self.out, "== List of failed tests ==");
            for outcome in report.failures() {
                let sample = &outcome.sample;
                let _ = writeln!(
                    self.out,
                    "{} - {} - {}",
                    sample.language.id(),
                    sample.name,
                    sample.method
                );
            }
            "Test session failed"
        } else {
            "Test session passed"
        };

        let _ = writeln!(self.out, "Time spent: {:.1}s", report.time_spent().as_secs_f64());
        let summary = format!(
            "== {} ==\n{} total, {} passed, {} failed",
            conclusion,
            report.total(),
            report.passed(),
            report.failed()
        );
        let summary = if report.failed() > 0 {
            summary.red()
        } else {
            summary.green()
        };
        let _ = writeln!(self.out, "{}", summary);
    }

    fn explain(&mut self, outcome: &ExecutionOutcome) {
        let divider = "=".repeat(20);
        let sample = &outcome.sample;
        let _ = writeln!(self.out, "{} Test: {} {}", divider, sample.name, divider);
        let _ = writeln!(self.out, "Path: {}", sample.path.display());
        let _ = writeln!(self.out, "Method: {}", sample.method);
        let _ = writeln!(self.out, "Duration: {:.1}", outcome.duration.as_secs_f64());

        match outcome.reason {
            None => self.print_output(outcome),
            Some(FailureReason::Timeout) => {
                let _ = writeln!(self.out, "Timeout error: {}s", self.sample_timeout.as_secs());
            }
            Some(FailureReason::NonZeroExit) => {
                if let Some(command) = &outcome.command {
                    let _ = writeln!(
                        self.out,
                        "Command returned non-zero exit code: {}",
                        command.exit_code
                    );
                }
                self.print_output(outcome);
            }
            Some(FailureReason::BadRequest) => {
                let status = outcome.status.map(|s| s.to_string()).unwrap_or_default();
                let _ = writeln!(self.out, "Bad request: {}", status);
                self.print_output(outcome);
            }
            Some(FailureReason::SchemaMismatch) => {
                if matches!(sample.language, Language::JavaScript | Language::Python) {
                    let _ = writeln!(
                        self.out,
                        "Resulted JSON must contain \"raw_body\" and \"code\" fields"
                    );
                }
                self.print_unparsed_output(outcome);
            }
            Some(FailureReason::ParseError) => self.print_unparsed_output(outcome),
        }
        if let Some(detail) = outcome.detail.as_deref().filter(|_| !outcome.passed) {
            let _ = writeln!(self.out, "Reason: {}", detail.dimmed());
        }

        let _ = writeln!(
            self.out,
            "Sample source code (with substitutions):\n{}\n",
            outcome.source_code
        );
    }

    fn print_output(&mut self, outcome: &ExecutionOutcome) {
        let (stdout, stderr) = match &outcome.command {
            Some(command) => (command.stdout.trim(), command.stderr.trim()),
            None => ("", ""),
        };
        let stdout = if stdout.is_empty() {
            "NO STDOUT".to_string()
        } else {
            format!("STDOUT:\n{}", stdout)
        };
        let stderr = if stderr.is_empty() {
            "NO STDERR".to_string()
        } else {
            format!("STDERR:\n{}", stderr)
        };
        let _ = writeln!(self.out, "{}\n{}", stdout, stderr);
    }

    fn print_unparsed_output(&mut self, outcome: &ExecutionOutcome) {
        let Some(command) = &outcome.command else {
            return;
        };
        if !command.stdout.trim().is_empty() {
            let _ = writeln!(self.out, "Incorrect sample output:\n{}", command.stdout);
        } else {
            let _ = writeln!(self.out, "No stdout captured");
            if !command.stderr.is_empty() {
                let _ = writeln!(self.out, "STDERR:\n{}", command.stderr);
            }
        }
    }
}
