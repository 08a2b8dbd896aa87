//! Subprocess execution with a wall-clock budget

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::common::{Error, Result};

/// Captured result of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// How a process run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    Completed(CommandResult),
    /// The process exceeded its budget and was killed
    TimedOut,
}

/// Run `program` with `args` and capture its output
///
/// The child is killed if it does not finish within `limit`. Failing to
/// spawn the program at all is an error; everything the process itself
/// does is reported through [`Execution`].
pub async fn run_command<S: AsRef<OsStr>>(
    program: &Path,
    args: &[S],
    cwd: Option<&Path>,
    limit: Duration,
) -> Result<Execution> {
    debug!(
        program = %program.display(),
        args = ?args.iter().map(|a| a.as_ref().to_string_lossy().into_owned()).collect::<Vec<_>>(),
        "running command"
    );

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let child = cmd.spawn().map_err(|e| Error::Spawn {
        program: program.display().to_string(),
        error: e.to_string(),
    })?;

    // Dropping the wait future on timeout drops the child, which kills it
    match timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(Execution::Completed(CommandResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })),
        Ok(Err(e)) => Err(Error::Io(e)),
        Err(_) => Ok(Execution::TimedOut),
    }
}

/// Run a provisioning command that must succeed
pub async fn run_setup_command<S: AsRef<OsStr>>(
    runner: &str,
    program: &Path,
    args: &[S],
    cwd: Option<&Path>,
    limit: Duration,
) -> Result<()> {
    match run_command(program, args, cwd, limit).await? {
        Execution::Completed(result) if result.exit_code == 0 => Ok(()),
        Execution::Completed(result) => Err(Error::provision(
            runner,
            format!(
                "'{}' exited with code {}: {}",
                program.display(),
                result.exit_code,
                result.stderr.trim()
            ),
        )),
        Execution::TimedOut => Err(Error::provision(
            runner,
            format!("'{}' timed out after {}s", program.display(), limit.as_secs()),
        )),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_output_and_exit_code() {
        let result = run_command(
            Path::new("sh"),
            &["-c", "echo out; echo err >&2; exit 3"],
            None,
            Duration::from_secs(10),
        )
        .await
        .unwrap();
        assert_eq!(
            result,
            Execution::Completed(CommandResult {
                exit_code: 3,
                stdout: "out\n".to_string(),
                stderr: "err\n".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_timeout_is_distinct() {
        let result = run_command(
            Path::new("sh"),
            &["-c", "sleep 5"],
            None,
            Duration::from_millis(200),
        )
        .await
        .unwrap();
        assert_eq!(result, Execution::TimedOut);
    }

    #[tokio::test]
    async fn test_missing_program_is_error() {
        let result = run_command(
            Path::new("definitely-not-a-real-program-xyz"),
            &[] as &[&str],
            None,
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(result, Err(Error::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_setup_command_failure() {
        let result = run_setup_command(
            "python",
            Path::new("sh"),
            &["-c", "echo broken >&2; exit 1"],
            None,
            Duration::from_secs(10),
        )
        .await;
        match result {
            Err(Error::Provision { runner, reason }) => {
                assert_eq!(runner, "python");
                assert!(reason.contains("broken"));
            }
            other => panic!("Expected Provision error, got {:?}", other),
        }
    }
}
