//! Subprocess execution.
//!
//! [`CommandSpec`] describes one external invocation (program, arguments,
//! extra environment). [`CommandRunner`] is the seam between the orchestrator
//! and the operating system: production code uses [`ProcessRunner`], tests
//! substitute a recording mock.
//!
//! There is deliberately no timeout: backup runs can legitimately take hours,
//! so a hung subprocess hangs the whole run rather than being killed mid-write.

use std::fmt;
use std::process::Stdio;

use tokio::process::Command;

use crate::task::TaskError;

/// One external command to run: program, arguments, and environment variables
/// set on top of the inherited environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path.
    pub program: String,
    /// Arguments, passed verbatim (no shell expansion anywhere).
    pub args: Vec<String>,
    /// Extra environment variables for the child process.
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    /// Start a spec for `program` with no arguments or extra environment.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for CommandSpec {
    /// Space-joined command line, used in logs and failure reports.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured output of a successful (exit code 0) command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Complete stdout, trimmed of surrounding whitespace.
    pub stdout: String,
    /// Complete stderr, trimmed of surrounding whitespace.
    pub stderr: String,
}

/// Executes [`CommandSpec`]s.
///
/// The orchestrator is generic over this trait so tests can script outcomes
/// and count invocations without spawning real processes.
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion, capturing stdout and stderr.
    ///
    /// Returns `Ok` only for exit code 0. A non-zero exit or a spawn failure
    /// becomes [`TaskError::Process`] carrying the command line and captured
    /// streams.
    fn run(
        &self,
        spec: &CommandSpec,
    ) -> impl std::future::Future<Output = Result<CommandOutput, TaskError>> + Send;
}

/// [`CommandRunner`] that spawns real child processes.
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, TaskError> {
        tracing::info!(command = %spec, "Running command");

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let output = match cmd.output().await {
            Ok(output) => output,
            Err(err) => {
                return Err(TaskError::Process {
                    command: spec.to_string(),
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: format!("spawn failed: {err}"),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        // -1 stands in for "killed by signal", same as a spawn failure.
        let exit_code = output.status.code().unwrap_or(-1);

        if !stdout.is_empty() || !stderr.is_empty() {
            tracing::debug!(command = %spec, %stdout, %stderr, "Command output");
        }

        if !output.status.success() {
            return Err(TaskError::Process {
                command: spec.to_string(),
                exit_code,
                stdout,
                stderr,
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn display_joins_program_and_args() {
        let spec = CommandSpec::new("restic")
            .arg("backup")
            .arg("/home")
            .args(["--tag", "WSL"]);
        assert_eq!(spec.to_string(), "restic backup /home --tag WSL");
    }

    #[test]
    fn env_accumulates_in_order() {
        let spec = CommandSpec::new("restic")
            .env("RESTIC_REPOSITORY", "/mnt/z/restic")
            .env("RESTIC_PASSWORD", "hunter2");
        assert_eq!(
            spec.env,
            vec![
                ("RESTIC_REPOSITORY".to_string(), "/mnt/z/restic".to_string()),
                ("RESTIC_PASSWORD".to_string(), "hunter2".to_string()),
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_exit_code_and_stderr_on_failure() {
        let spec = CommandSpec::new("sh")
            .arg("-c")
            .arg("echo out; echo err >&2; exit 3");
        let err = ProcessRunner.run(&spec).await.unwrap_err();
        assert_matches!(
            err,
            TaskError::Process {
                exit_code: 3,
                ref stdout,
                ref stderr,
                ..
            } if stdout.as_str() == "out" && stderr.as_str() == "err"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn returns_trimmed_output_on_success() {
        let spec = CommandSpec::new("sh").arg("-c").arg("echo '  hello  '");
        let output = ProcessRunner.run(&spec).await.unwrap();
        assert_eq!(output.stdout, "hello");
        assert_eq!(output.stderr, "");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn spawn_failure_is_a_process_error() {
        let spec = CommandSpec::new("/nonexistent/binary/for/sure");
        let err = ProcessRunner.run(&spec).await.unwrap_err();
        assert_matches!(
            err,
            TaskError::Process { exit_code: -1, ref stderr, .. }
                if stderr.starts_with("spawn failed:")
        );
    }
}
