//! Task failure types.
//!
//! Every unit of orchestrated work reports either success or a [`TaskError`].
//! Failures are appended to the run's error log and surface only in the final
//! report email; they never abort the pipeline.

/// A captured task failure.
///
/// The two variants mirror the two ways a task can go wrong: an external
/// command misbehaving (non-zero exit, or the spawn itself failing), or any
/// other fault raised by a collaborator (e.g. the mail transport).
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// An external command exited non-zero or could not be spawned.
    ///
    /// `exit_code` is `-1` when the process was killed by a signal or never
    /// started. `stdout`/`stderr` are captured in full, trimmed.
    #[error(
        "Failed to run command: {command}\n\
         Exit code: {exit_code}\n\n\
         Stdout:\n{stdout}\n\
         Stderr:\n{stderr}\n"
    )]
    Process {
        /// The command line that was executed, space-joined for display.
        command: String,
        /// Process exit code (`-1` if killed by signal or not spawned).
        exit_code: i32,
        /// Captured standard output, trimmed.
        stdout: String,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// Any non-process fault raised during a task.
    #[error("{0}")]
    Other(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
