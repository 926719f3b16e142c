//! The backup pipeline.
//!
//! [`Orchestrator::run`] executes a fixed sequence: a startup delay, three
//! maintenance tasks, one backup pass per configured repository pair, then a
//! single report email. Every task is wrapped in [`Orchestrator::run_isolated`],
//! which converts a failure into an error-log entry and moves on. Only the
//! final report delivery is allowed to propagate, because there is no further
//! collaborator to tell about a failed notification.
//!
//! Execution is strictly sequential: backup tasks contend for the same disk
//! and network, and serializing them keeps each failure's captured output
//! self-contained.

use std::future::Future;
use std::path::PathBuf;

use rand::seq::SliceRandom;

use crate::config::{BackupPass, Config, RepoConfig};
use crate::exec::{CommandRunner, CommandSpec};
use crate::notify::{Notifier, NotifyError};
use crate::report;
use crate::restic;
use crate::task::TaskError;

/// Runs the fixed maintenance + backup pipeline against the injected command
/// runner and notifier.
pub struct Orchestrator<'a, R, N> {
    config: &'a Config,
    runner: &'a R,
    notifier: &'a N,
}

impl<'a, R: CommandRunner, N: Notifier> Orchestrator<'a, R, N> {
    pub fn new(config: &'a Config, runner: &'a R, notifier: &'a N) -> Self {
        Self {
            config,
            runner,
            notifier,
        }
    }

    /// Execute the whole pipeline and deliver exactly one report.
    ///
    /// Task failures land in the error log and never abort the run; the only
    /// fallible step from the caller's point of view is report delivery.
    pub async fn run(&self) -> Result<(), NotifyError> {
        let mut errors: Vec<TaskError> = Vec::new();

        // One-shot wait for network interfaces to come up after a wake or
        // boot event. Not a retry mechanism.
        tokio::time::sleep(self.config.startup_delay).await;

        self.run_isolated(
            "chocolatey upgrade",
            &mut errors,
            self.run_cmd(restic::choco_upgrade()),
        )
        .await;
        self.run_isolated("WSL apt upgrade", &mut errors, self.apt_full_upgrade())
            .await;
        self.run_isolated(
            "restic self-update",
            &mut errors,
            self.run_cmd(restic::self_update()),
        )
        .await;

        for pass in &self.config.passes {
            self.backup_pass(pass, &mut errors).await;
        }

        let report = report::compose(&errors);
        tracing::info!(
            subject = %report.subject,
            error_count = errors.len(),
            "Delivering run report"
        );
        self.notifier.notify(&report.subject, &report.body).await
    }

    /// Run one task; on failure, log it, append it to the error log, and
    /// return normally. Sibling tasks always get their turn.
    async fn run_isolated<F>(&self, label: &str, errors: &mut Vec<TaskError>, task: F)
    where
        F: Future<Output = Result<(), TaskError>>,
    {
        tracing::info!(task = label, "Starting task");
        match task.await {
            Ok(()) => tracing::info!(task = label, "Task finished"),
            Err(err) => {
                tracing::warn!(task = label, %err, "Task failed, continuing with the run");
                errors.push(err);
            }
        }
    }

    /// One backup pass: shuffled directory backups, the cross-context WSL
    /// backup, then the repository integrity check. The three steps are
    /// isolated from each other, so a failed directory loop still gets its
    /// WSL backup and its check.
    async fn backup_pass(&self, pass: &BackupPass, errors: &mut Vec<TaskError>) {
        // Fresh pseudo-random order every run: if a run gets interrupted,
        // repeated runs won't always starve the same directories.
        let mut targets: Vec<&PathBuf> = self.config.backup_dirs.iter().collect();
        targets.shuffle(&mut rand::rng());

        for dir in targets {
            let label = format!("{}: backup {}", pass.label, dir.display());
            self.run_isolated(
                &label,
                errors,
                self.run_cmd(restic::backup_dir(
                    &pass.windows,
                    dir,
                    &self.config.exclude_patterns,
                )),
            )
            .await;
        }
        tracing::info!(repo = %pass.windows.name, "Finished directory backups");

        let label = format!("{}: WSL backup", pass.label);
        self.run_isolated(&label, errors, self.backup_wsl(&pass.wsl))
            .await;

        let label = format!("{}: integrity check", pass.label);
        self.run_isolated(&label, errors, self.run_cmd(restic::check(&pass.windows)))
            .await;
    }

    /// Back up the configured directory inside WSL.
    ///
    /// Kills any stale long-running restic first (a forgotten `restic mount`
    /// would otherwise be backed up as part of the tree). The kill is
    /// best-effort: a non-zero exit usually just means nothing was running,
    /// so it is logged for monitoring but not recorded as a run error.
    async fn backup_wsl(&self, repo: &RepoConfig) -> Result<(), TaskError> {
        if let Err(err) = self.runner.run(&restic::wsl_kill_stale()).await {
            tracing::warn!(%err, "Could not kill stale restic in WSL; it may simply not have been running");
        }

        self.runner
            .run(&restic::wsl_self_update(
                repo,
                &self.config.wsl_restic_path,
            ))
            .await?;
        self.runner
            .run(&restic::wsl_backup(
                repo,
                &self.config.wsl_restic_path,
                &self.config.wsl_backup_path,
                &self.config.exclude_patterns,
            ))
            .await?;
        tracing::info!(repo = %repo.name, "Backed up WSL home");
        Ok(())
    }

    /// Update and upgrade apt packages inside WSL, as one task.
    async fn apt_full_upgrade(&self) -> Result<(), TaskError> {
        self.runner.run(&restic::apt_update()).await?;
        self.runner.run(&restic::apt_upgrade()).await?;
        Ok(())
    }

    /// Run a command, discarding its output on success.
    async fn run_cmd(&self, spec: CommandSpec) -> Result<(), TaskError> {
        self.runner.run(&spec).await.map(|_| ())
    }
}
