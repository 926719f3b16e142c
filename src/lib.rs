//! Restic backup orchestrator for a Windows host with a WSL environment.
//!
//! Runs a fixed maintenance + backup pipeline: package manager upgrades,
//! restic snapshots of a configured directory list (on the Windows side and
//! inside WSL), repository integrity checks, and a single summary email.
//! Every task is isolated so one failure never aborts the rest of the run.

pub mod config;
pub mod exec;
pub mod notify;
pub mod orchestrator;
pub mod report;
pub mod restic;
pub mod task;
