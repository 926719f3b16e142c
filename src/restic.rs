//! Builders for every external command line the orchestrator runs.
//!
//! These are pure functions from configuration to [`CommandSpec`], so the
//! exact argument and environment shapes are unit-testable without spawning
//! anything. Repository identity and secrets always travel as environment
//! variables, never as arguments.

use std::path::Path;

use crate::config::RepoConfig;
use crate::exec::CommandSpec;

/// Snapshot tag for Windows-side backups.
pub const WINDOWS_TAG: &str = "Windows";
/// Snapshot tag for backups taken inside WSL.
pub const WSL_TAG: &str = "WSL";

/// The wsl.exe launcher binary.
const WSL_LAUNCHER: &str = "wsl.exe";

/// `--exclude <pattern>` flag pairs shared by every backup invocation.
fn exclude_flags(patterns: &[String]) -> Vec<String> {
    let mut flags = Vec::with_capacity(patterns.len() * 2);
    for pattern in patterns {
        flags.push("--exclude".to_string());
        flags.push(pattern.clone());
    }
    flags
}

/// Apply a repository's environment variables to a command.
fn with_repo_env(mut spec: CommandSpec, repo: &RepoConfig) -> CommandSpec {
    for (key, value) in &repo.vars {
        spec = spec.env(key.clone(), value.clone());
    }
    spec
}

// ---------------------------------------------------------------------------
// Windows-side restic invocations
// ---------------------------------------------------------------------------

/// `restic backup <dir> --use-fs-snapshot --tag Windows --exclude ...`
///
/// `--use-fs-snapshot` takes a VSS snapshot so open files are readable.
pub fn backup_dir(repo: &RepoConfig, dir: &Path, excludes: &[String]) -> CommandSpec {
    let spec = CommandSpec::new("restic")
        .arg("backup")
        .arg(dir.display().to_string())
        .arg("--use-fs-snapshot")
        .args(["--tag", WINDOWS_TAG])
        .args(exclude_flags(excludes));
    with_repo_env(spec, repo)
}

/// `restic check` against the given repository.
pub fn check(repo: &RepoConfig) -> CommandSpec {
    with_repo_env(CommandSpec::new("restic").arg("check"), repo)
}

/// `restic self-update` on the Windows side. Needs no repository.
pub fn self_update() -> CommandSpec {
    CommandSpec::new("restic").arg("self-update")
}

// ---------------------------------------------------------------------------
// Package manager maintenance
// ---------------------------------------------------------------------------

/// `choco upgrade all`.
pub fn choco_upgrade() -> CommandSpec {
    CommandSpec::new("choco").args(["upgrade", "all"])
}

/// `wsl.exe sudo apt update`.
pub fn apt_update() -> CommandSpec {
    CommandSpec::new(WSL_LAUNCHER).args(["sudo", "apt", "update"])
}

/// `wsl.exe sudo apt upgrade -y`.
pub fn apt_upgrade() -> CommandSpec {
    CommandSpec::new(WSL_LAUNCHER).args(["sudo", "apt", "upgrade", "-y"])
}

// ---------------------------------------------------------------------------
// Cross-context (WSL) invocations
// ---------------------------------------------------------------------------

/// Best-effort kill of a stale long-running restic inside WSL (e.g. a
/// forgotten `restic mount`), so the backup doesn't recurse into the
/// mountpoint. Non-zero exit just means nothing was running.
pub fn wsl_kill_stale() -> CommandSpec {
    CommandSpec::new(WSL_LAUNCHER).args(["killall", "restic"])
}

/// `wsl.exe --shell-type none <restic> self-update`, with the repository
/// secrets forwarded across the context boundary.
pub fn wsl_self_update(repo: &RepoConfig, wsl_restic_path: &str) -> CommandSpec {
    let spec = CommandSpec::new(WSL_LAUNCHER)
        .args(["--shell-type", "none"])
        .arg(wsl_restic_path)
        .arg("self-update");
    with_wsl_forwarding(spec, repo)
}

/// `wsl.exe --shell-type none <restic> backup <path> --tag WSL --exclude ...`
///
/// `--shell-type none` keeps bash/zsh from glob-expanding the exclude
/// patterns before restic sees them.
pub fn wsl_backup(
    repo: &RepoConfig,
    wsl_restic_path: &str,
    wsl_backup_path: &str,
    excludes: &[String],
) -> CommandSpec {
    let spec = CommandSpec::new(WSL_LAUNCHER)
        .args(["--shell-type", "none"])
        .arg(wsl_restic_path)
        .arg("backup")
        .arg(wsl_backup_path)
        .args(["--tag", WSL_TAG])
        .args(exclude_flags(excludes));
    with_wsl_forwarding(spec, repo)
}

/// Set the repository variables on the outer (Windows) environment and extend
/// `WSLENV` with their names, which tells WSL to forward exactly those
/// variables into the inner context.
fn with_wsl_forwarding(spec: CommandSpec, repo: &RepoConfig) -> CommandSpec {
    let inherited = std::env::var("WSLENV").unwrap_or_default();
    let mut spec = with_repo_env(spec, repo);
    spec = spec.env("WSLENV", extend_wslenv(&inherited, repo));
    spec
}

/// Append the repository's variable names to an existing `WSLENV` value.
fn extend_wslenv(inherited: &str, repo: &RepoConfig) -> String {
    let mut wslenv = inherited.to_string();
    for name in repo.var_names() {
        wslenv.push(':');
        wslenv.push_str(name);
    }
    wslenv
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn repo() -> RepoConfig {
        RepoConfig {
            name: "test".to_string(),
            vars: vec![
                ("RESTIC_REPOSITORY".to_string(), "Z:\\restic".to_string()),
                ("RESTIC_PASSWORD".to_string(), "hunter2".to_string()),
            ],
        }
    }

    fn excludes() -> Vec<String> {
        vec!["node_modules/**".to_string(), ".cache/**".to_string()]
    }

    #[test]
    fn backup_dir_has_snapshot_flag_tag_and_excludes() {
        let spec = backup_dir(&repo(), &PathBuf::from("C:\\tools"), &excludes());
        assert_eq!(spec.program, "restic");
        assert_eq!(
            spec.args,
            vec![
                "backup",
                "C:\\tools",
                "--use-fs-snapshot",
                "--tag",
                "Windows",
                "--exclude",
                "node_modules/**",
                "--exclude",
                ".cache/**",
            ]
        );
        assert!(spec
            .env
            .contains(&("RESTIC_PASSWORD".to_string(), "hunter2".to_string())));
    }

    #[test]
    fn check_carries_repo_env() {
        let spec = check(&repo());
        assert_eq!(spec.args, vec!["check"]);
        assert_eq!(spec.env.len(), 2);
    }

    #[test]
    fn maintenance_commands_take_no_repo_env() {
        assert!(self_update().env.is_empty());
        assert!(choco_upgrade().env.is_empty());
        assert_eq!(apt_upgrade().args, vec!["sudo", "apt", "upgrade", "-y"]);
    }

    #[test]
    fn wsl_backup_disables_shell_and_forwards_secrets() {
        let spec = wsl_backup(&repo(), "/usr/bin/restic", "/home", &excludes());
        assert_eq!(spec.program, "wsl.exe");
        assert_eq!(&spec.args[..2], &["--shell-type", "none"]);
        assert_eq!(&spec.args[2..5], &["/usr/bin/restic", "backup", "/home"]);
        assert!(spec.args.contains(&"--exclude".to_string()));

        let wslenv = spec
            .env
            .iter()
            .find(|(key, _)| key == "WSLENV")
            .map(|(_, value)| value.clone())
            .unwrap();
        assert!(wslenv.contains(":RESTIC_REPOSITORY"));
        assert!(wslenv.contains(":RESTIC_PASSWORD"));
    }

    #[test]
    fn extend_wslenv_preserves_inherited_entries() {
        let wslenv = extend_wslenv("USERPROFILE/p", &repo());
        assert_eq!(wslenv, "USERPROFILE/p:RESTIC_REPOSITORY:RESTIC_PASSWORD");
    }

    #[test]
    fn kill_stale_is_plain_killall() {
        let spec = wsl_kill_stale();
        assert_eq!(spec.args, vec!["killall", "restic"]);
        assert!(spec.env.is_empty());
    }
}
