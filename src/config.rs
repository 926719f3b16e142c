//! Runtime configuration, loaded once at startup from environment variables.
//!
//! Every knob has a default suitable for the machine this tool was written
//! for; secrets (repository locations, credentials) have no defaults and the
//! backup passes that need them are simply skipped when unset. A `.env` file
//! is honored via `dotenvy` in `main`.

use std::path::PathBuf;
use std::time::Duration;

/// Default pre-run delay, giving network interfaces time to come up after a
/// wake/boot event. A one-shot wait, not a retry.
const DEFAULT_STARTUP_DELAY_SECS: u64 = 60;

/// Default restic binary path inside WSL. `wsl.exe --shell-type none` does no
/// shell PATH lookup through a login shell, so this must be a concrete path.
const DEFAULT_WSL_RESTIC_PATH: &str = "/usr/bin/restic";

/// Default directory backed up inside WSL.
const DEFAULT_WSL_BACKUP_PATH: &str = "/home";

/// Glob patterns excluded from every backup invocation.
const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "node_modules/**",
    ".cache/**",
    ".vscode/**",
    ".npm/**",
    ".vscode-server/**",
];

/// Home-relative directories backed up by default, plus two absolute ones.
const DEFAULT_HOME_SUBDIRS: &[&str] = &[
    "Documents",
    "Pictures",
    "Music",
    "Videos",
    "VirtualBox VMs",
    "iso",
];
const DEFAULT_ABSOLUTE_DIRS: &[&str] = &[
    "C:\\Program Files (x86)\\Steam\\steamapps\\common",
    "C:\\tools",
];

// ---------------------------------------------------------------------------
// RepoConfig
// ---------------------------------------------------------------------------

/// Environment variables identifying one restic repository: location,
/// object-storage credentials where applicable, and the encryption password.
///
/// The variable *names* double as the `WSLENV` allow-list when the repository
/// is used from inside WSL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoConfig {
    /// Human-readable label used in logs.
    pub name: String,
    /// Environment variables applied to every restic invocation against this
    /// repository, in insertion order.
    pub vars: Vec<(String, String)>,
}

impl RepoConfig {
    /// Load a repository config from `{prefix}_`-prefixed environment
    /// variables, mapping them to the names restic expects:
    ///
    /// | Variable                        | Maps to                 | Required |
    /// |---------------------------------|-------------------------|----------|
    /// | `{prefix}_RESTIC_REPOSITORY`    | `RESTIC_REPOSITORY`     | yes      |
    /// | `{prefix}_RESTIC_PASSWORD`      | `RESTIC_PASSWORD`       | yes      |
    /// | `{prefix}_AWS_ACCESS_KEY_ID`    | `AWS_ACCESS_KEY_ID`     | no       |
    /// | `{prefix}_AWS_SECRET_ACCESS_KEY`| `AWS_SECRET_ACCESS_KEY` | no       |
    ///
    /// Returns `None` if the repository location is not set, signalling that
    /// the corresponding backup pass is not configured.
    pub fn from_env(name: &str, prefix: &str) -> Option<Self> {
        let repository = std::env::var(format!("{prefix}_RESTIC_REPOSITORY")).ok()?;

        let mut vars = vec![("RESTIC_REPOSITORY".to_string(), repository)];
        for key in ["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY"] {
            if let Ok(value) = std::env::var(format!("{prefix}_{key}")) {
                vars.push((key.to_string(), value));
            }
        }
        vars.push((
            "RESTIC_PASSWORD".to_string(),
            std::env::var(format!("{prefix}_RESTIC_PASSWORD"))
                .unwrap_or_else(|_| panic!("{prefix}_RESTIC_PASSWORD must be set")),
        ));

        Some(Self {
            name: name.to_string(),
            vars,
        })
    }

    /// The variable names of this config, for the `WSLENV` allow-list.
    pub fn var_names(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(|(key, _)| key.as_str())
    }
}

// ---------------------------------------------------------------------------
// BackupPass
// ---------------------------------------------------------------------------

/// One backup pass: a repository as seen from the Windows side and the same
/// (or an equivalent) repository as seen from inside WSL.
///
/// A local-disk repository needs two distinct configs (`Z:\restic` vs
/// `/mnt/z/restic`); a cloud repository uses the same config for both sides.
#[derive(Debug, Clone)]
pub struct BackupPass {
    /// Label used in logs and task names.
    pub label: String,
    /// Repository config for Windows-side invocations (directory backups,
    /// integrity check).
    pub windows: RepoConfig,
    /// Repository config forwarded into WSL for the cross-context backup.
    pub wsl: RepoConfig,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Complete orchestrator configuration. Built once in `main`, immutable for
/// the run, passed by reference.
#[derive(Debug, Clone)]
pub struct Config {
    /// One-shot delay before the pipeline starts.
    pub startup_delay: Duration,
    /// Directories snapshotted on the Windows side. Shuffled fresh each run.
    pub backup_dirs: Vec<PathBuf>,
    /// Glob patterns skipped by every backup invocation.
    pub exclude_patterns: Vec<String>,
    /// Backup passes, executed in order. May be empty.
    pub passes: Vec<BackupPass>,
    /// Path to the restic binary inside WSL.
    pub wsl_restic_path: String,
    /// Directory backed up inside WSL.
    pub wsl_backup_path: String,
}

impl Config {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                             |
    /// |--------------------------|-------------------------------------|
    /// | `STARTUP_DELAY_SECS`     | `60`                                |
    /// | `BACKUP_DIRS`            | standard home subdirectories        |
    /// | `EXCLUDE_PATTERNS`       | node_modules, caches, editor state  |
    /// | `WSL_RESTIC_PATH`        | `/usr/bin/restic`                   |
    /// | `WSL_BACKUP_PATH`        | `/home`                             |
    ///
    /// Backup passes are gated on their repository variables (see
    /// [`RepoConfig::from_env`]): the local-disk pass on
    /// `LOCAL_WIN_RESTIC_REPOSITORY` + `LOCAL_WSL_RESTIC_REPOSITORY`, the
    /// cloud pass on `CLOUD_RESTIC_REPOSITORY`. The local pass runs first.
    pub fn from_env() -> Self {
        let startup_delay_secs: u64 = std::env::var("STARTUP_DELAY_SECS")
            .unwrap_or_else(|_| DEFAULT_STARTUP_DELAY_SECS.to_string())
            .parse()
            .expect("STARTUP_DELAY_SECS must be a valid u64");

        let backup_dirs = match std::env::var("BACKUP_DIRS") {
            Ok(raw) => parse_path_list(&raw),
            Err(_) => default_backup_dirs(),
        };

        let exclude_patterns = match std::env::var("EXCLUDE_PATTERNS") {
            Ok(raw) => parse_pattern_list(&raw),
            Err(_) => DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        };

        let mut passes = Vec::new();
        if let (Some(windows), Some(wsl)) = (
            RepoConfig::from_env("local (Windows)", "LOCAL_WIN"),
            RepoConfig::from_env("local (WSL)", "LOCAL_WSL"),
        ) {
            passes.push(BackupPass {
                label: "local".to_string(),
                windows,
                wsl,
            });
        }
        if let Some(cloud) = RepoConfig::from_env("cloud", "CLOUD") {
            passes.push(BackupPass {
                label: "cloud".to_string(),
                windows: cloud.clone(),
                wsl: cloud,
            });
        }

        Self {
            startup_delay: Duration::from_secs(startup_delay_secs),
            backup_dirs,
            exclude_patterns,
            passes,
            wsl_restic_path: std::env::var("WSL_RESTIC_PATH")
                .unwrap_or_else(|_| DEFAULT_WSL_RESTIC_PATH.to_string()),
            wsl_backup_path: std::env::var("WSL_BACKUP_PATH")
                .unwrap_or_else(|_| DEFAULT_WSL_BACKUP_PATH.to_string()),
        }
    }
}

/// Parse a comma-separated path list, dropping empty entries.
fn parse_path_list(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Parse a comma-separated glob pattern list, dropping empty entries.
fn parse_pattern_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// The default target list: standard subdirectories of the user profile plus
/// two fixed absolute paths.
fn default_backup_dirs() -> Vec<PathBuf> {
    let home = std::env::var("USERPROFILE")
        .or_else(|_| std::env::var("HOME"))
        .unwrap_or_default();
    let home = PathBuf::from(home);

    let mut dirs: Vec<PathBuf> = DEFAULT_HOME_SUBDIRS.iter().map(|d| home.join(d)).collect();
    dirs.extend(DEFAULT_ABSOLUTE_DIRS.iter().copied().map(PathBuf::from));
    dirs
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_path_list_trims_and_drops_empty() {
        let dirs = parse_path_list(" C:\\tools , ,D:\\data ");
        assert_eq!(
            dirs,
            vec![PathBuf::from("C:\\tools"), PathBuf::from("D:\\data")]
        );
    }

    #[test]
    fn parse_pattern_list_preserves_globs() {
        let patterns = parse_pattern_list("node_modules/**,.cache/**");
        assert_eq!(patterns, vec!["node_modules/**", ".cache/**"]);
    }

    #[test]
    fn default_backup_dirs_include_fixed_absolute_paths() {
        let dirs = default_backup_dirs();
        assert!(dirs.contains(&PathBuf::from("C:\\tools")));
        assert_eq!(dirs.len(), DEFAULT_HOME_SUBDIRS.len() + DEFAULT_ABSOLUTE_DIRS.len());
    }

    #[test]
    fn repo_config_from_env_returns_none_without_repository() {
        std::env::remove_var("UNSET_TEST_RESTIC_REPOSITORY");
        assert!(RepoConfig::from_env("unset", "UNSET_TEST").is_none());
    }

    #[test]
    fn repo_config_from_env_maps_prefixed_vars() {
        std::env::set_var("MAPPED_TEST_RESTIC_REPOSITORY", "s3:s3.example.com/bucket");
        std::env::set_var("MAPPED_TEST_AWS_ACCESS_KEY_ID", "key-id");
        std::env::set_var("MAPPED_TEST_AWS_SECRET_ACCESS_KEY", "secret");
        std::env::set_var("MAPPED_TEST_RESTIC_PASSWORD", "hunter2");

        let repo = RepoConfig::from_env("mapped", "MAPPED_TEST").unwrap();
        assert_eq!(
            repo.vars,
            vec![
                (
                    "RESTIC_REPOSITORY".to_string(),
                    "s3:s3.example.com/bucket".to_string()
                ),
                ("AWS_ACCESS_KEY_ID".to_string(), "key-id".to_string()),
                ("AWS_SECRET_ACCESS_KEY".to_string(), "secret".to_string()),
                ("RESTIC_PASSWORD".to_string(), "hunter2".to_string()),
            ]
        );
        assert_eq!(
            repo.var_names().collect::<Vec<_>>(),
            vec![
                "RESTIC_REPOSITORY",
                "AWS_ACCESS_KEY_ID",
                "AWS_SECRET_ACCESS_KEY",
                "RESTIC_PASSWORD"
            ]
        );
    }
}
