use anyhow::{Context, Result};
use dirs::config_dir;
use path_clean::PathClean;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::status::DEFAULT_CHANGE_MARKERS;

/// Main configuration structure for RepoHerd
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Repositories to keep in sync, processed in configured order
    #[serde(default)]
    pub repositories: Vec<RepoSpec>,

    /// Milliseconds between sync cycles; 0 or absent falls back to 10000
    #[serde(default)]
    pub interval_ms: u64,

    /// Synchronization behavior settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Daemon configuration
    #[serde(default)]
    pub daemon: DaemonConfig,
}

/// One synchronization target
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct RepoSpec {
    /// Absolute path of the local working copy
    pub path: String,

    /// Remote name, usually "origin"; passed to git verbatim
    pub remote: String,

    /// Target branch name; passed to git verbatim
    pub branch: String,
}

/// Synchronization configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyncConfig {
    /// Bound on the pull step in seconds; the child is killed on expiry
    #[serde(default = "default_pull_timeout")]
    pub pull_timeout_secs: u64,

    /// Suffix appended to generated commit messages
    #[serde(default = "default_commit_suffix")]
    pub commit_suffix: String,

    /// Substrings of `git status` output that mean a commit is warranted.
    /// These track git's human-readable wording, so they are configuration
    /// rather than constants.
    #[serde(default = "default_change_markers")]
    pub change_markers: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String, // "info"

    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,
}

/// Daemon configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DaemonConfig {
    /// PID file location
    #[serde(default = "default_pid_file")]
    pub pid_file: String,

    /// Log file location for background mode
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

// Default value functions
fn default_pull_timeout() -> u64 {
    30
}
fn default_commit_suffix() -> String {
    "auto commit".to_string()
}
fn default_change_markers() -> Vec<String> {
    DEFAULT_CHANGE_MARKERS.iter().map(|m| m.to_string()).collect()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_pid_file() -> String {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        format!("{}/repoherd.pid", runtime_dir)
    } else {
        "/tmp/repoherd.pid".to_string()
    }
}
fn default_log_file() -> String {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        format!("{}/repoherd/daemon.log", data_home)
    } else if let Ok(home) = std::env::var("HOME") {
        format!("{}/.local/share/repoherd/daemon.log", home)
    } else {
        "/tmp/repoherd-daemon.log".to_string()
    }
}

// Default implementations
impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            pull_timeout_secs: default_pull_timeout(),
            commit_suffix: default_commit_suffix(),
            change_markers: default_change_markers(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            color: default_true(),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            pid_file: default_pid_file(),
            log_file: default_log_file(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repositories: Vec::new(),
            interval_ms: 0,
            sync: SyncConfig::default(),
            logging: LoggingConfig::default(),
            daemon: DaemonConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location or create a default config
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            let config = Self::default();

            // Create config directory if it doesn't exist
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
            }

            config.save(&config_path)?;

            tracing::info!("Created default configuration at: {:?}", config_path);
            Ok(config)
        }
    }

    /// Load configuration from a specific file.
    ///
    /// YAML is the primary format; files ending in `.json` are parsed as
    /// JSON instead.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        };

        config.expand_paths()?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("repoherd").join("config.yml"))
    }

    /// Expand environment variables and `~` in configured paths and
    /// normalize repository paths.
    ///
    /// Empty repository paths are left untouched so the sync cycle can
    /// report them instead of silently turning them into ".".
    pub fn expand_paths(&mut self) -> Result<()> {
        for repo in &mut self.repositories {
            if repo.path.is_empty() {
                continue;
            }
            let expanded = shellexpand::full(&repo.path)
                .with_context(|| format!("Failed to expand repository path: {}", repo.path))?
                .into_owned();
            repo.path = PathBuf::from(expanded).clean().to_string_lossy().into_owned();
        }

        self.daemon.pid_file = shellexpand::full(&self.daemon.pid_file)
            .context("Failed to expand pid_file path")?
            .into_owned();

        self.daemon.log_file = shellexpand::full(&self.daemon.log_file)
            .context("Failed to expand log_file path")?
            .into_owned();

        Ok(())
    }

    /// Cycle period, applying the 10 s fallback when `interval_ms` is unset.
    pub fn interval(&self) -> Duration {
        let millis = if self.interval_ms == 0 {
            10_000
        } else {
            self.interval_ms
        };
        Duration::from_millis(millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert!(config.repositories.is_empty());
        assert_eq!(config.interval_ms, 0);
        assert_eq!(config.sync.pull_timeout_secs, 30);
        assert_eq!(config.sync.commit_suffix, "auto commit");
        assert_eq!(
            config.sync.change_markers,
            vec![
                "Changes not staged for commit".to_string(),
                "Untracked files".to_string()
            ]
        );
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.color);
    }

    #[test]
    fn test_interval_fallback() {
        let mut config = Config::default();
        assert_eq!(config.interval(), Duration::from_millis(10_000));

        config.interval_ms = 250;
        assert_eq!(config.interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_json_config_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        std::fs::write(
            &config_path,
            r#"{
  "repositories": [
    {"path": "/srv/notes", "remote": "origin", "branch": "main"},
    {"path": "/srv/wiki", "remote": "backup", "branch": "trunk"}
  ],
  "interval_ms": 10000
}"#,
        )
        .unwrap();

        let config = Config::load(&config_path).expect("Failed to load JSON config");

        assert_eq!(config.interval_ms, 10_000);
        assert_eq!(config.repositories.len(), 2);
        assert_eq!(config.repositories[0].path, "/srv/notes");
        assert_eq!(config.repositories[0].remote, "origin");
        assert_eq!(config.repositories[0].branch, "main");
        assert_eq!(config.repositories[1].path, "/srv/wiki");
        assert_eq!(config.repositories[1].remote, "backup");
        assert_eq!(config.repositories[1].branch, "trunk");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml_content = r#"
repositories:
  - path: "/srv/notes"
    remote: "origin"
    branch: "main"
interval_ms: 5000
sync:
  pull_timeout_secs: 10
  commit_suffix: "scheduled snapshot"
  change_markers:
    - "Changes not staged for commit"
logging:
  level: "debug"
  color: false
"#;

        let config: Config = serde_yaml::from_str(yaml_content).expect("Failed to parse YAML");

        assert_eq!(config.repositories.len(), 1);
        assert_eq!(config.repositories[0].branch, "main");
        assert_eq!(config.interval_ms, 5000);
        assert_eq!(config.sync.pull_timeout_secs, 10);
        assert_eq!(config.sync.commit_suffix, "scheduled snapshot");
        assert_eq!(config.sync.change_markers.len(), 1);
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.color);
    }

    #[test]
    #[serial]
    fn test_expand_paths() {
        env::set_var("TEST_REPOHERD_ROOT", "/test/root");

        let mut config = Config::default();
        config.repositories.push(RepoSpec {
            path: "${TEST_REPOHERD_ROOT}/notes/".to_string(),
            remote: "origin".to_string(),
            branch: "main".to_string(),
        });

        config.expand_paths().expect("Failed to expand paths");

        assert_eq!(config.repositories[0].path, "/test/root/notes");

        env::remove_var("TEST_REPOHERD_ROOT");
    }

    #[test]
    fn test_expand_paths_keeps_empty_path() {
        let mut config = Config::default();
        config.repositories.push(RepoSpec {
            path: String::new(),
            remote: "origin".to_string(),
            branch: "main".to_string(),
        });

        config.expand_paths().expect("Failed to expand paths");

        assert_eq!(config.repositories[0].path, "");
    }

    #[test]
    fn test_config_load_nonexistent_file() {
        let nonexistent_path = Path::new("/nonexistent/path/config.yml");
        let result = Config::load(nonexistent_path);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yml");
        std::fs::write(&config_path, "repositories: [").unwrap();

        let result = Config::load(&config_path);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yml");

        let mut config = Config::default();
        config.interval_ms = 60_000;
        config.sync.pull_timeout_secs = 45;
        config.repositories.push(RepoSpec {
            path: "/custom/path".to_string(),
            remote: "upstream".to_string(),
            branch: "develop".to_string(),
        });

        config.save(&config_path).expect("Failed to save config");

        let loaded_config = Config::load(&config_path).expect("Failed to load config");

        assert_eq!(loaded_config.interval_ms, 60_000);
        assert_eq!(loaded_config.sync.pull_timeout_secs, 45);
        assert_eq!(loaded_config.repositories.len(), 1);
        assert_eq!(loaded_config.repositories[0].path, "/custom/path");
        assert_eq!(loaded_config.repositories[0].remote, "upstream");
        assert_eq!(loaded_config.repositories[0].branch, "develop");
    }

    #[test]
    fn test_config_default_path_xdg() {
        let default_path = Config::default_config_path().expect("Failed to get default path");
        assert!(default_path.to_string_lossy().contains("repoherd"));
        assert!(default_path.to_string_lossy().ends_with("config.yml"));
    }
}
