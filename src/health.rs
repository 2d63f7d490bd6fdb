//! System health checks for RepoHerd
//!
//! This module provides preflight checks to verify the system is properly
//! configured before running operations.

use crate::config::{Config, RepoSpec};
use std::path::Path;
use tokio::process::Command as AsyncCommand;

/// Result of system health checks
#[derive(Debug, Clone)]
pub struct HealthCheck {
    /// Git installation status
    pub git: CheckResult,
    /// Sync interval sanity
    pub interval: CheckResult,
    /// Per-repository checks, keyed by configured path
    pub repositories: Vec<(String, CheckResult)>,
}

/// Result of an individual health check
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
    pub is_warning: bool,
}

#[allow(dead_code)]
impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: None,
            is_warning: false,
        }
    }

    fn ok_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: Some(details.into()),
            is_warning: false,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            details: None,
            is_warning: false,
        }
    }

    fn error_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            details: Some(details.into()),
            is_warning: false,
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: None,
            is_warning: true,
        }
    }

    fn warning_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: Some(details.into()),
            is_warning: true,
        }
    }
}

impl HealthCheck {
    /// Run all health checks
    pub async fn run(config: &Config) -> Self {
        Self {
            git: Self::check_git().await,
            interval: Self::check_interval(config),
            repositories: config
                .repositories
                .iter()
                .map(|spec| (spec.path.clone(), Self::check_repository(spec)))
                .collect(),
        }
    }

    /// Check if all required checks passed (excludes warnings)
    pub fn all_passed(&self) -> bool {
        self.git.passed
            && self.interval.passed
            && self.repositories.iter().all(|(_, r)| r.passed)
    }

    /// Get list of failed checks (errors only, not warnings)
    pub fn errors(&self) -> Vec<&CheckResult> {
        self.all_checks()
            .into_iter()
            .map(|(_, r)| r)
            .filter(|r| !r.passed && !r.is_warning)
            .collect()
    }

    /// Get list of warnings
    pub fn warnings(&self) -> Vec<&CheckResult> {
        self.all_checks()
            .into_iter()
            .map(|(_, r)| r)
            .filter(|r| r.is_warning)
            .collect()
    }

    /// All checks with display names, in report order
    pub fn all_checks(&self) -> Vec<(String, &CheckResult)> {
        let mut checks = vec![
            ("Git".to_string(), &self.git),
            ("Sync interval".to_string(), &self.interval),
        ];
        for (path, result) in &self.repositories {
            checks.push((format!("Repository {}", path), result));
        }
        checks
    }

    async fn check_git() -> CheckResult {
        match AsyncCommand::new("git").arg("--version").output().await {
            Ok(output) if output.status.success() => CheckResult::ok_with_details(
                "git is installed",
                String::from_utf8_lossy(&output.stdout).trim().to_string(),
            ),
            Ok(output) => CheckResult::error_with_details(
                "git --version exited with an error",
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ),
            Err(e) => {
                CheckResult::error_with_details("git is not installed or not on PATH", e.to_string())
            }
        }
    }

    fn check_interval(config: &Config) -> CheckResult {
        if config.repositories.is_empty() {
            return CheckResult::warning("no repositories configured; cycles will be no-ops");
        }
        if config.interval_ms == 0 {
            CheckResult::warning(format!(
                "interval_ms is unset, falling back to {} ms",
                config.interval().as_millis()
            ))
        } else if config.interval_ms < 1000 {
            CheckResult::warning_with_details(
                format!("interval_ms = {} is very aggressive", config.interval_ms),
                "each cycle shells out to git several times per repository",
            )
        } else {
            CheckResult::ok(format!("sync interval is {} ms", config.interval_ms))
        }
    }

    fn check_repository(spec: &RepoSpec) -> CheckResult {
        if spec.path.is_empty() {
            return CheckResult::error("empty repository path");
        }

        let path = Path::new(&spec.path);
        if !path.exists() {
            return CheckResult::error(format!("{} does not exist", spec.path));
        }
        if !path.is_dir() {
            return CheckResult::error(format!("{} is not a directory", spec.path));
        }
        if !path.join(".git").exists() {
            return CheckResult::error(format!("{} is not a git working copy", spec.path));
        }

        CheckResult::ok(format!("syncs to {}/{}", spec.remote, spec.branch))
    }
}
