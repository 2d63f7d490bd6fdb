use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command as AsyncCommand;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::SyncConfig;

/// Run one external command in `dir` and capture its combined output.
///
/// The working directory is an explicit parameter rather than process-wide
/// state, so callers never have to restore anything. Exactly one child
/// process is spawned per call; there are no retries and the output is not
/// interpreted here.
///
/// When `bound` is given the wait is raced against it; on expiry the child
/// is killed and a timeout error is returned.
pub async fn run_command(
    program: &str,
    args: &[&str],
    dir: &Path,
    bound: Option<Duration>,
) -> Result<String> {
    debug!("running '{} {}' in {}", program, args.join(" "), dir.display());

    let mut cmd = AsyncCommand::new(program);
    cmd.args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // Dropping the wait future must take the child down with it.
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .with_context(|| format!("Failed to spawn '{} {}'", program, args.join(" ")))?;

    let waited = match bound {
        Some(limit) => match timeout(limit, child.wait_with_output()).await {
            Ok(waited) => waited,
            Err(_) => {
                warn!(
                    "'{} {}' still running after {}s, child process killed",
                    program,
                    args.join(" "),
                    limit.as_secs()
                );
                bail!(
                    "'{} {}' timed out after {}s",
                    program,
                    args.join(" "),
                    limit.as_secs()
                );
            }
        },
        None => child.wait_with_output().await,
    };

    let output =
        waited.with_context(|| format!("Failed to collect output of '{}'", program))?;

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        bail!(
            "'{} {}' exited with {}: {}",
            program,
            args.join(" "),
            output.status,
            text.trim()
        );
    }

    Ok(text)
}

/// Typed git operations over [`run_command`].
///
/// Argument lists are fixed; remote and branch names come from the
/// repository descriptor and are passed through verbatim. Only the pull
/// is bounded - a hang there is common enough (network waits) to warrant
/// the race, while the local steps are left unbounded.
#[derive(Debug, Clone)]
pub struct GitClient {
    sync: SyncConfig,
}

impl GitClient {
    pub fn new(sync: SyncConfig) -> Self {
        Self { sync }
    }

    /// Fetch and integrate remote changes, bounded by the configured
    /// pull timeout.
    pub async fn pull(&self, dir: &Path, remote: &str, branch: &str) -> Result<String> {
        let bound = Duration::from_secs(self.sync.pull_timeout_secs);
        run_command("git", &["pull", remote, branch], dir, Some(bound)).await
    }

    pub async fn status(&self, dir: &Path) -> Result<String> {
        run_command("git", &["status"], dir, None).await
    }

    pub async fn add_all(&self, dir: &Path) -> Result<String> {
        run_command("git", &["add", "."], dir, None).await
    }

    /// Commit staged changes with a timestamped message.
    pub async fn commit(&self, dir: &Path) -> Result<String> {
        let message = self.commit_message(Local::now());
        run_command("git", &["commit", "-m", &message], dir, None).await
    }

    pub async fn push(&self, dir: &Path, remote: &str, branch: &str) -> Result<String> {
        run_command("git", &["push", remote, branch], dir, None).await
    }

    /// Local wall-clock time plus the configured suffix.
    fn commit_message(&self, now: DateTime<Local>) -> String {
        format!("{} {}", now.format("%Y/%m/%d %H:%M:%S"), self.sync.commit_suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Instant;

    #[tokio::test]
    async fn test_run_command_captures_output() {
        let dir = std::env::temp_dir();
        let output = run_command("echo", &["hello", "world"], &dir, None)
            .await
            .expect("echo should succeed");
        assert_eq!(output.trim(), "hello world");
    }

    #[tokio::test]
    async fn test_run_command_nonzero_exit_is_error() {
        let dir = std::env::temp_dir();
        let result = run_command("false", &[], &dir, None).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("exited with"));
    }

    #[tokio::test]
    async fn test_run_command_missing_program_is_error() {
        let dir = std::env::temp_dir();
        let result = run_command("repoherd-no-such-program", &[], &dir, None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_run_command_timeout_kills_child() {
        let dir = std::env::temp_dir();
        let started = Instant::now();

        let result =
            run_command("sleep", &["5"], &dir, Some(Duration::from_millis(200))).await;

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timed out"));
        assert!(
            started.elapsed() < Duration::from_secs(4),
            "timed-out command was waited on to completion"
        );
    }

    #[test]
    fn test_commit_message_format() {
        let client = GitClient::new(SyncConfig::default());
        let when = Local.with_ymd_and_hms(2025, 3, 9, 14, 30, 5).unwrap();

        let message = client.commit_message(when);

        assert_eq!(message, "2025/03/09 14:30:05 auto commit");
    }

    #[test]
    fn test_commit_message_uses_configured_suffix() {
        let sync = SyncConfig {
            commit_suffix: "scheduled snapshot".to_string(),
            ..SyncConfig::default()
        };
        let client = GitClient::new(sync);
        let when = Local.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();

        assert_eq!(
            client.commit_message(when),
            "2025/12/31 23:59:59 scheduled snapshot"
        );
    }
}
