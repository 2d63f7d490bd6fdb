//! Sync Engine - the per-repository synchronization sequence and the
//! sequential cycle driver over the configured repository list.
//!
//! Each cycle processes repositories strictly in configured order, one at
//! a time. Every failure is contained within its repository: it becomes an
//! outcome value and a log line, never an error that escapes the cycle.

use crate::config::{Config, RepoSpec};
use crate::git::GitClient;
use crate::status::StatusClassifier;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Steps of the per-repository sequence, named in failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    Pull,
    Status,
    Stage,
    Commit,
    Push,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStep::Pull => "pull",
            SyncStep::Status => "status",
            SyncStep::Stage => "stage",
            SyncStep::Commit => "commit",
            SyncStep::Push => "push",
        };
        f.write_str(name)
    }
}

/// Outcome of one repository's sync attempt within a cycle
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// Local changes were committed and pushed
    Synced { path: PathBuf },
    /// Status showed nothing to commit; a normal, non-alarming skip
    NoChanges { path: PathBuf },
    /// Descriptor rejected before any git operation ran
    Skipped { path: PathBuf, reason: String },
    /// A git step failed; the remaining steps were not attempted.
    /// A push failure after a successful commit leaves the local commit
    /// in place; it is picked up by the next successful push.
    Failed {
        path: PathBuf,
        step: SyncStep,
        error: String,
    },
}

impl SyncOutcome {
    pub fn path(&self) -> &Path {
        match self {
            SyncOutcome::Synced { path }
            | SyncOutcome::NoChanges { path }
            | SyncOutcome::Skipped { path, .. }
            | SyncOutcome::Failed { path, .. } => path,
        }
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, SyncOutcome::Synced { .. })
    }
}

/// Results from one complete sync cycle
#[derive(Debug, Clone)]
pub struct CycleSummary {
    pub outcomes: Vec<SyncOutcome>,
    pub duration: Duration,
}

impl CycleSummary {
    /// Paths of the repositories that reached the synced outcome, in
    /// processing order.
    pub fn synced_paths(&self) -> Vec<&Path> {
        self.outcomes
            .iter()
            .filter(|o| o.is_synced())
            .map(|o| o.path())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// The single human-readable line emitted per cycle.
    pub fn summary_line(&self) -> String {
        let synced: Vec<String> = self
            .synced_paths()
            .iter()
            .map(|p| p.display().to_string())
            .collect();

        if synced.is_empty() {
            "no repository synced".to_string()
        } else {
            format!(
                "finished syncing {} of {} repositories: {}",
                synced.len(),
                self.total(),
                synced.join(", ")
            )
        }
    }
}

/// The sync engine drives the validate -> pull -> status -> stage ->
/// commit -> push sequence for each configured repository.
pub struct SyncEngine {
    config: Config,
    git: GitClient,
    classifier: StatusClassifier,
}

impl SyncEngine {
    pub fn new(config: Config) -> Self {
        let git = GitClient::new(config.sync.clone());
        let classifier = StatusClassifier::new(config.sync.change_markers.clone());
        Self {
            config,
            git,
            classifier,
        }
    }

    /// Run one cycle over the configured repositories, strictly in order.
    ///
    /// Repositories are never processed concurrently; the working
    /// directory of each git invocation is passed explicitly, so the
    /// process's own working directory is untouched throughout the cycle.
    pub async fn run_cycle(&self) -> CycleSummary {
        let start = Instant::now();
        let mut outcomes = Vec::with_capacity(self.config.repositories.len());

        for spec in &self.config.repositories {
            let outcome = self.sync_repository(spec).await;
            match &outcome {
                SyncOutcome::Synced { path } => info!("synced {}", path.display()),
                SyncOutcome::NoChanges { path } => {
                    debug!("nothing to commit in {}", path.display())
                }
                SyncOutcome::Skipped { path, reason } => {
                    warn!("skipping {}: {}", path.display(), reason)
                }
                SyncOutcome::Failed { path, step, error } => {
                    error!("{} failed at {}: {}", path.display(), step, error)
                }
            }
            outcomes.push(outcome);
        }

        let summary = CycleSummary {
            outcomes,
            duration: start.elapsed(),
        };
        info!("{}", summary.summary_line());
        summary
    }

    /// Run the full sequence for one repository. Exactly one outcome per
    /// call; the first failing step aborts the rest.
    pub async fn sync_repository(&self, spec: &RepoSpec) -> SyncOutcome {
        let path = PathBuf::from(&spec.path);

        if let Err(reason) = validate_worktree(&spec.path, &path) {
            return SyncOutcome::Skipped { path, reason };
        }

        if let Err(e) = self.git.pull(&path, &spec.remote, &spec.branch).await {
            return SyncOutcome::Failed {
                path,
                step: SyncStep::Pull,
                error: format!("{e:#}"),
            };
        }

        let status_text = match self.git.status(&path).await {
            Ok(text) => text,
            Err(e) => {
                return SyncOutcome::Failed {
                    path,
                    step: SyncStep::Status,
                    error: format!("{e:#}"),
                }
            }
        };

        if !self.classifier.needs_commit(&status_text) {
            return SyncOutcome::NoChanges { path };
        }

        if let Err(e) = self.git.add_all(&path).await {
            return SyncOutcome::Failed {
                path,
                step: SyncStep::Stage,
                error: format!("{e:#}"),
            };
        }

        if let Err(e) = self.git.commit(&path).await {
            return SyncOutcome::Failed {
                path,
                step: SyncStep::Commit,
                error: format!("{e:#}"),
            };
        }

        if let Err(e) = self.git.push(&path, &spec.remote, &spec.branch).await {
            return SyncOutcome::Failed {
                path,
                step: SyncStep::Push,
                error: format!("{e:#}"),
            };
        }

        SyncOutcome::Synced { path }
    }
}

/// Reject descriptors that cannot name a git working copy: empty paths,
/// paths that cannot be stat'ed, non-directories, and directories without
/// a `.git` entry.
fn validate_worktree(raw: &str, path: &Path) -> Result<(), String> {
    if raw.is_empty() {
        return Err("empty repository path".to_string());
    }

    let metadata = std::fs::metadata(path)
        .map_err(|e| format!("cannot stat {}: {}", path.display(), e))?;

    if !metadata.is_dir() {
        return Err(format!("{} is not a directory", path.display()));
    }

    if !path.join(".git").exists() {
        return Err(format!("{} is not a git working copy", path.display()));
    }

    Ok(())
}
