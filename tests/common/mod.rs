/// Common test fixtures and helpers for RepoHerd tests
use repoherd::config::RepoSpec;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// A bare "remote" repository plus a local working copy cloned from it,
/// wired up so pull/commit/push all work offline.
pub struct RepoFixture {
    pub temp: TempDir,
    pub remote_dir: PathBuf,
    pub work_dir: PathBuf,
    pub branch: String,
}

impl RepoFixture {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let remote_dir = temp.path().join("remote.git");
        let work_dir = temp.path().join("work");

        git_in(temp.path(), &["init", "--bare", "remote.git"]);
        git_in(
            temp.path(),
            &["clone", remote_dir.to_str().unwrap(), "work"],
        );
        configure_identity(&work_dir);

        // Seed an initial commit so the branch exists on the remote.
        std::fs::write(work_dir.join("README"), "seed\n").expect("Failed to write seed file");
        git_in(&work_dir, &["add", "."]);
        git_in(&work_dir, &["commit", "-m", "seed"]);
        let branch = current_branch(&work_dir);
        git_in(&work_dir, &["push", "origin", &branch]);

        Self {
            temp,
            remote_dir,
            work_dir,
            branch,
        }
    }

    /// Descriptor pointing the sync engine at this fixture's working copy.
    pub fn spec(&self) -> RepoSpec {
        RepoSpec {
            path: self.work_dir.to_string_lossy().into_owned(),
            remote: "origin".to_string(),
            branch: self.branch.clone(),
        }
    }

    pub fn write_file(&self, name: &str, content: &str) {
        std::fs::write(self.work_dir.join(name), content).expect("Failed to write file");
    }

    /// Number of commits on the remote's branch.
    pub fn remote_commit_count(&self) -> usize {
        git_output(&self.remote_dir, &["rev-list", "--count", &self.branch])
            .trim()
            .parse()
            .expect("Failed to parse commit count")
    }

    /// Subject line of the newest commit on the remote's branch.
    pub fn remote_head_subject(&self) -> String {
        git_output(&self.remote_dir, &["log", "-1", "--format=%s", &self.branch])
            .trim()
            .to_string()
    }
}

/// Run a git command in `dir`, panicking with its output on failure.
pub fn git_in(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed in {}:\n{}{}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr),
    );
}

/// Run a git command in `dir` and return its stdout.
pub fn git_output(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed in {}:\n{}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr),
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn configure_identity(dir: &Path) {
    git_in(dir, &["config", "user.name", "repoherd tests"]);
    git_in(dir, &["config", "user.email", "tests@repoherd.invalid"]);
    git_in(dir, &["config", "commit.gpgsign", "false"]);
}

fn current_branch(dir: &Path) -> String {
    // symbolic-ref works even before the first commit is made
    git_output(dir, &["symbolic-ref", "--short", "HEAD"])
        .trim()
        .to_string()
}
