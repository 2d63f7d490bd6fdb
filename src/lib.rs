//! RepoHerd - Periodic Git Repository Synchronization Daemon
//!
//! RepoHerd keeps a configured list of local working copies reconciled with
//! their remotes. On a fixed timer it pulls remote changes, commits any
//! local modifications, and pushes them back, isolating failures per
//! repository so one broken checkout never stalls the rest.
//!
//! ## Core Features
//!
//! - **Sequential sync cycles**: repositories are processed strictly in
//!   configured order, one at a time
//! - **Bounded pulls**: the pull step is raced against a timeout and the
//!   child process is killed on expiry
//! - **Status-gated commits**: a commit is only attempted when the status
//!   output shows uncommitted or untracked work
//! - **Configuration Management**: YAML (or JSON) configuration with XDG
//!   compliance
//! - **Daemon mode**: background service with PID file management and
//!   graceful shutdown
//!
//! ## Modules
//!
//! - [`config`]: Configuration management and parsing
//! - [`git`]: External command execution and git operations
//! - [`status`]: Status-output classification
//! - [`sync`]: Per-repository sync sequence and the cycle driver
//! - [`daemon`]: Scheduling loop and daemon infrastructure
//! - [`health`]: Preflight diagnostics

pub mod config;
pub mod daemon;
pub mod git;
pub mod health;
pub mod status;
pub mod sync;

pub use config::{Config, RepoSpec};
pub use daemon::Daemon;
pub use git::GitClient;
pub use health::HealthCheck;
pub use status::StatusClassifier;
pub use sync::{CycleSummary, SyncEngine, SyncOutcome, SyncStep};
