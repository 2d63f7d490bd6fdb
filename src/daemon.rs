//! Daemon Infrastructure - periodic scheduling, PID file management, and
//! graceful shutdown for the background sync service.
//!
//! The scheduler runs one cycle immediately and then on every interval
//! tick, indefinitely. Shutdown is signal-driven (SIGINT/SIGTERM) through
//! a broadcast channel.

use crate::config::Config;
use crate::sync::SyncEngine;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Daemon state and control
pub struct Daemon {
    config: Arc<Config>,
    engine: SyncEngine,
    shutdown_sender: broadcast::Sender<()>,
    is_running: Arc<AtomicBool>,
    pid_file_path: Option<PathBuf>,
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let engine = SyncEngine::new(config.as_ref().clone());

        let (shutdown_sender, _) = broadcast::channel(1);
        let is_running = Arc::new(AtomicBool::new(false));

        let pid_file_path = if config.daemon.pid_file.is_empty() {
            None
        } else {
            Some(PathBuf::from(&config.daemon.pid_file))
        };

        Ok(Self {
            config,
            engine,
            shutdown_sender,
            is_running,
            pid_file_path,
        })
    }

    /// Run the scheduling loop in the foreground until a shutdown signal
    /// arrives.
    pub async fn run(&mut self) -> Result<()> {
        info!("Starting RepoHerd daemon");

        self.write_pid_file().context("Failed to write PID file")?;

        self.is_running.store(true, Ordering::SeqCst);

        let shutdown_receiver = self.shutdown_sender.subscribe();
        let is_running = self.is_running.clone();

        // Spawn shutdown signal handler
        let shutdown_sender = self.shutdown_sender.clone();
        tokio::spawn(async move {
            Self::wait_for_shutdown_signal().await;
            info!("Shutdown signal received, stopping daemon...");
            is_running.store(false, Ordering::SeqCst);
            let _ = shutdown_sender.send(());
        });

        let result = self.daemon_loop(shutdown_receiver).await;

        self.cleanup().context("Failed to cleanup daemon")?;

        result
    }

    /// Start the daemon as a background service (Unix platforms)
    #[cfg(unix)]
    pub fn daemonize(&self) -> Result<()> {
        use daemonize::Daemonize;

        let log_file = if self.config.daemon.log_file.is_empty() {
            None
        } else {
            let path = PathBuf::from(&self.config.daemon.log_file);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).context("Failed to create log file directory")?;
            }
            Some(fs::File::create(&path).context("Failed to create log file")?)
        };

        let mut daemonize = Daemonize::new();

        if let Some(pid_path) = &self.pid_file_path {
            daemonize = daemonize.pid_file(pid_path);
        }

        if let Some(log_file) = log_file {
            daemonize = daemonize.stdout(log_file.try_clone()?).stderr(log_file);
        }

        daemonize.start().context("Failed to daemonize process")?;

        info!("RepoHerd daemon started as background service");
        Ok(())
    }

    /// Stop a running daemon by sending SIGTERM to the PID on file
    pub fn stop(&self) -> Result<()> {
        info!("Sending shutdown signal to daemon");

        if let Some(pid_file) = &self.pid_file_path {
            if pid_file.exists() {
                let pid_str = fs::read_to_string(pid_file).context("Failed to read PID file")?;

                let pid: u32 = pid_str.trim().parse().context("Invalid PID in PID file")?;

                #[cfg(unix)]
                {
                    use nix::sys::signal::{self, Signal};
                    use nix::unistd::Pid;

                    let pid = Pid::from_raw(pid as i32);
                    signal::kill(pid, Signal::SIGTERM)
                        .context("Failed to send SIGTERM to daemon process")?;
                }

                #[cfg(not(unix))]
                {
                    warn!("Daemon stop not implemented for this platform");
                }

                info!("Shutdown signal sent to daemon process {}", pid);
            } else {
                warn!("PID file not found, daemon may not be running");
            }
        } else {
            warn!("No PID file configured, cannot stop daemon");
        }

        Ok(())
    }

    /// Main daemon loop - one cycle right away, then a cycle per tick
    async fn daemon_loop(&self, mut shutdown_receiver: broadcast::Receiver<()>) -> Result<()> {
        let period = self.config.interval();

        info!("Daemon loop started with interval: {:?}", period);

        self.run_cycle().await;

        let mut interval_timer = interval(period);
        // Consume the immediate tick; the first cycle already ran.
        interval_timer.tick().await;

        loop {
            tokio::select! {
                _ = shutdown_receiver.recv() => {
                    info!("Shutdown signal received in daemon loop");
                    break;
                }

                _ = interval_timer.tick() => {
                    if !self.is_running.load(Ordering::SeqCst) {
                        break;
                    }
                    self.run_cycle().await;
                }
            }
        }

        info!("Daemon loop exiting");
        Ok(())
    }

    /// Run one sync cycle; per-repository lines and the cycle summary are
    /// logged by the engine.
    async fn run_cycle(&self) {
        debug!("starting sync cycle");
        let summary = self.engine.run_cycle().await;
        debug!(
            "cycle finished in {:.2}s over {} repositories",
            summary.duration.as_secs_f64(),
            summary.total()
        );
    }

    /// Wait for shutdown signals (SIGINT/Ctrl+C, and SIGTERM on Unix)
    #[cfg(unix)]
    async fn wait_for_shutdown_signal() {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => debug!("SIGINT received"),
            _ = term.recv() => debug!("SIGTERM received"),
        }
    }

    #[cfg(not(unix))]
    async fn wait_for_shutdown_signal() {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl-c");
        debug!("Ctrl+C received");
    }

    /// Write PID file for daemon process management
    fn write_pid_file(&self) -> Result<()> {
        if let Some(pid_file) = &self.pid_file_path {
            let pid = std::process::id();

            if let Some(parent) = pid_file.parent() {
                fs::create_dir_all(parent).context("Failed to create PID file directory")?;
            }

            fs::write(pid_file, pid.to_string()).context("Failed to write PID file")?;

            info!("PID file written: {} (PID: {})", pid_file.display(), pid);
        }

        Ok(())
    }

    /// Remove PID file and perform cleanup
    fn cleanup(&self) -> Result<()> {
        if let Some(pid_file) = &self.pid_file_path {
            if pid_file.exists() {
                fs::remove_file(pid_file).context("Failed to remove PID file")?;
                info!("PID file removed: {}", pid_file.display());
            }
        }

        self.is_running.store(false, Ordering::SeqCst);
        info!("Daemon cleanup completed");
        Ok(())
    }
}

/// Check if a daemon is currently running by probing the PID on file
pub fn is_daemon_running(config: &Config) -> Result<bool> {
    if !config.daemon.pid_file.is_empty() {
        let pid_file = PathBuf::from(&config.daemon.pid_file);

        if pid_file.exists() {
            let pid_str = fs::read_to_string(&pid_file).context("Failed to read PID file")?;

            let pid: u32 = pid_str.trim().parse().context("Invalid PID in PID file")?;

            #[cfg(unix)]
            {
                use nix::errno::Errno;
                use nix::sys::signal;
                use nix::unistd::Pid;

                let pid = Pid::from_raw(pid as i32);
                match signal::kill(pid, None) {
                    Ok(_) => return Ok(true),
                    Err(Errno::ESRCH) => {
                        // Stale PID file left by an unclean exit
                        let _ = fs::remove_file(&pid_file);
                        return Ok(false);
                    }
                    Err(_) => return Ok(true),
                }
            }

            #[cfg(not(unix))]
            {
                // On non-Unix platforms, just check if the PID file exists
                return Ok(true);
            }
        }
    }

    Ok(false)
}
