use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use repoherd::daemon::is_daemon_running;
use repoherd::{Config, Daemon, HealthCheck, SyncEngine, SyncOutcome};

#[derive(Parser)]
#[command(name = "repoherd")]
#[command(about = "Periodic git repository synchronization daemon")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single sync cycle and exit
    Sync,

    /// Run as daemon
    Daemon {
        #[command(subcommand)]
        daemon_command: DaemonCommands,
    },

    /// System health check and diagnostics
    Doctor,
}

#[derive(Subcommand)]
enum DaemonCommands {
    /// Start daemon
    Start {
        /// Run in foreground (don't daemonize)
        #[arg(long)]
        foreground: bool,
    },

    /// Stop running daemon
    Stop,

    /// Show daemon status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first so its logging section can shape the
    // default filter.
    let config = load_config(cli.config)?;

    init_logging(cli.verbose, &config)?;
    info!("Starting RepoHerd v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        None => cmd_run(&config).await,
        Some(Commands::Sync) => cmd_sync(&config).await,
        Some(Commands::Daemon { daemon_command }) => cmd_daemon(daemon_command, &config).await,
        Some(Commands::Doctor) => cmd_doctor(&config).await,
    }
}

/// Initialize logging based on verbosity level and configuration
fn init_logging(verbose: bool, config: &Config) -> Result<()> {
    let default_level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(config.logging.color))
        .with(filter)
        .init();

    Ok(())
}

/// Load configuration from specified path or default location
fn load_config(config_path: Option<std::path::PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(&path),
        None => Config::load_or_default(),
    }
}

/// Run the scheduling loop in the foreground (the default invocation)
async fn cmd_run(config: &Config) -> Result<()> {
    println!("🖥️  Running in foreground mode (Ctrl+C to stop)");

    let mut daemon = Daemon::new(config.clone())?;
    daemon.run().await
}

/// Run exactly one sync cycle and print its summary
async fn cmd_sync(config: &Config) -> Result<()> {
    println!(
        "🔄 Running sync cycle over {} repositories",
        config.repositories.len()
    );

    let engine = SyncEngine::new(config.clone());
    let summary = engine.run_cycle().await;

    for outcome in &summary.outcomes {
        match outcome {
            SyncOutcome::Synced { path } => println!("   ✅ {}", path.display()),
            SyncOutcome::NoChanges { path } => {
                println!("   ⏭️  {} (nothing to commit)", path.display())
            }
            SyncOutcome::Skipped { path, reason } => {
                println!("   ⚠️  {} skipped: {}", path.display(), reason)
            }
            SyncOutcome::Failed { path, step, error } => {
                println!("   ❌ {} failed at {}: {}", path.display(), step, error)
            }
        }
    }

    println!("{}", summary.summary_line());
    println!("   ⏱️  Duration: {:.2}s", summary.duration.as_secs_f64());

    Ok(())
}

/// Handle daemon commands
async fn cmd_daemon(daemon_command: DaemonCommands, config: &Config) -> Result<()> {
    match daemon_command {
        DaemonCommands::Start { foreground } => {
            println!("🚀 Starting RepoHerd daemon...");

            if is_daemon_running(config)? {
                println!("⚠️  Daemon is already running!");
                println!("   Use 'repoherd daemon stop' to stop it first");
                return Ok(());
            }

            let mut daemon = Daemon::new(config.clone())?;

            if foreground {
                println!("🖥️  Running in foreground mode (Ctrl+C to stop)");
                daemon.run().await?;
            } else {
                #[cfg(unix)]
                {
                    daemon.daemonize()?;
                    // From here on we are the daemonized child.
                    daemon.run().await?;
                }

                #[cfg(not(unix))]
                {
                    println!("❌ Background daemon mode not supported on this platform");
                    println!("   Use --foreground to run in foreground mode");
                    return Ok(());
                }
            }
        }

        DaemonCommands::Stop => {
            println!("🛑 Stopping RepoHerd daemon...");

            if !is_daemon_running(config)? {
                println!("⚠️  No daemon appears to be running");
                return Ok(());
            }

            let daemon = Daemon::new(config.clone())?;
            daemon.stop()?;

            println!("✅ Daemon stop signal sent");
        }

        DaemonCommands::Status => {
            println!("📊 RepoHerd Daemon Status");

            if is_daemon_running(config)? {
                println!("   🟢 Status: Running");
                println!("   🔄 Sync interval: {:?}", config.interval());
                println!("   📁 Repositories: {}", config.repositories.len());
                println!("   📄 PID file: {}", config.daemon.pid_file);

                if !config.daemon.log_file.is_empty() {
                    println!("   📄 Log file: {}", config.daemon.log_file);
                }
            } else {
                println!("   🔴 Status: Not running");
                println!("   💡 Use 'repoherd daemon start' to start the daemon");
            }
        }
    }

    Ok(())
}

/// System health check and diagnostics
async fn cmd_doctor(config: &Config) -> Result<()> {
    let health = HealthCheck::run(config).await;
    print_health_report(&health);
    Ok(())
}

/// Print health check report to stdout
fn print_health_report(health: &HealthCheck) {
    use repoherd::health::CheckResult;

    fn print_check(name: &str, result: &CheckResult) {
        println!("{}:", name);
        let icon = if result.passed {
            if result.is_warning {
                "⚠️ "
            } else {
                "✅"
            }
        } else {
            "❌"
        };
        println!("  {} {}", icon, result.message);
        if let Some(details) = &result.details {
            for line in details.lines() {
                println!("     {}", line);
            }
        }
    }

    println!("🔍 RepoHerd System Diagnostics");
    println!();

    for (name, result) in health.all_checks() {
        print_check(&name, result);
        println!();
    }

    if health.all_passed() {
        println!("✅ All checks passed");
    } else {
        println!("❌ Some checks failed");
    }
}
