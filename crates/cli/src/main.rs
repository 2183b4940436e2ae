mod config_commands;
mod plugin_commands;
mod status_commands;

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    compat_config::ReporterConfig,
    compat_directory::{CompatibilityDirectory, DirectoryClient},
    compat_poll::{DirectoryFactory, PollScheduler, Reporter, RunOutcome},
    compat_state::{FileInventory, FileOptionStore, SystemClock},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "compat-reporter",
    about = "Report installed plugins as compatible once they have proven themselves"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./compat-reporter.toml, then the user config dir).
    #[arg(long, global = true, env = "COMPAT_REPORTER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the poll scheduler until interrupted.
    Run,
    /// Run a single check-and-vote pass.
    Poll,
    /// Cast a vote for a plugin version, replacing any earlier vote.
    Vote {
        /// Plugin identifier, e.g. `akismet/akismet.php`.
        plugin_id: String,
        version: String,
        #[arg(value_enum)]
        verdict: plugin_commands::Verdict,
    },
    /// Record that a plugin was activated on the host.
    Activate { plugin_id: String },
    /// Record that a plugin was deactivated on the host.
    Deactivate { plugin_id: String },
    /// Set the directory account and trial period.
    Configure(config_commands::ConfigureArgs),
    /// Show settings and per-plugin state.
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Remove all stored settings and plugin data.
    Uninstall,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ReporterConfig> {
    match &cli.config {
        Some(path) => compat_config::load_config(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(compat_config::discover_and_load()),
    }
}

fn build_reporter(config: &ReporterConfig) -> Reporter {
    let storage_path = config.storage_path();
    let inventory_path = config.inventory_path();
    info!(
        storage = %storage_path.display(),
        inventory = %inventory_path.display(),
        "using local state"
    );

    let directory_config = config.directory.clone();
    let directory: DirectoryFactory = Arc::new(move |credentials| {
        let client = DirectoryClient::new(directory_config.clone(), credentials)?;
        Ok(Arc::new(client) as Arc<dyn CompatibilityDirectory>)
    });

    Reporter::new(
        Arc::new(FileOptionStore::new(storage_path)),
        Arc::new(FileInventory::new(inventory_path)),
        directory,
        Arc::new(SystemClock),
        &config.poll,
    )
}

fn print_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::AlreadyRunning { started_at } => {
            println!("Another check has been running since {started_at}; skipped.");
        },
        RunOutcome::NoCredentials => {
            println!(
                "Plugin list updated. Configure a directory account to fetch and cast votes."
            );
        },
        RunOutcome::Completed(report) => {
            println!(
                "Checked {} plugin(s), cast {} vote(s), {} error(s).",
                report.checked, report.voted, report.errors
            );
        },
    }
}

async fn run_daemon(config: &ReporterConfig, reporter: Reporter) -> anyhow::Result<()> {
    let scheduler = PollScheduler::new(Arc::new(reporter), &config.poll);
    scheduler.start().await;
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown requested");
    scheduler.stop().await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let config = load_config(&cli)?;
    let reporter = build_reporter(&config);

    match cli.command {
        Commands::Run => {
            info!(version = env!("CARGO_PKG_VERSION"), "compat-reporter starting");
            run_daemon(&config, reporter).await
        },
        Commands::Poll => {
            let outcome = reporter.check_and_vote().await?;
            print_outcome(&outcome);
            Ok(())
        },
        Commands::Vote {
            plugin_id,
            version,
            verdict,
        } => plugin_commands::handle_vote(&reporter, &plugin_id, &version, verdict).await,
        Commands::Activate { plugin_id } => {
            plugin_commands::handle_activation(&reporter, &plugin_id, true).await
        },
        Commands::Deactivate { plugin_id } => {
            plugin_commands::handle_activation(&reporter, &plugin_id, false).await
        },
        Commands::Configure(args) => config_commands::handle_configure(&reporter, args).await,
        Commands::Status { json } => status_commands::handle_status(&reporter, json).await,
        Commands::Uninstall => {
            reporter.uninstall().await?;
            println!("Stored settings and plugin data removed.");
            Ok(())
        },
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vote() {
        let cli = Cli::try_parse_from([
            "compat-reporter",
            "vote",
            "akismet/akismet.php",
            "5.3",
            "broken",
        ])
        .unwrap();
        match cli.command {
            Commands::Vote {
                plugin_id,
                version,
                verdict,
            } => {
                assert_eq!(plugin_id, "akismet/akismet.php");
                assert_eq!(version, "5.3");
                assert!(!verdict.is_compatible());
            },
            _ => panic!("expected vote"),
        }
    }

    #[test]
    fn rejects_unknown_verdict() {
        assert!(
            Cli::try_parse_from(["compat-reporter", "vote", "a/a.php", "1.0", "maybe"]).is_err()
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "compat-reporter",
            "status",
            "--json",
            "--log-level",
            "debug",
            "--config",
            "custom.toml",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.command, Commands::Status { json: true }));
    }

    #[test]
    fn configure_trial_days_range() {
        assert!(
            Cli::try_parse_from(["compat-reporter", "configure", "--trial-days", "31"]).is_err()
        );
        let cli = Cli::try_parse_from([
            "compat-reporter",
            "configure",
            "--username",
            "alice",
            "--password",
            "pw",
            "--trial-days",
            "14",
        ])
        .unwrap();
        let Commands::Configure(args) = cli.command else {
            panic!("expected configure");
        };
        assert_eq!(args.trial_days, Some(14));
    }
}
