use {
    anyhow::Result,
    clap::Args,
    compat_poll::Reporter,
    compat_state::{DAY_IN_SECONDS, SettingsUpdate, TrialPeriod},
    tracing::info,
};

#[derive(Args)]
pub struct ConfigureArgs {
    /// Directory account name. Leave empty to remove the account.
    #[arg(long, default_value = "")]
    pub username: String,
    /// Directory account password.
    #[arg(long, env = "COMPAT_REPORTER_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,
    /// Days a plugin must stay active before it is reported as compatible.
    /// Keeps the current value when omitted.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=30))]
    pub trial_days: Option<u64>,
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

pub async fn handle_configure(reporter: &Reporter, args: ConfigureArgs) -> Result<()> {
    let trial_period = match args.trial_days {
        Some(days) => days * DAY_IN_SECONDS,
        None => reporter.status().await?.trial_period,
    };

    let report = reporter
        .configure(SettingsUpdate {
            username: args.username,
            password: args.password,
            trial_period,
        })
        .await?;

    for message in &report.messages {
        eprintln!(
            "  {BOLD}{RED}error{RESET} {}: {} ({})",
            message.field, message.message, message.code
        );
    }
    if report.login_ok {
        eprintln!("  {BOLD}{GREEN}ok{RESET} directory login succeeded");
    }
    if report.votes_cleared {
        eprintln!("Cached votes from the previous account were discarded.");
    }

    let days = trial_period / DAY_IN_SECONDS;
    let label = TrialPeriod::from_days(days)
        .map(|p| p.to_string())
        .unwrap_or_else(|| format!("{days} days"));
    println!("Settings saved. Trial period: {label}.");

    if report.poll_requested {
        info!("settings changed, fetching existing votes");
        println!("Downloading your existing compatibility votes (this can take a few minutes).");
        let outcome = reporter.check_and_vote().await?;
        crate::print_outcome(&outcome);
    }
    Ok(())
}
