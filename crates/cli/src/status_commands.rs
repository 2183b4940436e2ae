use {
    anyhow::Result,
    compat_poll::{PluginStatus, Reporter, StatusReport},
    compat_state::DAY_IN_SECONDS,
};

pub async fn handle_status(reporter: &Reporter, json: bool) -> Result<()> {
    let status = reporter.status().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&status);
    }
    Ok(())
}

fn print_status(status: &StatusReport) {
    match &status.username {
        Some(username) => println!("Account:      {username}"),
        None => println!("Account:      (not configured)"),
    }
    if let Some(error) = &status.login_error {
        println!("Login error:  {} ({})", error.message, error.code);
    }
    println!("Trial period: {}", format_duration(status.trial_period));
    println!("Check period: {}", format_duration(status.check_period));
    if let Some(started_at) = status.run_started_at {
        println!("Check running since {started_at}");
    }

    if status.plugins.is_empty() {
        println!("\nNo plugins tracked yet. Run `compat-reporter poll` to read the inventory.");
        return;
    }
    println!();
    for plugin in &status.plugins {
        println!("{}", plugin_line(plugin));
    }
}

fn plugin_line(plugin: &PluginStatus) -> String {
    let record = &plugin.record;
    let listed = match record.in_directory {
        None => "unknown",
        Some(true) => "listed",
        Some(false) => "unlisted",
    };
    let vote = match plugin.current_vote {
        None => "no vote",
        Some(true) => "works",
        Some(false) => "broken",
    };
    let mut line = format!(
        "{} {} [{}] {} {}",
        plugin.id,
        record.version(),
        if plugin.active { "active" } else { "inactive" },
        listed,
        vote
    );
    if let Some(error) = &record.last_error {
        line.push_str(&format!(" (error: {})", error.code));
    }
    line
}

fn format_duration(secs: u64) -> String {
    if secs % DAY_IN_SECONDS == 0 {
        let days = secs / DAY_IN_SECONDS;
        if days == 1 {
            "1 day".to_string()
        } else {
            format!("{days} days")
        }
    } else {
        format!("{secs} s")
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, compat_state::PluginRecord};

    #[test]
    fn durations() {
        assert_eq!(format_duration(DAY_IN_SECONDS), "1 day");
        assert_eq!(format_duration(7 * DAY_IN_SECONDS), "7 days");
        assert_eq!(format_duration(90), "90 s");
    }

    #[test]
    fn plugin_line_shows_state() {
        let mut record = PluginRecord::new("akismet/akismet.php", "5.3", "6.4", true, 0);
        record.in_directory = Some(true);
        let line = plugin_line(&PluginStatus {
            id: "akismet/akismet.php".into(),
            active: true,
            current_vote: Some(true),
            record,
        });
        assert_eq!(line, "akismet/akismet.php 5.3 [active] listed works");
    }
}
