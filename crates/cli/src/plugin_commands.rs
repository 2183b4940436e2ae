use {anyhow::Result, clap::ValueEnum, compat_poll::Reporter};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Verdict {
    Works,
    Broken,
}

impl Verdict {
    pub fn is_compatible(self) -> bool {
        matches!(self, Self::Works)
    }
}

pub async fn handle_vote(
    reporter: &Reporter,
    plugin_id: &str,
    version: &str,
    verdict: Verdict,
) -> Result<()> {
    reporter
        .manual_vote(plugin_id, version, verdict.is_compatible())
        .await?;
    let label = match verdict {
        Verdict::Works => "works",
        Verdict::Broken => "broken",
    };
    println!("Reported {plugin_id} {version} as {label}.");
    Ok(())
}

pub async fn handle_activation(reporter: &Reporter, plugin_id: &str, active: bool) -> Result<()> {
    let changed = if active {
        reporter.plugin_activated(plugin_id).await?
    } else {
        reporter.plugin_deactivated(plugin_id).await?
    };
    let state = if active { "active" } else { "inactive" };
    if changed {
        println!("{plugin_id} is now {state}.");
    } else {
        println!("{plugin_id} was already {state}.");
    }
    Ok(())
}
