use std::sync::Arc;

use anyhow::Context;
use outreach_agent::campaign::Campaign;
use outreach_agent::campaign::engine::CampaignEngine;
use outreach_agent::campaign::runner;
use outreach_agent::config::{CampaignConfig, RunMode};
use outreach_agent::leads::{LeadQuery, LeadSource, MockDirectory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = CampaignConfig::from_env().context("Invalid OUTREACH_* configuration")?;

    eprintln!("📬 Outreach Agent v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Industries: {}", config.industry_filter);
    eprintln!("   Region: {}", config.region);
    eprintln!("   Roles: {}", config.role_filter.join(", "));
    eprintln!("   Mode: {:?}", config.mode);
    match config.seed {
        Some(seed) => eprintln!("   Seed: {}", seed),
        None => eprintln!("   Seed: (entropy)"),
    }

    let engine = CampaignEngine::from_config(&config).context("Failed to wire campaign")?;

    // ── Leads ───────────────────────────────────────────────────────────
    let query = LeadQuery::new(
        config.industry_filter.clone(),
        config.region.clone(),
        config.role_filter.clone(),
    );
    let contacts = MockDirectory::sample().find_contacts(&query);
    if contacts.is_empty() {
        eprintln!("   No leads matched the filters, nothing to do.");
        return Ok(());
    }
    eprintln!("   Leads: {}\n", contacts.len());

    let mut campaign = Campaign::new(format!("{} outreach", config.region), contacts);

    // ── Run ─────────────────────────────────────────────────────────────
    let summary = match config.mode {
        RunMode::Demo => runner::run_demo(&engine, &mut campaign).await,
        RunMode::Scheduled => {
            let handle = runner::spawn_scheduled(Arc::new(engine), campaign, config.schedule());
            let stop = handle.stop_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("\n   Stopping after the current job...");
                    stop.stop();
                }
            });
            let finished = handle.join().await.context("Campaign worker panicked")?;
            finished.summary()
        }
    };

    eprintln!("\n📊 Campaign summary");
    eprintln!("{}", summary);
    let json = serde_json::to_string_pretty(&summary).context("Failed to encode summary")?;
    println!("{}", json);
    Ok(())
}
