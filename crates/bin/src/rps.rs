//! Rps - Rock, paper, scissors simulation binary

use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Rps - Rock Paper Scissors v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = stage::Config::load()?;
    info!("Loaded configuration");
    info!("  Universe: {}x{}", config.stage.width, config.stage.height);
    info!("  Objects per kind: {}", config.stage.objects_per_kind);
    info!("  Node capacity: {}", config.stage.capacity);
    match config.stage.seed {
        Some(seed) => info!("  Seed: {}", seed),
        None => info!("  Seed: random"),
    }

    let summary = stage::run(config).await?;
    match summary.winner {
        Some(winner) => info!("Winner: {} after {} ticks", winner, summary.ticks),
        None => info!("No winner after {} ticks", summary.ticks),
    }
    info!(
        "Final population: {} rocks, {} papers, {} scissors ({} conversions)",
        summary.counts.rocks, summary.counts.papers, summary.counts.scissors, summary.conversions
    );

    Ok(())
}
