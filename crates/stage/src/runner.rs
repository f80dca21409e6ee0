//! Fixed-rate stage loop.

use crate::config::Config;
use crate::entity::Kind;
use crate::stage::{KindCounts, Stage};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

/// Outcome of a finished run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub ticks: u64,
    pub winner: Option<Kind>,
    pub counts: KindCounts,
    pub conversions: usize,
}

/// Run the stage until one kind is left or the tick limit is reached.
pub async fn run(config: Config) -> anyhow::Result<RunSummary> {
    let tick_interval_ms = config.stage.tick_interval_ms;
    let max_ticks = config.stage.max_ticks;
    let report_every = config.stage.report_every.max(1);

    let mut stage = Stage::new(config)?;
    let counts = stage.counts();
    info!(
        "Stage initialized: {} rocks, {} papers, {} scissors",
        counts.rocks, counts.papers, counts.scissors
    );

    let mut conversions = 0;
    if counts.total() == 0 || stage.winner().is_some() {
        info!("Nothing to simulate");
        return Ok(summary(&stage, conversions));
    }

    let mut ticker = (tick_interval_ms > 0).then(|| {
        let period = Duration::from_millis(tick_interval_ms);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    });

    loop {
        match ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => tokio::task::yield_now().await,
        }

        let report = stage.update()?;
        conversions += report.conversions;
        let tick = stage.tick_count();
        if report.conversions > 0 {
            debug!("Tick {}: {} conversions", tick, report.conversions);
        }

        if tick % report_every == 0 {
            let counts = stage.counts();
            info!(
                "Tick {}: {} rocks, {} papers, {} scissors",
                tick, counts.rocks, counts.papers, counts.scissors
            );
        }

        if let Some(winner) = stage.winner() {
            info!("{} wins after {} ticks", winner, tick);
            break;
        }
        if max_ticks > 0 && tick >= max_ticks {
            info!("Reached the tick limit of {}", max_ticks);
            break;
        }
    }

    Ok(summary(&stage, conversions))
}

fn summary(stage: &Stage, conversions: usize) -> RunSummary {
    RunSummary {
        ticks: stage.tick_count(),
        winner: stage.winner(),
        counts: stage.counts(),
        conversions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(objects_per_kind: usize, tick_interval_ms: u64, max_ticks: u64) -> Config {
        let mut config = Config::default();
        config.stage.objects_per_kind = objects_per_kind;
        config.stage.tick_interval_ms = tick_interval_ms;
        config.stage.max_ticks = max_ticks;
        config.stage.seed = Some(5);
        config
    }

    #[tokio::test]
    async fn test_run_stops_at_tick_limit() {
        let summary = run(config(5, 1, 3)).await.unwrap();

        if summary.winner.is_none() {
            assert_eq!(summary.ticks, 3);
        } else {
            assert!(summary.ticks <= 3);
        }
        assert_eq!(summary.counts.total(), 15);
    }

    #[tokio::test]
    async fn test_run_without_timer() {
        let summary = run(config(4, 0, 10)).await.unwrap();

        if summary.winner.is_none() {
            assert_eq!(summary.ticks, 10);
        }
        assert_eq!(summary.counts.total(), 12);
    }

    #[tokio::test]
    async fn test_empty_stage_returns_immediately() {
        let summary = run(config(0, 0, 0)).await.unwrap();

        assert_eq!(summary.ticks, 0);
        assert_eq!(summary.winner, None);
        assert_eq!(summary.conversions, 0);
    }
}
