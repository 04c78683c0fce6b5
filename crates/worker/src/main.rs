//! `gfxdesk-worker` -- runs a generate → review → deliver pass over a campaign
//! using the mock generation backend.
//!
//! # Environment variables
//!
//! | Variable                      | Default   | Description                               |
//! |-------------------------------|-----------|-------------------------------------------|
//! | `GFX_CAMPAIGN_FILE`           | --        | Campaign JSON; the sample campaign if unset |
//! | `GFX_LANGUAGES`               | all       | Comma-separated language codes to generate |
//! | `GFX_AUTO_APPROVE`            | `true`    | Approve every reviewed card before delivery |
//! | `GFX_GENERATE_DELAY_MIN_MS`   | `2000`    | Lower bound of generate latency           |
//! | `GFX_GENERATE_DELAY_MAX_MS`   | `5000`    | Upper bound of generate latency           |
//! | `GFX_REGENERATE_DELAY_MIN_MS` | `5000`    | Lower bound of regenerate latency         |
//! | `GFX_REGENERATE_DELAY_MAX_MS` | `10000`   | Upper bound of regenerate latency         |
//! | `GFX_FAILURE_RATE`            | `0.0`     | Probability a generation fails            |

use anyhow::Context;
use gfxdesk_worker::{run, WorkerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gfxdesk_worker=info,gfxdesk_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env().context("invalid worker configuration")?;
    let report = run(config).await?;

    tracing::info!(
        campaign_id = %report.campaign_id,
        delivered = report.delivered.len(),
        failed = report.failed.len(),
        events = report.events,
        "Simulation finished",
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
