//! One full generate → review → deliver pass over a campaign.

use std::sync::Arc;

use anyhow::Context;
use gfxdesk_core::sample::sample_campaign;
use gfxdesk_core::{Campaign, GfxStatus, LanguageCode};
use gfxdesk_events::EventBus;
use gfxdesk_pipeline::{LoggingAssetSink, MockBackend, Orchestrator, OrchestratorHandle};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::config::WorkerConfig;

/// Where each language ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationReport {
    pub campaign_id: String,
    pub delivered: Vec<LanguageCode>,
    pub awaiting_review: Vec<LanguageCode>,
    pub failed: Vec<LanguageCode>,
    pub not_started: Vec<LanguageCode>,
    /// Length of the event log at the end of the run.
    pub events: usize,
}

impl SimulationReport {
    fn from_campaign(campaign: &Campaign, events: usize) -> Self {
        Self {
            campaign_id: campaign.id.clone(),
            delivered: campaign.codes_with_status(GfxStatus::Delivered),
            awaiting_review: campaign.codes_with_status(GfxStatus::NeedsReview),
            failed: campaign.codes_with_status(GfxStatus::Failed),
            not_started: campaign.codes_with_status(GfxStatus::NotStarted),
            events,
        }
    }
}

/// Load the configured campaign, or the sample when none is configured.
pub async fn load_campaign(config: &WorkerConfig) -> anyhow::Result<Campaign> {
    let Some(path) = &config.campaign_file else {
        return Ok(sample_campaign());
    };
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading campaign file {}", path.display()))?;
    let campaign = Campaign::from_json(&json)
        .with_context(|| format!("parsing campaign file {}", path.display()))?;
    Ok(campaign)
}

/// Run the simulation to completion and shut the orchestrator down.
pub async fn run(config: WorkerConfig) -> anyhow::Result<SimulationReport> {
    let campaign = load_campaign(&config).await?;
    let codes = match &config.languages {
        Some(codes) => codes.clone(),
        None => campaign.codes_with_status(GfxStatus::NotStarted),
    };

    tracing::info!(
        campaign_id = %campaign.id,
        name = %campaign.name,
        languages = ?codes,
        auto_approve = config.auto_approve,
        "Starting simulation",
    );

    let bus = Arc::new(EventBus::default());
    let listener = spawn_event_listener(&bus);
    let handle = Orchestrator::spawn(
        campaign,
        Arc::new(MockBackend::new(config.generation.clone())),
        Arc::new(LoggingAssetSink),
        Arc::clone(&bus),
    );

    let result = drive(&handle, codes, config.auto_approve).await;
    handle.shutdown().await?;
    listener.abort();
    result
}

async fn drive(
    handle: &OrchestratorHandle,
    codes: Vec<LanguageCode>,
    auto_approve: bool,
) -> anyhow::Result<SimulationReport> {
    if !codes.is_empty() {
        handle.request_generation(codes, None).await?;
        handle.wait_until_idle().await?;
    }

    let review = handle.open_review().await?;
    tracing::info!(cards = review.cards().len(), "Review set ready");

    if auto_approve {
        for card in review.review_cards() {
            if review.actions(&card.id)?.approve {
                handle.approve(card.id.clone()).await?;
            }
        }
    }

    if handle.review().await?.can_deliver() {
        let receipt = handle.confirm_delivery().await?;
        tracing::info!(
            batch_id = %receipt.batch_id,
            cards = receipt.card_ids.len(),
            "Batch delivered",
        );
    } else {
        tracing::info!("Nothing approved, skipping delivery");
    }
    handle.close_review().await?;

    let campaign = handle.campaign().await?;
    let events = handle.event_log().await?.len();
    Ok(SimulationReport::from_campaign(&campaign, events))
}

/// Log every bus event until the bus goes away.
fn spawn_event_listener(bus: &EventBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => tracing::info!(
                    event_type = %event.event_type,
                    source = event.source_entity_id.as_deref().unwrap_or("-"),
                    "Event",
                ),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event listener lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
