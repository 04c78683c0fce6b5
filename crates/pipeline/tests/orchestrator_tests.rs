//! End-to-end runs of the orchestrator against the mock backend.
//!
//! Every test runs with tokio's clock paused, so the randomized generation
//! delays elapse in virtual time.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;

use gfxdesk_core::catalog;
use gfxdesk_core::sample::sample_campaign;
use gfxdesk_core::{Campaign, Card, CoreError, Disposition, GfxStatus};
use gfxdesk_events::{lifecycle, EventBus};
use gfxdesk_pipeline::{
    AssetSink, DeliveryError, DeliveryReceipt, GenerationConfig, LoggingAssetSink, MockBackend,
    Orchestrator, OrchestratorError, OrchestratorHandle,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct RefusingSink;

#[async_trait]
impl AssetSink for RefusingSink {
    async fn export(&self, _cards: &[Card]) -> Result<DeliveryReceipt, DeliveryError> {
        Err(DeliveryError::Unavailable("maintenance window".to_string()))
    }
}

fn start_with(config: GenerationConfig, sink: Arc<dyn AssetSink>) -> (OrchestratorHandle, Arc<EventBus>) {
    let bus = Arc::new(EventBus::default());
    let handle = Orchestrator::spawn(
        sample_campaign(),
        Arc::new(MockBackend::new(config)),
        sink,
        Arc::clone(&bus),
    );
    (handle, bus)
}

fn start() -> (OrchestratorHandle, Arc<EventBus>) {
    start_with(GenerationConfig::default(), Arc::new(LoggingAssetSink))
}

fn status(campaign: &Campaign, code: &str) -> GfxStatus {
    campaign.language(code).unwrap().status()
}

fn codes(list: &[&str]) -> Vec<String> {
    list.iter().map(|c| c.to_string()).collect()
}

/// Generate `list` and wait for every result to land.
async fn generate(handle: &OrchestratorHandle, list: &[&str]) -> Campaign {
    handle.request_generation(codes(list), None).await.unwrap();
    handle.wait_until_idle().await.unwrap()
}

fn assert_error_message_invariant(campaign: &Campaign) {
    for language in campaign.languages() {
        assert_eq!(
            language.gfx.error_message.is_some(),
            language.status() == GfxStatus::Failed,
            "{}",
            language.code
        );
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn generate_two_approve_one_deliver_without_selection() {
    let (handle, _bus) = start();

    handle.request_generation(codes(&["en", "ja"]), None).await.unwrap();
    let campaign = handle.campaign().await.unwrap();
    assert_eq!(status(&campaign, "en"), GfxStatus::Generating);
    assert_eq!(status(&campaign, "ja"), GfxStatus::Generating);

    let campaign = handle.wait_until_idle().await.unwrap();
    for code in ["en", "ja"] {
        let language = campaign.language(code).unwrap();
        assert_eq!(language.status(), GfxStatus::NeedsReview);
        assert_eq!(language.gfx.media_url.as_deref(), Some(catalog::media_url_for(code).as_str()));
        assert_eq!(language.gfx.prompt.as_deref(), Some(catalog::default_prompt_for(code)));
    }

    let review = handle.open_review().await.unwrap();
    assert_eq!(review.cards().len(), 2);
    handle.approve("gfx-en").await.unwrap();

    let receipt = handle.confirm_delivery().await.unwrap();
    assert_eq!(receipt.card_ids, vec!["gfx-en".to_string()]);

    let campaign = handle.campaign().await.unwrap();
    assert_eq!(status(&campaign, "en"), GfxStatus::Delivered);
    assert_eq!(status(&campaign, "ja"), GfxStatus::NeedsReview);
    assert_eq!(status(&campaign, "zh-TW"), GfxStatus::NotStarted);
    assert_eq!(status(&campaign, "th"), GfxStatus::NotStarted);

    let review = handle.review().await.unwrap();
    assert_eq!(review.delivered_cards().len(), 1);
    assert_eq!(review.review_cards().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn every_language_passes_through_queued_and_generating() {
    let (handle, _bus) = start();
    generate(&handle, &["zh-TW", "en", "ja", "th"]).await;

    let log = handle.event_log().await.unwrap();
    for code in ["zh-TW", "en", "ja", "th"] {
        assert_eq!(
            log.applied_actions(code),
            vec!["request_generation", "start_generation", "complete_generation"],
            "{code}"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn request_is_atomic_over_the_selection() {
    let (handle, _bus) = start();
    let err = handle
        .request_generation(codes(&["en", "xx"]), None)
        .await
        .unwrap_err();
    assert_matches!(err, OrchestratorError::Core(CoreError::NotFound { .. }));

    let campaign = handle.campaign().await.unwrap();
    assert_eq!(status(&campaign, "en"), GfxStatus::NotStarted);
    assert!(handle.event_log().await.unwrap().is_empty());

    let err = handle.request_generation(Vec::new(), None).await.unwrap_err();
    assert_matches!(err, OrchestratorError::Core(CoreError::Validation(_)));
}

#[tokio::test(start_paused = true)]
async fn prompt_override_reaches_the_result() {
    let (handle, _bus) = start();
    handle
        .request_generation(codes(&["th"]), Some("Gold leaf on black lacquer".to_string()))
        .await
        .unwrap();
    let campaign = handle.wait_until_idle().await.unwrap();
    assert_eq!(
        campaign.language("th").unwrap().gfx.prompt.as_deref(),
        Some("Gold leaf on black lacquer")
    );
}

#[tokio::test(start_paused = true)]
async fn failed_generation_stores_message_and_can_be_retried() {
    let config = GenerationConfig {
        failure_rate: 1.0,
        ..GenerationConfig::default()
    };
    let (handle, _bus) = start_with(config, Arc::new(LoggingAssetSink));

    let campaign = generate(&handle, &["ja"]).await;
    assert_eq!(status(&campaign, "ja"), GfxStatus::Failed);
    assert!(campaign.language("ja").unwrap().gfx.error_message.is_some());
    assert_error_message_invariant(&campaign);

    let review = handle.open_review().await.unwrap();
    assert!(review.cards().is_empty());

    handle.request_generation(codes(&["ja"]), None).await.unwrap();
    let campaign = handle.campaign().await.unwrap();
    assert_eq!(status(&campaign, "ja"), GfxStatus::Generating);
    assert_error_message_invariant(&campaign);
}

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn unchanged_prompt_is_rejected_and_changes_nothing() {
    let (handle, _bus) = start();
    let before = generate(&handle, &["en"]).await;
    handle.open_review().await.unwrap();

    let err = handle
        .regenerate("gfx-en", catalog::default_prompt_for("en"))
        .await
        .unwrap_err();
    assert_matches!(err, OrchestratorError::Core(CoreError::Validation(_)));

    let after = handle.campaign().await.unwrap();
    assert_eq!(after.language("en"), before.language("en"));
}

#[tokio::test(start_paused = true)]
async fn edited_prompt_regenerates_with_the_new_prompt() {
    let (handle, _bus) = start();
    generate(&handle, &["ja"]).await;
    handle.open_review().await.unwrap();

    let change = handle
        .regenerate("gfx-ja", "Cherry blossoms over a burning island")
        .await
        .unwrap();
    assert_eq!(change.status, GfxStatus::Generating);
    assert_eq!(status(&handle.campaign().await.unwrap(), "ja"), GfxStatus::Generating);

    let campaign = handle.wait_until_idle().await.unwrap();
    let ja = campaign.language("ja").unwrap();
    assert_eq!(ja.status(), GfxStatus::NeedsReview);
    assert_eq!(ja.gfx.prompt.as_deref(), Some("Cherry blossoms over a burning island"));
    assert_eq!(ja.gfx.media_url.as_deref(), Some(catalog::media_url_for("ja").as_str()));

    let review = handle.review().await.unwrap();
    assert_eq!(
        review.card("gfx-ja").unwrap().prompt(),
        "Cherry blossoms over a burning island"
    );
}

#[tokio::test(start_paused = true)]
async fn approval_during_regeneration_wins_over_the_late_result() {
    let (handle, _bus) = start();
    generate(&handle, &["en"]).await;
    handle.open_review().await.unwrap();

    handle.regenerate("gfx-en", "A darker take").await.unwrap();
    let change = handle.approve("gfx-en").await.unwrap();
    assert_eq!(change.status, GfxStatus::Approved);

    // Regeneration delays top out at ten seconds.
    tokio::time::sleep(Duration::from_secs(11)).await;

    let campaign = handle.campaign().await.unwrap();
    let en = campaign.language("en").unwrap();
    assert_eq!(en.status(), GfxStatus::Approved);
    assert_eq!(en.gfx.prompt.as_deref(), Some(catalog::default_prompt_for("en")));

    let log = handle.event_log().await.unwrap();
    let stale: Vec<_> = log
        .for_language("en")
        .filter(|e| e.disposition == Disposition::Stale)
        .collect();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].event.action(), "complete_generation");
}

#[tokio::test(start_paused = true)]
async fn explicit_selection_is_delivered_exactly() {
    let (handle, _bus) = start();
    generate(&handle, &["zh-TW", "en", "ja"]).await;
    handle.open_review().await.unwrap();
    for card in ["gfx-zh-TW", "gfx-en", "gfx-ja"] {
        handle.approve(card).await.unwrap();
    }
    assert!(handle.toggle_selection("gfx-ja").await.unwrap());

    let receipt = handle.confirm_delivery().await.unwrap();
    assert_eq!(receipt.card_ids, vec!["gfx-ja".to_string()]);

    let campaign = handle.campaign().await.unwrap();
    assert_eq!(status(&campaign, "ja"), GfxStatus::Delivered);
    assert_eq!(status(&campaign, "en"), GfxStatus::Approved);
    assert_eq!(status(&campaign, "zh-TW"), GfxStatus::Approved);

    let review = handle.review().await.unwrap();
    assert_eq!(review.selected().count(), 0);
    let actions = review.actions("gfx-ja").unwrap();
    assert!(!actions.approve && !actions.edit_and_regenerate && !actions.select);
}

#[tokio::test(start_paused = true)]
async fn refused_delivery_changes_nothing() {
    let (handle, _bus) = start_with(GenerationConfig::default(), Arc::new(RefusingSink));
    generate(&handle, &["en"]).await;
    handle.open_review().await.unwrap();
    handle.approve("gfx-en").await.unwrap();

    let err = handle.confirm_delivery().await.unwrap_err();
    assert_matches!(err, OrchestratorError::Delivery(DeliveryError::Unavailable(_)));

    assert_eq!(status(&handle.campaign().await.unwrap(), "en"), GfxStatus::Approved);
    let review = handle.review().await.unwrap();
    assert_eq!(review.card("gfx-en").unwrap().status(), GfxStatus::Approved);
    assert!(!handle.event_log().await.unwrap().applied_actions("en").contains(&"deliver"));
}

#[tokio::test(start_paused = true)]
async fn card_actions_need_an_open_review() {
    let (handle, _bus) = start();
    generate(&handle, &["en"]).await;

    assert_matches!(handle.approve("gfx-en").await, Err(OrchestratorError::ReviewClosed));
    assert_matches!(handle.confirm_delivery().await, Err(OrchestratorError::ReviewClosed));

    handle.open_review().await.unwrap();
    handle.reject("gfx-en").await.unwrap();
    handle.close_review().await.unwrap();
    assert_matches!(handle.review().await, Err(OrchestratorError::ReviewClosed));
    assert_eq!(status(&handle.campaign().await.unwrap(), "en"), GfxStatus::Rejected);
}

// ---------------------------------------------------------------------------
// Events and lifecycle
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn applied_events_are_published_on_the_bus() {
    let (handle, bus) = start();
    let mut rx = bus.subscribe();

    generate(&handle, &["th"]).await;
    handle.open_review().await.unwrap();
    handle.approve("gfx-th").await.unwrap();
    handle.confirm_delivery().await.unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        seen.push(event.event_type);
    }
    assert_eq!(
        seen,
        vec![
            "gfx.queued",
            "gfx.generating",
            "gfx.needs_review",
            "gfx.approved",
            "gfx.delivered",
            lifecycle::DELIVERY_CONFIRMED,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_the_handle() {
    let (handle, _bus) = start();
    handle.request_generation(codes(&["en"]), None).await.unwrap();
    handle.shutdown().await.unwrap();

    assert_matches!(handle.campaign().await, Err(OrchestratorError::Stopped));
}
