//! Event names and constructors for GFX lifecycle changes.

use gfxdesk_core::{Disposition, GfxEvent, GfxStatus};
use serde_json::json;

/// Namespace of every lifecycle event type.
pub const GFX_EVENT_PREFIX: &str = "gfx";

/// Published once per confirmed delivery batch.
pub const DELIVERY_CONFIRMED: &str = "delivery.confirmed";

/// Published when a generation result arrives for a superseded ticket.
pub const GFX_RESULT_STALE: &str = "gfx.result_stale";

pub const SOURCE_LANGUAGE: &str = "language";

/// `gfx.<status>`, e.g. `gfx.needs_review`.
pub fn event_type_for(status: GfxStatus) -> String {
    format!("{GFX_EVENT_PREFIX}.{}", status.as_str())
}

/// Envelope for an event applied to one language.
///
/// Applied events are named after the status they produced; stale results
/// get [`GFX_RESULT_STALE`].
pub fn language_event(
    campaign_id: &str,
    code: &str,
    event: &GfxEvent,
    disposition: Disposition,
    status: GfxStatus,
) -> crate::PlatformEvent {
    let event_type = match disposition {
        Disposition::Applied => event_type_for(status),
        Disposition::Stale => GFX_RESULT_STALE.to_string(),
    };
    crate::PlatformEvent::new(event_type)
        .with_source(SOURCE_LANGUAGE, code)
        .with_campaign(campaign_id)
        .with_payload(json!({
            "action": event.action(),
            "status": status,
        }))
}

/// Envelope for a confirmed delivery batch.
pub fn delivery_event(campaign_id: &str, batch_id: &str, card_ids: &[String]) -> crate::PlatformEvent {
    crate::PlatformEvent::new(DELIVERY_CONFIRMED)
        .with_campaign(campaign_id)
        .with_payload(json!({
            "batch_id": batch_id,
            "cards": card_ids,
        }))
}
