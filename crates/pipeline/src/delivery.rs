//! Export seam toward the digital-asset-management system.

use async_trait::async_trait;
use chrono::Utc;
use gfxdesk_core::{Card, CardId, Timestamp};
use serde::Serialize;
use uuid::Uuid;

/// Acknowledgement of a delivered batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    pub batch_id: Uuid,
    pub card_ids: Vec<CardId>,
    pub delivered_at: Timestamp,
}

impl DeliveryReceipt {
    pub fn for_cards(cards: &[Card]) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            card_ids: cards.iter().map(|c| c.id.clone()).collect(),
            delivered_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("Delivery rejected: {0}")]
    Rejected(String),

    #[error("Asset sink unavailable: {0}")]
    Unavailable(String),
}

/// Receives approved cards. A batch counts as delivered only once `export`
/// returns `Ok`.
#[async_trait]
pub trait AssetSink: Send + Sync {
    async fn export(&self, cards: &[Card]) -> Result<DeliveryReceipt, DeliveryError>;
}

/// Logs each batch and acknowledges it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingAssetSink;

#[async_trait]
impl AssetSink for LoggingAssetSink {
    async fn export(&self, cards: &[Card]) -> Result<DeliveryReceipt, DeliveryError> {
        if cards.is_empty() {
            return Err(DeliveryError::Rejected("empty batch".to_string()));
        }
        let receipt = DeliveryReceipt::for_cards(cards);
        for card in cards {
            tracing::info!(
                batch_id = %receipt.batch_id,
                card_id = %card.id,
                media_url = card.media_url(),
                "Card exported",
            );
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use gfxdesk_core::{GfxRecord, GfxStatus};

    use super::*;

    #[tokio::test]
    async fn logging_sink_acknowledges_every_card() {
        let cards = vec![
            Card::new("en", "ENGLISH", GfxRecord { status: GfxStatus::Approved, ..Default::default() }),
            Card::new("ja", "JAPANESE", GfxRecord { status: GfxStatus::Approved, ..Default::default() }),
        ];
        let receipt = LoggingAssetSink.export(&cards).await.unwrap();
        assert_eq!(receipt.card_ids, vec!["gfx-en".to_string(), "gfx-ja".to_string()]);
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        assert_matches!(LoggingAssetSink.export(&[]).await, Err(DeliveryError::Rejected(_)));
    }
}
