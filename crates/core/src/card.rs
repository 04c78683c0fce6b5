//! Review cards: by-value snapshots of a language's generated asset.

use serde::{Deserialize, Serialize};

use crate::campaign::Language;
use crate::lifecycle::GfxRecord;
use crate::status::GfxStatus;
use crate::types::{CardId, LanguageCode};

/// Prefix of every card identifier.
pub const CARD_ID_PREFIX: &str = "gfx-";

/// Deterministic card id for a language code.
pub fn card_id_for(code: &str) -> CardId {
    format!("{CARD_ID_PREFIX}{code}")
}

/// A reviewable copy of one language's generation fields.
///
/// Edits to a card never alias the source language; they reach the campaign
/// only through [`CardReviewSet::reconcile`](crate::review::CardReviewSet::reconcile).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub language_code: LanguageCode,
    pub language_name: String,
    #[serde(flatten)]
    pub gfx: GfxRecord,
}

impl Card {
    pub fn new(code: &str, language_name: &str, gfx: GfxRecord) -> Self {
        Self {
            id: card_id_for(code),
            language_code: code.to_string(),
            language_name: language_name.to_string(),
            gfx,
        }
    }

    pub fn from_language(language: &Language) -> Self {
        Self::new(&language.code, &language.name, language.gfx.clone())
    }

    pub fn status(&self) -> GfxStatus {
        self.gfx.status
    }

    /// Media URL, or empty when nothing has been generated yet.
    pub fn media_url(&self) -> &str {
        self.gfx.media_url.as_deref().unwrap_or_default()
    }

    /// Stored prompt, or empty when nothing has been generated yet.
    pub fn prompt(&self) -> &str {
        self.gfx.prompt.as_deref().unwrap_or_default()
    }
}
