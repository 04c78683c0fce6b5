//! Card review set: the batch review, approval and delivery surface.
//!
//! A [`CardReviewSet`] is a by-value projection of the campaign's eligible
//! languages. Card actions run the same pure lifecycle transition as the
//! campaign reducer, but against the card copies; changes reach the campaign
//! only through [`CardReviewSet::reconcile`]. The reverse direction (results
//! landing on the campaign while the set is open) goes through
//! [`CardReviewSet::refresh`].

use std::collections::BTreeSet;

use serde::Serialize;

use crate::campaign::{Campaign, Language, LanguagePatch};
use crate::card::Card;
use crate::error::CoreError;
use crate::lifecycle::{transition, Disposition, GfxEvent};
use crate::reducer::{lift_effect, Effect};
use crate::status::GfxStatus;
use crate::types::{CardId, LanguageCode};

/// Tabs of the review screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewTab {
    /// Everything not yet delivered.
    Review,
    Delivered,
}

/// Which per-card actions the review tab offers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CardActions {
    pub approve: bool,
    pub edit_and_regenerate: bool,
    pub select: bool,
}

impl CardActions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn for_status(status: GfxStatus) -> Self {
        use GfxStatus as S;
        Self {
            approve: matches!(status, S::NeedsReview | S::Rejected),
            edit_and_regenerate: matches!(status, S::NeedsReview | S::Approved | S::Rejected),
            select: status == S::Approved,
        }
    }
}

/// Header counts for the review screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReviewSummary {
    pub review_count: usize,
    pub delivered_count: usize,
    pub approved_count: usize,
    pub selected_count: usize,
    pub can_deliver: bool,
}

/// Outcome of a card action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardChange {
    pub card_id: CardId,
    pub code: LanguageCode,
    pub status: GfxStatus,
    pub disposition: Disposition,
    /// Backend work to start, if the action requested a regeneration.
    pub effect: Option<Effect>,
}

/// Whether a language is promoted into the review set.
pub fn is_eligible(language: &Language) -> bool {
    language.status().is_review_eligible()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CardReviewSet {
    cards: Vec<Card>,
    selected: BTreeSet<CardId>,
    #[serde(skip)]
    dirty: BTreeSet<CardId>,
}

impl CardReviewSet {
    /// Snapshot every eligible language into a card, in campaign order.
    pub fn snapshot(campaign: &Campaign) -> Self {
        Self {
            cards: campaign
                .languages()
                .iter()
                .filter(|l| is_eligible(l))
                .map(Card::from_language)
                .collect(),
            selected: BTreeSet::new(),
            dirty: BTreeSet::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn card_for_language(&self, code: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.language_code == code)
    }

    fn position(&self, id: &str) -> Result<usize, CoreError> {
        self.cards
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| CoreError::card_not_found(id))
    }

    /// Cards shown on `tab`.
    pub fn tab(&self, tab: ReviewTab) -> Vec<&Card> {
        self.cards
            .iter()
            .filter(|c| match tab {
                ReviewTab::Review => c.status() != GfxStatus::Delivered,
                ReviewTab::Delivered => c.status() == GfxStatus::Delivered,
            })
            .collect()
    }

    pub fn review_cards(&self) -> Vec<&Card> {
        self.tab(ReviewTab::Review)
    }

    pub fn delivered_cards(&self) -> Vec<&Card> {
        self.tab(ReviewTab::Delivered)
    }

    pub fn approved_count(&self) -> usize {
        self.cards
            .iter()
            .filter(|c| c.status() == GfxStatus::Approved)
            .count()
    }

    /// True when the review tab is non-empty and every card on it is approved.
    pub fn all_approved(&self) -> bool {
        let review = self.review_cards();
        !review.is_empty() && review.iter().all(|c| c.status() == GfxStatus::Approved)
    }

    pub fn selected(&self) -> impl Iterator<Item = &CardId> {
        self.selected.iter()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    /// Actions offered for a card. Delivered and generating cards get none.
    pub fn actions(&self, id: &str) -> Result<CardActions, CoreError> {
        let card = &self.cards[self.position(id)?];
        Ok(CardActions::for_status(card.status()))
    }

    /// Cards a delivery would export right now.
    ///
    /// A non-empty explicit selection wins outright; otherwise every
    /// currently approved card is implied.
    pub fn delivery_targets(&self) -> Vec<CardId> {
        if !self.selected.is_empty() {
            return self
                .cards
                .iter()
                .filter(|c| self.selected.contains(&c.id))
                .map(|c| c.id.clone())
                .collect();
        }
        self.cards
            .iter()
            .filter(|c| c.status() == GfxStatus::Approved)
            .map(|c| c.id.clone())
            .collect()
    }

    pub fn can_deliver(&self) -> bool {
        !self.delivery_targets().is_empty()
    }

    pub fn summary(&self) -> ReviewSummary {
        ReviewSummary {
            review_count: self.review_cards().len(),
            delivered_count: self.delivered_cards().len(),
            approved_count: self.approved_count(),
            selected_count: self.selected.len(),
            can_deliver: self.can_deliver(),
        }
    }

    /// Whether any card has changes not yet reconciled into the campaign.
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Toggle the explicit delivery selection of an approved card.
    ///
    /// Returns whether the card is selected afterwards.
    pub fn toggle_selection(&mut self, id: &str) -> Result<bool, CoreError> {
        let card = &self.cards[self.position(id)?];
        if card.status() != GfxStatus::Approved {
            return Err(CoreError::Conflict(format!(
                "Only approved cards can be selected for delivery ({} is {})",
                card.id,
                card.status()
            )));
        }
        if self.selected.remove(id) {
            Ok(false)
        } else {
            self.selected.insert(card.id.clone());
            Ok(true)
        }
    }

    /// Apply a lifecycle event to one card copy.
    pub fn apply(&mut self, id: &str, event: &GfxEvent) -> Result<CardChange, CoreError> {
        let index = self.position(id)?;
        let card = &self.cards[index];
        let step = transition(&card.language_code, &card.gfx, event)?;
        let effect = step
            .effect
            .map(|e| lift_effect(&card.language_code, &card.language_name, &card.gfx, e));

        let card = &mut self.cards[index];
        if step.disposition == Disposition::Applied {
            card.gfx = step.record;
            self.dirty.insert(card.id.clone());
            if card.status() != GfxStatus::Approved {
                self.selected.remove(&card.id);
            }
        }

        Ok(CardChange {
            card_id: card.id.clone(),
            code: card.language_code.clone(),
            status: card.status(),
            disposition: step.disposition,
            effect,
        })
    }

    /// Deliver the current [`delivery_targets`](Self::delivery_targets) in one step.
    ///
    /// Every target is validated before any card changes, so a single
    /// non-approved member aborts the whole delivery. Clears the selection.
    pub fn deliver(&mut self) -> Result<Vec<CardId>, CoreError> {
        let targets = self.delivery_targets();
        if targets.is_empty() {
            return Err(CoreError::Validation(
                "No approved cards to deliver".to_string(),
            ));
        }

        let mut staged = Vec::with_capacity(targets.len());
        for id in &targets {
            let index = self.position(id)?;
            let card = &self.cards[index];
            let step = transition(&card.language_code, &card.gfx, &GfxEvent::Delivered)?;
            staged.push((index, step.record));
        }

        for (index, record) in staged {
            let card = &mut self.cards[index];
            card.gfx = record;
            self.dirty.insert(card.id.clone());
        }
        self.selected.clear();
        Ok(targets)
    }

    /// Copy every changed card back onto its campaign language.
    ///
    /// Returns the language codes that were written.
    pub fn reconcile(&mut self, campaign: &mut Campaign) -> Result<Vec<LanguageCode>, CoreError> {
        let mut written = Vec::with_capacity(self.dirty.len());
        for card in self.cards.iter().filter(|c| self.dirty.contains(&c.id)) {
            campaign.update_language(&card.language_code, LanguagePatch::from_record(&card.gfx))?;
            written.push(card.language_code.clone());
        }
        self.dirty.clear();
        Ok(written)
    }

    /// Pull the campaign's current state into every clean card.
    ///
    /// Cards with unreconciled changes keep their local state. Languages
    /// that became eligible after the snapshot are not added.
    pub fn refresh(&mut self, campaign: &Campaign) {
        for card in &mut self.cards {
            if self.dirty.contains(&card.id) {
                continue;
            }
            if let Some(language) = campaign.language(&card.language_code) {
                card.gfx = language.gfx.clone();
            }
        }
        let cards = &self.cards;
        self.selected.retain(|id| {
            cards
                .iter()
                .any(|c| &c.id == id && c.status() == GfxStatus::Approved)
        });
    }
}
