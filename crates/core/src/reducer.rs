//! Campaign-level reduction: `(Campaign, LanguageEvent) -> Campaign`.
//!
//! The reducer routes each event to its language's record, runs the pure
//! [`transition`], writes the result back through the update-entry
//! operation, and lifts record-level effects into campaign-level [`Effect`]s
//! that carry enough context to start a backend job.

use serde::{Deserialize, Serialize};

use crate::campaign::{Campaign, LanguagePatch};
use crate::card::Card;
use crate::error::CoreError;
use crate::lifecycle::{transition, Disposition, GfxEvent, GfxRecord, RecordEffect};
use crate::types::{GenerationSeq, LanguageCode};

/// A lifecycle event addressed to one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageEvent {
    pub code: LanguageCode,
    pub event: GfxEvent,
}

impl LanguageEvent {
    pub fn new(code: impl Into<LanguageCode>, event: GfxEvent) -> Self {
        Self {
            code: code.into(),
            event,
        }
    }
}

/// What kind of backend call a job needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    Generate { prompt_override: Option<String> },
    /// `source` is the card as it was before the edit was requested.
    Regenerate { prompt: String, source: Card },
}

/// A backend invocation for one ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationJob {
    pub code: LanguageCode,
    pub language_name: String,
    pub seq: GenerationSeq,
    pub kind: JobKind,
}

/// Work requested by a reduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// The language is queued; feed `GenerationStarted` back in.
    StartGeneration { code: LanguageCode },
    /// Hand the job to the dispatcher.
    Dispatch(GenerationJob),
}

/// One event and how it landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEvent {
    pub code: LanguageCode,
    pub event: GfxEvent,
    pub disposition: Disposition,
}

/// Result of [`reduce`] or [`reduce_all`].
#[derive(Debug, Clone)]
pub struct Reduction {
    pub state: Campaign,
    pub effects: Vec<Effect>,
    pub applied: Vec<AppliedEvent>,
}

/// Lift a record effect into a campaign effect.
///
/// `before` is the record as it was before the transition; it becomes the
/// regeneration source card.
pub fn lift_effect(code: &str, language_name: &str, before: &GfxRecord, effect: RecordEffect) -> Effect {
    match effect {
        RecordEffect::StartGeneration => Effect::StartGeneration {
            code: code.to_string(),
        },
        RecordEffect::Generate {
            seq,
            prompt_override,
        } => Effect::Dispatch(GenerationJob {
            code: code.to_string(),
            language_name: language_name.to_string(),
            seq,
            kind: JobKind::Generate { prompt_override },
        }),
        RecordEffect::Regenerate { seq, prompt } => Effect::Dispatch(GenerationJob {
            code: code.to_string(),
            language_name: language_name.to_string(),
            seq,
            kind: JobKind::Regenerate {
                prompt,
                source: Card::new(code, language_name, before.clone()),
            },
        }),
    }
}

/// Apply one event to the campaign.
pub fn reduce(state: &Campaign, event: &LanguageEvent) -> Result<Reduction, CoreError> {
    reduce_all(state, std::slice::from_ref(event))
}

/// Apply a batch of events atomically.
///
/// Either every event applies and the returned state reflects all of them,
/// or the first failure is returned and `state` is left as it was.
pub fn reduce_all(state: &Campaign, events: &[LanguageEvent]) -> Result<Reduction, CoreError> {
    let mut next = state.clone();
    let mut effects = Vec::new();
    let mut applied = Vec::with_capacity(events.len());

    for LanguageEvent { code, event } in events {
        let before = next.require_language(code)?.clone();
        let step = transition(code, &before.gfx, event)?;

        if step.disposition == Disposition::Applied {
            next.update_language(code, LanguagePatch::from_record(&step.record))?;
        }
        if let Some(effect) = step.effect {
            effects.push(lift_effect(code, &before.name, &before.gfx, effect));
        }
        applied.push(AppliedEvent {
            code: code.clone(),
            event: event.clone(),
            disposition: step.disposition,
        });
    }

    Ok(Reduction {
        state: next,
        effects,
        applied,
    })
}
