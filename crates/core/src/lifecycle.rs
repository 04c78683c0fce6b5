//! The GFX status lifecycle as a pure transition function.
//!
//! [`transition`] maps `(record, event)` to the next record plus at most one
//! [`RecordEffect`] describing work to start. It never performs I/O and never
//! reads the clock: timestamps travel inside the events. Both the campaign
//! reducer and the card review set drive their records through it, so the
//! transition graph lives in exactly one place.
//!
//! ```text
//! not_started ─┐
//!              ├─ request ──> queued ── start ──> generating ─┬─ ok ───> needs_review
//! failed ──────┘                                              └─ err ──> failed
//! needs_review | rejected ── approve ──> approved ── deliver ──> delivered
//! needs_review | approved ── reject ───> rejected
//! needs_review | approved | rejected ── regenerate(new prompt) ──> generating
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::status::GfxStatus;
use crate::types::{GenerationSeq, Timestamp};

/// Warning shown when a regeneration is requested without editing the prompt.
pub const PROMPT_UNCHANGED_WARNING: &str = "Please modify the prompt before regenerating.";

/// Error message stored when a failure arrives without one.
pub const DEFAULT_FAILURE_MESSAGE: &str = "GFX card generation failed. Please try again.";

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Generation-relevant fields shared by a language entry and its review card.
///
/// Invariant: `error_message.is_some()` iff `status == Failed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GfxRecord {
    #[serde(default)]
    pub status: GfxStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<Timestamp>,
    /// Ticket of the latest accepted generation. Results carrying any other
    /// value are stale.
    #[serde(default)]
    pub generation_seq: GenerationSeq,
    /// Prompt of the request currently queued or in flight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_prompt: Option<String>,
}

impl GfxRecord {
    /// Whether a media artifact has been produced at least once.
    pub fn has_artifact(&self) -> bool {
        self.media_url.is_some()
    }

    /// Re-establish the error-message invariant after an external merge.
    pub fn normalize(&mut self) {
        if self.status == GfxStatus::Failed {
            if self.error_message.as_deref().map_or(true, str::is_empty) {
                self.error_message = Some(DEFAULT_FAILURE_MESSAGE.to_string());
            }
        } else {
            self.error_message = None;
        }
    }
}

// ---------------------------------------------------------------------------
// Events, effects, steps
// ---------------------------------------------------------------------------

/// Something that happened to a single record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GfxEvent {
    /// User selected the language for generation.
    GenerationRequested {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt_override: Option<String>,
    },
    /// The queued request was picked up.
    GenerationStarted,
    /// The backend produced an artifact for ticket `seq`.
    GenerationSucceeded {
        seq: GenerationSeq,
        media_url: String,
        prompt: String,
        generated_at: Timestamp,
    },
    /// The backend failed for ticket `seq`.
    GenerationFailed { seq: GenerationSeq, message: String },
    /// Reviewer approved the card.
    Approved,
    /// Reviewer rejected the card without requesting a new version.
    Rejected,
    /// Reviewer edited the prompt and asked for a new version.
    RegenerationRequested { prompt: String },
    /// The card was exported to the asset-management system.
    Delivered,
}

impl GfxEvent {
    /// Short action name used in errors and logs.
    pub fn action(&self) -> &'static str {
        match self {
            GfxEvent::GenerationRequested { .. } => "request_generation",
            GfxEvent::GenerationStarted => "start_generation",
            GfxEvent::GenerationSucceeded { .. } => "complete_generation",
            GfxEvent::GenerationFailed { .. } => "fail_generation",
            GfxEvent::Approved => "approve",
            GfxEvent::Rejected => "reject",
            GfxEvent::RegenerationRequested { .. } => "regenerate",
            GfxEvent::Delivered => "deliver",
        }
    }
}

/// Work a transition asks the caller to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordEffect {
    /// The record became `queued`; a `GenerationStarted` should follow.
    StartGeneration,
    /// Invoke the backend's generate operation for ticket `seq`.
    Generate {
        seq: GenerationSeq,
        prompt_override: Option<String>,
    },
    /// Invoke the backend's regenerate operation for ticket `seq`.
    Regenerate { seq: GenerationSeq, prompt: String },
}

/// Whether an event changed the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Applied,
    /// A generation result for a superseded ticket; the record is unchanged.
    Stale,
}

/// Output of [`transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub record: GfxRecord,
    pub effect: Option<RecordEffect>,
    pub disposition: Disposition,
}

impl Step {
    fn applied(record: GfxRecord, effect: Option<RecordEffect>) -> Self {
        Self {
            record,
            effect,
            disposition: Disposition::Applied,
        }
    }

    fn stale(record: &GfxRecord) -> Self {
        Self {
            record: record.clone(),
            effect: None,
            disposition: Disposition::Stale,
        }
    }
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// Apply `event` to `record`.
///
/// `code` only labels errors. Generation results whose ticket does not match
/// the record's current `generation_seq` (or that arrive while the record is
/// no longer generating) resolve to [`Disposition::Stale`] instead of an
/// error, since they are an expected consequence of superseding a request.
pub fn transition(code: &str, record: &GfxRecord, event: &GfxEvent) -> Result<Step, CoreError> {
    use GfxStatus as S;

    let invalid = || CoreError::InvalidTransition {
        code: code.to_string(),
        from: record.status,
        action: event.action(),
    };
    let mut next = record.clone();

    match event {
        GfxEvent::GenerationRequested { prompt_override } => {
            if !matches!(record.status, S::NotStarted | S::Failed) {
                return Err(invalid());
            }
            // A blank override means "use the default prompt".
            let prompt_override = prompt_override
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty());
            if let Some(prompt) = prompt_override {
                validate_prompt_text(prompt)?;
            }
            next.status = S::Queued;
            next.error_message = None;
            next.pending_prompt = prompt_override.map(str::to_string);
            Ok(Step::applied(next, Some(RecordEffect::StartGeneration)))
        }

        GfxEvent::GenerationStarted => {
            if record.status != S::Queued {
                return Err(invalid());
            }
            next.status = S::Generating;
            next.generation_seq += 1;
            let effect = RecordEffect::Generate {
                seq: next.generation_seq,
                prompt_override: next.pending_prompt.clone(),
            };
            Ok(Step::applied(next, Some(effect)))
        }

        GfxEvent::GenerationSucceeded {
            seq,
            media_url,
            prompt,
            generated_at,
        } => {
            if record.status != S::Generating || *seq != record.generation_seq {
                return Ok(Step::stale(record));
            }
            next.status = S::NeedsReview;
            next.media_url = Some(media_url.clone());
            next.prompt = Some(prompt.clone());
            next.generated_at = Some(*generated_at);
            next.error_message = None;
            next.pending_prompt = None;
            Ok(Step::applied(next, None))
        }

        GfxEvent::GenerationFailed { seq, message } => {
            if record.status != S::Generating || *seq != record.generation_seq {
                return Ok(Step::stale(record));
            }
            next.status = S::Failed;
            next.error_message = Some(message.clone());
            next.pending_prompt = None;
            next.normalize();
            Ok(Step::applied(next, None))
        }

        GfxEvent::Approved => match record.status {
            S::NeedsReview | S::Rejected => {
                next.status = S::Approved;
                Ok(Step::applied(next, None))
            }
            // Approval during a regeneration keeps the existing artifact and
            // supersedes the in-flight ticket.
            S::Generating if record.has_artifact() => {
                next.status = S::Approved;
                next.generation_seq += 1;
                next.pending_prompt = None;
                Ok(Step::applied(next, None))
            }
            _ => Err(invalid()),
        },

        GfxEvent::Rejected => {
            if !matches!(record.status, S::NeedsReview | S::Approved) {
                return Err(invalid());
            }
            next.status = S::Rejected;
            Ok(Step::applied(next, None))
        }

        GfxEvent::RegenerationRequested { prompt } => {
            if !matches!(record.status, S::NeedsReview | S::Approved | S::Rejected) {
                return Err(invalid());
            }
            let prompt = prompt.trim();
            if record.prompt.as_deref().map(str::trim) == Some(prompt) {
                return Err(CoreError::Validation(PROMPT_UNCHANGED_WARNING.to_string()));
            }
            validate_prompt_text(prompt)?;
            next.status = S::Generating;
            next.generation_seq += 1;
            next.pending_prompt = Some(prompt.to_string());
            let effect = RecordEffect::Regenerate {
                seq: next.generation_seq,
                prompt: prompt.to_string(),
            };
            Ok(Step::applied(next, Some(effect)))
        }

        GfxEvent::Delivered => {
            if record.status != S::Approved {
                return Err(invalid());
            }
            next.status = S::Delivered;
            Ok(Step::applied(next, None))
        }
    }
}

/// Maximum prompt length in characters.
pub const MAX_PROMPT_LENGTH: usize = 10_000;

fn validate_prompt_text(prompt: &str) -> Result<(), CoreError> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Prompt must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_PROMPT_LENGTH {
        return Err(CoreError::Validation(format!(
            "Prompt exceeds maximum length of {MAX_PROMPT_LENGTH} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
