//! Campaign aggregate: one campaign, many language tracks.
//!
//! The campaign is the single source of truth for language state. It is
//! mutated only through [`Campaign::update_language`], which merges a
//! [`LanguagePatch`] by language code.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::lifecycle::GfxRecord;
use crate::status::{GfxStatus, SubStageStatus};
use crate::types::{GenerationSeq, LanguageCode, Timestamp};

/// An external localization pipeline step. Read-only display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubStage {
    pub name: String,
    pub status: SubStageStatus,
}

impl SubStage {
    pub fn new(name: impl Into<String>, status: SubStageStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }
}

/// One localization track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub code: LanguageCode,
    pub name: String,
    #[serde(default)]
    pub sub_stages: Vec<SubStage>,
    #[serde(flatten)]
    pub gfx: GfxRecord,
}

impl Language {
    /// A fresh language entry in `not_started`.
    pub fn new(code: impl Into<LanguageCode>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            sub_stages: Vec::new(),
            gfx: GfxRecord::default(),
        }
    }

    pub fn with_sub_stages(mut self, sub_stages: Vec<SubStage>) -> Self {
        self.sub_stages = sub_stages;
        self
    }

    pub fn status(&self) -> GfxStatus {
        self.gfx.status
    }

    /// Number of sub-stages reported complete.
    pub fn completed_sub_stages(&self) -> usize {
        self.sub_stages
            .iter()
            .filter(|s| s.status == SubStageStatus::Completed)
            .count()
    }
}

/// Partial update for a language entry. `None` leaves a field untouched.
///
/// Optional fields use `Option<Option<_>>` so a patch can clear them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguagePatch {
    pub status: Option<GfxStatus>,
    pub media_url: Option<Option<String>>,
    pub prompt: Option<Option<String>>,
    pub error_message: Option<Option<String>>,
    pub generated_at: Option<Option<Timestamp>>,
    pub generation_seq: Option<GenerationSeq>,
    pub pending_prompt: Option<Option<String>>,
}

impl LanguagePatch {
    pub fn status(status: GfxStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// A patch that overwrites every generation field with `record`.
    pub fn from_record(record: &GfxRecord) -> Self {
        Self {
            status: Some(record.status),
            media_url: Some(record.media_url.clone()),
            prompt: Some(record.prompt.clone()),
            error_message: Some(record.error_message.clone()),
            generated_at: Some(record.generated_at),
            generation_seq: Some(record.generation_seq),
            pending_prompt: Some(record.pending_prompt.clone()),
        }
    }

    fn apply_to(self, record: &mut GfxRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(media_url) = self.media_url {
            record.media_url = media_url;
        }
        if let Some(prompt) = self.prompt {
            record.prompt = prompt;
        }
        if let Some(error_message) = self.error_message {
            record.error_message = error_message;
        }
        if let Some(generated_at) = self.generated_at {
            record.generated_at = generated_at;
        }
        if let Some(seq) = self.generation_seq {
            record.generation_seq = seq;
        }
        if let Some(pending_prompt) = self.pending_prompt {
            record.pending_prompt = pending_prompt;
        }
        record.normalize();
    }
}

/// The top-level localization project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub(crate) languages: Vec<Language>,
}

impl Campaign {
    /// Build a campaign, validating identity fields and code uniqueness.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        languages: Vec<Language>,
    ) -> Result<Self, CoreError> {
        let campaign = Self {
            id: id.into(),
            name: name.into(),
            languages,
        };
        campaign.validate()?;
        Ok(campaign)
    }

    /// Parse a campaign document and validate it.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let mut campaign: Campaign = serde_json::from_str(json)
            .map_err(|e| CoreError::Validation(format!("Invalid campaign document: {e}")))?;
        for language in &mut campaign.languages {
            language.gfx.normalize();
        }
        campaign.validate()?;
        Ok(campaign)
    }

    /// Collects every problem into a single validation error.
    fn validate(&self) -> Result<(), CoreError> {
        let mut errors = Vec::new();

        if self.id.trim().is_empty() {
            errors.push("Campaign id must not be empty".to_string());
        }
        if self.name.trim().is_empty() {
            errors.push("Campaign name must not be empty".to_string());
        }

        let mut seen = HashSet::new();
        for language in &self.languages {
            if language.code.trim().is_empty() {
                errors.push("Language code must not be empty".to_string());
                continue;
            }
            if language.name.trim().is_empty() {
                errors.push(format!("{}: language name must not be empty", language.code));
            }
            if !seen.insert(language.code.as_str()) {
                errors.push(format!("Duplicate language code '{}'", language.code));
            }
            // Nothing would ever pick up work that was queued or running
            // when the document was written.
            let status = language.status();
            if status.is_in_flight() || status == GfxStatus::Completed {
                errors.push(format!(
                    "{}: status '{status}' cannot be loaded; use not_started or failed to request generation",
                    language.code
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(errors.join("; ")))
        }
    }

    /// Languages in campaign order.
    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    pub fn language(&self, code: &str) -> Option<&Language> {
        self.languages.iter().find(|l| l.code == code)
    }

    /// Like [`language`](Self::language) but an unknown code is an error.
    pub fn require_language(&self, code: &str) -> Result<&Language, CoreError> {
        self.language(code)
            .ok_or_else(|| CoreError::language_not_found(code))
    }

    /// Merge `patch` into the language identified by `code`.
    pub fn update_language(&mut self, code: &str, patch: LanguagePatch) -> Result<(), CoreError> {
        let language = self
            .languages
            .iter_mut()
            .find(|l| l.code == code)
            .ok_or_else(|| CoreError::language_not_found(code))?;
        patch.apply_to(&mut language.gfx);
        Ok(())
    }

    /// Languages currently in `status`.
    pub fn codes_with_status(&self, status: GfxStatus) -> Vec<LanguageCode> {
        self.languages
            .iter()
            .filter(|l| l.status() == status)
            .map(|l| l.code.clone())
            .collect()
    }

    /// Whether any language is queued or generating.
    pub fn has_in_flight(&self) -> bool {
        self.languages.iter().any(|l| l.status().is_in_flight())
    }

    /// Whether the review screen has anything to show.
    pub fn has_reviewable(&self) -> bool {
        self.languages.iter().any(|l| l.status().is_review_eligible())
    }
}
