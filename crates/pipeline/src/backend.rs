//! Capability interface for whatever produces GFX media.

use async_trait::async_trait;
use gfxdesk_core::{Card, LanguageCode, Timestamp};

/// Input to a first generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub code: LanguageCode,
    pub language_name: String,
    /// Replaces the language's default prompt when set.
    pub prompt_override: Option<String>,
}

/// Input to a prompt-edited regeneration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegenerateRequest {
    /// The card as it was when the edit was submitted.
    pub card: Card,
    pub prompt: String,
}

/// A produced media reference and the prompt that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub media_url: String,
    pub prompt: String,
    pub generated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The request itself was unacceptable; nothing was attempted.
    #[error("Generation request rejected: {0}")]
    Rejected(String),

    #[error("Generation backend error: {0}")]
    Backend(String),
}

/// Produces media for a language.
///
/// Implementations may take arbitrarily long; callers run each call on its
/// own task.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerateRequest) -> Result<GeneratedArtifact, GenerationError>;

    async fn regenerate(&self, request: &RegenerateRequest) -> Result<GeneratedArtifact, GenerationError>;
}
