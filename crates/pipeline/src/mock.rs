//! Canned-response backend with randomized latency.

use async_trait::async_trait;
use chrono::Utc;
use gfxdesk_core::catalog;
use gfxdesk_core::lifecycle::PROMPT_UNCHANGED_WARNING;
use rand::Rng;

use crate::backend::{
    GenerateRequest, GeneratedArtifact, GenerationBackend, GenerationError, RegenerateRequest,
};
use crate::config::{DelayRange, GenerationConfig};

/// Answers every request from the catalog after a random delay.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    config: GenerationConfig,
}

impl MockBackend {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    async fn simulate(&self, range: DelayRange) -> Result<(), GenerationError> {
        let delay = range.sample();
        tokio::time::sleep(delay).await;
        if self.roll_failure() {
            return Err(GenerationError::Backend(
                "simulated generation failure".to_string(),
            ));
        }
        Ok(())
    }

    fn roll_failure(&self) -> bool {
        self.config.failure_rate > 0.0 && rand::rng().random_bool(self.config.failure_rate)
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GeneratedArtifact, GenerationError> {
        self.simulate(self.config.generate_delay).await?;

        let prompt = match request.prompt_override.as_deref().map(str::trim) {
            Some(custom) if !custom.is_empty() => custom.to_string(),
            _ => catalog::default_prompt_for(&request.code).to_string(),
        };
        Ok(GeneratedArtifact {
            media_url: catalog::media_url_for(&request.code),
            prompt,
            generated_at: Utc::now(),
        })
    }

    async fn regenerate(&self, request: &RegenerateRequest) -> Result<GeneratedArtifact, GenerationError> {
        let prompt = request.prompt.trim();
        if prompt == request.card.prompt().trim() {
            return Err(GenerationError::Rejected(PROMPT_UNCHANGED_WARNING.to_string()));
        }

        self.simulate(self.config.regenerate_delay).await?;

        Ok(GeneratedArtifact {
            media_url: catalog::media_url_for(&request.card.language_code),
            prompt: prompt.to_string(),
            generated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use gfxdesk_core::{Card, GfxRecord, GfxStatus};
    use tokio::time::Instant;

    use super::*;

    fn request(code: &str, prompt_override: Option<&str>) -> GenerateRequest {
        GenerateRequest {
            code: code.to_string(),
            language_name: code.to_uppercase(),
            prompt_override: prompt_override.map(str::to_string),
        }
    }

    fn reviewed_card(code: &str, prompt: &str) -> Card {
        Card::new(
            code,
            "JAPANESE",
            GfxRecord {
                status: GfxStatus::NeedsReview,
                media_url: Some(catalog::media_url_for(code)),
                prompt: Some(prompt.to_string()),
                generation_seq: 1,
                ..Default::default()
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn generate_waits_within_configured_range() {
        let backend = MockBackend::default();
        let started = Instant::now();
        let artifact = backend.generate(&request("ja", None)).await.unwrap();
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_secs(2) && elapsed <= Duration::from_secs(5), "{elapsed:?}");
        assert_eq!(artifact.media_url, catalog::media_url_for("ja"));
        assert_eq!(artifact.prompt, catalog::default_prompt_for("ja"));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_language_falls_back_to_english() {
        let backend = MockBackend::new(GenerationConfig::instant());
        let artifact = backend.generate(&request("pt-BR", None)).await.unwrap();
        assert_eq!(artifact.media_url, catalog::media_url_for("en"));
        assert_eq!(artifact.prompt, catalog::default_prompt_for("en"));
    }

    #[tokio::test(start_paused = true)]
    async fn prompt_override_is_echoed() {
        let backend = MockBackend::new(GenerationConfig::instant());
        let artifact = backend
            .generate(&request("th", Some("  neon night market  ")))
            .await
            .unwrap();
        assert_eq!(artifact.prompt, "neon night market");
    }

    #[tokio::test(start_paused = true)]
    async fn regenerate_takes_the_longer_delay_and_uses_new_prompt() {
        let backend = MockBackend::default();
        let started = Instant::now();
        let artifact = backend
            .regenerate(&RegenerateRequest {
                card: reviewed_card("ja", "old"),
                prompt: "new".to_string(),
            })
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_secs(5) && elapsed <= Duration::from_secs(10), "{elapsed:?}");
        assert_eq!(artifact.prompt, "new");
        assert_eq!(artifact.media_url, catalog::media_url_for("ja"));
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_prompt_is_rejected_without_delay() {
        let backend = MockBackend::default();
        let started = Instant::now();
        let err = backend
            .regenerate(&RegenerateRequest {
                card: reviewed_card("ja", "same"),
                prompt: "same".to_string(),
            })
            .await
            .unwrap_err();
        assert_matches!(err, GenerationError::Rejected(_));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_rate_of_one_always_fails() {
        let backend = MockBackend::new(GenerationConfig {
            failure_rate: 1.0,
            ..GenerationConfig::instant()
        });
        let err = backend.generate(&request("en", None)).await.unwrap_err();
        assert_matches!(err, GenerationError::Backend(_));
    }
}
