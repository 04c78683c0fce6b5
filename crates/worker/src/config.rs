use std::path::PathBuf;

use gfxdesk_pipeline::{parse_var, ConfigError, GenerationConfig};

/// Simulation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// Campaign document to load instead of the built-in sample.
    pub campaign_file: Option<PathBuf>,
    /// Languages to generate. `None` means every `not_started` language.
    pub languages: Option<Vec<String>>,
    /// Approve every card that reaches review before delivering.
    pub auto_approve: bool,
    pub generation: GenerationConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            campaign_file: None,
            languages: None,
            auto_approve: true,
            generation: GenerationConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Load from the environment.
    ///
    /// | Env Var             | Default                  |
    /// |---------------------|--------------------------|
    /// | `GFX_CAMPAIGN_FILE` | built-in sample campaign |
    /// | `GFX_LANGUAGES`     | all `not_started`        |
    /// | `GFX_AUTO_APPROVE`  | `true`                   |
    ///
    /// Generation delays and the failure rate come from
    /// [`GenerationConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let campaign_file = lookup("GFX_CAMPAIGN_FILE")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let languages = lookup("GFX_LANGUAGES")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|codes| !codes.is_empty());

        let auto_approve = parse_var(&lookup, "GFX_AUTO_APPROVE", "bool", true)?;
        let generation = GenerationConfig::from_lookup(&lookup)?;

        Ok(Self {
            campaign_file,
            languages,
            auto_approve,
            generation,
        })
    }
}
