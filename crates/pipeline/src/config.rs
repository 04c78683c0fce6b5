//! Settings for the mock generation backend, read from the environment.

use std::str::FromStr;
use std::time::Duration;

use rand::Rng;

/// Errors raised while reading generation settings.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a valid {expected}, got '{value}'")]
    Malformed {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("{name} delay range is inverted: min {min_ms}ms > max {max_ms}ms")]
    InvertedRange {
        name: &'static str,
        min_ms: u64,
        max_ms: u64,
    },

    #[error("GFX_FAILURE_RATE must be within 0.0..=1.0, got {0}")]
    FailureRate(f64),
}

/// Inclusive range a simulated latency is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    pub fn from_millis(name: &'static str, min_ms: u64, max_ms: u64) -> Result<Self, ConfigError> {
        if min_ms > max_ms {
            return Err(ConfigError::InvertedRange { name, min_ms, max_ms });
        }
        Ok(Self {
            min: Duration::from_millis(min_ms),
            max: Duration::from_millis(max_ms),
        })
    }

    /// A zero-length range, for callers that want results immediately.
    pub const fn zero() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draw a delay uniformly from the range.
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let ms = rand::rng().random_range(self.min.as_millis() as u64..=self.max.as_millis() as u64);
        Duration::from_millis(ms)
    }

    pub fn contains(&self, delay: Duration) -> bool {
        delay >= self.min && delay <= self.max
    }
}

/// Mock generation backend settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Latency of a first generation (default: 2–5 s).
    pub generate_delay: DelayRange,
    /// Latency of a prompt-edited regeneration (default: 5–10 s).
    pub regenerate_delay: DelayRange,
    /// Probability in `0.0..=1.0` that a call fails (default: `0.0`).
    pub failure_rate: f64,
}

const DEFAULT_GENERATE_DELAY_MS: (u64, u64) = (2_000, 5_000);
const DEFAULT_REGENERATE_DELAY_MS: (u64, u64) = (5_000, 10_000);

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            generate_delay: DelayRange {
                min: Duration::from_millis(DEFAULT_GENERATE_DELAY_MS.0),
                max: Duration::from_millis(DEFAULT_GENERATE_DELAY_MS.1),
            },
            regenerate_delay: DelayRange {
                min: Duration::from_millis(DEFAULT_REGENERATE_DELAY_MS.0),
                max: Duration::from_millis(DEFAULT_REGENERATE_DELAY_MS.1),
            },
            failure_rate: 0.0,
        }
    }
}

impl GenerationConfig {
    /// Load settings from environment variables, falling back to defaults.
    ///
    /// | Env Var                        | Default  |
    /// |--------------------------------|----------|
    /// | `GFX_GENERATE_DELAY_MIN_MS`    | `2000`   |
    /// | `GFX_GENERATE_DELAY_MAX_MS`    | `5000`   |
    /// | `GFX_REGENERATE_DELAY_MIN_MS`  | `5000`   |
    /// | `GFX_REGENERATE_DELAY_MAX_MS`  | `10000`  |
    /// | `GFX_FAILURE_RATE`             | `0.0`    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env) but reads values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let generate_delay = DelayRange::from_millis(
            "generate",
            parse_var(&lookup, "GFX_GENERATE_DELAY_MIN_MS", "u64", DEFAULT_GENERATE_DELAY_MS.0)?,
            parse_var(&lookup, "GFX_GENERATE_DELAY_MAX_MS", "u64", DEFAULT_GENERATE_DELAY_MS.1)?,
        )?;
        let regenerate_delay = DelayRange::from_millis(
            "regenerate",
            parse_var(&lookup, "GFX_REGENERATE_DELAY_MIN_MS", "u64", DEFAULT_REGENERATE_DELAY_MS.0)?,
            parse_var(&lookup, "GFX_REGENERATE_DELAY_MAX_MS", "u64", DEFAULT_REGENERATE_DELAY_MS.1)?,
        )?;
        let failure_rate: f64 = parse_var(&lookup, "GFX_FAILURE_RATE", "f64", 0.0)?;
        if !(0.0..=1.0).contains(&failure_rate) {
            return Err(ConfigError::FailureRate(failure_rate));
        }

        Ok(Self {
            generate_delay,
            regenerate_delay,
            failure_rate,
        })
    }

    /// No latency and no failures.
    pub fn instant() -> Self {
        Self {
            generate_delay: DelayRange::zero(),
            regenerate_delay: DelayRange::zero(),
            failure_rate: 0.0,
        }
    }
}

/// Read `var` through `lookup`. Absent or blank means `default`; anything
/// else must parse as `T`.
pub fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        Some(value) if !value.trim().is_empty() => {
            value.trim().parse().map_err(|_| ConfigError::Malformed {
                var,
                expected,
                value,
            })
        }
        _ => Ok(default),
    }
}
