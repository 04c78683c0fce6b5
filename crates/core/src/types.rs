/// Stable language identifier, e.g. `"zh-TW"`. Unique within a campaign.
pub type LanguageCode = String;

/// Review card identifier, derived as `gfx-{language_code}`.
pub type CardId = String;

/// Monotonic ticket identifying the latest accepted generation request.
pub type GenerationSeq = u64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
