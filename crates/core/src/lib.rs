//! Domain model for the GFX card review desk.
//!
//! Everything in this crate is synchronous and free of I/O: the status
//! vocabulary, the campaign aggregate, the pure lifecycle transition, the
//! campaign reducer and the card review set. The async side lives in
//! `gfxdesk-pipeline`.

pub mod campaign;
pub mod card;
pub mod catalog;
pub mod error;
pub mod event_log;
pub mod lifecycle;
pub mod reducer;
pub mod review;
pub mod sample;
pub mod status;
pub mod types;

pub use campaign::{Campaign, Language, LanguagePatch, SubStage};
pub use card::{card_id_for, Card};
pub use error::CoreError;
pub use event_log::{EventLog, EventOrigin, LogEntry};
pub use lifecycle::{transition, Disposition, GfxEvent, GfxRecord, RecordEffect, Step};
pub use reducer::{reduce, reduce_all, Effect, GenerationJob, JobKind, LanguageEvent, Reduction};
pub use review::{CardActions, CardChange, CardReviewSet, ReviewSummary, ReviewTab};
pub use status::{GfxStatus, SubStageStatus};
pub use types::{CardId, GenerationSeq, LanguageCode, Timestamp};
