//! Append-only log of every lifecycle event the campaign has seen.

use serde::{Deserialize, Serialize};

use crate::lifecycle::{Disposition, GfxEvent};
use crate::types::{LanguageCode, Timestamp};

/// Which surface an event was applied through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOrigin {
    /// Applied to the campaign aggregate by the reducer.
    Campaign,
    /// Applied to a review card and reconciled into the campaign.
    Review,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Zero-based position in the log.
    pub index: u64,
    pub at: Timestamp,
    pub code: LanguageCode,
    pub event: GfxEvent,
    pub disposition: Disposition,
    pub origin: EventOrigin,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its index.
    pub fn record(
        &mut self,
        at: Timestamp,
        code: LanguageCode,
        event: GfxEvent,
        disposition: Disposition,
        origin: EventOrigin,
    ) -> u64 {
        let index = self.entries.len() as u64;
        self.entries.push(LogEntry {
            index,
            at,
            code,
            event,
            disposition,
            origin,
        });
        index
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries for one language, oldest first.
    pub fn for_language<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a LogEntry> + 'a {
        self.entries.iter().filter(move |e| e.code == code)
    }

    /// Action names applied to one language, oldest first. Stale entries are skipped.
    pub fn applied_actions(&self, code: &str) -> Vec<&'static str> {
        self.for_language(code)
            .filter(|e| e.disposition == Disposition::Applied)
            .map(|e| e.event.action())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn indexes_are_sequential_and_filterable() {
        let mut log = EventLog::new();
        let now = Utc::now();
        assert_eq!(
            log.record(now, "en".into(), GfxEvent::Approved, Disposition::Applied, EventOrigin::Review),
            0
        );
        log.record(now, "ja".into(), GfxEvent::Rejected, Disposition::Applied, EventOrigin::Review);
        log.record(
            now,
            "en".into(),
            GfxEvent::GenerationFailed {
                seq: 1,
                message: "late".into(),
            },
            Disposition::Stale,
            EventOrigin::Campaign,
        );

        assert_eq!(log.len(), 3);
        assert_eq!(log.for_language("en").count(), 2);
        assert_eq!(log.applied_actions("en"), vec!["approve"]);
    }
}
