//! Runs generation jobs against a [`GenerationBackend`] and reports outcomes.
//!
//! Every job gets its own task; there is no concurrency limit and no
//! ordering between jobs. Results come back on an mpsc channel in whatever
//! order the backend finishes them.

use std::sync::Arc;

use gfxdesk_core::reducer::{GenerationJob, JobKind, LanguageEvent};
use gfxdesk_core::{GenerationSeq, GfxEvent, LanguageCode};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::backend::{
    GenerateRequest, GeneratedArtifact, GenerationBackend, GenerationError, RegenerateRequest,
};

/// Buffer size of the outcome channel.
const OUTCOME_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Generate,
    Regenerate,
}

/// What a backend call produced for one ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub code: LanguageCode,
    pub seq: GenerationSeq,
    pub kind: OutcomeKind,
    pub result: Result<GeneratedArtifact, GenerationError>,
}

impl GenerationOutcome {
    /// The lifecycle event this outcome feeds back into the reducer.
    pub fn into_event(self) -> LanguageEvent {
        let event = match self.result {
            Ok(artifact) => GfxEvent::GenerationSucceeded {
                seq: self.seq,
                media_url: artifact.media_url,
                prompt: artifact.prompt,
                generated_at: artifact.generated_at,
            },
            Err(e) => GfxEvent::GenerationFailed {
                seq: self.seq,
                message: e.to_string(),
            },
        };
        LanguageEvent::new(self.code, event)
    }
}

pub struct GenerationDispatcher {
    backend: Arc<dyn GenerationBackend>,
    outcomes: mpsc::Sender<GenerationOutcome>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl GenerationDispatcher {
    /// Create a dispatcher and the receiver its outcomes arrive on.
    pub fn new(backend: Arc<dyn GenerationBackend>) -> (Self, mpsc::Receiver<GenerationOutcome>) {
        let (outcomes, rx) = mpsc::channel(OUTCOME_CHANNEL_CAPACITY);
        let dispatcher = Self {
            backend,
            outcomes,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        };
        (dispatcher, rx)
    }

    /// Number of jobs still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Start `job` on its own task.
    pub fn dispatch(&self, job: GenerationJob) {
        if self.cancel.is_cancelled() {
            tracing::warn!(code = %job.code, seq = job.seq, "Dispatcher is shut down, job dropped");
            return;
        }

        let backend = Arc::clone(&self.backend);
        let outcomes = self.outcomes.clone();
        let cancel = self.cancel.clone();

        tracing::info!(
            code = %job.code,
            seq = job.seq,
            backend = backend.name(),
            "Generation job dispatched",
        );

        self.tracker.spawn(async move {
            let code = job.code.clone();
            let seq = job.seq;
            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(code = %code, seq, "Generation job cancelled");
                    return;
                }
                outcome = run_job(backend.as_ref(), job) => outcome,
            };

            match &outcome.result {
                Ok(_) => tracing::info!(code = %code, seq, "Generation finished"),
                Err(e) => tracing::warn!(code = %code, seq, error = %e, "Generation failed"),
            }

            if outcomes.send(outcome).await.is_err() {
                tracing::debug!(code = %code, seq, "Outcome receiver dropped");
            }
        });
    }

    /// Stop accepting jobs, cancel running ones and wait for their tasks.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        tracing::info!("Generation dispatcher stopped");
    }
}

async fn run_job(backend: &dyn GenerationBackend, job: GenerationJob) -> GenerationOutcome {
    let (kind, result) = match job.kind {
        JobKind::Generate { prompt_override } => {
            let request = GenerateRequest {
                code: job.code.clone(),
                language_name: job.language_name,
                prompt_override,
            };
            (OutcomeKind::Generate, backend.generate(&request).await)
        }
        JobKind::Regenerate { prompt, source } => {
            let request = RegenerateRequest {
                card: source,
                prompt,
            };
            (OutcomeKind::Regenerate, backend.regenerate(&request).await)
        }
    };
    GenerationOutcome {
        code: job.code,
        seq: job.seq,
        kind,
        result,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;
    use crate::config::{DelayRange, GenerationConfig};
    use crate::mock::MockBackend;

    fn job(code: &str, seq: GenerationSeq) -> GenerationJob {
        GenerationJob {
            code: code.to_string(),
            language_name: code.to_uppercase(),
            seq,
            kind: JobKind::Generate {
                prompt_override: None,
            },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn outcomes_arrive_for_every_job() {
        let (dispatcher, mut rx) = GenerationDispatcher::new(Arc::new(MockBackend::default()));
        dispatcher.dispatch(job("en", 1));
        dispatcher.dispatch(job("ja", 4));

        let mut seen = Vec::new();
        for _ in 0..2 {
            let outcome = rx.recv().await.unwrap();
            assert_eq!(outcome.kind, OutcomeKind::Generate);
            assert!(outcome.result.is_ok());
            seen.push((outcome.code, outcome.seq));
        }
        seen.sort();
        assert_eq!(seen, vec![("en".to_string(), 1), ("ja".to_string(), 4)]);
    }

    #[tokio::test(start_paused = true)]
    async fn outcome_becomes_success_or_failure_event() {
        let backend = MockBackend::new(GenerationConfig {
            failure_rate: 1.0,
            ..GenerationConfig::instant()
        });
        let (dispatcher, mut rx) = GenerationDispatcher::new(Arc::new(backend));
        dispatcher.dispatch(job("th", 2));

        let event = rx.recv().await.unwrap().into_event();
        assert_eq!(event.code, "th");
        assert_matches!(event.event, GfxEvent::GenerationFailed { seq: 2, ref message } if message.contains("simulated"));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_running_jobs() {
        let backend = MockBackend::new(GenerationConfig {
            generate_delay: DelayRange::from_millis("generate", 60_000, 60_000).unwrap(),
            ..GenerationConfig::instant()
        });
        let (dispatcher, mut rx) = GenerationDispatcher::new(Arc::new(backend));
        dispatcher.dispatch(job("en", 1));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(dispatcher.in_flight(), 1);

        dispatcher.shutdown().await;
        assert_eq!(dispatcher.in_flight(), 0);
        assert!(rx.try_recv().is_err());

        dispatcher.dispatch(job("ja", 1));
        assert_eq!(dispatcher.in_flight(), 0);
    }
}
