//! The orchestrator: sole owner of the campaign, the open review set and the
//! event log.
//!
//! It runs as one tokio task. Callers talk to it through a cloneable
//! [`OrchestratorHandle`] that sends commands with oneshot replies, so every
//! write to a language entry is serialized through a single loop. Generation
//! outcomes arrive on the dispatcher channel and go through the same loop.

use std::sync::Arc;

use chrono::Utc;
use gfxdesk_core::reducer::{reduce_all, Effect, LanguageEvent};
use gfxdesk_core::{
    Campaign, CardChange, CardId, CardReviewSet, CoreError, Disposition, EventLog, EventOrigin,
    GfxEvent, LanguageCode,
};
use gfxdesk_events::{lifecycle, EventBus};
use tokio::sync::{mpsc, oneshot, watch};

use crate::backend::GenerationBackend;
use crate::delivery::{AssetSink, DeliveryError, DeliveryReceipt};
use crate::dispatcher::{GenerationDispatcher, GenerationOutcome};

/// Buffer size of the command channel.
const COMMAND_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("No review is open")]
    ReviewClosed,

    #[error("Orchestrator is not running")]
    Stopped,
}

type Reply<T> = oneshot::Sender<Result<T, OrchestratorError>>;

enum Command {
    RequestGeneration {
        codes: Vec<LanguageCode>,
        prompt_override: Option<String>,
        reply: Reply<()>,
    },
    OpenReview {
        reply: Reply<CardReviewSet>,
    },
    CloseReview {
        reply: Reply<Vec<LanguageCode>>,
    },
    Review {
        reply: Reply<CardReviewSet>,
    },
    CardAction {
        card_id: CardId,
        event: GfxEvent,
        reply: Reply<CardChange>,
    },
    ToggleSelection {
        card_id: CardId,
        reply: Reply<bool>,
    },
    ConfirmDelivery {
        reply: Reply<DeliveryReceipt>,
    },
    Campaign {
        reply: Reply<Campaign>,
    },
    EventLog {
        reply: Reply<EventLog>,
    },
    Shutdown {
        reply: Reply<()>,
    },
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Cloneable client for a running orchestrator.
#[derive(Clone)]
pub struct OrchestratorHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Campaign>,
}

impl OrchestratorHandle {
    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, OrchestratorError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| OrchestratorError::Stopped)?;
        rx.await.map_err(|_| OrchestratorError::Stopped)?
    }

    /// Queue the given languages for generation.
    ///
    /// Atomic over the selection: one ineligible code rejects the whole
    /// request. Each accepted language moves on to `generating` on its own.
    pub async fn request_generation(
        &self,
        codes: Vec<LanguageCode>,
        prompt_override: Option<String>,
    ) -> Result<(), OrchestratorError> {
        self.call(|reply| Command::RequestGeneration {
            codes,
            prompt_override,
            reply,
        })
        .await
    }

    /// Snapshot every eligible language into a fresh review set.
    pub async fn open_review(&self) -> Result<CardReviewSet, OrchestratorError> {
        self.call(|reply| Command::OpenReview { reply }).await
    }

    /// Reconcile and discard the review set. Returns the codes written.
    pub async fn close_review(&self) -> Result<Vec<LanguageCode>, OrchestratorError> {
        self.call(|reply| Command::CloseReview { reply }).await
    }

    /// Current state of the open review set.
    pub async fn review(&self) -> Result<CardReviewSet, OrchestratorError> {
        self.call(|reply| Command::Review { reply }).await
    }

    pub async fn approve(&self, card_id: impl Into<CardId>) -> Result<CardChange, OrchestratorError> {
        self.card_action(card_id.into(), GfxEvent::Approved).await
    }

    pub async fn reject(&self, card_id: impl Into<CardId>) -> Result<CardChange, OrchestratorError> {
        self.card_action(card_id.into(), GfxEvent::Rejected).await
    }

    /// Submit an edited prompt. An unchanged prompt is a validation error
    /// and leaves the card as it was.
    pub async fn regenerate(
        &self,
        card_id: impl Into<CardId>,
        prompt: impl Into<String>,
    ) -> Result<CardChange, OrchestratorError> {
        self.card_action(
            card_id.into(),
            GfxEvent::RegenerationRequested {
                prompt: prompt.into(),
            },
        )
        .await
    }

    async fn card_action(&self, card_id: CardId, event: GfxEvent) -> Result<CardChange, OrchestratorError> {
        self.call(|reply| Command::CardAction {
            card_id,
            event,
            reply,
        })
        .await
    }

    /// Returns whether the card is selected afterwards.
    pub async fn toggle_selection(&self, card_id: impl Into<CardId>) -> Result<bool, OrchestratorError> {
        let card_id = card_id.into();
        self.call(|reply| Command::ToggleSelection { card_id, reply })
            .await
    }

    /// Export the current delivery targets and mark them delivered.
    pub async fn confirm_delivery(&self) -> Result<DeliveryReceipt, OrchestratorError> {
        self.call(|reply| Command::ConfirmDelivery { reply }).await
    }

    pub async fn campaign(&self) -> Result<Campaign, OrchestratorError> {
        self.call(|reply| Command::Campaign { reply }).await
    }

    pub async fn event_log(&self) -> Result<EventLog, OrchestratorError> {
        self.call(|reply| Command::EventLog { reply }).await
    }

    /// Campaign snapshots, updated after every applied change.
    pub fn watch(&self) -> watch::Receiver<Campaign> {
        self.snapshots.clone()
    }

    /// Wait until a campaign snapshot satisfies `predicate`.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&Campaign) -> bool,
    ) -> Result<Campaign, OrchestratorError> {
        let mut rx = self.watch();
        let campaign = rx
            .wait_for(predicate)
            .await
            .map_err(|_| OrchestratorError::Stopped)?;
        Ok(campaign.clone())
    }

    /// Wait until no language is queued or generating.
    pub async fn wait_until_idle(&self) -> Result<Campaign, OrchestratorError> {
        self.wait_for(|c| !c.has_in_flight()).await
    }

    /// Stop the orchestrator after cancelling in-flight generations.
    pub async fn shutdown(&self) -> Result<(), OrchestratorError> {
        self.call(|reply| Command::Shutdown { reply }).await
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    campaign: Campaign,
    review: Option<CardReviewSet>,
    log: EventLog,
    dispatcher: GenerationDispatcher,
    outcomes: mpsc::Receiver<GenerationOutcome>,
    commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<Campaign>,
    sink: Arc<dyn AssetSink>,
    bus: Arc<EventBus>,
}

impl Orchestrator {
    /// Start the orchestrator on the current runtime.
    pub fn spawn(
        campaign: Campaign,
        backend: Arc<dyn GenerationBackend>,
        sink: Arc<dyn AssetSink>,
        bus: Arc<EventBus>,
    ) -> OrchestratorHandle {
        let (command_tx, commands) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (snapshots, snapshot_rx) = watch::channel(campaign.clone());
        let (dispatcher, outcomes) = GenerationDispatcher::new(backend);

        let orchestrator = Self {
            campaign,
            review: None,
            log: EventLog::new(),
            dispatcher,
            outcomes,
            commands,
            snapshots,
            sink,
            bus,
        };
        tokio::spawn(orchestrator.run());

        OrchestratorHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
        }
    }

    async fn run(mut self) {
        tracing::info!(
            campaign_id = %self.campaign.id,
            languages = self.campaign.languages().len(),
            "Orchestrator started",
        );

        let mut shutdown_reply = None;
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        shutdown_reply = Some(reply);
                        break;
                    }
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                Some(outcome) = self.outcomes.recv() => self.on_outcome(outcome),
            }
        }

        self.dispatcher.shutdown().await;
        tracing::info!(campaign_id = %self.campaign.id, "Orchestrator stopped");
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(Ok(()));
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::RequestGeneration {
                codes,
                prompt_override,
                reply,
            } => {
                let _ = reply.send(self.request_generation(codes, prompt_override));
            }
            Command::OpenReview { reply } => {
                let _ = reply.send(self.open_review());
            }
            Command::CloseReview { reply } => {
                let _ = reply.send(self.close_review());
            }
            Command::Review { reply } => {
                let _ = reply.send(self.review.clone().ok_or(OrchestratorError::ReviewClosed));
            }
            Command::CardAction {
                card_id,
                event,
                reply,
            } => {
                let _ = reply.send(self.card_action(&card_id, event));
            }
            Command::ToggleSelection { card_id, reply } => {
                let result = match self.review.as_mut() {
                    Some(review) => review.toggle_selection(&card_id).map_err(Into::into),
                    None => Err(OrchestratorError::ReviewClosed),
                };
                let _ = reply.send(result);
            }
            Command::ConfirmDelivery { reply } => {
                let _ = reply.send(self.confirm_delivery().await);
            }
            Command::Campaign { reply } => {
                let _ = reply.send(Ok(self.campaign.clone()));
            }
            Command::EventLog { reply } => {
                let _ = reply.send(Ok(self.log.clone()));
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(Ok(()));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Campaign path
    // -----------------------------------------------------------------------

    fn request_generation(
        &mut self,
        codes: Vec<LanguageCode>,
        prompt_override: Option<String>,
    ) -> Result<(), OrchestratorError> {
        if codes.is_empty() {
            return Err(CoreError::Validation("Select at least one language".to_string()).into());
        }
        let events: Vec<_> = codes
            .into_iter()
            .map(|code| {
                LanguageEvent::new(
                    code,
                    GfxEvent::GenerationRequested {
                        prompt_override: prompt_override.clone(),
                    },
                )
            })
            .collect();
        self.apply_to_campaign(events)?;
        Ok(())
    }

    fn on_outcome(&mut self, outcome: GenerationOutcome) {
        let code = outcome.code.clone();
        let seq = outcome.seq;
        if let Err(e) = self.apply_to_campaign(vec![outcome.into_event()]) {
            tracing::error!(code = %code, seq, error = %e, "Generation outcome could not be applied");
        }
    }

    /// Reduce `events` into the campaign and run the effects they produce
    /// until none remain.
    fn apply_to_campaign(&mut self, events: Vec<LanguageEvent>) -> Result<(), CoreError> {
        let mut pending = events;
        while !pending.is_empty() {
            let reduction = reduce_all(&self.campaign, &pending)?;
            self.campaign = reduction.state;

            for applied in reduction.applied {
                if applied.disposition == Disposition::Stale {
                    tracing::warn!(
                        code = %applied.code,
                        action = applied.event.action(),
                        "Ignoring result for a superseded generation",
                    );
                }
                self.record(applied.code, applied.event, applied.disposition, EventOrigin::Campaign);
            }

            pending = Vec::new();
            for effect in reduction.effects {
                match effect {
                    Effect::StartGeneration { code } => {
                        pending.push(LanguageEvent::new(code, GfxEvent::GenerationStarted));
                    }
                    Effect::Dispatch(job) => self.dispatcher.dispatch(job),
                }
            }

            if let Some(review) = self.review.as_mut() {
                review.refresh(&self.campaign);
            }
            self.publish_snapshot();
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Review path
    // -----------------------------------------------------------------------

    fn open_review(&mut self) -> Result<CardReviewSet, OrchestratorError> {
        if let Some(mut previous) = self.review.take() {
            previous.reconcile(&mut self.campaign)?;
        }
        let review = CardReviewSet::snapshot(&self.campaign);
        tracing::info!(cards = review.cards().len(), "Review opened");
        self.review = Some(review.clone());
        Ok(review)
    }

    fn close_review(&mut self) -> Result<Vec<LanguageCode>, OrchestratorError> {
        let Some(mut review) = self.review.take() else {
            return Ok(Vec::new());
        };
        let written = review.reconcile(&mut self.campaign)?;
        tracing::info!(reconciled = written.len(), "Review closed");
        self.publish_snapshot();
        Ok(written)
    }

    /// Apply a reviewer action to a card and reconcile it straight away.
    fn card_action(&mut self, card_id: &str, event: GfxEvent) -> Result<CardChange, OrchestratorError> {
        let review = self.review.as_mut().ok_or(OrchestratorError::ReviewClosed)?;
        let change = review.apply(card_id, &event)?;
        review.reconcile(&mut self.campaign)?;

        tracing::info!(
            card_id = %change.card_id,
            action = event.action(),
            status = %change.status,
            "Card updated",
        );
        self.record(change.code.clone(), event, change.disposition, EventOrigin::Review);

        if let Some(effect) = change.effect.clone() {
            match effect {
                Effect::Dispatch(job) => self.dispatcher.dispatch(job),
                Effect::StartGeneration { code } => {
                    self.apply_to_campaign(vec![LanguageEvent::new(code, GfxEvent::GenerationStarted)])?;
                }
            }
        }
        self.publish_snapshot();
        Ok(change)
    }

    /// Deliver the open review set's targets.
    ///
    /// The sink sees the batch before anything changes; if it refuses,
    /// nothing is delivered.
    async fn confirm_delivery(&mut self) -> Result<DeliveryReceipt, OrchestratorError> {
        let review = self.review.as_ref().ok_or(OrchestratorError::ReviewClosed)?;
        let mut staged = review.clone();
        let delivered = staged.deliver()?;
        let cards: Vec<_> = delivered
            .iter()
            .filter_map(|id| review.card(id).cloned())
            .collect();

        let receipt = match self.sink.export(&cards).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::error!(cards = cards.len(), error = %e, "Delivery refused by asset sink");
                return Err(e.into());
            }
        };

        staged.reconcile(&mut self.campaign)?;
        self.review = Some(staged);
        for card in &cards {
            self.record(
                card.language_code.clone(),
                GfxEvent::Delivered,
                Disposition::Applied,
                EventOrigin::Review,
            );
        }
        self.bus.publish(lifecycle::delivery_event(
            &self.campaign.id,
            &receipt.batch_id.to_string(),
            &receipt.card_ids,
        ));
        tracing::info!(
            batch_id = %receipt.batch_id,
            cards = receipt.card_ids.len(),
            "Delivery confirmed",
        );
        self.publish_snapshot();
        Ok(receipt)
    }

    // -----------------------------------------------------------------------
    // Bookkeeping
    // -----------------------------------------------------------------------

    fn record(&mut self, code: LanguageCode, event: GfxEvent, disposition: Disposition, origin: EventOrigin) {
        let status = self
            .campaign
            .language(&code)
            .map(|l| l.status())
            .unwrap_or_default();
        self.bus.publish(lifecycle::language_event(
            &self.campaign.id,
            &code,
            &event,
            disposition,
            status,
        ));
        tracing::debug!(code = %code, action = event.action(), %status, ?origin, "Event recorded");
        self.log.record(Utc::now(), code, event, disposition, origin);
    }

    fn publish_snapshot(&self) {
        self.snapshots.send_replace(self.campaign.clone());
    }
}
