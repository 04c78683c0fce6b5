//! Async side of the GFX desk: generation backends, the job dispatcher, the
//! delivery seam and the orchestrator that ties them to the campaign.

pub mod backend;
pub mod config;
pub mod delivery;
pub mod dispatcher;
pub mod mock;
pub mod orchestrator;

pub use backend::{GenerateRequest, GeneratedArtifact, GenerationBackend, GenerationError, RegenerateRequest};
pub use config::{parse_var, ConfigError, DelayRange, GenerationConfig};
pub use delivery::{AssetSink, DeliveryError, DeliveryReceipt, LoggingAssetSink};
pub use dispatcher::{GenerationDispatcher, GenerationOutcome, OutcomeKind};
pub use mock::MockBackend;
pub use orchestrator::{Orchestrator, OrchestratorError, OrchestratorHandle};
