//! `gfxdesk-worker` library crate.
//!
//! Holds the configuration and the simulation driver so integration tests can
//! run them. The binary entrypoint lives in `main.rs`.

pub mod config;
pub mod run;

pub use config::WorkerConfig;
pub use run::{run, SimulationReport};
