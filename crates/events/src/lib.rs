//! GFX desk event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the event envelope.
//! - [`lifecycle`]: event names and constructors for language status changes
//!   and delivery batches.

pub mod bus;
pub mod lifecycle;

pub use bus::{EventBus, PlatformEvent};
