//! Import progress events.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`ImportEvent`]: what the client publishes as a session moves.
//! - [`EventLogger`]: drains a subscription into `tracing`.

pub mod bus;
pub mod logger;

pub use bus::{EventBus, ImportEvent, ImportEventPayload};
pub use logger::EventLogger;
