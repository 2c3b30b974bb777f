//! HTTP side of the Nexus bulk-import workflow.
//!
//! [`ImportSurface`] is the entry point: it owns at most one
//! [`ImportSession`](nexus_core::import::ImportSession) and drives it
//! through the [`transport`] (upload / direct save) and the
//! [`confirm`] engine (batched save). The network is reached only
//! through the [`ImportBackend`] trait, implemented for real by
//! [`ImportApi`].

pub mod api;
pub mod auth;
pub mod backend;
pub mod config;
pub mod confirm;
pub mod context;
pub mod error;
pub mod surface;
pub mod transport;

pub use api::ImportApi;
pub use auth::{AccessTokenProvider, SharedToken, StaticToken};
pub use backend::{ImportBackend, UploadRequest};
pub use config::{ClientConfig, Endpoints};
pub use confirm::ConfirmationEngine;
pub use context::ImportContext;
pub use error::{AuthError, ImportError, TransportError};
pub use surface::{ImportSurface, Resubmit};
pub use transport::{SubmitOutcome, UploadTransport};
