use std::sync::Arc;

use nexus_core::import::{Failure, ImportSession};
use nexus_events::{EventBus, ImportEvent, ImportEventPayload};

use crate::auth::AccessTokenProvider;
use crate::backend::ImportBackend;
use crate::config::ClientConfig;
use crate::error::{AuthError, ImportError};

/// Shared dependencies of the transport and the confirmation engine.
pub struct ImportContext<B> {
    pub backend: Arc<B>,
    pub auth: Arc<dyn AccessTokenProvider>,
    pub config: Arc<ClientConfig>,
    pub events: Arc<EventBus>,
}

impl<B> Clone for ImportContext<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            auth: Arc::clone(&self.auth),
            config: Arc::clone(&self.config),
            events: Arc::clone(&self.events),
        }
    }
}

impl<B: ImportBackend> ImportContext<B> {
    pub fn new(
        backend: Arc<B>,
        auth: Arc<dyn AccessTokenProvider>,
        config: Arc<ClientConfig>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            backend,
            auth,
            config,
            events,
        }
    }

    pub(crate) fn publish(&self, session: &ImportSession, payload: ImportEventPayload) {
        self.events
            .publish(ImportEvent::new(session.id(), session.kind(), payload));
    }

    /// The bearer token, or a failed session when there is none.
    pub(crate) fn require_token(&self, session: &mut ImportSession) -> Result<String, ImportError> {
        match self.auth.access_token() {
            Some(token) => Ok(token),
            None => Err(self.fail(session, AuthError::MissingToken.into())),
        }
    }

    /// Move the session to `Failed` with `err` and announce it.
    pub(crate) fn fail(&self, session: &mut ImportSession, err: ImportError) -> ImportError {
        if !session.state().is_terminal() {
            if let Err(e) = session.fail(Failure::new(err.failure_kind(), err.to_string())) {
                tracing::warn!(session = %session.id(), error = %e, "Could not record failure");
            }
        }
        self.announce_failure(session, &err);
        err
    }

    pub(crate) fn announce_failure(&self, session: &ImportSession, err: &ImportError) {
        self.publish(
            session,
            ImportEventPayload::Failed {
                message: err.to_string(),
            },
        );
    }
}
