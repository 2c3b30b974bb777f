//! One import surface: a kind, an optional term, and at most one session.
//!
//! This is the boundary a UI or CLI drives. Selecting a new file or
//! changing the term is refused while an upload or batched save is
//! running. Dismissing always succeeds: it is how a caller cancels.
//!
//! `submit` and `confirm` hold the session through an `InFlight` guard,
//! so dropping their future mid-request (a timeout, a `select!` branch
//! losing) fails the session instead of leaving it busy.

use std::ops::{Deref, DerefMut};

use tokio_util::sync::CancellationToken;

use nexus_core::error::CoreError;
use nexus_core::import::{
    report, AcademicTerm, ImportKind, ImportSession, Outcome, SourceFile, StatusView,
};

use crate::backend::ImportBackend;
use crate::confirm::ConfirmationEngine;
use crate::context::ImportContext;
use crate::error::ImportError;
use crate::transport::{SubmitOutcome, UploadTransport};

/// Which rows a re-run sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resubmit {
    All,
    FailedOnly,
}

/// Marks the session abandoned if dropped while its work is still in flight.
struct InFlight<'a>(&'a mut ImportSession);

impl Deref for InFlight<'_> {
    type Target = ImportSession;

    fn deref(&self) -> &ImportSession {
        self.0
    }
}

impl DerefMut for InFlight<'_> {
    fn deref_mut(&mut self) -> &mut ImportSession {
        self.0
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.0.abandon() {
            tracing::warn!(
                session = %self.0.id(),
                kind = self.0.kind().as_str(),
                "Import dropped mid-flight",
            );
        }
    }
}

pub struct ImportSurface<B> {
    kind: ImportKind,
    term: Option<AcademicTerm>,
    session: Option<ImportSession>,
    transport: UploadTransport<B>,
    engine: ConfirmationEngine<B>,
}

impl<B: ImportBackend> ImportSurface<B> {
    pub fn new(kind: ImportKind, ctx: ImportContext<B>) -> Self {
        Self {
            kind,
            term: None,
            session: None,
            transport: UploadTransport::new(ctx.clone()),
            engine: ConfirmationEngine::new(ctx),
        }
    }

    pub fn kind(&self) -> ImportKind {
        self.kind
    }

    pub fn session(&self) -> Option<&ImportSession> {
        self.session.as_ref()
    }

    fn ensure_not_busy(&self) -> Result<(), CoreError> {
        match &self.session {
            Some(s) if s.state().is_busy() => Err(CoreError::Busy),
            _ => Ok(()),
        }
    }

    /// Choose the academic term. Applies to the current session too.
    pub fn set_term(&mut self, term: Option<AcademicTerm>) -> Result<(), ImportError> {
        self.ensure_not_busy()?;
        if let Some(session) = &mut self.session {
            session.set_term(term.clone());
        }
        self.term = term;
        Ok(())
    }

    /// Start a new session for `file`, discarding any finished one.
    ///
    /// The session is kept even when the file is rejected so its status
    /// can be shown.
    pub fn select_file(&mut self, file: Option<SourceFile>) -> Result<(), ImportError> {
        self.ensure_not_busy()?;
        let mut session = ImportSession::new(self.kind);
        session.set_term(self.term.clone());
        let result = session.attach_file(file);
        if let Err(e) = &result {
            tracing::info!(kind = self.kind.as_str(), error = %e, "File rejected");
        }
        self.session = Some(session);
        result.map_err(ImportError::from)
    }

    /// Upload the selected file.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, ImportError> {
        let session = self.session.get_or_insert_with(|| {
            let mut s = ImportSession::new(self.kind);
            s.set_term(self.term.clone());
            s
        });
        let mut session = InFlight(session);
        self.transport.submit(&mut session).await
    }

    /// Save the previewed rows in batches.
    pub async fn confirm(&mut self, cancel: &CancellationToken) -> Result<Outcome, ImportError> {
        let session = self.session.as_mut().ok_or(CoreError::NothingToConfirm)?;
        let mut session = InFlight(session);
        self.engine.confirm(&mut session, cancel).await
    }

    /// Replace a finished session with a re-run ready to confirm.
    pub fn resubmit(&mut self, which: Resubmit) -> Result<(), ImportError> {
        let session = self.session.as_ref().ok_or(CoreError::NothingToConfirm)?;
        let next = match which {
            Resubmit::All => session.resubmit_all()?,
            Resubmit::FailedOnly => session.resubmit_failed()?,
        };
        self.session = Some(next);
        Ok(())
    }

    /// Drop the current session and return to the initial view.
    ///
    /// A session still marked busy here belongs to a leaked future; it is
    /// discarded like any other.
    pub fn dismiss(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::debug!(
                session = %session.id(),
                state = %session.state(),
                "Session dismissed",
            );
        }
    }

    /// What to show for this surface right now.
    pub fn status(&self) -> StatusView {
        match &self.session {
            Some(session) => report(session),
            None => report(&ImportSession::new(self.kind)),
        }
    }
}
