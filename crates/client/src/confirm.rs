//! Batched save of previewed rows.
//!
//! Batches are sent strictly one after another. A batch the server rejects
//! is counted as failed and the run continues; a network error stops the
//! run where it is. Cancellation is honoured between batches only, so a
//! batch is never half sent.

use std::time::Instant;

use tokio_util::sync::CancellationToken;

use nexus_core::error::CoreError;
use nexus_core::import::{partition, ImportSession, Outcome, SessionState};
use nexus_events::ImportEventPayload;

use crate::backend::ImportBackend;
use crate::context::ImportContext;
use crate::error::ImportError;

pub struct ConfirmationEngine<B> {
    ctx: ImportContext<B>,
}

impl<B: ImportBackend> ConfirmationEngine<B> {
    pub fn new(ctx: ImportContext<B>) -> Self {
        Self { ctx }
    }

    /// Save every previewed row in batches of the configured size.
    ///
    /// Returns the outcome for both `Succeeded` and `PartiallyFailed` runs.
    /// A fatal network error or cancellation leaves the session `Failed`;
    /// the batches it rejected or never sent stay recorded on the session
    /// for [`ImportSession::resubmit_failed`].
    pub async fn confirm(
        &self,
        session: &mut ImportSession,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ImportError> {
        let Some(save_path) = self.ctx.config.endpoints(session.kind()).save_path else {
            return Err(CoreError::Internal(format!(
                "{} imports have no confirmation endpoint",
                session.kind()
            ))
            .into());
        };
        if session.state() != SessionState::PreviewReady {
            return Err(CoreError::InvalidTransition {
                from: session.state(),
                to: SessionState::Confirming,
            }
            .into());
        }
        if session.rows().is_empty() {
            return Err(CoreError::NothingToConfirm.into());
        }
        let token = self.ctx.require_token(session)?;

        let total = session.begin_confirm(self.ctx.config.batch_size)?;
        let rows = session.rows().to_vec();
        let batches = partition(&rows, session.batch_size());
        let started = Instant::now();

        tracing::info!(
            session = %session.id(),
            kind = session.kind().as_str(),
            total,
            batches = batches.len(),
            "Confirming import",
        );

        let mut failure_count = 0usize;

        for batch in batches {
            if cancel.is_cancelled() {
                let err = ImportError::Cancelled {
                    processed: session.progress().processed,
                    total,
                };
                tracing::info!(session = %session.id(), "Import cancelled");
                return Err(self.ctx.fail(session, err));
            }

            let accepted = match self
                .ctx
                .backend
                .save_batch(&save_path, batch.rows, &token)
                .await
            {
                Ok(()) => true,
                Err(e) if e.is_network() => {
                    return Err(self.ctx.fail(session, ImportError::FatalRun(e)));
                }
                Err(e) => {
                    tracing::warn!(
                        session = %session.id(),
                        batch = batch.index + 1,
                        status = ?e.status(),
                        error = %e,
                        "Batch rejected",
                    );
                    failure_count += batch.len();
                    false
                }
            };

            session.record_batch(batch.index, batch.len(), accepted);
            let progress = session.progress();
            self.ctx.publish(
                session,
                ImportEventPayload::BatchCompleted {
                    index: batch.index,
                    rows: batch.len(),
                    accepted,
                    processed: progress.processed,
                    total: progress.total,
                    percent: progress.percent(),
                },
            );
        }

        let outcome = Outcome {
            success_count: total - failure_count,
            failure_count,
            elapsed_seconds: started.elapsed().as_secs_f64(),
            failed_batches: session.rejected_batches().to_vec(),
        };
        session.finish_confirm(outcome.clone())?;
        self.ctx.publish(
            session,
            ImportEventPayload::Finished {
                state: session.state(),
                success_count: outcome.success_count,
                failure_count: outcome.failure_count,
                elapsed_seconds: outcome.elapsed_seconds,
            },
        );
        Ok(outcome)
    }
}
