//! Upload step: sends the selected file and interprets the response.
//!
//! Preview-then-confirm kinds get their rows back for review. Direct-save
//! kinds are persisted by this single call and the session finishes here.

use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

use nexus_core::import::{ImportMode, ImportSession, PreviewRow, ValidationError};
use nexus_events::ImportEventPayload;

use crate::backend::{ImportBackend, UploadRequest};
use crate::context::ImportContext;
use crate::error::{ImportError, TransportError};

/// Form field naming the academic term of a results upload.
pub const TERM_FIELD: &str = "year_sem";

/// What a successful upload produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Rows are waiting in the preview store.
    Preview { rows: usize },
    /// The upload succeeded but returned nothing to review.
    NothingToPreview,
    /// The upload persisted the records itself.
    Saved { records: usize },
}

/// A parsed upload response, before it is applied to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadResponse {
    Preview(Vec<PreviewRow>),
    Saved {
        rows: Vec<PreviewRow>,
        records: usize,
    },
}

/// Interpret a 2xx upload body for the given mode.
///
/// Preview responses carry rows under `data`. Direct-save responses report
/// `totalRecords`, falling back to the length of `data`, then zero.
pub fn interpret(
    mode: ImportMode,
    endpoint: &str,
    body: Value,
) -> Result<UploadResponse, TransportError> {
    let data = match body.get("data") {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    match mode {
        ImportMode::PreviewThenConfirm => {
            let rows = data
                .into_iter()
                .enumerate()
                .map(|(i, v)| {
                    PreviewRow::from_value(v).ok_or_else(|| TransportError::InvalidResponse {
                        endpoint: endpoint.to_string(),
                        reason: format!("preview row {i} is not an object"),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(UploadResponse::Preview(rows))
        }
        ImportMode::DirectSave => {
            let records = body
                .get("totalRecords")
                .and_then(Value::as_u64)
                .map(|n| n as usize)
                .unwrap_or(data.len());
            let rows = data.into_iter().filter_map(PreviewRow::from_value).collect();
            Ok(UploadResponse::Saved { rows, records })
        }
    }
}

pub struct UploadTransport<B> {
    ctx: ImportContext<B>,
}

impl<B: ImportBackend> UploadTransport<B> {
    pub fn new(ctx: ImportContext<B>) -> Self {
        Self { ctx }
    }

    /// Validate, authenticate, then upload the session's file.
    ///
    /// Local checks run first and a missing credential fails the session
    /// before any request is made.
    pub async fn submit(&self, session: &mut ImportSession) -> Result<SubmitOutcome, ImportError> {
        if let Err(e) = session.check_ready() {
            let err = ImportError::from(e);
            if err.validation().is_some() {
                self.ctx.announce_failure(session, &err);
            }
            return Err(err);
        }
        let token = self.ctx.require_token(session)?;

        let endpoints = self.ctx.config.endpoints(session.kind());
        let fields = match session.term() {
            Some(term) if session.kind().requires_term() => vec![(TERM_FIELD, term.value())],
            _ => Vec::new(),
        };

        session.begin_upload()?;
        let started = Instant::now();

        let result = {
            let Some(file) = session.source_file() else {
                return Err(self.ctx.fail(
                    session,
                    ImportError::from(ValidationError::MissingFile),
                ));
            };
            self.ctx.publish(
                session,
                ImportEventPayload::UploadStarted {
                    file_name: file.name.clone(),
                    size_bytes: file.size_bytes,
                },
            );
            self.ctx
                .backend
                .upload(UploadRequest {
                    path: &endpoints.upload_path,
                    file,
                    fields,
                    token: &token,
                })
                .await
        };

        let response = match result.and_then(|body| {
            interpret(session.mode(), &endpoints.upload_path, body)
        }) {
            Ok(r) => r,
            Err(e) => {
                if matches!(e, TransportError::Unauthorized) {
                    tracing::warn!(session = %session.id(), "Credential rejected by backend");
                }
                return Err(self.ctx.fail(session, e.into()));
            }
        };

        match response {
            UploadResponse::Preview(rows) => {
                let count = rows.len();
                session.preview_received(rows)?;
                self.ctx
                    .publish(session, ImportEventPayload::PreviewReady { rows: count });
                if count == 0 {
                    tracing::warn!(session = %session.id(), "Upload returned no preview rows");
                    Ok(SubmitOutcome::NothingToPreview)
                } else {
                    Ok(SubmitOutcome::Preview { rows: count })
                }
            }
            UploadResponse::Saved { rows, records } => {
                let elapsed = started.elapsed().as_secs_f64();
                session.saved_directly(rows, records, elapsed)?;
                self.ctx.publish(
                    session,
                    ImportEventPayload::Finished {
                        state: session.state(),
                        success_count: records,
                        failure_count: 0,
                        elapsed_seconds: elapsed,
                    },
                );
                Ok(SubmitOutcome::Saved { records })
            }
        }
    }
}
