//! Tracing sink for import events.
//!
//! [`EventLogger`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! writes every [`ImportEvent`] as a structured log line. It runs as a
//! background task and exits when the bus is dropped.

use tokio::sync::broadcast;

use crate::bus::{ImportEvent, ImportEventPayload};

pub struct EventLogger;

impl EventLogger {
    /// Drain `receiver` until the channel closes.
    pub async fn run(mut receiver: broadcast::Receiver<ImportEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => Self::log(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Import event logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("Event bus closed, logger shutting down");
                    break;
                }
            }
        }
    }

    fn log(event: &ImportEvent) {
        let session = event.session_id.to_string();
        let kind = event.kind.as_str();
        match &event.payload {
            ImportEventPayload::UploadStarted {
                file_name,
                size_bytes,
            } => {
                tracing::info!(
                    session = %session,
                    kind,
                    file_name = %file_name,
                    size_bytes,
                    "Upload started",
                );
            }
            ImportEventPayload::PreviewReady { rows } => {
                tracing::info!(session = %session, kind, rows, "Preview ready");
            }
            ImportEventPayload::BatchCompleted {
                index,
                rows,
                accepted,
                processed,
                total,
                percent,
            } => {
                if *accepted {
                    tracing::info!(
                        session = %session,
                        kind,
                        batch = index + 1,
                        rows,
                        processed,
                        total,
                        percent,
                        "Batch saved",
                    );
                } else {
                    tracing::warn!(
                        session = %session,
                        kind,
                        batch = index + 1,
                        rows,
                        processed,
                        total,
                        percent,
                        "Batch rejected",
                    );
                }
            }
            ImportEventPayload::Finished {
                state,
                success_count,
                failure_count,
                elapsed_seconds,
            } => {
                tracing::info!(
                    session = %session,
                    kind,
                    state = %state,
                    success_count,
                    failure_count,
                    elapsed_seconds,
                    "Import finished",
                );
            }
            ImportEventPayload::Failed { message } => {
                tracing::error!(session = %session, kind, error = %message, "Import failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use nexus_core::import::ImportKind;
    use nexus_core::types::SessionId;

    use super::*;
    use crate::bus::EventBus;

    #[tokio::test]
    async fn exits_when_bus_is_dropped() {
        let bus = EventBus::default();
        let handle = tokio::spawn(EventLogger::run(bus.subscribe()));

        bus.publish(ImportEvent::new(
            SessionId::new_v4(),
            ImportKind::Faculty,
            ImportEventPayload::Failed {
                message: "Unauthorized. Please log in again.".into(),
            },
        ));
        drop(bus);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("logger should stop once the bus is gone")
            .expect("logger task should not panic");
    }
}
