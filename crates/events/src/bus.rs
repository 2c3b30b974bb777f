//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] fans out [`ImportEvent`]s to any number of observers
//! (a progress renderer, the tracing logger, tests). Share it via
//! `Arc<EventBus>`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use nexus_core::import::{ImportKind, SessionState};
use nexus_core::types::SessionId;

// ---------------------------------------------------------------------------
// ImportEvent
// ---------------------------------------------------------------------------

/// Something that happened to one import session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImportEventPayload {
    /// The upload request was sent.
    UploadStarted { file_name: String, size_bytes: u64 },

    /// The server returned rows for review.
    PreviewReady { rows: usize },

    /// One save batch finished. `accepted` is false when the server
    /// rejected it; the run continues either way.
    BatchCompleted {
        index: usize,
        rows: usize,
        accepted: bool,
        processed: usize,
        total: usize,
        percent: u8,
    },

    /// The session reached a terminal state.
    Finished {
        state: SessionState,
        success_count: usize,
        failure_count: usize,
        elapsed_seconds: f64,
    },

    /// The session failed before or during a run.
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportEvent {
    pub session_id: SessionId,
    pub kind: ImportKind,
    pub payload: ImportEventPayload,
    pub timestamp: DateTime<Utc>,
}

impl ImportEvent {
    pub fn new(session_id: SessionId, kind: ImportKind, payload: ImportEventPayload) -> Self {
        Self {
            session_id,
            kind,
            payload,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

pub struct EventBus {
    sender: broadcast::Sender<ImportEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest events are dropped and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped if there are none.
    pub fn publish(&self, event: ImportEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
