//! The seam between the import workflow and the network.

use async_trait::async_trait;
use serde_json::Value;

use nexus_core::import::{PreviewRow, SourceFile};

use crate::error::TransportError;

/// A multipart upload of one spreadsheet.
#[derive(Debug)]
pub struct UploadRequest<'a> {
    /// Path relative to the backend origin.
    pub path: &'a str,
    pub file: &'a SourceFile,
    /// Extra form fields sent next to the file, e.g. `year_sem`.
    pub fields: Vec<(&'static str, String)>,
    pub token: &'a str,
}

/// Operations the import workflow needs from the backend.
///
/// [`ImportApi`](crate::api::ImportApi) is the HTTP implementation; tests
/// substitute in-memory fakes.
#[async_trait]
pub trait ImportBackend: Send + Sync {
    /// Send the file. Returns the parsed JSON body, or `Value::Null` when
    /// the server answered 2xx with a body that is not JSON.
    async fn upload(&self, request: UploadRequest<'_>) -> Result<Value, TransportError>;

    /// Persist one batch of confirmed rows. Succeeds on any 2xx.
    async fn save_batch(
        &self,
        path: &str,
        rows: &[PreviewRow],
        token: &str,
    ) -> Result<(), TransportError>;
}
