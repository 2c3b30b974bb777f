//! Shared fixtures: an in-memory backend and an axum mock of the HTTP API.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{Multipart, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use nexus_client::{
    AccessTokenProvider, ClientConfig, ImportBackend, ImportContext, StaticToken, TransportError,
    UploadRequest,
};
use nexus_core::import::file_check::{MIME_CSV, MIME_XLSX};
use nexus_core::import::{ImportKind, ImportSession, PreviewRow, SourceFile};
use nexus_events::EventBus;

// ---------------------------------------------------------------------------
// Data helpers
// ---------------------------------------------------------------------------

pub fn student_rows(n: usize) -> Vec<PreviewRow> {
    (0..n)
        .map(|i| {
            PreviewRow::from_value(json!({
                "ID": format!("B{:04}", i + 1),
                "Name": format!("Student {}", i + 1),
                "Branch": "CSE",
            }))
            .unwrap()
        })
        .collect()
}

pub fn csv(name: &str) -> SourceFile {
    SourceFile::new(name, MIME_CSV, b"ID,Name\nB0001,Asha\n".to_vec())
}

pub fn xlsx(name: &str) -> SourceFile {
    SourceFile::new(name, MIME_XLSX, vec![0x50, 0x4b, 0x03, 0x04])
}

/// A student session sitting in `PreviewReady` with `n` rows.
pub fn preview_ready(n: usize) -> ImportSession {
    let mut session = ImportSession::new(ImportKind::Student);
    session.attach_file(Some(csv("students.csv"))).unwrap();
    session.check_ready().unwrap();
    session.begin_upload().unwrap();
    session.preview_received(student_rows(n)).unwrap();
    session
}

pub fn context<B: ImportBackend>(
    backend: Arc<B>,
    token: Option<&str>,
    config: ClientConfig,
) -> (ImportContext<B>, Arc<EventBus>) {
    let auth: Arc<dyn AccessTokenProvider> = Arc::new(StaticToken::new(token.map(String::from)));
    let events = Arc::new(EventBus::default());
    let ctx = ImportContext::new(backend, auth, Arc::new(config), Arc::clone(&events));
    (ctx, events)
}

// ---------------------------------------------------------------------------
// FakeBackend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub path: String,
    pub file_name: String,
    pub fields: Vec<(String, String)>,
    pub token: String,
}

/// Scripted in-memory backend that records every call.
pub struct FakeBackend {
    upload_reply: Mutex<Result<Value, TransportError>>,
    /// Errors to return for specific batch calls, by zero-based call index.
    batch_errors: Mutex<HashMap<usize, TransportError>>,
    /// Cancel this token once the given number of batches has been sent.
    cancel_after: Mutex<Option<(usize, CancellationToken)>>,
    /// Never answer uploads.
    hang_uploads: Mutex<bool>,
    /// Never answer this batch call.
    hang_batch: Mutex<Option<usize>>,
    pub uploads: Mutex<Vec<RecordedUpload>>,
    pub batches: Mutex<Vec<Vec<PreviewRow>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            upload_reply: Mutex::new(Ok(json!({ "data": [] }))),
            batch_errors: Mutex::new(HashMap::new()),
            cancel_after: Mutex::new(None),
            hang_uploads: Mutex::new(false),
            hang_batch: Mutex::new(None),
            uploads: Mutex::new(Vec::new()),
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn with_upload_reply(self, reply: Result<Value, TransportError>) -> Self {
        *self.upload_reply.lock().unwrap() = reply;
        self
    }

    pub fn fail_batch(self, index: usize, err: TransportError) -> Self {
        self.batch_errors.lock().unwrap().insert(index, err);
        self
    }

    pub fn cancel_after(self, batches: usize, token: CancellationToken) -> Self {
        *self.cancel_after.lock().unwrap() = Some((batches, token));
        self
    }

    pub fn hang_uploads(self) -> Self {
        *self.hang_uploads.lock().unwrap() = true;
        self
    }

    pub fn hang_batch(self, index: usize) -> Self {
        *self.hang_batch.lock().unwrap() = Some(index);
        self
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    pub fn call_count(&self) -> usize {
        self.upload_count() + self.batch_count()
    }
}

#[async_trait]
impl ImportBackend for FakeBackend {
    async fn upload(&self, request: UploadRequest<'_>) -> Result<Value, TransportError> {
        self.uploads.lock().unwrap().push(RecordedUpload {
            path: request.path.to_string(),
            file_name: request.file.name.clone(),
            fields: request
                .fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            token: request.token.to_string(),
        });
        let hang = *self.hang_uploads.lock().unwrap();
        if hang {
            std::future::pending::<()>().await;
        }
        self.upload_reply.lock().unwrap().clone()
    }

    async fn save_batch(
        &self,
        _path: &str,
        rows: &[PreviewRow],
        _token: &str,
    ) -> Result<(), TransportError> {
        let index = {
            let mut batches = self.batches.lock().unwrap();
            batches.push(rows.to_vec());
            batches.len() - 1
        };
        let hang = *self.hang_batch.lock().unwrap() == Some(index);
        if hang {
            std::future::pending::<()>().await;
        }
        if let Some((after, token)) = &*self.cancel_after.lock().unwrap() {
            if index + 1 == *after {
                token.cancel();
            }
        }
        match self.batch_errors.lock().unwrap().get(&index) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Mock HTTP server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ReceivedUpload {
    pub path: &'static str,
    pub authorization: Option<String>,
    pub file_field: Option<String>,
    pub file_name: Option<String>,
    pub file_bytes: Vec<u8>,
    pub text_fields: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct ReceivedBatch {
    pub authorization: Option<String>,
    pub rows: Vec<Value>,
}

/// Shared state of the mock API.
pub struct MockState {
    pub uploads: Mutex<Vec<ReceivedUpload>>,
    pub batches: Mutex<Vec<ReceivedBatch>>,
    upload_reply: Mutex<(StatusCode, String)>,
    rejected_batches: Mutex<Vec<usize>>,
}

impl MockState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            uploads: Mutex::new(Vec::new()),
            batches: Mutex::new(Vec::new()),
            upload_reply: Mutex::new((StatusCode::OK, r#"{"data":[]}"#.into())),
            rejected_batches: Mutex::new(Vec::new()),
        })
    }

    pub fn reply_to_uploads(&self, status: StatusCode, body: impl Into<String>) {
        *self.upload_reply.lock().unwrap() = (status, body.into());
    }

    /// Answer these zero-based batch calls with 422.
    pub fn reject_batches(&self, indices: &[usize]) {
        *self.rejected_batches.lock().unwrap() = indices.to_vec();
    }

    pub fn request_count(&self) -> usize {
        self.uploads.lock().unwrap().len() + self.batches.lock().unwrap().len()
    }
}

fn body_response(status: StatusCode, body: String) -> Response {
    let content_type = if serde_json::from_str::<Value>(&body).is_ok() {
        "application/json"
    } else {
        "text/html"
    };
    (status, [(CONTENT_TYPE, content_type)], body).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

async fn record_upload(
    path: &'static str,
    state: Arc<MockState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut received = ReceivedUpload {
        path,
        authorization: bearer(&headers),
        ..Default::default()
    };
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(String::from);
        let bytes = field.bytes().await.unwrap_or_default();
        if file_name.is_some() {
            received.file_field = Some(name);
            received.file_name = file_name;
            received.file_bytes = bytes.to_vec();
        } else {
            received
                .text_fields
                .push((name, String::from_utf8_lossy(&bytes).into_owned()));
        }
    }
    state.uploads.lock().unwrap().push(received);
    let (status, body) = state.upload_reply.lock().unwrap().clone();
    body_response(status, body)
}

macro_rules! upload_route {
    ($path:literal) => {
        post(
            |State(state): State<Arc<MockState>>, headers: HeaderMap, multipart: Multipart| {
                record_upload($path, state, headers, multipart)
            },
        )
    };
}

#[derive(Deserialize)]
struct BatchPayload {
    data: Vec<Value>,
}

async fn save_users(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(BatchPayload { data: rows }): Json<BatchPayload>,
) -> Response {
    let index = {
        let mut batches = state.batches.lock().unwrap();
        batches.push(ReceivedBatch {
            authorization: bearer(&headers),
            rows,
        });
        batches.len() - 1
    };
    if state.rejected_batches.lock().unwrap().contains(&index) {
        return body_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": "Duplicate ID in batch" }).to_string(),
        );
    }
    (StatusCode::CREATED, Json(json!({ "saved": true }))).into_response()
}

/// Serve the mock API on an ephemeral port. Returns its base URL.
pub async fn spawn_mock(state: Arc<MockState>) -> String {
    let app = Router::new()
        .route("/api/student/add-users/", upload_route!("/api/student/add-users/"))
        .route("/api/faculty/save-faculty/", upload_route!("/api/faculty/save-faculty/"))
        .route("/api/results/subjectInfo/", upload_route!("/api/results/subjectInfo/"))
        .route("/api/results/result/", upload_route!("/api/results/result/"))
        .route("/api/student/save-users/", post(save_users))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base URL nothing listens on.
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn config_for(base_url: String) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.api_url = base_url;
    config.request_timeout_secs = 5;
    config
}
