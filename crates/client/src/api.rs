//! HTTP implementation of [`ImportBackend`] on top of `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use nexus_core::import::PreviewRow;

use crate::backend::{ImportBackend, UploadRequest};
use crate::config::ClientConfig;
use crate::error::TransportError;

/// Multipart field carrying the spreadsheet.
pub const FILE_FIELD: &str = "excel_file";

/// JSON body of one save batch: `{"data": [...]}`.
#[derive(Serialize)]
struct BatchBody<'a> {
    data: &'a [PreviewRow],
}

pub struct ImportApi {
    client: reqwest::Client,
    base_url: String,
}

impl ImportApi {
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    async fn send(
        &self,
        url: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<(StatusCode, String), TransportError> {
        let response = builder.send().await.map_err(|e| network(url, &e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| network(url, &e))?;
        Ok((status, body))
    }
}

#[async_trait]
impl ImportBackend for ImportApi {
    async fn upload(&self, request: UploadRequest<'_>) -> Result<Value, TransportError> {
        let url = self.url(request.path);

        let part = Part::bytes(request.file.contents.clone()).file_name(request.file.name.clone());
        // An unparsable declared type falls back to an untyped part.
        let part = match part.mime_str(&request.file.mime_type) {
            Ok(p) => p,
            Err(_) => Part::bytes(request.file.contents.clone())
                .file_name(request.file.name.clone()),
        };
        let mut form = Form::new().part(FILE_FIELD, part);
        for (name, value) in request.fields {
            form = form.text(name, value);
        }

        tracing::debug!(url = %url, file = %request.file.name, "Uploading spreadsheet");
        let builder = self
            .client
            .post(&url)
            .bearer_auth(request.token)
            .multipart(form);
        let (status, body) = self.send(&url, builder).await?;
        ensure_success(&url, status, &body)?;
        Ok(parse_body(&body))
    }

    async fn save_batch(
        &self,
        path: &str,
        rows: &[PreviewRow],
        token: &str,
    ) -> Result<(), TransportError> {
        let url = self.url(path);
        let builder = self.client.post(&url).bearer_auth(token).json(&BatchBody { data: rows });
        let (status, body) = self.send(&url, builder).await?;
        ensure_success(&url, status, &body)
    }
}

fn network(url: &str, err: &reqwest::Error) -> TransportError {
    TransportError::Network {
        endpoint: url.to_string(),
        message: err.to_string(),
    }
}

/// Classify a non-2xx status into a [`TransportError`].
pub fn ensure_success(url: &str, status: StatusCode, body: &str) -> Result<(), TransportError> {
    if status.is_success() {
        return Ok(());
    }
    Err(match status {
        StatusCode::NOT_FOUND => TransportError::EndpointNotFound {
            endpoint: url.to_string(),
        },
        StatusCode::UNAUTHORIZED => TransportError::Unauthorized,
        other => TransportError::Server {
            status: other.as_u16(),
            message: error_message(other.as_u16(), body),
        },
    })
}

/// The server's `error` or `detail` string, else a generic status line.
pub fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["error", "detail"]
                .iter()
                .find_map(|key| v.get(key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| format!("Upload failed: {status}"))
}

/// JSON body, or `Null` when there is none.
fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Success response was not JSON");
        Value::Null
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn error_body_prefers_error_then_detail() {
        assert_eq!(error_message(500, r#"{"error":"Bad sheet","detail":"x"}"#), "Bad sheet");
        assert_eq!(error_message(400, r#"{"detail":"Missing column"}"#), "Missing column");
        assert_eq!(error_message(502, "<html>Bad Gateway</html>"), "Upload failed: 502");
        assert_eq!(error_message(500, r#"{"error": 42}"#), "Upload failed: 500");
    }

    #[test]
    fn statuses_are_classified() {
        let url = "http://localhost:8000/api/student/add-users/";
        assert!(ensure_success(url, StatusCode::CREATED, "").is_ok());
        assert_matches!(
            ensure_success(url, StatusCode::NOT_FOUND, ""),
            Err(TransportError::EndpointNotFound { endpoint }) if endpoint == url
        );
        assert_matches!(
            ensure_success(url, StatusCode::UNAUTHORIZED, r#"{"error":"x"}"#),
            Err(TransportError::Unauthorized)
        );
        assert_matches!(
            ensure_success(url, StatusCode::UNPROCESSABLE_ENTITY, r#"{"error":"Duplicate ID"}"#),
            Err(TransportError::Server { status: 422, message }) if message == "Duplicate ID"
        );
    }

    #[test]
    fn non_json_success_body_is_null() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("OK"), Value::Null);
        assert_eq!(parse_body(r#"{"totalRecords":3}"#)["totalRecords"], 3);
    }
}
