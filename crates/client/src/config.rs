use std::collections::HashMap;

use nexus_core::error::CoreError;
use nexus_core::import::{ImportKind, BATCH_SIZE};

/// Paths an import kind posts to, relative to [`ClientConfig::api_url`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Multipart upload (preview, or the save itself for direct-save kinds).
    pub upload_path: String,
    /// Batched JSON save. `None` for direct-save kinds.
    pub save_path: Option<String>,
}

impl Endpoints {
    fn defaults(kind: ImportKind) -> Self {
        Self {
            upload_path: kind.default_upload_path().to_string(),
            save_path: kind.default_save_path().map(str::to_string),
        }
    }
}

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for a local backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin, without a trailing slash.
    pub api_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Rows per save batch.
    pub batch_size: usize,
    endpoints: HashMap<ImportKind, Endpoints>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".into(),
            request_timeout_secs: 30,
            batch_size: BATCH_SIZE,
            endpoints: ImportKind::ALL
                .iter()
                .map(|k| (*k, Endpoints::defaults(*k)))
                .collect(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `NEXUS_API_URL`               | `http://localhost:8000` |
    /// | `NEXUS_REQUEST_TIMEOUT_SECS`  | `30`                    |
    /// | `NEXUS_BATCH_SIZE`            | `10`                    |
    /// | `NEXUS_<KIND>_UPLOAD_PATH`    | per kind                |
    /// | `NEXUS_<KIND>_SAVE_PATH`      | per kind                |
    ///
    /// `<KIND>` is one of `STUDENT`, `FACULTY`, `SCHEDULE`, `SUBJECT`,
    /// `RESULTS`.
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("NEXUS_API_URL") {
            config.api_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup("NEXUS_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = parse_positive("NEXUS_REQUEST_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("NEXUS_BATCH_SIZE") {
            config.batch_size = parse_positive("NEXUS_BATCH_SIZE", &raw)?;
        }

        for kind in ImportKind::ALL {
            let token = kind.env_token();
            let entry = config
                .endpoints
                .entry(kind)
                .or_insert_with(|| Endpoints::defaults(kind));
            if let Some(path) = lookup(&format!("NEXUS_{token}_UPLOAD_PATH")) {
                entry.upload_path = path;
            }
            if let Some(path) = lookup(&format!("NEXUS_{token}_SAVE_PATH")) {
                entry.save_path = Some(path);
            }
        }

        if !config.api_url.starts_with("http://") && !config.api_url.starts_with("https://") {
            return Err(CoreError::Validation(format!(
                "NEXUS_API_URL must be an http(s) URL, got '{}'",
                config.api_url
            )));
        }

        Ok(config)
    }

    pub fn endpoints(&self, kind: ImportKind) -> Endpoints {
        self.endpoints
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Endpoints::defaults(kind))
    }
}

fn parse_positive<T>(key: &str, raw: &str) -> Result<T, CoreError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(v) if v > T::default() => Ok(v),
        _ => Err(CoreError::Validation(format!(
            "{key} must be a positive integer, got '{raw}'"
        ))),
    }
}
