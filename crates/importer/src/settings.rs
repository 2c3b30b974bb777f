use std::path::PathBuf;

use nexus_core::error::CoreError;
use nexus_core::import::{AcademicTerm, ImportKind};

/// What one importer run should do, read from the environment.
#[derive(Debug, Clone)]
pub struct ImporterSettings {
    pub kind: ImportKind,
    pub file: PathBuf,
    pub term: Option<AcademicTerm>,
    /// Save previewed rows without stopping for review.
    pub auto_confirm: bool,
    pub access_token: Option<String>,
    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,
}

impl ImporterSettings {
    /// | Env Var               | Required | Default |
    /// |-----------------------|----------|---------|
    /// | `IMPORT_KIND`         | yes      | --      |
    /// | `IMPORT_FILE`         | yes      | --      |
    /// | `IMPORT_TERM`         | results  | --      |
    /// | `IMPORT_AUTO_CONFIRM` | no       | `false` |
    /// | `NEXUS_ACCESS_TOKEN`  | no       | --      |
    /// | `NEXUS_LOG_FORMAT`    | no       | `text`  |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| CoreError::Validation(format!("{key} is required")))
        };

        let kind: ImportKind = required("IMPORT_KIND")?.parse()?;
        let file = PathBuf::from(required("IMPORT_FILE")?);
        let term = match lookup("IMPORT_TERM").filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(raw.parse::<AcademicTerm>().map_err(|_| unknown_term(&raw))?),
            None => None,
        };
        let auto_confirm = match lookup("IMPORT_AUTO_CONFIRM") {
            Some(raw) => parse_flag("IMPORT_AUTO_CONFIRM", &raw)?,
            None => false,
        };
        let json_logs = lookup("NEXUS_LOG_FORMAT")
            .map(|v| v.trim().eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(Self {
            kind,
            file,
            term,
            auto_confirm,
            access_token: lookup("NEXUS_ACCESS_TOKEN"),
            json_logs,
        })
    }
}

/// Names every valid term, e.g. `E2_S1 (E-2 Semester 1)`.
fn unknown_term(raw: &str) -> CoreError {
    let choices: Vec<String> = AcademicTerm::all()
        .iter()
        .map(|t| format!("{} ({})", t.value(), t.menu_label()))
        .collect();
    CoreError::Validation(format!(
        "IMPORT_TERM '{raw}' is not a known term; choose one of: {}",
        choices.join(", ")
    ))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, CoreError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(CoreError::Validation(format!(
            "{key} must be true or false, got '{raw}'"
        ))),
    }
}
