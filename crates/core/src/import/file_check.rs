//! Client-side file acceptance check.
//!
//! Only the declared MIME type is inspected. The server parses the
//! spreadsheet and is the authority on its contents.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// `text/csv`.
pub const MIME_CSV: &str = "text/csv";

/// Modern Excel workbook (`.xlsx`).
pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Legacy Excel workbook (`.xls`).
pub const MIME_XLS: &str = "application/vnd.ms-excel";

/// Declared types accepted for upload.
pub const ACCEPTED_MIME_TYPES: &[&str] = &[MIME_CSV, MIME_XLSX, MIME_XLS];

/// A file picked by the user, owned by its session until submission.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    /// Type declared by whoever picked the file; never sniffed.
    pub mime_type: String,
    pub size_bytes: u64,
    #[serde(skip)]
    pub contents: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes: contents.len() as u64,
            contents,
        }
    }
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}

/// How loudly a validation problem is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// A problem found before anything is sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please select a file to upload.")]
    MissingFile,

    #[error("Invalid file format. Please upload Excel (.xlsx) or CSV.")]
    UnsupportedType { mime_type: String },

    #[error("Please select the Academic Year above before publishing.")]
    MissingTerm,

    #[error(
        "Filename Mismatch: The file \"{file_name}\" does not match \"{term_label}\". \
         Please ensure the filename contains both \"{year_token}\" and \"{semester_token}\"."
    )]
    FilenameMismatch {
        file_name: String,
        term_label: String,
        year_token: String,
        semester_token: String,
    },
}

impl ValidationError {
    pub fn severity(&self) -> Severity {
        match self {
            Self::MissingTerm => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// Accept or reject a selected file by its declared type.
pub fn validate(file: Option<&SourceFile>) -> Result<(), ValidationError> {
    let file = file.ok_or(ValidationError::MissingFile)?;
    if ACCEPTED_MIME_TYPES.contains(&file.mime_type.as_str()) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedType {
            mime_type: file.mime_type.clone(),
        })
    }
}

/// Declared type for a path, the way a browser file picker assigns one.
///
/// Unknown extensions get `application/octet-stream`, which [`validate`]
/// rejects.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("csv") => MIME_CSV,
        Some("xlsx") => MIME_XLSX,
        Some("xls") => MIME_XLS,
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
