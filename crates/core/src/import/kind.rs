//! Import kinds and the workflow mode each one uses.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// How the server persists an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// The upload call itself persists records; there is no review step.
    DirectSave,
    /// The upload returns rows for review; a separate batched call saves them.
    PreviewThenConfirm,
}

/// Which registry an upload targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Student,
    Faculty,
    ScheduleAllotment,
    Subject,
    Results,
}

impl ImportKind {
    pub const ALL: [ImportKind; 5] = [
        Self::Student,
        Self::Faculty,
        Self::ScheduleAllotment,
        Self::Subject,
        Self::Results,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Faculty => "faculty",
            Self::ScheduleAllotment => "schedule_allotment",
            Self::Subject => "subject",
            Self::Results => "results",
        }
    }

    /// Human-readable name used in status messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Faculty => "Faculty",
            Self::ScheduleAllotment => "Schedule Allotment",
            Self::Subject => "Subject",
            Self::Results => "Results",
        }
    }

    /// Upper-case token used in environment variable names.
    pub fn env_token(&self) -> &'static str {
        match self {
            Self::Student => "STUDENT",
            Self::Faculty => "FACULTY",
            Self::ScheduleAllotment => "SCHEDULE",
            Self::Subject => "SUBJECT",
            Self::Results => "RESULTS",
        }
    }

    pub fn mode(&self) -> ImportMode {
        match self {
            Self::Student => ImportMode::PreviewThenConfirm,
            _ => ImportMode::DirectSave,
        }
    }

    /// Results uploads must name the academic term they belong to.
    pub fn requires_term(&self) -> bool {
        matches!(self, Self::Results)
    }

    /// Endpoint receiving the multipart upload.
    pub fn default_upload_path(&self) -> &'static str {
        match self {
            Self::Student => "/api/student/add-users/",
            Self::Faculty | Self::ScheduleAllotment => "/api/faculty/save-faculty/",
            Self::Subject => "/api/results/subjectInfo/",
            Self::Results => "/api/results/result/",
        }
    }

    /// Endpoint receiving confirmed batches. Only preview kinds have one.
    pub fn default_save_path(&self) -> Option<&'static str> {
        match self {
            Self::Student => Some("/api/student/save-users/"),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "student" | "students" => Ok(Self::Student),
            "faculty" => Ok(Self::Faculty),
            "schedule" | "schedule_allotment" => Ok(Self::ScheduleAllotment),
            "subject" | "subjects" => Ok(Self::Subject),
            "result" | "results" => Ok(Self::Results),
            _ => Err(CoreError::Validation(format!(
                "Unknown import kind '{s}'. \
                 Must be one of: student, faculty, schedule, subject, results"
            ))),
        }
    }
}
