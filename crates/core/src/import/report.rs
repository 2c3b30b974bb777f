//! Status derivation for whatever renders an import surface.
//!
//! [`report`] is a pure function of the session (plus the current time for
//! the remaining-time estimate). It owns no state.

use chrono::Utc;
use serde::Serialize;

use super::file_check::Severity;
use super::kind::{ImportKind, ImportMode};
use super::progress::format_duration;
use super::session::{ImportSession, SessionState};
use crate::types::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Idle,
    Loading,
    Success,
    Error,
    Warning,
}

/// Toolkit-neutral affordance for a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusIcon {
    Upload,
    Spinner,
    Check,
    Cross,
    Alert,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressView {
    pub processed: usize,
    pub total: usize,
    pub percent: u8,
    pub eta: String,
}

/// Terminal summary panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryView {
    pub kind_label: &'static str,
    pub success_count: usize,
    pub failure_count: usize,
    pub elapsed: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusView {
    pub category: StatusCategory,
    pub icon: StatusIcon,
    pub message: String,
    pub progress: Option<ProgressView>,
    pub summary: Option<SummaryView>,
    /// Offer a "Done"/"Cancel" action that discards the session.
    pub dismissible: bool,
}

impl StatusView {
    fn new(category: StatusCategory, message: impl Into<String>) -> Self {
        let icon = match category {
            StatusCategory::Idle => StatusIcon::Upload,
            StatusCategory::Loading => StatusIcon::Spinner,
            StatusCategory::Success => StatusIcon::Check,
            StatusCategory::Error => StatusIcon::Cross,
            StatusCategory::Warning => StatusIcon::Alert,
        };
        Self {
            category,
            icon,
            message: message.into(),
            progress: None,
            summary: None,
            dismissible: false,
        }
    }
}

/// Derive the status view for a session now.
pub fn report(session: &ImportSession) -> StatusView {
    report_at(session, Utc::now())
}

/// Derive the status view as of `now`.
pub fn report_at(session: &ImportSession, now: Timestamp) -> StatusView {
    match session.state() {
        SessionState::Idle => {
            let message = session
                .source_file()
                .map(|f| format!("Selected file: {}", f.name))
                .unwrap_or_default();
            StatusView::new(StatusCategory::Idle, message)
        }
        SessionState::Validating => StatusView::new(StatusCategory::Loading, "Validating file..."),
        SessionState::AwaitingPreview => {
            StatusView::new(StatusCategory::Loading, awaiting_message(session.kind()))
        }
        SessionState::PreviewReady => match session.notice() {
            Some(notice) => {
                let mut view = StatusView::new(StatusCategory::Warning, notice);
                view.dismissible = true;
                view
            }
            None => StatusView::new(
                StatusCategory::Idle,
                format!("{} records ready for review.", session.rows().len()),
            ),
        },
        SessionState::Confirming => confirming_view(session, now),
        SessionState::Succeeded => {
            let mut view = StatusView::new(StatusCategory::Success, success_message(session));
            view.summary = summary(session);
            view.dismissible = true;
            view
        }
        SessionState::PartiallyFailed => {
            let (saved, failed) = session
                .outcome()
                .map(|o| (o.success_count, o.failure_count))
                .unwrap_or_default();
            let mut view = StatusView::new(
                StatusCategory::Warning,
                format!("Completed with warnings. Saved: {saved}, Failed: {failed}."),
            );
            view.summary = summary(session);
            view.dismissible = true;
            view
        }
        SessionState::Failed => {
            let (category, message) = match session.failure() {
                Some(f) if f.severity == Severity::Warning => {
                    (StatusCategory::Warning, f.message.clone())
                }
                Some(f) => (StatusCategory::Error, f.message.clone()),
                None => (StatusCategory::Error, "Import failed.".to_string()),
            };
            let mut view = StatusView::new(category, message);
            view.dismissible = true;
            view
        }
    }
}

fn awaiting_message(kind: ImportKind) -> &'static str {
    match kind {
        ImportKind::Results => "Parsing spreadsheet and calculating grades...",
        ImportKind::Subject => "Mapping subject codes and updating database...",
        k if k.mode() == ImportMode::DirectSave => "Saving data...",
        _ => "Processing data...",
    }
}

fn confirming_view(session: &ImportSession, now: Timestamp) -> StatusView {
    let progress = session.progress();
    let elapsed = (now - progress.started_at).to_std().unwrap_or_default();
    let eta = progress.eta(elapsed).to_string();
    let percent = progress.percent();

    let message = if progress.processed == 0 {
        format!("Initializing batch process for {} records...", progress.total)
    } else {
        format!(
            "Saving: {}/{} ({percent}%) \u{2022} {eta}",
            progress.processed, progress.total
        )
    };

    let mut view = StatusView::new(StatusCategory::Loading, message);
    view.progress = Some(ProgressView {
        processed: progress.processed,
        total: progress.total,
        percent,
        eta,
    });
    view
}

fn success_message(session: &ImportSession) -> String {
    let count = session.outcome().map(|o| o.success_count).unwrap_or_default();
    match session.kind() {
        ImportKind::Results => match session.term() {
            Some(term) => format!("Results for {} published successfully!", term.label()),
            None => "Results published successfully!".to_string(),
        },
        ImportKind::Subject => match session.source_file() {
            Some(file) => format!("Database updated successfully with {}", file.name),
            None => "Database updated successfully".to_string(),
        },
        kind if kind.mode() == ImportMode::PreviewThenConfirm => {
            format!("Success! Saved all {count} records.")
        }
        kind => format!("Successfully saved {count} {} records!", kind.display_name()),
    }
}

fn summary(session: &ImportSession) -> Option<SummaryView> {
    session.outcome().map(|o| SummaryView {
        kind_label: session.kind().display_name(),
        success_count: o.success_count,
        failure_count: o.failure_count,
        elapsed: format_duration(o.elapsed_seconds),
    })
}
