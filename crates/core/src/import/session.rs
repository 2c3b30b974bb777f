//! The import session and its explicit state machine.
//!
//! A session covers one user-initiated import, from file selection to a
//! terminal outcome. States only move forward along [`SessionState`]'s
//! transition table; cancelling or dismissing discards the session
//! instead of rewinding it.

use serde::{Deserialize, Serialize};

use super::batch::{partition, BATCH_SIZE};
use super::file_check::{self, Severity, SourceFile, ValidationError};
use super::kind::{ImportKind, ImportMode};
use super::preview::{PreviewRow, PreviewStore};
use super::progress::{Outcome, Progress};
use super::term::AcademicTerm;
use crate::error::CoreError;
use crate::types::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Validating,
    AwaitingPreview,
    PreviewReady,
    Confirming,
    Succeeded,
    Failed,
    PartiallyFailed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::AwaitingPreview => "awaiting_preview",
            Self::PreviewReady => "preview_ready",
            Self::Confirming => "confirming",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::PartiallyFailed => "partially_failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::PartiallyFailed)
    }

    /// Whether network work for this session may currently be in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::AwaitingPreview | Self::Confirming)
    }

    /// The transition table. Anything not listed is refused.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Validating | AwaitingPreview | Failed)
                | (Validating, Idle | Failed)
                | (AwaitingPreview, PreviewReady | Succeeded | Failed)
                | (PreviewReady, Confirming | Failed)
                | (Confirming, Succeeded | PartiallyFailed | Failed)
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What went wrong, for sessions that end in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    Auth,
    Transport,
    FatalRun,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub severity: Severity,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

impl From<&ValidationError> for Failure {
    fn from(err: &ValidationError) -> Self {
        Self {
            kind: FailureKind::Validation,
            severity: err.severity(),
            message: err.to_string(),
        }
    }
}

/// One bulk-import attempt.
#[derive(Debug, Clone)]
pub struct ImportSession {
    id: SessionId,
    kind: ImportKind,
    state: SessionState,
    source_file: Option<SourceFile>,
    term: Option<AcademicTerm>,
    preview: PreviewStore,
    progress: Progress,
    batch_size: usize,
    outcome: Option<Outcome>,
    failure: Option<Failure>,
    notice: Option<String>,
    /// Batch indices the server rejected in the current run.
    rejected_batches: Vec<usize>,
    /// Index of the first batch not yet sent.
    next_batch: usize,
}

impl ImportSession {
    pub fn new(kind: ImportKind) -> Self {
        Self {
            id: SessionId::new_v4(),
            kind,
            state: SessionState::Idle,
            source_file: None,
            term: None,
            preview: PreviewStore::new(kind),
            progress: Progress::new(0),
            batch_size: BATCH_SIZE,
            outcome: None,
            failure: None,
            notice: None,
            rejected_batches: Vec::new(),
            next_batch: 0,
        }
    }

    // ---- accessors ----

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn kind(&self) -> ImportKind {
        self.kind
    }

    pub fn mode(&self) -> ImportMode {
        self.kind.mode()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn source_file(&self) -> Option<&SourceFile> {
        self.source_file.as_ref()
    }

    pub fn term(&self) -> Option<&AcademicTerm> {
        self.term.as_ref()
    }

    pub fn preview(&self) -> &PreviewStore {
        &self.preview
    }

    pub fn rows(&self) -> &[PreviewRow] {
        self.preview.rows()
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Batches the server rejected during the last confirm run.
    pub fn rejected_batches(&self) -> &[usize] {
        &self.rejected_batches
    }

    /// Informational message that is neither success nor failure.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    // ---- pre-submission ----

    /// Select the academic term a results upload belongs to.
    pub fn set_term(&mut self, term: Option<AcademicTerm>) {
        self.term = term;
    }

    /// Attach a user-selected file, running the declared-type check.
    ///
    /// On rejection the file reference is cleared and the session fails.
    pub fn attach_file(&mut self, file: Option<SourceFile>) -> Result<(), CoreError> {
        self.transition(SessionState::Validating)?;
        match file_check::validate(file.as_ref()) {
            Ok(()) => {
                self.source_file = file;
                self.transition(SessionState::Idle)
            }
            Err(err) => {
                self.source_file = None;
                self.fail(Failure::from(&err))?;
                Err(err.into())
            }
        }
    }

    /// Check everything that can be checked without the network.
    ///
    /// Runs before any credential lookup. A failed check fails the session.
    pub fn check_ready(&mut self) -> Result<(), CoreError> {
        if self.state != SessionState::Idle {
            return Err(CoreError::InvalidTransition {
                from: self.state,
                to: SessionState::AwaitingPreview,
            });
        }
        if let Err(err) = self.pre_submit_check() {
            self.fail(Failure::from(&err))?;
            return Err(err.into());
        }
        Ok(())
    }

    fn pre_submit_check(&self) -> Result<(), ValidationError> {
        file_check::validate(self.source_file.as_ref())?;
        if self.kind.requires_term() {
            let term = self.term.as_ref().ok_or(ValidationError::MissingTerm)?;
            if let Some(file) = &self.source_file {
                term.check_filename(&file.name)?;
            }
        }
        Ok(())
    }

    /// The upload request is about to be sent.
    pub fn begin_upload(&mut self) -> Result<(), CoreError> {
        self.transition(SessionState::AwaitingPreview)?;
        self.progress = Progress::new(0);
        Ok(())
    }

    // ---- server responses ----

    /// Preview rows arrived. An empty set is kept and flagged with a notice.
    pub fn preview_received(&mut self, rows: Vec<PreviewRow>) -> Result<(), CoreError> {
        self.transition(SessionState::PreviewReady)?;
        if rows.is_empty() {
            self.notice = Some("File uploaded, but no records were returned for preview.".into());
        }
        self.preview.set_rows(rows);
        Ok(())
    }

    /// The upload call itself persisted `record_count` records.
    pub fn saved_directly(
        &mut self,
        rows: Vec<PreviewRow>,
        record_count: usize,
        elapsed_seconds: f64,
    ) -> Result<(), CoreError> {
        self.transition(SessionState::Succeeded)?;
        self.preview.set_rows(rows);
        self.progress = Progress::new(record_count);
        self.progress.advance(record_count);
        self.outcome = Some(Outcome {
            success_count: record_count,
            failure_count: 0,
            elapsed_seconds,
            failed_batches: Vec::new(),
        });
        Ok(())
    }

    // ---- confirmation ----

    /// Enter `Confirming`, resetting progress to the row count.
    pub fn begin_confirm(&mut self, batch_size: usize) -> Result<usize, CoreError> {
        if self.state == SessionState::PreviewReady && self.preview.is_empty() {
            return Err(CoreError::NothingToConfirm);
        }
        self.transition(SessionState::Confirming)?;
        self.batch_size = batch_size.max(1);
        self.notice = None;
        self.rejected_batches.clear();
        self.next_batch = 0;
        self.progress = Progress::new(self.preview.rows().len());
        Ok(self.progress.total)
    }

    /// Batch `index` of `rows` rows finished, accepted or not.
    pub fn record_batch(&mut self, index: usize, rows: usize, accepted: bool) {
        debug_assert_eq!(self.state, SessionState::Confirming);
        if !accepted {
            self.rejected_batches.push(index);
        }
        self.next_batch = index + 1;
        self.progress.advance(rows);
    }

    /// Every batch was sent. Chooses the terminal state from the counts.
    pub fn finish_confirm(&mut self, outcome: Outcome) -> Result<(), CoreError> {
        let next = if outcome.failure_count == 0 {
            SessionState::Succeeded
        } else {
            SessionState::PartiallyFailed
        };
        self.transition(next)?;
        self.outcome = Some(outcome);
        Ok(())
    }

    /// Move to `Failed` from any non-terminal state.
    pub fn fail(&mut self, failure: Failure) -> Result<(), CoreError> {
        self.transition(SessionState::Failed)?;
        self.failure = Some(failure);
        Ok(())
    }

    /// Fail a session whose upload or batched save was dropped mid-flight.
    ///
    /// Returns `false` when nothing was in flight.
    pub fn abandon(&mut self) -> bool {
        let message = match self.state {
            SessionState::AwaitingPreview => {
                "Upload abandoned before the server replied.".to_string()
            }
            SessionState::Confirming => format!(
                "Import cancelled after {} of {} records.",
                self.progress.processed, self.progress.total
            ),
            _ => return false,
        };
        self.fail(Failure::new(FailureKind::Cancelled, message)).is_ok()
    }

    // ---- re-runs ----

    /// A fresh session ready to confirm every row again.
    ///
    /// This resends rows that already saved; the backend carries no
    /// idempotency key, so duplicates are its concern.
    pub fn resubmit_all(&self) -> Result<ImportSession, CoreError> {
        self.require_rerunnable()?;
        Ok(self.rerun_with(self.preview.rows().to_vec()))
    }

    /// A fresh session holding only the rows that were not saved.
    ///
    /// That is every batch the server rejected, plus every batch a fatal
    /// error or cancellation kept from being sent. A batch whose request
    /// was in flight when the run stopped counts as unsent.
    pub fn resubmit_failed(&self) -> Result<ImportSession, CoreError> {
        self.require_rerunnable()?;
        let rows: Vec<PreviewRow> = partition(self.preview.rows(), self.batch_size)
            .into_iter()
            .filter(|b| b.index >= self.next_batch || self.rejected_batches.contains(&b.index))
            .flat_map(|b| b.rows.iter().cloned())
            .collect();
        if rows.is_empty() {
            return Err(CoreError::NothingToConfirm);
        }
        Ok(self.rerun_with(rows))
    }

    fn require_rerunnable(&self) -> Result<(), CoreError> {
        let ran = matches!(
            self.state,
            SessionState::PartiallyFailed | SessionState::Failed
        );
        if !ran || self.mode() != ImportMode::PreviewThenConfirm || self.preview.is_empty() {
            return Err(CoreError::InvalidTransition {
                from: self.state,
                to: SessionState::PreviewReady,
            });
        }
        Ok(())
    }

    fn rerun_with(&self, rows: Vec<PreviewRow>) -> ImportSession {
        let mut next = ImportSession::new(self.kind);
        next.source_file = self.source_file.clone();
        next.term = self.term.clone();
        next.batch_size = self.batch_size;
        next.state = SessionState::PreviewReady;
        next.preview.set_rows(rows);
        next
    }

    fn transition(&mut self, next: SessionState) -> Result<(), CoreError> {
        if !self.state.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::file_check::MIME_XLSX;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn xlsx(name: &str) -> SourceFile {
        SourceFile::new(name, MIME_XLSX, b"PK".to_vec())
    }

    fn rows(n: usize) -> Vec<PreviewRow> {
        (0..n)
            .map(|i| PreviewRow::from_value(json!({ "ID": format!("R{i}") })).unwrap())
            .collect()
    }

    fn preview_ready(n: usize) -> ImportSession {
        let mut s = ImportSession::new(ImportKind::Student);
        s.attach_file(Some(xlsx("students.xlsx"))).unwrap();
        s.check_ready().unwrap();
        s.begin_upload().unwrap();
        s.preview_received(rows(n)).unwrap();
        s
    }

    #[test]
    fn accepted_file_returns_to_idle() {
        let mut s = ImportSession::new(ImportKind::Student);
        s.attach_file(Some(xlsx("students.xlsx"))).unwrap();
        assert_eq!(s.state(), SessionState::Idle);
        assert_eq!(s.source_file().unwrap().name, "students.xlsx");
    }

    #[test]
    fn rejected_file_leaves_reference_unset() {
        let mut s = ImportSession::new(ImportKind::Faculty);
        let docx = SourceFile::new(
            "notes.docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            vec![0],
        );
        let err = s.attach_file(Some(docx)).unwrap_err();
        assert_matches!(err, CoreError::Rejected(ValidationError::UnsupportedType { .. }));
        assert!(s.source_file().is_none());
        assert_eq!(s.state(), SessionState::Failed);
        assert_eq!(
            s.failure().unwrap().message,
            "Invalid file format. Please upload Excel (.xlsx) or CSV."
        );
    }

    #[test]
    fn submitting_without_a_file_fails() {
        let mut s = ImportSession::new(ImportKind::Student);
        assert_matches!(
            s.check_ready(),
            Err(CoreError::Rejected(ValidationError::MissingFile))
        );
        assert_eq!(s.state(), SessionState::Failed);
    }

    #[test]
    fn results_need_a_term_and_matching_filename() {
        let mut s = ImportSession::new(ImportKind::Results);
        s.attach_file(Some(xlsx("results_final.xlsx"))).unwrap();
        assert_matches!(
            s.clone().check_ready(),
            Err(CoreError::Rejected(ValidationError::MissingTerm))
        );

        s.set_term(Some("E2_S1".parse().unwrap()));
        assert_matches!(
            s.check_ready(),
            Err(CoreError::Rejected(ValidationError::FilenameMismatch { .. }))
        );

        let mut ok = ImportSession::new(ImportKind::Results);
        ok.set_term(Some("E2_S1".parse().unwrap()));
        ok.attach_file(Some(xlsx("E2_SEM1_results.xlsx"))).unwrap();
        assert!(ok.check_ready().is_ok());
    }

    #[test]
    fn missing_term_failure_is_a_warning() {
        let mut s = ImportSession::new(ImportKind::Results);
        s.attach_file(Some(xlsx("E2_S1.xlsx"))).unwrap();
        let _ = s.check_ready();
        assert_eq!(s.failure().unwrap().severity, Severity::Warning);
    }

    #[test]
    fn confirming_only_from_preview_ready() {
        let mut s = ImportSession::new(ImportKind::Student);
        assert_matches!(
            s.begin_confirm(BATCH_SIZE),
            Err(CoreError::InvalidTransition {
                from: SessionState::Idle,
                to: SessionState::Confirming
            })
        );
    }

    #[test]
    fn empty_preview_cannot_be_confirmed() {
        let mut s = preview_ready(0);
        assert!(s.notice().is_some());
        assert_eq!(s.begin_confirm(BATCH_SIZE), Err(CoreError::NothingToConfirm));
        assert_eq!(s.state(), SessionState::PreviewReady);
    }

    #[test]
    fn confirm_run_with_failures_is_partial() {
        let mut s = preview_ready(23);
        assert_eq!(s.begin_confirm(BATCH_SIZE).unwrap(), 23);
        for (index, len) in [10, 10, 3].into_iter().enumerate() {
            s.record_batch(index, len, index != 1);
        }
        s.finish_confirm(Outcome {
            success_count: 13,
            failure_count: 10,
            elapsed_seconds: 2.0,
            failed_batches: vec![1],
        })
        .unwrap();
        assert_eq!(s.state(), SessionState::PartiallyFailed);
        assert_eq!(s.progress().processed, 23);
    }

    #[test]
    fn terminal_states_do_not_move() {
        let mut s = preview_ready(3);
        s.begin_confirm(BATCH_SIZE).unwrap();
        s.record_batch(0, 3, true);
        s.finish_confirm(Outcome {
            success_count: 3,
            failure_count: 0,
            elapsed_seconds: 0.2,
            failed_batches: vec![],
        })
        .unwrap();
        assert_eq!(s.state(), SessionState::Succeeded);
        assert!(s.begin_confirm(BATCH_SIZE).is_err());
        assert!(s.fail(Failure::new(FailureKind::Transport, "x")).is_err());
        assert!(s.resubmit_all().is_err());
    }

    #[test]
    fn never_reenters_idle_from_confirming() {
        for state in [
            SessionState::Confirming,
            SessionState::PreviewReady,
            SessionState::AwaitingPreview,
            SessionState::Succeeded,
            SessionState::Failed,
            SessionState::PartiallyFailed,
        ] {
            assert!(!state.can_transition_to(SessionState::Idle), "{state}");
        }
    }

    #[test]
    fn resubmit_all_and_failed_only() {
        let mut s = preview_ready(23);
        s.begin_confirm(BATCH_SIZE).unwrap();
        s.record_batch(0, 10, true);
        s.record_batch(1, 10, false);
        s.record_batch(2, 3, true);
        s.finish_confirm(Outcome {
            success_count: 13,
            failure_count: 10,
            elapsed_seconds: 1.0,
            failed_batches: vec![1],
        })
        .unwrap();

        let all = s.resubmit_all().unwrap();
        assert_eq!(all.state(), SessionState::PreviewReady);
        assert_eq!(all.rows().len(), 23);
        assert_ne!(all.id(), s.id());

        let failed = s.resubmit_failed().unwrap();
        assert_eq!(failed.rows().len(), 10);
        assert_eq!(failed.rows()[0].get("ID"), Some(&json!("R10")));
        assert_eq!(failed.rows()[9].get("ID"), Some(&json!("R19")));
    }

    #[test]
    fn resubmit_failed_after_abort_includes_unsent_batches() {
        let mut s = preview_ready(45);
        s.begin_confirm(BATCH_SIZE).unwrap();
        s.record_batch(0, 10, false);
        s.record_batch(1, 10, true);
        s.fail(Failure::new(FailureKind::FatalRun, "Process Interrupted: connection refused"))
            .unwrap();
        assert!(s.outcome().is_none());
        assert_eq!(s.rejected_batches(), &[0]);

        let rerun = s.resubmit_failed().unwrap();
        assert_eq!(rerun.state(), SessionState::PreviewReady);
        assert_eq!(rerun.rows().len(), 35);
        assert_eq!(rerun.rows()[0].get("ID"), Some(&json!("R0")));
        assert_eq!(rerun.rows()[10].get("ID"), Some(&json!("R20")));
        assert_eq!(rerun.rows()[34].get("ID"), Some(&json!("R44")));
    }

    #[test]
    fn resubmit_failed_before_any_batch_resends_everything() {
        let mut s = preview_ready(12);
        s.fail(Failure::new(FailureKind::Auth, "Session expired. Please login again."))
            .unwrap();
        assert_eq!(s.resubmit_failed().unwrap().rows().len(), 12);
    }

    #[test]
    fn abandoned_work_fails_the_session() {
        let mut uploading = ImportSession::new(ImportKind::Student);
        uploading.attach_file(Some(xlsx("students.xlsx"))).unwrap();
        uploading.check_ready().unwrap();
        uploading.begin_upload().unwrap();
        assert!(uploading.abandon());
        assert_eq!(uploading.state(), SessionState::Failed);
        assert_eq!(uploading.failure().unwrap().kind, FailureKind::Cancelled);

        let mut saving = preview_ready(25);
        saving.begin_confirm(BATCH_SIZE).unwrap();
        saving.record_batch(0, 10, true);
        assert!(saving.abandon());
        assert_eq!(
            saving.failure().unwrap().message,
            "Import cancelled after 10 of 25 records."
        );
        assert_eq!(saving.resubmit_failed().unwrap().rows().len(), 15);

        let mut ready = preview_ready(3);
        assert!(!ready.abandon());
        assert_eq!(ready.state(), SessionState::PreviewReady);
    }

    #[test]
    fn direct_save_goes_straight_to_succeeded() {
        let mut s = ImportSession::new(ImportKind::Faculty);
        s.attach_file(Some(xlsx("faculty.xlsx"))).unwrap();
        s.check_ready().unwrap();
        s.begin_upload().unwrap();
        s.saved_directly(Vec::new(), 42, 1.5).unwrap();
        assert_eq!(s.state(), SessionState::Succeeded);
        let outcome = s.outcome().unwrap();
        assert_eq!(outcome.success_count, 42);
        assert_eq!(s.progress().processed, 42);
    }
}
