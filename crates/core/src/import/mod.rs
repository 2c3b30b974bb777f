//! Bulk-import workflow: file selection, server preview, batched confirm.
//!
//! Control flow is validator -> transport (preview or direct save) ->
//! preview store -> confirmation engine -> reporter. Only the transport
//! and the engine touch the network; they live in `nexus-client` and
//! drive the types defined here.

pub mod batch;
pub mod file_check;
pub mod kind;
pub mod preview;
pub mod progress;
pub mod report;
pub mod session;
pub mod term;

pub use batch::{partition, Batch, BATCH_SIZE};
pub use file_check::{SourceFile, ValidationError};
pub use kind::{ImportKind, ImportMode};
pub use preview::{PreviewRow, PreviewStore};
pub use progress::{Eta, Outcome, Progress};
pub use report::{report, StatusCategory, StatusIcon, StatusView};
pub use session::{Failure, FailureKind, ImportSession, SessionState};
pub use term::AcademicTerm;
