use crate::import::file_check::ValidationError;
use crate::import::session::SessionState;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A selected file or its metadata was refused before submission.
    #[error(transparent)]
    Rejected(#[from] ValidationError),

    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition { from: SessionState, to: SessionState },

    #[error("No records to confirm")]
    NothingToConfirm,

    #[error("An import is already running on this surface")]
    Busy,

    #[error("Internal error: {0}")]
    Internal(String),
}
