use nexus_core::error::CoreError;
use nexus_core::import::{FailureKind, ValidationError};

/// The bearer credential was missing or refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No token at submission time. No request was sent.
    #[error("Session expired. Please login again.")]
    MissingToken,

    /// The server answered 401.
    #[error("Unauthorized. Please log in again.")]
    Expired,
}

/// Failures talking to the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Endpoint Not Found. Check backend mapping for: {endpoint}")]
    EndpointNotFound { endpoint: String },

    #[error("Unauthorized. Please log in again.")]
    Unauthorized,

    /// Any other non-success status. `message` is already user-facing.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// The request never produced a response.
    #[error("Network error contacting {endpoint}: {message}")]
    Network { endpoint: String, message: String },

    #[error("Unexpected response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

impl TransportError {
    /// Connection-level failures. These abort a batched run.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::EndpointNotFound { .. } => Some(404),
            Self::Unauthorized => Some(401),
            Self::Server { status, .. } => Some(*status),
            Self::Network { .. } | Self::InvalidResponse { .. } => None,
        }
    }
}

/// Top-level error for one import operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Transport(TransportError),

    /// A batch hit a network error; no further batches were sent.
    #[error("Process Interrupted: {0}")]
    FatalRun(TransportError),

    #[error("Import cancelled after {processed} of {total} records.")]
    Cancelled { processed: usize, total: usize },
}

impl From<TransportError> for ImportError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unauthorized => Self::Auth(AuthError::Expired),
            other => Self::Transport(other),
        }
    }
}

impl From<ValidationError> for ImportError {
    fn from(err: ValidationError) -> Self {
        Self::Core(CoreError::Rejected(err))
    }
}

impl ImportError {
    /// The local validation failure, if that is what this is.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Core(CoreError::Rejected(v)) => Some(v),
            _ => None,
        }
    }

    /// How a session that ended on this error records it.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Core(_) => FailureKind::Validation,
            Self::Auth(_) => FailureKind::Auth,
            Self::Transport(_) => FailureKind::Transport,
            Self::FatalRun(_) => FailureKind::FatalRun,
            Self::Cancelled { .. } => FailureKind::Cancelled,
        }
    }
}
