use thiserror::Error;

use crate::backend::BackendError;
use crate::protocol::error_code;

/// Errors that end a session.
///
/// Except for [`SessionError::Closing`], the client has already been sent
/// an error notice by the time one of these is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Malformed payload, or a message not valid in the current state.
    #[error("bad message: {0}")]
    BadMessage(String),

    #[error("invalid authentication method {0}")]
    UnsupportedAuthMode(String),

    /// Credentials rejected, or the exchange was driven out of order.
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("unknown namespace {0}")]
    UnknownNamespace(String),

    /// A message arrived after the session started closing.
    #[error("session is closing")]
    Closing,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl SessionError {
    /// Error code reported to the client.
    pub fn code(&self) -> u16 {
        match self {
            SessionError::BadMessage(_) | SessionError::Closing => error_code::X_BAD_MESSAGE,
            SessionError::UnsupportedAuthMode(_) => error_code::NOT_SUPPORTED_AUTH_MODE,
            SessionError::AccessDenied(_) => error_code::ACCESS_DENIED,
            SessionError::UnknownNamespace(_) => error_code::X_INVALID_NAMESPACE,
            SessionError::Backend(BackendError::Statement { code, .. }) => *code,
            SessionError::Backend(_) => error_code::UNKNOWN_ERROR,
        }
    }

    /// Whether the client has already been told about this error.
    pub fn peer_notified(&self) -> bool {
        !matches!(self, SessionError::Closing)
    }
}
