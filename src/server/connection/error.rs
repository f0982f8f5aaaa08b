use thiserror::Error;

use crate::backend::BackendError;
use crate::capability::CapabilityError;
use crate::protocol::{ProtocolError, error_code};
use crate::session::SessionError;

/// Connection error types.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("capability negotiation failed: {0}")]
    Capability(#[from] CapabilityError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// A handshake message arrived out of order.
    #[error("unexpected {0} during capability negotiation")]
    Handshake(String),
}

impl ConnectionError {
    /// Whether the transport itself failed, so nothing more can be written.
    pub fn is_transport(&self) -> bool {
        match self {
            ConnectionError::Io(_) => true,
            ConnectionError::Protocol(e) => e.is_transport(),
            _ => false,
        }
    }

    /// Whether an error frame describing this error was already sent.
    pub fn peer_notified(&self) -> bool {
        match self {
            ConnectionError::Io(_) | ConnectionError::Protocol(_) => false,
            ConnectionError::Session(e) => e.peer_notified(),
            ConnectionError::Capability(_) | ConnectionError::Handshake(_) => true,
        }
    }

    /// Error code for the closing error frame.
    pub fn code(&self) -> u16 {
        match self {
            ConnectionError::Io(_) => error_code::UNKNOWN_ERROR,
            ConnectionError::Protocol(ProtocolError::FrameTooLarge { .. }) => {
                error_code::NET_PACKET_TOO_LARGE
            }
            ConnectionError::Protocol(e) if e.is_transport() => error_code::UNKNOWN_ERROR,
            ConnectionError::Protocol(_) | ConnectionError::Handshake(_) => {
                error_code::X_BAD_MESSAGE
            }
            ConnectionError::Capability(e) => e.code(),
            ConnectionError::Session(e) => e.code(),
        }
    }

    /// The backend failure behind this error, if any.
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            ConnectionError::Session(SessionError::Backend(e)) => Some(e),
            _ => None,
        }
    }
}
