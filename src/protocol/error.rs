use thiserror::Error;

/// Protocol framing and decoding errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame declares zero length")]
    EmptyFrame,

    #[error("frame of {size} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge { size: usize, limit: usize },

    #[error("unknown client message type: {0}")]
    UnknownMessageType(u8),

    #[error("malformed {message} payload: {source}")]
    Decode {
        message: &'static str,
        #[source]
        source: prost::DecodeError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Returns true for errors raised by the transport itself, after which no
    /// further write should be attempted.
    pub fn is_transport(&self) -> bool {
        matches!(self, ProtocolError::Io(_))
    }
}
