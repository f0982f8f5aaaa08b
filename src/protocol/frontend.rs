use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;

use crate::protocol::codec::{HEADER_LEN, XCodec, put_frame};
use crate::protocol::error::ProtocolError;
use crate::protocol::messages::{
    AuthenticateContinue, AuthenticateStart, CapabilitiesGet, CapabilitiesSet, ConnectionClose,
    SessionClose, SessionReset, StmtExecute,
};
use crate::protocol::types::ClientMessageType;

/// A protobuf message the client may send, tied to its wire type.
pub trait ClientPayload: prost::Message + Default {
    const NAME: &'static str;
    const TYPE: ClientMessageType;
}

macro_rules! client_payload {
    ($($msg:ty => $ty:ident, $name:literal;)*) => {
        $(
            impl ClientPayload for $msg {
                const NAME: &'static str = $name;
                const TYPE: ClientMessageType = ClientMessageType::$ty;
            }
        )*
    };
}

client_payload! {
    CapabilitiesGet => CapabilitiesGet, "CapabilitiesGet";
    CapabilitiesSet => CapabilitiesSet, "CapabilitiesSet";
    ConnectionClose => ConnectionClose, "Connection.Close";
    AuthenticateStart => AuthenticateStart, "AuthenticateStart";
    AuthenticateContinue => AuthenticateContinue, "AuthenticateContinue";
    SessionReset => SessionReset, "Session.Reset";
    SessionClose => SessionClose, "Session.Close";
    StmtExecute => SqlStmtExecute, "StmtExecute";
}

/// One client frame: declared message type plus the still-encoded payload.
///
/// The payload is decoded lazily by whichever state handler receives it, so
/// a malformed payload and a message that is wrong for the current state are
/// reported separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub msg_type: u8,
    pub payload: Bytes,
}

impl Frame {
    /// Builds a frame carrying an encoded client message.
    pub fn from_message<M: ClientPayload>(message: &M) -> Self {
        Self {
            msg_type: M::TYPE.as_u8(),
            payload: Bytes::from(message.encode_to_vec()),
        }
    }

    pub fn message_type(&self) -> Result<ClientMessageType, ProtocolError> {
        ClientMessageType::try_from(self.msg_type).map_err(ProtocolError::UnknownMessageType)
    }

    /// Decodes the payload as `M`.
    pub fn decode<M: ClientPayload>(&self) -> Result<M, ProtocolError> {
        M::decode(self.payload.as_ref()).map_err(|source| ProtocolError::Decode {
            message: M::NAME,
            source,
        })
    }

    /// Serializes the frame with its length prefix.
    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        put_frame(&mut buf, self.msg_type, &self.payload);
        buf
    }
}

impl Decoder for XCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        // Peek at the length (don't consume yet)
        let len = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if len == 0 {
            return Err(ProtocolError::EmptyFrame);
        }
        if len > self.max_message_size {
            return Err(ProtocolError::FrameTooLarge {
                size: len,
                limit: self.max_message_size,
            });
        }

        let total = HEADER_LEN + len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let msg_type = src.get_u8();
        let payload = src.split_to(len - 1).freeze();
        Ok(Some(Frame { msg_type, payload }))
    }
}
