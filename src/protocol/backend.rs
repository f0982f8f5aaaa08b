use bytes::BytesMut;
use prost::Message;
use tokio_util::codec::Encoder;

use crate::protocol::codec::{XCodec, put_frame};
use crate::protocol::error::ProtocolError;
use crate::protocol::messages::{
    AuthenticateContinue, AuthenticateOk, Capabilities, ErrorResponse, ErrorSeverity, NoticeFrame,
    OkResponse, StmtExecuteOk,
};
use crate::protocol::types::{ServerMessageType, sql_state};

/// Messages sent by the server to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Ok(OkResponse),
    Error(ErrorResponse),
    Capabilities(Capabilities),
    AuthenticateContinue(AuthenticateContinue),
    AuthenticateOk(AuthenticateOk),
    Notice(NoticeFrame),
    SqlStmtExecuteOk,
}

impl ServerMessage {
    pub fn ok(message: impl Into<String>) -> Self {
        ServerMessage::Ok(OkResponse {
            msg: Some(message.into()),
        })
    }

    /// Builds an error. Fatal errors tell the client the connection is about
    /// to be closed.
    pub fn error(code: u16, message: impl Into<String>, fatal: bool) -> Self {
        let severity = if fatal {
            ErrorSeverity::Fatal
        } else {
            ErrorSeverity::Error
        };
        ServerMessage::Error(ErrorResponse {
            severity: Some(severity as i32),
            code: u32::from(code),
            msg: message.into(),
            sql_state: sql_state::for_code(code).to_string(),
        })
    }

    pub fn message_type(&self) -> ServerMessageType {
        match self {
            ServerMessage::Ok(_) => ServerMessageType::Ok,
            ServerMessage::Error(_) => ServerMessageType::Error,
            ServerMessage::Capabilities(_) => ServerMessageType::ConnectionCapabilities,
            ServerMessage::AuthenticateContinue(_) => ServerMessageType::AuthenticateContinue,
            ServerMessage::AuthenticateOk(_) => ServerMessageType::AuthenticateOk,
            ServerMessage::Notice(_) => ServerMessageType::Notice,
            ServerMessage::SqlStmtExecuteOk => ServerMessageType::SqlStmtExecuteOk,
        }
    }

    fn encode_payload(&self) -> Vec<u8> {
        match self {
            ServerMessage::Ok(m) => m.encode_to_vec(),
            ServerMessage::Error(m) => m.encode_to_vec(),
            ServerMessage::Capabilities(m) => m.encode_to_vec(),
            ServerMessage::AuthenticateContinue(m) => m.encode_to_vec(),
            ServerMessage::AuthenticateOk(m) => m.encode_to_vec(),
            ServerMessage::Notice(m) => m.encode_to_vec(),
            ServerMessage::SqlStmtExecuteOk => StmtExecuteOk {}.encode_to_vec(),
        }
    }

    /// Decodes a server message from its type byte and payload, as a client
    /// would.
    pub fn decode(msg_type: u8, payload: &[u8]) -> Result<Self, ProtocolError> {
        fn decode_as<M: Message + Default>(
            name: &'static str,
            payload: &[u8],
        ) -> Result<M, ProtocolError> {
            M::decode(payload).map_err(|source| ProtocolError::Decode {
                message: name,
                source,
            })
        }

        let ty = ServerMessageType::try_from(msg_type)
            .map_err(ProtocolError::UnknownMessageType)?;
        Ok(match ty {
            ServerMessageType::Ok => ServerMessage::Ok(decode_as("Ok", payload)?),
            ServerMessageType::Error => ServerMessage::Error(decode_as("Error", payload)?),
            ServerMessageType::ConnectionCapabilities => {
                ServerMessage::Capabilities(decode_as("Capabilities", payload)?)
            }
            ServerMessageType::AuthenticateContinue => {
                ServerMessage::AuthenticateContinue(decode_as("AuthenticateContinue", payload)?)
            }
            ServerMessageType::AuthenticateOk => {
                ServerMessage::AuthenticateOk(decode_as("AuthenticateOk", payload)?)
            }
            ServerMessageType::Notice => ServerMessage::Notice(decode_as("Notice.Frame", payload)?),
            ServerMessageType::SqlStmtExecuteOk => {
                decode_as::<StmtExecuteOk>("StmtExecuteOk", payload)?;
                ServerMessage::SqlStmtExecuteOk
            }
        })
    }
}

impl Encoder<ServerMessage> for XCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: ServerMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = item.encode_payload();
        if payload.len() + 1 > self.max_message_size {
            return Err(ProtocolError::FrameTooLarge {
                size: payload.len() + 1,
                limit: self.max_message_size,
            });
        }
        put_frame(dst, item.message_type().as_u8(), &payload);
        Ok(())
    }
}
