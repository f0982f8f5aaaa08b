use std::fmt::Display;

use futures_util::{Sink, SinkExt};
use prost::Message;

use crate::protocol::messages::{
    AuthenticateContinue, AuthenticateOk, ErrorResponse, ErrorSeverity, NoticeFrame, NoticeScope,
    Scalar, SessionStateChanged, StateParameter,
};
use crate::protocol::{ServerMessage, notice_type, sql_state};

/// Writes responses and notices to the client.
///
/// Every send is flushed immediately. A failed send is logged and swallowed:
/// the caller is already on its way to report or close, and a broken
/// transport shows up on the next read anyway.
pub struct NoticeSender<'a, W> {
    sink: &'a mut W,
    connection_id: u32,
}

impl<'a, W> NoticeSender<'a, W>
where
    W: Sink<ServerMessage> + Unpin,
    W::Error: Display,
{
    pub fn new(sink: &'a mut W, connection_id: u32) -> Self {
        Self {
            sink,
            connection_id,
        }
    }

    async fn send(&mut self, message: ServerMessage) {
        let kind = message.message_type();
        if let Err(e) = self.sink.send(message).await {
            tracing::warn!(
                connection_id = self.connection_id,
                message = ?kind,
                error = %e,
                "failed to send to client"
            );
        }
    }

    pub async fn send_ok(&mut self, message: &str) {
        self.send(ServerMessage::ok(message)).await;
    }

    pub async fn send_error(&mut self, code: u16, sql_state: &str, message: &str, fatal: bool) {
        let severity = if fatal {
            ErrorSeverity::Fatal
        } else {
            ErrorSeverity::Error
        };
        self.send(ServerMessage::Error(ErrorResponse {
            severity: Some(severity as i32),
            code: u32::from(code),
            msg: message.to_string(),
            sql_state: sql_state.to_string(),
        }))
        .await;
    }

    /// Sends a fatal error with the SQLSTATE registered for `code`. Used for
    /// everything that ends the handshake or the session.
    pub async fn send_init_error(&mut self, code: u16, message: &str) {
        self.send_error(code, sql_state::for_code(code), message, true)
            .await;
    }

    pub async fn send_auth_continue(&mut self, data: Vec<u8>) {
        self.send(ServerMessage::AuthenticateContinue(AuthenticateContinue {
            auth_data: data,
        }))
        .await;
    }

    pub async fn send_auth_ok(&mut self, data: Vec<u8>) {
        self.send(ServerMessage::AuthenticateOk(AuthenticateOk {
            auth_data: Some(data),
        }))
        .await;
    }

    pub async fn send_client_id_assigned(&mut self, id: u32) {
        self.send_state_changed(StateParameter::ClientIdAssigned, u64::from(id))
            .await;
    }

    pub async fn send_rows_affected(&mut self, rows: u64) {
        self.send_state_changed(StateParameter::RowsAffected, rows)
            .await;
    }

    pub async fn send_generated_insert_id(&mut self, id: u64) {
        self.send_state_changed(StateParameter::GeneratedInsertId, id)
            .await;
    }

    pub async fn send_stmt_execute_ok(&mut self) {
        self.send(ServerMessage::SqlStmtExecuteOk).await;
    }

    async fn send_state_changed(&mut self, param: StateParameter, value: u64) {
        let change = SessionStateChanged {
            param: param as i32,
            value: Some(Scalar::uint(value)),
        };
        self.send(ServerMessage::Notice(NoticeFrame {
            r#type: notice_type::SESSION_STATE_CHANGED,
            scope: Some(NoticeScope::Local as i32),
            payload: Some(change.encode_to_vec()),
        }))
        .await;
    }
}
