//! Per-connection session state machine.
//!
//! A [`Session`] is created once the capability phase is over. It routes each
//! client frame by its current state and writes responses through a
//! [`NoticeSender`].
//!
//! ```text
//! +----------------+  auth ok   +-------+  close/reset  +---------+
//! | Authenticating | ---------> | Ready | ------------> | Closing |
//! +----------------+            +-------+               +---------+
//!         |                                                  ^
//!         +------------------ auth failure ------------------+
//!                         (connection drops)
//! ```
//!
//! The session never closes the transport itself. It returns a
//! [`SessionError`] and leaves teardown to the connection.

pub mod error;
pub mod notice;

use std::fmt::Display;
use std::sync::Arc;

use futures_util::Sink;
use tracing::{debug, info};

use crate::auth::{AuthHandler, AuthResponse, AuthStatus, Identity, Mechanism};
use crate::backend::{BackendError, Namespace, QueryBackend};
use crate::protocol::messages::{
    AuthenticateContinue, AuthenticateStart, ConnectionClose, SessionClose, StmtExecute,
};
use crate::protocol::{ClientMessageType, Frame, ServerMessage, error_code};

pub use error::SessionError;
pub use notice::NoticeSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Authenticating,
    Ready,
    /// Terminal. Nothing more is dispatched.
    Closing,
}

/// Session of one client connection.
pub struct Session {
    id: u32,
    state: SessionState,
    state_before_close: SessionState,
    /// Present only while an exchange is in progress.
    auth: Option<AuthHandler>,
    identity: Option<Identity>,
    last_statement: Option<String>,
    backend: Arc<dyn QueryBackend>,
    mechanisms: Arc<[Mechanism]>,
}

impl Session {
    /// Creates a session that accepts only the given mechanisms.
    pub fn new(id: u32, backend: Arc<dyn QueryBackend>, mechanisms: Arc<[Mechanism]>) -> Self {
        Self {
            id,
            state: SessionState::Authenticating,
            state_before_close: SessionState::Authenticating,
            auth: None,
            identity: None,
            last_statement: None,
            backend,
            mechanisms,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// State the session was in when it was last closed with preservation
    /// requested.
    pub fn state_before_close(&self) -> SessionState {
        self.state_before_close
    }

    pub fn is_authenticating(&self) -> bool {
        self.auth.is_some()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn last_statement(&self) -> Option<&str> {
        self.last_statement.as_deref()
    }

    /// Routes one frame according to the current state.
    pub async fn handle_message<W>(&mut self, frame: &Frame, sink: &mut W) -> Result<(), SessionError>
    where
        W: Sink<ServerMessage> + Unpin,
        W::Error: Display,
    {
        match self.state {
            SessionState::Authenticating => self.handle_auth_message(frame, sink).await,
            SessionState::Ready => self.handle_ready_message(frame, sink).await,
            SessionState::Closing => Err(SessionError::Closing),
        }
    }

    /// Handles `AuthenticateStart` and `AuthenticateContinue`. Anything else
    /// aborts authentication.
    pub async fn handle_auth_message<W>(
        &mut self,
        frame: &Frame,
        sink: &mut W,
    ) -> Result<(), SessionError>
    where
        W: Sink<ServerMessage> + Unpin,
        W::Error: Display,
    {
        let mut notices = NoticeSender::new(sink, self.id);

        match frame.message_type() {
            Ok(ClientMessageType::AuthenticateStart) => {
                let start = match frame.decode::<AuthenticateStart>() {
                    Ok(start) => start,
                    Err(e) => {
                        self.auth = None;
                        return Err(self.bad_message(&mut notices, e).await);
                    }
                };

                let mut handler = match self.auth.take() {
                    // The handler decides whether a second start is legal.
                    Some(handler) => handler,
                    None => match self.create_handler(&start.mech_name) {
                        Some(handler) => handler,
                        None => {
                            let message = format!("Invalid authentication method {}", start.mech_name);
                            notices
                                .send_init_error(error_code::NOT_SUPPORTED_AUTH_MODE, &message)
                                .await;
                            return Err(SessionError::UnsupportedAuthMode(start.mech_name));
                        }
                    },
                };

                debug!(
                    connection_id = self.id,
                    mechanism = %handler.mechanism(),
                    "authentication started"
                );
                let response = handler
                    .handle_start(
                        start.auth_data.as_deref().unwrap_or_default(),
                        start.initial_response.as_deref().unwrap_or_default(),
                        self.backend.as_ref(),
                    )
                    .await;
                self.apply_auth_response(handler, response, &mut notices)
                    .await
            }
            Ok(ClientMessageType::AuthenticateContinue) => {
                let cont = match frame.decode::<AuthenticateContinue>() {
                    Ok(cont) => cont,
                    Err(e) => {
                        self.auth = None;
                        return Err(self.bad_message(&mut notices, e).await);
                    }
                };

                let Some(mut handler) = self.auth.take() else {
                    return self
                        .fail_auth(AuthResponse::out_of_order(), &mut notices)
                        .await;
                };
                let response = handler
                    .handle_continue(&cont.auth_data, self.backend.as_ref())
                    .await;
                self.apply_auth_response(handler, response, &mut notices)
                    .await
            }
            _ => {
                let err = self.bad_message(&mut notices, unexpected(frame)).await;
                self.auth = None;
                Err(err)
            }
        }
    }

    /// Handles messages valid once authenticated.
    pub async fn handle_ready_message<W>(
        &mut self,
        frame: &Frame,
        sink: &mut W,
    ) -> Result<(), SessionError>
    where
        W: Sink<ServerMessage> + Unpin,
        W::Error: Display,
    {
        let mut notices = NoticeSender::new(sink, self.id);

        match frame.message_type() {
            Ok(ty @ (ClientMessageType::SessionClose | ClientMessageType::ConnectionClose)) => {
                let decoded = match ty {
                    ClientMessageType::SessionClose => frame.decode::<SessionClose>().map(drop),
                    _ => frame.decode::<ConnectionClose>().map(drop),
                };
                if let Err(e) = decoded {
                    return Err(self.bad_message(&mut notices, e).await);
                }
                notices.send_ok("bye!").await;
                self.on_close(false);
                Ok(())
            }
            Ok(ClientMessageType::SessionReset) => {
                self.state = SessionState::Closing;
                self.on_session_reset().await;
                notices.send_ok("").await;
                Ok(())
            }
            Ok(ClientMessageType::SqlStmtExecute) => {
                let stmt = match frame.decode::<StmtExecute>() {
                    Ok(stmt) => stmt,
                    Err(e) => return Err(self.bad_message(&mut notices, e).await),
                };
                self.execute_statement(stmt, &mut notices).await
            }
            _ => Err(self.bad_message(&mut notices, unexpected(frame)).await),
        }
    }

    /// Moves to `Closing`. The pre-close state is recorded only when
    /// `preserve` is set and the session was not already closing.
    pub fn on_close(&mut self, preserve: bool) {
        if self.state != SessionState::Closing {
            if preserve {
                self.state_before_close = self.state;
            }
            self.state = SessionState::Closing;
        }
    }

    fn create_handler(&self, mechanism: &str) -> Option<AuthHandler> {
        AuthHandler::create(mechanism).filter(|h| self.mechanisms.contains(&h.mechanism()))
    }

    async fn apply_auth_response<W>(
        &mut self,
        handler: AuthHandler,
        response: AuthResponse,
        notices: &mut NoticeSender<'_, W>,
    ) -> Result<(), SessionError>
    where
        W: Sink<ServerMessage> + Unpin,
        W::Error: Display,
    {
        match response.status {
            AuthStatus::Succeeded => {
                notices.send_client_id_assigned(self.id).await;
                self.identity = handler.identity().cloned();
                self.state = SessionState::Ready;
                notices.send_auth_ok(response.data).await;

                info!(
                    connection_id = self.id,
                    user = self.identity.as_ref().map(|i| i.user.as_str()),
                    mechanism = %handler.mechanism(),
                    "authenticated"
                );
                Ok(())
            }
            AuthStatus::Failed | AuthStatus::Error => self.fail_auth(response, notices).await,
            AuthStatus::Ongoing => {
                self.auth = Some(handler);
                notices.send_auth_continue(response.data).await;
                Ok(())
            }
        }
    }

    async fn fail_auth<W>(
        &mut self,
        response: AuthResponse,
        notices: &mut NoticeSender<'_, W>,
    ) -> Result<(), SessionError>
    where
        W: Sink<ServerMessage> + Unpin,
        W::Error: Display,
    {
        let message = response.message();
        notices.send_init_error(response.error_code, &message).await;
        self.auth = None;
        Err(SessionError::AccessDenied(message))
    }

    async fn execute_statement<W>(
        &mut self,
        stmt: StmtExecute,
        notices: &mut NoticeSender<'_, W>,
    ) -> Result<(), SessionError>
    where
        W: Sink<ServerMessage> + Unpin,
        W::Error: Display,
    {
        let name = stmt.namespace.unwrap_or_default();
        let Some(namespace) = Namespace::parse(&name) else {
            notices
                .send_init_error(
                    error_code::X_INVALID_NAMESPACE,
                    &format!("Unknown namespace {name}"),
                )
                .await;
            return Err(SessionError::UnknownNamespace(name));
        };

        let text = match String::from_utf8(stmt.stmt) {
            Ok(text) => text,
            Err(e) => return Err(self.bad_message(notices, e).await),
        };

        if namespace != Namespace::Sql {
            // Admin commands are not served.
            debug!(connection_id = self.id, ?namespace, command = %text, "ignoring admin command");
            notices.send_stmt_execute_ok().await;
            return Ok(());
        }

        debug!(connection_id = self.id, statement = %text, "execute");
        let result = self.backend.execute(self.id, namespace, &text).await;
        self.last_statement = Some(text);

        match result {
            Ok(outcome) => {
                notices.send_rows_affected(outcome.rows_affected).await;
                if let Some(id) = outcome.last_insert_id {
                    notices.send_generated_insert_id(id).await;
                }
                notices.send_stmt_execute_ok().await;
                Ok(())
            }
            Err(BackendError::Statement {
                code,
                sql_state,
                message,
            }) => {
                notices.send_error(code, &sql_state, &message, false).await;
                Ok(())
            }
            Err(e) => {
                notices
                    .send_init_error(error_code::UNKNOWN_ERROR, &e.to_string())
                    .await;
                Err(e.into())
            }
        }
    }

    async fn on_session_reset(&mut self) {
        self.backend.reset_session(self.id).await;
        self.auth = None;
        self.identity = None;
        self.last_statement = None;
    }

    async fn bad_message<W>(
        &self,
        notices: &mut NoticeSender<'_, W>,
        cause: impl Display,
    ) -> SessionError
    where
        W: Sink<ServerMessage> + Unpin,
        W::Error: Display,
    {
        notices
            .send_init_error(error_code::X_BAD_MESSAGE, "Invalid message")
            .await;
        SessionError::BadMessage(cause.to_string())
    }
}

fn unexpected(frame: &Frame) -> String {
    match frame.message_type() {
        Ok(ty) => format!("unexpected message {ty:?}"),
        Err(_) => format!("unknown message type {}", frame.msg_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::mysql41::client_response;
    use crate::backend::{MemoryBackend, StatementOutcome};
    use crate::protocol::messages::{
        ErrorSeverity, NoticeFrame, SessionClose, SessionReset, SessionStateChanged,
        StateParameter,
    };
    use bytes::Bytes;
    use prost::Message;

    fn backend() -> Arc<MemoryBackend> {
        Arc::new(
            MemoryBackend::new()
                .with_user("root", "secret")
                .with_response(
                    "INSERT INTO t VALUES (1)",
                    Ok(StatementOutcome {
                        rows_affected: 1,
                        last_insert_id: Some(7),
                    }),
                )
                .with_response(
                    "SELECT nope",
                    Err(BackendError::statement(1054, "42S22", "Unknown column 'nope'")),
                )
                .with_response("COMMIT", Err(BackendError::ResultUndetermined("commit".into()))),
        )
    }

    fn new_session(backend: Arc<MemoryBackend>, mechanisms: &[Mechanism]) -> Session {
        Session::new(9, backend, Arc::from(mechanisms))
    }

    fn start(mechanism: &str, initial_response: Option<&[u8]>) -> Frame {
        Frame::from_message(&AuthenticateStart {
            mech_name: mechanism.to_string(),
            auth_data: None,
            initial_response: initial_response.map(<[u8]>::to_vec),
        })
    }

    fn cont(data: Vec<u8>) -> Frame {
        Frame::from_message(&AuthenticateContinue { auth_data: data })
    }

    fn execute(namespace: Option<&str>, stmt: &str) -> Frame {
        Frame::from_message(&StmtExecute {
            stmt: stmt.as_bytes().to_vec(),
            args: vec![],
            namespace: namespace.map(str::to_string),
            compact_metadata: None,
        })
    }

    fn raw(ty: ClientMessageType) -> Frame {
        Frame {
            msg_type: ty.as_u8(),
            payload: Bytes::new(),
        }
    }

    fn error_code_of(message: &ServerMessage) -> Option<(u32, Option<i32>)> {
        match message {
            ServerMessage::Error(e) => Some((e.code, e.severity)),
            _ => None,
        }
    }

    fn state_change(message: &ServerMessage) -> SessionStateChanged {
        let ServerMessage::Notice(NoticeFrame { payload, .. }) = message else {
            panic!("expected notice, got {message:?}");
        };
        SessionStateChanged::decode(payload.as_deref().unwrap()).unwrap()
    }

    /// Runs a MYSQL41 exchange for root and clears the output.
    async fn login(session: &mut Session, out: &mut Vec<ServerMessage>) {
        session
            .handle_message(&start("MYSQL41", None), out)
            .await
            .unwrap();
        let Some(ServerMessage::AuthenticateContinue(challenge)) = out.pop() else {
            panic!("expected challenge");
        };
        let data = client_response("test", "root", "secret", &challenge.auth_data);
        session.handle_message(&cont(data), out).await.unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        out.clear();
    }

    #[tokio::test]
    async fn test_mysql41_login() {
        let mut session = new_session(backend(), &[Mechanism::Mysql41]);
        let mut out = Vec::new();

        session
            .handle_message(&start("MYSQL41", None), &mut out)
            .await
            .unwrap();
        assert!(session.is_authenticating());
        assert_eq!(session.state(), SessionState::Authenticating);
        let Some(ServerMessage::AuthenticateContinue(challenge)) = out.pop() else {
            panic!("expected challenge");
        };
        assert_eq!(challenge.auth_data.len(), 20);

        let data = client_response("test", "root", "secret", &challenge.auth_data);
        session.handle_message(&cont(data), &mut out).await.unwrap();

        assert_eq!(session.state(), SessionState::Ready);
        assert!(!session.is_authenticating());
        assert_eq!(out.len(), 2);
        let change = state_change(&out[0]);
        assert_eq!(change.param, StateParameter::ClientIdAssigned as i32);
        assert_eq!(change.value.and_then(|v| v.as_uint()), Some(9));
        assert!(matches!(out[1], ServerMessage::AuthenticateOk(_)));

        let identity = session.identity().unwrap();
        assert_eq!(identity.user, "root");
        assert_eq!(identity.schema.as_deref(), Some("test"));
    }

    #[tokio::test]
    async fn test_wrong_password_never_ready() {
        let mut session = new_session(backend(), &[Mechanism::Mysql41]);
        let mut out = Vec::new();

        session
            .handle_message(&start("MYSQL41", None), &mut out)
            .await
            .unwrap();
        let Some(ServerMessage::AuthenticateContinue(challenge)) = out.pop() else {
            panic!("expected challenge");
        };
        let data = client_response("", "root", "wrong", &challenge.auth_data);
        let err = session.handle_message(&cont(data), &mut out).await.unwrap_err();

        assert!(matches!(err, SessionError::AccessDenied(_)));
        assert_ne!(session.state(), SessionState::Ready);
        assert!(!session.is_authenticating());
        assert_eq!(
            error_code_of(&out[0]),
            Some((1045, Some(ErrorSeverity::Fatal as i32)))
        );
    }

    #[tokio::test]
    async fn test_plain_login() {
        let mut session = new_session(backend(), &[Mechanism::Mysql41, Mechanism::Plain]);
        let mut out = Vec::new();

        session
            .handle_message(&start("PLAIN", Some(b"\0root\0secret")), &mut out)
            .await
            .unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_mechanism() {
        let mut session = new_session(backend(), &[Mechanism::Mysql41]);
        let mut out = Vec::new();

        let err = session
            .handle_message(&start("UNKNOWN", None), &mut out)
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::UnsupportedAuthMode("UNKNOWN".into()));
        assert_eq!(error_code_of(&out[0]).map(|(c, _)| c), Some(1251));
        assert!(!session.is_authenticating());
        assert_eq!(session.state(), SessionState::Authenticating);
    }

    #[tokio::test]
    async fn test_disabled_mechanism() {
        let mut session = new_session(backend(), &[Mechanism::Mysql41]);
        let mut out = Vec::new();

        let err = session
            .handle_message(&start("PLAIN", Some(b"\0root\0secret")), &mut out)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::UnsupportedAuthMode(_)));
    }

    #[tokio::test]
    async fn test_continue_without_start() {
        let mut session = new_session(backend(), &[Mechanism::Mysql41]);
        let mut out = Vec::new();

        let err = session
            .handle_message(&cont(b"\0root\0".to_vec()), &mut out)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::AccessDenied(_)));
        assert_eq!(error_code_of(&out[0]).map(|(c, _)| c), Some(1156));
        assert_ne!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_second_start_is_out_of_order() {
        let mut session = new_session(backend(), &[Mechanism::Mysql41]);
        let mut out = Vec::new();

        session
            .handle_message(&start("MYSQL41", None), &mut out)
            .await
            .unwrap();
        out.clear();

        let err = session
            .handle_message(&start("MYSQL41", None), &mut out)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::AccessDenied(_)));
        assert_eq!(out.len(), 1);
        assert_eq!(error_code_of(&out[0]).map(|(c, _)| c), Some(1156));
        assert!(!session.is_authenticating());
    }

    #[tokio::test]
    async fn test_malformed_auth_payload() {
        let mut session = new_session(backend(), &[Mechanism::Mysql41]);
        let mut out = Vec::new();
        let frame = Frame {
            msg_type: ClientMessageType::AuthenticateStart.as_u8(),
            payload: Bytes::from_static(&[0x0a, 0x05]),
        };

        let err = session.handle_message(&frame, &mut out).await.unwrap_err();
        assert!(matches!(err, SessionError::BadMessage(_)));
        assert_eq!(error_code_of(&out[0]).map(|(c, _)| c), Some(5000));
    }

    #[tokio::test]
    async fn test_malformed_continue_drops_exchange() {
        let mut session = new_session(backend(), &[Mechanism::Mysql41]);
        let mut out = Vec::new();

        session
            .handle_message(&start("MYSQL41", None), &mut out)
            .await
            .unwrap();
        let Some(ServerMessage::AuthenticateContinue(challenge)) = out.pop() else {
            panic!("expected challenge");
        };
        assert!(session.is_authenticating());

        let frame = Frame {
            msg_type: ClientMessageType::AuthenticateContinue.as_u8(),
            payload: Bytes::from_static(&[0x0a, 0x05]),
        };
        let err = session.handle_message(&frame, &mut out).await.unwrap_err();
        assert!(matches!(err, SessionError::BadMessage(_)));
        assert_eq!(error_code_of(&out[0]).map(|(c, _)| c), Some(5000));
        assert!(!session.is_authenticating());
        out.clear();

        // The old challenge no longer has an exchange to answer.
        let data = client_response("", "root", "secret", &challenge.auth_data);
        let err = session.handle_message(&cont(data), &mut out).await.unwrap_err();
        assert!(matches!(err, SessionError::AccessDenied(_)));
        assert_eq!(error_code_of(&out[0]).map(|(c, _)| c), Some(1156));
        assert_ne!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_malformed_start_drops_exchange() {
        let mut session = new_session(backend(), &[Mechanism::Mysql41]);
        let mut out = Vec::new();

        session
            .handle_message(&start("MYSQL41", None), &mut out)
            .await
            .unwrap();
        out.clear();

        let frame = Frame {
            msg_type: ClientMessageType::AuthenticateStart.as_u8(),
            payload: Bytes::from_static(&[0x0a, 0x05]),
        };
        let err = session.handle_message(&frame, &mut out).await.unwrap_err();
        assert!(matches!(err, SessionError::BadMessage(_)));
        assert!(!session.is_authenticating());
    }

    #[tokio::test]
    async fn test_wrong_message_while_authenticating() {
        let mut session = new_session(backend(), &[Mechanism::Mysql41]);
        let mut out = Vec::new();

        session
            .handle_message(&start("MYSQL41", None), &mut out)
            .await
            .unwrap();
        out.clear();

        let err = session
            .handle_message(&execute(None, "SELECT 1"), &mut out)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::BadMessage(_)));
        assert!(!session.is_authenticating());
        assert_eq!(error_code_of(&out[0]).map(|(c, _)| c), Some(5000));
    }

    #[tokio::test]
    async fn test_sql_execute() {
        let backend = backend();
        let mut session = new_session(backend.clone(), &[Mechanism::Mysql41]);
        let mut out = Vec::new();
        login(&mut session, &mut out).await;

        session
            .handle_message(&execute(Some("sql"), "INSERT INTO t VALUES (1)"), &mut out)
            .await
            .unwrap();

        assert_eq!(out.len(), 3);
        let rows = state_change(&out[0]);
        assert_eq!(rows.param, StateParameter::RowsAffected as i32);
        assert_eq!(rows.value.and_then(|v| v.as_uint()), Some(1));
        let id = state_change(&out[1]);
        assert_eq!(id.param, StateParameter::GeneratedInsertId as i32);
        assert_eq!(id.value.and_then(|v| v.as_uint()), Some(7));
        assert_eq!(out[2], ServerMessage::SqlStmtExecuteOk);

        assert_eq!(session.last_statement(), Some("INSERT INTO t VALUES (1)"));
        assert_eq!(backend.statements(9), vec!["INSERT INTO t VALUES (1)"]);
    }

    #[tokio::test]
    async fn test_statement_error_keeps_session() {
        let mut session = new_session(backend(), &[Mechanism::Mysql41]);
        let mut out = Vec::new();
        login(&mut session, &mut out).await;

        session
            .handle_message(&execute(None, "SELECT nope"), &mut out)
            .await
            .unwrap();
        assert_eq!(
            error_code_of(&out[0]),
            Some((1054, Some(ErrorSeverity::Error as i32)))
        );
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_undetermined_result_is_fatal() {
        let mut session = new_session(backend(), &[Mechanism::Mysql41]);
        let mut out = Vec::new();
        login(&mut session, &mut out).await;

        let err = session
            .handle_message(&execute(None, "COMMIT"), &mut out)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::Backend(BackendError::ResultUndetermined("commit".into()))
        );
        assert_eq!(
            error_code_of(&out[0]),
            Some((1105, Some(ErrorSeverity::Fatal as i32)))
        );
        assert_eq!(session.last_statement(), Some("COMMIT"));
    }

    #[tokio::test]
    async fn test_unknown_namespace() {
        let backend = backend();
        let mut session = new_session(backend.clone(), &[Mechanism::Mysql41]);
        let mut out = Vec::new();
        login(&mut session, &mut out).await;

        let err = session
            .handle_message(&execute(Some("unknown"), "SELECT 1"), &mut out)
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::UnknownNamespace("unknown".into()));
        assert_eq!(error_code_of(&out[0]).map(|(c, _)| c), Some(5162));
        assert!(backend.statements(9).is_empty());
    }

    #[tokio::test]
    async fn test_admin_namespace_is_noop() {
        let backend = backend();
        let mut session = new_session(backend.clone(), &[Mechanism::Mysql41]);
        let mut out = Vec::new();
        login(&mut session, &mut out).await;

        for ns in ["xplugin", "mysqlx"] {
            session
                .handle_message(&execute(Some(ns), "ping"), &mut out)
                .await
                .unwrap();
        }
        assert_eq!(out, vec![ServerMessage::SqlStmtExecuteOk; 2]);
        assert!(backend.statements(9).is_empty());
    }

    #[tokio::test]
    async fn test_reserved_message_rejected() {
        let mut session = new_session(backend(), &[Mechanism::Mysql41]);
        let mut out = Vec::new();
        login(&mut session, &mut out).await;

        let err = session
            .handle_message(&raw(ClientMessageType::CrudFind), &mut out)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::BadMessage(_)));

        let unknown = Frame {
            msg_type: 99,
            payload: Bytes::new(),
        };
        let err = session.handle_message(&unknown, &mut out).await.unwrap_err();
        assert_eq!(err, SessionError::BadMessage("unknown message type 99".into()));
    }

    #[tokio::test]
    async fn test_close_says_bye() {
        let mut session = new_session(backend(), &[Mechanism::Mysql41]);
        let mut out = Vec::new();
        login(&mut session, &mut out).await;

        session
            .handle_message(&Frame::from_message(&SessionClose {}), &mut out)
            .await
            .unwrap();
        assert_eq!(out, vec![ServerMessage::ok("bye!")]);
        assert_eq!(session.state(), SessionState::Closing);
        assert_eq!(session.state_before_close(), SessionState::Authenticating);

        let err = session
            .handle_message(&execute(None, "SELECT 1"), &mut out)
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::Closing);
    }

    #[tokio::test]
    async fn test_malformed_close_rejected() {
        let mut session = new_session(backend(), &[Mechanism::Mysql41]);
        let mut out = Vec::new();
        login(&mut session, &mut out).await;

        for ty in [ClientMessageType::SessionClose, ClientMessageType::ConnectionClose] {
            let frame = Frame {
                msg_type: ty.as_u8(),
                payload: Bytes::from_static(&[0x0a, 0x05]),
            };
            let err = session.handle_message(&frame, &mut out).await.unwrap_err();
            assert!(matches!(err, SessionError::BadMessage(_)));
            assert_eq!(error_code_of(&out[0]).map(|(c, _)| c), Some(5000));
            assert_eq!(session.state(), SessionState::Ready);
            out.clear();
        }

        session
            .handle_message(&raw(ClientMessageType::ConnectionClose), &mut out)
            .await
            .unwrap();
        assert_eq!(out, vec![ServerMessage::ok("bye!")]);
    }

    #[tokio::test]
    async fn test_reset_clears_session_state() {
        let backend = backend();
        let mut session = new_session(backend.clone(), &[Mechanism::Mysql41]);
        let mut out = Vec::new();
        login(&mut session, &mut out).await;

        session
            .handle_message(&execute(None, "SELECT 1"), &mut out)
            .await
            .unwrap();
        session
            .handle_message(&Frame::from_message(&SessionReset {}), &mut out)
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::Closing);
        assert!(session.identity().is_none());
        assert!(session.last_statement().is_none());
        assert!(backend.statements(9).is_empty());

        // A second reset does not touch the preserved state.
        let before = session.state_before_close();
        let err = session
            .handle_message(&Frame::from_message(&SessionReset {}), &mut out)
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::Closing);
        assert_eq!(session.state_before_close(), before);
    }

    #[tokio::test]
    async fn test_close_with_preservation() {
        let mut session = new_session(backend(), &[Mechanism::Mysql41]);
        let mut out = Vec::new();
        login(&mut session, &mut out).await;

        session.on_close(true);
        assert_eq!(session.state(), SessionState::Closing);
        assert_eq!(session.state_before_close(), SessionState::Ready);

        // Already closing: nothing is overwritten.
        session.on_close(true);
        assert_eq!(session.state_before_close(), SessionState::Ready);
    }
}
