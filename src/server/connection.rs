mod error;
mod state;

pub use error::ConnectionError;
pub use state::ConnectionState;

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backend::BackendError;
use crate::protocol::{Frame, XCodec};
use crate::server::context::ServerContext;
use crate::server::handshake::{Handshake, HandshakeResult};
use crate::session::{NoticeSender, Session, SessionState};

/// A single client connection.
///
/// Runs capability negotiation, then authentication, then dispatches frames
/// to the [`Session`] until it closes. Cancellation is cooperative: `killed`
/// is checked once per frame, never raced against a read.
pub struct Connection<T> {
    framed: Framed<T, XCodec>,
    state: ConnectionState,
    context: Arc<ServerContext>,
    killed: CancellationToken,
}

impl<T> Connection<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(
        io: T,
        id: u32,
        peer: Option<SocketAddr>,
        context: Arc<ServerContext>,
        killed: CancellationToken,
    ) -> Self {
        let codec = XCodec::with_max_message_size(context.max_message_size);
        Self {
            framed: Framed::new(io, codec),
            state: ConnectionState::new(id, peer),
            context,
            killed,
        }
    }

    pub async fn run(mut self) -> Result<(), ConnectionError> {
        let id = self.state.id;

        let negotiated = Handshake::new(
            &mut self.framed,
            &self.context.capabilities,
            &self.killed,
            id,
        )
        .run()
        .await;
        let start = match negotiated {
            Ok(HandshakeResult::Authenticate {
                start,
                capabilities,
            }) => {
                self.state.capabilities = capabilities;
                start
            }
            Ok(HandshakeResult::Closed) => {
                debug!(
                    connection_id = id,
                    killed = self.killed.is_cancelled(),
                    "closed during negotiation"
                );
                return Ok(());
            }
            Err(e) => return Err(self.fail(e, None).await),
        };

        let mut session = Session::new(
            id,
            self.context.backend.clone(),
            self.context.mechanisms.clone(),
        );

        if let Err(e) = self.authenticate(&mut session, start).await {
            return Err(self.fail(e, Some(&mut session)).await);
        }
        if session.state() != SessionState::Ready {
            return Ok(());
        }
        self.state.record_identity(session.identity());
        debug!(
            connection_id = id,
            peer = ?self.state.peer,
            user = self.state.user.as_deref(),
            schema = self.state.schema.as_deref(),
            capabilities = ?self.state.capabilities,
            "session ready"
        );

        if let Err(e) = self.dispatch_loop(&mut session).await {
            return Err(self.fail(e, Some(&mut session)).await);
        }
        Ok(())
    }

    /// Feeds authentication frames to the session until it is ready.
    async fn authenticate(
        &mut self,
        session: &mut Session,
        start: Frame,
    ) -> Result<(), ConnectionError> {
        let mut frame = start;
        loop {
            session
                .handle_auth_message(&frame, &mut self.framed)
                .await?;
            if session.state() == SessionState::Ready {
                return Ok(());
            }

            if self.killed.is_cancelled() {
                info!(connection_id = self.state.id, "killed during authentication");
                session.on_close(true);
                return Ok(());
            }
            frame = match self.framed.next().await {
                Some(frame) => frame?,
                None => {
                    debug!(connection_id = self.state.id, "client disconnected");
                    session.on_close(true);
                    return Ok(());
                }
            };
        }
    }

    async fn dispatch_loop(&mut self, session: &mut Session) -> Result<(), ConnectionError> {
        while session.state() != SessionState::Closing {
            if self.killed.is_cancelled() {
                info!(connection_id = self.state.id, "connection killed");
                session.on_close(true);
                break;
            }

            let frame = match self.framed.next().await {
                Some(frame) => frame?,
                None => {
                    debug!(connection_id = self.state.id, "client disconnected");
                    session.on_close(true);
                    break;
                }
            };

            session.handle_message(&frame, &mut self.framed).await?;
        }
        Ok(())
    }

    /// Logs `err` by kind, tells the client if nobody has yet, and marks the
    /// session closed.
    async fn fail(&mut self, err: ConnectionError, session: Option<&mut Session>) -> ConnectionError {
        let id = self.state.id;
        let last_statement = session
            .as_deref()
            .and_then(Session::last_statement)
            .unwrap_or_default()
            .to_string();

        match err.backend_error() {
            Some(BackendError::ResultUndetermined(_)) => {
                error!(
                    connection_id = id,
                    last_statement = %last_statement,
                    error = %err,
                    "result undetermined, closing connection"
                );
            }
            Some(BackendError::Critical(_)) => {
                error!(
                    connection_id = id,
                    last_statement = %last_statement,
                    error = %err,
                    "critical error, closing connection"
                );
                if !self.context.request_stop() {
                    debug!(connection_id = id, "listener stop already requested");
                }
            }
            _ => {
                warn!(
                    connection_id = id,
                    last_statement = %last_statement,
                    error = %err,
                    "closing connection after error"
                );
            }
        }

        if let Some(session) = session {
            session.on_close(true);
        }

        if !err.peer_notified() && !err.is_transport() {
            NoticeSender::new(&mut self.framed, id)
                .send_init_error(err.code(), &err.to_string())
                .await;
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::mysql41::client_response;
    use crate::backend::{MemoryBackend, StatementOutcome};
    use crate::protocol::ServerMessage;
    use crate::protocol::messages::{
        AuthenticateContinue, AuthenticateStart, CapabilitiesGet, SessionClose, StmtExecute,
    };
    use crate::server::context::ServerOptions;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio::task::JoinHandle;

    struct Harness {
        client: DuplexStream,
        stop_rx: tokio::sync::mpsc::Receiver<()>,
        killed: CancellationToken,
        task: JoinHandle<Result<(), ConnectionError>>,
    }

    fn spawn(backend: MemoryBackend) -> Harness {
        let (context, stop_rx) = ServerContext::new(Arc::new(backend), &ServerOptions::default());
        let context = Arc::new(context);
        let killed = CancellationToken::new();
        let (server, client) = tokio::io::duplex(64 * 1024);
        let connection = Connection::new(server, 1, None, context.clone(), killed.clone());
        Harness {
            client,
            stop_rx,
            killed,
            task: tokio::spawn(connection.run()),
        }
    }

    impl Harness {
        async fn send(&mut self, frame: Frame) {
            self.client.write_all(&frame.to_bytes()).await.unwrap();
        }

        async fn recv(&mut self) -> ServerMessage {
            let len = self.client.read_u32_le().await.unwrap() as usize;
            let mut body = vec![0u8; len];
            self.client.read_exact(&mut body).await.unwrap();
            ServerMessage::decode(body[0], &body[1..]).unwrap()
        }

        /// Negotiates and logs in as root; discards the login responses.
        async fn login(&mut self) {
            self.send(Frame::from_message(&CapabilitiesGet {})).await;
            self.send(Frame::from_message(&AuthenticateStart {
                mech_name: "MYSQL41".into(),
                auth_data: None,
                initial_response: None,
            }))
            .await;
            assert!(matches!(self.recv().await, ServerMessage::Capabilities(_)));
            let ServerMessage::AuthenticateContinue(challenge) = self.recv().await else {
                panic!("expected challenge");
            };
            let data = client_response("", "root", "secret", &challenge.auth_data);
            self.send(Frame::from_message(&AuthenticateContinue { auth_data: data }))
                .await;
            assert!(matches!(self.recv().await, ServerMessage::Notice(_)));
            assert!(matches!(self.recv().await, ServerMessage::AuthenticateOk(_)));
        }

        async fn execute(&mut self, stmt: &str) {
            self.send(Frame::from_message(&StmtExecute {
                stmt: stmt.as_bytes().to_vec(),
                args: vec![],
                namespace: None,
                compact_metadata: None,
            }))
            .await;
        }
    }

    fn backend() -> MemoryBackend {
        MemoryBackend::new()
            .with_user("root", "secret")
            .with_response("CRASH", Err(BackendError::Critical("disk failure".into())))
            .with_response("COMMIT", Err(BackendError::ResultUndetermined("commit".into())))
            .with_response(
                "UPDATE t SET a = 1",
                Ok(StatementOutcome {
                    rows_affected: 2,
                    last_insert_id: None,
                }),
            )
    }

    #[tokio::test]
    async fn test_login_execute_close() {
        let mut h = spawn(backend());
        h.login().await;

        h.execute("UPDATE t SET a = 1").await;
        assert!(matches!(h.recv().await, ServerMessage::Notice(_)));
        assert_eq!(h.recv().await, ServerMessage::SqlStmtExecuteOk);

        h.send(Frame::from_message(&SessionClose {})).await;
        assert_eq!(h.recv().await, ServerMessage::ok("bye!"));

        h.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_critical_error_requests_stop() {
        let mut h = spawn(backend());
        h.login().await;

        h.execute("CRASH").await;
        let ServerMessage::Error(e) = h.recv().await else {
            panic!("expected error");
        };
        assert_eq!(e.code, 1105);

        let err = h.task.await.unwrap().unwrap_err();
        assert!(matches!(
            err.backend_error(),
            Some(BackendError::Critical(_))
        ));
        assert_eq!(h.stop_rx.try_recv(), Ok(()));
    }

    #[tokio::test]
    async fn test_undetermined_result_closes_without_stop() {
        let mut h = spawn(backend());
        h.login().await;

        h.execute("COMMIT").await;
        let ServerMessage::Error(e) = h.recv().await else {
            panic!("expected error");
        };
        assert_eq!(e.code, 1105);

        let err = h.task.await.unwrap().unwrap_err();
        assert!(matches!(
            err.backend_error(),
            Some(BackendError::ResultUndetermined(_))
        ));
        // Only critical errors stop the listener.
        assert!(h.stop_rx.try_recv().is_err());

        let mut rest = Vec::new();
        h.client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_killed_during_authentication() {
        let mut h = spawn(backend());

        h.send(Frame::from_message(&CapabilitiesGet {})).await;
        assert!(matches!(h.recv().await, ServerMessage::Capabilities(_)));

        h.killed.cancel();
        // Already waiting for the next frame; the start is still answered.
        h.send(Frame::from_message(&AuthenticateStart {
            mech_name: "MYSQL41".into(),
            auth_data: None,
            initial_response: None,
        }))
        .await;
        assert!(matches!(h.recv().await, ServerMessage::AuthenticateContinue(_)));

        h.task.await.unwrap().unwrap();
        let mut rest = Vec::new();
        h.client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_killed_before_negotiation() {
        let mut h = spawn(backend());
        h.killed.cancel();

        h.send(Frame::from_message(&CapabilitiesGet {})).await;
        h.task.await.unwrap().unwrap();

        let mut rest = Vec::new();
        h.client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_killed_connection_leaves_loop() {
        let mut h = spawn(backend());
        h.login().await;

        h.killed.cancel();
        // The flag is seen once the current read completes.
        h.execute("UPDATE t SET a = 1").await;
        assert!(matches!(h.recv().await, ServerMessage::Notice(_)));
        assert_eq!(h.recv().await, ServerMessage::SqlStmtExecuteOk);

        h.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_oversized_frame_reported() {
        let mut h = spawn(backend());
        h.login().await;

        // Declares a frame larger than the default limit.
        h.client
            .write_all(&(64u32 * 1024 * 1024).to_le_bytes())
            .await
            .unwrap();
        let ServerMessage::Error(e) = h.recv().await else {
            panic!("expected error");
        };
        assert_eq!(e.code, 1153);
        assert!(h.task.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_eof_after_login_is_clean() {
        let mut h = spawn(backend());
        h.login().await;
        drop(h.client);
        h.task.await.unwrap().unwrap();
    }
}
