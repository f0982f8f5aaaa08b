use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::capability::{CapabilityRegistry, CapabilityValue};
use crate::protocol::messages::{CapabilitiesGet, CapabilitiesSet, ConnectionClose};
use crate::protocol::{ClientMessageType, Frame, ServerMessage, XCodec, error_code};
use crate::server::connection::ConnectionError;
use crate::session::NoticeSender;

/// Number of `CapabilitiesSet` messages a client may send: a proposal and a
/// confirmation.
const MAX_CAPABILITY_SETS: u8 = 2;

pub enum HandshakeResult {
    /// Negotiation is over; carries the client's first `AuthenticateStart`.
    Authenticate {
        start: Frame,
        capabilities: Vec<(String, CapabilityValue)>,
    },
    /// The client disconnected, sent `Connection.Close`, or the connection
    /// was killed.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingGet,
    Negotiating { sets: u8 },
}

/// Capability negotiation, the fixed-order first phase of a connection.
///
/// ```text
/// CapabilitiesGet        -> Capabilities
/// CapabilitiesSet (0..2) -> Ok | Error (fatal)
/// AuthenticateStart      -> handed to the session
/// ```
///
/// Anything else ends the connection. `killed` is checked before each read.
pub struct Handshake<'a, T> {
    framed: &'a mut Framed<T, XCodec>,
    capabilities: &'a CapabilityRegistry,
    killed: &'a CancellationToken,
    connection_id: u32,
}

impl<'a, T> Handshake<'a, T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        framed: &'a mut Framed<T, XCodec>,
        capabilities: &'a CapabilityRegistry,
        killed: &'a CancellationToken,
        connection_id: u32,
    ) -> Self {
        Self {
            framed,
            capabilities,
            killed,
            connection_id,
        }
    }

    pub async fn run(mut self) -> Result<HandshakeResult, ConnectionError> {
        let mut phase = Phase::AwaitingGet;
        let mut accepted = Vec::new();

        loop {
            if self.killed.is_cancelled() {
                info!(connection_id = self.connection_id, "killed during negotiation");
                return Ok(HandshakeResult::Closed);
            }
            let frame = match self.framed.next().await {
                Some(frame) => frame?,
                None => return Ok(HandshakeResult::Closed),
            };

            match (phase, frame.message_type()) {
                (_, Ok(ClientMessageType::ConnectionClose)) => {
                    if let Err(e) = frame.decode::<ConnectionClose>() {
                        return Err(self.reject(e.to_string()).await);
                    }
                    self.framed.send(ServerMessage::ok("bye!")).await?;
                    return Ok(HandshakeResult::Closed);
                }
                (Phase::AwaitingGet, Ok(ClientMessageType::CapabilitiesGet)) => {
                    if let Err(e) = frame.decode::<CapabilitiesGet>() {
                        return Err(self.reject(e.to_string()).await);
                    }
                    debug!(connection_id = self.connection_id, "capabilities requested");
                    self.framed
                        .send(ServerMessage::Capabilities(self.capabilities.snapshot()))
                        .await?;
                    phase = Phase::Negotiating { sets: 0 };
                }
                (Phase::Negotiating { sets }, Ok(ClientMessageType::CapabilitiesSet))
                    if sets < MAX_CAPABILITY_SETS =>
                {
                    let request = match frame.decode::<CapabilitiesSet>() {
                        Ok(request) => request,
                        Err(e) => return Err(self.reject(e.to_string()).await),
                    };

                    match self.capabilities.negotiate(&request) {
                        Ok(pairs) => {
                            debug!(
                                connection_id = self.connection_id,
                                accepted = pairs.len(),
                                "capabilities set"
                            );
                            accepted.extend(pairs);
                            self.framed.send(ServerMessage::ok("")).await?;
                            phase = Phase::Negotiating { sets: sets + 1 };
                        }
                        Err(e) => {
                            NoticeSender::new(&mut *self.framed, self.connection_id)
                                .send_init_error(e.code(), &e.to_string())
                                .await;
                            return Err(e.into());
                        }
                    }
                }
                (Phase::Negotiating { .. }, Ok(ClientMessageType::AuthenticateStart)) => {
                    return Ok(HandshakeResult::Authenticate {
                        start: frame,
                        capabilities: accepted,
                    });
                }
                (_, Ok(ty)) => return Err(self.reject(format!("{ty:?}")).await),
                (_, Err(e)) => return Err(self.reject(e.to_string()).await),
            }
        }
    }

    async fn reject(&mut self, what: String) -> ConnectionError {
        NoticeSender::new(&mut *self.framed, self.connection_id)
            .send_init_error(error_code::X_BAD_MESSAGE, "Invalid message")
            .await;
        ConnectionError::Handshake(what)
    }
}
