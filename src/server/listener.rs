use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{FutureExt, SinkExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backend::QueryBackend;
use crate::protocol::{ServerMessage, XCodec, error_code};
use crate::server::connection::Connection;
use crate::server::context::{ServerContext, ServerOptions};

/// Pause after a failed `accept`, so that e.g. EMFILE does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// TCP server speaking the X Protocol.
pub struct Server {
    listener: TcpListener,
    next_id: u32,
    context: Arc<ServerContext>,
    stop_rx: mpsc::Receiver<()>,
    connection_limit: Option<Arc<Semaphore>>,
}

impl Server {
    /// Creates a new server with a given listener and backend.
    pub fn new(listener: TcpListener, backend: Arc<dyn QueryBackend>, options: ServerOptions) -> Self {
        let (context, stop_rx) = ServerContext::new(backend, &options);
        let connection_limit =
            (options.max_connections > 0).then(|| Arc::new(Semaphore::new(options.max_connections)));
        Self {
            listener,
            next_id: 1,
            context: Arc::new(context),
            stop_rx,
            connection_limit,
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared state: connection registry, counters and the backend.
    pub fn context(&self) -> Arc<ServerContext> {
        self.context.clone()
    }

    /// Accepts connections until a connection reports a critical error.
    pub async fn serve(self) {
        self.serve_with_shutdown(std::future::pending()).await;
    }

    /// Accepts connections until `shutdown` resolves or a connection reports
    /// a critical error. Live connections are flagged as killed on the way
    /// out and finish their current message.
    pub async fn serve_with_shutdown(mut self, shutdown: impl Future<Output = ()>) {
        let mut shutdown = std::pin::pin!(shutdown);
        info!(addr = ?self.listener.local_addr().ok(), "listening");

        loop {
            let (socket, peer) = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                },
                Some(()) = self.stop_rx.recv() => {
                    error!("critical error reported, no longer accepting connections");
                    break;
                }
                () = &mut shutdown => {
                    info!("shutting down");
                    break;
                }
            };

            let permit = match self.acquire_slot() {
                Ok(permit) => permit,
                Err(()) => {
                    self.context.stats.connection_rejected();
                    warn!(%peer, "too many connections, rejecting");
                    tokio::spawn(reject(socket));
                    continue;
                }
            };

            // Ids still held by a live connection are skipped after wraparound.
            let (id, killed) = self
                .context
                .registry
                .register(self.next_id, self.context.backend.clone());
            self.next_id = id.wrapping_add(1).max(1);
            self.context.stats.connection_opened();
            tokio::spawn(handle_connection(
                socket,
                peer,
                id,
                killed,
                self.context.clone(),
                permit,
            ));
        }

        self.context.registry.cancel_all();
    }

    fn acquire_slot(&self) -> Result<Option<OwnedSemaphorePermit>, ()> {
        match &self.connection_limit {
            Some(limit) => limit.clone().try_acquire_owned().map(Some).map_err(|_| ()),
            None => Ok(None),
        }
    }
}

async fn handle_connection(
    socket: TcpStream,
    peer: SocketAddr,
    id: u32,
    killed: CancellationToken,
    context: Arc<ServerContext>,
    permit: Option<OwnedSemaphorePermit>,
) {
    if let Err(e) = socket.set_nodelay(true) {
        debug!(connection_id = id, error = %e, "failed to set TCP_NODELAY");
    }

    info!(connection_id = id, %peer, "accepted connection");

    let connection = Connection::new(socket, id, Some(peer), context.clone(), killed);
    match AssertUnwindSafe(connection.run()).catch_unwind().await {
        Ok(Ok(())) => {}
        // Already logged by the connection.
        Ok(Err(e)) => debug!(connection_id = id, error = %e, "connection ended with error"),
        Err(_) => error!(connection_id = id, "unexpected internal error"),
    }

    drop(permit);
    context.stats.connection_closed();
    context.registry.unregister(id);
    info!(connection_id = id, "connection closed");
}

/// Tells a client over the limit why it is being dropped.
async fn reject(socket: TcpStream) {
    let mut framed = Framed::new(socket, XCodec::new());
    let message = ServerMessage::error(error_code::CON_COUNT_ERROR, "Too many connections", true);
    if let Err(e) = framed.send(message).await {
        debug!(error = %e, "failed to notify rejected client");
    }
}
