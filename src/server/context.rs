use std::sync::Arc;

use tokio::sync::mpsc;

use crate::auth::Mechanism;
use crate::backend::QueryBackend;
use crate::capability::CapabilityRegistry;
use crate::protocol::DEFAULT_MAX_MESSAGE_SIZE;
use crate::server::registry::ConnectionRegistry;
use crate::server::stats::ServerStats;

/// Tunables for a [`Server`](crate::server::Server).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    /// Mechanisms offered and accepted, in advertised order.
    pub mechanisms: Vec<Mechanism>,
    /// Concurrent connection limit; 0 means unlimited.
    pub max_connections: usize,
    pub max_message_size: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            mechanisms: vec![Mechanism::Mysql41],
            max_connections: 0,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

/// State shared by the listener and every connection task.
pub struct ServerContext {
    pub capabilities: CapabilityRegistry,
    pub backend: Arc<dyn QueryBackend>,
    pub mechanisms: Arc<[Mechanism]>,
    pub max_message_size: usize,
    pub registry: ConnectionRegistry,
    pub stats: ServerStats,
    stop_tx: mpsc::Sender<()>,
}

impl ServerContext {
    /// Builds the shared state and the receiving end of the stop signal.
    pub fn new(
        backend: Arc<dyn QueryBackend>,
        options: &ServerOptions,
    ) -> (Self, mpsc::Receiver<()>) {
        let (stop_tx, stop_rx) = mpsc::channel(1);
        let context = Self {
            capabilities: CapabilityRegistry::server_defaults(&options.mechanisms),
            backend,
            mechanisms: Arc::from(options.mechanisms.as_slice()),
            max_message_size: options.max_message_size,
            registry: ConnectionRegistry::new(),
            stats: ServerStats::new(),
            stop_tx,
        };
        (context, stop_rx)
    }

    /// Asks the listener to stop accepting connections. Never blocks: if a
    /// request is already pending this one is dropped and false is returned.
    pub fn request_stop(&self) -> bool {
        self.stop_tx.try_send(()).is_ok()
    }
}
