use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::backend::QueryBackend;

/// Live connections, by connection id.
///
/// The lock is held only to insert, remove, count or look up; never across
/// I/O.
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<u32, CancelHandle>>,
}

struct CancelHandle {
    killed: CancellationToken,
    backend: Arc<dyn QueryBackend>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a new connection under the first free id at or after
    /// `from`, wrapping past `u32::MAX` and never using 0. Returns the id and
    /// the connection's `killed` flag.
    pub fn register(
        &self,
        from: u32,
        backend: Arc<dyn QueryBackend>,
    ) -> (u32, CancellationToken) {
        let mut conns = self.connections.lock();
        let mut id = from.max(1);
        while conns.contains_key(&id) {
            id = id.wrapping_add(1).max(1);
        }

        let killed = CancellationToken::new();
        conns.insert(
            id,
            CancelHandle {
                killed: killed.clone(),
                backend,
            },
        );
        (id, killed)
    }

    /// Unregisters a connection when it terminates.
    pub fn unregister(&self, id: u32) {
        self.connections.lock().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancels connection `id`.
    ///
    /// With `kill_query_only` only the in-flight statement is asked to stop;
    /// otherwise the connection is flagged and leaves its read loop at the
    /// next iteration. Returns false when no such connection exists.
    pub fn cancel(&self, id: u32, kill_query_only: bool) -> bool {
        let (killed, backend) = {
            let conns = self.connections.lock();
            let Some(handle) = conns.get(&id) else {
                return false;
            };
            (handle.killed.clone(), handle.backend.clone())
        };

        if kill_query_only {
            backend.cancel_query(id);
        } else {
            killed.cancel();
        }
        true
    }

    /// Flags every live connection, e.g. on shutdown.
    pub fn cancel_all(&self) {
        for handle in self.connections.lock().values() {
            handle.killed.cancel();
        }
    }
}
