use std::net::SocketAddr;

use crate::auth::Identity;
use crate::capability::CapabilityValue;

/// Attributes of one client connection.
///
/// Owned by the connection task alone; nothing here is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    pub id: u32,
    pub peer: Option<SocketAddr>,
    /// Capability values accepted during negotiation.
    pub capabilities: Vec<(String, CapabilityValue)>,
    pub user: Option<String>,
    pub schema: Option<String>,
}

impl ConnectionState {
    pub fn new(id: u32, peer: Option<SocketAddr>) -> Self {
        Self {
            id,
            peer,
            capabilities: Vec::new(),
            user: None,
            schema: None,
        }
    }

    /// Records who authenticated on this connection.
    pub fn record_identity(&mut self, identity: Option<&Identity>) {
        self.user = identity.map(|i| i.user.clone());
        self.schema = identity.and_then(|i| i.schema.clone());
    }
}
