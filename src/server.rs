//! TCP server for X Protocol connections.
//!
//! This module provides the network layer that accepts client connections
//! and manages their lifecycle.
//!
//! ## Architecture
//!
//! ```text
//! +--------+
//! | Server |  <- Accepts TCP connections, enforces the connection limit
//! +--------+
//!      |
//!      v
//! +------------+     +-----------+
//! | Connection | --> | Handshake |  <- Capability negotiation
//! +------------+     +-----------+
//!      |
//!      v
//! +---------+     +----------+
//! | Session | <-- | Registry |  <- Live connections, for cancellation
//! +---------+     +----------+
//! ```
//!
//! ## Terminology
//!
//! - **Server**: TCP listener that spawns one task per connection
//! - **Connection**: Per-client task driving negotiation, authentication and
//!   dispatch
//! - **Handshake**: Capability get/set before authentication
//! - **Registry**: Tracks live connections for cancel requests and counts

pub mod connection;
pub mod context;
pub mod handshake;
pub mod listener;
pub mod registry;
pub mod stats;

pub use context::{ServerContext, ServerOptions};
pub use listener::Server;
pub use registry::ConnectionRegistry;
pub use stats::{ServerStats, StatsSnapshot};
