//! X Protocol wire layer.
//!
//! This module frames the byte stream into typed messages. Every frame is a
//! little-endian `u32` length, a one-byte message type and a protobuf
//! payload.
//!
//! ## Architecture
//!
//! ```text
//! +----------+                        +----------+
//! |  Client  |  ------ Frame ------>  |  Server  |
//! | (mysqlx) |  <-- ServerMessage --  | (xserver)|
//! +----------+                        +----------+
//!               ^                ^
//!               |     XCodec     |
//!               +----------------+
//! ```
//!
//! ## Terminology
//!
//! - **Frame**: A client message whose payload is decoded by the state that
//!   receives it
//! - **ServerMessage**: Responses and notices written by the server
//! - **Notice**: Out-of-band frame (client id assigned, rows affected, ...)
//! - **Codec**: Length-prefixed framing for both directions

pub mod backend;
pub mod codec;
pub mod datatypes;
pub mod error;
pub mod frontend;
pub mod messages;
pub mod types;

pub use backend::ServerMessage;
pub use codec::{DEFAULT_MAX_MESSAGE_SIZE, XCodec};
pub use error::ProtocolError;
pub use frontend::{ClientPayload, Frame};
pub use types::{ClientMessageType, ServerMessageType, error_code, notice_type, sql_state};
