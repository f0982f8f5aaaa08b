use bytes::{BufMut, BytesMut};

/// Maximum frame size in bytes (16 MB), counting the type byte and payload.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Size of the little-endian length prefix that starts every frame.
pub const HEADER_LEN: usize = 4;

/// Writes one frame (`u32` LE length, type byte, payload) into `dst`.
pub fn put_frame(dst: &mut BytesMut, msg_type: u8, payload: &[u8]) {
    dst.reserve(HEADER_LEN + 1 + payload.len());
    dst.put_u32_le((payload.len() + 1) as u32);
    dst.put_u8(msg_type);
    dst.put_slice(payload);
}

/// Codec for the X Protocol packet channel.
/// Decodes client `Frame`s (in frontend.rs) and encodes `ServerMessage`s
/// (in backend.rs).
#[derive(Debug, Clone)]
pub struct XCodec {
    pub(crate) max_message_size: usize,
}

impl XCodec {
    /// Creates a new XCodec with the default maximum message size.
    pub fn new() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self { max_message_size }
    }
}

impl Default for XCodec {
    fn default() -> Self {
        Self::new()
    }
}
