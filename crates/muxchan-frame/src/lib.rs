//! Length-prefixed message framing with channel multiplexing.
//!
//! Every message on the shared stream is framed with:
//! - A 2-byte magic number ("MX") for stream synchronization
//! - A 4-byte little-endian payload length
//! - A 2-byte little-endian channel ID for multiplexing
//!
//! Channel `0` carries host control traffic; every other ID belongs to one
//! open channel instance.

pub mod channel;
pub mod codec;
pub mod error;

pub use channel::{is_control, CONTROL, FIRST_CHANNEL_ID};
pub use codec::{
    decode_frame, encode_frame, ChannelCodec, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE,
};
pub use error::{FrameError, Result};
