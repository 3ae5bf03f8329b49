//! Multiplexed channels over a single local stream.
//!
//! # Crate Structure
//!
//! - [`frame`]: Length-prefixed framing with channel multiplexing
//! - [`channel`]: Channel contract, registry, and the `chatty1` heartbeat channel
//! - [`host`]: Host runtime, control protocol, Unix socket listener, client session

/// Re-export frame types.
pub mod frame {
    pub use muxchan_frame::*;
}

/// Re-export channel types.
pub mod channel {
    pub use muxchan_channel::*;
}

/// Re-export host types.
pub mod host {
    pub use muxchan_host::*;
}
