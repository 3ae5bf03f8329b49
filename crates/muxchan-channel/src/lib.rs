//! Channel contract and built-in channel implementations.
//!
//! A channel is one logical duplex stream multiplexed with others by a host
//! runtime. The runtime hands each instance a [`ChannelIo`] and the options
//! payload from the open request, then drives [`Channel::run`] until it
//! returns, fails, or is cancelled.

pub mod channel;
pub mod error;
pub mod heartbeat;
pub mod io;
pub mod registry;
pub mod render;
pub mod state;

pub use channel::{Channel, Options};
pub use error::{ChannelError, Result};
pub use heartbeat::{HeartbeatChannel, HeartbeatConfig, DEFAULT_INTERVAL, KEEPALIVE};
pub use io::{ChannelIo, Loopback, Outbound};
pub use registry::{ChannelFactory, ChannelRegistry};
pub use render::render_options;
pub use state::ChannelState;
