//! Channel host runtime.
//!
//! The host owns the physical stream. It decodes frames, answers control
//! requests on channel `0`, opens channel instances from a
//! [`ChannelRegistry`](muxchan_channel::ChannelRegistry), routes their
//! inbound data, and serializes every channel's writes back onto the stream.

pub mod config;
pub mod control;
pub mod error;
pub mod host;
#[cfg(unix)]
pub mod listener;
pub mod session;

pub use config::HostConfig;
pub use control::{
    ControlMessage, PROBLEM_FLOW_CONTROL, PROBLEM_INTERNAL_ERROR, PROBLEM_NOT_SUPPORTED,
    PROBLEM_PROTOCOL_ERROR,
};
pub use error::{HostError, Result};
pub use host::ChannelHost;
#[cfg(unix)]
pub use listener::HostListener;
pub use session::{Session, SessionEvent};
