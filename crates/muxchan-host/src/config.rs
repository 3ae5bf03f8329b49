use muxchan_channel::HeartbeatConfig;
use muxchan_frame::FrameConfig;

/// Runtime limits and built-in channel settings for a [`ChannelHost`](crate::ChannelHost).
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Frame codec limits for the shared stream.
    pub frame: FrameConfig,
    /// Settings for the built-in `chatty1` channel.
    pub heartbeat: HeartbeatConfig,
    /// Inbound messages buffered per channel before the host closes it.
    pub inbound_queue_depth: usize,
    /// Outbound frames buffered across all channels before writers wait.
    pub outbound_queue_depth: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            inbound_queue_depth: 32,
            outbound_queue_depth: 64,
        }
    }
}
