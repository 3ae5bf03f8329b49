/// Errors surfaced from a channel's run to the host runtime.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The runtime side of the channel went away (peer closed, host shut down).
    #[error("channel {0} closed")]
    Closed(u16),

    /// A write exceeded the host's frame payload limit.
    #[error("channel {channel} message of {size} bytes exceeds limit of {max}")]
    PayloadTooLarge { channel: u16, size: usize, max: usize },

    /// `run` was invoked on an instance that already reached `Done`.
    #[error("channel already finished")]
    Finished,

    /// The options payload could not be rendered. Serializing an in-memory
    /// JSON map does not fail, so the built-in channels never produce this.
    #[error("failed to render options: {0}")]
    Render(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
