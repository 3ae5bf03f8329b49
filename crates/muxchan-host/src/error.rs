use std::path::PathBuf;

/// Errors that can occur while hosting or driving a session.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Failed to bind to the specified socket path.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The socket path does not fit in `sockaddr_un`.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// Failed to connect to the specified socket path.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// Frame-level error on the shared stream.
    #[error("frame error: {0}")]
    Frame(#[from] muxchan_frame::FrameError),

    /// Control message could not be encoded or decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote end closed the stream.
    #[error("peer disconnected")]
    Disconnected,

    /// Waiting for an event took too long.
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, HostError>;
