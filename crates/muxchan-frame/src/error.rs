/// Framing failures on a multiplexed stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A header did not start with `MX`; the stream is out of sync.
    #[error("bad frame magic {found:02x?}, expected \"MX\"")]
    InvalidMagic { found: [u8; 2] },

    #[error("frame payload of {size} bytes exceeds limit of {max}")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("stream I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended with a partial frame buffered.
    #[error("stream ended mid-frame ({buffered} bytes buffered)")]
    Truncated { buffered: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
