use std::fmt;
use std::io;

use muxchan_frame::FrameError;
use muxchan_host::HostError;

pub const SUCCESS: i32 = 0;
/// The channel closed with a problem, or the peer went away.
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

fn io_code(kind: io::ErrorKind) -> i32 {
    match kind {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    }
}

pub fn host_error(context: &str, err: HostError) -> CliError {
    match &err {
        HostError::Bind { source, .. }
        | HostError::Connect { source, .. }
        | HostError::Accept(source)
        | HostError::Frame(FrameError::Io(source)) => {
            CliError::new(io_code(source.kind()), format!("{context}: {err}"))
        }
        HostError::PathTooLong { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        HostError::Frame(FrameError::PayloadTooLarge { .. }) | HostError::Json(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        HostError::Frame(FrameError::Truncated { .. }) | HostError::Disconnected => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        HostError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        _ => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
    }
}
