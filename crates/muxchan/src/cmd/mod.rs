use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod open;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Host channels on a Unix socket until interrupted.
    Serve(ServeArgs),
    /// Open one channel on a host and print what it sends.
    Open(OpenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub async fn run(command: Command) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args).await,
        Command::Open(args) => open::run(args).await,
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Keepalive interval for chatty1 channels (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub interval: String,
    /// Maximum frame payload size in bytes.
    #[arg(long, default_value_t = muxchan_frame::DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,
    /// Inbound messages buffered per channel before it is closed.
    #[arg(long, default_value_t = 32)]
    pub queue_depth: usize,
}

#[derive(Args, Debug)]
pub struct OpenArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// Payload type to open.
    #[arg(long, default_value = "chatty1")]
    pub payload: String,
    /// Channel ID to use.
    #[arg(long, short = 'c', default_value_t = muxchan_frame::FIRST_CHANNEL_ID)]
    pub channel: u16,
    /// Open option as KEY=VALUE (repeatable). VALUE is parsed as JSON when possible.
    #[arg(long = "option", short = 'o', value_name = "KEY=VALUE")]
    pub option: Vec<String>,
    /// Answer the channel after this many keepalives.
    #[arg(long, value_name = "N")]
    pub reply_after: Option<usize>,
    /// Give up if the host is silent this long (e.g. 30s, 500ms).
    #[arg(long, default_value = "30s")]
    pub timeout: String,
    /// Output format.
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `500ms`, `5s`, or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
