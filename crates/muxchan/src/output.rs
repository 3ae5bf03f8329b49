use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use muxchan_frame::Frame;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Payload text as received.
    Text,
    /// One JSON object per event.
    Json,
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    event: &'static str,
    channel: u16,
    size: usize,
    payload: String,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    problem: Option<&'a str>,
}

pub fn print_message(frame: &Frame, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&MessageOutput {
            event: "message",
            channel: frame.channel,
            size: frame.payload.len(),
            payload: payload_preview(frame.payload.as_ref()),
            timestamp: now_unix_seconds(),
            problem: None,
        }),
        OutputFormat::Text => {
            let mut out = std::io::stdout();
            let _ = out.write_all(frame.payload.as_ref());
            if !frame.payload.ends_with(b"\n") {
                let _ = out.write_all(b"\n");
            }
            let _ = out.flush();
        }
    }
}

pub fn print_close(channel: u16, problem: Option<&str>, message: Option<&str>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&MessageOutput {
            event: "close",
            channel,
            size: 0,
            payload: message.unwrap_or_default().to_string(),
            timestamp: now_unix_seconds(),
            problem,
        }),
        OutputFormat::Text => match problem {
            Some(problem) => println!(
                "channel {channel} closed: {problem}{}",
                message.map(|m| format!(" ({m})")).unwrap_or_default()
            ),
            None => println!("channel {channel} closed"),
        },
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
