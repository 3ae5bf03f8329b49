use bytes::Bytes;
use muxchan_channel::{Options, KEEPALIVE};
use muxchan_host::{Session, SessionEvent};

use crate::cmd::{parse_duration, OpenArgs};
use crate::exit::{host_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_close, print_message};

pub async fn run(args: OpenArgs) -> CliResult<i32> {
    let options = parse_options(&args.option)?;
    let timeout = parse_duration(&args.timeout)?;
    if muxchan_frame::is_control(args.channel) {
        return Err(CliError::new(USAGE, "channel 0 is reserved for control"));
    }

    let mut session = Session::connect(&args.path)
        .await
        .map_err(|err| host_error("connect failed", err))?;
    session
        .open(args.channel, &args.payload, options)
        .await
        .map_err(|err| host_error("open failed", err))?;

    let mut keepalives = 0usize;
    let mut replied = false;

    loop {
        let event = session
            .next_event_timeout(timeout)
            .await
            .map_err(|err| host_error("receive failed", err))?;

        match event {
            SessionEvent::Data(frame) if frame.channel == args.channel => {
                print_message(&frame, args.format);
                if frame.payload.as_ref() == KEEPALIVE {
                    keepalives += 1;
                }
                if should_reply(args.reply_after, keepalives, replied) {
                    tracing::debug!(keepalives, "answering channel");
                    session
                        .send(args.channel, Bytes::from_static(b"\n"))
                        .await
                        .map_err(|err| host_error("send failed", err))?;
                    replied = true;
                }
            }
            SessionEvent::Closed {
                channel,
                problem,
                message,
            } if channel == args.channel => {
                print_close(channel, problem.as_deref(), message.as_deref(), args.format);
                return Ok(if problem.is_some() { FAILURE } else { SUCCESS });
            }
            other => tracing::trace!(?other, "ignoring event"),
        }
    }
}

fn should_reply(reply_after: Option<usize>, keepalives: usize, replied: bool) -> bool {
    !replied && reply_after.is_some_and(|after| keepalives >= after)
}

/// Build open options from `KEY=VALUE` pairs.
///
/// Values that parse as JSON keep their type (`n=3` is a number); anything
/// else is a string.
fn parse_options(pairs: &[String]) -> CliResult<Options> {
    let mut options = Options::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| CliError::new(USAGE, format!("option must be KEY=VALUE: {pair}")))?;
        if key.is_empty() {
            return Err(CliError::new(USAGE, format!("option key is empty: {pair}")));
        }
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        options.insert(key.to_string(), value);
    }
    Ok(options)
}
