use muxchan_channel::Options;
use muxchan_frame::{Frame, CONTROL};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Close problem: no channel is registered for the requested payload.
pub const PROBLEM_NOT_SUPPORTED: &str = "not-supported";
/// Close problem: the request was malformed (reserved or duplicate channel ID).
pub const PROBLEM_PROTOCOL_ERROR: &str = "protocol-error";
/// Close problem: the channel's run failed.
pub const PROBLEM_INTERNAL_ERROR: &str = "internal-error";
/// Close problem: the peer sent faster than the channel consumed.
pub const PROBLEM_FLOW_CONTROL: &str = "flow-control";

/// CONTROL channel message payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Open `channel` with the implementation registered for `payload`.
    Open {
        channel: u16,
        payload: String,
        #[serde(default)]
        options: Options,
    },
    /// The channel is closed. Sent by either side.
    Close {
        channel: u16,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        problem: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Host liveness request.
    Ping,
    /// Host liveness response.
    Pong,
}

impl ControlMessage {
    /// Create an open request.
    pub fn open(channel: u16, payload: impl Into<String>, options: Options) -> Self {
        Self::Open {
            channel,
            payload: payload.into(),
            options,
        }
    }

    /// Create a normal close.
    pub fn close(channel: u16) -> Self {
        Self::Close {
            channel,
            problem: None,
            message: None,
        }
    }

    /// Create a close carrying a problem code.
    pub fn close_with_problem(
        channel: u16,
        problem: &str,
        message: Option<String>,
    ) -> Self {
        Self::Close {
            channel,
            problem: Some(problem.to_string()),
            message,
        }
    }

    /// Encode as a frame on the CONTROL channel.
    pub fn to_frame(&self) -> Result<Frame> {
        Ok(Frame::new(CONTROL, serde_json::to_vec(self)?))
    }

    /// Decode a CONTROL frame payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn open_wire_shape() {
        let mut options = Options::new();
        options.insert("key".to_string(), json!("value"));
        let value = serde_json::to_value(ControlMessage::open(3, "chatty1", options)).unwrap();
        assert_eq!(
            value,
            json!({"command": "open", "channel": 3, "payload": "chatty1", "options": {"key": "value"}})
        );
    }

    #[test]
    fn open_without_options_defaults_to_empty() {
        let msg =
            ControlMessage::from_payload(br#"{"command":"open","channel":1,"payload":"chatty1"}"#)
                .unwrap();
        assert_eq!(msg, ControlMessage::open(1, "chatty1", Options::new()));
    }

    #[test]
    fn plain_close_omits_problem() {
        let value = serde_json::to_value(ControlMessage::close(4)).unwrap();
        assert_eq!(value, json!({"command": "close", "channel": 4}));
    }

    #[test]
    fn problem_close_carries_code_and_message() {
        let msg = ControlMessage::close_with_problem(
            2,
            PROBLEM_INTERNAL_ERROR,
            Some("channel 2 closed".to_string()),
        );
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["problem"], "internal-error");
        assert_eq!(value["message"], "channel 2 closed");
    }

    #[test]
    fn control_frames_use_channel_zero() {
        let frame = ControlMessage::Ping.to_frame().unwrap();
        assert_eq!(frame.channel, CONTROL);
        assert_eq!(frame.payload.as_ref(), br#"{"command":"ping"}"#);
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(ControlMessage::from_payload(br#"{"command":"kill"}"#).is_err());
        assert!(ControlMessage::from_payload(b"not json").is_err());
    }
}
