use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use muxchan_channel::Options;
use muxchan_frame::{is_control, ChannelCodec, Frame, FrameConfig};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

use crate::control::ControlMessage;
use crate::error::{HostError, Result};

/// Something the host sent to a [`Session`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A data message on an open channel.
    Data(Frame),
    /// The host closed a channel.
    Closed {
        channel: u16,
        problem: Option<String>,
        message: Option<String>,
    },
    /// Answer to [`Session::ping`].
    Pong,
}

/// Client end of a host connection: opens channels and exchanges messages.
pub struct Session<T> {
    framed: Framed<T, ChannelCodec>,
}

#[cfg(unix)]
impl Session<tokio::net::UnixStream> {
    /// Connect to a host listening on a Unix socket path.
    pub async fn connect(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = tokio::net::UnixStream::connect(path)
            .await
            .map_err(|source| HostError::Connect {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(?path, "connected to host");
        Ok(Self::new(stream, FrameConfig::default()))
    }
}

impl<T> Session<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: T, config: FrameConfig) -> Self {
        Self {
            framed: Framed::new(stream, ChannelCodec::with_config(config)),
        }
    }

    /// Ask the host to open `channel` with the given payload type.
    pub async fn open(&mut self, channel: u16, payload: &str, options: Options) -> Result<()> {
        self.control(&ControlMessage::open(channel, payload, options))
            .await
    }

    /// Close `channel` from this side.
    pub async fn close(&mut self, channel: u16) -> Result<()> {
        self.control(&ControlMessage::close(channel)).await
    }

    pub async fn ping(&mut self) -> Result<()> {
        self.control(&ControlMessage::Ping).await
    }

    /// Send raw data on `channel`.
    pub async fn send(&mut self, channel: u16, data: impl Into<Bytes>) -> Result<()> {
        self.framed.send(Frame::new(channel, data)).await?;
        Ok(())
    }

    /// Wait for the next event from the host.
    ///
    /// Returns [`HostError::Disconnected`] once the host closes the stream.
    pub async fn next_event(&mut self) -> Result<SessionEvent> {
        loop {
            let frame = match self.framed.next().await {
                Some(frame) => frame?,
                None => return Err(HostError::Disconnected),
            };

            if !is_control(frame.channel) {
                return Ok(SessionEvent::Data(frame));
            }

            match ControlMessage::from_payload(&frame.payload)? {
                ControlMessage::Close {
                    channel,
                    problem,
                    message,
                } => {
                    return Ok(SessionEvent::Closed {
                        channel,
                        problem,
                        message,
                    })
                }
                ControlMessage::Pong => return Ok(SessionEvent::Pong),
                ControlMessage::Ping => self.control(&ControlMessage::Pong).await?,
                ControlMessage::Open { channel, .. } => {
                    tracing::warn!(channel, "ignoring open request from host");
                }
            }
        }
    }

    /// [`next_event`](Self::next_event) bounded by `timeout`.
    pub async fn next_event_timeout(&mut self, timeout: Duration) -> Result<SessionEvent> {
        tokio::time::timeout(timeout, self.next_event())
            .await
            .map_err(|_| HostError::Timeout(timeout))?
    }

    async fn control(&mut self, message: &ControlMessage) -> Result<()> {
        self.framed.send(message.to_frame()?).await?;
        Ok(())
    }
}
