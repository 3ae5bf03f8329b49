use bytes::Bytes;
use muxchan_frame::{Frame, DEFAULT_MAX_PAYLOAD};
use tokio::sync::mpsc;

use crate::error::{ChannelError, Result};

/// A frame queued by one channel instance.
///
/// `instance` is assigned by the host when it opens the channel, so frames
/// left over from a closed instance can be told apart from a newer instance
/// reusing the same channel ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub instance: u64,
    pub frame: Frame,
}

/// A channel's exclusive view of the multiplexed stream.
///
/// Writes are stamped with the channel ID and queued for the host, which
/// serializes them with every other channel's frames. Reads yield payloads
/// the host routed to this channel.
#[derive(Debug)]
pub struct ChannelIo {
    channel: u16,
    instance: u64,
    max_payload: usize,
    outbound: mpsc::Sender<Outbound>,
    inbound: mpsc::Receiver<Bytes>,
}

/// Test-side end of a [`ChannelIo::loopback`] pair.
#[derive(Debug)]
pub struct Loopback {
    /// Frames the channel wrote, in order.
    pub written: mpsc::Receiver<Outbound>,
    /// Delivers inbound data to the channel. Dropping it closes the read side.
    pub deliver: mpsc::Sender<Bytes>,
}

impl Loopback {
    /// Next frame the channel wrote; `None` once its `ChannelIo` is gone.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        self.written.recv().await.map(|out| out.frame)
    }

    /// Frames already written, without waiting.
    pub fn drain_frames(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Ok(out) = self.written.try_recv() {
            frames.push(out.frame);
        }
        frames
    }
}

impl ChannelIo {
    pub fn new(
        channel: u16,
        outbound: mpsc::Sender<Outbound>,
        inbound: mpsc::Receiver<Bytes>,
    ) -> Self {
        Self {
            channel,
            instance: 0,
            max_payload: DEFAULT_MAX_PAYLOAD,
            outbound,
            inbound,
        }
    }

    /// Tag every outbound frame with `instance`.
    pub fn with_instance(mut self, instance: u64) -> Self {
        self.instance = instance;
        self
    }

    /// Refuse writes larger than `max_payload` bytes.
    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Build a `ChannelIo` whose other end is held by the caller.
    pub fn loopback(channel: u16, depth: usize) -> (Self, Loopback) {
        let (out_tx, out_rx) = mpsc::channel(depth);
        let (in_tx, in_rx) = mpsc::channel(depth);
        (
            Self::new(channel, out_tx, in_rx),
            Loopback {
                written: out_rx,
                deliver: in_tx,
            },
        )
    }

    /// Channel ID frames from this view are addressed to.
    pub fn channel(&self) -> u16 {
        self.channel
    }

    /// Queue one message for the peer. Suspends while the host queue is full.
    ///
    /// A message over the payload limit fails here, before it reaches the
    /// shared stream.
    pub async fn write(&mut self, data: impl Into<Bytes>) -> Result<()> {
        let data = data.into();
        if data.len() > self.max_payload {
            return Err(ChannelError::PayloadTooLarge {
                channel: self.channel,
                size: data.len(),
                max: self.max_payload,
            });
        }
        let out = Outbound {
            instance: self.instance,
            frame: Frame::new(self.channel, data),
        };
        self.outbound
            .send(out)
            .await
            .map_err(|_| ChannelError::Closed(self.channel))
    }

    /// Wait for the next unit of inbound data.
    ///
    /// Cancel-safe: dropping the future before it resolves loses no data.
    pub async fn read(&mut self) -> Result<Bytes> {
        self.inbound
            .recv()
            .await
            .ok_or(ChannelError::Closed(self.channel))
    }
}
