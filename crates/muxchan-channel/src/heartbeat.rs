use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::channel::{Channel, Options};
use crate::error::{ChannelError, Result};
use crate::io::ChannelIo;
use crate::render::render_options;
use crate::state::{ChannelState, StateGuard};

/// Liveness probe written on every wait iteration.
pub const KEEPALIVE: &[u8] = b"You still there?\n";

/// Default bound on each read before another keepalive goes out.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for [`HeartbeatChannel`].
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// How long each bounded read waits for the peer.
    pub interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
        }
    }
}

/// Acknowledges its options, then probes the peer until it answers.
///
/// After the acknowledgment the channel alternates a keepalive write with a
/// read bounded by [`HeartbeatConfig::interval`]. A timeout just starts the
/// next round. The first inbound message ends the run; its content is
/// discarded.
#[derive(Debug)]
pub struct HeartbeatChannel {
    config: HeartbeatConfig,
    state: ChannelState,
}

impl HeartbeatChannel {
    /// Payload-type tag peers use to open this channel.
    pub const PAYLOAD: &'static str = "chatty1";

    pub fn new() -> Self {
        Self::with_config(HeartbeatConfig::default())
    }

    pub fn with_config(config: HeartbeatConfig) -> Self {
        Self {
            config,
            state: ChannelState::Started,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// The first message written by `run` for the given options.
    pub fn acknowledgment(options: &Options) -> Result<Bytes> {
        Ok(Bytes::from(format!(
            "You sent options! {}",
            render_options(options)?
        )))
    }
}

impl Default for HeartbeatChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for HeartbeatChannel {
    fn payload(&self) -> &'static str {
        Self::PAYLOAD
    }

    async fn run(&mut self, io: &mut ChannelIo, options: Options) -> Result<()> {
        if self.state.is_done() {
            return Err(ChannelError::Finished);
        }

        let interval = self.config.interval;
        let mut state = StateGuard::new(&mut self.state);

        io.write(Self::acknowledgment(&options)?).await?;
        tracing::debug!(channel = io.channel(), "acknowledged options");

        let mut probes: u64 = 0;
        loop {
            io.write(Bytes::from_static(KEEPALIVE)).await?;
            state.set(ChannelState::Waiting);
            probes += 1;

            match tokio::time::timeout(interval, io.read()).await {
                Ok(Ok(data)) => {
                    tracing::debug!(
                        channel = io.channel(),
                        probes,
                        size = data.len(),
                        "peer answered keepalive"
                    );
                    return Ok(());
                }
                Ok(Err(err)) => return Err(err),
                Err(_elapsed) => {
                    tracing::trace!(channel = io.channel(), probes, "no answer yet");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::sync::oneshot;
    use tokio::time::Instant;

    use super::*;
    use crate::io::Loopback;

    fn options(value: serde_json::Value) -> Options {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn spawn_run(
        mut channel: HeartbeatChannel,
        mut io: ChannelIo,
        opts: Options,
    ) -> tokio::task::JoinHandle<(HeartbeatChannel, Result<()>)> {
        tokio::spawn(async move {
            let result = channel.run(&mut io, opts).await;
            (channel, result)
        })
    }

    async fn expect_keepalive(peer: &mut Loopback) -> Instant {
        let frame = peer.next_frame().await.expect("keepalive expected");
        assert_eq!(frame.payload.as_ref(), KEEPALIVE);
        Instant::now()
    }

    #[tokio::test(start_paused = true)]
    async fn acknowledges_then_probes_until_peer_answers() {
        let (io, mut peer) = ChannelIo::loopback(5, 16);
        let handle = spawn_run(
            HeartbeatChannel::new(),
            io,
            options(json!({"key": "value"})),
        );

        let ack = peer.next_frame().await.unwrap();
        assert_eq!(ack.channel, 5);
        assert_eq!(ack.payload.as_ref(), br#"You sent options! {"key": "value"}"#);

        let t1 = expect_keepalive(&mut peer).await;
        let t2 = expect_keepalive(&mut peer).await;
        let t3 = expect_keepalive(&mut peer).await;
        assert!(t2 - t1 >= DEFAULT_INTERVAL);
        assert!(t3 - t2 >= DEFAULT_INTERVAL);

        tokio::time::sleep(Duration::from_millis(500)).await;
        peer.deliver.send(Bytes::from_static(b"y")).await.unwrap();

        let (channel, result) = handle.await.unwrap();
        result.unwrap();
        assert_eq!(channel.state(), ChannelState::Done);
        assert!(peer.drain_frames().is_empty(), "no fourth keepalive");
    }

    #[tokio::test(start_paused = true)]
    async fn keepalive_count_is_timeouts_plus_one() {
        for timeouts in [0usize, 1, 4] {
            let (io, mut peer) = ChannelIo::loopback(1, 16);
            let handle = spawn_run(HeartbeatChannel::new(), io, Options::new());

            let ack = peer.next_frame().await.unwrap();
            assert_eq!(ack.payload.as_ref(), b"You sent options! {}");

            for _ in 0..=timeouts {
                expect_keepalive(&mut peer).await;
            }
            peer.deliver.send(Bytes::from_static(b"\0")).await.unwrap();

            let (_, result) = handle.await.unwrap();
            assert!(result.is_ok(), "timeouts={timeouts}");
            assert!(peer.drain_frames().is_empty(), "timeouts={timeouts}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn data_already_queued_ends_after_first_probe() {
        let (mut io, mut peer) = ChannelIo::loopback(1, 16);
        peer.deliver.send(Bytes::from_static(b"early")).await.unwrap();

        let mut channel = HeartbeatChannel::new();
        channel.run(&mut io, Options::new()).await.unwrap();
        drop(io);

        let written = peer.drain_frames();
        assert_eq!(written.len(), 2);
        assert_eq!(written[1].payload.as_ref(), KEEPALIVE);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_interval_sets_cadence() {
        let config = HeartbeatConfig {
            interval: Duration::from_millis(250),
        };
        let (io, mut peer) = ChannelIo::loopback(1, 16);
        let handle = spawn_run(HeartbeatChannel::with_config(config), io, Options::new());

        peer.next_frame().await.unwrap();
        let t1 = expect_keepalive(&mut peer).await;
        let t2 = expect_keepalive(&mut peer).await;
        assert_eq!(t2 - t1, Duration::from_millis(250));

        peer.deliver.send(Bytes::from_static(b"ok")).await.unwrap();
        handle.await.unwrap().1.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_read_emits_nothing_more() {
        let (mut io, mut peer) = ChannelIo::loopback(1, 16);
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut channel = HeartbeatChannel::new();
            let cancelled = tokio::select! {
                _ = cancel_rx => true,
                result = channel.run(&mut io, Options::new()) => {
                    result.unwrap();
                    false
                }
            };
            (channel.state(), cancelled)
        });

        peer.next_frame().await.unwrap();
        expect_keepalive(&mut peer).await;
        expect_keepalive(&mut peer).await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        cancel_tx.send(()).unwrap();

        let (state, cancelled) = handle.await.unwrap();
        assert!(cancelled);
        assert_eq!(state, ChannelState::Done);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(peer.drain_frames().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn closed_read_side_propagates() {
        let (mut io, mut peer) = ChannelIo::loopback(6, 16);
        drop(peer.deliver);

        let mut channel = HeartbeatChannel::new();
        let err = channel.run(&mut io, Options::new()).await.unwrap_err();
        assert!(matches!(err, ChannelError::Closed(6)));
        assert_eq!(channel.state(), ChannelState::Done);

        drop(io);
        let mut count = 0;
        while peer.written.recv().await.is_some() {
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn closed_write_side_fails_before_loop() {
        let (mut io, peer) = ChannelIo::loopback(2, 16);
        drop(peer.written);

        let mut channel = HeartbeatChannel::new();
        let err = channel
            .run(&mut io, options(json!({"a": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Closed(2)));
        assert!(channel.state().is_done());
    }

    #[tokio::test]
    async fn oversized_acknowledgment_fails_run() {
        let (io, mut peer) = ChannelIo::loopback(3, 16);
        let mut io = io.with_max_payload(20);

        let mut channel = HeartbeatChannel::new();
        let err = channel
            .run(&mut io, options(json!({"key": "value"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::PayloadTooLarge { channel: 3, max: 20, .. }));
        assert!(channel.state().is_done());
        assert!(peer.drain_frames().is_empty());
    }

    #[tokio::test]
    async fn finished_instance_refuses_second_run() {
        let (mut io, mut peer) = ChannelIo::loopback(1, 16);
        peer.deliver.send(Bytes::from_static(b"x")).await.unwrap();

        let mut channel = HeartbeatChannel::new();
        channel.run(&mut io, Options::new()).await.unwrap();
        let _ = peer.drain_frames();

        let err = channel.run(&mut io, Options::new()).await.unwrap_err();
        assert!(matches!(err, ChannelError::Finished));
        assert!(peer.drain_frames().is_empty());
    }

    #[test]
    fn payload_tag_is_chatty1() {
        assert_eq!(HeartbeatChannel::new().payload(), "chatty1");
    }
}
