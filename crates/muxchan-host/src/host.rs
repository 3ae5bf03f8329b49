use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::{FutureExt, SinkExt, StreamExt};
use muxchan_channel::{Channel, ChannelError, ChannelIo, ChannelRegistry, Options, Outbound};
use muxchan_frame::{is_control, ChannelCodec, Frame};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinSet;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

use crate::config::HostConfig;
use crate::control::{
    ControlMessage, PROBLEM_FLOW_CONTROL, PROBLEM_INTERNAL_ERROR, PROBLEM_NOT_SUPPORTED,
    PROBLEM_PROTOCOL_ERROR,
};
use crate::error::Result;

/// Serves channels over one multiplexed stream.
pub struct ChannelHost {
    registry: Arc<ChannelRegistry>,
    config: HostConfig,
}

impl ChannelHost {
    /// Create a host serving the built-in channels.
    pub fn new(config: HostConfig) -> Self {
        let registry = ChannelRegistry::with_builtin(config.heartbeat.clone());
        Self {
            registry: Arc::new(registry),
            config,
        }
    }

    /// Replace the channel registry.
    pub fn with_registry(mut self, registry: ChannelRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Serve one peer until it closes the stream or `shutdown` fires.
    ///
    /// Every open channel is cancelled before this returns.
    pub async fn serve<T>(&self, stream: T, shutdown: CancellationToken) -> Result<()>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let mut session = HostSession::new(self, stream);
        let result = session.run(&shutdown).await;
        session.teardown().await;
        result
    }
}

impl Default for ChannelHost {
    fn default() -> Self {
        Self::new(HostConfig::default())
    }
}

#[derive(Debug)]
enum ChannelOutcome {
    Completed,
    Failed(ChannelError),
    Panicked,
    Cancelled,
}

struct Completion {
    channel: u16,
    generation: u64,
    outcome: ChannelOutcome,
}

struct OpenChannel {
    generation: u64,
    payload: String,
    inbound: mpsc::Sender<Bytes>,
    cancel: CancellationToken,
}

struct HostSession<'h, T> {
    host: &'h ChannelHost,
    framed: Framed<T, ChannelCodec>,
    outbound_tx: mpsc::Sender<Outbound>,
    outbound_rx: mpsc::Receiver<Outbound>,
    open: HashMap<u16, OpenChannel>,
    tasks: JoinSet<Completion>,
    next_generation: u64,
}

impl<'h, T> HostSession<'h, T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    fn new(host: &'h ChannelHost, stream: T) -> Self {
        let codec = ChannelCodec::with_config(host.config.frame.clone());
        let (outbound_tx, outbound_rx) = mpsc::channel(host.config.outbound_queue_depth.max(1));
        Self {
            host,
            framed: Framed::new(stream, codec),
            outbound_tx,
            outbound_rx,
            open: HashMap::new(),
            tasks: JoinSet::new(),
            next_generation: 0,
        }
    }

    async fn run(&mut self, shutdown: &CancellationToken) -> Result<()> {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::debug!(open = self.open.len(), "host shutting down");
                    return Ok(());
                }
                Some(out) = self.outbound_rx.recv() => self.forward(out).await?,
                Some(joined) = self.tasks.join_next() => match joined {
                    Ok(done) => self.complete(done).await?,
                    Err(err) => tracing::error!(error = %err, "channel task aborted"),
                },
                inbound = self.framed.next() => match inbound {
                    Some(frame) => self.dispatch(frame?).await?,
                    None => {
                        tracing::debug!("peer closed stream");
                        return Ok(());
                    }
                },
            }
        }
    }

    async fn teardown(&mut self) {
        for (_, entry) in self.open.drain() {
            entry.cancel.cancel();
        }
        while let Some(joined) = self.tasks.join_next().await {
            if let Ok(done) = joined {
                tracing::trace!(channel = done.channel, outcome = ?done.outcome, "channel stopped");
            }
        }
    }

    async fn dispatch(&mut self, frame: Frame) -> Result<()> {
        if is_control(frame.channel) {
            return self.handle_control(&frame.payload).await;
        }

        let channel = frame.channel;
        let Some(entry) = self.open.get(&channel) else {
            tracing::warn!(channel, size = frame.payload.len(), "data for unknown channel; dropping");
            return Ok(());
        };

        match entry.inbound.try_send(frame.payload) {
            Ok(()) => Ok(()),
            // run already returned; its close goes out once the task is reaped
            Err(TrySendError::Closed(_)) => Ok(()),
            Err(TrySendError::Full(_)) => {
                tracing::warn!(channel, "inbound queue full; closing channel");
                self.cancel_channel(channel);
                self.send_control(&ControlMessage::close_with_problem(
                    channel,
                    PROBLEM_FLOW_CONTROL,
                    None,
                ))
                .await
            }
        }
    }

    async fn handle_control(&mut self, payload: &[u8]) -> Result<()> {
        let message = match ControlMessage::from_payload(payload) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring malformed control message");
                return Ok(());
            }
        };

        match message {
            ControlMessage::Open {
                channel,
                payload,
                options,
            } => self.open_channel(channel, payload, options).await,
            ControlMessage::Close {
                channel, problem, ..
            } => {
                match self.cancel_channel(channel) {
                    Some(entry) => {
                        tracing::debug!(channel, payload = %entry.payload, ?problem, "peer closed channel")
                    }
                    None => tracing::debug!(channel, "close for channel that is not open"),
                }
                Ok(())
            }
            ControlMessage::Ping => self.send_control(&ControlMessage::Pong).await,
            ControlMessage::Pong => {
                tracing::trace!("pong");
                Ok(())
            }
        }
    }

    async fn open_channel(&mut self, channel: u16, payload: String, options: Options) -> Result<()> {
        if is_control(channel) || self.open.contains_key(&channel) {
            tracing::warn!(channel, payload = %payload, "rejecting open for reserved or busy channel");
            return self
                .send_control(&ControlMessage::close_with_problem(
                    channel,
                    PROBLEM_PROTOCOL_ERROR,
                    Some(format!("channel {channel} is not available")),
                ))
                .await;
        }

        let Some(instance) = self.host.registry.create(&payload) else {
            tracing::debug!(channel, payload = %payload, "no channel registered for payload");
            return self
                .send_control(&ControlMessage::close_with_problem(
                    channel,
                    PROBLEM_NOT_SUPPORTED,
                    Some(format!("payload '{payload}' is not supported")),
                ))
                .await;
        };

        self.next_generation += 1;
        let generation = self.next_generation;
        let (inbound_tx, inbound_rx) = mpsc::channel(self.host.config.inbound_queue_depth.max(1));
        let io = ChannelIo::new(channel, self.outbound_tx.clone(), inbound_rx)
            .with_instance(generation)
            .with_max_payload(self.host.config.frame.max_payload_size);
        let cancel = CancellationToken::new();

        self.tasks.spawn(drive_channel(
            channel,
            generation,
            instance,
            io,
            options,
            cancel.clone(),
        ));
        tracing::debug!(channel, payload = %payload, "opened channel");
        self.open.insert(
            channel,
            OpenChannel {
                generation,
                payload,
                inbound: inbound_tx,
                cancel,
            },
        );
        Ok(())
    }

    async fn complete(&mut self, done: Completion) -> Result<()> {
        // Frames the channel queued before returning go out ahead of its close.
        while let Ok(out) = self.outbound_rx.try_recv() {
            self.forward(out).await?;
        }

        let current = self
            .open
            .get(&done.channel)
            .is_some_and(|entry| entry.generation == done.generation);
        if !current {
            tracing::trace!(channel = done.channel, outcome = ?done.outcome, "reaped cancelled channel");
            return Ok(());
        }
        let Some(entry) = self.open.remove(&done.channel) else {
            return Ok(());
        };

        let close = match done.outcome {
            ChannelOutcome::Completed => {
                tracing::debug!(channel = done.channel, payload = %entry.payload, "channel finished");
                ControlMessage::close(done.channel)
            }
            ChannelOutcome::Failed(err) => {
                tracing::warn!(channel = done.channel, payload = %entry.payload, error = %err, "channel failed");
                ControlMessage::close_with_problem(
                    done.channel,
                    PROBLEM_INTERNAL_ERROR,
                    Some(err.to_string()),
                )
            }
            ChannelOutcome::Panicked => {
                tracing::error!(channel = done.channel, payload = %entry.payload, "channel panicked");
                ControlMessage::close_with_problem(
                    done.channel,
                    PROBLEM_INTERNAL_ERROR,
                    Some("channel panicked".to_string()),
                )
            }
            ChannelOutcome::Cancelled => return Ok(()),
        };
        self.send_control(&close).await
    }

    fn cancel_channel(&mut self, channel: u16) -> Option<OpenChannel> {
        let entry = self.open.remove(&channel)?;
        entry.cancel.cancel();
        Some(entry)
    }

    async fn forward(&mut self, out: Outbound) -> Result<()> {
        let current = self
            .open
            .get(&out.frame.channel)
            .is_some_and(|entry| entry.generation == out.instance);
        if !current {
            tracing::trace!(
                channel = out.frame.channel,
                instance = out.instance,
                "dropping frame from closed channel"
            );
            return Ok(());
        }
        self.framed.send(out.frame).await?;
        Ok(())
    }

    async fn send_control(&mut self, message: &ControlMessage) -> Result<()> {
        self.framed.send(message.to_frame()?).await?;
        Ok(())
    }
}

async fn drive_channel(
    channel: u16,
    generation: u64,
    mut instance: Box<dyn Channel>,
    mut io: ChannelIo,
    options: Options,
    cancel: CancellationToken,
) -> Completion {
    let run = async {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => ChannelOutcome::Cancelled,
            result = instance.run(&mut io, options) => match result {
                Ok(()) => ChannelOutcome::Completed,
                Err(err) => ChannelOutcome::Failed(err),
            },
        }
    };
    let outcome = AssertUnwindSafe(run)
        .catch_unwind()
        .await
        .unwrap_or(ChannelOutcome::Panicked);
    Completion {
        channel,
        generation,
        outcome,
    }
}
