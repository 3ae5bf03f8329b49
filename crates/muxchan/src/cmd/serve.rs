use muxchan_channel::HeartbeatConfig;
use muxchan_frame::FrameConfig;
use muxchan_host::{ChannelHost, HostConfig, HostListener};
use tokio_util::sync::CancellationToken;

use crate::cmd::{parse_duration, ServeArgs};
use crate::exit::{host_error, CliResult, SUCCESS};

pub async fn run(args: ServeArgs) -> CliResult<i32> {
    let config = HostConfig {
        frame: FrameConfig {
            max_payload_size: args.max_payload,
        },
        heartbeat: HeartbeatConfig {
            interval: parse_duration(&args.interval)?,
        },
        inbound_queue_depth: args.queue_depth,
        ..HostConfig::default()
    };

    let listener = HostListener::bind(&args.path, ChannelHost::new(config))
        .map_err(|err| host_error("bind failed", err))?;
    tracing::info!(path = %listener.path().display(), "serving until interrupted");

    let shutdown = CancellationToken::new();
    install_interrupt_handler(shutdown.clone());

    listener
        .run(shutdown)
        .await
        .map_err(|err| host_error("serve failed", err))?;

    Ok(SUCCESS)
}

fn install_interrupt_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupt received; shutting down");
                shutdown.cancel();
            }
            Err(err) => tracing::warn!(error = %err, "signal handler setup failed"),
        }
    });
}
