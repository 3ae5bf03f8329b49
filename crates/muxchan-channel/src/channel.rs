use async_trait::async_trait;

use crate::error::Result;
use crate::io::ChannelIo;

/// Options payload delivered once when a channel is opened.
pub type Options = serde_json::Map<String, serde_json::Value>;

/// A channel implementation the host can open by payload tag.
///
/// Returning `Ok(())` from [`run`](Channel::run) is a normal close, an `Err`
/// is an abnormal close. The host may also drop the returned future at any
/// suspension point to cancel the channel.
#[async_trait]
pub trait Channel: Send {
    /// Payload-type tag this channel answers to.
    fn payload(&self) -> &'static str;

    /// Drive the channel to completion.
    async fn run(&mut self, io: &mut ChannelIo, options: Options) -> Result<()>;
}
