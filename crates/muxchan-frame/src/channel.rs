//! Reserved channel IDs.

/// Host control traffic (open, close, ping/pong).
pub const CONTROL: u16 = 0;

/// Lowest ID a peer may assign to an opened channel.
pub const FIRST_CHANNEL_ID: u16 = 1;

/// Returns true if the channel ID addresses the control channel.
pub fn is_control(id: u16) -> bool {
    id == CONTROL
}
