use std::fmt;

/// Lifecycle of a channel instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Created, or acknowledgment written and no keepalive sent yet.
    Started,
    /// Keepalive written, bounded read pending.
    Waiting,
    /// Terminal. The instance performs no further I/O.
    Done,
}

impl ChannelState {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelState::Started => "started",
            ChannelState::Waiting => "waiting",
            ChannelState::Done => "done",
        }
    }

    pub fn is_done(self) -> bool {
        self == ChannelState::Done
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks state for the duration of one `run` and moves it to `Done` when
/// dropped, whether the run returned, failed, or its future was dropped.
pub(crate) struct StateGuard<'a> {
    state: &'a mut ChannelState,
}

impl<'a> StateGuard<'a> {
    pub(crate) fn new(state: &'a mut ChannelState) -> Self {
        Self { state }
    }

    pub(crate) fn set(&mut self, next: ChannelState) {
        if !self.state.is_done() {
            *self.state = next;
        }
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        *self.state = ChannelState::Done;
    }
}
