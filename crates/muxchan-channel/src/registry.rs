use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::channel::Channel;
use crate::heartbeat::{HeartbeatChannel, HeartbeatConfig};

/// Builds a fresh channel instance for one open request.
pub type ChannelFactory = Arc<dyn Fn() -> Box<dyn Channel> + Send + Sync>;

/// Maps payload-type tags to channel constructors.
///
/// The host owns one registry and consults it for every open request.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    factories: HashMap<String, ChannelFactory>,
}

impl ChannelRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in channels.
    pub fn with_builtin(heartbeat: HeartbeatConfig) -> Self {
        let mut registry = Self::new();
        registry.register(HeartbeatChannel::PAYLOAD, move || {
            Box::new(HeartbeatChannel::with_config(heartbeat.clone()))
        });
        registry
    }

    /// Register a constructor for `payload`, returning the one it replaced.
    pub fn register<F>(&mut self, payload: impl Into<String>, factory: F) -> Option<ChannelFactory>
    where
        F: Fn() -> Box<dyn Channel> + Send + Sync + 'static,
    {
        self.factories.insert(payload.into(), Arc::new(factory))
    }

    /// Construct a new instance for `payload`, if one is registered.
    pub fn create(&self, payload: &str) -> Option<Box<dyn Channel>> {
        self.factories.get(payload).map(|factory| factory())
    }

    pub fn contains(&self, payload: &str) -> bool {
        self.factories.contains_key(payload)
    }

    /// Registered payload tags, sorted.
    pub fn payloads(&self) -> Vec<&str> {
        let mut payloads: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        payloads.sort_unstable();
        payloads
    }
}

impl fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("payloads", &self.payloads())
            .finish()
    }
}
