use std::time::Duration;

/// Configuration for a FeedChannel
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Channel name, used as log prefix
    pub name: String,

    /// Upper bound for the one-shot initial dump request
    /// `None` waits for as long as the transport takes
    pub initial_dump_timeout: Option<Duration>,
}

impl ChannelConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initial_dump_timeout: None,
        }
    }

    pub fn with_initial_dump_timeout(mut self, timeout: Duration) -> Self {
        self.initial_dump_timeout = Some(timeout);
        self
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new("feed")
    }
}
