use thiserror::Error;

/// Main error type for feed channels
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelError {
    /// Subscription attempted before the transport connection exists
    #[error("Transport not connected: {0}")]
    NotConnected(String),

    /// Payload did not match the expected shape
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Server-reported failure on a one-shot request (initial dump)
    #[error("Request error: {0}")]
    Request(String),

    /// Transport-level failure while subscribing or unsubscribing
    #[error("Transport error: {0}")]
    Transport(String),

    /// A newer subscription for the same route replaced this one
    #[error("Subscription superseded for route {route}")]
    Superseded { route: String },

    /// Channel closed unexpectedly
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ChannelError {
    /// Whether this error ends a channel stream
    ///
    /// Decoding errors never do: the bad payload is dropped and the stream continues.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChannelError::Decoding(_))
    }
}

/// Result type for feed channel operations
pub type Result<T> = std::result::Result<T, ChannelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoding_errors_are_not_terminal() {
        assert!(!ChannelError::Decoding("bad".into()).is_terminal());
        assert!(ChannelError::Request("500".into()).is_terminal());
        assert!(ChannelError::NotConnected("wamp".into()).is_terminal());
    }

    #[test]
    fn test_error_display() {
        let err = ChannelError::Superseded {
            route: "/sports/1/en/live".into(),
        };
        assert_eq!(
            err.to_string(),
            "Subscription superseded for route /sports/1/en/live"
        );
    }
}
