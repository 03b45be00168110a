use feedsockets::ChannelError;
use thiserror::Error;

/// Failures surfaced by feeds, the sports merger and the facade
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// The channel stream ended before confirming the subscription
    #[error("Subscription to {0} ended before it was confirmed")]
    NotConfirmed(String),

    #[error("Unknown subscription handle: {0}")]
    UnknownHandle(String),

    #[error("Store writer stopped")]
    WriterStopped,

    /// The authoritative feed of an aggregate failed
    #[error("Authoritative feed failed: {0}")]
    Terminal(String),
}

pub type Result<T> = std::result::Result<T, FeedError>;
