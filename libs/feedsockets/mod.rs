//! # FeedSockets
//!
//! Subscription channels over multiplexed publish/subscribe feeds.
//!
//! ## Features
//!
//! - **Transport boundary**: one `FeedTransport` trait, two tagged `Connector` variants
//! - **Channel lifecycle**: connected → initial content → updated content → disconnected
//! - **Single subscription per route**: reopening a route closes the prior handle
//! - **Generation guard**: stale initial dumps are discarded after a resubscribe
//! - **Decode once**: payloads are decoded at the boundary, bad payloads are dropped and counted

pub mod core;
pub mod manager;
pub mod traits;

// Re-export all traits
pub use traits::*;

// Re-export core channel functionality
pub use core::{
    channel::{ChannelEvent, ChannelStream, FeedChannel},
    config::ChannelConfig,
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, Metrics},
    replay::{ReplayRecord, ReplayTransport},
    route::Route,
};

// Re-export manager
pub use manager::{ActiveSubscription, SubscriptionRegistry};

/// Type alias for Result with ChannelError
pub type Result<T> = std::result::Result<T, traits::ChannelError>;
