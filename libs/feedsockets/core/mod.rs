//! # Channel Core
//!
//! Per-route feed channels built on top of a `Connector`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use feedsockets::{Connector, FeedChannel, ChannelConfig, ChannelEvent, Route};
//!
//! let channel = FeedChannel::new(Connector::wamp(transport), MyDecoder, ChannelConfig::new("matches"));
//! let mut stream = channel
//!     .open(Route::new("/sports/4093/en/match/123"), Some(Route::new("/sports/4093/en/match/123/dump")))
//!     .await?;
//!
//! while let Some(event) = stream.recv().await {
//!     match event? {
//!         ChannelEvent::Connected(handle) => println!("subscribed: {}", handle),
//!         ChannelEvent::InitialContent(dump) => println!("dump: {:?}", dump),
//!         ChannelEvent::UpdatedContent(update) => println!("update: {:?}", update),
//!         ChannelEvent::Disconnected => println!("connection lost"),
//!     }
//! }
//! ```

pub mod channel;
pub mod config;
pub mod connection_state;
pub mod replay;
pub mod route;

// Re-export main types
pub use channel::{ChannelEvent, ChannelStream, FeedChannel};
pub use config::ChannelConfig;
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, Metrics};
pub use replay::{ReplayRecord, ReplayTransport};
pub use route::Route;
