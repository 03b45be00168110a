//! # FeedSockets Traits
//!
//! Core traits and types shared by every feed channel:
//!
//! - **FeedMessage**: raw payload as delivered by the transport
//! - **FeedDecoder**: turns a raw payload into a typed message, once, at the boundary
//! - **FeedTransport**: the publish/subscribe + request/response endpoint
//! - **Connector**: the closed set of transport kinds

pub mod decoder;
pub mod error;
pub mod message;
pub mod transport;

pub use decoder::{FeedDecoder, JsonDecoder};
pub use error::{ChannelError, Result};
pub use message::FeedMessage;
pub use transport::{
    Connector, FeedTransport, SubscriptionHandle, TransportFrame, TransportSubscription,
};
