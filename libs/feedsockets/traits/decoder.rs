//! Payload Decoding
//!
//! Every route carries a strongly-typed message schema. Decoding happens
//! exactly once, at the transport boundary, before anything reaches the
//! consumer of a channel.
//!
//! # Failure semantics
//!
//! A decoder error drops that single payload. The channel logs it, bumps
//! its decode-error counter and keeps reading.

use crate::{ChannelError, FeedMessage, Result};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::marker::PhantomData;

/// Decoder that turns raw transport payloads into typed messages
///
/// # Example
///
/// ```ignore
/// struct ScoreDecoder;
///
/// impl FeedDecoder for ScoreDecoder {
///     type Message = ScoreUpdate;
///
///     fn decode(&self, message: &FeedMessage) -> Result<Self::Message> {
///         serde_json::from_slice(message.as_bytes())
///             .map_err(|e| ChannelError::Decoding(e.to_string()))
///     }
/// }
/// ```
pub trait FeedDecoder: Send + Sync + 'static {
    /// The decoded message type
    type Message: Send + Debug + 'static;

    /// Decode a raw payload
    ///
    /// # Performance
    /// This is on the hot path, called for every pushed payload.
    fn decode(&self, message: &FeedMessage) -> Result<Self::Message>;
}

/// Decoder for routes whose payload is a single JSON document of type `T`
pub struct JsonDecoder<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FeedDecoder for JsonDecoder<T>
where
    T: DeserializeOwned + Send + Debug + 'static,
{
    type Message = T;

    fn decode(&self, message: &FeedMessage) -> Result<T> {
        serde_json::from_slice(message.as_bytes()).map_err(|e| ChannelError::Decoding(e.to_string()))
    }
}
