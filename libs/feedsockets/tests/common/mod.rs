//! Common test utilities for FeedSockets integration tests
//!
//! Channels here always run over `ReplayTransport`.

#![allow(dead_code)]

use feedsockets::{
    ChannelConfig, ChannelEvent, ChannelStream, Connector, FeedChannel, JsonDecoder,
    ReplayTransport, Result,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

pub const MATCH_ROUTE: &str = "/sports/4093/en/match-aggregator/123";
pub const DUMP_ROUTE: &str = "/sports/4093/en/match-aggregator/123/dump";

/// Minimal typed payload used by channel tests
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

pub fn score(home: u32, away: u32) -> String {
    format!(r#"{{"home":{},"away":{}}}"#, home, away)
}

pub type ScoreChannel = FeedChannel<JsonDecoder<Score>>;

/// WAMP-style channel over a fresh replay transport
pub fn wamp_channel() -> (Arc<ReplayTransport>, ScoreChannel) {
    let transport = Arc::new(ReplayTransport::new());
    let channel = FeedChannel::new(
        Connector::wamp(transport.clone()),
        JsonDecoder::new(),
        ChannelConfig::new("test").with_initial_dump_timeout(Duration::from_secs(2)),
    );
    (transport, channel)
}

/// Socket+REST channel over a fresh replay transport
pub fn socket_rest_channel(token: &str) -> (Arc<ReplayTransport>, ScoreChannel) {
    let transport = Arc::new(ReplayTransport::new());
    let channel = FeedChannel::new(
        Connector::socket_rest(transport.clone(), token),
        JsonDecoder::new(),
        ChannelConfig::new("test-sr"),
    );
    (transport, channel)
}

/// Next event, failing the test if nothing arrives within a second
pub async fn next_event(stream: &mut ChannelStream<Score>) -> Option<Result<ChannelEvent<Score>>> {
    tokio::time::timeout(Duration::from_secs(1), stream.recv())
        .await
        .expect("timed out waiting for channel event")
}

/// Yield to spawned tasks until `condition` holds
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}
