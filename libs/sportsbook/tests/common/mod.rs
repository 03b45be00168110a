//! Common test utilities for Sportsbook integration tests
//!
//! Every feed runs over `ReplayTransport`; payloads mirror the aggregator
//! and socket wire formats.

#![allow(dead_code)]

use feedsockets::{ChannelConfig, Connector, FeedChannel, ReplayTransport};
use serde_json::{json, Value};
use sportsbook::{
    EntityId, EveryMatrixDecoder, SportRadarDecoder, SportsbookConfig, SportsbookFacade,
};
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

pub const DUMP_PATH: &str = "/sports#initialDump";
pub const ALL_SPORTS: &str = "/sports/allSports";
pub const LIVE_SPORTS: &str = "/sports/liveSports";

pub fn config(order: &[&str]) -> SportsbookConfig {
    let mut config: SportsbookConfig =
        serde_yaml::from_str("operator_id: \"4093\"\n").expect("valid config");
    config.main_markets_order = order.iter().map(|s| s.to_string()).collect();
    config
}

pub fn id(value: &str) -> EntityId {
    EntityId::new(value)
}

/// Facade over a fresh replay transport
pub fn facade(order: &[&str]) -> (Arc<ReplayTransport>, SportsbookFacade) {
    let transport = Arc::new(ReplayTransport::new());
    let channel = Arc::new(FeedChannel::new(
        Connector::wamp(transport.clone()),
        EveryMatrixDecoder::new(),
        ChannelConfig::new("everymatrix").with_initial_dump_timeout(Duration::from_secs(2)),
    ));
    let facade = SportsbookFacade::new(&config(order), channel, None);
    (transport, facade)
}

pub fn sportradar_channel(
    token: &str,
) -> (Arc<ReplayTransport>, Arc<FeedChannel<SportRadarDecoder>>) {
    let transport = Arc::new(ReplayTransport::new());
    let channel = Arc::new(FeedChannel::new(
        Connector::socket_rest(transport.clone(), token),
        SportRadarDecoder::new(),
        ChannelConfig::new("sportradar"),
    ));
    (transport, channel)
}

// =============================================================================
// EveryMatrix payloads
// =============================================================================

pub fn initial_dump(records: Vec<Value>) -> Value {
    json!({
        "version": "1.0",
        "format": "AGGREGATOR",
        "messageType": "INITIAL_DUMP",
        "records": records
    })
}

pub fn update(records: Vec<Value>) -> Value {
    json!({
        "version": "1.0",
        "format": "AGGREGATOR",
        "messageType": "UPDATE",
        "records": records
    })
}

pub fn match_record(match_id: &str, tournament: &str) -> Value {
    json!({"_type": "MATCH", "id": match_id, "sportId": "1", "parentId": tournament,
           "parentName": "Primeira Liga", "homeParticipantName": "Benfica",
           "awayParticipantName": "Porto", "statusId": "1", "numberOfMarkets": 3})
}

pub fn market_record(market_id: &str, match_id: &str, type_id: &str) -> Value {
    json!({"_type": "MARKET", "id": market_id, "eventId": match_id,
           "bettingTypeId": type_id, "shortName": type_id, "isAvailable": true})
}

pub fn outcome_record(outcome_id: &str, match_id: &str, key: &str) -> Value {
    json!({"_type": "OUTCOME", "id": outcome_id, "eventId": match_id, "headerNameKey": key})
}

pub fn relation(market_id: &str, outcome_id: &str) -> Value {
    json!({"_type": "MARKET_OUTCOME_RELATION", "id": format!("{}-{}", market_id, outcome_id),
           "marketId": market_id, "outcomeId": outcome_id})
}

pub fn offer_record(offer_id: &str, outcome_id: &str, odds: f64) -> Value {
    json!({"_type": "BETTING_OFFER", "id": offer_id, "outcomeId": outcome_id, "odds": odds,
           "statusId": "1", "isAvailable": true})
}

/// Match "123" with one 1X2 market: home 1.5, draw 3.5, away 5.0
pub fn match_123_dump() -> Value {
    initial_dump(vec![
        match_record("123", "t1"),
        market_record("m1", "123", "1X2"),
        outcome_record("o3", "123", "away"),
        outcome_record("o1", "123", "home"),
        outcome_record("o2", "123", "draw"),
        relation("m1", "o1"),
        relation("m1", "o2"),
        relation("m1", "o3"),
        offer_record("b1", "o1", 1.5),
        offer_record("b2", "o2", 3.5),
        offer_record("b3", "o3", 5.0),
    ])
}

pub fn odds_update(offer_id: &str, odds: f64) -> Value {
    update(vec![json!({"changeType": "UPDATE", "entityType": "BETTING_OFFER",
                       "id": offer_id, "changedProperties": {"odds": odds}})])
}

pub fn market_availability(market_id: &str, available: bool) -> Value {
    update(vec![json!({"changeType": "UPDATE", "entityType": "MARKET",
                       "id": market_id, "changedProperties": {"isAvailable": available}})])
}

// =============================================================================
// SportRadar payloads
// =============================================================================

pub fn sports_list(content_type: &str, sports: Value) -> Value {
    json!({
        "notificationType": "CONTENT_CHANGES",
        "data": [{"contentId": {"type": content_type, "id": content_type}, "change": sports}]
    })
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
