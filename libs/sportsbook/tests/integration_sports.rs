//! Sports merger tests over the socket-rest connector

mod common;

use common::*;
use serde_json::json;
use sportsbook::{FeedError, FeedHealth, SportRadarRoutes, SportsMerger, Subscribable};
use std::time::Duration;

async fn wait_for<T: Clone>(
    rx: &mut tokio::sync::watch::Receiver<T>,
    predicate: impl FnMut(&T) -> bool,
) -> T {
    tokio::time::timeout(Duration::from_secs(1), rx.wait_for(predicate))
        .await
        .expect("value not published in time")
        .expect("publisher dropped")
        .clone()
}

fn live_football(sports: &Subscribable<Vec<sportsbook::Sport>>, count: u32) -> bool {
    sports
        .content()
        .and_then(|list| list.iter().find(|s| s.merge_key() == "FBL"))
        .map(|s| s.number_live_events == count)
        .unwrap_or(false)
}

#[tokio::test]
async fn test_live_counts_survive_all_sports_updates() {
    let (transport, channel) = sportradar_channel("token-1");
    transport.push(
        ALL_SPORTS,
        sports_list("allSports", json!([
            {"idfosporttype": "FBL", "idfosport": 1, "sporttypename": "Football", "numEvents": 120},
            {"idfosporttype": "TEN", "idfosport": 5, "sporttypename": "Tennis", "numEvents": 40}
        ])),
    );
    transport.push(
        LIVE_SPORTS,
        sports_list("liveSports", json!([
            {"idfosporttype": "FBL", "idfosport": 1, "sporttypename": "Football", "numEvents": 5}
        ])),
    );

    let merger = SportsMerger::start(channel, SportRadarRoutes::default()).await;
    let mut sports = merger.sports_publisher();
    let merged = wait_for(&mut sports, |s| live_football(s, 5)).await;
    let list = merged.content().unwrap();
    verbose_println!("  merged: {:?}", list);
    assert_eq!(list[0].name, "Football");
    assert_eq!(list[0].number_events, 120);
    assert_eq!(list[1].number_live_events, 0);

    // All-sports update carries no live count
    transport.push(
        ALL_SPORTS,
        sports_list("allSports", json!([
            {"idfosporttype": "FBL", "idfosport": 1, "sporttypename": "Football", "numEvents": 121}
        ])),
    );
    let merged = wait_for(&mut sports, |s| {
        s.content().map(|list| list.len() == 1).unwrap_or(false)
    })
    .await;
    let football = &merged.content().unwrap()[0];
    assert_eq!(football.number_events, 121);
    assert_eq!(football.number_live_events, 5);
    assert_eq!(*merger.health().borrow(), FeedHealth::Healthy);

    // Session token is appended by the connector
    let handle = transport.active_handle(ALL_SPORTS).unwrap();
    assert_eq!(handle.route().as_str(), "/sports/allSports?sessionToken=token-1");
}

#[tokio::test]
async fn test_all_sports_failure_is_terminal() {
    let (transport, channel) = sportradar_channel("token-1");
    transport.reject_subscriptions(ALL_SPORTS);

    let merger = SportsMerger::start(channel, SportRadarRoutes::default()).await;
    let state = merger.sports_publisher().borrow().clone();
    assert!(matches!(state, Subscribable::Failed(FeedError::Terminal(_))));
    // Live feed is never opened without a base list
    assert_eq!(transport.subscribe_count(LIVE_SPORTS), 0);
}

#[tokio::test]
async fn test_live_failure_degrades_with_zero_counts() {
    let (transport, channel) = sportradar_channel("token-1");
    transport.reject_subscriptions(LIVE_SPORTS);
    transport.push(
        ALL_SPORTS,
        sports_list("allSports", json!([
            {"idfosporttype": "FBL", "idfosport": 1, "sporttypename": "Football", "numEvents": 120}
        ])),
    );

    let merger = SportsMerger::start(channel, SportRadarRoutes::default()).await;
    assert!(matches!(*merger.health().borrow(), FeedHealth::Degraded(_)));

    let mut sports = merger.sports_publisher();
    let merged = wait_for(&mut sports, |s| s.content().is_some()).await;
    assert_eq!(merged.content().unwrap()[0].number_live_events, 0);
    assert!(!merged.is_failed());
}

#[tokio::test]
async fn test_single_sport_update_then_reconnect() {
    let (transport, channel) = sportradar_channel("token-1");
    transport.push(
        ALL_SPORTS,
        sports_list("allSports", json!([
            {"idfosporttype": "FBL", "idfosport": 1, "sporttypename": "Football", "numEvents": 120}
        ])),
    );
    transport.push(
        LIVE_SPORTS,
        sports_list("liveSports", json!([
            {"idfosporttype": "FBL", "idfosport": 1, "numEvents": 5}
        ])),
    );

    let merger = SportsMerger::start(channel, SportRadarRoutes::default()).await;
    let mut sports = merger.sports_publisher();
    wait_for(&mut sports, |s| live_football(s, 5)).await;

    merger.update_live_count("1", 8);
    wait_for(&mut sports, |s| live_football(s, 8)).await;

    merger.reconnect("token-2").await;
    let handle = transport.active_handle(LIVE_SPORTS).unwrap();
    assert_eq!(handle.route().as_str(), "/sports/liveSports?sessionToken=token-2");
    merger.stop().await;
}

#[tokio::test]
async fn test_failed_merger_stays_failed_until_reconnect() {
    let (transport, channel) = sportradar_channel("token-1");
    transport.push(
        ALL_SPORTS,
        sports_list("allSports", json!([
            {"idfosporttype": "FBL", "idfosport": 1, "sporttypename": "Football", "numEvents": 120}
        ])),
    );

    let merger = SportsMerger::start(channel, SportRadarRoutes::default()).await;
    let mut sports = merger.sports_publisher();
    wait_for(&mut sports, |s| s.content().is_some()).await;

    transport.reject_subscriptions(ALL_SPORTS);
    merger.reconnect("token-2").await;
    assert!(sports.borrow_and_update().is_failed());

    // Single-sport updates never resurrect the stale base list
    merger.update_live_count("1", 9);
    merger.update_event_count("1", 130);
    assert!(!sports.has_changed().unwrap());
    assert!(sports.borrow().is_failed());
}

#[tokio::test]
async fn test_live_disconnect_degrades_until_resubscribed() {
    let (transport, channel) = sportradar_channel("token-1");
    transport.push(
        ALL_SPORTS,
        sports_list("allSports", json!([
            {"idfosporttype": "FBL", "idfosport": 1, "sporttypename": "Football", "numEvents": 120}
        ])),
    );
    transport.push(
        LIVE_SPORTS,
        sports_list("liveSports", json!([
            {"idfosporttype": "FBL", "idfosport": 1, "numEvents": 5}
        ])),
    );

    let merger = SportsMerger::start(channel, SportRadarRoutes::default()).await;
    let mut sports = merger.sports_publisher();
    let mut health = merger.health();
    wait_for(&mut sports, |s| live_football(s, 5)).await;

    transport.drop_connection(LIVE_SPORTS);
    wait_for(&mut health, |h| matches!(h, FeedHealth::Degraded(_))).await;
    wait_for(&mut sports, |s| live_football(s, 0)).await;

    transport.restore_connection(LIVE_SPORTS).unwrap();
    transport.push(
        LIVE_SPORTS,
        sports_list("liveSports", json!([
            {"idfosporttype": "FBL", "idfosport": 1, "numEvents": 6}
        ])),
    );
    wait_for(&mut sports, |s| live_football(s, 6)).await;
    assert_eq!(*health.borrow(), FeedHealth::Healthy);
}
