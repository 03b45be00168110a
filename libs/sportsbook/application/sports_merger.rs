//! Sports list merging
//!
//! Two SportRadar subscriptions feed one published list. The all-sports feed
//! owns names, codes and totals; the live-sports feed owns live counters.
//! Live counts are kept in a side table keyed by the sport's alpha code and
//! joined onto the base list every time either side changes, so the merged
//! list is always emitted whole.
//!
//! A failed all-sports feed is terminal: nothing is published over `Failed`
//! until `reconnect`. Losing the live feed only degrades health.

use crate::domain::Sport;
use crate::error::FeedError;
use crate::infrastructure::client::{
    SportListKind, SportRadarDecoder, SportRadarMessage, SportRadarRoutes,
};
use feedsockets::{ChannelEvent, ChannelStream, FeedChannel, Route, SubscriptionHandle};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// State of a published aggregate
#[derive(Debug, Clone, PartialEq)]
pub enum Subscribable<T> {
    Disconnected,
    /// Subscribed, nothing received yet
    Connected(SubscriptionHandle),
    Content(T),
    /// Terminal; the authoritative feed failed
    Failed(FeedError),
}

impl<T> Subscribable<T> {
    pub fn content(&self) -> Option<&T> {
        match self {
            Subscribable::Content(content) => Some(content),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Subscribable::Failed(_))
    }
}

/// Health of the non-authoritative feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedHealth {
    Healthy,
    /// Live counters unavailable; serving all-sports data with zero live counts
    Degraded(String),
}

// =============================================================================
// Merge state
// =============================================================================

/// Base list plus live side table
#[derive(Debug, Default, Clone)]
pub struct SportsMergeState {
    base: Option<Vec<Sport>>,
    live_counts: HashMap<String, u32>,
    /// Numeric ID to merge key, learned from the live list
    live_keys: HashMap<String, String>,
}

impl SportsMergeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_base(&self) -> bool {
        self.base.is_some()
    }

    pub fn live_count(&self, merge_key: &str) -> Option<u32> {
        self.live_counts.get(merge_key).copied()
    }

    /// Replace the base list; returns the merged list
    pub fn apply_all(&mut self, sports: Vec<Sport>) -> Vec<Sport> {
        self.base = Some(sports);
        self.merged().unwrap_or_default()
    }

    /// Replace the live side table
    ///
    /// Sports missing from the base list keep their count until the base
    /// list includes them. Returns `None` until a base list exists.
    pub fn apply_live(&mut self, sports: Vec<Sport>) -> Option<Vec<Sport>> {
        self.live_counts.clear();
        for sport in sports {
            let key = sport.merge_key().to_string();
            if let Some(numeric_id) = &sport.numeric_id {
                self.live_keys.insert(numeric_id.clone(), key.clone());
            }
            self.live_counts.insert(key, sport.number_live_events);
        }
        self.merged()
    }

    /// Forget every live count
    pub fn clear_live(&mut self) -> Option<Vec<Sport>> {
        self.live_counts.clear();
        self.merged()
    }

    /// Set one sport's total event count
    pub fn update_event_count(&mut self, numeric_id: &str, count: u32) -> Option<Vec<Sport>> {
        let sport = self
            .base
            .as_mut()?
            .iter_mut()
            .find(|sport| sport.numeric_id.as_deref() == Some(numeric_id))?;
        if sport.number_events == count {
            return None;
        }
        sport.number_events = count;
        self.merged()
    }

    /// Set one sport's live count
    pub fn update_live_count(&mut self, numeric_id: &str, count: u32) -> Option<Vec<Sport>> {
        let key = self.merge_key_for(numeric_id)?;
        if self.live_counts.get(&key) == Some(&count) {
            return None;
        }
        self.live_counts.insert(key, count);
        self.merged()
    }

    /// Base list with live counts joined in; absent sports count zero
    pub fn merged(&self) -> Option<Vec<Sport>> {
        let base = self.base.as_ref()?;
        Some(
            base.iter()
                .map(|sport| Sport {
                    number_live_events: self
                        .live_counts
                        .get(sport.merge_key())
                        .copied()
                        .unwrap_or(0),
                    ..sport.clone()
                })
                .collect(),
        )
    }

    fn merge_key_for(&self, numeric_id: &str) -> Option<String> {
        self.base
            .iter()
            .flatten()
            .find(|sport| sport.numeric_id.as_deref() == Some(numeric_id))
            .map(|sport| sport.merge_key().to_string())
            .or_else(|| self.live_keys.get(numeric_id).cloned())
    }
}

// =============================================================================
// Merger
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FeedRole {
    AllSports,
    LiveSports,
}

impl FeedRole {
    fn label(&self) -> &'static str {
        match self {
            FeedRole::AllSports => "all sports",
            FeedRole::LiveSports => "live sports",
        }
    }
}

struct MergerShared {
    state: Mutex<SportsMergeState>,
    sports: watch::Sender<Subscribable<Vec<Sport>>>,
    health: watch::Sender<FeedHealth>,
    tasks: Mutex<HashMap<FeedRole, JoinHandle<()>>>,
}

impl MergerShared {
    /// Publish a merged list unless the merger has failed
    fn publish(&self, merged: Option<Vec<Sport>>) {
        let Some(sports) = merged else {
            return;
        };
        let count = sports.len();
        let published = self.sports.send_if_modified(|current| {
            if current.is_failed() {
                false
            } else {
                *current = Subscribable::Content(sports);
                true
            }
        });
        if published {
            debug!("[Merger] Publishing {} sports", count);
        } else {
            debug!("[Merger] Failed, dropping update of {} sports", count);
        }
    }

    /// Terminal until `reconnect`; the live feed is torn down with it
    fn fail(&self, reason: String) {
        error!("[Merger] All-sports feed failed: {}", reason);
        if let Some(live) = self.tasks.lock().remove(&FeedRole::LiveSports) {
            live.abort();
        }
        self.sports
            .send_replace(Subscribable::Failed(FeedError::Terminal(reason)));
    }

    fn degrade(&self, reason: String) {
        warn!(
            "[Merger] Live-sports feed unavailable, serving zero live counts: {}",
            reason
        );
        self.health.send_replace(FeedHealth::Degraded(reason));
        let merged = self.state.lock().clear_live();
        self.publish(merged);
    }

    fn apply(&self, message: SportRadarMessage) {
        match message {
            SportRadarMessage::Sports { kind, sports } => {
                let mut state = self.state.lock();
                let merged = match kind {
                    SportListKind::All => Some(state.apply_all(sports)),
                    SportListKind::Live => state.apply_live(sports),
                };
                self.publish(merged);
            }
            SportRadarMessage::Content(_) => {
                debug!("[Merger] Ignoring non-sports content");
            }
            SportRadarMessage::Ignored => {}
        }
    }
}

/// Publishes the merged sports list
pub struct SportsMerger {
    channel: Arc<FeedChannel<SportRadarDecoder>>,
    routes: SportRadarRoutes,
    shared: Arc<MergerShared>,
}

impl SportsMerger {
    /// Subscribe both sports feeds
    ///
    /// A failed all-sports subscription is published as `Failed`; a failed
    /// live subscription only degrades health.
    pub async fn start(channel: Arc<FeedChannel<SportRadarDecoder>>, routes: SportRadarRoutes) -> Self {
        let (sports, _) = watch::channel(Subscribable::Disconnected);
        let (health, _) = watch::channel(FeedHealth::Healthy);
        let merger = Self {
            channel,
            routes,
            shared: Arc::new(MergerShared {
                state: Mutex::new(SportsMergeState::new()),
                sports,
                health,
                tasks: Mutex::new(HashMap::new()),
            }),
        };
        merger.subscribe_all().await;
        merger
    }

    pub fn sports_publisher(&self) -> watch::Receiver<Subscribable<Vec<Sport>>> {
        self.shared.sports.subscribe()
    }

    pub fn health(&self) -> watch::Receiver<FeedHealth> {
        self.shared.health.subscribe()
    }

    /// Current merged list, if the base list has arrived
    pub fn sports(&self) -> Option<Vec<Sport>> {
        self.shared.state.lock().merged()
    }

    pub fn update_event_count(&self, numeric_id: &str, count: u32) {
        let merged = self.shared.state.lock().update_event_count(numeric_id, count);
        self.shared.publish(merged);
    }

    pub fn update_live_count(&self, numeric_id: &str, count: u32) {
        let merged = self.shared.state.lock().update_live_count(numeric_id, count);
        self.shared.publish(merged);
    }

    /// Resubscribe both feeds under a new session token
    ///
    /// Clears a terminal failure so the new subscriptions can publish.
    pub async fn reconnect(&self, session_token: &str) {
        info!("[Merger] Reconnecting sports feeds with a new session token");
        self.abort_tasks();
        self.channel.set_session_token(session_token);
        self.shared.health.send_replace(FeedHealth::Healthy);
        self.shared.sports.send_if_modified(|current| {
            if current.is_failed() {
                *current = Subscribable::Disconnected;
                true
            } else {
                false
            }
        });
        self.subscribe_all().await;
    }

    pub async fn stop(&self) {
        self.abort_tasks();
        for route in [self.routes.all_sports(), self.routes.live_sports()] {
            if let Err(e) = self.channel.close(route).await {
                warn!("[Merger] Failed to close {}: {}", route, e);
            }
        }
    }

    async fn subscribe_all(&self) {
        match self.channel.open(self.routes.all_sports().clone(), None).await {
            Ok(stream) => self.spawn(FeedRole::AllSports, stream),
            Err(e) => {
                self.shared.fail(format!("{}: {}", self.routes.all_sports(), e));
                return;
            }
        }

        match self.channel.open(self.routes.live_sports().clone(), None).await {
            Ok(stream) => self.spawn(FeedRole::LiveSports, stream),
            Err(e) => self
                .shared
                .degrade(format!("{}: {}", self.routes.live_sports(), e)),
        }
    }

    fn spawn(&self, role: FeedRole, stream: ChannelStream<SportRadarMessage>) {
        let route = stream.route().clone();
        let task = tokio::spawn(run_feed(role, route, stream, Arc::clone(&self.shared)));
        if let Some(previous) = self.shared.tasks.lock().insert(role, task) {
            previous.abort();
        }
    }

    fn abort_tasks(&self) {
        for (_, task) in self.shared.tasks.lock().drain() {
            task.abort();
        }
    }
}

impl Drop for SportsMerger {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

async fn run_feed(
    role: FeedRole,
    route: Route,
    mut stream: ChannelStream<SportRadarMessage>,
    shared: Arc<MergerShared>,
) {
    while let Some(event) = stream.recv().await {
        match event {
            Ok(ChannelEvent::Connected(handle)) => {
                info!("[Merger] {} subscribed ({})", role.label(), handle);
                if role == FeedRole::AllSports {
                    shared.sports.send_if_modified(|current| {
                        if matches!(current, Subscribable::Disconnected) {
                            *current = Subscribable::Connected(handle);
                            true
                        } else {
                            false
                        }
                    });
                }
            }
            Ok(ChannelEvent::InitialContent(message)) | Ok(ChannelEvent::UpdatedContent(message)) => {
                if role == FeedRole::LiveSports {
                    shared.health.send_if_modified(|health| {
                        if *health != FeedHealth::Healthy {
                            *health = FeedHealth::Healthy;
                            true
                        } else {
                            false
                        }
                    });
                }
                shared.apply(message);
            }
            Ok(ChannelEvent::Disconnected) => {
                warn!("[Merger] {} disconnected on {}", role.label(), route);
                if role == FeedRole::LiveSports {
                    shared.degrade(format!("{}: disconnected", route));
                }
            }
            Err(e) => {
                match role {
                    FeedRole::AllSports => shared.fail(format!("{}: {}", route, e)),
                    FeedRole::LiveSports => shared.degrade(format!("{}: {}", route, e)),
                }
                return;
            }
        }
    }
    debug!("[Merger] {} stream on {} ended", role.label(), route);
    if role == FeedRole::LiveSports {
        shared.degrade(format!("{}: stream ended", route));
    }
}
