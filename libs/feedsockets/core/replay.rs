//! Scripted in-process transport
//!
//! Delivers pushes, one-shot responses, disconnects and reconnects exactly
//! when told to. Routes are matched by path, so a session-token query added
//! by a `SocketRest` connector does not affect matching.

use crate::core::route::Route;
use crate::traits::*;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::sync::Notify;
use tracing::debug;

/// Kind of a recorded frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayKind {
    /// Server push on a subscribed route
    Push,
    /// Response to a one-shot request
    Response,
}

/// One line of a JSON-lines recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayRecord {
    pub route: Route,
    pub kind: ReplayKind,
    pub payload: serde_json::Value,
}

enum ScriptedResponse {
    Ready(Result<FeedMessage>),
    Gated(Arc<Notify>, Result<FeedMessage>),
}

struct Subscriber {
    handle: SubscriptionHandle,
    tx: UnboundedSender<TransportFrame>,
}

#[derive(Default)]
struct ReplayState {
    subscribers: HashMap<String, Subscriber>,
    pending: HashMap<String, Vec<TransportFrame>>,
    responses: HashMap<String, VecDeque<ScriptedResponse>>,
    rejected: HashSet<String>,
    subscribe_counts: HashMap<String, usize>,
    unsubscribed: Vec<SubscriptionHandle>,
}

/// Transport driven by a script instead of a socket
pub struct ReplayTransport {
    connected: AtomicBool,
    next_handle: AtomicU64,
    state: Mutex<ReplayState>,
}

impl ReplayTransport {
    /// Create a connected transport with an empty script
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            next_handle: AtomicU64::new(1),
            state: Mutex::new(ReplayState::default()),
        }
    }

    /// Build a transport from a JSON-lines recording
    ///
    /// Blank lines are skipped. Pushes are queued until their route is
    /// subscribed; responses answer requests in recording order.
    pub fn from_json_lines(text: &str) -> Result<Self> {
        let transport = Self::new();
        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: ReplayRecord = serde_json::from_str(line).map_err(|e| {
                ChannelError::Decoding(format!("recording line {}: {}", index + 1, e))
            })?;
            transport.load(record);
        }
        Ok(transport)
    }

    /// Add one recorded frame to the script
    pub fn load(&self, record: ReplayRecord) {
        match record.kind {
            ReplayKind::Push => self.push(record.route, record.payload),
            ReplayKind::Response => self.respond(record.route, record.payload),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    /// Push a payload on a route, or queue it until the route is subscribed
    pub fn push(&self, route: impl Into<Route>, message: impl Into<FeedMessage>) {
        self.send_frame(&route.into(), TransportFrame::Message(message.into()));
    }

    /// Script the next response for requests on `route`
    pub fn respond(&self, route: impl Into<Route>, message: impl Into<FeedMessage>) {
        self.script(&route.into(), ScriptedResponse::Ready(Ok(message.into())));
    }

    /// Script a server-side failure for the next request on `route`
    pub fn fail_request(&self, route: impl Into<Route>, reason: &str) {
        self.script(
            &route.into(),
            ScriptedResponse::Ready(Err(ChannelError::Request(reason.to_string()))),
        );
    }

    /// Script a response that is held back until the returned gate is notified
    pub fn respond_gated(&self, route: impl Into<Route>, message: impl Into<FeedMessage>) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script(
            &route.into(),
            ScriptedResponse::Gated(Arc::clone(&gate), Ok(message.into())),
        );
        gate
    }

    /// Reject every subscribe on `route`
    pub fn reject_subscriptions(&self, route: impl Into<Route>) {
        self.state.lock().rejected.insert(route.into().path().to_string());
    }

    /// Signal a lost connection to the subscriber of `route`
    pub fn drop_connection(&self, route: impl Into<Route>) {
        self.send_frame(&route.into(), TransportFrame::Disconnected);
    }

    /// Signal a restored connection under a fresh handle
    pub fn restore_connection(&self, route: impl Into<Route>) -> Option<SubscriptionHandle> {
        let route = route.into();
        let mut state = self.state.lock();
        let subscriber = state.subscribers.get_mut(route.path())?;
        let handle = SubscriptionHandle::new(self.next_id(), subscriber.handle.route().clone());
        subscriber.handle = handle.clone();
        let _ = subscriber.tx.send(TransportFrame::Reconnected(handle.clone()));
        Some(handle)
    }

    /// End the subscription on `route` from the server side
    pub fn end(&self, route: impl Into<Route>) {
        self.state.lock().subscribers.remove(route.into().path());
    }

    pub fn subscribe_count(&self, route: impl Into<Route>) -> usize {
        self.state
            .lock()
            .subscribe_counts
            .get(route.into().path())
            .copied()
            .unwrap_or(0)
    }

    /// Responses still waiting for a request on `route`
    pub fn scripted_responses(&self, route: impl Into<Route>) -> usize {
        self.state
            .lock()
            .responses
            .get(route.into().path())
            .map(|queue| queue.len())
            .unwrap_or(0)
    }

    pub fn unsubscribed(&self) -> Vec<SubscriptionHandle> {
        self.state.lock().unsubscribed.clone()
    }

    pub fn active_handle(&self, route: impl Into<Route>) -> Option<SubscriptionHandle> {
        self.state
            .lock()
            .subscribers
            .get(route.into().path())
            .map(|s| s.handle.clone())
    }

    fn next_id(&self) -> String {
        format!("replay-{}", self.next_handle.fetch_add(1, Ordering::Relaxed))
    }

    fn script(&self, route: &Route, response: ScriptedResponse) {
        self.state
            .lock()
            .responses
            .entry(route.path().to_string())
            .or_default()
            .push_back(response);
    }

    fn send_frame(&self, route: &Route, frame: TransportFrame) {
        let mut state = self.state.lock();
        let key = route.path().to_string();
        if let Some(subscriber) = state.subscribers.get(&key) {
            if subscriber.tx.send(frame.clone()).is_ok() {
                return;
            }
            state.subscribers.remove(&key);
        }
        state.pending.entry(key).or_default().push(frame);
    }
}

impl Default for ReplayTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedTransport for ReplayTransport {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn subscribe(&self, route: &Route) -> Result<TransportSubscription> {
        if !self.is_connected() {
            return Err(ChannelError::NotConnected(route.to_string()));
        }

        let key = route.path().to_string();
        let mut state = self.state.lock();
        *state.subscribe_counts.entry(key.clone()).or_insert(0) += 1;
        if state.rejected.contains(&key) {
            return Err(ChannelError::Transport(format!("subscription to {} rejected", key)));
        }

        let handle = SubscriptionHandle::new(self.next_id(), route.clone());
        let (tx, frames) = unbounded_channel();
        for frame in state.pending.remove(&key).unwrap_or_default() {
            let _ = tx.send(frame);
        }
        state.subscribers.insert(
            key,
            Subscriber {
                handle: handle.clone(),
                tx,
            },
        );
        debug!("[Replay] Subscribed {}", handle);

        Ok(TransportSubscription { handle, frames })
    }

    async fn request(&self, route: &Route) -> Result<FeedMessage> {
        let scripted = self
            .state
            .lock()
            .responses
            .get_mut(route.path())
            .and_then(|queue| queue.pop_front());

        match scripted {
            Some(ScriptedResponse::Ready(result)) => result,
            Some(ScriptedResponse::Gated(gate, result)) => {
                gate.notified().await;
                result
            }
            None => Err(ChannelError::Request(format!(
                "no response scripted for {}",
                route.path()
            ))),
        }
    }

    async fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<()> {
        let mut state = self.state.lock();
        let key = handle.route().path().to_string();
        if state
            .subscribers
            .get(&key)
            .map(|s| &s.handle == handle)
            .unwrap_or(false)
        {
            state.subscribers.remove(&key);
        }
        state.unsubscribed.push(handle.clone());
        debug!("[Replay] Unsubscribed {}", handle);
        Ok(())
    }
}
