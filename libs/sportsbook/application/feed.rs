//! Feed lifecycle
//!
//! `start(route)` opens a channel subscription, waits for the transport to
//! confirm it, then pumps decoded content into the store writer tagged with
//! a fresh generation. `stop(handle)` retires that generation first, so
//! anything still queued for the route is discarded, then releases the
//! subscription. State already applied is kept.
//!
//! Every started feed publishes a [`FeedStatus`]. A failed initial dump ends
//! the feed and leaves `Failed` on that stream until the feed is stopped or
//! restarted.

use crate::domain::IntoFeedContent;
use crate::error::{FeedError, Result};
use crate::infrastructure::store::{ContentKind, WriterHandle};
use feedsockets::{ChannelEvent, ChannelStream, FeedChannel, FeedDecoder, Route, SubscriptionHandle};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Lifecycle of one started feed
#[derive(Debug, Clone, PartialEq)]
pub enum FeedStatus {
    /// Subscribed, initial content not received yet
    Pending,
    /// Initial content handed to the store
    Live,
    /// Transport dropped; last known state is kept
    Disconnected,
    /// Terminal; the feed no longer updates the store
    Failed(FeedError),
}

impl FeedStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, FeedStatus::Failed(_))
    }
}

struct ActiveFeed {
    generation: u64,
    handle: SubscriptionHandle,
    status: watch::Sender<FeedStatus>,
    task: JoinHandle<()>,
}

/// Connects one channel to the store writer
pub struct FeedService<D: FeedDecoder> {
    channel: Arc<FeedChannel<D>>,
    writer: WriterHandle,
    feeds: Mutex<HashMap<Route, ActiveFeed>>,
}

impl<D> FeedService<D>
where
    D: FeedDecoder,
    D::Message: IntoFeedContent,
{
    pub fn new(channel: Arc<FeedChannel<D>>, writer: WriterHandle) -> Self {
        Self {
            channel,
            writer,
            feeds: Mutex::new(HashMap::new()),
        }
    }

    pub fn channel(&self) -> &Arc<FeedChannel<D>> {
        &self.channel
    }

    /// Subscribe `route` and feed its content into the store
    ///
    /// `initial` is the one-shot dump route, if the feed has one. `list`
    /// tags the initial dump as a named match list.
    ///
    /// # Errors
    /// - channel errors from `open` (`NotConnected`, `Superseded`, transport)
    /// - `NotConfirmed` if the stream ends before the subscription is confirmed
    pub async fn start(
        &self,
        route: Route,
        initial: Option<Route>,
        list: Option<String>,
    ) -> Result<SubscriptionHandle> {
        let generation = self.writer.begin(&route);

        let mut stream = match self.channel.open(route.clone(), initial).await {
            Ok(stream) => stream,
            Err(e) => {
                self.writer.retire(&route, Some(generation));
                return Err(e.into());
            }
        };

        let handle = match stream.recv().await {
            Some(Ok(ChannelEvent::Connected(handle))) => handle,
            Some(Err(e)) => {
                self.writer.retire(&route, Some(generation));
                return Err(e.into());
            }
            _ => {
                self.writer.retire(&route, Some(generation));
                return Err(FeedError::NotConfirmed(route.to_string()));
            }
        };
        info!("[Feed] {} started ({})", route, handle);

        let (status, _) = watch::channel(FeedStatus::Pending);
        let pump = FeedPump {
            route: route.clone(),
            generation,
            list,
            writer: self.writer.clone(),
            status: status.clone(),
        };
        let task = tokio::spawn(pump.run(stream));

        let feed = ActiveFeed {
            generation,
            handle: handle.clone(),
            status,
            task,
        };
        let previous = self.feeds.lock().insert(route, feed);
        if let Some(previous) = previous {
            previous.task.abort();
        }

        Ok(handle)
    }

    /// Stop the feed a handle belongs to
    ///
    /// Also accepts the handle of a feed that already failed.
    pub async fn stop(&self, handle: &SubscriptionHandle) -> Result<()> {
        let route = self
            .channel
            .route_for_handle(handle)
            .or_else(|| self.route_for_handle(handle))
            .ok_or_else(|| FeedError::UnknownHandle(handle.to_string()))?;
        self.stop_route(&route).await
    }

    /// Status stream of the feed started with `handle`
    pub fn status(&self, handle: &SubscriptionHandle) -> Option<watch::Receiver<FeedStatus>> {
        self.feeds
            .lock()
            .values()
            .find(|feed| &feed.handle == handle)
            .map(|feed| feed.status.subscribe())
    }

    /// Status stream of the feed on `route`
    pub fn route_status(&self, route: &Route) -> Option<watch::Receiver<FeedStatus>> {
        self.feeds.lock().get(route).map(|feed| feed.status.subscribe())
    }

    fn route_for_handle(&self, handle: &SubscriptionHandle) -> Option<Route> {
        self.feeds
            .lock()
            .iter()
            .find(|(_, feed)| &feed.handle == handle)
            .map(|(route, _)| route.clone())
    }

    /// Stop the feed on `route`; a no-op when none is active
    pub async fn stop_route(&self, route: &Route) -> Result<()> {
        self.writer.retire(route, None);
        if let Some(feed) = self.feeds.lock().remove(route) {
            feed.task.abort();
            debug!("[Feed] {} stopped at generation {}", route, feed.generation);
        }
        self.channel.close(route).await?;
        Ok(())
    }

    pub async fn stop_all(&self) {
        let routes: Vec<Route> = self.feeds.lock().keys().cloned().collect();
        for route in routes {
            if let Err(e) = self.stop_route(&route).await {
                warn!("[Feed] Failed to stop {}: {}", route, e);
            }
        }
    }

    pub fn active_routes(&self) -> Vec<Route> {
        self.feeds.lock().keys().cloned().collect()
    }

    pub fn is_active(&self, route: &Route) -> bool {
        self.feeds
            .lock()
            .get(route)
            .map(|feed| self.writer.is_current(route, feed.generation))
            .unwrap_or(false)
    }
}

/// Moves one subscription's content into the writer queue, in order
struct FeedPump {
    route: Route,
    generation: u64,
    list: Option<String>,
    writer: WriterHandle,
    status: watch::Sender<FeedStatus>,
}

impl FeedPump {
    async fn run<M: IntoFeedContent>(self, mut stream: ChannelStream<M>) {
        while let Some(event) = stream.recv().await {
            let submitted = match event {
                Ok(ChannelEvent::InitialContent(message)) => {
                    let kind = ContentKind::Initial {
                        list: self.list.clone(),
                    };
                    let submitted = self.submit(kind, message);
                    if submitted {
                        self.set_status(FeedStatus::Live);
                    }
                    submitted
                }
                Ok(ChannelEvent::UpdatedContent(message)) => {
                    self.submit(ContentKind::Update, message)
                }
                Ok(ChannelEvent::Connected(handle)) => {
                    info!("[Feed] {} resubscribed ({})", self.route, handle);
                    self.set_status(FeedStatus::Pending);
                    true
                }
                Ok(ChannelEvent::Disconnected) => {
                    warn!("[Feed] {} disconnected; keeping last known state", self.route);
                    self.set_status(FeedStatus::Disconnected);
                    true
                }
                Err(e) => {
                    error!("[Feed] {} failed: {}", self.route, e);
                    self.set_status(FeedStatus::Failed(FeedError::Channel(e)));
                    false
                }
            };
            if !submitted {
                break;
            }
        }
        self.writer.retire(&self.route, Some(self.generation));
        debug!("[Feed] Pump for {} finished", self.route);
    }

    fn submit<M: IntoFeedContent>(&self, kind: ContentKind, message: M) -> bool {
        let Some(content) = message.into_feed_content() else {
            return true;
        };
        match self
            .writer
            .submit(self.route.clone(), self.generation, kind, content)
        {
            Ok(()) => true,
            Err(e) => {
                error!("[Feed] {} cannot reach the store: {}", self.route, e);
                self.set_status(FeedStatus::Failed(e));
                false
            }
        }
    }

    fn set_status(&self, next: FeedStatus) {
        self.status.send_if_modified(|current| {
            if *current != next {
                *current = next;
                true
            } else {
                false
            }
        });
    }
}
