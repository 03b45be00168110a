use crate::core::config::ChannelConfig;
use crate::core::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, Metrics};
use crate::core::route::Route;
use crate::manager::{ActiveSubscription, SubscriptionRegistry};
use crate::traits::*;
use futures::Stream;
use parking_lot::RwLock;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

/// Lifecycle events of one channel subscription
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent<M> {
    /// Subscribed; always precedes any content
    Connected(SubscriptionHandle),
    /// Initial dump, or the first pushed payload when no dump route exists
    InitialContent(M),
    /// Incremental update
    UpdatedContent(M),
    /// Connection lost; a fresh `Connected` follows if the transport recovers
    Disconnected,
}

/// Stream of channel events for one `open` call
///
/// Yields `Err` at most once, right before the stream ends.
pub struct ChannelStream<M> {
    route: Route,
    generation: u64,
    rx: UnboundedReceiver<Result<ChannelEvent<M>>>,
}

impl<M> ChannelStream<M> {
    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Receive the next event
    pub async fn recv(&mut self) -> Option<Result<ChannelEvent<M>>> {
        self.rx.recv().await
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv(&mut self) -> Option<Result<ChannelEvent<M>>> {
        self.rx.try_recv().ok()
    }
}

impl<M> Stream for ChannelStream<M> {
    type Item = Result<ChannelEvent<M>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Subscription channel over one connector
///
/// Each `open` call subscribes one route and spawns a pump task that decodes
/// transport frames in delivery order and forwards them as `ChannelEvent`s.
/// At most one subscription per route is active: reopening a route closes
/// the previous handle before the new subscribe is issued.
pub struct FeedChannel<D: FeedDecoder> {
    connector: RwLock<Connector>,
    decoder: Arc<D>,
    config: ChannelConfig,
    registry: Arc<SubscriptionRegistry>,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
}

impl<D: FeedDecoder> FeedChannel<D> {
    pub fn new(connector: Connector, decoder: D, config: ChannelConfig) -> Self {
        Self {
            connector: RwLock::new(connector),
            decoder: Arc::new(decoder),
            config,
            registry: Arc::new(SubscriptionRegistry::new()),
            state: Arc::new(AtomicConnectionState::new(ConnectionState::Disconnected)),
            metrics: Arc::new(AtomicMetrics::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn connector(&self) -> Connector {
        self.connector.read().clone()
    }

    /// Swap the session token used to resolve routes
    ///
    /// Takes effect on the next `open`; active subscriptions are untouched.
    pub fn set_session_token(&self, token: impl Into<String>) {
        let mut connector = self.connector.write();
        *connector = connector.with_session_token(token);
    }

    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics.snapshot()
    }

    pub fn is_current(&self, route: &Route, generation: u64) -> bool {
        self.registry.is_current(route, generation)
    }

    pub fn handle(&self, route: &Route) -> Option<SubscriptionHandle> {
        self.registry.handle(route)
    }

    /// Logical route an active handle was opened on
    pub fn route_for_handle(&self, handle: &SubscriptionHandle) -> Option<Route> {
        self.registry.route_for_handle(handle)
    }

    pub fn active_routes(&self) -> Vec<Route> {
        self.registry.routes()
    }

    /// Open a subscription on `route`
    ///
    /// When `initial_dump_route` is given, a one-shot request is issued right
    /// after subscribing and its result is the first `InitialContent`.
    /// Otherwise the first pushed payload serves as initial content.
    ///
    /// # Errors
    /// - `NotConnected` if the transport has no connection yet
    /// - `Superseded` if another `open` on the same route started meanwhile
    /// - transport errors from subscribe
    pub async fn open(
        &self,
        route: Route,
        initial_dump_route: Option<Route>,
    ) -> Result<ChannelStream<D::Message>> {
        let connector = self.connector();
        if !connector.is_connected() {
            warn!(
                "[{}] Cannot open {}: {} transport not connected",
                self.config.name,
                route,
                connector.kind()
            );
            return Err(ChannelError::NotConnected(format!(
                "{} transport not ready for {}",
                connector.kind(),
                route
            )));
        }

        let (generation, previous) = self.registry.begin(&route);
        if let Some(previous) = previous {
            self.release(&route, previous, &connector).await;
        }

        self.state.set(ConnectionState::Connecting);
        let transport = Arc::clone(connector.transport());
        let resolved = connector.resolve(&route);

        let subscription = match transport.subscribe(&resolved).await {
            Ok(subscription) => subscription,
            Err(e) => {
                error!("[{}] Subscribe to {} failed: {}", self.config.name, route, e);
                self.registry.remove_if_current(&route, generation);
                self.state.set(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        let handle = subscription.handle.clone();
        if self.registry.attach(&route, generation, handle.clone()).is_none() {
            debug!(
                "[{}] Subscription {} superseded while pending, releasing",
                self.config.name, handle
            );
            if let Err(e) = transport.unsubscribe(&handle).await {
                warn!("[{}] Failed to release {}: {}", self.config.name, handle, e);
            }
            return Err(ChannelError::Superseded {
                route: route.to_string(),
            });
        }

        self.state.set(ConnectionState::Connected);
        info!("[{}] Subscribed to {} ({})", self.config.name, route, handle);

        let (tx, rx) = unbounded_channel();
        let _ = tx.send(Ok(ChannelEvent::Connected(handle.clone())));

        let pump = Pump {
            name: self.config.name.clone(),
            route: route.clone(),
            generation,
            handle,
            initial_dump_route: initial_dump_route.map(|r| connector.resolve(&r)),
            initial_dump_timeout: self.config.initial_dump_timeout,
            transport,
            decoder: Arc::clone(&self.decoder),
            registry: Arc::clone(&self.registry),
            state: Arc::clone(&self.state),
            metrics: Arc::clone(&self.metrics),
            tx,
        };
        let task = tokio::spawn(pump.run(subscription.frames));
        self.registry.set_task(&route, generation, task);

        Ok(ChannelStream {
            route,
            generation,
            rx,
        })
    }

    /// Close the subscription on `route`
    ///
    /// Already delivered events are not retracted.
    pub async fn close(&self, route: &Route) -> Result<()> {
        let Some(active) = self.registry.remove(route) else {
            return Ok(());
        };
        active.abort();
        if self.registry.is_empty() {
            self.state.set(ConnectionState::Disconnected);
        }
        match active.handle {
            Some(handle) => {
                info!("[{}] Closing {} ({})", self.config.name, route, handle);
                self.connector().transport().unsubscribe(&handle).await
            }
            None => Ok(()),
        }
    }

    /// Close the subscription identified by its handle
    pub async fn close_handle(&self, handle: &SubscriptionHandle) -> Result<()> {
        match self.registry.route_for_handle(handle) {
            Some(route) => self.close(&route).await,
            None => {
                debug!("[{}] Handle {} is not active", self.config.name, handle);
                Ok(())
            }
        }
    }

    /// Close every active subscription
    pub async fn close_all(&self) {
        self.state.set(ConnectionState::ShuttingDown);
        let connector = self.connector();
        for (route, active) in self.registry.drain() {
            self.release(&route, active, &connector).await;
        }
        self.state.set(ConnectionState::Disconnected);
    }

    async fn release(&self, route: &Route, active: ActiveSubscription, connector: &Connector) {
        active.abort();
        if let Some(handle) = active.handle {
            debug!("[{}] Releasing {} ({})", self.config.name, route, handle);
            if let Err(e) = connector.transport().unsubscribe(&handle).await {
                warn!("[{}] Failed to release {}: {}", self.config.name, handle, e);
            }
        }
    }
}

// =============================================================================
// Pump - one task per subscription
// =============================================================================

enum DumpOutcome {
    /// Dump decoded and emitted
    Emitted,
    /// Nothing emitted; the next push serves as initial content
    Pending,
    /// A newer subscription owns the route
    Stale,
}

struct Pump<D: FeedDecoder> {
    name: String,
    route: Route,
    generation: u64,
    handle: SubscriptionHandle,
    initial_dump_route: Option<Route>,
    initial_dump_timeout: Option<std::time::Duration>,
    transport: Arc<dyn FeedTransport>,
    decoder: Arc<D>,
    registry: Arc<SubscriptionRegistry>,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    tx: UnboundedSender<Result<ChannelEvent<D::Message>>>,
}

impl<D: FeedDecoder> Pump<D> {
    async fn run(mut self, mut frames: UnboundedReceiver<TransportFrame>) {
        let mut awaiting_initial = match self.fetch_initial_dump().await {
            Ok(DumpOutcome::Emitted) => false,
            Ok(DumpOutcome::Pending) => true,
            Ok(DumpOutcome::Stale) => return,
            Err(e) => return self.fail(e),
        };

        while let Some(frame) = frames.recv().await {
            if !self.registry.is_current(&self.route, self.generation) {
                debug!("[{}] Pump for {} superseded, stopping", self.name, self.route);
                return;
            }

            let delivered = match frame {
                TransportFrame::Message(message) => {
                    self.metrics.increment_received();
                    match self.decoder.decode(&message) {
                        Ok(decoded) => {
                            let event = if awaiting_initial {
                                awaiting_initial = false;
                                self.metrics.increment_initial_dumps();
                                ChannelEvent::InitialContent(decoded)
                            } else {
                                ChannelEvent::UpdatedContent(decoded)
                            };
                            self.emit(event)
                        }
                        Err(e) => {
                            self.metrics.increment_decode_errors();
                            warn!(
                                route = %self.route,
                                bytes = message.len(),
                                error = %e,
                                "[{}] Dropping undecodable payload",
                                self.name
                            );
                            true
                        }
                    }
                }
                TransportFrame::Disconnected => {
                    self.state.set(ConnectionState::Reconnecting);
                    warn!("[{}] Transport disconnected on {}", self.name, self.route);
                    self.emit(ChannelEvent::Disconnected)
                }
                TransportFrame::Reconnected(handle) => {
                    self.metrics.increment_reconnects();
                    if self
                        .registry
                        .attach(&self.route, self.generation, handle.clone())
                        .is_none()
                    {
                        return;
                    }
                    self.handle = handle.clone();
                    self.state.set(ConnectionState::Connected);
                    info!("[{}] Resubscribed to {} ({})", self.name, self.route, handle);
                    if !self.emit(ChannelEvent::Connected(handle)) {
                        false
                    } else {
                        match self.fetch_initial_dump().await {
                            Ok(DumpOutcome::Emitted) => {
                                awaiting_initial = false;
                                true
                            }
                            Ok(DumpOutcome::Pending) => {
                                awaiting_initial = true;
                                true
                            }
                            Ok(DumpOutcome::Stale) => return,
                            Err(e) => return self.fail(e),
                        }
                    }
                }
            };

            if !delivered {
                debug!("[{}] Consumer of {} dropped, releasing", self.name, self.route);
                if self
                    .registry
                    .remove_if_current(&self.route, self.generation)
                    .is_some()
                {
                    if let Err(e) = self.transport.unsubscribe(&self.handle).await {
                        warn!("[{}] Failed to release {}: {}", self.name, self.handle, e);
                    }
                }
                return;
            }
        }

        info!("[{}] Transport ended subscription {}", self.name, self.route);
        self.state.set(ConnectionState::Disconnected);
        self.registry.remove_if_current(&self.route, self.generation);
        let _ = self.tx.send(Ok(ChannelEvent::Disconnected));
    }

    /// Request the initial dump, if this channel has a dump route
    ///
    /// Without a dump route the next push is the initial content.
    async fn fetch_initial_dump(&self) -> Result<DumpOutcome> {
        let Some(dump_route) = &self.initial_dump_route else {
            return Ok(DumpOutcome::Pending);
        };

        debug!("[{}] Requesting initial dump {}", self.name, dump_route);
        let request = self.transport.request(dump_route);
        let response = match self.initial_dump_timeout {
            Some(limit) => match tokio::time::timeout(limit, request).await {
                Ok(response) => response,
                Err(_) => Err(ChannelError::Timeout(format!(
                    "initial dump {} after {:?}",
                    dump_route, limit
                ))),
            },
            None => request.await,
        };

        if !self.registry.is_current(&self.route, self.generation) {
            self.metrics.increment_stale_dumps();
            debug!(
                "[{}] Discarding stale initial dump for {} (generation {})",
                self.name, self.route, self.generation
            );
            return Ok(DumpOutcome::Stale);
        }

        let message = response?;
        self.metrics.increment_received();
        match self.decoder.decode(&message) {
            Ok(decoded) => {
                self.metrics.increment_initial_dumps();
                self.emit(ChannelEvent::InitialContent(decoded));
                Ok(DumpOutcome::Emitted)
            }
            Err(e) => {
                self.metrics.increment_decode_errors();
                warn!(
                    route = %dump_route,
                    error = %e,
                    "[{}] Dropping undecodable initial dump",
                    self.name
                );
                Ok(DumpOutcome::Pending)
            }
        }
    }

    fn emit(&self, event: ChannelEvent<D::Message>) -> bool {
        self.tx.send(Ok(event)).is_ok()
    }

    /// Terminal failure: surface the error, then end the stream
    fn fail(self, error: ChannelError) {
        error!("[{}] Channel {} failed: {}", self.name, self.route, error);
        self.registry.remove_if_current(&self.route, self.generation);
        self.state.set(ConnectionState::Disconnected);
        let _ = self.tx.send(Err(error));
    }
}
