//! Transport Boundary
//!
//! The transport owns sockets, RPC encoding, retries and reconnection. This
//! crate only sees the subscription abstraction below: subscribe to a route,
//! receive frames in transport order, issue one-shot requests, unsubscribe.
//!
//! ```text
//! Connector::Wamp       ──┐
//!                         ├──> FeedTransport ──> TransportFrame stream ──> FeedChannel
//! Connector::SocketRest ──┘
//! ```

use crate::core::route::Route;
use crate::{FeedMessage, Result};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Opaque identifier returned by the transport on subscribe
///
/// Must be retained for exactly as long as the logical feed is active and
/// handed back to `unsubscribe`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: String,
    route: Route,
}

impl SubscriptionHandle {
    pub fn new(id: impl Into<String>, route: Route) -> Self {
        Self {
            id: id.into(),
            route,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Route as seen by the transport (after connector resolution)
    pub fn route(&self) -> &Route {
        &self.route
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.route)
    }
}

/// Frames pushed by the transport for one subscription, in delivery order
#[derive(Debug, Clone, PartialEq)]
pub enum TransportFrame {
    /// A pushed payload
    Message(FeedMessage),
    /// Connection lost; the transport may reconnect on its own
    Disconnected,
    /// Connection restored under a fresh handle
    Reconnected(SubscriptionHandle),
}

/// Result of a successful subscribe
#[derive(Debug)]
pub struct TransportSubscription {
    pub handle: SubscriptionHandle,
    pub frames: UnboundedReceiver<TransportFrame>,
}

/// Publish/subscribe + request/response endpoint
#[async_trait]
pub trait FeedTransport: Send + Sync + 'static {
    /// Whether the underlying connection currently exists
    fn is_connected(&self) -> bool;

    /// Subscribe to a route
    ///
    /// May suspend until the transport is ready. Dropping the future cancels
    /// the attempt.
    async fn subscribe(&self, route: &Route) -> Result<TransportSubscription>;

    /// One-shot request (initial dump)
    async fn request(&self, route: &Route) -> Result<FeedMessage>;

    /// Release a subscription handle
    async fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<()>;
}

/// The closed set of transport kinds
#[derive(Clone)]
pub enum Connector {
    /// RPC + pub/sub socket. Routes are used verbatim.
    Wamp { transport: Arc<dyn FeedTransport> },
    /// WebSocket push with REST registration. Routes are scoped by a session token.
    SocketRest {
        transport: Arc<dyn FeedTransport>,
        session_token: String,
    },
}

impl Connector {
    pub fn wamp(transport: Arc<dyn FeedTransport>) -> Self {
        Connector::Wamp { transport }
    }

    pub fn socket_rest(transport: Arc<dyn FeedTransport>, session_token: impl Into<String>) -> Self {
        Connector::SocketRest {
            transport,
            session_token: session_token.into(),
        }
    }

    /// Short name used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Connector::Wamp { .. } => "wamp",
            Connector::SocketRest { .. } => "socket-rest",
        }
    }

    pub fn transport(&self) -> &Arc<dyn FeedTransport> {
        match self {
            Connector::Wamp { transport } => transport,
            Connector::SocketRest { transport, .. } => transport,
        }
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.transport().is_connected()
    }

    /// Map a logical route to the route the transport expects
    pub fn resolve(&self, route: &Route) -> Route {
        match self {
            Connector::Wamp { .. } => route.clone(),
            Connector::SocketRest { session_token, .. } => {
                route.with_param("sessionToken", session_token)
            }
        }
    }

    /// Same transport, new session token
    ///
    /// A WAMP connector has no token and is returned unchanged.
    pub fn with_session_token(&self, token: impl Into<String>) -> Self {
        match self {
            Connector::Wamp { transport } => Connector::Wamp {
                transport: Arc::clone(transport),
            },
            Connector::SocketRest { transport, .. } => Connector::SocketRest {
                transport: Arc::clone(transport),
                session_token: token.into(),
            },
        }
    }
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("kind", &self.kind())
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReplayTransport;

    #[test]
    fn test_wamp_routes_are_verbatim() {
        let connector = Connector::wamp(Arc::new(ReplayTransport::new()));
        let route = Route::new("/sports/4093/en/live-matches");
        assert_eq!(connector.resolve(&route), route);
        assert_eq!(connector.kind(), "wamp");
    }

    #[test]
    fn test_socket_rest_routes_carry_session_token() {
        let connector = Connector::socket_rest(Arc::new(ReplayTransport::new()), "tok-1");
        let resolved = connector.resolve(&Route::new("liveSports"));
        assert_eq!(resolved.as_str(), "liveSports?sessionToken=tok-1");

        let rotated = connector.with_session_token("tok-2");
        assert_eq!(
            rotated.resolve(&Route::new("liveSports")).as_str(),
            "liveSports?sessionToken=tok-2"
        );
    }
}
