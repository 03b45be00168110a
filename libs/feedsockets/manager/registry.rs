use crate::core::route::Route;
use crate::SubscriptionHandle;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::JoinHandle;
use tracing::debug;

/// The single active subscription of a route
#[derive(Debug)]
pub struct ActiveSubscription {
    pub generation: u64,
    pub handle: Option<SubscriptionHandle>,
    task: Option<JoinHandle<()>>,
}

impl ActiveSubscription {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            handle: None,
            task: None,
        }
    }

    /// Stop the pump task, if one was spawned
    pub fn abort(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

/// Registry of active subscriptions, at most one per route
///
/// Every `begin` hands out a fresh generation. Work tagged with an older
/// generation (a pending subscribe, an in-flight initial dump) checks
/// `is_current` before it takes effect and is discarded otherwise.
pub struct SubscriptionRegistry {
    entries: RwLock<HashMap<Route, ActiveSubscription>>,
    next_generation: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Reserve a new generation for `route`
    ///
    /// Returns the previous subscription, which the caller must close.
    pub fn begin(&self, route: &Route) -> (u64, Option<ActiveSubscription>) {
        let generation = self.next_generation.fetch_add(1, Ordering::AcqRel);
        let previous = self
            .entries
            .write()
            .insert(route.clone(), ActiveSubscription::new(generation));
        if let Some(previous) = &previous {
            debug!(
                "[Registry] Route {} superseded (generation {} -> {})",
                route, previous.generation, generation
            );
        }
        (generation, previous)
    }

    #[inline]
    pub fn is_current(&self, route: &Route, generation: u64) -> bool {
        self.entries
            .read()
            .get(route)
            .map(|entry| entry.generation == generation)
            .unwrap_or(false)
    }

    /// Record the transport handle of a subscription
    ///
    /// Returns the handle it replaced, or `None` if the generation is stale.
    pub fn attach(
        &self,
        route: &Route,
        generation: u64,
        handle: SubscriptionHandle,
    ) -> Option<Option<SubscriptionHandle>> {
        let mut entries = self.entries.write();
        match entries.get_mut(route) {
            Some(entry) if entry.generation == generation => Some(entry.handle.replace(handle)),
            _ => None,
        }
    }

    /// Record the pump task of a subscription
    ///
    /// A stale generation aborts the task immediately.
    pub fn set_task(&self, route: &Route, generation: u64, task: JoinHandle<()>) {
        let mut entries = self.entries.write();
        match entries.get_mut(route) {
            Some(entry) if entry.generation == generation => entry.task = Some(task),
            _ => task.abort(),
        }
    }

    pub fn handle(&self, route: &Route) -> Option<SubscriptionHandle> {
        self.entries
            .read()
            .get(route)
            .and_then(|entry| entry.handle.clone())
    }

    pub fn route_for_handle(&self, handle: &SubscriptionHandle) -> Option<Route> {
        self.entries
            .read()
            .iter()
            .find(|(_, entry)| entry.handle.as_ref() == Some(handle))
            .map(|(route, _)| route.clone())
    }

    pub fn remove(&self, route: &Route) -> Option<ActiveSubscription> {
        self.entries.write().remove(route)
    }

    pub fn remove_if_current(&self, route: &Route, generation: u64) -> Option<ActiveSubscription> {
        let mut entries = self.entries.write();
        match entries.get(route) {
            Some(entry) if entry.generation == generation => entries.remove(route),
            _ => None,
        }
    }

    pub fn drain(&self) -> Vec<(Route, ActiveSubscription)> {
        self.entries.write().drain().collect()
    }

    pub fn routes(&self) -> Vec<Route> {
        let mut routes: Vec<Route> = self.entries.read().keys().cloned().collect();
        routes.sort();
        routes
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: &str, route: &Route) -> SubscriptionHandle {
        SubscriptionHandle::new(id, route.clone())
    }

    #[test]
    fn test_begin_supersedes_previous_generation() {
        let registry = SubscriptionRegistry::new();
        let route = Route::new("/match/123");

        let (first, previous) = registry.begin(&route);
        assert!(previous.is_none());
        assert!(registry.is_current(&route, first));

        let (second, previous) = registry.begin(&route);
        assert_eq!(previous.map(|p| p.generation), Some(first));
        assert!(second > first);
        assert!(!registry.is_current(&route, first));
        assert!(registry.is_current(&route, second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_attach_rejects_stale_generation() {
        let registry = SubscriptionRegistry::new();
        let route = Route::new("/match/123");

        let (stale, _) = registry.begin(&route);
        let (current, _) = registry.begin(&route);

        assert!(registry.attach(&route, stale, handle("h1", &route)).is_none());
        assert_eq!(
            registry.attach(&route, current, handle("h2", &route)),
            Some(None)
        );
        assert_eq!(registry.handle(&route), Some(handle("h2", &route)));
        assert_eq!(
            registry.route_for_handle(&handle("h2", &route)),
            Some(route.clone())
        );
    }

    #[test]
    fn test_remove_if_current_keeps_newer_subscription() {
        let registry = SubscriptionRegistry::new();
        let route = Route::new("/match/123");

        let (old, _) = registry.begin(&route);
        let (new, _) = registry.begin(&route);

        assert!(registry.remove_if_current(&route, old).is_none());
        assert!(registry.is_current(&route, new));
        assert!(registry.remove_if_current(&route, new).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_routes_are_sorted() {
        let registry = SubscriptionRegistry::new();
        registry.begin(&Route::new("b"));
        registry.begin(&Route::new("a"));
        assert_eq!(registry.routes(), vec![Route::new("a"), Route::new("b")]);
    }
}
