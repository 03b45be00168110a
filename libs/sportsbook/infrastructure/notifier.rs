//! Change fan-out
//!
//! Every stream is a `tokio::sync::watch` channel, so each subscriber only
//! ever sees the latest value for its key and a slow reader never holds up
//! the writer. Entity streams carry the stored value and are only touched
//! when that value actually differs; match streams carry a revision counter
//! bumped once per write batch that touched anything under the match.

use crate::domain::{EntityId, EntityKey};
use crate::infrastructure::store::{StoreChange, StoredEntity};
use dashmap::DashMap;
use std::collections::HashSet;
use tokio::sync::watch;
use tracing::trace;

pub struct ChangeNotifier {
    entities: DashMap<EntityKey, watch::Sender<Option<StoredEntity>>>,
    matches: DashMap<EntityId, watch::Sender<u64>>,
    store: watch::Sender<u64>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (store, _) = watch::channel(0);
        Self {
            entities: DashMap::new(),
            matches: DashMap::new(),
            store,
        }
    }

    /// Per-entity stream seeded with `current`
    ///
    /// Call while holding a store read lock so no write can slip between
    /// reading `current` and registering.
    pub fn watch_entity(
        &self,
        key: EntityKey,
        current: Option<StoredEntity>,
    ) -> watch::Receiver<Option<StoredEntity>> {
        let sender = self
            .entities
            .entry(key)
            .or_insert_with(|| watch::channel(None).0);
        sender.send_if_modified(|value| {
            if *value != current {
                *value = current;
                true
            } else {
                false
            }
        });
        sender.subscribe()
    }

    /// "Anything under this match changed" stream
    pub fn watch_match(&self, match_id: &EntityId) -> watch::Receiver<u64> {
        self.matches
            .entry(match_id.clone())
            .or_insert_with(|| watch::channel(0).0)
            .subscribe()
    }

    /// Store revision, bumped after every write that changed something
    pub fn watch_store(&self) -> watch::Receiver<u64> {
        self.store.subscribe()
    }

    /// Fan out one write batch; returns how many streams were notified
    pub fn publish(&self, changes: &[StoreChange], revision: u64) -> usize {
        let mut notified = 0;
        let mut touched: HashSet<&EntityId> = HashSet::new();

        for change in changes {
            if let Some(sender) = self.entities.get(&change.key) {
                let modified = sender.send_if_modified(|value| {
                    if *value != change.value {
                        *value = change.value.clone();
                        true
                    } else {
                        false
                    }
                });
                if modified {
                    notified += 1;
                }
            }
            if let Some(match_id) = &change.match_id {
                touched.insert(match_id);
            }
        }

        for match_id in touched {
            if let Some(sender) = self.matches.get(match_id) {
                sender.send_modify(|rev| *rev += 1);
                notified += 1;
            }
        }

        let store_modified = self.store.send_if_modified(|current| {
            if *current != revision {
                *current = revision;
                true
            } else {
                false
            }
        });
        if store_modified {
            notified += 1;
        }

        trace!(
            "[Notifier] Published {} changes to {} streams",
            changes.len(),
            notified
        );
        notified
    }

    /// Drop streams nobody listens to any more
    pub fn prune(&self) -> usize {
        let before = self.entities.len() + self.matches.len();
        self.entities.retain(|_, sender| sender.receiver_count() > 0);
        self.matches.retain(|_, sender| sender.receiver_count() > 0);
        before.saturating_sub(self.entities.len() + self.matches.len())
    }

    /// Number of live entity and match streams
    pub fn stream_count(&self) -> usize {
        self.entities.len() + self.matches.len()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
