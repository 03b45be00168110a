//! Single writer for the content store
//!
//! All feeds hand their decoded content to one task through an unbounded
//! queue. The task applies each batch under the write lock, releases it, then
//! publishes the resulting changes. Every batch is tagged with the route's
//! subscription generation; batches from a stopped or superseded
//! subscription are discarded before they reach the store.

use super::content_store::{ContentStore, DeltaOutcome};
use super::metrics::StoreMetrics;
use crate::domain::FeedContent;
use crate::error::{FeedError, Result};
use crate::infrastructure::notifier::ChangeNotifier;
use dashmap::DashMap;
use feedsockets::Route;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Prune idle notifier streams after this many batches
const PRUNE_INTERVAL: u64 = 256;

/// How a batch should be applied
#[derive(Debug, Clone, PartialEq)]
pub enum ContentKind {
    /// Initial dump, optionally tagged with a match list name
    Initial { list: Option<String> },
    Update,
}

#[derive(Debug)]
pub enum WriteCommand {
    Apply {
        route: Route,
        generation: u64,
        kind: ContentKind,
        content: FeedContent,
    },
    /// Acknowledged once every earlier command has been applied
    Flush(oneshot::Sender<()>),
}

/// Producer side of the writer queue
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::UnboundedSender<WriteCommand>,
    generations: Arc<DashMap<Route, u64>>,
    next_generation: Arc<AtomicU64>,
}

impl WriterHandle {
    /// Start a new generation for `route`; earlier ones become stale
    pub fn begin(&self, route: &Route) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.generations.insert(route.clone(), generation);
        generation
    }

    /// Stop accepting content for `route`
    ///
    /// With a generation, only retires the route if that generation is still
    /// the current one.
    pub fn retire(&self, route: &Route, generation: Option<u64>) {
        match generation {
            Some(generation) => {
                self.generations
                    .remove_if(route, |_, current| *current == generation);
            }
            None => {
                self.generations.remove(route);
            }
        }
    }

    pub fn is_current(&self, route: &Route, generation: u64) -> bool {
        self.generations
            .get(route)
            .map(|current| *current == generation)
            .unwrap_or(false)
    }

    pub fn submit(
        &self,
        route: Route,
        generation: u64,
        kind: ContentKind,
        content: FeedContent,
    ) -> Result<()> {
        self.tx
            .send(WriteCommand::Apply {
                route,
                generation,
                kind,
                content,
            })
            .map_err(|_| FeedError::WriterStopped)
    }

    /// Wait until everything submitted so far has been applied
    pub async fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(WriteCommand::Flush(ack_tx))
            .map_err(|_| FeedError::WriterStopped)?;
        ack_rx.await.map_err(|_| FeedError::WriterStopped)
    }
}

pub struct StoreWriter {
    store: Arc<RwLock<ContentStore>>,
    notifier: Arc<ChangeNotifier>,
    metrics: Arc<StoreMetrics>,
    generations: Arc<DashMap<Route, u64>>,
    rx: mpsc::UnboundedReceiver<WriteCommand>,
    batches: u64,
}

impl StoreWriter {
    /// Spawn the writer task; it runs until every handle is dropped
    pub fn spawn(
        store: Arc<RwLock<ContentStore>>,
        notifier: Arc<ChangeNotifier>,
    ) -> (WriterHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let generations = Arc::new(DashMap::new());
        let metrics = Arc::clone(store.read().metrics());

        let handle = WriterHandle {
            tx,
            generations: Arc::clone(&generations),
            next_generation: Arc::new(AtomicU64::new(0)),
        };

        let writer = StoreWriter {
            store,
            notifier,
            metrics,
            generations,
            rx,
            batches: 0,
        };

        (handle, tokio::spawn(writer.run()))
    }

    async fn run(mut self) {
        debug!("[Store] Writer started");
        while let Some(command) = self.rx.recv().await {
            match command {
                WriteCommand::Apply {
                    route,
                    generation,
                    kind,
                    content,
                } => self.apply(&route, generation, kind, content),
                WriteCommand::Flush(ack) => {
                    let _ = ack.send(());
                }
            }
        }
        info!("[Store] Writer stopped after {} batches", self.batches);
    }

    fn apply(&mut self, route: &Route, generation: u64, kind: ContentKind, content: FeedContent) {
        let current = self
            .generations
            .get(route)
            .map(|g| *g == generation)
            .unwrap_or(false);
        if !current {
            self.metrics.increment_stale();
            debug!(
                "[Store] Discarding {:?} content from stale subscription {} (generation {})",
                kind, route, generation
            );
            return;
        }

        let (changes, revision) = {
            let mut store = self.store.write();
            let mut changes = match kind {
                ContentKind::Initial { list: Some(list) } => {
                    store.apply_list_dump(&list, content.entities)
                }
                ContentKind::Initial { list: None } => store.apply_initial_dump(content.entities),
                ContentKind::Update if content.entities.is_empty() => Vec::new(),
                ContentKind::Update => store.upsert(content.entities),
            };
            for delta in content.deltas {
                if let DeltaOutcome::Applied(change) = store.apply_delta(delta) {
                    changes.push(change);
                }
            }
            (changes, store.revision())
        };

        self.notifier.publish(&changes, revision);

        self.batches += 1;
        if self.batches % PRUNE_INTERVAL == 0 {
            let pruned = self.notifier.prune();
            if pruned > 0 {
                debug!("[Store] Pruned {} idle notifier streams", pruned);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BettingOfferDelta, BettingOfferRecord, DeltaUpdate, EntityId, EntityPayload};
    use crate::infrastructure::store::shared_store;

    fn offer_dump(odd: f64) -> FeedContent {
        FeedContent::with_entities(vec![EntityPayload::BettingOffer(BettingOfferRecord {
            id: EntityId::from("b1"),
            odd,
            ..Default::default()
        })])
    }

    #[tokio::test]
    async fn test_stale_generation_is_discarded() {
        let (store, reader) = shared_store();
        let (writer, _task) = StoreWriter::spawn(store, Arc::new(ChangeNotifier::new()));
        let route = Route::from("/odds");

        let old = writer.begin(&route);
        let new = writer.begin(&route);
        assert!(!writer.is_current(&route, old));

        writer
            .submit(route.clone(), old, ContentKind::Initial { list: None }, offer_dump(9.0))
            .unwrap();
        writer
            .submit(route.clone(), new, ContentKind::Initial { list: None }, offer_dump(2.0))
            .unwrap();
        writer.flush().await.unwrap();

        let odd = reader.read(|s| s.betting_offer(&EntityId::from("b1")).map(|o| o.odd));
        assert_eq!(odd, Some(2.0));
        assert_eq!(reader.stats().stale_discarded, 1);
    }

    #[tokio::test]
    async fn test_retired_route_stops_applying() {
        let (store, reader) = shared_store();
        let (writer, _task) = StoreWriter::spawn(store, Arc::new(ChangeNotifier::new()));
        let route = Route::from("/odds");

        let generation = writer.begin(&route);
        writer
            .submit(route.clone(), generation, ContentKind::Initial { list: None }, offer_dump(1.5))
            .unwrap();
        writer.flush().await.unwrap();

        writer.retire(&route, Some(generation));
        let delta = FeedContent::with_deltas(vec![DeltaUpdate::BettingOffer(BettingOfferDelta {
            id: EntityId::from("b1"),
            odd: Some(3.0),
            ..Default::default()
        })]);
        writer
            .submit(route, generation, ContentKind::Update, delta)
            .unwrap();
        writer.flush().await.unwrap();

        // Last known good is kept
        let odd = reader.read(|s| s.betting_offer(&EntityId::from("b1")).map(|o| o.odd));
        assert_eq!(odd, Some(1.5));
    }

    #[tokio::test]
    async fn test_retire_with_old_generation_keeps_newer() {
        let (store, _reader) = shared_store();
        let (writer, _task) = StoreWriter::spawn(store, Arc::new(ChangeNotifier::new()));
        let route = Route::from("/odds");

        let old = writer.begin(&route);
        let new = writer.begin(&route);
        writer.retire(&route, Some(old));
        assert!(writer.is_current(&route, new));
    }
}
