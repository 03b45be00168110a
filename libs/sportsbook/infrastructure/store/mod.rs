//! Normalized content store and its single writer
//!
//! The store sits behind one `RwLock`. Only the [`StoreWriter`] task takes the
//! write lock; everything else goes through a cloneable [`StoreReader`], so
//! a reader holding the lock always sees one consistent state.

pub mod content_store;
pub mod index;
pub mod metrics;
pub mod writer;

pub use content_store::{ContentStore, DeltaOutcome, StoreChange, StoredEntity};
pub use index::{ChildIndex, RelationKind};
pub use metrics::{StoreMetrics, StoreStats};
pub use writer::{ContentKind, StoreWriter, WriteCommand, WriterHandle};

use crate::domain::{EntityId, EntityKind};
use parking_lot::RwLock;
use std::sync::Arc;

/// Read-only view of the shared store
#[derive(Clone)]
pub struct StoreReader {
    inner: Arc<RwLock<ContentStore>>,
    metrics: Arc<StoreMetrics>,
}

impl StoreReader {
    pub(crate) fn new(inner: Arc<RwLock<ContentStore>>) -> Self {
        let metrics = Arc::clone(inner.read().metrics());
        Self { inner, metrics }
    }

    /// Run `f` against one consistent state of the store
    pub fn read<R>(&self, f: impl FnOnce(&ContentStore) -> R) -> R {
        let guard = self.inner.read();
        f(&guard)
    }

    pub fn get(&self, id: &EntityId, kind: EntityKind) -> Option<StoredEntity> {
        self.inner.read().get(id, kind)
    }

    pub fn child_ids(&self, parent: &EntityId, relation: RelationKind) -> Vec<EntityId> {
        self.inner.read().child_ids(parent, relation)
    }

    pub fn revision(&self) -> u64 {
        self.inner.read().revision()
    }

    /// Counters, readable without the store lock
    pub fn stats(&self) -> StoreStats {
        self.metrics.snapshot()
    }
}

/// Fresh store plus its reader, for the writer to own
pub fn shared_store() -> (Arc<RwLock<ContentStore>>, StoreReader) {
    let store = Arc::new(RwLock::new(ContentStore::new()));
    let reader = StoreReader::new(Arc::clone(&store));
    (store, reader)
}
