//! Infrastructure Layer
//!
//! Store, change fan-out, upstream decoders and process plumbing.
//! Depends on the domain layer, never on the application layer.

pub mod client;
pub mod config;
pub mod logging;
pub mod notifier;
pub mod shutdown;
pub mod store;

pub use client::{
    everymatrix::{EveryMatrixDecoder, EveryMatrixRoutes},
    sportradar::{SportListKind, SportRadarDecoder, SportRadarMessage, SportRadarRoutes},
};
pub use config::{ConfigError, SportsbookConfig};
pub use logging::init_tracing;
pub use notifier::ChangeNotifier;
pub use shutdown::ShutdownManager;
pub use store::{
    ContentKind, ContentStore, DeltaOutcome, RelationKind, StoreChange, StoreReader, StoreStats,
    StoredEntity, StoreWriter, WriterHandle,
};
