//! Sportsbook Feeds
//!
//! Real-time aggregation of sportsbook content: normalized store, change
//! fan-out, snapshot assembly and merged sports lists over live feeds.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;

// Re-export commonly used items
pub use application::{
    CompetitionFilter, FeedHealth, FeedService, FeedStatus, SnapshotAssembler, SportsMerger,
    SportsbookFacade, Subscribable,
};
pub use domain::{
    Competition, DeltaUpdate, EntityId, EntityKey, EntityKind, EntityPayload, FeedContent,
    Market, Match, Outcome, Sport,
};
pub use error::{FeedError, Result};
pub use infrastructure::{
    init_tracing, ChangeNotifier, ConfigError, ContentStore, EveryMatrixDecoder,
    EveryMatrixRoutes, ShutdownManager, SportRadarDecoder, SportRadarRoutes, SportsbookConfig,
    StoreReader,
};
