//! Application Layer
//!
//! Feed lifecycle, snapshot assembly, sports merging and the facade handed
//! to consumers. This layer depends on domain and infrastructure layers.

pub mod assembler;
pub mod competitions;
pub mod facade;
pub mod feed;
pub mod sports_merger;

pub use assembler::SnapshotAssembler;
pub use competitions::{CompetitionFilter, CompetitionsAggregator};
pub use facade::{FacadeStats, SportsbookFacade};
pub use feed::{FeedService, FeedStatus};
pub use sports_merger::{FeedHealth, SportsMergeState, SportsMerger, Subscribable};
