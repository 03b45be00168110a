//! Domain Layer
//!
//! Normalized entity records as stored by ID, the decoded update shapes the
//! feeds deliver, and the denormalized snapshots handed to consumers.
//! This layer has no dependencies on other layers.

pub mod entities;
pub mod ids;
pub mod ordering;
pub mod snapshot;
pub mod updates;

pub use entities::{
    BettingOfferRecord, EntityKey, EntityKind, Location, MainMarket, MarketOutcomeRelation,
    MarketRecord, MatchRecord, MatchStatus, OutcomeRecord, Participant, Sport, TournamentRecord,
};
pub use ids::EntityId;
pub use ordering::{market_position, outcome_rank, sort_markets, sort_outcomes};
pub use snapshot::{BettingOffer, Competition, Market, Match, Outcome};
pub use updates::{
    BettingOfferDelta, DeltaUpdate, EntityPayload, FeedContent, IntoFeedContent, MarketDelta,
    MatchInfoDelta, SportCountersDelta,
};
