//! Decoded update shapes
//!
//! Feeds deliver two kinds of payload: full entities (initial dumps and
//! creations) and deltas carrying only the fields that changed. A `None`
//! field in a delta means "unchanged", never "clear".

use super::entities::*;
use super::ids::EntityId;

/// Full entity payload
#[derive(Debug, Clone, PartialEq)]
pub enum EntityPayload {
    Sport(Sport),
    Tournament(TournamentRecord),
    Match(MatchRecord),
    Market(MarketRecord),
    Outcome(OutcomeRecord),
    BettingOffer(BettingOfferRecord),
    Location(Location),
    MainMarket(MainMarket),
    MarketOutcomeRelation(MarketOutcomeRelation),
}

impl EntityPayload {
    /// Kind of the stored entity; links and market-order entries have none
    pub fn kind(&self) -> Option<EntityKind> {
        match self {
            EntityPayload::Sport(_) => Some(EntityKind::Sport),
            EntityPayload::Tournament(_) => Some(EntityKind::Tournament),
            EntityPayload::Match(_) => Some(EntityKind::Match),
            EntityPayload::Market(_) => Some(EntityKind::Market),
            EntityPayload::Outcome(_) => Some(EntityKind::Outcome),
            EntityPayload::BettingOffer(_) => Some(EntityKind::BettingOffer),
            EntityPayload::Location(_) => Some(EntityKind::Location),
            EntityPayload::MainMarket(_) | EntityPayload::MarketOutcomeRelation(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BettingOfferDelta {
    pub id: EntityId,
    pub odd: Option<f64>,
    pub status_id: Option<String>,
    pub is_live: Option<bool>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketDelta {
    pub id: EntityId,
    pub is_available: Option<bool>,
    pub is_closed: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchInfoDelta {
    pub id: EntityId,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub match_time: Option<String>,
    pub status: Option<MatchStatus>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SportCountersDelta {
    pub id: EntityId,
    pub number_events: Option<u32>,
    pub number_live_events: Option<u32>,
}

/// Partial update addressed to one entity by ID
#[derive(Debug, Clone, PartialEq)]
pub enum DeltaUpdate {
    BettingOffer(BettingOfferDelta),
    Market(MarketDelta),
    /// Score, time and status of a match
    MatchInfo(MatchInfoDelta),
    MatchMarketCount {
        id: EntityId,
        total_market_count: u32,
    },
    /// Wholesale replacement of an existing match
    FullMatchInfo(MatchRecord),
    SportCounters(SportCountersDelta),
    /// Kind this build does not handle; applied as a no-op
    Unknown {
        kind: String,
        id: Option<EntityId>,
    },
}

impl DeltaUpdate {
    /// Short kind label used in logs and counters
    pub fn kind(&self) -> &str {
        match self {
            DeltaUpdate::BettingOffer(_) => "betting_offer_update",
            DeltaUpdate::Market(_) => "market_update",
            DeltaUpdate::MatchInfo(_) => "match_info",
            DeltaUpdate::MatchMarketCount { .. } => "match_market_count",
            DeltaUpdate::FullMatchInfo(_) => "full_match_info",
            DeltaUpdate::SportCounters(_) => "sport_counters",
            DeltaUpdate::Unknown { kind, .. } => kind,
        }
    }

    /// Entity the delta is addressed to
    pub fn target(&self) -> Option<EntityKey> {
        match self {
            DeltaUpdate::BettingOffer(d) => Some(EntityKey::new(EntityKind::BettingOffer, d.id.clone())),
            DeltaUpdate::Market(d) => Some(EntityKey::new(EntityKind::Market, d.id.clone())),
            DeltaUpdate::MatchInfo(d) => Some(EntityKey::new(EntityKind::Match, d.id.clone())),
            DeltaUpdate::MatchMarketCount { id, .. } => Some(EntityKey::new(EntityKind::Match, id.clone())),
            DeltaUpdate::FullMatchInfo(m) => Some(EntityKey::new(EntityKind::Match, m.id.clone())),
            DeltaUpdate::SportCounters(d) => Some(EntityKey::new(EntityKind::Sport, d.id.clone())),
            DeltaUpdate::Unknown { .. } => None,
        }
    }
}

/// One decoded feed message: full entities first, then deltas, in wire order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedContent {
    pub entities: Vec<EntityPayload>,
    pub deltas: Vec<DeltaUpdate>,
}

impl FeedContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entities(entities: Vec<EntityPayload>) -> Self {
        Self {
            entities,
            deltas: Vec::new(),
        }
    }

    pub fn with_deltas(deltas: Vec<DeltaUpdate>) -> Self {
        Self {
            entities: Vec::new(),
            deltas,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.deltas.is_empty()
    }
}

/// Messages that can be handed to the store writer
///
/// Decoders whose output is not always store content (a sports list, a
/// keep-alive) return `None` for those messages.
pub trait IntoFeedContent {
    fn into_feed_content(self) -> Option<FeedContent>;
}

impl IntoFeedContent for FeedContent {
    fn into_feed_content(self) -> Option<FeedContent> {
        Some(self)
    }
}
