//! Normalized entity records
//!
//! One record per entity, stored once by ID. Cross references are IDs, never
//! nested values; the snapshot assembler joins them on demand.

use super::ids::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Keys
// =============================================================================

/// Entity type; IDs are only unique within one kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Sport,
    Tournament,
    Match,
    Market,
    Outcome,
    BettingOffer,
    Location,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Sport => "sport",
            EntityKind::Tournament => "tournament",
            EntityKind::Match => "match",
            EntityKind::Market => "market",
            EntityKind::Outcome => "outcome",
            EntityKind::BettingOffer => "betting_offer",
            EntityKind::Location => "location",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Globally unique key: kind plus ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityKey {
    pub fn new(kind: EntityKind, id: impl Into<EntityId>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

// =============================================================================
// Records
// =============================================================================

/// Sport as carried by the all-sports and live-sports feeds
///
/// Name and codes are owned by the all-sports feed, `number_live_events`
/// by the live-sports feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sport {
    pub id: EntityId,
    pub name: String,
    pub alpha_id: Option<String>,
    pub numeric_id: Option<String>,
    pub number_events: u32,
    pub number_live_events: u32,
    pub number_outright_events: u32,
}

impl Sport {
    /// Key used to join the two sport feeds: alpha code, falling back to the ID
    pub fn merge_key(&self) -> &str {
        self.alpha_id
            .as_deref()
            .filter(|alpha| !alpha.is_empty())
            .unwrap_or(self.id.as_str())
    }
}

/// Match lifecycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum MatchStatus {
    NotStarted,
    InProgress(String),
    Ended(String),
    #[default]
    Unknown,
}

impl MatchStatus {
    /// Map a numeric feed status (`1` scheduled, `2` live, `3`/`4` finished)
    pub fn from_status_id(status_id: &str, detail: Option<&str>) -> Self {
        let detail = detail.unwrap_or_default().to_string();
        match status_id {
            "1" => MatchStatus::NotStarted,
            "2" => MatchStatus::InProgress(detail),
            "3" | "4" => MatchStatus::Ended(detail),
            _ => MatchStatus::Unknown,
        }
    }

    /// Map a textual feed status such as `not_started`, `in_progress`, `ended`
    pub fn from_code(code: &str) -> Self {
        let lowered = code.to_lowercase();
        match lowered.as_str() {
            "not_started" | "notstarted" | "scheduled" | "pending" => MatchStatus::NotStarted,
            "ended" | "closed" | "finished" | "cancelled" | "abandoned" => {
                MatchStatus::Ended(code.to_string())
            }
            "" | "unknown" => MatchStatus::Unknown,
            _ => MatchStatus::InProgress(code.to_string()),
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, MatchStatus::InProgress(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Option<EntityId>,
    pub name: String,
}

impl Participant {
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
        }
    }
}

/// Match (event)
///
/// `market_ids` is the nesting carried by the payload; the store's
/// match → markets index is rebuilt from it on every dump.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: EntityId,
    pub sport_id: Option<EntityId>,
    pub sport_code: Option<String>,
    pub competition_id: Option<EntityId>,
    pub competition_name: Option<String>,
    pub venue_id: Option<EntityId>,
    pub home: Participant,
    pub away: Participant,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub match_time: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub status: MatchStatus,
    pub market_ids: Vec<EntityId>,
    /// Upstream market count; may exceed the markets known locally
    pub total_market_count: u32,
}

/// Market
///
/// Only the availability and closed flags change after creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketRecord {
    pub id: EntityId,
    pub match_id: Option<EntityId>,
    /// Market family, e.g. "1X2"
    pub type_id: String,
    pub short_name: String,
    pub params: Vec<f64>,
    pub is_available: bool,
    pub is_closed: bool,
    pub outcome_ids: Vec<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub id: EntityId,
    pub market_id: Option<EntityId>,
    pub match_id: Option<EntityId>,
    /// Machine key, e.g. "1", "X", "2", "home", "over"
    pub code_name: String,
    pub display_name: String,
    pub params: Vec<f64>,
    /// Explicit foreign key to the offer, when the feed carries one
    pub betting_offer_id: Option<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BettingOfferRecord {
    pub id: EntityId,
    pub outcome_id: Option<EntityId>,
    pub odd: f64,
    pub status_id: String,
    pub is_live: bool,
    pub is_available: bool,
}

/// Competition (tournament)
///
/// Outright metadata is used when the competition itself is the bettable
/// entity, before any match is scheduled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TournamentRecord {
    pub id: EntityId,
    pub name: String,
    pub sport_id: Option<EntityId>,
    pub venue_id: Option<EntityId>,
    pub match_ids: Vec<EntityId>,
    pub outright_market_count: u32,
    pub outright_market_ids: Vec<EntityId>,
}

/// Venue; immutable once stored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: EntityId,
    pub name: String,
    pub iso_code: Option<String>,
}

/// Entry of the canonical market-type order supplied upstream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainMarket {
    pub id: EntityId,
    pub type_id: String,
    pub sport_id: Option<EntityId>,
}

/// Standalone market → outcome link
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketOutcomeRelation {
    pub id: EntityId,
    pub market_id: EntityId,
    pub outcome_id: EntityId,
}
