//! Denormalized, display-ready values
//!
//! Built fresh by the snapshot assembler on every call and never mutated by
//! the store afterwards, so consumers may keep them and compare with `==`.

use super::entities::{Location, MatchStatus, Participant};
use super::ids::EntityId;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BettingOffer {
    pub id: EntityId,
    pub odd: f64,
    pub status_id: String,
    pub is_live: bool,
    pub is_available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub id: EntityId,
    pub market_id: EntityId,
    pub code_name: String,
    pub display_name: String,
    pub params: Vec<f64>,
    pub betting_offer: BettingOffer,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Market {
    pub id: EntityId,
    pub type_id: String,
    pub name: String,
    pub params: Vec<f64>,
    pub is_available: bool,
    pub is_closed: bool,
    /// Outcomes with a known offer, ranked by code name
    pub outcomes: Vec<Outcome>,
}

impl Market {
    /// Lowest and highest odd among the outcomes
    pub fn odds_range(&self) -> Option<(f64, f64)> {
        self.outcomes
            .iter()
            .map(|o| o.betting_offer.odd)
            .fold(None, |acc, odd| match acc {
                None => Some((odd, odd)),
                Some((lo, hi)) => Some((lo.min(odd), hi.max(odd))),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub id: EntityId,
    pub competition_id: Option<EntityId>,
    pub competition_name: Option<String>,
    pub home: Participant,
    pub away: Participant,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub match_time: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub status: MatchStatus,
    pub sport_id: Option<EntityId>,
    pub sport_code: Option<String>,
    pub venue: Option<Location>,
    pub total_market_count: u32,
    /// Markets in canonical market-type order
    pub markets: Vec<Market>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Competition {
    pub id: EntityId,
    pub name: String,
    pub sport_id: Option<EntityId>,
    pub venue: Option<Location>,
    pub matches: Vec<Match>,
    pub outright_market_count: u32,
    pub outright_markets: Vec<Market>,
}

impl Competition {
    /// No scheduled matches; the competition itself is what is bet on
    pub fn is_outright_only(&self) -> bool {
        self.matches.is_empty() && self.outright_market_count > 0
    }
}
