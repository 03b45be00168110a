//! EveryMatrix wire types
//!
//! Only the fields the store keeps are modelled. Numeric fields go through
//! the `flexible` helpers because the aggregator mixes strings and numbers.

use crate::domain::ids::flexible;
use crate::domain::{
    BettingOfferRecord, EntityId, Location, MainMarket, MarketOutcomeRelation, MarketRecord,
    MatchRecord, MatchStatus, OutcomeRecord, Participant, Sport, TournamentRecord,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

fn default_true() -> bool {
    true
}

/// Aggregator envelope
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatorResponse {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    /// `INITIAL_DUMP` or `UPDATE`
    #[serde(default)]
    pub message_type: Option<String>,
    /// Kept raw so one malformed record cannot sink the whole message
    #[serde(default)]
    pub records: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecordDto {
    pub change_type: ChangeType,
    pub entity_type: String,
    pub id: EntityId,
    #[serde(default)]
    pub entity: Option<Value>,
    #[serde(default)]
    pub changed_properties: Option<Map<String, Value>>,
}

// =============================================================================
// Entities
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SportDto {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default, deserialize_with = "flexible::option_u32")]
    pub number_of_events: Option<u32>,
    #[serde(default, deserialize_with = "flexible::option_u32")]
    pub number_of_live_events: Option<u32>,
}

impl From<SportDto> for Sport {
    fn from(dto: SportDto) -> Self {
        Sport {
            numeric_id: Some(dto.id.to_string()),
            id: dto.id,
            name: dto.name,
            alpha_id: dto.short_name,
            number_events: dto.number_of_events.unwrap_or_default(),
            number_live_events: dto.number_of_live_events.unwrap_or_default(),
            number_outright_events: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDto {
    pub id: EntityId,
    #[serde(default)]
    pub sport_id: Option<EntityId>,
    #[serde(default)]
    pub short_sport_name: Option<String>,
    /// Tournament the match belongs to
    #[serde(default)]
    pub parent_id: Option<EntityId>,
    #[serde(default)]
    pub parent_name: Option<String>,
    #[serde(default)]
    pub venue_id: Option<EntityId>,
    /// Milliseconds since the epoch
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default, deserialize_with = "flexible::option_string")]
    pub status_id: Option<String>,
    #[serde(default)]
    pub status_name: Option<String>,
    #[serde(default, deserialize_with = "flexible::option_u32")]
    pub number_of_markets: Option<u32>,
    #[serde(default)]
    pub home_participant_id: Option<EntityId>,
    #[serde(default)]
    pub home_participant_name: String,
    #[serde(default)]
    pub away_participant_id: Option<EntityId>,
    #[serde(default)]
    pub away_participant_name: String,
}

impl From<MatchDto> for MatchRecord {
    fn from(dto: MatchDto) -> Self {
        let status = dto
            .status_id
            .as_deref()
            .map(|id| MatchStatus::from_status_id(id, dto.status_name.as_deref()))
            .unwrap_or_default();
        MatchRecord {
            id: dto.id,
            sport_id: dto.sport_id,
            sport_code: dto.short_sport_name,
            competition_id: dto.parent_id,
            competition_name: dto.parent_name,
            venue_id: dto.venue_id,
            home: Participant {
                id: dto.home_participant_id,
                name: dto.home_participant_name,
            },
            away: Participant {
                id: dto.away_participant_id,
                name: dto.away_participant_name,
            },
            home_score: None,
            away_score: None,
            match_time: None,
            start_date: dto.start_time.and_then(DateTime::<Utc>::from_timestamp_millis),
            status,
            market_ids: Vec::new(),
            total_market_count: dto.number_of_markets.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDto {
    pub id: EntityId,
    #[serde(default)]
    pub event_id: Option<EntityId>,
    #[serde(default, deserialize_with = "flexible::option_string")]
    pub betting_type_id: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "flexible::option_f64")]
    pub param_float1: Option<f64>,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub is_closed: bool,
}

impl From<MarketDto> for MarketRecord {
    fn from(dto: MarketDto) -> Self {
        MarketRecord {
            id: dto.id,
            match_id: dto.event_id,
            type_id: dto.betting_type_id.unwrap_or_default(),
            short_name: dto.short_name.or(dto.name).unwrap_or_default(),
            params: dto.param_float1.into_iter().collect(),
            is_available: dto.is_available,
            is_closed: dto.is_closed,
            outcome_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeDto {
    pub id: EntityId,
    #[serde(default)]
    pub event_id: Option<EntityId>,
    #[serde(default)]
    pub code: Option<String>,
    /// Machine key such as `home`, `draw`, `over`
    #[serde(default)]
    pub header_name_key: Option<String>,
    #[serde(default)]
    pub translated_name: Option<String>,
    #[serde(default, deserialize_with = "flexible::option_f64")]
    pub param_float1: Option<f64>,
}

impl From<OutcomeDto> for OutcomeRecord {
    fn from(dto: OutcomeDto) -> Self {
        let code_name = dto
            .header_name_key
            .filter(|key| !key.is_empty())
            .or(dto.code)
            .unwrap_or_default();
        OutcomeRecord {
            id: dto.id,
            market_id: None,
            match_id: dto.event_id,
            display_name: dto.translated_name.unwrap_or_else(|| code_name.clone()),
            code_name,
            params: dto.param_float1.into_iter().collect(),
            betting_offer_id: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BettingOfferDto {
    pub id: EntityId,
    #[serde(default)]
    pub outcome_id: Option<EntityId>,
    #[serde(default, deserialize_with = "flexible::option_f64")]
    pub odds: Option<f64>,
    #[serde(default, deserialize_with = "flexible::option_string")]
    pub status_id: Option<String>,
    #[serde(default)]
    pub is_live: bool,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

impl From<BettingOfferDto> for BettingOfferRecord {
    fn from(dto: BettingOfferDto) -> Self {
        BettingOfferRecord {
            id: dto.id,
            outcome_id: dto.outcome_id,
            odd: dto.odds.unwrap_or_default(),
            status_id: dto.status_id.unwrap_or_default(),
            is_live: dto.is_live,
            is_available: dto.is_available,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationDto {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}

impl From<LocationDto> for Location {
    fn from(dto: LocationDto) -> Self {
        Location {
            id: dto.id,
            name: dto.name,
            iso_code: dto.code,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentDto {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sport_id: Option<EntityId>,
    #[serde(default)]
    pub venue_id: Option<EntityId>,
    #[serde(default, deserialize_with = "flexible::option_u32")]
    pub number_of_outright_markets: Option<u32>,
}

impl From<TournamentDto> for TournamentRecord {
    fn from(dto: TournamentDto) -> Self {
        TournamentRecord {
            id: dto.id,
            name: dto.name,
            sport_id: dto.sport_id,
            venue_id: dto.venue_id,
            match_ids: Vec::new(),
            outright_market_count: dto.number_of_outright_markets.unwrap_or_default(),
            outright_market_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainMarketDto {
    pub id: EntityId,
    #[serde(default, deserialize_with = "flexible::option_string")]
    pub betting_type_id: Option<String>,
    #[serde(default)]
    pub sport_id: Option<EntityId>,
}

impl From<MainMarketDto> for MainMarket {
    fn from(dto: MainMarketDto) -> Self {
        MainMarket {
            id: dto.id,
            type_id: dto.betting_type_id.unwrap_or_default(),
            sport_id: dto.sport_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationDto {
    pub id: EntityId,
    pub market_id: EntityId,
    pub outcome_id: EntityId,
}

impl From<RelationDto> for MarketOutcomeRelation {
    fn from(dto: RelationDto) -> Self {
        MarketOutcomeRelation {
            id: dto.id,
            market_id: dto.market_id,
            outcome_id: dto.outcome_id,
        }
    }
}

/// Live data attached to a match; `type_id` says which fields matter
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInfoDto {
    pub id: EntityId,
    pub event_id: EntityId,
    #[serde(default, deserialize_with = "flexible::option_string")]
    pub type_id: Option<String>,
    #[serde(default)]
    pub event_part_name: Option<String>,
    #[serde(default, deserialize_with = "flexible::option_f64")]
    pub param_float1: Option<f64>,
    #[serde(default, deserialize_with = "flexible::option_f64")]
    pub param_float2: Option<f64>,
    #[serde(default)]
    pub param_event_status_name1: Option<String>,
    #[serde(default)]
    pub param_event_part_name1: Option<String>,
}

// =============================================================================
// Changed properties
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BettingOfferChanges {
    #[serde(default, deserialize_with = "flexible::option_f64")]
    pub odds: Option<f64>,
    #[serde(default, deserialize_with = "flexible::option_string")]
    pub status_id: Option<String>,
    #[serde(default)]
    pub is_live: Option<bool>,
    #[serde(default)]
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketChanges {
    #[serde(default)]
    pub is_available: Option<bool>,
    #[serde(default)]
    pub is_closed: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchChanges {
    #[serde(default, deserialize_with = "flexible::option_u32")]
    pub home_score: Option<u32>,
    #[serde(default, deserialize_with = "flexible::option_u32")]
    pub away_score: Option<u32>,
    #[serde(default, deserialize_with = "flexible::option_string")]
    pub match_time: Option<String>,
    #[serde(default, deserialize_with = "flexible::option_string")]
    pub status_id: Option<String>,
    #[serde(default)]
    pub status_name: Option<String>,
    #[serde(default, deserialize_with = "flexible::option_u32")]
    pub number_of_markets: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SportChanges {
    #[serde(default, deserialize_with = "flexible::option_u32")]
    pub number_of_events: Option<u32>,
    #[serde(default, deserialize_with = "flexible::option_u32")]
    pub number_of_live_events: Option<u32>,
}
