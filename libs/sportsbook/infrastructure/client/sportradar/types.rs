//! SportRadar socket wire types

use crate::domain::ids::flexible;
use crate::domain::{
    BettingOfferRecord, EntityId, EntityPayload, MarketRecord, OutcomeRecord, Sport,
};
use serde::Deserialize;
use serde_json::Value;

/// Socket notification envelope
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// `LISTENING_STARTED` or `CONTENT_CHANGES`
    pub notification_type: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContentIdentifier {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default, deserialize_with = "flexible::option_string")]
    pub id: Option<String>,
}

/// One entry of a `CONTENT_CHANGES` notification
///
/// Initial content carries only `change`; updates address a field by `path`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketContent {
    pub content_id: ContentIdentifier,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub change_type: Option<String>,
    #[serde(default)]
    pub change: Option<Value>,
}

impl SocketContent {
    pub fn is_update(&self) -> bool {
        self.path.is_some() || self.change_type.is_some()
    }
}

// =============================================================================
// Sports
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SportTypeDto {
    /// Alpha code such as `FBL`
    #[serde(rename = "idfosporttype")]
    pub alpha_id: String,
    #[serde(rename = "idfosport", default, deserialize_with = "flexible::option_string")]
    pub numeric_id: Option<String>,
    #[serde(rename = "sporttypename", default)]
    pub name: String,
    #[serde(
        rename = "numEvents",
        alias = "numevents",
        default,
        deserialize_with = "flexible::option_u32"
    )]
    pub num_events: Option<u32>,
    #[serde(
        rename = "numOutrightEvents",
        alias = "numoutrightevents",
        default,
        deserialize_with = "flexible::option_u32"
    )]
    pub num_outright_events: Option<u32>,
}

impl SportTypeDto {
    /// Sport from the all-sports list: `numEvents` is the total
    pub fn into_sport(self) -> Sport {
        Sport {
            id: EntityId::new(&self.alpha_id),
            name: self.name,
            alpha_id: Some(self.alpha_id),
            numeric_id: self.numeric_id,
            number_events: self.num_events.unwrap_or_default(),
            number_live_events: 0,
            number_outright_events: self.num_outright_events.unwrap_or_default(),
        }
    }

    /// Sport from the live list: `numEvents` counts live events only
    pub fn into_live_sport(self) -> Sport {
        let live = self.num_events.unwrap_or_default();
        Sport {
            number_live_events: live,
            number_events: 0,
            ..self.into_sport()
        }
    }
}

// =============================================================================
// Markets
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SelectionDto {
    #[serde(rename = "idfoselection")]
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "outcometype", default)]
    pub outcome_type: Option<String>,
    #[serde(rename = "currentpriceup", default, deserialize_with = "flexible::option_f64")]
    pub price_up: Option<f64>,
    #[serde(rename = "currentpricedown", default, deserialize_with = "flexible::option_f64")]
    pub price_down: Option<f64>,
    #[serde(rename = "istradable", default = "default_true")]
    pub is_tradable: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketDto {
    #[serde(rename = "idfomarket")]
    pub id: EntityId,
    #[serde(rename = "idfoevent", default)]
    pub event_id: Option<EntityId>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "idefmarkettype", default, deserialize_with = "flexible::option_string")]
    pub market_type_id: Option<String>,
    #[serde(rename = "line", default, deserialize_with = "flexible::option_f64")]
    pub line: Option<f64>,
    #[serde(rename = "istradable", default = "default_true")]
    pub is_tradable: bool,
    #[serde(rename = "selections", default)]
    pub selections: Vec<SelectionDto>,
}

fn default_true() -> bool {
    true
}

/// Fractional price to decimal odds
pub fn decimal_odds(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator <= 0.0 || numerator < 0.0 {
        return None;
    }
    Some(numerator / denominator + 1.0)
}

impl MarketDto {
    /// Market, its outcomes and their offers
    ///
    /// SportRadar shares the selection ID between outcome and offer.
    pub fn into_entities(self, event_id: Option<EntityId>) -> Vec<EntityPayload> {
        let match_id = self.event_id.or(event_id);
        let mut entities = Vec::with_capacity(1 + self.selections.len() * 2);

        entities.push(EntityPayload::Market(MarketRecord {
            id: self.id.clone(),
            match_id: match_id.clone(),
            type_id: self.market_type_id.unwrap_or_default(),
            short_name: self.name,
            params: self.line.into_iter().collect(),
            is_available: self.is_tradable,
            is_closed: false,
            outcome_ids: self.selections.iter().map(|s| s.id.clone()).collect(),
        }));

        for selection in self.selections {
            let odd = match (selection.price_up, selection.price_down) {
                (Some(up), Some(down)) => decimal_odds(up, down),
                _ => None,
            };
            entities.push(EntityPayload::Outcome(OutcomeRecord {
                id: selection.id.clone(),
                market_id: Some(self.id.clone()),
                match_id: match_id.clone(),
                code_name: selection
                    .outcome_type
                    .unwrap_or_else(|| selection.name.to_lowercase()),
                display_name: selection.name,
                params: Vec::new(),
                betting_offer_id: Some(selection.id.clone()),
            }));
            if let Some(odd) = odd {
                entities.push(EntityPayload::BettingOffer(BettingOfferRecord {
                    id: selection.id.clone(),
                    outcome_id: Some(selection.id),
                    odd,
                    status_id: String::new(),
                    is_live: false,
                    is_available: selection.is_tradable,
                }));
            }
        }
        entities
    }
}

// =============================================================================
// Update payloads
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SelectionChange {
    #[serde(rename = "idfoselection")]
    pub selection_id: EntityId,
    #[serde(rename = "currentpriceup", default, deserialize_with = "flexible::option_f64")]
    pub price_up: Option<f64>,
    #[serde(rename = "currentpricedown", default, deserialize_with = "flexible::option_f64")]
    pub price_down: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoreChange {
    #[serde(default, deserialize_with = "flexible::option_u32")]
    pub home: Option<u32>,
    #[serde(default, deserialize_with = "flexible::option_u32")]
    pub away: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_odds() {
        assert_eq!(decimal_odds(1.0, 2.0), Some(1.5));
        assert_eq!(decimal_odds(5.0, 2.0), Some(3.5));
        assert_eq!(decimal_odds(1.0, 0.0), None);
    }

    #[test]
    fn test_sport_type_counts() {
        let dto: SportTypeDto = serde_json::from_str(
            r#"{"idfosporttype":"FBL","sporttypename":"Football","numevents":"12"}"#,
        )
        .unwrap();
        let live = dto.clone().into_live_sport();
        let all = dto.into_sport();
        assert_eq!(all.number_events, 12);
        assert_eq!(all.merge_key(), "FBL");
        assert_eq!(live.number_live_events, 12);
        assert_eq!(live.number_events, 0);
    }
}
