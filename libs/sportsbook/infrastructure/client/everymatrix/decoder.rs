use super::types::*;
use crate::domain::{
    BettingOfferDelta, DeltaUpdate, EntityPayload, FeedContent, MarketDelta, MatchInfoDelta,
    MatchStatus, SportCountersDelta,
};
use feedsockets::{ChannelError, FeedDecoder, FeedMessage};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{trace, warn};

/// Record types the aggregator sends that the store has no use for
const IGNORED_TYPES: &[&str] = &["EVENT_CATEGORY", "MARKET_INFO", "NEXT_MATCHES_NUMBER", "MARKET_GROUP"];

/// What one aggregator record turned into
#[derive(Debug)]
enum Decoded {
    Entity(EntityPayload),
    Delta(DeltaUpdate),
    Ignored,
}

/// Decoder for EveryMatrix aggregator topics
///
/// A malformed envelope fails the whole payload; a malformed record inside
/// a valid envelope is logged and skipped.
#[derive(Debug, Default, Clone)]
pub struct EveryMatrixDecoder;

impl EveryMatrixDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode a parsed envelope into store content
    pub fn decode_response(&self, response: AggregatorResponse) -> FeedContent {
        let mut content = FeedContent::new();
        for record in response.records {
            match decode_record(record) {
                Ok(Decoded::Entity(entity)) => content.entities.push(entity),
                Ok(Decoded::Delta(delta)) => content.deltas.push(delta),
                Ok(Decoded::Ignored) => {}
                Err(e) => warn!("[EveryMatrix] Dropping malformed record: {}", e),
            }
        }
        trace!(
            "[EveryMatrix] Decoded {:?}: {} entities, {} deltas",
            response.message_type,
            content.entities.len(),
            content.deltas.len()
        );
        content
    }
}

impl FeedDecoder for EveryMatrixDecoder {
    type Message = FeedContent;

    fn decode(&self, message: &FeedMessage) -> feedsockets::Result<FeedContent> {
        let response: AggregatorResponse = serde_json::from_slice(message.as_bytes())
            .map_err(|e| ChannelError::Decoding(format!("aggregator envelope: {}", e)))?;
        Ok(self.decode_response(response))
    }
}

fn decode_record(record: Value) -> Result<Decoded, String> {
    if record.get("changeType").is_some() {
        let change: ChangeRecordDto = parse(record)?;
        return decode_change(change);
    }

    let record_type = record
        .get("_type")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| "record without _type".to_string())?;
    decode_entity(&record_type, record)
}

fn decode_entity(record_type: &str, record: Value) -> Result<Decoded, String> {
    let entity = match record_type {
        "SPORT" => EntityPayload::Sport(parse::<SportDto>(record)?.into()),
        "MATCH" => EntityPayload::Match(parse::<MatchDto>(record)?.into()),
        "MARKET" => EntityPayload::Market(parse::<MarketDto>(record)?.into()),
        "OUTCOME" => EntityPayload::Outcome(parse::<OutcomeDto>(record)?.into()),
        "BETTING_OFFER" => EntityPayload::BettingOffer(parse::<BettingOfferDto>(record)?.into()),
        "LOCATION" => EntityPayload::Location(parse::<LocationDto>(record)?.into()),
        "TOURNAMENT" => EntityPayload::Tournament(parse::<TournamentDto>(record)?.into()),
        "MAIN_MARKET" => EntityPayload::MainMarket(parse::<MainMarketDto>(record)?.into()),
        "MARKET_OUTCOME_RELATION" => {
            EntityPayload::MarketOutcomeRelation(parse::<RelationDto>(record)?.into())
        }
        "EVENT_INFO" => return Ok(event_info(parse(record)?)),
        other if IGNORED_TYPES.contains(&other) => return Ok(Decoded::Ignored),
        other => {
            return Ok(Decoded::Delta(DeltaUpdate::Unknown {
                kind: format!("entity:{}", other),
                id: record.get("id").and_then(|v| serde_json::from_value(v.clone()).ok()),
            }))
        }
    };
    Ok(Decoded::Entity(entity))
}

fn decode_change(change: ChangeRecordDto) -> Result<Decoded, String> {
    match change.change_type {
        ChangeType::Create => match change.entity {
            Some(entity) => decode_entity(&change.entity_type, entity),
            None => Err(format!(
                "CREATE {}:{} without entity",
                change.entity_type, change.id
            )),
        },
        ChangeType::Update => {
            let properties = change.changed_properties.unwrap_or_default();
            decode_update(&change.entity_type, change.id, properties)
        }
        ChangeType::Delete => Ok(Decoded::Delta(DeltaUpdate::Unknown {
            kind: format!("delete:{}", change.entity_type),
            id: Some(change.id),
        })),
    }
}

fn decode_update(
    entity_type: &str,
    id: crate::domain::EntityId,
    properties: Map<String, Value>,
) -> Result<Decoded, String> {
    let properties = Value::Object(properties);
    let delta = match entity_type {
        "BETTING_OFFER" => {
            let changes: BettingOfferChanges = parse(properties)?;
            DeltaUpdate::BettingOffer(BettingOfferDelta {
                id,
                odd: changes.odds,
                status_id: changes.status_id,
                is_live: changes.is_live,
                is_available: changes.is_available,
            })
        }
        "MARKET" => {
            let changes: MarketChanges = parse(properties)?;
            DeltaUpdate::Market(MarketDelta {
                id,
                is_available: changes.is_available,
                is_closed: changes.is_closed,
            })
        }
        "MATCH" => {
            let changes: MatchChanges = parse(properties)?;
            match changes.number_of_markets {
                // A count-only change is its own delta kind
                Some(count)
                    if changes.home_score.is_none()
                        && changes.away_score.is_none()
                        && changes.match_time.is_none()
                        && changes.status_id.is_none() =>
                {
                    DeltaUpdate::MatchMarketCount {
                        id,
                        total_market_count: count,
                    }
                }
                _ => DeltaUpdate::MatchInfo(MatchInfoDelta {
                    id,
                    home_score: changes.home_score,
                    away_score: changes.away_score,
                    match_time: changes.match_time,
                    status: changes
                        .status_id
                        .as_deref()
                        .map(|s| MatchStatus::from_status_id(s, changes.status_name.as_deref())),
                }),
            }
        }
        "SPORT" => {
            let changes: SportChanges = parse(properties)?;
            DeltaUpdate::SportCounters(SportCountersDelta {
                id,
                number_events: changes.number_of_events,
                number_live_events: changes.number_of_live_events,
            })
        }
        other => DeltaUpdate::Unknown {
            kind: format!("update:{}", other),
            id: Some(id),
        },
    };
    Ok(Decoded::Delta(delta))
}

/// Map the live-data record types the store tracks: score, status and clock
fn event_info(info: EventInfoDto) -> Decoded {
    let mut delta = MatchInfoDelta {
        id: info.event_id,
        ..Default::default()
    };

    match info.type_id.as_deref() {
        Some("1") => {
            let whole_match = info
                .event_part_name
                .as_deref()
                .map(|part| part.contains("Match"))
                .unwrap_or(true);
            if !whole_match {
                return Decoded::Ignored;
            }
            delta.home_score = info.param_float1.map(|v| v.max(0.0) as u32);
            delta.away_score = info.param_float2.map(|v| v.max(0.0) as u32);
        }
        Some("92") => {
            let Some(status_name) = info.param_event_status_name1 else {
                return Decoded::Ignored;
            };
            let detail = info
                .param_event_part_name1
                .unwrap_or_else(|| status_name.clone());
            delta.status = Some(match status_name.to_lowercase().as_str() {
                "not started" | "not_started" => MatchStatus::NotStarted,
                "ended" | "finished" => MatchStatus::Ended(detail),
                _ => MatchStatus::InProgress(detail),
            });
        }
        Some("95") => {
            let Some(minutes) = info.param_float1 else {
                return Decoded::Ignored;
            };
            delta.match_time = Some(format!("{}", minutes.max(0.0) as u32));
        }
        _ => return Decoded::Ignored,
    }

    Decoded::Delta(DeltaUpdate::MatchInfo(delta))
}

fn parse<T: DeserializeOwned>(value: Value) -> Result<T, String> {
    serde_json::from_value(value).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityId;
    use serde_json::json;

    fn decode(payload: Value) -> FeedContent {
        EveryMatrixDecoder::new()
            .decode(&FeedMessage::from(payload))
            .unwrap()
    }

    #[test]
    fn test_initial_dump_entities() {
        let content = decode(json!({
            "version": "1.0",
            "format": "AGGREGATOR",
            "messageType": "INITIAL_DUMP",
            "records": [
                {"_type": "MATCH", "id": 123, "sportId": "1", "parentId": "77",
                 "homeParticipantName": "Benfica", "awayParticipantName": "Porto",
                 "statusId": "2", "statusName": "1st Half", "numberOfMarkets": 40,
                 "startTime": 1700000000000i64},
                {"_type": "MARKET", "id": "m1", "eventId": "123", "bettingTypeId": 69,
                 "shortName": "1X2", "isAvailable": true, "isClosed": false},
                {"_type": "OUTCOME", "id": "o1", "eventId": "123", "headerNameKey": "home",
                 "translatedName": "Benfica"},
                {"_type": "BETTING_OFFER", "id": "b1", "outcomeId": "o1", "odds": 1.5,
                 "statusId": "1", "isLive": true, "isAvailable": true},
                {"_type": "MARKET_OUTCOME_RELATION", "id": "r1", "marketId": "m1", "outcomeId": "o1"},
                {"_type": "MAIN_MARKET", "id": "mm1", "bettingTypeId": "69", "sportId": "1"},
                {"_type": "EVENT_CATEGORY", "id": "c1"}
            ]
        }));

        assert_eq!(content.entities.len(), 6);
        assert!(content.deltas.is_empty());

        let EntityPayload::Match(record) = &content.entities[0] else {
            panic!("expected match");
        };
        assert_eq!(record.id, EntityId::from("123"));
        assert_eq!(record.competition_id, Some(EntityId::from("77")));
        assert_eq!(record.status, MatchStatus::InProgress("1st Half".into()));
        assert_eq!(record.total_market_count, 40);
        assert!(record.start_date.is_some());

        let EntityPayload::Market(market) = &content.entities[1] else {
            panic!("expected market");
        };
        assert_eq!(market.type_id, "69");
        assert_eq!(market.match_id, Some(EntityId::from("123")));

        let EntityPayload::Outcome(outcome) = &content.entities[2] else {
            panic!("expected outcome");
        };
        assert_eq!(outcome.code_name, "home");
        assert_eq!(outcome.display_name, "Benfica");
    }

    #[test]
    fn test_update_records_become_deltas() {
        let content = decode(json!({
            "messageType": "UPDATE",
            "records": [
                {"changeType": "UPDATE", "entityType": "BETTING_OFFER", "id": "b1",
                 "changedProperties": {"odds": "1.6", "lastChangedTime": 1}},
                {"changeType": "UPDATE", "entityType": "MARKET", "id": "m1",
                 "changedProperties": {"isAvailable": false}},
                {"changeType": "UPDATE", "entityType": "MATCH", "id": "123",
                 "changedProperties": {"numberOfMarkets": 12}},
                {"changeType": "DELETE", "entityType": "MARKET", "id": "m9"}
            ]
        }));

        assert_eq!(
            content.deltas[0],
            DeltaUpdate::BettingOffer(BettingOfferDelta {
                id: EntityId::from("b1"),
                odd: Some(1.6),
                ..Default::default()
            })
        );
        assert_eq!(
            content.deltas[1],
            DeltaUpdate::Market(MarketDelta {
                id: EntityId::from("m1"),
                is_available: Some(false),
                is_closed: None,
            })
        );
        assert_eq!(
            content.deltas[2],
            DeltaUpdate::MatchMarketCount {
                id: EntityId::from("123"),
                total_market_count: 12,
            }
        );
        assert_eq!(content.deltas[3].kind(), "delete:MARKET");
    }

    #[test]
    fn test_create_record_carries_entity() {
        let content = decode(json!({
            "records": [
                {"changeType": "CREATE", "entityType": "BETTING_OFFER", "id": "b2",
                 "entity": {"id": "b2", "outcomeId": "o2", "odds": 2.2}}
            ]
        }));
        assert!(matches!(
            &content.entities[0],
            EntityPayload::BettingOffer(offer) if offer.odd == 2.2
        ));
    }

    #[test]
    fn test_event_info_maps_to_match_info() {
        let content = decode(json!({
            "records": [
                {"_type": "EVENT_INFO", "id": "e1", "eventId": "123", "typeId": "1",
                 "eventPartName": "Whole Match", "paramFloat1": 2, "paramFloat2": 1},
                {"_type": "EVENT_INFO", "id": "e2", "eventId": "123", "typeId": "95",
                 "paramFloat1": 67.0},
                {"_type": "EVENT_INFO", "id": "e3", "eventId": "123", "typeId": "1",
                 "eventPartName": "1st Set", "paramFloat1": 6, "paramFloat2": 4},
                {"_type": "EVENT_INFO", "id": "e4", "eventId": "123", "typeId": "37"}
            ]
        }));

        assert_eq!(content.deltas.len(), 2);
        let DeltaUpdate::MatchInfo(score) = &content.deltas[0] else {
            panic!("expected match info");
        };
        assert_eq!((score.home_score, score.away_score), (Some(2), Some(1)));
        let DeltaUpdate::MatchInfo(clock) = &content.deltas[1] else {
            panic!("expected match info");
        };
        assert_eq!(clock.match_time.as_deref(), Some("67"));
    }

    #[test]
    fn test_malformed_record_is_skipped() {
        let content = decode(json!({
            "records": [
                {"_type": "MARKET"},
                {"_type": "LOCATION", "id": 5, "name": "Portugal", "code": "PT"}
            ]
        }));
        assert_eq!(content.entities.len(), 1);
    }

    #[test]
    fn test_bad_envelope_is_a_decoding_error() {
        let result = EveryMatrixDecoder::new().decode(&FeedMessage::from("not json"));
        assert!(matches!(result, Err(ChannelError::Decoding(_))));
    }

    #[test]
    fn test_unknown_entity_type_is_forward_compatible() {
        let content = decode(json!({"records": [{"_type": "BETTING_BOOST", "id": 9}]}));
        assert_eq!(
            content.deltas[0],
            DeltaUpdate::Unknown {
                kind: "entity:BETTING_BOOST".into(),
                id: Some(EntityId::from("9")),
            }
        );
    }
}
