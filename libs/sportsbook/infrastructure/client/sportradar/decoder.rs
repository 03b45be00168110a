use super::types::*;
use crate::domain::{
    BettingOfferDelta, DeltaUpdate, EntityId, FeedContent, IntoFeedContent, MarketDelta,
    MatchInfoDelta, MatchStatus, Sport,
};
use feedsockets::{ChannelError, FeedDecoder, FeedMessage};
use serde_json::Value;
use tracing::{debug, warn};

/// Which sports list a message carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SportListKind {
    /// Every sport; names, codes and totals
    All,
    /// Sports with live events; live counters only
    Live,
}

/// Decoded SportRadar socket message
#[derive(Debug, Clone, PartialEq)]
pub enum SportRadarMessage {
    Sports {
        kind: SportListKind,
        sports: Vec<Sport>,
    },
    Content(FeedContent),
    /// Keep-alives, listening confirmations and paths nothing consumes
    Ignored,
}

impl IntoFeedContent for SportRadarMessage {
    fn into_feed_content(self) -> Option<FeedContent> {
        match self {
            SportRadarMessage::Content(content) => Some(content),
            _ => None,
        }
    }
}

/// Decoder for the SportRadar socket
#[derive(Debug, Default, Clone)]
pub struct SportRadarDecoder;

impl SportRadarDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode one parsed notification or bare content list
    pub fn decode_value(&self, value: Value) -> Result<SportRadarMessage, ChannelError> {
        let entries = if value.get("notificationType").is_some() {
            let notification: Notification = serde_json::from_value(value)
                .map_err(|e| ChannelError::Decoding(format!("notification: {}", e)))?;
            if notification.notification_type != "CONTENT_CHANGES" {
                debug!(
                    "[SportRadar] Ignoring {} notification",
                    notification.notification_type
                );
                return Ok(SportRadarMessage::Ignored);
            }
            notification.data
        } else {
            value
        };

        let entries: Vec<SocketContent> = match entries {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match serde_json::from_value(item) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!("[SportRadar] Dropping malformed content entry: {}", e);
                        None
                    }
                })
                .collect(),
            Value::Null => Vec::new(),
            single => vec![serde_json::from_value(single)
                .map_err(|e| ChannelError::Decoding(format!("content entry: {}", e)))?],
        };

        let mut sports = None;
        let mut content = FeedContent::new();
        for entry in entries {
            match decode_entry(entry) {
                SportRadarMessage::Sports { kind, sports: list } => sports = Some((kind, list)),
                SportRadarMessage::Content(decoded) => {
                    content.entities.extend(decoded.entities);
                    content.deltas.extend(decoded.deltas);
                }
                SportRadarMessage::Ignored => {}
            }
        }

        // A sports route only ever carries its list
        if let Some((kind, sports)) = sports {
            return Ok(SportRadarMessage::Sports { kind, sports });
        }
        if content.is_empty() {
            return Ok(SportRadarMessage::Ignored);
        }
        Ok(SportRadarMessage::Content(content))
    }
}

impl FeedDecoder for SportRadarDecoder {
    type Message = SportRadarMessage;

    fn decode(&self, message: &FeedMessage) -> feedsockets::Result<SportRadarMessage> {
        let value: Value = serde_json::from_slice(message.as_bytes())
            .map_err(|e| ChannelError::Decoding(format!("socket payload: {}", e)))?;
        self.decode_value(value)
    }
}

fn decode_entry(entry: SocketContent) -> SportRadarMessage {
    if entry.is_update() {
        return decode_update(entry);
    }

    let kind = match entry.content_id.content_type.as_str() {
        "liveSports" => SportListKind::Live,
        "allSports" | "preLiveSports" => SportListKind::All,
        "market" => {
            return match entry.change.map(serde_json::from_value::<MarketDto>) {
                Some(Ok(market)) => {
                    SportRadarMessage::Content(FeedContent::with_entities(market.into_entities(None)))
                }
                Some(Err(e)) => {
                    warn!("[SportRadar] Dropping malformed market content: {}", e);
                    SportRadarMessage::Ignored
                }
                None => SportRadarMessage::Ignored,
            };
        }
        other => {
            debug!("[SportRadar] No handler for initial content type {}", other);
            return SportRadarMessage::Ignored;
        }
    };

    // The change list is optional on sport lists; absent means empty
    let items = match entry.change {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    let sports = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<SportTypeDto>(item) {
            Ok(dto) => Some(match kind {
                SportListKind::All => dto.into_sport(),
                SportListKind::Live => dto.into_live_sport(),
            }),
            Err(e) => {
                warn!("[SportRadar] Dropping malformed sport: {}", e);
                None
            }
        })
        .collect();

    SportRadarMessage::Sports { kind, sports }
}

fn decode_update(entry: SocketContent) -> SportRadarMessage {
    let path = entry.path.as_deref().unwrap_or_default();
    let change_type = entry.change_type.as_deref().unwrap_or_default();
    let change = entry.change.unwrap_or(Value::Null);

    let has = |needle: &str| path.contains(needle);
    let on_market = has("idfoevent") && has("idfomarket");

    let delta = if on_market && change_type.contains("added") {
        return match serde_json::from_value::<MarketDto>(change) {
            Ok(market) => SportRadarMessage::Content(FeedContent::with_entities(
                market.into_entities(path_id(path, "idfoevent")),
            )),
            Err(e) => {
                warn!("[SportRadar] Dropping malformed added market at {}: {}", path, e);
                SportRadarMessage::Ignored
            }
        };
    } else if on_market && change_type.contains("removed") {
        path_id(path, "idfomarket").map(|id| {
            DeltaUpdate::Market(MarketDelta {
                id,
                is_available: Some(false),
                is_closed: None,
            })
        })
    } else if on_market && has("istradable") && change_type.contains("updated") {
        match (path_id(path, "idfomarket"), change.as_bool()) {
            (Some(id), Some(tradable)) => Some(DeltaUpdate::Market(MarketDelta {
                id,
                is_available: Some(tradable),
                is_closed: None,
            })),
            _ => None,
        }
    } else if (on_market && has("idfoselection") && change_type.contains("updated"))
        || (has("selections") && has("idfoselection"))
    {
        selection_delta(change)
    } else if has("idfoevent") && has("numMarkets") && change_type.contains("updated") {
        match (path_id(path, "idfoevent"), as_u32(&change)) {
            (Some(id), Some(count)) => Some(DeltaUpdate::MatchMarketCount {
                id,
                total_market_count: count,
            }),
            _ => None,
        }
    } else if has("liveDataSummary") && has("scores") && (has("MATCH_SCORE") || has("CURRENT_SCORE")) {
        match (path_id(path, "idfoevent"), serde_json::from_value::<ScoreChange>(change)) {
            (Some(id), Ok(score)) => Some(DeltaUpdate::MatchInfo(MatchInfoDelta {
                id,
                home_score: score.home,
                away_score: score.away,
                ..Default::default()
            })),
            _ => None,
        }
    } else if has("liveDataSummary") && has("matchTime") && change_type.contains("updated") {
        match (path_id(path, "idfoevent"), match_minutes(&change)) {
            (Some(id), Some(minutes)) => Some(DeltaUpdate::MatchInfo(MatchInfoDelta {
                id,
                match_time: Some(minutes),
                ..Default::default()
            })),
            _ => None,
        }
    } else if has("liveDataSummary") && has("status") {
        match (path_id(path, "idfoevent"), change.as_str()) {
            (Some(id), Some(status)) => Some(DeltaUpdate::MatchInfo(MatchInfoDelta {
                id,
                status: Some(MatchStatus::from_code(status)),
                ..Default::default()
            })),
            _ => None,
        }
    } else {
        None
    };

    match delta {
        Some(delta) => SportRadarMessage::Content(FeedContent::with_deltas(vec![delta])),
        None => {
            debug!("[SportRadar] Ignoring {} at {}", change_type, path);
            SportRadarMessage::Ignored
        }
    }
}

fn selection_delta(change: Value) -> Option<DeltaUpdate> {
    let selection: SelectionChange = serde_json::from_value(change).ok()?;
    let odd = decimal_odds(selection.price_up?, selection.price_down?)?;
    Some(DeltaUpdate::BettingOffer(BettingOfferDelta {
        id: selection.selection_id,
        odd: Some(odd),
        ..Default::default()
    }))
}

/// ID following `key` in a content path such as `idfoevent[42].markets.idfomarket[7]`
fn path_id(path: &str, key: &str) -> Option<EntityId> {
    let start = path.find(key)? + key.len();
    let rest = path[start..].trim_start_matches(|c: char| "[=/.:\"'".contains(c));
    let id: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    (!id.is_empty()).then(|| EntityId::new(id))
}

/// Minutes part of a `mm:ss` clock
fn match_minutes(change: &Value) -> Option<String> {
    match change {
        Value::String(clock) => {
            let minutes = clock.split(':').next()?.trim();
            (!minutes.is_empty()).then(|| minutes.to_string())
        }
        Value::Number(n) => n.as_u64().map(|m| m.to_string()),
        _ => None,
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityPayload;
    use serde_json::json;

    fn decode(value: Value) -> SportRadarMessage {
        SportRadarDecoder::new().decode_value(value).unwrap()
    }

    fn single_delta(message: SportRadarMessage) -> DeltaUpdate {
        match message {
            SportRadarMessage::Content(mut content) => {
                assert_eq!(content.deltas.len(), 1);
                content.deltas.remove(0)
            }
            other => panic!("expected content, got {:?}", other),
        }
    }

    fn update(path: &str, change_type: &str, change: Value) -> Value {
        json!({
            "notificationType": "CONTENT_CHANGES",
            "data": [{
                "contentId": {"type": "eventDetails", "id": "42"},
                "path": path,
                "changeType": change_type,
                "change": change
            }]
        })
    }

    #[test]
    fn test_live_sports_list() {
        let message = decode(json!({
            "notificationType": "CONTENT_CHANGES",
            "data": [{
                "contentId": {"type": "liveSports", "id": "liveSports"},
                "change": [
                    {"idfosporttype": "FBL", "sporttypename": "Football", "numEvents": 5},
                    {"bogus": true}
                ]
            }]
        }));
        let SportRadarMessage::Sports { kind, sports } = message else {
            panic!("expected sports");
        };
        assert_eq!(kind, SportListKind::Live);
        assert_eq!(sports.len(), 1);
        assert_eq!(sports[0].number_live_events, 5);
    }

    #[test]
    fn test_pre_live_sports_without_change_is_empty() {
        let message = decode(json!([{"contentId": {"type": "preLiveSports"}}]));
        assert_eq!(
            message,
            SportRadarMessage::Sports {
                kind: SportListKind::All,
                sports: Vec::new(),
            }
        );
    }

    #[test]
    fn test_listening_started_is_ignored() {
        let message = decode(json!({"notificationType": "LISTENING_STARTED", "data": {}}));
        assert_eq!(message, SportRadarMessage::Ignored);
    }

    #[test]
    fn test_selection_odds_update() {
        let delta = single_delta(decode(update(
            "idfoevent[42].markets.idfomarket[7].selections.idfoselection[99]",
            "updated",
            json!({"idfoselection": "99", "currentpriceup": "1", "currentpricedown": "2"}),
        )));
        assert_eq!(
            delta,
            DeltaUpdate::BettingOffer(BettingOfferDelta {
                id: EntityId::from("99"),
                odd: Some(1.5),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_market_tradability_and_removal() {
        let delta = single_delta(decode(update(
            "idfoevent[42].markets.idfomarket[7].istradable",
            "updated",
            json!(false),
        )));
        assert_eq!(
            delta,
            DeltaUpdate::Market(MarketDelta {
                id: EntityId::from("7"),
                is_available: Some(false),
                is_closed: None,
            })
        );

        let delta = single_delta(decode(update(
            "idfoevent[42].markets.idfomarket[7]",
            "removed",
            Value::Null,
        )));
        assert!(matches!(
            delta,
            DeltaUpdate::Market(MarketDelta { is_available: Some(false), .. })
        ));
    }

    #[test]
    fn test_live_data_updates() {
        let score = single_delta(decode(update(
            "idfoevent[42].liveDataSummary.scores.CURRENT_SCORE",
            "updated",
            json!({"home": 2, "away": 0}),
        )));
        let DeltaUpdate::MatchInfo(score) = score else {
            panic!("expected match info");
        };
        assert_eq!(score.id, EntityId::from("42"));
        assert_eq!((score.home_score, score.away_score), (Some(2), Some(0)));

        let clock = single_delta(decode(update(
            "idfoevent[42].liveDataSummary.matchTime",
            "updated",
            json!("67:12"),
        )));
        let DeltaUpdate::MatchInfo(clock) = clock else {
            panic!("expected match info");
        };
        assert_eq!(clock.match_time.as_deref(), Some("67"));

        let count = single_delta(decode(update("idfoevent[42].numMarkets", "updated", json!(31))));
        assert_eq!(
            count,
            DeltaUpdate::MatchMarketCount {
                id: EntityId::from("42"),
                total_market_count: 31,
            }
        );
    }

    #[test]
    fn test_added_market_carries_entities() {
        let message = decode(update(
            "idfoevent[42].markets.idfomarket[7]",
            "added",
            json!({
                "idfomarket": "7",
                "name": "Match Result",
                "idefmarkettype": "1X2",
                "istradable": true,
                "selections": [
                    {"idfoselection": "70", "name": "Home", "outcometype": "home",
                     "currentpriceup": "1", "currentpricedown": "2"}
                ]
            }),
        ));
        let SportRadarMessage::Content(content) = message else {
            panic!("expected content");
        };
        assert_eq!(content.entities.len(), 3);
        let EntityPayload::Market(market) = &content.entities[0] else {
            panic!("expected market");
        };
        assert_eq!(market.match_id, Some(EntityId::from("42")));
        assert_eq!(market.outcome_ids, vec![EntityId::from("70")]);
    }

    #[test]
    fn test_unknown_path_is_ignored() {
        let message = decode(update("idfoevent[42].liveDataSummary.serve", "updated", json!("home")));
        assert_eq!(message, SportRadarMessage::Ignored);
    }

    #[test]
    fn test_path_id_formats() {
        assert_eq!(path_id("idfoevent[42].x", "idfoevent"), Some(EntityId::from("42")));
        assert_eq!(path_id("/idfoevent/42/x", "idfoevent"), Some(EntityId::from("42")));
        assert_eq!(path_id("idfoevent=abc-1", "idfoevent"), Some(EntityId::from("abc-1")));
        assert_eq!(path_id("markets", "idfoevent"), None);
    }

    #[test]
    fn test_bad_payload_is_a_decoding_error() {
        let result = SportRadarDecoder::new().decode(&FeedMessage::from("{"));
        assert!(matches!(result, Err(ChannelError::Decoding(_))));
    }
}
