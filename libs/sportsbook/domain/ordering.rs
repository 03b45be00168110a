//! Display ordering for markets and outcomes
//!
//! Both sorts are stable: ties keep arrival order.

use super::snapshot::{Market, Outcome};

/// Rank of an outcome code within its market (lower sorts first)
///
/// Unknown codes rank 1000 and trail in their original order.
pub fn outcome_rank(code_name: &str) -> u32 {
    match code_name.to_lowercase().as_str() {
        "yes" | "home" | "home_draw" | "over" | "odd" | "exact" | "in_90_minutes" | "true"
        | "h" => 10,
        "no" | "draw" | "home_away" | "under" | "even" | "range" | "in_extra_time" | "false"
        | "d" => 20,
        "none" => 21,
        "" => 22,
        "away" | "away_draw" | "more_than" | "on_penalties" | "a" => 30,

        "home-true" | "home_draw-true" | "over-true" | "odd-true" | "yes-true" => 10,
        "home-false" | "home_draw-false" | "over-false" | "odd-false" | "yes-false" => 15,
        "-true" | "home_away-true" | "under-true" | "even-true" | "no-true" => 20,
        "-false" | "home_away-false" | "under-false" | "even-false" | "no-false" => 25,
        "away-true" | "away_draw-true" => 30,
        "away-false" | "away_draw-false" => 35,

        _ => 1000,
    }
}

/// Position of a market type in the canonical order; unlisted types sort last
pub fn market_position(order: &[String], type_id: &str) -> usize {
    order
        .iter()
        .position(|listed| listed == type_id)
        .unwrap_or(usize::MAX)
}

pub fn sort_outcomes(outcomes: &mut [Outcome]) {
    outcomes.sort_by_key(|outcome| outcome_rank(&outcome.code_name));
}

pub fn sort_markets(markets: &mut [Market], order: &[String]) {
    markets.sort_by_key(|market| market_position(order, &market.type_id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BettingOffer, EntityId};

    fn market(id: &str, type_id: &str) -> Market {
        Market {
            id: EntityId::from(id),
            type_id: type_id.to_string(),
            name: type_id.to_string(),
            params: vec![],
            is_available: true,
            is_closed: false,
            outcomes: vec![],
        }
    }

    fn outcome(id: &str, code: &str) -> Outcome {
        Outcome {
            id: EntityId::from(id),
            market_id: EntityId::from("m"),
            code_name: code.to_string(),
            display_name: code.to_string(),
            params: vec![],
            betting_offer: BettingOffer {
                id: EntityId::from(id),
                odd: 2.0,
                status_id: "1".into(),
                is_live: false,
                is_available: true,
            },
        }
    }

    fn ids<T>(items: &[T], id: impl Fn(&T) -> &EntityId) -> Vec<String> {
        items.iter().map(|i| id(i).to_string()).collect()
    }

    #[test]
    fn test_unlisted_market_types_trail_in_arrival_order() {
        let mut markets = vec![
            market("a", "1X2"),
            market("b", "BTTS"),
            market("c", "OU25"),
            market("d", "DNB"),
        ];
        sort_markets(&mut markets, &["OU25".to_string(), "1X2".to_string()]);
        assert_eq!(ids(&markets, |m| &m.id), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_outcome_rank_orders_common_codes() {
        let mut outcomes = vec![
            outcome("3", "away"),
            outcome("1", "Home"),
            outcome("2", "draw"),
        ];
        sort_outcomes(&mut outcomes);
        assert_eq!(ids(&outcomes, |o| &o.id), vec!["1", "2", "3"]);

        let mut outcomes = vec![outcome("u", "under"), outcome("o", "over")];
        sort_outcomes(&mut outcomes);
        assert_eq!(ids(&outcomes, |o| &o.id), vec!["o", "u"]);
    }

    #[test]
    fn test_unknown_outcome_codes_keep_order() {
        let mut outcomes = vec![outcome("1", "1"), outcome("x", "X"), outcome("2", "2")];
        sort_outcomes(&mut outcomes);
        assert_eq!(ids(&outcomes, |o| &o.id), vec!["1", "x", "2"]);
        assert_eq!(outcome_rank("1"), 1000);
        assert_eq!(outcome_rank(""), 22);
        assert_eq!(outcome_rank("H"), 10);
    }
}
