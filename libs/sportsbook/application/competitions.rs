//! Competitions publisher
//!
//! Reassembles every known competition whenever the store revision moves and
//! republishes only when the assembled list actually differs.

use super::assembler::SnapshotAssembler;
use crate::domain::{Competition, Match};
use crate::infrastructure::store::StoreReader;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Display filter for competition lists
#[derive(Debug, Clone, PartialEq)]
pub struct CompetitionFilter {
    /// Market type shown first for every match
    pub market_type: String,
    /// Inclusive odds bounds for the first market
    pub min_odd: f64,
    pub max_odd: f64,
}

impl CompetitionFilter {
    pub fn new(market_type: impl Into<String>, min_odd: f64, max_odd: f64) -> Self {
        Self {
            market_type: market_type.into(),
            min_odd,
            max_odd,
        }
    }

    pub fn contains(&self, odd: f64) -> bool {
        odd >= self.min_odd && odd <= self.max_odd
    }

    /// Filter one match; `None` when it does not qualify
    ///
    /// The first market of the preferred type moves to the front. The match
    /// qualifies when any odd of its first market is within range.
    pub fn apply_to_match(&self, mut snapshot: Match) -> Option<Match> {
        if let Some(position) = snapshot
            .markets
            .iter()
            .position(|market| market.type_id == self.market_type)
        {
            let preferred = snapshot.markets.remove(position);
            snapshot.markets.insert(0, preferred);
        }

        let first = snapshot.markets.first()?;
        first
            .outcomes
            .iter()
            .any(|outcome| self.contains(outcome.betting_offer.odd))
            .then_some(snapshot)
    }

    /// Filter a competition list
    ///
    /// Competitions left without matches are dropped; outright-only ones are
    /// kept as they are.
    pub fn apply(&self, competitions: Vec<Competition>) -> Vec<Competition> {
        competitions
            .into_iter()
            .filter_map(|mut competition| {
                if competition.is_outright_only() {
                    return Some(competition);
                }
                competition.matches = std::mem::take(&mut competition.matches)
                    .into_iter()
                    .filter_map(|snapshot| self.apply_to_match(snapshot))
                    .collect();
                (!competition.matches.is_empty()).then_some(competition)
            })
            .collect()
    }
}

/// Keeps the published competition list in step with the store
pub struct CompetitionsAggregator {
    publisher: watch::Sender<Vec<Competition>>,
    task: JoinHandle<()>,
}

impl CompetitionsAggregator {
    /// Publish now, then again after every store revision
    pub fn start(
        reader: StoreReader,
        mut revisions: watch::Receiver<u64>,
        fallback_order: Arc<Vec<String>>,
        filter: Option<CompetitionFilter>,
    ) -> Self {
        let compute = move || {
            let competitions = reader.read(|store| {
                SnapshotAssembler::new(store, &fallback_order).assemble_competitions()
            });
            match &filter {
                Some(filter) => filter.apply(competitions),
                None => competitions,
            }
        };

        let (publisher, _) = watch::channel(compute());
        let sender = publisher.clone();

        let task = tokio::spawn(async move {
            while revisions.changed().await.is_ok() {
                let next = compute();
                let changed = sender.send_if_modified(|current| {
                    if *current != next {
                        *current = next;
                        true
                    } else {
                        false
                    }
                });
                if changed {
                    debug!("[Competitions] Republished after revision {}", *revisions.borrow());
                }
            }
            info!("[Competitions] Store closed, publisher stopped");
        });

        Self { publisher, task }
    }

    pub fn competitions_publisher(&self) -> watch::Receiver<Vec<Competition>> {
        self.publisher.subscribe()
    }

    pub fn competitions(&self) -> Vec<Competition> {
        self.publisher.borrow().clone()
    }
}

impl Drop for CompetitionsAggregator {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::*;

    fn offer(id: &str, odd: f64) -> BettingOffer {
        BettingOffer {
            id: EntityId::new(id),
            odd,
            status_id: String::new(),
            is_live: false,
            is_available: true,
        }
    }

    fn market(id: &str, type_id: &str, odds: &[f64]) -> Market {
        Market {
            id: EntityId::new(id),
            type_id: type_id.to_string(),
            name: type_id.to_string(),
            params: Vec::new(),
            is_available: true,
            is_closed: false,
            outcomes: odds
                .iter()
                .enumerate()
                .map(|(i, odd)| Outcome {
                    id: EntityId::new(format!("{}-o{}", id, i)),
                    market_id: EntityId::new(id),
                    code_name: String::new(),
                    display_name: String::new(),
                    params: Vec::new(),
                    betting_offer: offer(&format!("{}-b{}", id, i), *odd),
                })
                .collect(),
        }
    }

    fn snapshot(id: &str, markets: Vec<Market>) -> Match {
        Match {
            id: EntityId::new(id),
            competition_id: None,
            competition_name: None,
            home: Participant::default(),
            away: Participant::default(),
            home_score: None,
            away_score: None,
            match_time: None,
            start_date: None,
            status: MatchStatus::default(),
            sport_id: None,
            sport_code: None,
            venue: None,
            total_market_count: markets.len() as u32,
            markets,
        }
    }

    fn competition(id: &str, matches: Vec<Match>, outrights: u32) -> Competition {
        Competition {
            id: EntityId::new(id),
            name: id.to_string(),
            sport_id: None,
            venue: None,
            matches,
            outright_market_count: outrights,
            outright_markets: Vec::new(),
        }
    }

    #[test]
    fn test_preferred_market_moves_first() {
        let filter = CompetitionFilter::new("OU25", 1.0, 10.0);
        let filtered = filter
            .apply_to_match(snapshot(
                "1",
                vec![market("m1", "1X2", &[2.0]), market("m2", "OU25", &[1.9])],
            ))
            .unwrap();
        let types: Vec<&str> = filtered.markets.iter().map(|m| m.type_id.as_str()).collect();
        assert_eq!(types, vec!["OU25", "1X2"]);
    }

    #[test]
    fn test_odds_range_is_inclusive() {
        let filter = CompetitionFilter::new("1X2", 1.5, 3.0);
        assert!(filter
            .apply_to_match(snapshot("1", vec![market("m1", "1X2", &[1.5])]))
            .is_some());
        assert!(filter
            .apply_to_match(snapshot("2", vec![market("m2", "1X2", &[3.0])]))
            .is_some());
        assert!(filter
            .apply_to_match(snapshot("3", vec![market("m3", "1X2", &[1.2, 4.0])]))
            .is_none());
        assert!(filter.apply_to_match(snapshot("4", Vec::new())).is_none());
    }

    #[test]
    fn test_empty_competitions_dropped_outrights_kept() {
        let filter = CompetitionFilter::new("1X2", 1.5, 3.0);
        let filtered = filter.apply(vec![
            competition("t1", vec![snapshot("1", vec![market("m1", "1X2", &[9.0])])], 0),
            competition("t2", vec![snapshot("2", vec![market("m2", "1X2", &[2.0])])], 0),
            competition("t3", Vec::new(), 1),
        ]);
        let ids: Vec<&str> = filtered.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["t2", "t3"]);
    }
}
