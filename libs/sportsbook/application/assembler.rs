//! Snapshot assembly
//!
//! Walks the store's indices from a root entity and builds a denormalized,
//! sorted value. Assembly is a pure read: the same store state always yields
//! an equal result.

use crate::domain::{
    sort_markets, sort_outcomes, BettingOffer, Competition, EntityId, Market, Match, Outcome,
};
use crate::infrastructure::store::{ContentStore, RelationKind};

/// Read-only view that builds snapshots from one store state
pub struct SnapshotAssembler<'a> {
    store: &'a ContentStore,
    market_order: &'a [String],
}

impl<'a> SnapshotAssembler<'a> {
    /// `fallback_order` is used until the feed has supplied its own market order
    pub fn new(store: &'a ContentStore, fallback_order: &'a [String]) -> Self {
        let market_order = if store.market_order().is_empty() {
            fallback_order
        } else {
            store.market_order()
        };
        Self {
            store,
            market_order,
        }
    }

    pub fn market_order(&self) -> &[String] {
        self.market_order
    }

    /// Full match with markets in canonical order
    ///
    /// Returns `None` only when the match itself is unknown. Markets whose
    /// outcomes all lack an offer are kept with no outcomes.
    pub fn assemble_match(&self, match_id: &EntityId) -> Option<Match> {
        let record = self.store.match_record(match_id)?;

        let mut markets: Vec<Market> = self
            .store
            .children(match_id, RelationKind::MatchMarkets)
            .iter()
            .filter_map(|market_id| self.assemble_market(market_id))
            .collect();
        sort_markets(&mut markets, self.market_order);

        let venue = record
            .venue_id
            .as_ref()
            .and_then(|id| self.store.location(id))
            .map(|location| (*location).clone());

        Some(Match {
            id: record.id.clone(),
            competition_id: record.competition_id.clone(),
            competition_name: record.competition_name.clone(),
            home: record.home.clone(),
            away: record.away.clone(),
            home_score: record.home_score,
            away_score: record.away_score,
            match_time: record.match_time.clone(),
            start_date: record.start_date,
            status: record.status.clone(),
            sport_id: record.sport_id.clone(),
            sport_code: record.sport_code.clone(),
            venue,
            total_market_count: record.total_market_count,
            markets,
        })
    }

    /// One market with the outcomes that have a current offer
    pub fn assemble_market(&self, market_id: &EntityId) -> Option<Market> {
        let record = self.store.market(market_id)?;

        let mut outcomes: Vec<Outcome> = self
            .store
            .children(market_id, RelationKind::MarketOutcomes)
            .iter()
            .filter_map(|outcome_id| self.assemble_outcome(market_id, outcome_id))
            .collect();
        sort_outcomes(&mut outcomes);

        Some(Market {
            id: record.id.clone(),
            type_id: record.type_id.clone(),
            name: record.short_name.clone(),
            params: record.params.clone(),
            is_available: record.is_available,
            is_closed: record.is_closed,
            outcomes,
        })
    }

    fn assemble_outcome(&self, market_id: &EntityId, outcome_id: &EntityId) -> Option<Outcome> {
        let record = self.store.outcome(outcome_id)?;
        // No offer, no outcome: defaults are never synthesized
        let offer = self.store.offer_for_outcome(&record)?;

        Some(Outcome {
            id: record.id.clone(),
            market_id: market_id.clone(),
            code_name: record.code_name.clone(),
            display_name: record.display_name.clone(),
            params: record.params.clone(),
            betting_offer: BettingOffer {
                id: offer.id.clone(),
                odd: offer.odd,
                status_id: offer.status_id.clone(),
                is_live: offer.is_live,
                is_available: offer.is_available,
            },
        })
    }

    /// Competition with its matches and outright markets
    ///
    /// An outright-only competition reports at least one outright market.
    pub fn assemble_competition(&self, tournament_id: &EntityId) -> Option<Competition> {
        let record = self.store.tournament(tournament_id)?;

        let matches = self.assemble_matches(
            self.store
                .children(tournament_id, RelationKind::TournamentMatches),
        );

        let mut outright_markets: Vec<Market> = record
            .outright_market_ids
            .iter()
            .filter_map(|id| self.assemble_market(id))
            .collect();
        sort_markets(&mut outright_markets, self.market_order);

        let mut outright_market_count = record
            .outright_market_count
            .max(outright_markets.len() as u32);
        if matches.is_empty() && outright_market_count == 0 && !record.outright_market_ids.is_empty() {
            outright_market_count = 1;
        }

        let venue = record
            .venue_id
            .as_ref()
            .and_then(|id| self.store.location(id))
            .map(|location| (*location).clone())
            .or_else(|| matches.iter().find_map(|m| m.venue.clone()));

        Some(Competition {
            id: record.id.clone(),
            name: record.name.clone(),
            sport_id: record.sport_id.clone(),
            venue,
            matches,
            outright_market_count,
            outright_markets,
        })
    }

    /// Matches in the given order; unknown IDs are skipped
    pub fn assemble_matches(&self, ids: &[EntityId]) -> Vec<Match> {
        ids.iter().filter_map(|id| self.assemble_match(id)).collect()
    }

    /// Every known competition in arrival order
    pub fn assemble_competitions(&self) -> Vec<Competition> {
        self.store
            .tournament_ids()
            .iter()
            .filter_map(|id| self.assemble_competition(id))
            .collect()
    }
}
