//! Normalized entity cache
//!
//! Every entity is stored once by `(kind, id)` behind an `Arc`. Updates never
//! touch a stored value in place: a delta clones the current record, patches
//! the named fields and swaps the `Arc`, so anything handed out earlier keeps
//! its old value.
//!
//! Parent → children links live in [`ChildIndex`]es that are rebuilt from the
//! nesting a payload carries and extended by the foreign keys of child
//! payloads (`market.match_id`, `outcome.market_id`, relation records).

use super::index::{ChildIndex, RelationKind};
use super::metrics::StoreMetrics;
use crate::domain::{
    BettingOfferRecord, DeltaUpdate, EntityId, EntityKey, EntityKind, EntityPayload, Location,
    MarketRecord, MatchRecord, OutcomeRecord, Sport, TournamentRecord,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};

// =============================================================================
// Public shapes
// =============================================================================

/// Shared handle to one stored record
#[derive(Debug, Clone, PartialEq)]
pub enum StoredEntity {
    Sport(Arc<Sport>),
    Tournament(Arc<TournamentRecord>),
    Match(Arc<MatchRecord>),
    Market(Arc<MarketRecord>),
    Outcome(Arc<OutcomeRecord>),
    BettingOffer(Arc<BettingOfferRecord>),
    Location(Arc<Location>),
}

impl StoredEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            StoredEntity::Sport(_) => EntityKind::Sport,
            StoredEntity::Tournament(_) => EntityKind::Tournament,
            StoredEntity::Match(_) => EntityKind::Match,
            StoredEntity::Market(_) => EntityKind::Market,
            StoredEntity::Outcome(_) => EntityKind::Outcome,
            StoredEntity::BettingOffer(_) => EntityKind::BettingOffer,
            StoredEntity::Location(_) => EntityKind::Location,
        }
    }

    pub fn id(&self) -> &EntityId {
        match self {
            StoredEntity::Sport(e) => &e.id,
            StoredEntity::Tournament(e) => &e.id,
            StoredEntity::Match(e) => &e.id,
            StoredEntity::Market(e) => &e.id,
            StoredEntity::Outcome(e) => &e.id,
            StoredEntity::BettingOffer(e) => &e.id,
            StoredEntity::Location(e) => &e.id,
        }
    }
}

/// One entity whose value or children changed
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub key: EntityKey,
    /// Value after the change
    pub value: Option<StoredEntity>,
    /// Match the entity rolls up to, when there is one
    pub match_id: Option<EntityId>,
}

/// Result of applying one delta
#[derive(Debug, Clone, PartialEq)]
pub enum DeltaOutcome {
    Applied(StoreChange),
    /// Target exists but the patched value equals the stored one
    Unchanged,
    /// Target not loaded yet; nothing was created
    Orphan(EntityKey),
    /// Delta kind this store does not handle
    Unknown(String),
}

impl DeltaOutcome {
    pub fn change(&self) -> Option<&StoreChange> {
        match self {
            DeltaOutcome::Applied(change) => Some(change),
            _ => None,
        }
    }
}

enum LoadMode {
    /// Initial dump: upstream market order in the payload replaces ours
    Dump,
    /// Creations inside an update stream
    Upsert,
}

enum Patch {
    Changed(EntityKey),
    Same,
    Missing(EntityKey),
}

/// Keys touched during one write, in first-touch order
#[derive(Default)]
struct DirtySet {
    keys: Vec<EntityKey>,
    seen: HashSet<EntityKey>,
}

impl DirtySet {
    fn mark(&mut self, kind: EntityKind, id: &EntityId) {
        let key = EntityKey::new(kind, id.clone());
        if self.seen.insert(key.clone()) {
            self.keys.push(key);
        }
    }

    fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

// =============================================================================
// ContentStore
// =============================================================================

#[derive(Debug, Default)]
pub struct ContentStore {
    sports: HashMap<EntityId, Arc<Sport>>,
    tournaments: HashMap<EntityId, Arc<TournamentRecord>>,
    matches: HashMap<EntityId, Arc<MatchRecord>>,
    markets: HashMap<EntityId, Arc<MarketRecord>>,
    outcomes: HashMap<EntityId, Arc<OutcomeRecord>>,
    offers: HashMap<EntityId, Arc<BettingOfferRecord>>,
    locations: HashMap<EntityId, Arc<Location>>,

    match_markets: ChildIndex,
    market_outcomes: ChildIndex,
    tournament_matches: ChildIndex,
    /// outcome → latest offer naming it
    offer_by_outcome: HashMap<EntityId, EntityId>,
    /// offer → outcome, from either side of the link
    outcome_by_offer: HashMap<EntityId, EntityId>,

    tournament_order: Vec<EntityId>,
    market_order: Vec<String>,
    lists: HashMap<String, Vec<EntityId>>,

    revision: u64,
    metrics: Arc<StoreMetrics>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics(metrics: Arc<StoreMetrics>) -> Self {
        Self {
            metrics,
            ..Self::default()
        }
    }

    pub fn metrics(&self) -> &Arc<StoreMetrics> {
        &self.metrics
    }

    /// Incremented on every write that changed anything
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Bulk-load a dump, replacing same-ID entities wholesale
    ///
    /// A payload that carries its own child list (`market_ids`,
    /// `outcome_ids`, `match_ids`) replaces that parent's index entry; an
    /// empty list means the payload does not nest and leaves it untouched.
    pub fn apply_initial_dump(&mut self, entities: Vec<EntityPayload>) -> Vec<StoreChange> {
        let count = entities.len();
        let changes = self.load(entities, LoadMode::Dump);
        self.metrics.record_dump(count);
        debug!(
            "[Store] Initial dump applied: {} entities, {} changed",
            count,
            changes.len()
        );
        changes
    }

    /// Initial dump for a named match list; the list order is replaced
    pub fn apply_list_dump(
        &mut self,
        list: &str,
        entities: Vec<EntityPayload>,
    ) -> Vec<StoreChange> {
        let mut ids: Vec<EntityId> = Vec::new();
        for payload in &entities {
            if let EntityPayload::Match(record) = payload {
                if !ids.contains(&record.id) {
                    ids.push(record.id.clone());
                }
            }
        }

        if self.lists.get(list) != Some(&ids) {
            debug!("[Store] List '{}' now holds {} matches", list, ids.len());
            self.lists.insert(list.to_string(), ids);
            self.revision += 1;
        }

        self.apply_initial_dump(entities)
    }

    /// Entities created after the initial dump
    pub fn upsert(&mut self, entities: Vec<EntityPayload>) -> Vec<StoreChange> {
        let count = entities.len();
        self.metrics.record_entities(count);
        self.load(entities, LoadMode::Upsert)
    }

    /// Patch one entity with the fields a delta names
    ///
    /// Deltas for entities that are not loaded yet are dropped and counted.
    pub fn apply_delta(&mut self, delta: DeltaUpdate) -> DeltaOutcome {
        let patch = match delta {
            DeltaUpdate::BettingOffer(d) => {
                patch(&mut self.offers, EntityKind::BettingOffer, &d.id, |offer| {
                    if let Some(odd) = d.odd {
                        offer.odd = odd;
                    }
                    if let Some(status_id) = d.status_id {
                        offer.status_id = status_id;
                    }
                    if let Some(is_live) = d.is_live {
                        offer.is_live = is_live;
                    }
                    if let Some(is_available) = d.is_available {
                        offer.is_available = is_available;
                    }
                })
            }
            DeltaUpdate::Market(d) => patch(&mut self.markets, EntityKind::Market, &d.id, |market| {
                if let Some(is_available) = d.is_available {
                    market.is_available = is_available;
                }
                if let Some(is_closed) = d.is_closed {
                    market.is_closed = is_closed;
                }
            }),
            DeltaUpdate::MatchInfo(d) => patch(&mut self.matches, EntityKind::Match, &d.id, |m| {
                if let Some(score) = d.home_score {
                    m.home_score = Some(score);
                }
                if let Some(score) = d.away_score {
                    m.away_score = Some(score);
                }
                if let Some(match_time) = d.match_time {
                    m.match_time = Some(match_time);
                }
                if let Some(status) = d.status {
                    m.status = status;
                }
            }),
            DeltaUpdate::MatchMarketCount {
                id,
                total_market_count,
            } => patch(&mut self.matches, EntityKind::Match, &id, |m| {
                m.total_market_count = total_market_count;
            }),
            DeltaUpdate::FullMatchInfo(record) => {
                let id = record.id.clone();
                patch(&mut self.matches, EntityKind::Match, &id, |m| *m = record)
            }
            DeltaUpdate::SportCounters(d) => patch(&mut self.sports, EntityKind::Sport, &d.id, |s| {
                if let Some(count) = d.number_events {
                    s.number_events = count;
                }
                if let Some(count) = d.number_live_events {
                    s.number_live_events = count;
                }
            }),
            DeltaUpdate::Unknown { kind, id } => {
                self.metrics.increment_unknown();
                trace!("[Store] Ignoring unhandled delta kind '{}' ({:?})", kind, id);
                return DeltaOutcome::Unknown(kind);
            }
        };

        match patch {
            Patch::Changed(key) => {
                self.revision += 1;
                self.metrics.increment_applied();
                DeltaOutcome::Applied(self.change_for(key))
            }
            Patch::Same => {
                self.metrics.increment_unchanged();
                DeltaOutcome::Unchanged
            }
            Patch::Missing(key) => {
                self.metrics.increment_orphans();
                debug!("[Store] Orphan delta for {} dropped", key);
                DeltaOutcome::Orphan(key)
            }
        }
    }

    fn load(&mut self, entities: Vec<EntityPayload>, mode: LoadMode) -> Vec<StoreChange> {
        let mut dirty = DirtySet::default();
        let mut links: Vec<(RelationKind, EntityId, EntityId)> = Vec::new();
        let mut main_markets: Vec<String> = Vec::new();

        for payload in entities {
            match payload {
                EntityPayload::Sport(sport) => {
                    let id = sport.id.clone();
                    if put(&mut self.sports, &id, sport) {
                        dirty.mark(EntityKind::Sport, &id);
                    }
                }
                EntityPayload::Tournament(tournament) => {
                    let id = tournament.id.clone();
                    if !self.tournaments.contains_key(&id) {
                        self.tournament_order.push(id.clone());
                    }
                    let nested = !tournament.match_ids.is_empty()
                        && self.tournament_matches.replace(&id, &tournament.match_ids);
                    if put(&mut self.tournaments, &id, tournament) || nested {
                        dirty.mark(EntityKind::Tournament, &id);
                    }
                }
                EntityPayload::Match(record) => {
                    let id = record.id.clone();
                    if let Some(competition) = &record.competition_id {
                        links.push((RelationKind::TournamentMatches, competition.clone(), id.clone()));
                    }
                    let nested = !record.market_ids.is_empty()
                        && self.match_markets.replace(&id, &record.market_ids);
                    if put(&mut self.matches, &id, record) || nested {
                        dirty.mark(EntityKind::Match, &id);
                    }
                }
                EntityPayload::Market(market) => {
                    let id = market.id.clone();
                    if let Some(match_id) = &market.match_id {
                        links.push((RelationKind::MatchMarkets, match_id.clone(), id.clone()));
                    }
                    let nested = !market.outcome_ids.is_empty()
                        && self.market_outcomes.replace(&id, &market.outcome_ids);
                    if put(&mut self.markets, &id, market) || nested {
                        dirty.mark(EntityKind::Market, &id);
                    }
                }
                EntityPayload::Outcome(outcome) => {
                    let id = outcome.id.clone();
                    if let Some(market_id) = &outcome.market_id {
                        links.push((RelationKind::MarketOutcomes, market_id.clone(), id.clone()));
                    }
                    if let Some(offer_id) = &outcome.betting_offer_id {
                        self.outcome_by_offer.insert(offer_id.clone(), id.clone());
                    }
                    if put(&mut self.outcomes, &id, outcome) {
                        dirty.mark(EntityKind::Outcome, &id);
                    }
                }
                EntityPayload::BettingOffer(offer) => {
                    let id = offer.id.clone();
                    let mut relinked = false;
                    if let Some(outcome_id) = &offer.outcome_id {
                        relinked = self.offer_by_outcome.get(outcome_id) != Some(&id);
                        self.offer_by_outcome.insert(outcome_id.clone(), id.clone());
                        self.outcome_by_offer.insert(id.clone(), outcome_id.clone());
                        if relinked {
                            dirty.mark(EntityKind::Outcome, outcome_id);
                        }
                    }
                    if put(&mut self.offers, &id, offer) || relinked {
                        dirty.mark(EntityKind::BettingOffer, &id);
                    }
                }
                EntityPayload::Location(location) => {
                    if !self.locations.contains_key(&location.id) {
                        let id = location.id.clone();
                        self.locations.insert(id.clone(), Arc::new(location));
                        dirty.mark(EntityKind::Location, &id);
                    }
                }
                EntityPayload::MainMarket(entry) => main_markets.push(entry.type_id),
                EntityPayload::MarketOutcomeRelation(relation) => {
                    links.push((RelationKind::MarketOutcomes, relation.market_id, relation.outcome_id));
                }
            }
        }

        for (relation, parent, child) in links {
            let (index, kind) = match relation {
                RelationKind::MatchMarkets => (&mut self.match_markets, EntityKind::Match),
                RelationKind::MarketOutcomes => (&mut self.market_outcomes, EntityKind::Market),
                RelationKind::TournamentMatches => (&mut self.tournament_matches, EntityKind::Tournament),
            };
            if index.insert(&parent, &child) {
                dirty.mark(kind, &parent);
            }
        }

        let order_changed = self.merge_market_order(main_markets, mode);

        if !dirty.is_empty() || order_changed {
            self.revision += 1;
        }

        dirty
            .keys
            .into_iter()
            .map(|key| self.change_for(key))
            .collect()
    }

    fn merge_market_order(&mut self, entries: Vec<String>, mode: LoadMode) -> bool {
        if entries.is_empty() {
            return false;
        }
        let before = self.market_order.clone();
        if matches!(mode, LoadMode::Dump) {
            self.market_order.clear();
        }
        for type_id in entries {
            if !self.market_order.contains(&type_id) {
                self.market_order.push(type_id);
            }
        }
        before != self.market_order
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// O(1) lookup; `None` means "not loaded yet"
    pub fn get(&self, id: &EntityId, kind: EntityKind) -> Option<StoredEntity> {
        match kind {
            EntityKind::Sport => self.sports.get(id).cloned().map(StoredEntity::Sport),
            EntityKind::Tournament => self.tournaments.get(id).cloned().map(StoredEntity::Tournament),
            EntityKind::Match => self.matches.get(id).cloned().map(StoredEntity::Match),
            EntityKind::Market => self.markets.get(id).cloned().map(StoredEntity::Market),
            EntityKind::Outcome => self.outcomes.get(id).cloned().map(StoredEntity::Outcome),
            EntityKind::BettingOffer => self.offers.get(id).cloned().map(StoredEntity::BettingOffer),
            EntityKind::Location => self.locations.get(id).cloned().map(StoredEntity::Location),
        }
    }

    pub fn sport(&self, id: &EntityId) -> Option<Arc<Sport>> {
        self.sports.get(id).cloned()
    }

    pub fn tournament(&self, id: &EntityId) -> Option<Arc<TournamentRecord>> {
        self.tournaments.get(id).cloned()
    }

    pub fn match_record(&self, id: &EntityId) -> Option<Arc<MatchRecord>> {
        self.matches.get(id).cloned()
    }

    pub fn market(&self, id: &EntityId) -> Option<Arc<MarketRecord>> {
        self.markets.get(id).cloned()
    }

    pub fn outcome(&self, id: &EntityId) -> Option<Arc<OutcomeRecord>> {
        self.outcomes.get(id).cloned()
    }

    pub fn betting_offer(&self, id: &EntityId) -> Option<Arc<BettingOfferRecord>> {
        self.offers.get(id).cloned()
    }

    pub fn location(&self, id: &EntityId) -> Option<Arc<Location>> {
        self.locations.get(id).cloned()
    }

    /// Offer joined to an outcome: its explicit key first, then the offer
    /// that names the outcome
    pub fn offer_for_outcome(&self, outcome: &OutcomeRecord) -> Option<Arc<BettingOfferRecord>> {
        outcome
            .betting_offer_id
            .as_ref()
            .and_then(|id| self.offers.get(id))
            .or_else(|| {
                self.offer_by_outcome
                    .get(&outcome.id)
                    .and_then(|id| self.offers.get(id))
            })
            .cloned()
    }

    /// Ordered child IDs; empty when the parent is unknown
    pub fn child_ids(&self, parent: &EntityId, relation: RelationKind) -> Vec<EntityId> {
        self.index(relation).children(parent).to_vec()
    }

    pub fn children(&self, parent: &EntityId, relation: RelationKind) -> &[EntityId] {
        self.index(relation).children(parent)
    }

    /// Canonical market-type order supplied upstream
    pub fn market_order(&self) -> &[String] {
        &self.market_order
    }

    /// Match IDs of a named list, in dump order
    pub fn list(&self, name: &str) -> Vec<EntityId> {
        self.lists.get(name).cloned().unwrap_or_default()
    }

    /// Tournament IDs in first-seen order
    pub fn tournament_ids(&self) -> &[EntityId] {
        &self.tournament_order
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Sport => self.sports.len(),
            EntityKind::Tournament => self.tournaments.len(),
            EntityKind::Match => self.matches.len(),
            EntityKind::Market => self.markets.len(),
            EntityKind::Outcome => self.outcomes.len(),
            EntityKind::BettingOffer => self.offers.len(),
            EntityKind::Location => self.locations.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sports.is_empty()
            && self.tournaments.is_empty()
            && self.matches.is_empty()
            && self.markets.is_empty()
            && self.outcomes.is_empty()
            && self.offers.is_empty()
            && self.locations.is_empty()
    }

    /// Match an entity rolls up to, following the indices then foreign keys
    pub fn owner_match(&self, key: &EntityKey) -> Option<EntityId> {
        match key.kind {
            EntityKind::Match => Some(key.id.clone()),
            EntityKind::Market => self.market_match(&key.id),
            EntityKind::Outcome => self.outcome_match(&key.id),
            EntityKind::BettingOffer => self
                .offers
                .get(&key.id)
                .and_then(|offer| offer.outcome_id.clone())
                .or_else(|| self.outcome_by_offer.get(&key.id).cloned())
                .and_then(|outcome| self.outcome_match(&outcome)),
            EntityKind::Sport | EntityKind::Tournament | EntityKind::Location => None,
        }
    }

    fn market_match(&self, market_id: &EntityId) -> Option<EntityId> {
        self.match_markets.parent(market_id).cloned().or_else(|| {
            self.markets
                .get(market_id)
                .and_then(|market| market.match_id.clone())
        })
    }

    fn outcome_match(&self, outcome_id: &EntityId) -> Option<EntityId> {
        let outcome = self.outcomes.get(outcome_id);
        outcome
            .and_then(|o| o.match_id.clone())
            .or_else(|| {
                self.market_outcomes
                    .parent(outcome_id)
                    .and_then(|market| self.market_match(market))
            })
            .or_else(|| {
                outcome
                    .and_then(|o| o.market_id.as_ref())
                    .and_then(|market| self.market_match(market))
            })
    }

    fn index(&self, relation: RelationKind) -> &ChildIndex {
        match relation {
            RelationKind::MatchMarkets => &self.match_markets,
            RelationKind::MarketOutcomes => &self.market_outcomes,
            RelationKind::TournamentMatches => &self.tournament_matches,
        }
    }

    fn change_for(&self, key: EntityKey) -> StoreChange {
        StoreChange {
            value: self.get(&key.id, key.kind),
            match_id: self.owner_match(&key),
            key,
        }
    }
}

/// Store `value` unless an equal record is already there
fn put<T: PartialEq>(map: &mut HashMap<EntityId, Arc<T>>, id: &EntityId, value: T) -> bool {
    if let Some(existing) = map.get(id) {
        if **existing == value {
            return false;
        }
    }
    map.insert(id.clone(), Arc::new(value));
    true
}

/// Clone, patch and swap one record
fn patch<T: Clone + PartialEq>(
    map: &mut HashMap<EntityId, Arc<T>>,
    kind: EntityKind,
    id: &EntityId,
    apply: impl FnOnce(&mut T),
) -> Patch {
    let Some(current) = map.get(id) else {
        return Patch::Missing(EntityKey::new(kind, id.clone()));
    };
    let mut next = (**current).clone();
    apply(&mut next);
    if next == **current {
        return Patch::Same;
    }
    map.insert(id.clone(), Arc::new(next));
    Patch::Changed(EntityKey::new(kind, id.clone()))
}
