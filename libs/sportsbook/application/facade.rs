//! Query and subscription surface
//!
//! Owns the store, its writer task, the change notifier and the feed
//! services. Everything is constructed from explicit dependencies: callers
//! pass in the channels, nothing is reached through globals.

use super::assembler::SnapshotAssembler;
use super::competitions::{CompetitionFilter, CompetitionsAggregator};
use super::feed::{FeedService, FeedStatus};
use super::sports_merger::{FeedHealth, SportsMerger, Subscribable};
use crate::domain::{Competition, EntityId, EntityKey, Market, Match, Sport};
use crate::error::Result;
use crate::infrastructure::client::{
    EveryMatrixDecoder, EveryMatrixRoutes, SportRadarDecoder, SportRadarRoutes,
};
use crate::infrastructure::config::SportsbookConfig;
use crate::infrastructure::notifier::ChangeNotifier;
use crate::infrastructure::store::{
    shared_store, StoreReader, StoreStats, StoreWriter, StoredEntity, WriterHandle,
};
use feedsockets::{FeedChannel, Metrics, Route, SubscriptionHandle};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Combined diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct FacadeStats {
    pub store: StoreStats,
    pub channel: Metrics,
    pub notifier_streams: usize,
}

pub struct SportsbookFacade {
    reader: StoreReader,
    notifier: Arc<ChangeNotifier>,
    writer: WriterHandle,
    writer_task: JoinHandle<()>,
    routes: EveryMatrixRoutes,
    market_order: Arc<Vec<String>>,
    feeds: FeedService<EveryMatrixDecoder>,
    competitions: CompetitionsAggregator,
    sports: Option<SportsMerger>,
}

impl SportsbookFacade {
    /// Build the store and its writer around an EveryMatrix channel
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(
        config: &SportsbookConfig,
        channel: Arc<FeedChannel<EveryMatrixDecoder>>,
        filter: Option<CompetitionFilter>,
    ) -> Self {
        let (store, reader) = shared_store();
        let notifier = Arc::new(ChangeNotifier::new());
        let (writer, writer_task) = StoreWriter::spawn(store, Arc::clone(&notifier));
        let market_order = Arc::new(config.main_markets_order.clone());

        let competitions = CompetitionsAggregator::start(
            reader.clone(),
            notifier.watch_store(),
            Arc::clone(&market_order),
            filter,
        );

        info!(
            "[Facade] Ready for operator {} ({})",
            config.operator_id, config.language
        );

        Self {
            reader,
            notifier,
            feeds: FeedService::new(channel, writer.clone()),
            writer,
            writer_task,
            routes: EveryMatrixRoutes::from_config(config),
            market_order,
            competitions,
            sports: None,
        }
    }

    /// Start merging the SportRadar sports feeds
    pub async fn start_sports(
        &mut self,
        channel: Arc<FeedChannel<SportRadarDecoder>>,
        routes: SportRadarRoutes,
    ) {
        if let Some(previous) = self.sports.take() {
            previous.stop().await;
        }
        self.sports = Some(SportsMerger::start(channel, routes).await);
    }

    pub fn routes(&self) -> &EveryMatrixRoutes {
        &self.routes
    }

    pub fn reader(&self) -> &StoreReader {
        &self.reader
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn assemble_match(&self, match_id: &EntityId) -> Option<Match> {
        self.reader.read(|store| {
            SnapshotAssembler::new(store, &self.market_order).assemble_match(match_id)
        })
    }

    pub fn assemble_market(&self, market_id: &EntityId) -> Option<Market> {
        self.reader.read(|store| {
            SnapshotAssembler::new(store, &self.market_order).assemble_market(market_id)
        })
    }

    pub fn assemble_competition(&self, tournament_id: &EntityId) -> Option<Competition> {
        self.reader.read(|store| {
            SnapshotAssembler::new(store, &self.market_order).assemble_competition(tournament_id)
        })
    }

    /// Matches of a named list in feed order
    pub fn matches_for_list(&self, list: &str) -> Vec<Match> {
        self.reader.read(|store| {
            SnapshotAssembler::new(store, &self.market_order).assemble_matches(&store.list(list))
        })
    }

    /// Merged sports list; `None` until `start_sports` ran
    pub fn sports_publisher(&self) -> Option<watch::Receiver<Subscribable<Vec<Sport>>>> {
        self.sports.as_ref().map(SportsMerger::sports_publisher)
    }

    pub fn sports_health(&self) -> Option<watch::Receiver<FeedHealth>> {
        self.sports.as_ref().map(SportsMerger::health)
    }

    pub fn sports_merger(&self) -> Option<&SportsMerger> {
        self.sports.as_ref()
    }

    pub fn competitions_publisher(&self) -> watch::Receiver<Vec<Competition>> {
        self.competitions.competitions_publisher()
    }

    // =========================================================================
    // Change streams
    // =========================================================================

    /// Stream of one stored entity, seeded with its current value
    pub fn watch_entity(&self, key: EntityKey) -> watch::Receiver<Option<StoredEntity>> {
        // Registered under the read lock so no write slips in between
        self.reader.read(|store| {
            let current = store.get(&key.id, key.kind);
            self.notifier.watch_entity(key, current)
        })
    }

    pub fn watch_match(&self, match_id: &EntityId) -> watch::Receiver<u64> {
        self.notifier.watch_match(match_id)
    }

    pub fn watch_store(&self) -> watch::Receiver<u64> {
        self.notifier.watch_store()
    }

    // =========================================================================
    // Feed lifecycle
    // =========================================================================

    pub async fn start_feed(
        &self,
        route: Route,
        initial: Option<Route>,
        list: Option<String>,
    ) -> Result<SubscriptionHandle> {
        self.feeds.start(route, initial, list).await
    }

    /// Subscribe the full market tree of one match
    pub async fn start_match(&self, match_id: &str) -> Result<SubscriptionHandle> {
        let route = self.routes.match_details(match_id);
        let initial = EveryMatrixRoutes::initial_dump(&route);
        self.feeds.start(route, Some(initial), None).await
    }

    /// Subscribe a topic whose dump fills the named match list
    pub async fn start_list(&self, route: Route, list: &str) -> Result<SubscriptionHandle> {
        let initial = EveryMatrixRoutes::initial_dump(&route);
        self.feeds
            .start(route, Some(initial), Some(list.to_string()))
            .await
    }

    /// Lifecycle of a started feed; `Failed` when its initial dump failed
    pub fn feed_status(&self, handle: &SubscriptionHandle) -> Option<watch::Receiver<FeedStatus>> {
        self.feeds.status(handle)
    }

    pub async fn stop_feed(&self, handle: &SubscriptionHandle) -> Result<()> {
        self.feeds.stop(handle).await
    }

    /// Wait until everything received so far is in the store
    pub async fn flush(&self) -> Result<()> {
        self.writer.flush().await
    }

    pub fn stats(&self) -> FacadeStats {
        FacadeStats {
            store: self.reader.stats(),
            channel: self.feeds.channel().metrics(),
            notifier_streams: self.notifier.stream_count(),
        }
    }

    /// Drop change streams nobody listens to
    pub fn prune_streams(&self) -> usize {
        self.notifier.prune()
    }

    pub async fn shutdown(&self) {
        info!("[Facade] Shutting down feeds");
        self.feeds.stop_all().await;
        if let Some(sports) = &self.sports {
            sports.stop().await;
        }
    }
}

impl Drop for SportsbookFacade {
    fn drop(&mut self) {
        self.writer_task.abort();
    }
}
