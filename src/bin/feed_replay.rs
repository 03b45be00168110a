//! Feed replay
//!
//! Replays a JSON-lines recording through the in-process transport, then
//! logs the assembled snapshots and store counters.
//!
//! Usage: feed_replay [config.yaml]

use anyhow::{Context, Result};
use feedsockets::{ChannelConfig, Connector, FeedChannel, ReplayTransport, Route};
use sportsbook::infrastructure::init_tracing;
use sportsbook::{
    EntityId, EveryMatrixDecoder, ShutdownManager, SportRadarDecoder, SportRadarRoutes,
    SportsbookConfig, SportsbookFacade, Subscribable,
};
use sportsbook_feeds::bin_common::{
    load_config_from_env, parse_args, BinaryRunner, ConfigType, RunConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

struct ReplayApp {
    run_config: RunConfig,
    config: SportsbookConfig,
    facade: SportsbookFacade,
    shutdown: ShutdownManager,
}

impl ReplayApp {
    async fn new(config: SportsbookConfig) -> Result<Self> {
        let path = config
            .replay
            .path
            .clone()
            .context("replay.path is not set")?;
        let recording = std::fs::read_to_string(&path)
            .with_context(|| format!("reading recording {}", path))?;
        let transport = Arc::new(
            ReplayTransport::from_json_lines(&recording)
                .with_context(|| format!("parsing recording {}", path))?,
        );
        info!("Loaded recording {}", path);

        let channel = Arc::new(FeedChannel::new(
            Connector::wamp(transport.clone()),
            EveryMatrixDecoder::new(),
            ChannelConfig::new("EveryMatrix")
                .with_initial_dump_timeout(config.channel.initial_dump_timeout()),
        ));
        let mut facade = SportsbookFacade::new(&config, channel, None);

        match config.session_token() {
            Ok(token) => {
                let sports_channel = Arc::new(FeedChannel::new(
                    Connector::socket_rest(transport, token),
                    SportRadarDecoder::new(),
                    ChannelConfig::new("SportRadar"),
                ));
                facade
                    .start_sports(sports_channel, SportRadarRoutes::from_config(&config))
                    .await;
            }
            Err(_) => info!("No SportRadar session token; sports list not replayed"),
        }

        let mut run_config = RunConfig::new("Feed Replay");
        if config.replay.linger_secs > 0 {
            run_config = run_config.with_run_for(config.replay.linger_secs);
        }

        Ok(Self {
            run_config,
            config,
            facade,
            shutdown: ShutdownManager::new(),
        })
    }

    async fn subscribe(&self) -> Result<()> {
        if let Some(match_id) = &self.config.replay.match_id {
            let handle = self.facade.start_match(match_id).await?;
            info!("Subscribed match {} ({})", match_id, handle);
        }
        if let (Some(list), Some(route)) = (&self.config.replay.list, &self.config.replay.list_route) {
            let handle = self.facade.start_list(Route::new(route.as_str()), list).await?;
            info!("Subscribed list '{}' ({})", list, handle);
        }
        Ok(())
    }

    fn log_snapshots(&self) {
        if let Some(match_id) = &self.config.replay.match_id {
            match self.facade.assemble_match(&EntityId::new(match_id.as_str())) {
                Some(snapshot) => match serde_json::to_string_pretty(&snapshot) {
                    Ok(json) => info!("Match {}:\n{}", match_id, json),
                    Err(e) => warn!("Cannot render match {}: {}", match_id, e),
                },
                None => warn!("Match {} not in store", match_id),
            }
        }

        if let Some(list) = &self.config.replay.list {
            let matches = self.facade.matches_for_list(list);
            info!("List '{}': {} matches", list, matches.len());
            for snapshot in matches {
                info!(
                    "  {} {} vs {} ({} markets)",
                    snapshot.id,
                    snapshot.home.name,
                    snapshot.away.name,
                    snapshot.markets.len()
                );
            }
        }

        if let Some(publisher) = self.facade.sports_publisher() {
            match &*publisher.borrow() {
                Subscribable::Content(sports) => {
                    for sport in sports {
                        info!(
                            "  {} [{}] events={} live={}",
                            sport.name,
                            sport.merge_key(),
                            sport.number_events,
                            sport.number_live_events
                        );
                    }
                }
                Subscribable::Failed(e) => warn!("Sports list failed: {}", e),
                other => info!("Sports list: {:?}", other),
            }
        }

        let competitions = self.facade.competitions_publisher().borrow().len();
        info!("Competitions: {}", competitions);
    }

    fn log_stats(&self) {
        let stats = self.facade.stats();
        info!(
            "Store: dumps={} entities={} deltas={} unchanged={} orphans={} unknown={} stale={}",
            stats.store.dumps_applied,
            stats.store.entities_loaded,
            stats.store.deltas_applied,
            stats.store.deltas_unchanged,
            stats.store.orphan_deltas,
            stats.store.unknown_deltas,
            stats.store.stale_discarded
        );
        info!(
            "Channel: received={} decode_errors={} initial_dumps={}",
            stats.channel.messages_received,
            stats.channel.decode_errors,
            stats.channel.initial_dumps
        );
    }
}

impl BinaryRunner for ReplayApp {
    async fn run(&mut self) -> Result<()> {
        self.shutdown.spawn_signal_handler();
        self.subscribe().await?;

        // Let the pumps drain the recording before reading the store
        tokio::time::sleep(Duration::from_millis(200)).await;
        self.facade.flush().await?;
        self.log_snapshots();
        self.log_stats();

        let stats_every = Duration::from_secs(self.run_config.stats_interval_secs);
        let deadline = self
            .run_config
            .run_for_secs
            .map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs));

        while self.shutdown.is_running() {
            tokio::select! {
                _ = self.shutdown.wait() => break,
                _ = tokio::time::sleep(stats_every) => self.log_stats(),
            }
            if deadline.is_some_and(|deadline| tokio::time::Instant::now() >= deadline) {
                break;
            }
        }

        self.facade.shutdown().await;
        Ok(())
    }

    fn config(&self) -> &RunConfig {
        &self.run_config
    }

    fn summary(&self) -> Option<String> {
        let stats = self.facade.stats();
        Some(format!(
            "Applied {} dumps and {} deltas",
            stats.store.dumps_applied, stats.store.deltas_applied
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load config first (before logging is initialized)
    let config_path = match parse_args().into_iter().next() {
        Some(path) => load_config_from_env(ConfigType::Custom(path)),
        None => load_config_from_env(ConfigType::Replay),
    };
    let config = SportsbookConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    init_tracing(&config.log_level);
    config.log();

    let mut app = ReplayApp::new(config).await?;
    app.execute().await
}
