//! Engine wiring
//!
//! Startup order:
//! 1. Make sure the base directory and every shared file exist
//! 2. Append the startup banner to the play log
//! 3. Load the persisted catalog, or rebuild it when the source changed
//! 4. Load the genre filter and shuffle the random queue
//! 5. Start the request watcher and the scheduler
//!
//! The scheduler runs on a blocking thread because playback blocks for the
//! length of each track. Shutdown cancels a shared token; the player stops
//! the current track and both the scheduler and the watcher are joined
//! with a bounded wait.

use crate::catalog::{Catalog, CatalogStore};
use crate::genre::GenreFilter;
use crate::now_playing::NowPlaying;
use crate::play_log::PlayLog;
use crate::playback::Player;
use crate::queue_store::QueueStore;
use crate::random_queue::RandomQueue;
use crate::scheduler::{Scheduler, StopReason};
use crate::statistics::{SongStatistics, StatisticsStore};
use crate::watcher::RequestWatcher;
use crate::{Error, Result};
use jukebox_common::config::TomlConfig;
use jukebox_common::{time, DataPaths, EventBus, JukeboxEvent};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Everything the scheduler needs, loaded from disk
#[derive(Debug)]
pub struct Prepared {
    pub catalog: Arc<Catalog>,
    pub genre_filter: GenreFilter,
    pub random_queue: RandomQueue,
}

/// How a run ended
#[derive(Debug)]
pub struct RunSummary {
    pub stop_reason: StopReason,
    /// `None` when the scheduler did not stop within the shutdown timeout
    pub statistics: Option<SongStatistics>,
}

pub struct Engine {
    config: TomlConfig,
    paths: DataPaths,
    music_dir: PathBuf,
    events: EventBus,
}

impl Engine {
    pub fn new(base_dir: &Path, config: TomlConfig) -> Self {
        let paths = DataPaths::new(base_dir, &config.files);
        let music_dir = config.music_dir(base_dir);
        Self {
            config,
            paths,
            music_dir,
            events: EventBus::default(),
        }
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    pub fn config(&self) -> &TomlConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn catalog_store(&self) -> CatalogStore {
        CatalogStore::new(
            &self.music_dir,
            self.config.normalized_extensions(),
            &self.paths.catalog,
            &self.paths.catalog_checksum,
        )
    }

    /// Create missing shared files; failure here stops the engine
    pub fn ensure_files(&self) -> Result<bool> {
        let first_run = self
            .paths
            .ensure_defaults()
            .map_err(|e| Error::Init(e.to_string()))?;
        Ok(first_run.play_log_created)
    }

    /// Load or rebuild the catalog, the genre filter and the random queue
    pub fn prepare(&self) -> Result<Prepared> {
        let new_log = self.ensure_files()?;

        if let Err(e) = PlayLog::new(&self.paths.play_log).record_startup(new_log) {
            warn!("Failed to write startup banner: {}", e);
        }

        let catalog = Arc::new(self.catalog_store().load_or_build()?);

        let genres = catalog.distinct_genres();
        info!("Catalog genres ({}): {}", genres.len(), genres.join(", "));

        let genre_filter = GenreFilter::load(&self.paths.genre_filter);
        let random_queue =
            RandomQueue::build(&catalog, &genre_filter, &mut rand::thread_rng());

        info!(
            "Random queue: {} of {} tracks eligible",
            random_queue.len(),
            catalog.len()
        );
        if random_queue.is_empty() {
            warn!("No track is eligible for random play; engine will stop once the paid queue is empty");
        }

        Ok(Prepared {
            catalog,
            genre_filter,
            random_queue,
        })
    }

    /// Rebuild the catalog from the music directory unconditionally
    pub fn rebuild_catalog(&self) -> Result<Catalog> {
        self.ensure_files()?;
        self.catalog_store().build()
    }

    /// Distinct genre tokens of the current catalog
    pub fn genres(&self) -> Result<Vec<String>> {
        self.ensure_files()?;
        Ok(self.catalog_store().load_or_build()?.distinct_genres())
    }

    /// Persisted play statistics
    pub fn statistics(&self) -> SongStatistics {
        StatisticsStore::load(&self.paths.statistics).stats().clone()
    }

    /// Run until the scheduler is exhausted or `shutdown` resolves
    pub async fn run<F>(&self, player: Box<dyn Player>, shutdown: F) -> Result<RunSummary>
    where
        F: Future<Output = ()>,
    {
        let prepared = self.prepare()?;
        self.run_prepared(prepared, player, shutdown).await
    }

    pub async fn run_prepared<F>(
        &self,
        prepared: Prepared,
        player: Box<dyn Player>,
        shutdown: F,
    ) -> Result<RunSummary>
    where
        F: Future<Output = ()>,
    {
        let cancel = CancellationToken::new();
        let shutdown_timeout = Duration::from_millis(self.config.watcher.shutdown_timeout_ms);
        let queue_store = QueueStore::new(&self.paths.paid_queue);

        let watcher = RequestWatcher::new(
            queue_store.clone(),
            NowPlaying::new(&self.paths.now_playing),
            self.events.clone(),
            Duration::from_millis(self.config.watcher.interval_ms.max(1)),
        );
        let watcher_task = watcher.spawn(cancel.clone());

        self.events.emit_lossy(JukeboxEvent::EngineStarted {
            catalog_size: prepared.catalog.len(),
            random_queue_size: prepared.random_queue.len(),
            timestamp: time::now(),
        });

        let mut scheduler = Scheduler::new(
            prepared.catalog,
            prepared.random_queue,
            &self.paths,
            queue_store,
            player,
            self.events.clone(),
            cancel.clone(),
        );
        let mut scheduler_task = tokio::task::spawn_blocking(move || {
            let reason = scheduler.run();
            (reason, scheduler)
        });

        tokio::pin!(shutdown);

        let finished = tokio::select! {
            joined = &mut scheduler_task => Some(joined),
            _ = &mut shutdown => {
                info!("Shutdown requested, stopping playback");
                cancel.cancel();
                None
            }
        };

        let joined = match finished {
            Some(joined) => Some(joined),
            None => match tokio::time::timeout(shutdown_timeout, scheduler_task).await {
                Ok(joined) => Some(joined),
                Err(_) => {
                    warn!(
                        "Scheduler did not stop within {}ms",
                        shutdown_timeout.as_millis()
                    );
                    None
                }
            },
        };

        cancel.cancel();
        match tokio::time::timeout(shutdown_timeout, watcher_task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Request watcher task failed: {}", e),
            Err(_) => warn!(
                "Request watcher did not stop within {}ms",
                shutdown_timeout.as_millis()
            ),
        }

        let summary = match joined {
            Some(Ok((stop_reason, scheduler))) => RunSummary {
                stop_reason,
                statistics: Some(scheduler.statistics().clone()),
            },
            Some(Err(e)) => {
                error!("Scheduler task failed: {}", e);
                return Err(Error::Task(e.to_string()));
            }
            None => RunSummary {
                stop_reason: StopReason::Cancelled,
                statistics: None,
            },
        };

        if let Some(stats) = &summary.statistics {
            info!(
                "Engine stopped ({:?}): {} songs played {} times in total",
                summary.stop_reason,
                stats.len(),
                stats.total_plays()
            );
        }

        Ok(summary)
    }
}
