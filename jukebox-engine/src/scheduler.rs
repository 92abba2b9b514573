//! Playback scheduler
//!
//! A three-state loop that decides what plays next:
//!
//! - `DrainPaid`: re-read the paid queue file. If it has entries, play the
//!   head, then remove it and stay in `DrainPaid`. If it is empty, move to
//!   `PlayOneRandom`.
//! - `PlayOneRandom`: play the front of the random ring, rotate it to the
//!   back and return to `DrainPaid`. If the ring is empty, move to
//!   `Exhausted`.
//! - `Exhausted`: terminal.
//!
//! A paid entry is removed only after its track finishes, so a crash while
//! it plays replays it on restart (at-least-once). Every failure inside a
//! step is logged and absorbed; the loop only ends when exhausted or
//! cancelled.

use crate::catalog::{Catalog, Track};
use crate::now_playing::NowPlaying;
use crate::play_log::PlayLog;
use crate::playback::{PlaybackError, Player};
use crate::queue_store::{QueueStore, Removal};
use crate::random_queue::RandomQueue;
use crate::statistics::{SongStatistics, StatisticsStore};
use crate::Error;
use jukebox_common::{time, DataPaths, EventBus, JukeboxEvent, PlaySource};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default pause after a failed paid-queue update
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    DrainPaid,
    PlayOneRandom,
    Exhausted,
}

/// Why [`Scheduler::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Nothing left to play
    Exhausted,
    /// Shutdown requested
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayOutcome {
    Completed,
    Failed,
    Interrupted,
}

pub struct Scheduler {
    catalog: Arc<Catalog>,
    random_queue: RandomQueue,
    queue_store: QueueStore,
    now_playing: NowPlaying,
    play_log: PlayLog,
    statistics: StatisticsStore,
    player: Box<dyn Player>,
    events: EventBus,
    cancel: CancellationToken,
    retry_delay: Duration,
    state: SchedulerState,
}

impl Scheduler {
    pub fn new(
        catalog: Arc<Catalog>,
        random_queue: RandomQueue,
        paths: &DataPaths,
        queue_store: QueueStore,
        player: Box<dyn Player>,
        events: EventBus,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            catalog,
            random_queue,
            queue_store,
            now_playing: NowPlaying::new(&paths.now_playing),
            play_log: PlayLog::new(&paths.play_log),
            statistics: StatisticsStore::load(&paths.statistics),
            player,
            events,
            cancel,
            retry_delay: DEFAULT_RETRY_DELAY,
            state: SchedulerState::DrainPaid,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn random_queue(&self) -> &RandomQueue {
        &self.random_queue
    }

    pub fn statistics(&self) -> &SongStatistics {
        self.statistics.stats()
    }

    /// Run until exhausted or cancelled
    ///
    /// Cancellation is checked before every step; a track playing when the
    /// token fires is stopped by the player.
    pub fn run(&mut self) -> StopReason {
        info!(
            catalog = self.catalog.len(),
            random = self.random_queue.len(),
            "Scheduler started"
        );

        loop {
            if self.cancel.is_cancelled() {
                info!("Scheduler stopping: shutdown requested");
                return StopReason::Cancelled;
            }
            if self.step() == SchedulerState::Exhausted {
                return StopReason::Exhausted;
            }
        }
    }

    /// Perform one transition and return the new state
    pub fn step(&mut self) -> SchedulerState {
        let next = match self.state {
            SchedulerState::DrainPaid => self.drain_paid(),
            SchedulerState::PlayOneRandom => self.play_one_random(),
            SchedulerState::Exhausted => SchedulerState::Exhausted,
        };
        if next != self.state {
            debug!(from = ?self.state, to = ?next, "Scheduler transition");
        }
        self.state = next;
        next
    }

    fn drain_paid(&mut self) -> SchedulerState {
        let queue = self.queue_store.read_paid_queue();
        let Some(&head) = queue.first() else {
            return SchedulerState::PlayOneRandom;
        };

        let Some(track) = self.catalog.lookup(head).cloned() else {
            let err = Error::InvalidQueueIndex {
                index: head,
                catalog_len: self.catalog.len(),
            };
            error!("{}; dropping entry", err);
            self.events.emit_lossy(JukeboxEvent::InvalidQueueEntry {
                index: head,
                catalog_size: self.catalog.len(),
                timestamp: time::now(),
            });
            self.remove_entry(head);
            return SchedulerState::DrainPaid;
        };

        if self.play(&track, PlaySource::Paid) != PlayOutcome::Interrupted {
            self.remove_entry(head);
        }
        SchedulerState::DrainPaid
    }

    fn play_one_random(&mut self) -> SchedulerState {
        let Some(index) = self.random_queue.front() else {
            info!("Random queue empty and no paid requests; nothing left to play");
            self.events.emit_lossy(JukeboxEvent::Exhausted {
                timestamp: time::now(),
            });
            return SchedulerState::Exhausted;
        };

        match self.catalog.get(index).cloned() {
            Some(track) => {
                if self.play(&track, PlaySource::Random) != PlayOutcome::Interrupted {
                    self.random_queue.rotate();
                }
            }
            None => {
                // Ring is built from this catalog
                warn!(index, "Random queue entry outside catalog, skipping");
                self.random_queue.rotate();
            }
        }
        SchedulerState::DrainPaid
    }

    fn play(&mut self, track: &Track, source: PlaySource) -> PlayOutcome {
        if let Err(e) = self.now_playing.write(&track.location) {
            warn!("Failed to update now-playing file: {}", e);
        }
        if let Err(e) = self.play_log.record_play(&track.artist, &track.title, source) {
            warn!("Failed to append play log: {}", e);
        }
        if let Err(e) = self.statistics.record_play(track, source) {
            warn!("Failed to save statistics: {}", e);
        }

        info!(
            index = track.index,
            source = %source,
            "Now playing: {} - {}",
            track.artist,
            track.title
        );
        self.events.emit_lossy(JukeboxEvent::TrackStarted {
            index: track.index,
            artist: track.artist.clone(),
            title: track.title.clone(),
            source,
            timestamp: time::now(),
        });

        let outcome = match self.player.play(Path::new(&track.location), &self.cancel) {
            Ok(()) => PlayOutcome::Completed,
            Err(PlaybackError::Interrupted) => {
                info!(index = track.index, "Playback interrupted by shutdown");
                PlayOutcome::Interrupted
            }
            Err(e) => {
                error!(index = track.index, "{}", Error::from(e));
                PlayOutcome::Failed
            }
        };

        self.events.emit_lossy(JukeboxEvent::TrackFinished {
            index: track.index,
            source,
            completed: outcome == PlayOutcome::Completed,
            timestamp: time::now(),
        });

        outcome
    }

    fn remove_entry(&mut self, index: i64) {
        match self.queue_store.remove_played(index) {
            Ok(Removal::Removed) => {}
            Ok(Removal::NotPresent) => {
                warn!(index, "Entry already gone from paid queue");
            }
            Err(e) => {
                error!("Failed to update paid queue: {}", e);
                self.pause(self.retry_delay);
            }
        }
    }

    /// Sleep up to `duration`, returning early on cancellation
    fn pause(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while !self.cancel.is_cancelled() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep((deadline - now).min(Duration::from_millis(50)));
        }
    }
}
