//! Request watcher
//!
//! Background task that polls the paid queue file and the now-playing file
//! and emits notifications when either changes. Notifications are advisory:
//! the scheduler re-reads the paid queue before every track regardless, so
//! a missed or coalesced change never delays a paid request.
//!
//! Changes are detected by comparing file contents between polls. Several
//! writes between two polls are reported as one change.

use crate::now_playing::NowPlaying;
use crate::queue_store::QueueStore;
use jukebox_common::{time, EventBus, JukeboxEvent};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Contents seen at the previous poll; `None` until first observed
#[derive(Debug, Clone, Default)]
pub struct WatchState {
    paid_queue: Option<Vec<i64>>,
    now_playing: Option<String>,
}

pub struct RequestWatcher {
    queue_store: QueueStore,
    now_playing: NowPlaying,
    events: EventBus,
    interval: Duration,
}

impl RequestWatcher {
    pub fn new(
        queue_store: QueueStore,
        now_playing: NowPlaying,
        events: EventBus,
        interval: Duration,
    ) -> Self {
        Self {
            queue_store,
            now_playing,
            events,
            interval,
        }
    }

    /// Compare both files with the previous poll and return the changes
    ///
    /// The first poll only records a baseline. Unreadable or corrupt files
    /// keep the previous state and are retried on the next poll.
    pub fn poll_once(&self, state: &mut WatchState) -> Vec<JukeboxEvent> {
        let mut events = Vec::new();

        match self.queue_store.try_read() {
            Ok(queue) => {
                if let Some(previous) = &state.paid_queue {
                    if *previous != queue {
                        let added = queue.len().saturating_sub(previous.len());
                        if added > 0 {
                            info!(added, queued = queue.len(), "New paid request detected");
                        } else {
                            debug!(queued = queue.len(), "Paid queue changed");
                        }
                        events.push(JukeboxEvent::PaidQueueChanged {
                            queued: queue.len(),
                            added,
                            timestamp: time::now(),
                        });
                    }
                }
                state.paid_queue = Some(queue);
            }
            Err(e) => debug!("Watcher skipped paid queue: {}", e),
        }

        match self.now_playing.read() {
            Ok(location) => {
                if let Some(previous) = &state.now_playing {
                    if *previous != location {
                        debug!(location = %location, "Now-playing changed");
                        events.push(JukeboxEvent::NowPlayingChanged {
                            location: location.clone(),
                            timestamp: time::now(),
                        });
                    }
                }
                state.now_playing = Some(location);
            }
            Err(e) => debug!("Watcher skipped now-playing file: {}", e),
        }

        events
    }

    /// Poll on a fixed interval until `cancel` fires
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        info!(
            "Starting request watcher (interval: {}ms)",
            self.interval.as_millis()
        );

        tokio::spawn(async move {
            let mut timer = interval(self.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut state = WatchState::default();

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = timer.tick() => {
                        for event in self.poll_once(&mut state) {
                            self.events.emit_lossy(event);
                        }
                    }
                }
            }

            debug!("Request watcher stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn watcher(dir: &TempDir) -> (RequestWatcher, QueueStore, NowPlaying) {
        let store = QueueStore::new(dir.path().join("PaidMusicPlayList.txt"));
        let now_playing = NowPlaying::new(dir.path().join("CurrentSongPlaying.txt"));
        store.write_paid_queue(&[]).unwrap();
        now_playing.write("").unwrap();
        let watcher = RequestWatcher::new(
            store.clone(),
            now_playing.clone(),
            EventBus::default(),
            Duration::from_millis(20),
        );
        (watcher, store, now_playing)
    }

    #[test]
    fn test_first_poll_is_baseline() {
        let dir = TempDir::new().unwrap();
        let (watcher, store, _) = watcher(&dir);
        store.write_paid_queue(&[1, 2]).unwrap();

        let mut state = WatchState::default();
        assert!(watcher.poll_once(&mut state).is_empty());
        assert!(watcher.poll_once(&mut state).is_empty());
    }

    #[test]
    fn test_append_reports_added_count() {
        let dir = TempDir::new().unwrap();
        let (watcher, store, _) = watcher(&dir);
        let mut state = WatchState::default();
        watcher.poll_once(&mut state);

        store.append(4).unwrap();
        store.append(9).unwrap();

        let events = watcher.poll_once(&mut state);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            JukeboxEvent::PaidQueueChanged { queued: 2, added: 2, .. }
        ));
    }

    #[test]
    fn test_removal_reports_zero_added() {
        let dir = TempDir::new().unwrap();
        let (watcher, store, _) = watcher(&dir);
        store.write_paid_queue(&[4, 9]).unwrap();
        let mut state = WatchState::default();
        watcher.poll_once(&mut state);

        store.remove_played(4).unwrap();

        let events = watcher.poll_once(&mut state);
        assert!(matches!(
            events[0],
            JukeboxEvent::PaidQueueChanged { queued: 1, added: 0, .. }
        ));
    }

    #[test]
    fn test_corrupt_queue_keeps_previous_state() {
        let dir = TempDir::new().unwrap();
        let (watcher, store, _) = watcher(&dir);
        let mut state = WatchState::default();
        watcher.poll_once(&mut state);

        fs::write(store.path(), "[1,").unwrap();
        assert!(watcher.poll_once(&mut state).is_empty());

        store.write_paid_queue(&[1]).unwrap();
        let events = watcher.poll_once(&mut state);
        assert!(matches!(
            events[0],
            JukeboxEvent::PaidQueueChanged { queued: 1, added: 1, .. }
        ));
    }

    #[test]
    fn test_now_playing_change() {
        let dir = TempDir::new().unwrap();
        let (watcher, _, now_playing) = watcher(&dir);
        let mut state = WatchState::default();
        watcher.poll_once(&mut state);

        now_playing.write("/music/a.mp3").unwrap();
        let events = watcher.poll_once(&mut state);
        assert_eq!(events.len(), 1);
        match &events[0] {
            JukeboxEvent::NowPlayingChanged { location, .. } => {
                assert_eq!(location, "/music/a.mp3")
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_spawned_watcher_emits_and_stops() {
        let dir = TempDir::new().unwrap();
        let (watcher, store, _) = watcher(&dir);
        let mut rx = watcher.events.subscribe();
        let cancel = CancellationToken::new();
        let handle = watcher.spawn(cancel.clone());

        // Let the baseline poll happen
        tokio::time::sleep(Duration::from_millis(100)).await;
        store.append(3).unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no event before timeout")
            .unwrap();
        assert!(matches!(event, JukeboxEvent::PaidQueueChanged { added: 1, .. }));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("watcher did not stop")
            .unwrap();
    }
}
