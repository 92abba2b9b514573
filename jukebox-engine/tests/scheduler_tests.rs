//! Scheduler integration tests
//!
//! Drive the scheduler against real shared files in a temp directory with a
//! scripted player standing in for the media player.

mod helpers;

use helpers::scripted_player::{locations, Script};
use helpers::ScriptedPlayer;
use jukebox_common::{DataPaths, EventBus, JukeboxEvent};
use jukebox_engine::catalog::{Catalog, Track};
use jukebox_engine::queue_store::QueueStore;
use jukebox_engine::random_queue::RandomQueue;
use jukebox_engine::scheduler::{Scheduler, StopReason};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

struct Fixture {
    _dir: TempDir,
    paths: DataPaths,
    store: QueueStore,
    events: EventBus,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::with_defaults(dir.path());
        paths.ensure_defaults().unwrap();
        let store = QueueStore::new(&paths.paid_queue);
        Self {
            _dir: dir,
            paths,
            store,
            events: EventBus::default(),
        }
    }

    fn scheduler(&self, tracks: usize, ring: Vec<usize>, player: ScriptedPlayer) -> Scheduler {
        Scheduler::new(
            catalog(tracks),
            RandomQueue::from_order(ring),
            &self.paths,
            self.store.clone(),
            Box::new(player),
            self.events.clone(),
            CancellationToken::new(),
        )
        .with_retry_delay(Duration::from_millis(10))
    }

    fn play_log_lines(&self) -> Vec<String> {
        fs::read_to_string(&self.paths.play_log)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn catalog(n: usize) -> Arc<Catalog> {
    Arc::new(Catalog::from_tracks(
        (0..n)
            .map(|i| Track {
                location: loc(i),
                title: format!("Song {}", i),
                artist: format!("Artist {}", i),
                ..Track::default()
            })
            .collect(),
    ))
}

fn loc(i: usize) -> String {
    format!("/music/{}.mp3", i)
}

#[test]
fn test_random_only_rotation() {
    let fx = Fixture::new();
    let player = ScriptedPlayer::new().stop_after(3);
    let played = player.played();
    let mut scheduler = fx.scheduler(3, vec![1, 0, 2], player);

    assert_eq!(scheduler.run(), StopReason::Cancelled);

    assert_eq!(locations(&played), vec![loc(1), loc(0), loc(2)]);
    assert_eq!(scheduler.random_queue().order(), vec![1, 0, 2]);
    assert!(fx.store.try_read().unwrap().is_empty());

    let lines = fx.play_log_lines();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with(", Artist 1 - Song 1, Played Random,"));
}

#[test]
fn test_paid_queue_drains_in_order_before_random() {
    let fx = Fixture::new();
    fx.store.write_paid_queue(&[2, 0]).unwrap();
    let player = ScriptedPlayer::new().stop_after(3);
    let played = player.played();
    let mut scheduler = fx.scheduler(3, vec![1], player);

    scheduler.run();

    assert_eq!(locations(&played), vec![loc(2), loc(0), loc(1)]);
    assert!(fx.store.try_read().unwrap().is_empty());

    let lines = fx.play_log_lines();
    assert!(lines[0].ends_with("Played Paid,"));
    assert!(lines[1].ends_with("Played Paid,"));
    assert!(lines[2].ends_with("Played Random,"));
}

#[test]
fn test_request_during_random_track_plays_next() {
    let fx = Fixture::new();
    let store = fx.store.clone();
    let player = ScriptedPlayer::new().stop_after(4).during_play(move |n, _| {
        if n == 1 {
            store.append(2).unwrap();
            store.append(1).unwrap();
        }
    });
    let played = player.played();
    let mut scheduler = fx.scheduler(3, vec![0, 1], player);

    scheduler.run();

    // Random 0 was playing when 2 and 1 were paid for; random resumes at 1
    assert_eq!(locations(&played), vec![loc(0), loc(2), loc(1), loc(1)]);
    assert!(fx.store.try_read().unwrap().is_empty());
}

#[test]
fn test_append_during_paid_track_is_kept() {
    let fx = Fixture::new();
    fx.store.write_paid_queue(&[0]).unwrap();
    let store = fx.store.clone();
    let player = ScriptedPlayer::new().stop_after(2).during_play(move |n, _| {
        if n == 1 {
            store.append(1).unwrap();
        }
    });
    let played = player.played();
    let mut scheduler = fx.scheduler(2, vec![], player);

    scheduler.run();

    assert_eq!(locations(&played), vec![loc(0), loc(1)]);
    assert!(fx.store.try_read().unwrap().is_empty());
}

#[test]
fn test_entry_stays_queued_while_its_track_plays() {
    let fx = Fixture::new();
    fx.store.write_paid_queue(&[1, 2]).unwrap();
    let store = fx.store.clone();
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen_in_hook = seen.clone();
    let player = ScriptedPlayer::new().stop_after(2).during_play(move |_, _| {
        seen_in_hook.lock().unwrap().push(store.try_read().unwrap());
    });
    let mut scheduler = fx.scheduler(3, vec![], player);

    scheduler.run();

    assert_eq!(*seen.lock().unwrap(), vec![vec![1, 2], vec![2]]);
}

#[test]
fn test_interrupted_paid_track_is_replayed_next_start() {
    let fx = Fixture::new();
    fx.store.write_paid_queue(&[1, 2]).unwrap();
    let player = ScriptedPlayer::new().script(1, Script::Interrupt);
    let mut scheduler = fx.scheduler(3, vec![0], player);

    assert_eq!(scheduler.run(), StopReason::Cancelled);
    assert_eq!(fx.store.try_read().unwrap(), vec![1, 2]);

    // Restart: the same request plays first
    let player = ScriptedPlayer::new().stop_after(1);
    let played = player.played();
    let mut restarted = fx.scheduler(3, vec![0], player);
    restarted.run();

    assert_eq!(locations(&played), vec![loc(1)]);
    assert_eq!(fx.store.try_read().unwrap(), vec![2]);
}

#[test]
fn test_interrupted_random_track_is_not_rotated() {
    let fx = Fixture::new();
    let player = ScriptedPlayer::new().script(1, Script::Interrupt);
    let mut scheduler = fx.scheduler(2, vec![0, 1], player);

    scheduler.run();

    assert_eq!(scheduler.random_queue().order(), vec![0, 1]);
}

#[test]
fn test_failed_random_track_still_rotates() {
    let fx = Fixture::new();
    let player = ScriptedPlayer::new()
        .script(1, Script::Fail)
        .script(2, Script::Interrupt);
    let played = player.played();
    let mut scheduler = fx.scheduler(2, vec![0, 1], player);

    scheduler.run();

    assert_eq!(locations(&played), vec![loc(0), loc(1)]);
    assert_eq!(scheduler.random_queue().order(), vec![1, 0]);
}

#[test]
fn test_failed_removal_keeps_running_and_replays_entry() {
    let fx = Fixture::new();
    fx.store.write_paid_queue(&[0]).unwrap();
    let queue_path = fx.paths.paid_queue.clone();
    let player = ScriptedPlayer::new()
        .stop_after(3)
        .during_play(move |play, _| match play {
            // Removal after this track cannot parse the file
            1 => fs::write(&queue_path, "{garbage").unwrap(),
            2 => fs::write(&queue_path, "[0]").unwrap(),
            _ => {}
        });
    let played = player.played();
    let mut scheduler = fx.scheduler(2, vec![1], player);

    assert_eq!(scheduler.run(), StopReason::Cancelled);

    // Entry survived the failed removal and played again
    assert_eq!(locations(&played), vec![loc(0), loc(1), loc(0)]);
    assert!(fx.store.try_read().unwrap().is_empty());
}

#[test]
fn test_invalid_index_is_dropped() {
    let fx = Fixture::new();
    fx.store.write_paid_queue(&[999, -3, 1]).unwrap();
    let mut rx = fx.events.subscribe();
    let player = ScriptedPlayer::new().stop_after(1);
    let played = player.played();
    let mut scheduler = fx.scheduler(10, vec![5], player);

    scheduler.run();

    assert_eq!(locations(&played), vec![loc(1)]);
    assert!(fx.store.try_read().unwrap().is_empty());

    let mut invalid = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let JukeboxEvent::InvalidQueueEntry { index, catalog_size, .. } = event {
            assert_eq!(catalog_size, 10);
            invalid.push(index);
        }
    }
    assert_eq!(invalid, vec![999, -3]);
}

#[test]
fn test_only_invalid_entry_falls_through_to_random() {
    let fx = Fixture::new();
    fx.store.write_paid_queue(&[999]).unwrap();
    let player = ScriptedPlayer::new().stop_after(1);
    let played = player.played();
    let mut scheduler = fx.scheduler(10, vec![4, 7], player);

    scheduler.run();

    assert_eq!(locations(&played), vec![loc(4)]);
    assert!(fx.store.try_read().unwrap().is_empty());
}

#[test]
fn test_failed_paid_track_is_still_consumed() {
    let fx = Fixture::new();
    fx.store.write_paid_queue(&[0, 1]).unwrap();
    let player = ScriptedPlayer::new().script(1, Script::Fail).stop_after(2);
    let played = player.played();
    let mut scheduler = fx.scheduler(2, vec![], player);

    scheduler.run();

    assert_eq!(locations(&played), vec![loc(0), loc(1)]);
    assert!(fx.store.try_read().unwrap().is_empty());
}

#[test]
fn test_duplicate_requests_each_play() {
    let fx = Fixture::new();
    fx.store.write_paid_queue(&[3, 3]).unwrap();
    let player = ScriptedPlayer::new();
    let played = player.played();
    let mut scheduler = fx.scheduler(4, vec![], player);

    assert_eq!(scheduler.run(), StopReason::Exhausted);
    assert_eq!(locations(&played), vec![loc(3), loc(3)]);
}

#[test]
fn test_exhausted_when_nothing_left() {
    let fx = Fixture::new();
    fx.store.write_paid_queue(&[0]).unwrap();
    let mut rx = fx.events.subscribe();
    let player = ScriptedPlayer::new();
    let played = player.played();
    let mut scheduler = fx.scheduler(2, vec![], player);

    assert_eq!(scheduler.run(), StopReason::Exhausted);
    assert_eq!(locations(&played), vec![loc(0)]);

    let mut exhausted = false;
    while let Ok(event) = rx.try_recv() {
        exhausted |= matches!(event, JukeboxEvent::Exhausted { .. });
    }
    assert!(exhausted);
}

#[test]
fn test_corrupt_queue_treated_as_empty() {
    let fx = Fixture::new();
    fs::write(&fx.paths.paid_queue, "{broken").unwrap();
    let player = ScriptedPlayer::new().stop_after(1);
    let played = player.played();
    let mut scheduler = fx.scheduler(2, vec![1], player);

    scheduler.run();

    assert_eq!(locations(&played), vec![loc(1)]);
    assert_eq!(fs::read_to_string(&fx.paths.paid_queue).unwrap(), "{broken");
}

#[test]
fn test_now_playing_and_statistics_follow_plays() {
    let fx = Fixture::new();
    fx.store.write_paid_queue(&[1]).unwrap();
    let player = ScriptedPlayer::new().stop_after(3);
    let mut scheduler = fx.scheduler(2, vec![0], player);

    scheduler.run();

    assert_eq!(fs::read_to_string(&fx.paths.now_playing).unwrap(), loc(0));

    let stats: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&fx.paths.statistics).unwrap()).unwrap();
    assert_eq!(stats["0"]["play_count"], 2);
    assert_eq!(stats["1"]["play_count"], 1);
    assert_eq!(stats["1"]["play_history"][0]["type"], "paid");
    assert_eq!(scheduler.statistics().total_plays(), 3);
}

#[test]
fn test_track_events_are_emitted() {
    let fx = Fixture::new();
    let mut rx = fx.events.subscribe();
    let player = ScriptedPlayer::new().script(1, Script::Fail).stop_after(2);
    let mut scheduler = fx.scheduler(1, vec![0], player);

    scheduler.run();

    let mut finished = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let JukeboxEvent::TrackFinished { completed, .. } = event {
            finished.push(completed);
        }
    }
    assert_eq!(finished, vec![false, true]);
}
