//! # Player
//!
//! The client facade over the playback worker.
//!
//! Every command takes the engine lock, records what the caller wants,
//! wakes the worker and returns. Nothing here waits for a backend; the
//! outcome is observable through [`Player::snapshot`], pushed snapshots and
//! the event bus.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::{Item, Player};
//! use core_runtime::config::PlayerConfig;
//!
//! let config = PlayerConfig::builder()
//!     .stream_engine(engine)
//!     .build()?;
//! let player = Player::spawn(config)?;
//!
//! player.play(Item::remote(42, "https://cdn.example/42.mp3"), true);
//! player.seek(std::time::Duration::from_secs(30));
//! let snapshot = player.snapshot();
//! ```

use bridge_traits::{PlaybackState, PlayerSnapshot};
use core_runtime::config::PlayerConfig;
use core_runtime::events::EventStream;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{PlaybackError, Result};
use crate::item::{DefaultClassifier, Item, SourceClassifier};
use crate::snapshot::{PersistentPlaybackState, SnapshotHub, SnapshotSubscription};
use crate::worker::{self, EngineDiagnostics, Inner, Shared};

/// Handle to a running playback engine.
///
/// Dropping the player shuts the worker down, releasing any backend.
pub struct Player {
    shared: Arc<Shared>,
    snapshots: Arc<SnapshotHub>,
    worker: Option<JoinHandle<()>>,
}

impl Player {
    /// Start an engine that classifies items with [`DefaultClassifier`].
    pub fn spawn(config: PlayerConfig) -> Result<Self> {
        Self::with_classifier(config, Arc::new(DefaultClassifier))
    }

    /// Start an engine with a host-provided source classifier.
    pub fn with_classifier(
        config: PlayerConfig,
        classifier: Arc<dyn SourceClassifier>,
    ) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared::new(&config, classifier));
        let worker = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("playback-worker".to_string())
                .spawn(move || worker::run(shared))
                .map_err(|source| PlaybackError::ThreadSpawn {
                    name: "worker",
                    source,
                })?
        };

        info!(timing = ?config.timing, "Player started");
        Ok(Self {
            snapshots: Arc::new(SnapshotHub::new(Arc::clone(&shared))),
            shared,
            worker: Some(worker),
        })
    }

    fn command(&self, name: &'static str, apply: impl FnOnce(&mut Inner)) {
        let mut inner = self.shared.inner.lock();
        debug!(command = name, state = %inner.state, "Command");
        apply(&mut inner);
        self.shared.wake(&mut inner);
    }

    /// Replace the current item. Playback starts as soon as it is prepared
    /// when `autostart` is set; otherwise the player settles in `Paused`.
    pub fn play(&self, item: Item, autostart: bool) {
        self.command("play", |inner| submit(&self.shared, inner, item, autostart));
    }

    pub fn pause(&self) {
        self.command("pause", |inner| {
            if inner.item.is_some() {
                inner.target = PlaybackState::Paused;
            }
        });
    }

    pub fn resume(&self) {
        self.command("resume", |inner| {
            if inner.item.is_some() {
                inner.target = PlaybackState::Playing;
            }
        });
    }

    /// Stop playback and forget the current item.
    pub fn stop(&self) {
        self.command("stop", |inner| inner.target = PlaybackState::None);
    }

    /// Jump to `position`. Held until the item is playing.
    pub fn seek(&self, position: Duration) {
        self.command("seek", |inner| {
            if inner.item.is_some() {
                inner.pending_seek = Some(position);
            }
        });
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.shared.snapshot()
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.inner.lock().state
    }

    /// State to persist, `None` when nothing is loaded.
    pub fn persistent_state(&self) -> Option<PersistentPlaybackState> {
        let inner = self.shared.inner.lock();
        inner.item.as_ref().map(|item| PersistentPlaybackState {
            item: Item::clone(item),
            state: inner.state,
            progress_secs: inner.progress.as_secs_f64(),
        })
    }

    /// Load a persisted item paused, continuing from its saved position the
    /// first time it plays.
    pub fn restore(&self, saved: PersistentPlaybackState) {
        let position = Duration::try_from_secs_f64(saved.progress_secs).unwrap_or_default();
        self.command("restore", |inner| {
            submit(&self.shared, inner, saved.item, false);
            if !position.is_zero() {
                inner.pending_seek = Some(position);
            }
        });
    }

    pub fn diagnostics(&self) -> EngineDiagnostics {
        self.shared.inner.lock().diagnostics()
    }

    /// Register for pushed snapshots.
    pub fn subscribe(&self) -> Result<SnapshotSubscription> {
        self.snapshots.subscribe()
    }

    /// Number of live snapshot subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.snapshots.subscriber_count()
    }

    /// Stream of playback and lifecycle events.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.shared.events.subscribe())
    }

    /// Stop the worker and wait for it to release everything.
    pub fn shutdown(mut self) {
        self.stop_worker();
    }

    fn stop_worker(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };
        {
            let mut inner = self.shared.inner.lock();
            inner.should_run = false;
            self.shared.wake(&mut inner);
        }
        if handle.join().is_err() {
            warn!("Playback worker panicked");
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("running", &self.worker.is_some())
            .finish_non_exhaustive()
    }
}

/// Install `item` and request a reset. An item no backend handles sends the
/// worker straight to `Error`.
///
/// Signal handles of the outgoing backend are detached here rather than at
/// the worker's teardown, so nothing it reports in between lands on `item`.
fn submit(shared: &Shared, inner: &mut Inner, item: Item, autostart: bool) {
    let playable = shared.classifier.classify(&item).is_some();
    inner.detach_signals();
    inner.item = Some(Arc::new(item));
    inner.pending_seek = None;
    inner.last_error = None;
    inner.reset = true;
    inner.target = match (playable, autostart) {
        (false, _) => PlaybackState::Error,
        (true, true) => PlaybackState::Playing,
        (true, false) => PlaybackState::Paused,
    };
}
