//! # Snapshots
//!
//! Point-in-time views of the player, either pulled with
//! [`Player::snapshot`](crate::Player::snapshot) or pushed to subscribers.
//!
//! ## Push model
//!
//! Every [`SnapshotSubscription`] is a registration. A poller thread exists
//! only while at least one registration is alive: the first subscription
//! spawns it, dropping the last one stops and joins it. While running it
//! publishes a snapshot immediately and then every `snapshot_interval`.
//!
//! ## Persistence
//!
//! [`PersistentPlaybackState`] is the serializable part of the player a host
//! saves across process restarts and hands back to
//! [`Player::restore`](crate::Player::restore).

use bridge_traits::{PlaybackState, PlayerSnapshot};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

use crate::error::{PlaybackError, Result};
use crate::item::Item;
use crate::worker::Shared;

/// Snapshots buffered per subscriber before the oldest are dropped.
const SNAPSHOT_BUFFER: usize = 16;

/// What a host persists to resume playback later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistentPlaybackState {
    pub item: Item,
    pub state: PlaybackState,
    pub progress_secs: f64,
}

pub(crate) struct SnapshotHub {
    shared: Arc<Shared>,
    sender: broadcast::Sender<PlayerSnapshot>,
    registry: Mutex<Registry>,
}

#[derive(Default)]
struct Registry {
    subscribers: usize,
    poller: Option<Poller>,
}

struct Poller {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl SnapshotHub {
    pub fn new(shared: Arc<Shared>) -> Self {
        let (sender, _) = broadcast::channel(SNAPSHOT_BUFFER);
        Self {
            shared,
            sender,
            registry: Mutex::new(Registry::default()),
        }
    }

    pub fn subscribe(self: &Arc<Self>) -> Result<SnapshotSubscription> {
        let mut registry = self.registry.lock();
        // Subscribe before the poller exists so its first push is received.
        let receiver = self.sender.subscribe();

        if registry.subscribers == 0 {
            registry.poller = Some(self.spawn_poller()?);
            debug!("Snapshot poller started");
        }
        registry.subscribers += 1;

        Ok(SnapshotSubscription {
            hub: Arc::clone(self),
            receiver,
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().subscribers
    }

    fn unsubscribe(&self) {
        let mut registry = self.registry.lock();
        registry.subscribers = registry.subscribers.saturating_sub(1);
        if registry.subscribers > 0 {
            return;
        }
        if let Some(poller) = registry.poller.take() {
            poller.stop.store(true, Ordering::Release);
            poller.handle.thread().unpark();
            if poller.handle.join().is_err() {
                warn!("Snapshot poller panicked");
            }
            debug!("Snapshot poller stopped");
        }
    }

    fn spawn_poller(&self) -> Result<Poller> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let shared = Arc::clone(&self.shared);
        let sender = self.sender.clone();

        let handle = thread::Builder::new()
            .name("playback-snapshots".to_string())
            .spawn(move || {
                let interval = shared.timing.snapshot_interval;
                while !flag.load(Ordering::Acquire) {
                    // Lagging receivers drop old snapshots; an error only
                    // means nobody is listening right now.
                    sender.send(shared.snapshot()).ok();
                    thread::park_timeout(interval);
                }
            })
            .map_err(|source| PlaybackError::ThreadSpawn {
                name: "snapshot poller",
                source,
            })?;

        Ok(Poller { stop, handle })
    }
}

/// Registration for pushed snapshots. Dropping it unregisters.
pub struct SnapshotSubscription {
    hub: Arc<SnapshotHub>,
    receiver: broadcast::Receiver<PlayerSnapshot>,
}

impl SnapshotSubscription {
    /// Next buffered snapshot, if any. Skips over snapshots lost to lag.
    pub fn try_recv(&mut self) -> Option<PlayerSnapshot> {
        loop {
            match self.receiver.try_recv() {
                Ok(snapshot) => return Some(snapshot),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Newest buffered snapshot, discarding older ones.
    pub fn latest(&mut self) -> Option<PlayerSnapshot> {
        let mut latest = None;
        while let Some(snapshot) = self.try_recv() {
            latest = Some(snapshot);
        }
        latest
    }

    /// Wait for the next snapshot.
    pub async fn recv(&mut self) -> Option<PlayerSnapshot> {
        loop {
            match self.receiver.recv().await {
                Ok(snapshot) => return Some(snapshot),
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Snapshot subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl std::fmt::Debug for SnapshotSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotSubscription")
            .field("buffered", &self.receiver.len())
            .finish()
    }
}

impl Drop for SnapshotSubscription {
    fn drop(&mut self) {
        self.hub.unsubscribe();
    }
}
