//! Backend signal delivery.
//!
//! Each prepare cycle hands its backend a fresh [`SignalHandle`] stamped
//! with the worker generation current at that time. Submitting a new item
//! and tearing a backend down both bump the generation, which detaches every
//! older handle: their signals are dropped, so a superseded backend can
//! never touch the machine, even before the worker gets round to releasing
//! it.

use bridge_traits::{MediaEvents, PlaybackState};
use core_runtime::events::{CoreEvent, PlaybackEvent};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::PlaybackError;
use crate::worker::{Inner, Shared};

pub(crate) struct SignalHandle {
    shared: Arc<Shared>,
    generation: u64,
}

impl SignalHandle {
    pub fn new(shared: Arc<Shared>, generation: u64) -> Self {
        Self { shared, generation }
    }

    /// Run `apply` under the lock if this handle is still current, then
    /// wake the worker.
    fn deliver(&self, signal: &'static str, apply: impl FnOnce(&mut Inner)) {
        let mut inner = self.shared.inner.lock();
        if inner.generation != self.generation {
            trace!(
                signal,
                handle = self.generation,
                current = inner.generation,
                "Dropping stale signal"
            );
            return;
        }
        debug!(signal, state = %inner.state, "Backend signal");
        apply(&mut inner);
        self.shared.wake(&mut inner);
    }
}

impl MediaEvents for SignalHandle {
    fn on_prepared(&self) {
        self.deliver("prepared", |inner| {
            if inner.state == PlaybackState::Preparing {
                inner.prepared_pending = true;
            }
        });
    }

    fn on_error(&self, message: String) {
        self.deliver("error", |inner| {
            inner.fail(PlaybackError::EngineFailure(message).to_string());
        });
    }

    fn on_completed(&self) {
        self.deliver("completed", |inner| {
            inner.target = PlaybackState::Finished;
            let item_id = inner.item_id();
            inner.push_event(CoreEvent::Playback(PlaybackEvent::Completed { item_id }));
        });
    }

    fn on_buffering(&self, stalled: bool) {
        self.deliver("buffering", |inner| {
            let next = match (inner.state, stalled) {
                (PlaybackState::Playing, true) => PlaybackState::Buffering,
                (PlaybackState::Buffering, false) => PlaybackState::Playing,
                _ => return,
            };
            inner.set_state(next);
        });
    }
}
