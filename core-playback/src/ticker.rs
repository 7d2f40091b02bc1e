//! Progress ticker.
//!
//! A dedicated thread that, every `tick_interval`, advances the progress of
//! the current item and notifies the [`ProgressListener`]. It exists exactly
//! while the state is `Playing` or `Buffering`; the worker starts it on
//! resume and stops it on every path leaving playback.
//!
//! Stopping only raises a flag and unparks the thread. The worker joins it
//! later with the engine lock released, then reports `on_progress(false)`
//! once, so that call is always the last one a listener sees for this
//! ticker.
//!
//! [`ProgressListener`]: bridge_traits::ProgressListener

use bridge_traits::PlaybackState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{trace, warn};

use crate::error::{PlaybackError, Result};
use crate::worker::{Inner, Shared};

pub(crate) struct Ticker {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Ticker {
    pub fn start(shared: Arc<Shared>) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("playback-ticker".to_string())
            .spawn(move || run(&shared, &flag))
            .map_err(|source| PlaybackError::ThreadSpawn {
                name: "ticker",
                source,
            })?;
        Ok(Self { stop, handle })
    }

    pub fn signal_stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.handle.thread().unpark();
    }

    /// Wait for the thread to exit. Must not be called with the lock held.
    pub fn join(self) {
        self.signal_stop();
        if self.handle.join().is_err() {
            warn!("Progress ticker panicked");
        }
    }
}

fn run(shared: &Shared, stop: &AtomicBool) {
    trace!("Progress ticker started");
    while !stop.load(Ordering::Acquire) {
        let active = {
            let mut inner = shared.inner.lock();
            // Checked again under the lock: a stop raised while we waited
            // for it must not produce another notification.
            if stop.load(Ordering::Acquire) {
                break;
            }
            tick(shared, &mut inner)
        };

        if let Some(listener) = &shared.listener {
            listener.on_progress(active);
        }

        // Spurious wakeups only cause an early tick.
        thread::park_timeout(shared.timing.tick_interval);
    }
    trace!("Progress ticker stopped");
}

/// Advance progress. Returns whether audio is actually playing.
fn tick(shared: &Shared, inner: &mut Inner) -> bool {
    let now = shared.clock.now();
    let playing = inner.state == PlaybackState::Playing;

    if playing {
        let reported = inner.backend.as_ref().and_then(|backend| backend.position());
        inner.progress = match reported {
            Some(position) => position,
            None => inner.progress + (now - inner.last_tick).to_std().unwrap_or_default(),
        };
    }
    inner.last_tick = now;

    playing
}
