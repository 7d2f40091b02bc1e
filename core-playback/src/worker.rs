//! # Playback Worker
//!
//! The single owner of the playback state machine.
//!
//! ## Overview
//!
//! All mutable engine state lives in one [`Inner`] behind one
//! `parking_lot::Mutex`. Three kinds of threads touch it:
//!
//! - the worker thread (this module), the only writer of `state` apart from
//!   the error and buffering signals
//! - host callback threads, through [`SignalHandle`](crate::signals::SignalHandle)
//! - the progress [`Ticker`](crate::ticker::Ticker)
//!
//! Client commands only write `target`, `item`, `reset` and `pending_seek`,
//! then wake the worker.
//!
//! ## Loop
//!
//! Every iteration handles a requested reset, consumes a pending `prepared`
//! flag, asks the decision table for one action and performs it. It then
//! publishes queued events and finishes retired tickers with the lock
//! released, and sleeps on the condition variable. The sleep is short after
//! kicking off work whose outcome arrives asynchronously and long otherwise.
//! Any command or signal interrupts it, including one that arrived while the
//! worker was busy.
//!
//! Backend preparation may block (local recordings are merged first), so it
//! runs with the lock released. Nothing else can tear the backend down in
//! that window because only the worker does teardown.

use bridge_traits::{Clock, MediaSessionId, PlaybackState, PlayerSnapshot, ProgressListener};
use chrono::{DateTime, Utc};
use core_runtime::config::{PlayerConfig, TimingConfig};
use core_runtime::events::{CoreEvent, EventBus, LifecycleEvent, PlaybackEvent};
use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, trace, warn};

use crate::backend::{self, Backend, Bridges};
use crate::decision::{decide, Action};
use crate::error::PlaybackError;
use crate::item::{Item, SourceClassifier, SourceKind};
use crate::signals::SignalHandle;
use crate::ticker::Ticker;

// ============================================================================
// Shared state
// ============================================================================

/// State shared by the worker, signal handles, the ticker and the facade.
pub(crate) struct Shared {
    pub inner: Mutex<Inner>,
    wake: Condvar,
    pub bridges: Bridges,
    pub timing: TimingConfig,
    pub clock: Arc<dyn Clock>,
    pub listener: Option<Arc<dyn ProgressListener>>,
    pub events: EventBus,
    pub classifier: Arc<dyn SourceClassifier>,
}

impl Shared {
    pub fn new(config: &PlayerConfig, classifier: Arc<dyn SourceClassifier>) -> Self {
        Self {
            inner: Mutex::new(Inner::new(config.clock.now())),
            wake: Condvar::new(),
            bridges: Bridges::from_config(config),
            timing: config.timing,
            clock: Arc::clone(&config.clock),
            listener: config.progress_listener.clone(),
            events: config.event_bus.clone(),
            classifier,
        }
    }

    /// Interrupt the worker's current sleep, or its next one if it is busy.
    /// Callers hold the lock, so the request cannot be lost.
    pub fn wake(&self, inner: &mut Inner) {
        inner.wake_pending = true;
        self.wake.notify_one();
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.inner.lock().snapshot()
    }
}

/// Everything guarded by the engine lock.
pub(crate) struct Inner {
    pub state: PlaybackState,
    pub target: PlaybackState,
    /// A new item was submitted; tear down before deciding.
    pub reset: bool,
    pub item: Option<Arc<Item>>,
    pub backend: Option<Box<dyn Backend>>,
    /// Set from the start of a prepare cycle until teardown, including the
    /// window where the backend itself is out being prepared.
    pub session_id: Option<MediaSessionId>,
    pub backend_kind: Option<SourceKind>,
    /// Bumped on every teardown; signal handles of older generations are
    /// ignored.
    pub generation: u64,
    pub prepared_pending: bool,
    pub pending_seek: Option<Duration>,
    pub progress: Duration,
    pub last_tick: DateTime<Utc>,
    pub ticker: Option<Ticker>,
    /// Stopped tickers waiting to be joined with the lock released.
    pub retired: Vec<Ticker>,
    pub should_run: bool,
    pub wake_pending: bool,
    pub last_error: Option<String>,
    /// Events waiting to be published with the lock released.
    pub outbox: Vec<CoreEvent>,
}

impl Inner {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            state: PlaybackState::None,
            target: PlaybackState::None,
            reset: false,
            item: None,
            backend: None,
            session_id: None,
            backend_kind: None,
            generation: 0,
            prepared_pending: false,
            pending_seek: None,
            progress: Duration::ZERO,
            last_tick: now,
            ticker: None,
            retired: Vec::new(),
            should_run: true,
            wake_pending: false,
            last_error: None,
            outbox: Vec::new(),
        }
    }

    pub fn item_id(&self) -> Option<i64> {
        self.item.as_ref().and_then(|item| item.id)
    }

    pub fn set_state(&mut self, to: PlaybackState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        let item_id = self.item_id();
        debug!(%from, %to, ?item_id, "State changed");
        self.outbox
            .push(CoreEvent::Playback(PlaybackEvent::StateChanged { item_id, from, to }));
    }

    /// Enter `Error` and record why.
    pub fn fail(&mut self, message: String) {
        let item_id = self.item_id();
        error!(?item_id, error = %message, "Playback failed");
        self.set_state(PlaybackState::Error);
        self.last_error = Some(message.clone());
        self.outbox
            .push(CoreEvent::Playback(PlaybackEvent::Error { item_id, message }));
    }

    pub fn push_event(&mut self, event: CoreEvent) {
        self.outbox.push(event);
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.signal_stop();
            self.retired.push(ticker);
        }
    }

    fn has_resources(&self) -> bool {
        self.session_id.is_some() || self.ticker.is_some()
    }

    /// Make every signal handle issued so far stale.
    pub fn detach_signals(&mut self) {
        self.prepared_pending = false;
        self.generation += 1;
    }

    /// Release the backend and the ticker. Item and pending seek survive.
    fn teardown(&mut self) {
        self.stop_ticker();
        if let Some(mut backend) = self.backend.take() {
            debug!(session = %backend.session_id(), "Releasing backend");
            backend.stop();
        }
        self.session_id = None;
        self.backend_kind = None;
        self.detach_signals();
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        let item = self.item.as_deref();
        PlayerSnapshot {
            state: self.state,
            progress_secs: self.progress.as_secs_f64(),
            total_secs: item.map_or(0.0, |i| i.total_duration().as_secs_f64()),
            item_id: item.and_then(|i| i.id),
            title: item.and_then(|i| i.title.clone()),
            author: item.and_then(|i| i.author.clone()),
            is_local: item.is_some_and(Item::is_local),
            is_message: item.is_some_and(|i| i.is_message),
        }
    }

    pub fn diagnostics(&self) -> EngineDiagnostics {
        EngineDiagnostics {
            state: self.state,
            target: self.target,
            backend_present: self.session_id.is_some(),
            backend_instance: self.session_id,
            backend_kind: self.backend_kind,
            ticker_active: self.ticker.is_some(),
            pending_seek: self.pending_seek,
            last_error: self.last_error.clone(),
        }
    }
}

/// Locked point-in-time view of engine internals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineDiagnostics {
    pub state: PlaybackState,
    pub target: PlaybackState,
    /// A backend exists, prepared or still preparing.
    pub backend_present: bool,
    /// Session of the current backend; changes on every prepare cycle.
    pub backend_instance: Option<MediaSessionId>,
    pub backend_kind: Option<SourceKind>,
    pub ticker_active: bool,
    pub pending_seek: Option<Duration>,
    pub last_error: Option<String>,
}

// ============================================================================
// Worker loop
// ============================================================================

type Guard<'a> = MutexGuard<'a, Inner>;

/// Worker thread body. Returns once `should_run` is cleared.
pub(crate) fn run(shared: Arc<Shared>) {
    let span = info_span!("playback-worker");
    let _entered = span.enter();

    info!("Playback worker started");
    shared
        .events
        .emit(CoreEvent::Lifecycle(LifecycleEvent::WorkerStarted))
        .ok();

    let mut guard = shared.inner.lock();
    while guard.should_run {
        let sleep = step(&shared, &mut guard);
        flush(&shared, &mut guard);

        if !guard.should_run {
            break;
        }
        if !guard.wake_pending {
            trace!(sleep_ms = sleep.as_millis() as u64, "Sleeping");
            shared.wake.wait_for(&mut guard, sleep);
        }
        guard.wake_pending = false;
    }

    guard.teardown();
    guard.set_state(PlaybackState::None);
    flush(&shared, &mut guard);
    drop(guard);

    info!("Playback worker stopped");
    shared
        .events
        .emit(CoreEvent::Lifecycle(LifecycleEvent::WorkerStopped))
        .ok();
}

/// One loop iteration. Returns how long to sleep afterwards.
fn step(shared: &Arc<Shared>, guard: &mut Guard<'_>) -> Duration {
    let timing = shared.timing;

    if guard.reset {
        guard.reset = false;
        guard.teardown();
        guard.set_state(PlaybackState::None);
        if guard.target == PlaybackState::Error {
            guard.fail(unplayable());
            return timing.idle_sleep;
        }
    }

    if guard.prepared_pending {
        guard.prepared_pending = false;
        if guard.state == PlaybackState::Preparing {
            guard.set_state(PlaybackState::Paused);
        }
    }

    if guard.state == PlaybackState::Error {
        if guard.has_resources() {
            guard.teardown();
        }
        return timing.idle_sleep;
    }

    let action = decide(guard.state, guard.target);
    if action != Action::None {
        debug!(%action, state = %guard.state, target = %guard.target, "Performing action");
    }

    match action {
        Action::None => apply_pending_seek(shared, guard),
        Action::Prepare | Action::Reset => prepare(shared, guard),
        Action::Resume => resume(shared, guard),
        Action::Pause => pause(shared, guard),
        Action::Stop => stop(shared, guard),
    }
}

/// Publish queued events and finish retired tickers, lock released.
fn flush(shared: &Shared, guard: &mut Guard<'_>) {
    if guard.outbox.is_empty() && guard.retired.is_empty() {
        return;
    }
    let events = std::mem::take(&mut guard.outbox);
    let retired = std::mem::take(&mut guard.retired);

    MutexGuard::unlocked(guard, || {
        for ticker in retired {
            ticker.join();
            if let Some(listener) = &shared.listener {
                listener.on_progress(false);
            }
        }
        publish(&shared.events, events);
    });
}

fn unplayable() -> String {
    PlaybackError::UnplayableSource("no backend handles this item".to_string()).to_string()
}

fn publish(bus: &EventBus, events: Vec<CoreEvent>) {
    for event in events {
        // No subscribers is fine.
        bus.emit(event).ok();
    }
}

// ============================================================================
// Actions
// ============================================================================

fn prepare(shared: &Arc<Shared>, guard: &mut Guard<'_>) -> Duration {
    let timing = shared.timing;
    guard.teardown();

    let Some(item) = guard.item.clone() else {
        guard.fail(PlaybackError::NoItem.to_string());
        return timing.idle_sleep;
    };
    let Some(kind) = shared.classifier.classify(&item) else {
        guard.fail(unplayable());
        return timing.idle_sleep;
    };

    let generation = guard.generation;
    let signals = Arc::new(SignalHandle::new(Arc::clone(shared), generation));
    let mut backend = match backend::select(kind, &shared.bridges, signals) {
        Ok(backend) => backend,
        Err(err) => {
            guard.fail(err.to_string());
            return timing.idle_sleep;
        }
    };

    guard.session_id = Some(backend.session_id());
    guard.backend_kind = Some(backend.kind());
    guard.progress = Duration::ZERO;
    guard.set_state(PlaybackState::Preparing);
    info!(item_id = ?item.id, backend = %kind, generation, "Preparing item");

    let events = std::mem::take(&mut guard.outbox);
    let result = MutexGuard::unlocked(guard, || {
        publish(&shared.events, events);
        backend.prepare(&item)
    });

    if guard.generation != generation {
        debug!(item_id = ?item.id, "Item replaced while preparing");
        backend.stop();
        guard.session_id = None;
        guard.backend_kind = None;
        return timing.retry_sleep;
    }

    match result {
        Ok(()) => {
            guard.backend = Some(backend);
            timing.retry_sleep
        }
        Err(err) => {
            backend.stop();
            guard.session_id = None;
            guard.backend_kind = None;
            guard.fail(err.to_string());
            timing.idle_sleep
        }
    }
}

fn resume(shared: &Arc<Shared>, guard: &mut Guard<'_>) -> Duration {
    let timing = shared.timing;
    let inner: &mut Inner = guard;
    let from = inner.state;

    let Some(backend) = inner.backend.as_mut() else {
        warn!(state = %from, "No backend to resume, preparing again");
        inner.set_state(PlaybackState::None);
        return timing.retry_sleep;
    };

    match backend.resume() {
        Ok(()) => {}
        Err(err) if err.is_transient() && from == PlaybackState::Preparing => {
            trace!("Backend not prepared yet, retrying");
            return timing.retry_sleep;
        }
        Err(err) => {
            inner.fail(err.to_string());
            return timing.idle_sleep;
        }
    }

    if from == PlaybackState::Finished {
        backend.seek(Duration::ZERO);
        inner.progress = Duration::ZERO;
    }

    inner.last_tick = shared.clock.now();
    inner.set_state(PlaybackState::Playing);

    if inner.ticker.is_none() {
        match Ticker::start(Arc::clone(shared)) {
            Ok(ticker) => inner.ticker = Some(ticker),
            Err(err) => {
                inner.fail(err.to_string());
                return timing.idle_sleep;
            }
        }
    }

    if inner.pending_seek.is_some() {
        timing.retry_sleep
    } else {
        timing.idle_sleep
    }
}

fn pause(shared: &Shared, guard: &mut Guard<'_>) -> Duration {
    let inner: &mut Inner = guard;
    if let Some(backend) = inner.backend.as_mut() {
        backend.pause();
    }
    inner.stop_ticker();
    inner.set_state(PlaybackState::Paused);
    shared.timing.idle_sleep
}

fn stop(shared: &Shared, guard: &mut Guard<'_>) -> Duration {
    let inner: &mut Inner = guard;
    if inner.target == PlaybackState::Finished {
        inner.stop_ticker();
        if let Some(backend) = inner.backend.as_mut() {
            backend.pause();
        }
        inner.set_state(PlaybackState::Finished);
    } else {
        inner.teardown();
        inner.item = None;
        inner.pending_seek = None;
        inner.set_state(PlaybackState::None);
    }
    shared.timing.idle_sleep
}

fn apply_pending_seek(shared: &Shared, guard: &mut Guard<'_>) -> Duration {
    let inner: &mut Inner = guard;
    if inner.state == PlaybackState::Playing {
        if let (Some(position), Some(backend)) = (inner.pending_seek, inner.backend.as_mut()) {
            debug!(position_ms = position.as_millis() as u64, "Applying seek");
            backend.seek(position);
            inner.pending_seek = None;
            inner.progress = position;
            inner.last_tick = shared.clock.now();
        }
    }
    shared.timing.idle_sleep
}
