//! Shared fixtures for the engine integration tests.
//!
//! [`FakeEngine`] stands in for both host engines. Every session it opens is
//! recorded as a [`SessionProbe`] through which the test inspects control
//! calls and fires `MediaEvents` signals from its own thread, the way a real
//! engine raises them from its callback thread.

#![allow(dead_code)]

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BridgeError, LocalDecoder, MediaEvents, MediaSession, ProgressListener, StreamEngine,
};
use core_playback::Player;
use core_runtime::config::{PlayerConfig, TimingConfig};
use parking_lot::{Condvar, Mutex};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// ============================================================================
// Fake engine
// ============================================================================

/// Control call observed by a fake session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Call {
    Start,
    Pause,
    Seek(Duration),
}

pub struct SessionProbe {
    pub locator: String,
    events: Arc<dyn MediaEvents>,
    calls: Mutex<Vec<Call>>,
    released: AtomicBool,
    position: Mutex<Option<Duration>>,
    refuse_start: AtomicBool,
}

impl SessionProbe {
    pub fn prepared(&self) {
        self.events.on_prepared();
    }

    pub fn fail(&self, message: &str) {
        self.events.on_error(message.to_string());
    }

    pub fn complete(&self) {
        self.events.on_completed();
    }

    pub fn buffering(&self, stalled: bool) {
        self.events.on_buffering(stalled);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    pub fn set_position(&self, position: Option<Duration>) {
        *self.position.lock() = position;
    }

    /// Make `start` fail as a broken device would.
    pub fn refuse_start(&self) {
        self.refuse_start.store(true, Ordering::SeqCst);
    }
}

struct FakeSession {
    probe: Arc<SessionProbe>,
}

impl MediaSession for FakeSession {
    fn start(&mut self) -> BridgeResult<()> {
        if self.probe.refuse_start.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("audio device lost".into()));
        }
        self.probe.calls.lock().push(Call::Start);
        Ok(())
    }

    fn pause(&mut self) -> BridgeResult<()> {
        self.probe.calls.lock().push(Call::Pause);
        Ok(())
    }

    fn seek(&mut self, position: Duration) -> BridgeResult<()> {
        self.probe.calls.lock().push(Call::Seek(position));
        Ok(())
    }

    fn position(&self) -> Option<Duration> {
        *self.probe.position.lock()
    }

    fn release(&mut self) {
        self.probe.released.store(true, Ordering::SeqCst);
    }
}

/// Host engine double implementing both [`StreamEngine`] and
/// [`LocalDecoder`].
#[derive(Default)]
pub struct FakeEngine {
    sessions: Mutex<Vec<Arc<SessionProbe>>>,
    refuse_open: AtomicBool,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn refusing_open() -> Arc<Self> {
        let engine = Self::default();
        engine.refuse_open.store(true, Ordering::SeqCst);
        Arc::new(engine)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// The `index`-th opened session, waiting for it to appear.
    pub fn session(&self, index: usize) -> Arc<SessionProbe> {
        wait_for("session to be opened", || self.session_count() > index);
        Arc::clone(&self.sessions.lock()[index])
    }

    fn open(&self, locator: String, events: Arc<dyn MediaEvents>) -> BridgeResult<Box<dyn MediaSession>> {
        if self.refuse_open.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("unsupported codec".into()));
        }
        let probe = Arc::new(SessionProbe {
            locator,
            events,
            calls: Mutex::new(Vec::new()),
            released: AtomicBool::new(false),
            position: Mutex::new(None),
            refuse_start: AtomicBool::new(false),
        });
        self.sessions.lock().push(Arc::clone(&probe));
        Ok(Box::new(FakeSession { probe }))
    }
}

impl StreamEngine for FakeEngine {
    fn open_stream(
        &self,
        locator: &str,
        events: Arc<dyn MediaEvents>,
    ) -> BridgeResult<Box<dyn MediaSession>> {
        self.open(locator.to_string(), events)
    }
}

impl LocalDecoder for FakeEngine {
    fn open_file(
        &self,
        path: &Path,
        events: Arc<dyn MediaEvents>,
    ) -> BridgeResult<Box<dyn MediaSession>> {
        self.open(path.to_string_lossy().into_owned(), events)
    }
}

// ============================================================================
// Gate listener
// ============================================================================

/// Progress listener that can hold the worker.
///
/// The worker reports `on_progress(false)` for a stopped ticker with its lock
/// released, after it has already applied the command that stopped it. While
/// the gate is closed that call blocks, which freezes the worker between two
/// loop iterations with commands and signals still free to arrive.
#[derive(Default)]
pub struct GateListener {
    closed: Mutex<bool>,
    opened: Condvar,
    holding: AtomicBool,
}

impl GateListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn close(&self) {
        *self.closed.lock() = true;
    }

    pub fn open(&self) {
        *self.closed.lock() = false;
        self.opened.notify_all();
    }

    /// Wait until the worker is parked in the listener.
    pub fn wait_until_holding(&self) {
        wait_for("worker to reach the gate", || self.holding.load(Ordering::SeqCst));
    }
}

impl ProgressListener for GateListener {
    fn on_progress(&self, active: bool) {
        if active {
            return;
        }
        let mut closed = self.closed.lock();
        if *closed {
            self.holding.store(true, Ordering::SeqCst);
            while *closed {
                self.opened.wait(&mut closed);
            }
            self.holding.store(false, Ordering::SeqCst);
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

const DEADLINE: Duration = Duration::from_secs(5);

/// Poll `condition` until it holds, panicking after a generous deadline.
pub fn wait_for(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + DEADLINE;
    while Instant::now() < deadline {
        if condition() {
            return;
        }
        thread::sleep(Duration::from_millis(2));
    }
    panic!("timed out waiting for {}", what);
}

/// Give the worker several retry periods to (not) react.
pub fn settle() {
    thread::sleep(Duration::from_millis(80));
}

pub fn streaming_config(engine: &Arc<FakeEngine>) -> PlayerConfig {
    PlayerConfig::builder()
        .timing(TimingConfig::responsive())
        .stream_engine(Arc::clone(engine) as Arc<dyn StreamEngine>)
        .build()
        .expect("valid config")
}

/// Streaming player whose worker can be held with `gate`.
pub fn gated_player(engine: &Arc<FakeEngine>, gate: &Arc<GateListener>) -> Player {
    let config = PlayerConfig::builder()
        .timing(TimingConfig::responsive())
        .stream_engine(Arc::clone(engine) as Arc<dyn StreamEngine>)
        .progress_listener(Arc::clone(gate) as Arc<dyn ProgressListener>)
        .build()
        .expect("valid config");
    Player::spawn(config).expect("player starts")
}

pub fn streaming_player(engine: &Arc<FakeEngine>) -> Player {
    Player::spawn(streaming_config(engine)).expect("player starts")
}

pub fn wait_for_state(player: &Player, state: core_playback::PlaybackState) {
    wait_for(&format!("state {}", state), || player.state() == state);
}
