//! # Backend Capability
//!
//! A backend turns one [`Item`] into one host media session and relays the
//! worker's control calls to it. A fresh backend is created for every
//! prepare cycle and torn down before the next one, so the worker never
//! holds more than one.
//!
//! ## Variants
//!
//! - [`StreamingBackend`](streaming::StreamingBackend): remote URLs and
//!   bundled intro assets, played by the host [`StreamEngine`]
//! - [`LocalBackend`](local::LocalBackend): on-device recordings, merged by
//!   the [`SourceNormalizer`] and played by the host [`LocalDecoder`]
//!
//! ## Readiness
//!
//! `prepare` only opens the session; the host reports completion later
//! through [`MediaEvents::on_prepared`]. Until then `resume` fails with
//! [`PlaybackError::NotReady`], which is the single point where the worker
//! synchronizes with preparation without ever blocking on it.
//!
//! All control calls tolerate a missing session: they are no-ops (or report
//! not-ready) rather than errors.

pub mod local;
pub mod streaming;

use bridge_traits::{
    AssetResolver, LocalDecoder, MediaEvents, MediaSession, MediaSessionId, SourceNormalizer,
    StreamEngine,
};
use core_runtime::config::PlayerConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::error::{PlaybackError, Result};
use crate::item::{Item, SourceKind};

pub use local::LocalBackend;
pub use streaming::StreamingBackend;

/// Host capabilities backends are built from.
#[derive(Clone, Default)]
pub(crate) struct Bridges {
    pub stream_engine: Option<Arc<dyn StreamEngine>>,
    pub local_decoder: Option<Arc<dyn LocalDecoder>>,
    pub source_normalizer: Option<Arc<dyn SourceNormalizer>>,
    pub asset_resolver: Option<Arc<dyn AssetResolver>>,
}

impl Bridges {
    pub fn from_config(config: &PlayerConfig) -> Self {
        Self {
            stream_engine: config.stream_engine.clone(),
            local_decoder: config.local_decoder.clone(),
            source_normalizer: config.source_normalizer.clone(),
            asset_resolver: config.asset_resolver.clone(),
        }
    }
}

/// One playback resource owned by the worker.
pub(crate) trait Backend: Send {
    fn kind(&self) -> SourceKind;

    /// Open the item's media. May block (local sources are normalized
    /// first), so the worker calls it with its lock released. Success means
    /// preparation has started, not finished.
    fn prepare(&mut self, item: &Item) -> Result<()>;

    fn session(&self) -> &SessionSlot;

    fn session_mut(&mut self) -> &mut SessionSlot;

    fn session_id(&self) -> MediaSessionId {
        self.session().id()
    }

    fn pause(&mut self) {
        self.session_mut().pause();
    }

    /// Start or continue output. `Err(NotReady)` until prepared.
    fn resume(&mut self) -> Result<()> {
        self.session_mut().resume()
    }

    /// Release the session. The backend is unusable afterwards.
    fn stop(&mut self) {
        self.session_mut().release();
    }

    fn seek(&mut self, position: Duration) {
        self.session_mut().seek(position);
    }

    fn position(&self) -> Option<Duration> {
        self.session().position()
    }
}

/// Instantiate the backend for `kind`.
///
/// `events` is the worker's signal handle for this prepare cycle.
pub(crate) fn select(
    kind: SourceKind,
    bridges: &Bridges,
    events: Arc<dyn MediaEvents>,
) -> Result<Box<dyn Backend>> {
    match kind {
        SourceKind::Remote | SourceKind::IntroAsset => {
            let engine = bridges
                .stream_engine
                .clone()
                .ok_or(PlaybackError::EngineUnavailable(kind))?;
            Ok(Box::new(StreamingBackend::new(
                kind,
                engine,
                bridges.asset_resolver.clone(),
                events,
            )))
        }
        SourceKind::Local => {
            let decoder = bridges
                .local_decoder
                .clone()
                .ok_or(PlaybackError::EngineUnavailable(kind))?;
            let normalizer = bridges
                .source_normalizer
                .clone()
                .ok_or(PlaybackError::EngineUnavailable(kind))?;
            Ok(Box::new(LocalBackend::new(decoder, normalizer, events)))
        }
    }
}

// ============================================================================
// Session slot
// ============================================================================

/// The (at most one) host session of a backend plus its readiness flag.
pub(crate) struct SessionSlot {
    id: MediaSessionId,
    session: Option<Box<dyn MediaSession>>,
    ready: Arc<AtomicBool>,
    events: Arc<dyn MediaEvents>,
}

impl SessionSlot {
    pub fn new(worker_events: Arc<dyn MediaEvents>) -> Self {
        let ready = Arc::new(AtomicBool::new(false));
        let events = Arc::new(ReadinessSink {
            ready: Arc::clone(&ready),
            worker: worker_events,
        });
        Self {
            id: MediaSessionId::new(),
            session: None,
            ready,
            events,
        }
    }

    pub fn id(&self) -> MediaSessionId {
        self.id
    }

    /// Sink to hand to the host engine when opening the session.
    pub fn events(&self) -> Arc<dyn MediaEvents> {
        Arc::clone(&self.events)
    }

    pub fn attach(&mut self, session: Box<dyn MediaSession>) {
        self.session = Some(session);
    }

    pub fn is_ready(&self) -> bool {
        self.session.is_some() && self.ready.load(Ordering::Acquire)
    }

    fn pause(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if let Err(err) = session.pause() {
                warn!(session = %self.id, error = %err, "Pause failed");
            }
        }
    }

    fn resume(&mut self) -> Result<()> {
        if !self.is_ready() {
            return Err(PlaybackError::NotReady);
        }
        match self.session.as_mut() {
            Some(session) => session.start().map_err(PlaybackError::from),
            None => Err(PlaybackError::NotReady),
        }
    }

    fn seek(&mut self, position: Duration) {
        if !self.is_ready() {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            if let Err(err) = session.seek(position) {
                warn!(session = %self.id, error = %err, "Seek failed");
            }
        }
    }

    fn position(&self) -> Option<Duration> {
        if !self.is_ready() {
            return None;
        }
        self.session.as_ref().and_then(|session| session.position())
    }

    fn release(&mut self) {
        self.ready.store(false, Ordering::Release);
        if let Some(mut session) = self.session.take() {
            session.release();
        }
    }
}

impl Drop for SessionSlot {
    fn drop(&mut self) {
        self.release();
    }
}

/// Marks the slot ready before forwarding `on_prepared` to the worker, so
/// a resume triggered by that signal always finds the session startable.
struct ReadinessSink {
    ready: Arc<AtomicBool>,
    worker: Arc<dyn MediaEvents>,
}

impl MediaEvents for ReadinessSink {
    fn on_prepared(&self) {
        self.ready.store(true, Ordering::Release);
        self.worker.on_prepared();
    }

    fn on_error(&self, message: String) {
        self.worker.on_error(message);
    }

    fn on_completed(&self) {
        self.worker.on_completed();
    }

    fn on_buffering(&self, stalled: bool) {
        self.worker.on_buffering(stalled);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use mockall::mock;

    mock! {
        pub Events {}
        impl MediaEvents for Events {
            fn on_prepared(&self);
            fn on_error(&self, message: String);
            fn on_completed(&self);
            fn on_buffering(&self, stalled: bool);
        }
    }

    mock! {
        pub Session {}
        impl MediaSession for Session {
            fn start(&mut self) -> BridgeResult<()>;
            fn pause(&mut self) -> BridgeResult<()>;
            fn seek(&mut self, position: Duration) -> BridgeResult<()>;
            fn position(&self) -> Option<Duration>;
            fn release(&mut self);
        }
    }

    /// Session expecting to be released exactly once.
    pub fn releasable_session() -> MockSession {
        let mut session = MockSession::new();
        session.expect_release().times(1).return_const(());
        session
    }

    /// Events sink that ignores everything.
    pub fn quiet_events() -> Arc<dyn MediaEvents> {
        let mut events = MockEvents::new();
        events.expect_on_prepared().return_const(());
        events.expect_on_error().return_const(());
        events.expect_on_completed().return_const(());
        events.expect_on_buffering().return_const(());
        Arc::new(events)
    }
}
