//! Playback bridge traits and supporting types.
//!
//! The playback engine never decodes audio itself. It drives host media
//! engines through the capabilities below and observes them through the
//! [`MediaEvents`] callbacks they raise from their own threads.
//!
//! ## Threading contract
//!
//! - Control calls on a [`MediaSession`] are made by the engine's worker
//!   thread, one at a time.
//! - [`MediaEvents`] callbacks may arrive on any thread, at any time, and
//!   more than once. They must never be raised synchronously from inside a
//!   `MediaSession` call or from inside [`StreamEngine::open_stream`] /
//!   [`LocalDecoder::open_file`]; raise them from the engine's own callback
//!   context instead.
//! - [`SourceNormalizer::normalize`] is allowed to block for a long time. The
//!   engine calls it with its state lock released.

use crate::{
    error::Result,
    platform::{PlatformSend, PlatformSendSync},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Playback lifecycle state as observed by hosts.
///
/// `Buffering` is a transient flavour of `Playing` and `Error` is absorbing
/// until a new item is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    #[default]
    None,
    Preparing,
    Paused,
    Playing,
    Finished,
    Buffering,
    Error,
}

impl PlaybackState {
    /// Stable numeric code, used by hosts that persist or marshal the state
    /// as an integer.
    pub fn code(&self) -> u8 {
        match self {
            PlaybackState::None => 0,
            PlaybackState::Preparing => 1,
            PlaybackState::Paused => 2,
            PlaybackState::Playing => 3,
            PlaybackState::Finished => 4,
            PlaybackState::Buffering => 5,
            PlaybackState::Error => 6,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => PlaybackState::None,
            1 => PlaybackState::Preparing,
            2 => PlaybackState::Paused,
            3 => PlaybackState::Playing,
            4 => PlaybackState::Finished,
            5 => PlaybackState::Buffering,
            6 => PlaybackState::Error,
            _ => return None,
        })
    }

    /// `Playing` or `Buffering`.
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Buffering)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::None => "none",
            PlaybackState::Preparing => "preparing",
            PlaybackState::Paused => "paused",
            PlaybackState::Playing => "playing",
            PlaybackState::Finished => "finished",
            PlaybackState::Buffering => "buffering",
            PlaybackState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Consistent point-in-time copy of the player's observable state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub state: PlaybackState,
    /// Seconds played so far.
    pub progress_secs: f64,
    /// Total duration of the current item in seconds, `0.0` if unknown.
    pub total_secs: f64,
    /// Identifier of the current item, `None` when nothing is loaded or the
    /// item has never been published.
    pub item_id: Option<i64>,
    pub title: Option<String>,
    pub author: Option<String>,
    /// The item's audio lives on the device.
    pub is_local: bool,
    /// The item is a direct message rather than a public recording.
    pub is_message: bool,
}

/// Identifier of one media session created for one prepare cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaSessionId(Uuid);

impl MediaSessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MediaSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MediaSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Asynchronous notifications raised by a host media engine.
///
/// The engine hands one sink to every session it opens. Sinks belonging to a
/// torn-down session silently ignore further calls, so hosts may keep
/// firing after `release` without harm.
pub trait MediaEvents: PlatformSendSync {
    /// Preparation finished; the session now accepts `start`.
    fn on_prepared(&self);

    /// Unrecoverable failure (decode error, dropped stream, ...).
    fn on_error(&self, message: String);

    /// Playback reached the end of the media.
    fn on_completed(&self);

    /// The session stalled waiting for data (`true`) or recovered (`false`).
    fn on_buffering(&self, stalled: bool);
}

/// A single opened media resource inside a host engine.
///
/// Every method must tolerate being called in any state, including after
/// [`release`](MediaSession::release).
pub trait MediaSession: PlatformSend {
    /// Start or resume output. Fails with
    /// [`BridgeError::NotReady`](crate::BridgeError::NotReady) before the
    /// session has been prepared.
    fn start(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    /// Seek to an absolute position.
    fn seek(&mut self, position: Duration) -> Result<()>;

    /// Current playback position, `None` if the engine cannot tell.
    fn position(&self) -> Option<Duration>;

    /// Release every native resource held by the session.
    fn release(&mut self);
}

/// Host engine able to play remote (HTTP) streams and bundled assets.
///
/// `open_stream` must return quickly: it only kicks off preparation, whose
/// outcome is reported through `events`.
pub trait StreamEngine: PlatformSendSync {
    fn open_stream(
        &self,
        locator: &str,
        events: Arc<dyn MediaEvents>,
    ) -> Result<Box<dyn MediaSession>>;
}

/// Host decoder for audio files stored on the device.
pub trait LocalDecoder: PlatformSendSync {
    fn open_file(&self, path: &Path, events: Arc<dyn MediaEvents>)
        -> Result<Box<dyn MediaSession>>;
}

/// Merges an ordered list of local recordings into one playable file.
///
/// This is expected to be slow (it re-encodes audio) and is called from the
/// engine's worker thread with no locks held.
pub trait SourceNormalizer: PlatformSendSync {
    /// Returns the path of the merged file.
    fn normalize(&self, recordings: &[PathBuf]) -> Result<PathBuf>;
}

/// Maps the name of an asset bundled with the host application to a locator
/// the [`StreamEngine`] can open.
pub trait AssetResolver: PlatformSendSync {
    fn resolve(&self, name: &str) -> Result<String>;
}

/// Receives the progress ticker's cadence.
///
/// Called off-lock from the ticker thread with `active == true` on every tick
/// while playing, and once with `active == false` whenever the ticker stops.
pub trait ProgressListener: PlatformSendSync {
    fn on_progress(&self, active: bool);
}
