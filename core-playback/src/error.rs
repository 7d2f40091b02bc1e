//! # Playback Error Types
//!
//! Failures the engine can run into while setting up or driving a backend.
//!
//! None of these ever reach a caller of a `Player` command. Inside the worker
//! they are logged and turned into the `Error` playback state; only player
//! construction returns them directly.

use bridge_traits::BridgeError;
use thiserror::Error;

use crate::item::SourceKind;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// Prepare was requested with no item loaded.
    #[error("No item loaded")]
    NoItem,

    /// The item's source could not be classified or is malformed.
    #[error("Item source is not playable: {0}")]
    UnplayableSource(String),

    /// Merging local recordings into a playable file failed.
    #[error("Failed to normalize local recordings: {0}")]
    Normalization(String),

    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// No host engine was configured for this kind of source.
    #[error("No engine configured for {0} sources")]
    EngineUnavailable(SourceKind),

    /// The host engine refused to open the source.
    #[error("Failed to open media session: {0}")]
    OpenFailed(String),

    /// The session has not finished preparing. Expected while racing a
    /// prepare; the worker retries.
    #[error("Media session not ready")]
    NotReady,

    /// A control call on an open session failed.
    #[error("Media session call failed: {0}")]
    SessionFailed(String),

    /// Reported asynchronously by the host engine.
    #[error("Engine reported failure: {0}")]
    EngineFailure(String),

    // ========================================================================
    // Runtime Errors
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    /// Spawning the worker, ticker or snapshot thread failed.
    #[error("Failed to spawn {name} thread: {source}")]
    ThreadSpawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl PlaybackError {
    /// Whether the worker should retry rather than give up.
    pub fn is_transient(&self) -> bool {
        matches!(self, PlaybackError::NotReady)
    }
}

impl From<BridgeError> for PlaybackError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::NotReady(_) => PlaybackError::NotReady,
            other => PlaybackError::SessionFailed(other.to_string()),
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
