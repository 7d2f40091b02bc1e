//! # Host Bridge Traits
//!
//! Capabilities the playback engine requires from the host application.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback core and the
//! platform it runs on. The core owns the state machine; everything that
//! touches real audio hardware, codecs, the file system layout or the app
//! bundle is reached through one of the traits below.
//!
//! ## Traits
//!
//! ### Media engines
//! - [`StreamEngine`](playback::StreamEngine) - Remote streams and bundled assets
//! - [`LocalDecoder`](playback::LocalDecoder) - Files recorded on the device
//! - [`MediaSession`](playback::MediaSession) - One opened media resource
//! - [`MediaEvents`](playback::MediaEvents) - Engine-to-core notifications
//!
//! ### Sources
//! - [`SourceNormalizer`](playback::SourceNormalizer) - Merge local recordings into one file
//! - [`AssetResolver`](playback::AssetResolver) - Locate assets bundled with the app
//!
//! ### Observation
//! - [`ProgressListener`](playback::ProgressListener) - Ticker cadence for "now playing" UI
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing:
//!
//! ```ignore
//! use core_runtime::config::PlayerConfig;
//!
//! // Neither a stream engine nor a local decoder: build() returns
//! // Error::CapabilityMissing { capability: "StreamEngine", .. }
//! let err = PlayerConfig::builder().build().unwrap_err();
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Platform implementations should convert native failures into it with an
//! actionable message; the core logs the message and moves the player into
//! its `Error` state.
//!
//! ## Thread Safety
//!
//! Shared capabilities require `Send + Sync` and sessions require `Send`
//! (see [`platform`]). The engine calls them from its worker thread.
//!
//! ## Examples
//!
//! ### Implementing StreamEngine
//!
//! ```ignore
//! use bridge_traits::playback::{MediaEvents, MediaSession, StreamEngine};
//! use bridge_traits::error::Result;
//! use std::sync::Arc;
//!
//! pub struct ExoStreamEngine { /* native handle */ }
//!
//! impl StreamEngine for ExoStreamEngine {
//!     fn open_stream(
//!         &self,
//!         locator: &str,
//!         events: Arc<dyn MediaEvents>,
//!     ) -> Result<Box<dyn MediaSession>> {
//!         // Start async preparation; call events.on_prepared() later from
//!         // the engine's own callback thread.
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod platform;
pub mod playback;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use playback::{
    AssetResolver, LocalDecoder, MediaEvents, MediaSession, MediaSessionId, PlaybackState,
    PlayerSnapshot, ProgressListener, SourceNormalizer, StreamEngine,
};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
