//! # Playback Engine
//!
//! A single-worker state machine driving host audio engines.
//!
//! ## Overview
//!
//! This crate handles:
//! - Item description and source classification (intro asset, local, remote)
//! - The decision table mapping (state, target) to the next action
//! - Backends wrapping the host [`StreamEngine`] and [`LocalDecoder`]
//! - The worker loop, backend signals and the progress ticker
//! - The [`Player`] facade, pushed snapshots and persistable playback state
//!
//! Commands never block on the host. They record a target state and wake
//! the worker, which converges towards it one action at a time.
//!
//! [`StreamEngine`]: bridge_traits::StreamEngine
//! [`LocalDecoder`]: bridge_traits::LocalDecoder

mod backend;
pub mod decision;
pub mod error;
pub mod item;
mod player;
mod signals;
mod snapshot;
mod ticker;
mod worker;

pub use bridge_traits::{PlaybackState, PlayerSnapshot};
pub use decision::{decide, normalize, Action};
pub use error::{PlaybackError, Result};
pub use item::{
    DefaultClassifier, Item, ItemSource, Recording, SourceClassifier, SourceKind, INTRO_ASSET,
};
pub use player::Player;
pub use snapshot::{PersistentPlaybackState, SnapshotSubscription};
pub use worker::EngineDiagnostics;
