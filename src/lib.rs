//! Workspace facade crate.
//!
//! Re-exports the playback engine together with the host bridge contracts and
//! runtime plumbing it is configured with, so host applications can depend on
//! `boo-player` alone instead of wiring each workspace crate individually.

pub use bridge_traits;
pub use core_playback;
pub use core_runtime;

pub use bridge_traits::{PlaybackState, PlayerSnapshot};
pub use core_playback::{Item, PersistentPlaybackState, Player, SnapshotSubscription};
pub use core_runtime::config::{PlayerConfig, TimingConfig};
