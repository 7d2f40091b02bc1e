//! # Decision Table
//!
//! Pure mapping from (current state, target state) to the one action the
//! worker performs next.
//!
//! Both states are normalized first: `Buffering` counts as `Playing` and
//! `Error` as `None`. The table then covers the five real states in both
//! dimensions. A current state of `Error` bypasses the table entirely; the
//! only way out of `Error` is a fresh `play()`.
//!
//! ```text
//!  current \ target  None     Preparing  Paused   Playing  Finished
//!  None              none     prepare    prepare  prepare  none
//!  Preparing         stop     none       none     resume   none
//!  Paused            stop     reset      none     resume   stop
//!  Playing           stop     reset      pause    none     stop
//!  Finished          stop     reset      pause    resume   none
//! ```
//!
//! `Preparing -> Playing` resolves to `resume`, which the backend refuses
//! until preparation completes; the worker treats that refusal as a retry.

use bridge_traits::PlaybackState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Next step for the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    None,
    Prepare,
    Resume,
    Stop,
    Pause,
    /// `stop` immediately followed by `prepare` of the same item.
    Reset,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::None => "none",
            Action::Prepare => "prepare",
            Action::Resume => "resume",
            Action::Stop => "stop",
            Action::Pause => "pause",
            Action::Reset => "reset",
        })
    }
}

use Action::{None as N, Pause as PA, Prepare as PR, Reset as RS, Resume as RE, Stop as ST};

const TABLE: [[Action; 5]; 5] = [
    // None   Preparing Paused Playing Finished
    [N, PR, PR, PR, N],  // None
    [ST, N, N, RE, N],   // Preparing
    [ST, RS, N, RE, ST], // Paused
    [ST, RS, PA, N, ST], // Playing
    [ST, RS, PA, RE, N], // Finished
];

/// Collapse pseudo-states onto the state they behave like.
pub fn normalize(state: PlaybackState) -> PlaybackState {
    match state {
        PlaybackState::Buffering => PlaybackState::Playing,
        PlaybackState::Error => PlaybackState::None,
        other => other,
    }
}

fn index(state: PlaybackState) -> usize {
    match normalize(state) {
        PlaybackState::None => 0,
        PlaybackState::Preparing => 1,
        PlaybackState::Paused => 2,
        PlaybackState::Playing => 3,
        PlaybackState::Finished => 4,
        // normalize() never yields these
        PlaybackState::Buffering | PlaybackState::Error => 0,
    }
}

/// Action that moves `current` towards `target`.
pub fn decide(current: PlaybackState, target: PlaybackState) -> Action {
    if current == PlaybackState::Error {
        return Action::None;
    }
    TABLE[index(current)][index(target)]
}
