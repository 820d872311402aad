//! Playback state machine (§3.4, §4.7): sum type rather than a
//! stringly-typed status field, per the design notes' preference.

use serde::Serialize;

use crate::types::PresetId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Stopped,
    Loading,
    Playing,
    Paused,
    Error,
}

impl PlaybackState {
    /// Valid transitions (§4.7): `STOPPED → LOADING → PLAYING ↔ PAUSED →
    /// STOPPED`, or `ERROR` from any state.
    pub fn can_transition_to(self, next: PlaybackState) -> bool {
        use PlaybackState::*;
        if next == Error {
            return true;
        }
        matches!(
            (self, next),
            (Stopped, Loading)
                | (Loading, Playing)
                | (Loading, Error)
                | (Playing, Paused)
                | (Paused, Playing)
                | (Playing, Stopped)
                | (Paused, Stopped)
                | (Playing, Loading)
                | (Error, Stopped)
        )
    }
}

/// Emitted on every state transition and at least every 250ms while
/// playing (§6.2).
#[derive(Debug, Clone, Serialize)]
pub struct StateEvent {
    pub state: PlaybackState,
    pub position_samples: u64,
    pub duration_samples: u64,
    pub current_track_id: Option<i64>,
    pub preset: Option<PresetId>,
    pub timestamp_ms: u64,
}
