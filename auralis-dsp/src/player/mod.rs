//! Gapless playback engine (§3.4, §4.7): state machine, queue, prebuffer
//! thread and the player itself.

pub mod engine;
pub mod notifier;
pub mod prebuffer;
pub mod queue;
pub mod state;

pub use engine::GaplessPlayer;
pub use prebuffer::{Prebuffer, PrebufferedTrack, TrackLoader};
pub use queue::Queue;
pub use state::{PlaybackState, StateEvent};
