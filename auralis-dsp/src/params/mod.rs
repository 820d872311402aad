//! Coordinate reduction, user preference bias, and the deterministic
//! parameter generator (§3.2, §4.2).

pub mod coordinates;
pub mod generator;
pub mod preference;

pub use coordinates::ProcessingCoordinates;
pub use generator::{generate, CompressionParams, ExpansionParams, LimiterParams, ProcessingParameters};
pub use preference::{preference_for_preset, PreferenceVector, PRESET_TABLE};
