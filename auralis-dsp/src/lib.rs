//! Auralis DSP core: 25-dimensional acoustic fingerprinting, a
//! deterministic parameter generator, the 6-stage mastering chain, a
//! context-padded chunk pipeline with equal-power crossfades, a
//! multi-tier predictive cache, a gapless player and the `.25d` sidecar
//! format that persists fingerprints and processing analysis.
//!
//! Decoding compressed audio, library scanning, the HTTP/UI surface and
//! relational persistence beyond sidecars are all host responsibilities;
//! this crate treats audio as already-decoded interleaved `f32` PCM at a
//! known sample rate.

pub mod cache;
pub mod chunk;
pub mod config;
pub mod degradation;
pub mod dsp;
pub mod error;
pub mod fingerprint;
pub mod params;
pub mod player;
pub mod sidecar;
pub mod types;

pub use cache::{CacheKey, CacheManager, CacheMetrics};
pub use config::CoreConfig;
pub use degradation::{DegradationLevel, DegradationMonitor, DegradationState};
pub use error::{CoreError, Result};
pub use fingerprint::{analyze, Fingerprint, FINGERPRINT_DIMENSIONS, FINGERPRINT_VERSION};
pub use params::{generate, PreferenceVector, ProcessingCoordinates, ProcessingParameters};
pub use player::{GaplessPlayer, PlaybackState};
pub use sidecar::Sidecar;
pub use types::{IntensityBucket, PresetId, StereoSamples, TrackRef};
