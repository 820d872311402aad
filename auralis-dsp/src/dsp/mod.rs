//! DSP building blocks: envelope following, dynamics, filtering, and the
//! harmonic/tempo/onset analysis primitives shared with the fingerprint
//! analyzer. `chain` assembles the per-chunk 6-stage mastering chain
//! described in §4.3.

pub mod biquad;
pub mod chain;
pub mod chroma;
pub mod compressor;
pub mod envelope;
pub mod eq;
pub mod hpss;
pub mod limiter;
pub mod onset;
pub mod tempo;
pub mod yin;

pub use chain::{process_chunk, DspChainState};
pub use compressor::{CompressionInfo, Compressor, CompressorConfig, DetectionMode};
pub use envelope::{EnvelopeConfig, EnvelopeFollower};
pub use eq::{EqCurve, PsychoacousticEq};
pub use limiter::{Limiter, LimiterConfig, LimitingInfo};
