//! Thin wrapper over the core analyzer: all 25-D feature extraction
//! lives in `auralis-dsp`; this module only adapts decoded audio into
//! the core's `analyze` contract and maps its errors onto the HTTP
//! surface.

use auralis_dsp::types::FingerStrategy;
use auralis_dsp::{Fingerprint, StereoSamples};

use crate::error::{FingerprintError, Result};

pub fn analyze_fingerprint(samples: &StereoSamples, strategy: FingerStrategy) -> Result<Fingerprint> {
    tracing::debug!(frames = samples.frame_count(), sample_rate = samples.sample_rate, "running fingerprint analysis");

    auralis_dsp::fingerprint::analyze(samples, strategy).map_err(FingerprintError::from)
}
