//! The 25-dimensional acoustic fingerprint: a fixed struct with named
//! fields, never a duck-typed map, persisted as a versioned record.

mod analyzer;
mod dynamics;
mod frequency;
mod harmonic;
mod spectral;
mod stereo;
mod temporal;
mod variation;

pub use analyzer::analyze;

use serde::{Deserialize, Serialize};

pub const FINGERPRINT_VERSION: &str = "1.0";
pub const FINGERPRINT_DIMENSIONS: usize = 25;

/// How the harmonic group (HPSS/YIN/chroma) was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HarmonicAnalysisMethod {
    Full,
    Sampled,
}

/// The ordered 25-tuple of finite `f32` values, partitioned into seven
/// groups exactly as described by the acoustic data model. Immutable once
/// computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    // Frequency group (7) — percentages, sum ≈ 100 ± 1.
    pub sub_bass_pct: f32,
    pub bass_pct: f32,
    pub low_mid_pct: f32,
    pub mid_pct: f32,
    pub upper_mid_pct: f32,
    pub presence_pct: f32,
    pub air_pct: f32,

    // Dynamics (2)
    pub lufs: f32,
    pub crest_db: f32,

    // Frequency relation (1)
    pub bass_mid_ratio: f32,

    // Temporal (4)
    pub tempo_bpm: f32,
    pub rhythm_stability: f32,
    pub transient_density: f32,
    pub silence_ratio: f32,

    // Spectral (3)
    pub spectral_centroid: f32,
    pub spectral_rolloff: f32,
    pub spectral_flatness: f32,

    // Harmonic (3)
    pub harmonic_ratio: f32,
    pub pitch_stability: f32,
    pub chroma_energy: f32,

    // Variation (3)
    pub dynamic_range_variation: f32,
    pub loudness_variation_std: f32,
    pub peak_consistency: f32,

    // Stereo (2)
    pub stereo_width: f32,
    pub phase_correlation: f32,

    pub harmonic_analysis_method: HarmonicAnalysisMethod,
    pub sampling_interval_s: Option<f32>,

    /// Side channel, not a fingerprint dimension: reduced to 0.5 when
    /// HPSS/YIN diverged and the harmonic group was zeroed.
    pub confidence: f32,
}

impl Fingerprint {
    /// All 25 dimension values, in the declared order, for persistence and
    /// `to_dict()`-style iteration.
    pub fn dimensions(&self) -> [f32; FINGERPRINT_DIMENSIONS] {
        [
            self.sub_bass_pct,
            self.bass_pct,
            self.low_mid_pct,
            self.mid_pct,
            self.upper_mid_pct,
            self.presence_pct,
            self.air_pct,
            self.lufs,
            self.crest_db,
            self.bass_mid_ratio,
            self.tempo_bpm,
            self.rhythm_stability,
            self.transient_density,
            self.silence_ratio,
            self.spectral_centroid,
            self.spectral_rolloff,
            self.spectral_flatness,
            self.harmonic_ratio,
            self.pitch_stability,
            self.chroma_energy,
            self.dynamic_range_variation,
            self.loudness_variation_std,
            self.peak_consistency,
            self.stereo_width,
            self.phase_correlation,
        ]
    }

    /// Invariant 1 + 2 of §8: frequency percentages sum to 100±1 and every
    /// field is finite.
    pub fn is_valid(&self) -> bool {
        let all_finite = self.dimensions().iter().all(|v| v.is_finite());
        let freq_sum = self.sub_bass_pct
            + self.bass_pct
            + self.low_mid_pct
            + self.mid_pct
            + self.upper_mid_pct
            + self.presence_pct
            + self.air_pct;
        all_finite && (freq_sum - 100.0).abs() <= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Fingerprint {
        Fingerprint {
            sub_bass_pct: 10.0,
            bass_pct: 20.0,
            low_mid_pct: 15.0,
            mid_pct: 20.0,
            upper_mid_pct: 15.0,
            presence_pct: 12.0,
            air_pct: 8.0,
            lufs: -14.0,
            crest_db: 12.0,
            bass_mid_ratio: 1.0,
            tempo_bpm: 120.0,
            rhythm_stability: 0.8,
            transient_density: 0.4,
            silence_ratio: 0.05,
            spectral_centroid: 0.4,
            spectral_rolloff: 0.6,
            spectral_flatness: 0.3,
            harmonic_ratio: 0.7,
            pitch_stability: 0.6,
            chroma_energy: 0.5,
            dynamic_range_variation: 0.2,
            loudness_variation_std: 1.0,
            peak_consistency: 0.8,
            stereo_width: 0.3,
            phase_correlation: 0.9,
            harmonic_analysis_method: HarmonicAnalysisMethod::Full,
            sampling_interval_s: None,
            confidence: 1.0,
        }
    }

    #[test]
    fn dimensions_has_25_entries() {
        assert_eq!(sample().dimensions().len(), FINGERPRINT_DIMENSIONS);
    }

    #[test]
    fn valid_fingerprint_passes() {
        assert!(sample().is_valid());
    }

    #[test]
    fn frequency_sum_outside_tolerance_is_invalid() {
        let mut fp = sample();
        fp.air_pct += 10.0;
        assert!(!fp.is_valid());
    }

    #[test]
    fn non_finite_field_is_invalid() {
        let mut fp = sample();
        fp.lufs = f32::NAN;
        assert!(!fp.is_valid());
    }
}
