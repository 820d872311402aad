//! Pure mapping from `(coordinates, preference)` to `ProcessingParameters`
//! (§4.2). Every value is a deterministic function of its inputs: calling
//! `generate` twice on the same arguments must produce bit-identical
//! output (§8 invariant 3).

use crate::dsp::eq::EqCurve;
use crate::params::coordinates::ProcessingCoordinates;
use crate::params::preference::{PreferenceVector, BIAS_K};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionParams {
    pub ratio: f32,
    pub threshold_db: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
    pub amount: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpansionParams {
    pub target_crest_increase_db: f32,
    pub amount: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterParams {
    pub ceiling_db: f32,
    pub lookahead_ms: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingParameters {
    pub target_lufs: f32,
    pub peak_target_db: f32,
    pub eq_curve: EqCurve,
    pub eq_blend: f32,
    pub compression: CompressionParams,
    pub expansion: ExpansionParams,
    pub limiter: LimiterParams,
    pub stereo_width_target: f32,
}

fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// Biased 3-D coordinates after applying the preference vector (§4.2 step 2).
struct BiasedCoords {
    spectral_balance: f32,
    dynamic_range: f32,
    energy_level: f32,
}

fn apply_preference(coords: &ProcessingCoordinates, pref: &PreferenceVector) -> BiasedCoords {
    let (k_spectral, k_dynamic, k_loudness) = BIAS_K;
    BiasedCoords {
        spectral_balance: clamp01(coords.spectral_balance + pref.spectral_bias * k_spectral),
        dynamic_range: clamp01(coords.dynamic_range + pref.dynamic_bias * k_dynamic),
        energy_level: clamp01(coords.energy_level + pref.loudness_bias * k_loudness),
    }
}

/// Step 3 of §4.2: compute `ProcessingParameters` from the biased
/// coordinates plus fingerprint-derived EQ deficits.
pub fn generate(
    coords: &ProcessingCoordinates,
    preference: &PreferenceVector,
) -> ProcessingParameters {
    let biased = apply_preference(coords, preference);
    let fp = &coords.fingerprint;

    let target_lufs = -16.0 + 6.0 * biased.energy_level - 2.0 * biased.dynamic_range;
    let peak_target_db = -1.0 + (-0.5) * biased.dynamic_range;

    let bass_deficit = (25.0 - fp.bass_pct).max(0.0) / 25.0;
    let air_deficit = (12.0 - fp.air_pct).max(0.0) / 12.0;
    let eq_curve = EqCurve {
        low_shelf_db: 3.0 * bass_deficit,
        low_mid_db: 0.0,
        mid_db: 0.0,
        high_mid_db: 0.0,
        high_shelf_db: 3.0 * air_deficit,
    };

    let bass_imbalance = (fp.bass_pct - 30.0).abs() / 30.0;
    let air_imbalance = (fp.air_pct - 12.0).abs() / 12.0;
    let imbalance = (bass_imbalance + air_imbalance) / 2.0;
    let eq_blend = (0.5 + 0.5 * imbalance).clamp(0.0, 1.0);

    // Exactly one of compression/expansion is active per chunk.
    let (compression, expansion) = if biased.dynamic_range >= 0.4 {
        let compression = if biased.dynamic_range > 0.7 {
            CompressionParams { ratio: 1.5, threshold_db: -26.0, attack_ms: 10.0, release_ms: 100.0, amount: 0.3 }
        } else {
            CompressionParams { ratio: 1.8, threshold_db: -22.0, attack_ms: 10.0, release_ms: 100.0, amount: 0.5 }
        };
        (compression, ExpansionParams { target_crest_increase_db: 0.0, amount: 0.0 })
    } else {
        let expansion = if biased.dynamic_range < 0.3 {
            ExpansionParams { target_crest_increase_db: 4.0, amount: 1.0 }
        } else {
            ExpansionParams { target_crest_increase_db: 2.0, amount: 0.6 }
        };
        (
            CompressionParams { ratio: 1.0, threshold_db: 0.0, attack_ms: 10.0, release_ms: 100.0, amount: 0.0 },
            expansion,
        )
    };

    let stereo_width_target = if fp.stereo_width < 0.5 {
        0.7 + 0.1 * biased.spectral_balance
    } else if fp.stereo_width > 0.85 {
        0.75
    } else {
        fp.stereo_width
    };

    ProcessingParameters {
        target_lufs: target_lufs.clamp(-23.0, -10.0),
        peak_target_db: peak_target_db.clamp(-6.0, -0.2),
        eq_curve,
        eq_blend,
        compression,
        expansion,
        limiter: LimiterParams { ceiling_db: peak_target_db.clamp(-6.0, -0.2), lookahead_ms: 5.0 },
        stereo_width_target: stereo_width_target.clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::{Fingerprint, HarmonicAnalysisMethod};

    fn fp(bass_pct: f32, air_pct: f32, crest_db: f32, lufs: f32) -> Fingerprint {
        Fingerprint {
            sub_bass_pct: 5.0,
            bass_pct,
            low_mid_pct: 10.0,
            mid_pct: 30.0,
            upper_mid_pct: 15.0,
            presence_pct: 12.0,
            air_pct,
            lufs,
            crest_db,
            bass_mid_ratio: 0.0,
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
            dynamic_range_variation: 0.0,
            loudness_variation_std: 0.0,
            peak_consistency: 0.8,
            stereo_width: 0.3,
            phase_correlation: 0.9,
            harmonic_analysis_method: HarmonicAnalysisMethod::Full,
            sampling_interval_s: None,
            confidence: 1.0,
        }
    }

    #[test]
    fn determinism_bit_identical_output() {
        let coords = ProcessingCoordinates::from_fingerprint(fp(40.0, 12.0, 14.0, -14.0));
        let pref = PreferenceVector::default();
        let a = generate(&coords, &pref);
        let b = generate(&coords, &pref);
        assert_eq!(a, b);
    }

    #[test]
    fn no_bass_deficit_when_bass_above_anchor() {
        let coords = ProcessingCoordinates::from_fingerprint(fp(40.0, 12.0, 14.0, -14.0));
        let params = generate(&coords, &PreferenceVector::default());
        assert_eq!(params.eq_curve.low_shelf_db, 0.0);
        assert_eq!(params.eq_curve.high_shelf_db, 0.0);
    }

    #[test]
    fn bass_deficit_produces_positive_low_shelf_gain() {
        let coords = ProcessingCoordinates::from_fingerprint(fp(10.0, 12.0, 14.0, -14.0));
        let params = generate(&coords, &PreferenceVector::default());
        assert!(params.eq_curve.low_shelf_db > 0.0);
    }

    #[test]
    fn exactly_one_of_compression_expansion_active() {
        for (bass, air, crest, lufs) in [(40.0, 12.0, 6.0, -18.0), (40.0, 12.0, 20.0, -10.0)] {
            let coords = ProcessingCoordinates::from_fingerprint(fp(bass, air, crest, lufs));
            let params = generate(&coords, &PreferenceVector::default());
            let active = (params.compression.amount > 0.0) as u8 + (params.expansion.amount > 0.0) as u8;
            assert_eq!(active, 1, "dr params should have exactly one active stage");
        }
    }

    #[test]
    fn stereo_width_narrow_source_is_widened() {
        let coords = ProcessingCoordinates::from_fingerprint(fp(40.0, 12.0, 14.0, -14.0));
        let params = generate(&coords, &PreferenceVector::default());
        assert!(params.stereo_width_target > coords.fingerprint.stereo_width);
    }
}
