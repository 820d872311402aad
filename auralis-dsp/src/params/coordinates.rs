//! Three-dimensional reduction of a fingerprint used by the parameter
//! generator (§3.2).

use crate::fingerprint::Fingerprint;

#[derive(Debug, Clone)]
pub struct ProcessingCoordinates {
    pub spectral_balance: f32,
    pub dynamic_range: f32,
    pub energy_level: f32,
    pub fingerprint: Fingerprint,
}

fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

impl ProcessingCoordinates {
    /// Exact weighted-sum formulas from §4.2 step 1.
    pub fn from_fingerprint(fp: Fingerprint) -> Self {
        let spectral_balance = 0.3 * (1.0 - fp.bass_pct / 100.0)
            + 0.3 * (fp.air_pct / 100.0)
            + 0.2 * fp.spectral_centroid
            + 0.2 * (fp.presence_pct / 100.0);

        let dynamic_range = 0.5 * clamp01((fp.crest_db - 8.0) / 12.0)
            + 0.3 * fp.dynamic_range_variation
            + 0.2 * clamp01(fp.loudness_variation_std / 5.0);

        let energy_level = clamp01((fp.lufs + 30.0) / 20.0);

        Self {
            spectral_balance: clamp01(spectral_balance),
            dynamic_range: clamp01(dynamic_range),
            energy_level,
            fingerprint: fp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::HarmonicAnalysisMethod;

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
    fn dynamic_range_and_energy_level_match_weighted_formula() {
        let coords = ProcessingCoordinates::from_fingerprint(fp(40.0, 12.0, 14.0, -14.0));
        // crest=14 -> 0.5*clamp((14-8)/12)=0.25; dr_variation=0.2 -> 0.3*0.2=0.06;
        // loudness_variation_std=1.0 -> 0.2*clamp(1.0/5)=0.04; sum=0.35.
        assert!((coords.dynamic_range - 0.35).abs() < 1e-4);
        // energy_level = clamp((lufs+30)/20) = clamp((-14+30)/20) = 0.8.
        assert!((coords.energy_level - 0.8).abs() < 1e-4);
    }

    #[test]
    fn coordinates_are_clamped_to_unit_interval() {
        let coords = ProcessingCoordinates::from_fingerprint(fp(0.0, 100.0, 30.0, 10.0));
        assert!(coords.spectral_balance <= 1.0);
        assert!(coords.dynamic_range <= 1.0);
        assert!(coords.energy_level <= 1.0);
    }
}
