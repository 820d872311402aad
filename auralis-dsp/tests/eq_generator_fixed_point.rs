//! End-to-end scenario 2: a fixed fingerprint maps to deterministic,
//! closed-form parameter output through the full coordinate reduction →
//! preference bias → parameter generation path.

use auralis_dsp::fingerprint::HarmonicAnalysisMethod;
use auralis_dsp::params::{generate, preference_for_preset, ProcessingCoordinates, PreferenceVector};
use auralis_dsp::types::PresetId;
use auralis_dsp::Fingerprint;

fn fingerprint(bass_pct: f32, air_pct: f32, crest_db: f32, lufs: f32) -> Fingerprint {
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
fn adaptive_preset_reaches_the_literal_fixed_point() {
    let fp = fingerprint(40.0, 12.0, 14.0, -14.0);
    let coords = ProcessingCoordinates::from_fingerprint(fp);
    let preference = preference_for_preset(PresetId::Adaptive);
    let params = generate(&coords, &preference);

    // dynamic_range = 0.5*clamp((14-8)/12) + 0.3*0.2 + 0.2*clamp(1.0/5) = 0.35,
    // energy_level = clamp((-14+30)/20) = 0.8 (Adaptive's preference vector is
    // neutral, so the biased coordinates equal these raw ones):
    // target_lufs = -16 + 6*0.8 - 2*0.35 = -11.9
    // peak_target_db = -1 + (-0.5)*0.35 = -1.175
    assert!((params.target_lufs - (-11.9)).abs() < 0.1, "target_lufs={}", params.target_lufs);
    assert!((params.peak_target_db - (-1.175)).abs() < 0.1, "peak_target_db={}", params.peak_target_db);
    assert_eq!(params.eq_curve.low_shelf_db, 0.0, "no bass deficit: bass_pct above the 25 anchor");
    assert_eq!(params.eq_curve.high_shelf_db, 0.0, "no air deficit: air_pct above the 12 anchor");
    assert!((params.eq_blend - 0.583).abs() < 0.01, "eq_blend={}", params.eq_blend);
}

#[test]
fn fixed_point_is_reproduced_with_a_bare_preference_vector() {
    let fp = fingerprint(40.0, 12.0, 14.0, -14.0);
    let coords = ProcessingCoordinates::from_fingerprint(fp);
    let params = generate(&coords, &PreferenceVector::default());
    assert!((params.eq_blend - 0.583).abs() < 0.01);
}
