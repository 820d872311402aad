//! Orchestrates the seven per-group analyzers into one [`Fingerprint`]
//! (§4.1). Frequency, dynamics, spectral, stereo and variation always run
//! on the full track; the harmonic group alone is eligible for the
//! sampled acceleration strategy.

use crate::error::{CoreError, Result};
use crate::types::{is_supported_sample_rate, FingerStrategy, StereoSamples};

use super::dynamics::analyze_dynamics;
use super::frequency::analyze_frequency;
use super::harmonic::analyze_harmonic;
use super::spectral::analyze_spectral;
use super::stereo::analyze_stereo;
use super::temporal::analyze_temporal;
use super::variation::analyze_variation;
use super::{Fingerprint, HarmonicAnalysisMethod};

const MIN_DURATION_S: f32 = 5.0;
const HARMONIC_CHUNK_S: f32 = 5.0;

fn to_mono_f64(left: &[f32], right: &[f32]) -> Vec<f64> {
    left.iter()
        .zip(right.iter())
        .map(|(&l, &r)| ((l + r) * 0.5) as f64)
        .collect()
}

fn to_mono_f32(left: &[f32], right: &[f32]) -> Vec<f32> {
    left.iter().zip(right.iter()).map(|(&l, &r)| (l + r) * 0.5).collect()
}

/// Average the harmonic group across 5-s windows taken every
/// `interval_s`, rather than analyzing the whole track.
fn sampled_harmonic(mono: &[f64], sample_rate: u32, interval_s: f32) -> (f32, f32, f32, bool) {
    let window_len = (sample_rate as f32 * HARMONIC_CHUNK_S) as usize;
    let stride = (sample_rate as f32 * interval_s).max(window_len as f32) as usize;

    let mut ratio_sum = 0f32;
    let mut stability_sum = 0f32;
    let mut energy_sum = 0f32;
    let mut degraded_any = false;
    let mut n = 0usize;

    let mut start = 0;
    while start + window_len <= mono.len() {
        let window = &mono[start..start + window_len];
        let features = analyze_harmonic(window, sample_rate, HarmonicAnalysisMethod::Sampled);
        ratio_sum += features.harmonic_ratio;
        stability_sum += features.pitch_stability;
        energy_sum += features.chroma_energy;
        degraded_any |= features.degraded;
        n += 1;
        start += stride;
    }

    if n == 0 {
        return (0.0, 0.0, 0.0, true);
    }
    (ratio_sum / n as f32, stability_sum / n as f32, energy_sum / n as f32, degraded_any)
}

/// Compute the full 25-dimensional fingerprint for a decoded stereo
/// track. `strategy` controls whether the harmonic group runs on the
/// full track or on periodic samples (§4.1 acceleration).
pub fn analyze(audio: &StereoSamples, strategy: FingerStrategy) -> Result<Fingerprint> {
    if !is_supported_sample_rate(audio.sample_rate) {
        return Err(CoreError::InvalidSampleRate(audio.sample_rate));
    }

    let duration_s = audio.duration_s();
    if duration_s < MIN_DURATION_S {
        return Err(CoreError::ShortAudio { duration_s });
    }

    let (left, right) = audio.split_channels();
    let mono_f64 = to_mono_f64(&left, &right);
    let mono_f32 = to_mono_f32(&left, &right);

    let frequency = analyze_frequency(&mono_f32, audio.sample_rate);
    let dynamics = analyze_dynamics(&left, &right, audio.sample_rate);
    let temporal = analyze_temporal(&mono_f64, audio.sample_rate);
    let spectral = analyze_spectral(&mono_f64, audio.sample_rate);
    let stereo = analyze_stereo(&left, &right);
    let variation = analyze_variation(&left, &right, audio.sample_rate);

    let (harmonic_ratio, pitch_stability, chroma_energy, degraded, method, sampling_interval_s) = match strategy {
        FingerStrategy::Full => {
            let h = analyze_harmonic(&mono_f64, audio.sample_rate, HarmonicAnalysisMethod::Full);
            (h.harmonic_ratio, h.pitch_stability, h.chroma_energy, h.degraded, HarmonicAnalysisMethod::Full, None)
        }
        FingerStrategy::Sampled { interval_s } => {
            let (ratio, stability, energy, degraded) = sampled_harmonic(&mono_f64, audio.sample_rate, interval_s);
            (ratio, stability, energy, degraded, HarmonicAnalysisMethod::Sampled, Some(interval_s))
        }
    };

    let confidence = if degraded { 0.5 } else { 1.0 };

    let fingerprint = Fingerprint {
        sub_bass_pct: frequency.sub_bass_pct,
        bass_pct: frequency.bass_pct,
        low_mid_pct: frequency.low_mid_pct,
        mid_pct: frequency.mid_pct,
        upper_mid_pct: frequency.upper_mid_pct,
        presence_pct: frequency.presence_pct,
        air_pct: frequency.air_pct,
        lufs: dynamics.lufs,
        crest_db: dynamics.crest_db,
        bass_mid_ratio: frequency.bass_mid_ratio,
        tempo_bpm: temporal.tempo_bpm,
        rhythm_stability: temporal.rhythm_stability,
        transient_density: temporal.transient_density,
        silence_ratio: temporal.silence_ratio,
        spectral_centroid: spectral.spectral_centroid,
        spectral_rolloff: spectral.spectral_rolloff,
        spectral_flatness: spectral.spectral_flatness,
        harmonic_ratio,
        pitch_stability,
        chroma_energy,
        dynamic_range_variation: variation.dynamic_range_variation,
        loudness_variation_std: variation.loudness_variation_std,
        peak_consistency: variation.peak_consistency,
        stereo_width: stereo.stereo_width,
        phase_correlation: stereo.phase_correlation,
        harmonic_analysis_method: method,
        sampling_interval_s,
        confidence,
    };

    Ok(fingerprint)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_samples(freq: f32, sr: u32, seconds: f32, amp: f32) -> StereoSamples {
        let n = (sr as f32 * seconds) as usize;
        let mut interleaved = Vec::with_capacity(n * 2);
        for i in 0..n {
            let s = (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin() * amp;
            interleaved.push(s);
            interleaved.push(s);
        }
        StereoSamples { interleaved, sample_rate: sr }
    }

    #[test]
    fn short_audio_is_rejected() {
        let audio = sine_samples(1000.0, 44100, 2.0, 0.5);
        let err = analyze(&audio, FingerStrategy::Full).unwrap_err();
        assert!(matches!(err, CoreError::ShortAudio { .. }));
    }

    #[test]
    fn unsupported_sample_rate_is_rejected() {
        let audio = sine_samples(1000.0, 11025, 10.0, 0.5);
        let err = analyze(&audio, FingerStrategy::Full).unwrap_err();
        assert!(matches!(err, CoreError::InvalidSampleRate(11025)));
    }

    #[test]
    fn smoke_fingerprint_sine_wave() {
        let audio = sine_samples(1000.0, 44100, 10.0, 0.5);
        let fp = analyze(&audio, FingerStrategy::Full).unwrap();
        assert!(fp.is_valid());
        assert!(fp.mid_pct > 60.0, "mid_pct={}", fp.mid_pct);
        assert!(fp.bass_pct < 10.0, "bass_pct={}", fp.bass_pct);
        assert!(fp.air_pct < 5.0, "air_pct={}", fp.air_pct);
        assert!((fp.crest_db - 3.0).abs() < 1.5, "crest_db={}", fp.crest_db);
        assert!(fp.stereo_width < 0.05, "stereo_width={}", fp.stereo_width);
        assert_eq!(fp.harmonic_analysis_method, HarmonicAnalysisMethod::Full);
    }

    #[test]
    fn sampled_strategy_tags_fingerprint_and_records_interval() {
        let audio = sine_samples(440.0, 44100, 30.0, 0.5);
        let fp = analyze(&audio, FingerStrategy::Sampled { interval_s: 10.0 }).unwrap();
        assert_eq!(fp.harmonic_analysis_method, HarmonicAnalysisMethod::Sampled);
        assert_eq!(fp.sampling_interval_s, Some(10.0));
    }
}
