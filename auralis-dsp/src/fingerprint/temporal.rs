//! Temporal group: tempo, rhythm stability, transient density, silence.

use crate::dsp::onset::detect_onsets;
use crate::dsp::tempo::{detect_tempo, TempoConfig};
use ndarray::Array1;

#[derive(Debug, Clone, Copy)]
pub struct TemporalFeatures {
    pub tempo_bpm: f32,
    pub rhythm_stability: f32,
    pub transient_density: f32,
    pub silence_ratio: f32,
}

fn silence_ratio(mono: &[f32], threshold: f32) -> f32 {
    if mono.is_empty() {
        return 1.0;
    }
    let silent = mono.iter().filter(|s| s.abs() < threshold).count();
    silent as f32 / mono.len() as f32
}

/// Coefficient of variation of onset-to-onset intervals, inverted so that
/// `1.0` means perfectly regular and `0.0` means erratic.
fn rhythm_stability_from_onsets(onset_frames: &[usize], hop_length: usize, sample_rate: f32) -> f32 {
    if onset_frames.len() < 3 {
        return 0.5;
    }
    let intervals: Vec<f32> = onset_frames
        .windows(2)
        .map(|w| (w[1] - w[0]) as f32 * hop_length as f32 / sample_rate)
        .collect();
    let mean = intervals.iter().sum::<f32>() / intervals.len() as f32;
    if mean <= 0.0 {
        return 0.5;
    }
    let variance = intervals.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / intervals.len() as f32;
    let cv = variance.sqrt() / mean;
    (1.0 - cv).clamp(0.0, 1.0)
}

pub fn analyze_temporal(mono: &[f64], sample_rate: u32) -> TemporalFeatures {
    let config = TempoConfig::default();
    let tempo_bpm = detect_tempo(mono, sample_rate as usize, &config);

    let hop_length = 512;
    let mono_f32: Vec<f32> = mono.iter().map(|&s| s as f32).collect();
    let mono_array: Array1<f64> = Array1::from(mono.to_vec());
    let onset_result = detect_onsets(&mono_array.view(), sample_rate as f64, hop_length);

    let rhythm_stability = rhythm_stability_from_onsets(&onset_result.onset_frames, hop_length, sample_rate as f32);

    let duration_s = mono.len() as f32 / sample_rate as f32;
    let transient_density = if duration_s > 0.0 {
        (onset_result.onset_frames.len() as f32 / duration_s / 10.0).clamp(0.0, 1.0)
    } else {
        0.0
    };

    TemporalFeatures {
        tempo_bpm: (tempo_bpm as f32).clamp(40.0, 220.0),
        rhythm_stability,
        transient_density,
        silence_ratio: silence_ratio(&mono_f32, 0.001),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_signal_has_full_silence_ratio() {
        let mono = vec![0.0f32; 1000];
        assert_eq!(silence_ratio(&mono, 0.001), 1.0);
    }

    #[test]
    fn loud_signal_has_low_silence_ratio() {
        let mono = vec![0.5f32; 1000];
        assert_eq!(silence_ratio(&mono, 0.001), 0.0);
    }

    #[test]
    fn tempo_falls_within_declared_range() {
        let sr = 44100u32;
        let mono: Vec<f64> = (0..sr as usize * 3)
            .map(|i| (2.0 * std::f64::consts::PI * 2.0 * i as f64 / sr as f64).sin() * 0.5)
            .collect();
        let features = analyze_temporal(&mono, sr);
        assert!(features.tempo_bpm >= 40.0 && features.tempo_bpm <= 220.0);
    }
}
