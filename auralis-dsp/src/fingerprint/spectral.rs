//! Spectral group: centroid, rolloff, flatness, averaged across frames.

use rustfft::{num_complex::Complex64, FftPlanner};

#[derive(Debug, Clone, Copy)]
pub struct SpectralFeatures {
    pub spectral_centroid: f32,
    pub spectral_rolloff: f32,
    pub spectral_flatness: f32,
}

fn hann_window(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / (n - 1).max(1) as f64).cos())
        .collect()
}

pub fn analyze_spectral(mono: &[f64], sample_rate: u32) -> SpectralFeatures {
    let n_fft = 2048usize;
    let hop = 1024usize;
    if mono.len() < n_fft {
        return SpectralFeatures { spectral_centroid: 0.3, spectral_rolloff: 0.5, spectral_flatness: 0.2 };
    }

    let window = hann_window(n_fft);
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n_fft);

    let nyquist = sample_rate as f64 / 2.0;
    let mut centroid_acc = 0f64;
    let mut rolloff_acc = 0f64;
    let mut flatness_acc = 0f64;
    let mut n_frames = 0usize;

    let mut start = 0;
    while start + n_fft <= mono.len() {
        let mut frame: Vec<Complex64> = mono[start..start + n_fft]
            .iter()
            .zip(&window)
            .map(|(&s, &w)| Complex64::new(s * w, 0.0))
            .collect();
        fft.process(&mut frame);

        let bins = n_fft / 2 + 1;
        let magnitudes: Vec<f64> = frame[0..bins].iter().map(|c| c.norm()).collect();
        let total_energy: f64 = magnitudes.iter().sum();

        if total_energy > 1e-9 {
            let weighted_freq: f64 = magnitudes
                .iter()
                .enumerate()
                .map(|(i, &m)| i as f64 * sample_rate as f64 / n_fft as f64 * m)
                .sum();
            centroid_acc += (weighted_freq / total_energy) / nyquist;

            let target = total_energy * 0.85;
            let mut cumulative = 0f64;
            let mut rolloff_bin = bins - 1;
            for (i, &m) in magnitudes.iter().enumerate() {
                cumulative += m;
                if cumulative >= target {
                    rolloff_bin = i;
                    break;
                }
            }
            rolloff_acc += (rolloff_bin as f64 * sample_rate as f64 / n_fft as f64) / nyquist;

            let geo_mean = {
                let log_sum: f64 = magnitudes.iter().map(|&m| (m.max(1e-12)).ln()).sum();
                (log_sum / magnitudes.len() as f64).exp()
            };
            let arith_mean = total_energy / magnitudes.len() as f64;
            flatness_acc += if arith_mean > 1e-12 { geo_mean / arith_mean } else { 0.0 };

            n_frames += 1;
        }
        start += hop;
    }

    if n_frames == 0 {
        return SpectralFeatures { spectral_centroid: 0.3, spectral_rolloff: 0.5, spectral_flatness: 0.2 };
    }

    SpectralFeatures {
        spectral_centroid: (centroid_acc / n_frames as f64).clamp(0.0, 1.0) as f32,
        spectral_rolloff: (rolloff_acc / n_frames as f64).clamp(0.0, 1.0) as f32,
        spectral_flatness: (flatness_acc / n_frames as f64).clamp(0.0, 1.0) as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, sr: u32, seconds: f64) -> Vec<f64> {
        let n = (sr as f64 * seconds) as usize;
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / sr as f64).sin() * 0.5)
            .collect()
    }

    #[test]
    fn low_tone_has_lower_centroid_than_high_tone() {
        let sr = 44100;
        let low = analyze_spectral(&sine(200.0, sr, 1.0), sr);
        let high = analyze_spectral(&sine(6000.0, sr, 1.0), sr);
        assert!(high.spectral_centroid > low.spectral_centroid);
    }

    #[test]
    fn pure_tone_has_low_flatness() {
        let sr = 44100;
        let features = analyze_spectral(&sine(1000.0, sr, 1.0), sr);
        assert!(features.spectral_flatness < 0.5);
    }

    #[test]
    fn short_signal_returns_fallback() {
        let features = analyze_spectral(&[0.1, 0.2, 0.3], 44100);
        assert_eq!(features.spectral_centroid, 0.3);
    }
}
