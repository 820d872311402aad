//! YIN fundamental-frequency estimation.
//!
//! De Cheveigné & Kawahara, "YIN, a fundamental frequency estimator for
//! speech and music," JASA 2002: per-frame difference function, cumulative
//! mean normalization, first dip below threshold, parabolic refinement.

/// Per-frame f0 estimate in Hz, 0.0 where no pitch was found.
pub fn yin(y: &[f64], sr: usize, fmin: f64, fmax: f64) -> Vec<f64> {
    let frame_size = 2048;
    let hop_length = 512;
    let trough_threshold = 0.1;

    if y.len() < frame_size {
        return Vec::new();
    }

    let num_frames = (y.len() - frame_size) / hop_length + 1;
    let tau_max = ((sr as f64 / fmin) as usize).min(frame_size / 2);
    let tau_min = (sr as f64 / fmax) as usize;

    let mut f0_contour = vec![0.0f64; num_frames];

    for frame_idx in 0..num_frames {
        let start = frame_idx * hop_length;
        let frame = &y[start..start + frame_size];

        let diff = difference_function(frame, tau_max);
        let cmnd = cumulative_mean_normalized_difference(&diff);

        if let Some(tau) = absolute_threshold(&cmnd, tau_min, tau_max, trough_threshold) {
            let refined_tau = parabolic_interpolation(&cmnd, tau);
            if refined_tau > 0.0 {
                f0_contour[frame_idx] = sr as f64 / refined_tau;
            }
        }
    }

    f0_contour
}

/// d(tau) = sum_j (x[j] - x[j+tau])^2 for tau in [0, tau_max).
fn difference_function(frame: &[f64], tau_max: usize) -> Vec<f64> {
    let mut diff = vec![0.0f64; tau_max];
    for tau in 1..tau_max {
        let mut sum = 0.0;
        let limit = frame.len() - tau;
        for j in 0..limit {
            let delta = frame[j] - frame[j + tau];
            sum += delta * delta;
        }
        diff[tau] = sum;
    }
    diff
}

/// d'(tau) = d(tau) / ((1/tau) * sum_{j=1}^{tau} d(j)), d'(0) = 1.
fn cumulative_mean_normalized_difference(diff: &[f64]) -> Vec<f64> {
    let mut cmnd = vec![1.0f64; diff.len()];
    let mut running_sum = 0.0;
    for tau in 1..diff.len() {
        running_sum += diff[tau];
        cmnd[tau] = if running_sum > 0.0 {
            diff[tau] * tau as f64 / running_sum
        } else {
            1.0
        };
    }
    cmnd
}

/// First local minimum below `threshold` within `[tau_min, tau_max)`.
fn absolute_threshold(
    cmnd: &[f64],
    tau_min: usize,
    tau_max: usize,
    threshold: f64,
) -> Option<usize> {
    let lo = tau_min.max(1);
    let hi = tau_max.min(cmnd.len());
    let mut tau = lo;
    while tau < hi {
        if cmnd[tau] < threshold {
            while tau + 1 < hi && cmnd[tau + 1] < cmnd[tau] {
                tau += 1;
            }
            return Some(tau);
        }
        tau += 1;
    }
    None
}

/// Parabolic interpolation around the chosen minimum for sub-sample
/// period accuracy.
fn parabolic_interpolation(cmnd: &[f64], tau: usize) -> f64 {
    if tau == 0 || tau + 1 >= cmnd.len() {
        return tau as f64;
    }
    let (x0, x1, x2) = (cmnd[tau - 1], cmnd[tau], cmnd[tau + 1]);
    let denom = x0 + x2 - 2.0 * x1;
    if denom.abs() < 1e-12 {
        tau as f64
    } else {
        let shift = 0.5 * (x0 - x2) / denom;
        tau as f64 + shift
    }
}

/// Pitch stability as required by the harmonic group:
/// `1 − σ(pitch)/μ(pitch)`, clamped to `[0,1]`. Silent/unvoiced frames
/// (f0 == 0) are excluded from the statistics.
pub fn pitch_stability(f0_contour: &[f64]) -> f64 {
    let voiced: Vec<f64> = f0_contour.iter().copied().filter(|&f| f > 0.0).collect();
    if voiced.len() < 2 {
        return 0.0;
    }
    let mean: f64 = voiced.iter().sum::<f64>() / voiced.len() as f64;
    if mean <= 0.0 {
        return 0.0;
    }
    let variance: f64 =
        voiced.iter().map(|&f| (f - mean).powi(2)).sum::<f64>() / voiced.len() as f64;
    let std_dev = variance.sqrt();
    (1.0 - std_dev / mean).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, sr: usize, seconds: f64) -> Vec<f64> {
        let n = (sr as f64 * seconds) as usize;
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / sr as f64).sin())
            .collect()
    }

    #[test]
    fn output_length_matches_frame_count() {
        let audio = sine(220.0, 44100, 1.0);
        let contour = yin(&audio, 44100, 50.0, 1000.0);
        let expected = (audio.len() - 2048) / 512 + 1;
        assert_eq!(contour.len(), expected);
    }

    #[test]
    fn detects_pitch_of_a_pure_tone() {
        let audio = sine(220.0, 44100, 1.0);
        let contour = yin(&audio, 44100, 50.0, 1000.0);
        let voiced: Vec<f64> = contour.into_iter().filter(|&f| f > 0.0).collect();
        assert!(!voiced.is_empty());
        let mean: f64 = voiced.iter().sum::<f64>() / voiced.len() as f64;
        assert!((mean - 220.0).abs() < 10.0, "mean f0 = {mean}");
    }

    #[test]
    fn steady_tone_has_high_pitch_stability() {
        let audio = sine(440.0, 44100, 2.0);
        let contour = yin(&audio, 44100, 50.0, 2000.0);
        assert!(pitch_stability(&contour) > 0.9);
    }

    #[test]
    fn silence_has_zero_stability() {
        let contour = vec![0.0; 10];
        assert_eq!(pitch_stability(&contour), 0.0);
    }
}
