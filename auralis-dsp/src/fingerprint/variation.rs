//! Variation group: how much dynamics and loudness drift across the track,
//! measured as the spread across short analysis windows rather than the
//! single whole-track dynamics values.

use super::dynamics::analyze_dynamics;

#[derive(Debug, Clone, Copy)]
pub struct VariationFeatures {
    pub dynamic_range_variation: f32,
    pub loudness_variation_std: f32,
    pub peak_consistency: f32,
}

pub fn analyze_variation(left: &[f32], right: &[f32], sample_rate: u32) -> VariationFeatures {
    let window_len = (sample_rate as usize * 5).max(1);
    if left.len() < window_len * 2 {
        return VariationFeatures { dynamic_range_variation: 0.0, loudness_variation_std: 0.0, peak_consistency: 1.0 };
    }

    let mut lufs_values = Vec::new();
    let mut crest_values = Vec::new();
    let mut peak_values = Vec::new();

    let mut start = 0;
    while start + window_len <= left.len() {
        let l_win = &left[start..start + window_len];
        let r_win = &right[start..start + window_len];
        let window_features = analyze_dynamics(l_win, r_win, sample_rate);
        lufs_values.push(window_features.lufs);
        crest_values.push(window_features.crest_db);
        peak_values.push(
            l_win
                .iter()
                .chain(r_win.iter())
                .map(|s| s.abs())
                .fold(0f32, f32::max),
        );
        start += window_len;
    }

    let mean = |v: &[f32]| v.iter().sum::<f32>() / v.len().max(1) as f32;
    let std_dev = |v: &[f32], m: f32| (v.iter().map(|x| (x - m).powi(2)).sum::<f32>() / v.len().max(1) as f32).sqrt();

    let crest_mean = mean(&crest_values);
    let dynamic_range_variation = (std_dev(&crest_values, crest_mean) / 12.0).clamp(0.0, 1.0);

    let lufs_mean = mean(&lufs_values);
    let loudness_variation_std = std_dev(&lufs_values, lufs_mean);

    let peak_mean = mean(&peak_values);
    let peak_std = std_dev(&peak_values, peak_mean);
    let peak_consistency = if peak_mean > 0.0 { (1.0 - (peak_std / peak_mean)).clamp(0.0, 1.0) } else { 1.0 };

    VariationFeatures {
        dynamic_range_variation,
        loudness_variation_std: loudness_variation_std.clamp(0.0, 10.0),
        peak_consistency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_track_has_zero_variation() {
        let left = vec![0.1f32; 1000];
        let features = analyze_variation(&left, &left, 44100);
        assert_eq!(features.dynamic_range_variation, 0.0);
        assert_eq!(features.peak_consistency, 1.0);
    }

    #[test]
    fn varying_amplitude_reduces_peak_consistency() {
        let sr = 44100u32;
        let mut left = Vec::new();
        for seg in 0..4 {
            let amp = if seg % 2 == 0 { 0.2 } else { 0.9 };
            for i in 0..(sr as usize * 5) {
                left.push((2.0 * std::f32::consts::PI * 400.0 * i as f32 / sr as f32).sin() * amp);
            }
        }
        let features = analyze_variation(&left, &left, sr);
        assert!(features.peak_consistency < 1.0);
    }
}
