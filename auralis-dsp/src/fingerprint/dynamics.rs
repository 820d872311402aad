//! Dynamics group: integrated loudness and crest factor.

use crate::dsp::biquad::BiquadCoeffs;

#[derive(Debug, Clone, Copy)]
pub struct DynamicsFeatures {
    pub lufs: f32,
    pub crest_db: f32,
}

/// ITU-R BS.1770-4 K-weighting: a high-pass shelf followed by a high
/// frequency shelf boost, applied before the gated mean-square measurement.
fn k_weight(mono: &[f32], sample_rate: f32) -> Vec<f32> {
    let stage1 = BiquadCoeffs::high_shelf(sample_rate, 1681.0, 1.0, 4.0);
    let stage2 = BiquadCoeffs::highpass(sample_rate, 38.0, 0.5);

    let mut z1_1 = 0f32;
    let mut z2_1 = 0f32;
    let mut z1_2 = 0f32;
    let mut z2_2 = 0f32;
    let mut out = Vec::with_capacity(mono.len());
    for &x in mono {
        let y1 = stage1.b0 * x + z1_1;
        z1_1 = stage1.b1 * x - stage1.a1 * y1 + z2_1;
        z2_1 = stage1.b2 * x - stage1.a2 * y1;

        let y2 = stage2.b0 * y1 + z1_2;
        z1_2 = stage2.b1 * y1 - stage2.a1 * y2 + z2_2;
        z2_2 = stage2.b2 * y1 - stage2.a2 * y2;

        out.push(y2);
    }
    out
}

/// Gated mean loudness over 400 ms blocks with 75% overlap, absolute gate
/// at -70 LUFS and a relative gate 10 LU below the ungated mean, per
/// BS.1770-4.
fn gated_mean_square(weighted_left: &[f32], weighted_right: &[f32], sample_rate: f32) -> f32 {
    let block_len = (0.4 * sample_rate) as usize;
    let hop = block_len / 4;
    if block_len == 0 || weighted_left.len() < block_len {
        let ms = (weighted_left.iter().chain(weighted_right.iter()).map(|s| s * s).sum::<f32>())
            / (weighted_left.len() + weighted_right.len()).max(1) as f32;
        return ms;
    }

    let mut block_powers = Vec::new();
    let mut start = 0;
    while start + block_len <= weighted_left.len() {
        let l_pow: f32 =
            weighted_left[start..start + block_len].iter().map(|s| s * s).sum::<f32>() / block_len as f32;
        let r_pow: f32 =
            weighted_right[start..start + block_len].iter().map(|s| s * s).sum::<f32>() / block_len as f32;
        block_powers.push(l_pow + r_pow);
        start += hop;
    }

    let absolute_gate = 10f32.powf((-70.0 + 0.691) / 10.0);
    let gated: Vec<f32> = block_powers.iter().copied().filter(|&p| p > absolute_gate).collect();
    if gated.is_empty() {
        return 0.0;
    }
    let ungated_mean = gated.iter().sum::<f32>() / gated.len() as f32;
    let relative_gate = ungated_mean * 10f32.powf(-10.0 / 10.0);
    let relative_gated: Vec<f32> = gated.iter().copied().filter(|&p| p > relative_gate).collect();

    if relative_gated.is_empty() {
        ungated_mean
    } else {
        relative_gated.iter().sum::<f32>() / relative_gated.len() as f32
    }
}

/// `crest_db = 20·log10(peak/rms)` over the full track.
fn crest_factor_db(left: &[f32], right: &[f32]) -> f32 {
    let peak = left
        .iter()
        .chain(right.iter())
        .map(|s| s.abs())
        .fold(0f32, f32::max);
    let rms = {
        let sum_sq: f32 = left.iter().chain(right.iter()).map(|s| s * s).sum();
        let n = (left.len() + right.len()).max(1);
        (sum_sq / n as f32).sqrt()
    };
    if rms <= 0.0 || peak <= 0.0 {
        0.0
    } else {
        20.0 * (peak / rms).log10()
    }
}

pub fn analyze_dynamics(left: &[f32], right: &[f32], sample_rate: u32) -> DynamicsFeatures {
    let sr = sample_rate as f32;
    let weighted_left = k_weight(left, sr);
    let weighted_right = k_weight(right, sr);
    let mean_square = gated_mean_square(&weighted_left, &weighted_right, sr);

    let lufs = if mean_square > 0.0 { -0.691 + 10.0 * mean_square.log10() } else { -70.0 };
    let crest_db = crest_factor_db(left, right);

    DynamicsFeatures {
        lufs: lufs.clamp(-30.0, -5.0),
        // §3.1 declares crest_db's typical range as 8..24, but a pure tone
        // (§8 scenario 1: 1kHz sine, crest_db ≈ 3.0) legitimately falls
        // below that band. Clamp only to a sane finite floor so the
        // measured value is reported rather than floored into the
        // declared range and contradicting the scenario.
        crest_db: crest_db.clamp(0.0, 24.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sr: u32, seconds: f32, amp: f32) -> Vec<f32> {
        let n = (sr as f32 * seconds) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin() * amp)
            .collect()
    }

    #[test]
    fn sine_crest_is_near_3db() {
        let left = sine(1000.0, 44100, 3.0, 0.5);
        let right = left.clone();
        let features = analyze_dynamics(&left, &right, 44100);
        assert!((features.crest_db - 3.0).abs() < 1.5, "crest={}", features.crest_db);
    }

    #[test]
    fn louder_signal_has_higher_lufs() {
        let left_quiet = sine(1000.0, 44100, 2.0, 0.05);
        let left_loud = sine(1000.0, 44100, 2.0, 0.5);
        let quiet = analyze_dynamics(&left_quiet, &left_quiet, 44100);
        let loud = analyze_dynamics(&left_loud, &left_loud, 44100);
        assert!(loud.lufs > quiet.lufs);
    }

    #[test]
    fn lufs_is_within_declared_range() {
        let left = sine(1000.0, 44100, 2.0, 0.9);
        let features = analyze_dynamics(&left, &left, 44100);
        assert!(features.lufs >= -30.0 && features.lufs <= -5.0);
    }
}
