//! Frequency-group analysis: seven-band energy percentages and the
//! bass/mid relation.

use num_complex::Complex64;
use rustfft::FftPlanner;

/// Band edges in Hz: ≤80, 80-250, 250-500, 500-2k, 2k-4k, 4k-8k, 8k-20k.
const BAND_EDGES: [f32; 8] = [0.0, 80.0, 250.0, 500.0, 2000.0, 4000.0, 8000.0, 20000.0];

#[derive(Debug, Clone, Copy, Default)]
pub struct FrequencyBands {
    pub sub_bass_pct: f32,
    pub bass_pct: f32,
    pub low_mid_pct: f32,
    pub mid_pct: f32,
    pub upper_mid_pct: f32,
    pub presence_pct: f32,
    pub air_pct: f32,
    /// 10·log10(E_bass / E_mid), in dB.
    pub bass_mid_ratio: f32,
}

fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (n as f32 - 1.0)).cos()))
        .collect()
}

fn hz_to_bin(hz: f32, sample_rate: u32, fft_size: usize) -> usize {
    ((hz * fft_size as f32 / sample_rate as f32).round() as usize).min(fft_size / 2)
}

fn integrate_power_range(psd: &[f32], lo_bin: usize, hi_bin: usize) -> f32 {
    psd[lo_bin..hi_bin.max(lo_bin)].iter().sum()
}

/// Average power spectral density across the whole (mono-summed) signal
/// using non-overlapping windows — avoids storing every STFT frame.
fn compute_psd(mono: &[f32], sample_rate: u32) -> (Vec<f32>, usize) {
    let fft_size = 4096.min(mono.len().next_power_of_two().max(256));
    let window = hann_window(fft_size);
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);

    let n_bins = fft_size / 2 + 1;
    let mut psd_sum = vec![0f32; n_bins];
    let mut frame_count = 0usize;

    let hop = fft_size;
    let mut start = 0usize;
    while start + fft_size <= mono.len() {
        let mut buf: Vec<Complex64> = (0..fft_size)
            .map(|i| Complex64::new((mono[start + i] * window[i]) as f64, 0.0))
            .collect();
        fft.process(&mut buf);
        for k in 0..n_bins {
            psd_sum[k] += (buf[k].norm() * buf[k].norm()) as f32;
        }
        frame_count += 1;
        start += hop;
    }

    if frame_count == 0 {
        return (vec![0.0; n_bins], fft_size);
    }
    for v in psd_sum.iter_mut() {
        *v /= frame_count as f32;
    }
    (psd_sum, fft_size)
}

/// Compute the seven-band energy distribution and the bass/mid ratio over
/// the full track (interleaved stereo downmixed to mono for the purpose of
/// spectral balance only — stereo imaging is handled separately in
/// `stereo.rs`).
pub fn analyze_frequency(mono: &[f32], sample_rate: u32) -> FrequencyBands {
    let (psd, fft_size) = compute_psd(mono, sample_rate);

    let mut band_energy = [0f32; 7];
    for b in 0..7 {
        let lo = hz_to_bin(BAND_EDGES[b], sample_rate, fft_size);
        let hi = hz_to_bin(BAND_EDGES[b + 1], sample_rate, fft_size);
        band_energy[b] = integrate_power_range(&psd, lo, hi);
    }

    let total: f32 = band_energy.iter().sum();
    let pct = |e: f32| if total > 0.0 { 100.0 * e / total } else { 0.0 };

    let bass_mid_ratio = if band_energy[3] > 0.0 && band_energy[1] > 0.0 {
        10.0 * (band_energy[1] / band_energy[3]).log10()
    } else {
        0.0
    };

    FrequencyBands {
        sub_bass_pct: pct(band_energy[0]),
        bass_pct: pct(band_energy[1]),
        low_mid_pct: pct(band_energy[2]),
        mid_pct: pct(band_energy[3]),
        upper_mid_pct: pct(band_energy[4]),
        presence_pct: pct(band_energy[5]),
        air_pct: pct(band_energy[6]),
        bass_mid_ratio: bass_mid_ratio.clamp(-5.0, 10.0),
    }
}
