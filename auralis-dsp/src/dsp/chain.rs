//! The fixed 6-stage mastering chain (§4.3), applied to a (possibly
//! context-padded) stereo chunk. Internal buffers are `f32`; filters use
//! Direct Form II Transposed via [`crate::dsp::biquad`].
//!
//! A fresh [`DspChainState`] is built per chunk call — the context padding
//! supplied by the chunk pipeline (§4.4) is what lets filters enter the
//! *trimmed* region warm, since they run across the whole padded buffer in
//! one pass before the padding is discarded.

use crate::dsp::compressor::{Compressor, CompressorConfig, DetectionMode};
use crate::dsp::envelope::{EnvelopeConfig, EnvelopeFollower};
use crate::dsp::eq::PsychoacousticEq;
use crate::dsp::limiter::{Limiter, LimiterConfig};
use crate::params::ProcessingParameters;

/// Per-chunk mutable state for the chain's stateful stages.
pub struct DspChainState {
    eq: PsychoacousticEq,
    compressor: Compressor,
    expansion_follower: EnvelopeFollower,
    limiter: Limiter,
}

impl DspChainState {
    pub fn new(sample_rate: f32, params: &ProcessingParameters) -> Self {
        let eq = PsychoacousticEq::new(sample_rate, &params.eq_curve, params.eq_blend, 2);

        let compressor = Compressor::new(CompressorConfig {
            sample_rate: sample_rate as usize,
            threshold_db: params.compression.threshold_db,
            ratio: params.compression.ratio,
            knee_db: 6.0,
            attack_ms: params.compression.attack_ms,
            release_ms: params.compression.release_ms,
            makeup_gain_db: 0.0,
            enable_lookahead: true,
            lookahead_ms: 5.0,
        });

        let expansion_follower = EnvelopeFollower::new(&EnvelopeConfig {
            sample_rate: sample_rate as usize,
            attack_ms: 5.0,
            release_ms: 80.0,
        });

        let limiter = Limiter::new(LimiterConfig {
            sample_rate: sample_rate as usize,
            threshold_db: params.limiter.ceiling_db,
            release_ms: 50.0,
            lookahead_ms: params.limiter.lookahead_ms,
            isr_enabled: true,
            oversampling: 1,
        });

        Self { eq, compressor, expansion_follower, limiter }
    }
}

fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

fn measured_lufs_approx(left: &[f32], right: &[f32]) -> f32 {
    let r = (rms(left) + rms(right)) / 2.0;
    if r <= 0.0 {
        -70.0
    } else {
        -0.691 + 20.0 * r.log10()
    }
}

/// Upward-expander-style dynamics widening: below a fixed relative
/// threshold, push the signal further down, proportional to
/// `params.amount`, to increase measured crest factor by roughly
/// `target_crest_increase_db`.
fn apply_expansion(
    left: &mut [f32],
    right: &mut [f32],
    follower: &mut EnvelopeFollower,
    amount: f32,
    target_crest_increase_db: f32,
) {
    if amount <= 0.0 {
        return;
    }
    let threshold_lin = db_to_linear(-24.0);
    let max_extra_atten_db = target_crest_increase_db * amount;
    for i in 0..left.len() {
        let level = follower.process(left[i].abs().max(right[i].abs()));
        if level < threshold_lin && threshold_lin > 0.0 {
            let depth = (1.0 - level / threshold_lin).clamp(0.0, 1.0);
            let atten_db = -max_extra_atten_db * depth;
            let gain = db_to_linear(atten_db);
            left[i] *= gain;
            right[i] *= gain;
        }
    }
}

/// Mid/side stereo width scaling: `scale = target/current` on the side
/// channel, then recompose.
fn apply_stereo_width(left: &mut [f32], right: &mut [f32], target_width: f32) {
    let mut side_energy = 0f32;
    let mut mid_energy = 0f32;
    let mid: Vec<f32> = left.iter().zip(right.iter()).map(|(&l, &r)| (l + r) * 0.5).collect();
    let side: Vec<f32> = left.iter().zip(right.iter()).map(|(&l, &r)| (l - r) * 0.5).collect();
    for i in 0..mid.len() {
        mid_energy += mid[i] * mid[i];
        side_energy += side[i] * side[i];
    }
    let current_width = if mid_energy + side_energy > 0.0 {
        side_energy / (mid_energy + side_energy)
    } else {
        0.0
    };
    if current_width <= 0.0 {
        return;
    }
    let scale = (target_width / current_width).sqrt().clamp(0.0, 4.0);
    for i in 0..left.len() {
        let m = mid[i];
        let s = side[i] * scale;
        left[i] = m + s;
        right[i] = m - s;
    }
}

fn final_peak_normalize(left: &mut [f32], right: &mut [f32]) {
    let peak = left
        .iter()
        .chain(right.iter())
        .map(|s| s.abs())
        .fold(0f32, f32::max);
    if peak > 0.99 && peak > 0.0 {
        let scale = 0.99 / peak;
        for s in left.iter_mut() {
            *s *= scale;
        }
        for s in right.iter_mut() {
            *s *= scale;
        }
    }
}

/// Run the full 6-stage chain over a padded stereo chunk in place.
pub fn process_chunk(
    left: &mut Vec<f32>,
    right: &mut Vec<f32>,
    sample_rate: f32,
    params: &ProcessingParameters,
    state: &mut DspChainState,
) {
    // 1. Loudness adjust toward target_lufs.
    let measured = measured_lufs_approx(left, right);
    let gain_db = params.target_lufs - measured;
    let gain = db_to_linear(gain_db.clamp(-24.0, 24.0));
    for s in left.iter_mut() {
        *s *= gain;
    }
    for s in right.iter_mut() {
        *s *= gain;
    }

    // 2. Psychoacoustic EQ.
    *left = state.eq.process(left, 0);
    *right = state.eq.process(right, 1);

    // 3. Dynamics: exactly one of expansion/compression is active.
    if params.compression.amount > 0.0 {
        let (processed_l, _) = state.compressor.process(left, DetectionMode::Hybrid);
        let (processed_r, _) = state.compressor.process(right, DetectionMode::Hybrid);
        *left = processed_l;
        *right = processed_r;
    } else {
        apply_expansion(
            left,
            right,
            &mut state.expansion_follower,
            params.expansion.amount,
            params.expansion.target_crest_increase_db,
        );
    }

    // 4. Stereo width.
    apply_stereo_width(left, right, params.stereo_width_target);

    // 5. Limiter.
    let (limited_l, _) = state.limiter.process(left);
    let (limited_r, _) = state.limiter.process(right);
    *left = limited_l;
    *right = limited_r;

    // 6. Final peak normalisation.
    final_peak_normalize(left, right);
}
