//! Shared value types used across the analyzer, cache and player.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Decoded audio handed to the core. Always interleaved, always stereo by
/// the time it reaches the fingerprint analyzer or DSP chain — mono input
/// is duplicated to both channels and >2-channel input is downmixed by the
/// caller's decoder adapter before it ever reaches this crate.
#[derive(Debug, Clone)]
pub struct StereoSamples {
    /// Interleaved `[L, R, L, R, ...]` frames.
    pub interleaved: Vec<f32>,
    pub sample_rate: u32,
}

impl StereoSamples {
    pub fn frame_count(&self) -> usize {
        self.interleaved.len() / 2
    }

    pub fn duration_s(&self) -> f32 {
        self.frame_count() as f32 / self.sample_rate as f32
    }

    /// Upmix mono samples (duplicated L/R) or downmix >2 channel audio to
    /// stereo before constructing this type.
    pub fn from_mono(mono: &[f32], sample_rate: u32) -> Self {
        let mut interleaved = Vec::with_capacity(mono.len() * 2);
        for &s in mono {
            interleaved.push(s);
            interleaved.push(s);
        }
        Self { interleaved, sample_rate }
    }

    pub fn split_channels(&self) -> (Vec<f32>, Vec<f32>) {
        let n = self.frame_count();
        let mut left = Vec::with_capacity(n);
        let mut right = Vec::with_capacity(n);
        for i in 0..n {
            left.push(self.interleaved[2 * i]);
            right.push(self.interleaved[2 * i + 1]);
        }
        (left, right)
    }
}

/// Sample rates the analyzer accepts.
pub const SUPPORTED_SAMPLE_RATES: [u32; 6] = [22050, 32000, 44100, 48000, 88200, 96000];

pub fn is_supported_sample_rate(sr: u32) -> bool {
    SUPPORTED_SAMPLE_RATES.contains(&sr)
}

/// Stable track identity. Ownership of the underlying file is external to
/// this crate; the core only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackRef {
    pub track_id: i64,
    pub path: PathBuf,
}

/// The closed set of preset identifiers the parameter generator accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PresetId {
    Adaptive,
    Gentle,
    Warm,
    Bright,
    Punchy,
    Live,
}

impl PresetId {
    pub const ALL: [PresetId; 6] = [
        PresetId::Adaptive,
        PresetId::Gentle,
        PresetId::Warm,
        PresetId::Bright,
        PresetId::Punchy,
        PresetId::Live,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PresetId::Adaptive => "adaptive",
            PresetId::Gentle => "gentle",
            PresetId::Warm => "warm",
            PresetId::Bright => "bright",
            PresetId::Punchy => "punchy",
            PresetId::Live => "live",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        PresetId::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

impl std::fmt::Display for PresetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Intensity quantised into `u8` buckets of 0.1 before it is ever used as a
/// cache key — floats are never hashed directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntensityBucket(pub u8);

impl IntensityBucket {
    /// Quantise `intensity ∈ [0,1]` into one of 11 buckets (0.0, 0.1, .. 1.0).
    pub fn quantize(intensity: f32) -> Self {
        let clamped = intensity.clamp(0.0, 1.0);
        IntensityBucket((clamped * 10.0).round() as u8)
    }

    pub fn as_f32(&self) -> f32 {
        self.0 as f32 / 10.0
    }
}

/// Fingerprint acceleration strategy (§4.1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FingerStrategy {
    Full,
    Sampled { interval_s: f32 },
}

impl Default for FingerStrategy {
    fn default() -> Self {
        FingerStrategy::Full
    }
}
