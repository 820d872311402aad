//! User preference bias and the canonical preset-to-preference table.
//!
//! This is the single canonical source for preset defaults; nothing else
//! in the crate re-declares them.

use crate::types::PresetId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreferenceVector {
    pub spectral_bias: f32,
    pub dynamic_bias: f32,
    pub loudness_bias: f32,
    pub bass_boost: f32,
    pub treble_boost: f32,
    pub stereo_bias: f32,
}

impl Default for PreferenceVector {
    fn default() -> Self {
        Self {
            spectral_bias: 0.0,
            dynamic_bias: 0.0,
            loudness_bias: 0.0,
            bass_boost: 0.0,
            treble_boost: 0.0,
            stereo_bias: 0.0,
        }
    }
}

/// Per-axis bias coefficients `k` from §4.2 step 2: `(spectral, dynamic,
/// loudness)`. Only the first two axes feed the 2-D coordinate bias
/// (spectral_balance, dynamic_range); energy_level is biased by
/// loudness_bias at the same `0.10` weight.
pub const BIAS_K: (f32, f32, f32) = (0.15, 0.15, 0.10);

pub const PRESET_TABLE: [(PresetId, PreferenceVector); 6] = [
    (
        PresetId::Adaptive,
        PreferenceVector {
            spectral_bias: 0.0,
            dynamic_bias: 0.0,
            loudness_bias: 0.0,
            bass_boost: 0.0,
            treble_boost: 0.0,
            stereo_bias: 0.0,
        },
    ),
    (
        PresetId::Gentle,
        PreferenceVector {
            spectral_bias: -0.1,
            dynamic_bias: 0.4,
            loudness_bias: -0.2,
            bass_boost: 0.1,
            treble_boost: 0.0,
            stereo_bias: 0.0,
        },
    ),
    (
        PresetId::Warm,
        PreferenceVector {
            spectral_bias: -0.4,
            dynamic_bias: 0.1,
            loudness_bias: 0.0,
            bass_boost: 0.4,
            treble_boost: -0.1,
            stereo_bias: -0.1,
        },
    ),
    (
        PresetId::Bright,
        PreferenceVector {
            spectral_bias: 0.5,
            dynamic_bias: -0.1,
            loudness_bias: 0.1,
            bass_boost: -0.1,
            treble_boost: 0.5,
            stereo_bias: 0.1,
        },
    ),
    (
        PresetId::Punchy,
        PreferenceVector {
            spectral_bias: 0.1,
            dynamic_bias: -0.5,
            loudness_bias: 0.3,
            bass_boost: 0.3,
            treble_boost: 0.1,
            stereo_bias: 0.0,
        },
    ),
    (
        PresetId::Live,
        PreferenceVector {
            spectral_bias: 0.0,
            dynamic_bias: 0.2,
            loudness_bias: 0.0,
            bass_boost: 0.1,
            treble_boost: 0.1,
            stereo_bias: 0.3,
        },
    ),
];

pub fn preference_for_preset(preset: PresetId) -> PreferenceVector {
    PRESET_TABLE
        .iter()
        .find(|(p, _)| *p == preset)
        .map(|(_, v)| *v)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adaptive_preset_is_neutral() {
        assert_eq!(preference_for_preset(PresetId::Adaptive), PreferenceVector::default());
    }

    #[test]
    fn every_preset_id_has_a_table_entry() {
        for preset in PresetId::ALL {
            let pref = preference_for_preset(preset);
            assert!(pref.spectral_bias.abs() <= 1.0);
            assert!(pref.bass_boost >= 0.0 && pref.bass_boost <= 1.0);
        }
    }
}
