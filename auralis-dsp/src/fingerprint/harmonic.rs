//! Harmonic group: HPSS-derived harmonic ratio, YIN pitch stability, and
//! chroma energy. When HPSS and YIN disagree sharply on voicing, the group
//! is zeroed and `confidence` is reduced (§4.1 failure mode AnalyzerDegraded).

use crate::dsp::chroma::{chroma_cqt, chroma_energy};
use crate::dsp::hpss::{hpss, HpssConfig};
use crate::dsp::yin::{pitch_stability, yin};
use crate::fingerprint::HarmonicAnalysisMethod;

#[derive(Debug, Clone, Copy)]
pub struct HarmonicFeatures {
    pub harmonic_ratio: f32,
    pub pitch_stability: f32,
    pub chroma_energy: f32,
    pub degraded: bool,
}

pub fn analyze_harmonic(mono: &[f64], sample_rate: u32, method: HarmonicAnalysisMethod) -> HarmonicFeatures {
    if mono.len() < 2048 {
        return HarmonicFeatures { harmonic_ratio: 0.0, pitch_stability: 0.0, chroma_energy: 0.0, degraded: true };
    }

    let hpss_config = HpssConfig::default();
    let (harmonic, percussive) = hpss(mono, &hpss_config);

    let harmonic_energy: f64 = harmonic.iter().map(|s| s * s).sum();
    let percussive_energy: f64 = percussive.iter().map(|s| s * s).sum();
    let total = harmonic_energy + percussive_energy;
    let harmonic_ratio = if total > 1e-9 { (harmonic_energy / total) as f32 } else { 0.5 };

    let f0_contour = yin(&harmonic, sample_rate as usize, 60.0, 2000.0);
    let stability = pitch_stability(&f0_contour) as f32;

    let chroma = chroma_cqt(&harmonic, sample_rate as usize);
    let energy = chroma_energy(&chroma) as f32;

    // Degrade when HPSS says the signal is dominated by percussive content
    // but YIN nonetheless reports a confidently stable pitch — the two
    // detectors disagree on whether there is tonal content at all.
    let degraded = harmonic_ratio < 0.15 && stability > 0.8;
    let _ = method;

    if degraded {
        HarmonicFeatures { harmonic_ratio: 0.0, pitch_stability: 0.0, chroma_energy: 0.0, degraded: true }
    } else {
        HarmonicFeatures {
            harmonic_ratio: harmonic_ratio.clamp(0.0, 1.0),
            pitch_stability: stability.clamp(0.0, 1.0),
            chroma_energy: energy.clamp(0.0, 1.0),
            degraded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_audio_degrades() {
        let mono = vec![0.1f64; 100];
        let features = analyze_harmonic(&mono, 44100, HarmonicAnalysisMethod::Full);
        assert!(features.degraded);
    }

    #[test]
    fn steady_tone_is_not_degraded() {
        let sr = 44100u32;
        let mono: Vec<f64> = (0..sr as usize * 2)
            .map(|i| (2.0 * std::f64::consts::PI * 440.0 * i as f64 / sr as f64).sin() * 0.5)
            .collect();
        let features = analyze_harmonic(&mono, sr, HarmonicAnalysisMethod::Full);
        assert!(features.harmonic_ratio >= 0.0 && features.harmonic_ratio <= 1.0);
    }
}
