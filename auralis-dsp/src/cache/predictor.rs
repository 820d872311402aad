//! Branch predictor (§4.6): tracks preset-switch history per session and
//! blends it with an audio-content signal to predict which preset the
//! worker should pre-process next.
//!
//! Built around a per-session transition matrix and session-mode rules,
//! in the same `parking_lot`-guarded, plain-struct style as
//! [`crate::cache::tier`].

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::types::PresetId;

const N_PRESETS: usize = 6;
const RECENT_SWITCHES_CAPACITY: usize = 100;
const SMOOTHING_ALPHA: f32 = 0.5;
const SESSION_DECAY: f32 = 0.99;

fn preset_index(preset: PresetId) -> usize {
    PresetId::ALL.iter().position(|p| *p == preset).unwrap()
}

/// Audio-content signal the predictor blends with user history: derived
/// from the currently playing track's coordinates, not from listening
/// history.
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioContext {
    pub energy_level: f32,
    pub dynamic_range: f32,
    pub tempo_bpm: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Exploration,
    Normal,
    Settled,
}

/// Fixed rule table mapping audio-content signal to preset affinities
/// (§4.6: "energy>0.75 ⇒ +0.4 to punchy"). Each entry is `(predicate,
/// preset, affinity)`; affinities for presets not matched by any
/// predicate start at 0.
fn audio_affinities(ctx: &AudioContext) -> [f32; N_PRESETS] {
    let mut affinity = [0f32; N_PRESETS];
    let mut add = |preset: PresetId, amount: f32| {
        affinity[preset_index(preset)] += amount;
    };

    if ctx.energy_level > 0.75 {
        add(PresetId::Punchy, 0.4);
    }
    if ctx.dynamic_range > 0.7 {
        add(PresetId::Gentle, 0.3);
        add(PresetId::Live, 0.2);
    }
    if ctx.dynamic_range < 0.3 {
        add(PresetId::Punchy, 0.2);
        add(PresetId::Bright, 0.2);
    }
    if ctx.tempo_bpm >= 120.0 {
        add(PresetId::Punchy, 0.2);
    } else if ctx.tempo_bpm > 0.0 && ctx.tempo_bpm < 90.0 {
        add(PresetId::Warm, 0.2);
        add(PresetId::Gentle, 0.1);
    }

    // Adaptive always keeps a small baseline affinity so the distribution
    // never degenerates when no predicate fires.
    add(PresetId::Adaptive, 0.1);

    affinity
}

fn normalize(mut weights: [f32; N_PRESETS]) -> [f32; N_PRESETS] {
    let sum: f32 = weights.iter().sum();
    if sum > 0.0 {
        for w in weights.iter_mut() {
            *w /= sum;
        }
    } else {
        let uniform = 1.0 / N_PRESETS as f32;
        weights = [uniform; N_PRESETS];
    }
    weights
}

/// Persists across sessions (decayed 0.99 per session on [`BranchPredictor::start_session`])
/// and updated from a single thread — the session-event consumer — per the
/// concurrency model's single-writer rule for shared predictor state.
pub struct BranchPredictor {
    transition_counts: [[f32; N_PRESETS]; N_PRESETS],
    recent_switches: VecDeque<(PresetId, Instant)>,
    session_start: Instant,
    user_weight: f32,
    total_predictions: u64,
    correct_predictions: u64,
}

impl BranchPredictor {
    pub fn new(user_weight: f32) -> Self {
        Self {
            transition_counts: [[0.0; N_PRESETS]; N_PRESETS],
            recent_switches: VecDeque::with_capacity(RECENT_SWITCHES_CAPACITY),
            session_start: Instant::now(),
            user_weight: user_weight.clamp(0.0, 1.0),
            total_predictions: 0,
            correct_predictions: 0,
        }
    }

    /// Decay the persisted transition matrix by 0.99 and reset the
    /// session clock. Call once per new listening session.
    pub fn start_session(&mut self) {
        for row in self.transition_counts.iter_mut() {
            for count in row.iter_mut() {
                *count *= SESSION_DECAY;
            }
        }
        self.recent_switches.clear();
        self.session_start = Instant::now();
    }

    /// Record a user-initiated preset switch, updating the transition
    /// matrix and the bounded recent-switch history.
    pub fn record_switch(&mut self, from: PresetId, to: PresetId) {
        self.transition_counts[preset_index(from)][preset_index(to)] += 1.0;
        if self.recent_switches.len() == RECENT_SWITCHES_CAPACITY {
            self.recent_switches.pop_front();
        }
        self.recent_switches.push_back((to, Instant::now()));
    }

    /// Whether a previous prediction's top pick matched the switch the
    /// user actually made, for the predictor's own accuracy metric.
    pub fn record_outcome(&mut self, predicted_top: PresetId, actual: PresetId) {
        self.total_predictions += 1;
        if predicted_top == actual {
            self.correct_predictions += 1;
        }
    }

    pub fn accuracy(&self) -> f32 {
        if self.total_predictions == 0 {
            0.0
        } else {
            self.correct_predictions as f32 / self.total_predictions as f32
        }
    }

    /// Read-only snapshot for the §6.2 metrics surface.
    pub fn metrics(&self) -> crate::cache::metrics::PredictorMetrics {
        crate::cache::metrics::PredictorMetrics {
            accuracy: self.accuracy(),
            total_predictions: self.total_predictions,
            correct_predictions: self.correct_predictions,
        }
    }

    /// Session-mode rule (§4.6): exploration if ≥5 switches in the first
    /// 300s, settled if ≤2 switches after 600s, else normal.
    pub fn session_mode(&self) -> SessionMode {
        let elapsed = self.session_start.elapsed();
        let switches_in_window = |window: Duration| {
            self.recent_switches
                .iter()
                .filter(|(_, t)| t.duration_since(self.session_start) <= window)
                .count()
        };

        if elapsed <= Duration::from_secs(300) {
            if switches_in_window(Duration::from_secs(300)) >= 5 {
                return SessionMode::Exploration;
            }
        } else if elapsed > Duration::from_secs(600) && switches_in_window(elapsed) <= 2 {
            return SessionMode::Settled;
        }
        SessionMode::Normal
    }

    /// User-history row, with additive (Laplace) smoothing `alpha = 0.5`,
    /// normalised to sum 1.
    fn user_distribution(&self, current: PresetId) -> [f32; N_PRESETS] {
        let row = self.transition_counts[preset_index(current)];
        let mut smoothed = [0f32; N_PRESETS];
        for i in 0..N_PRESETS {
            smoothed[i] = row[i] + SMOOTHING_ALPHA;
        }
        normalize(smoothed)
    }

    /// Blend the user-history distribution with the audio-content
    /// affinity table using `user_weight` (default 0.7 user / 0.3 audio),
    /// returning `(preset, probability)` pairs sorted descending by
    /// probability, normalised to sum 1.
    pub fn predict(&self, current: PresetId, ctx: &AudioContext) -> Vec<(PresetId, f32)> {
        let user = self.user_distribution(current);
        let audio = normalize(audio_affinities(ctx));

        let mut blended = [0f32; N_PRESETS];
        for i in 0..N_PRESETS {
            blended[i] = self.user_weight * user[i] + (1.0 - self.user_weight) * audio[i];
        }
        let blended = normalize(blended);

        let mut ranked: Vec<(PresetId, f32)> =
            PresetId::ALL.iter().zip(blended.iter()).map(|(&p, &w)| (p, w)).collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predictions_sum_to_one() {
        let predictor = BranchPredictor::new(0.7);
        let ranked = predictor.predict(PresetId::Adaptive, &AudioContext::default());
        let sum: f32 = ranked.iter().map(|(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 1e-4, "sum={sum}");
    }

    #[test]
    fn frequent_transition_dominates_prediction() {
        let mut predictor = BranchPredictor::new(0.9);
        for _ in 0..50 {
            predictor.record_switch(PresetId::Punchy, PresetId::Warm);
        }
        let ranked = predictor.predict(PresetId::Punchy, &AudioContext::default());
        assert_eq!(ranked[0].0, PresetId::Warm);
        assert!(ranked[0].1 > 0.5, "top probability={}", ranked[0].1);
    }

    #[test]
    fn high_energy_context_favors_punchy_with_no_history() {
        let predictor = BranchPredictor::new(0.3);
        let ctx = AudioContext { energy_level: 0.9, dynamic_range: 0.5, tempo_bpm: 100.0 };
        let ranked = predictor.predict(PresetId::Adaptive, &ctx);
        assert_eq!(ranked[0].0, PresetId::Punchy);
    }

    #[test]
    fn session_mode_starts_normal() {
        let predictor = BranchPredictor::new(0.7);
        assert_eq!(predictor.session_mode(), SessionMode::Normal);
    }

    #[test]
    fn exploration_mode_after_many_early_switches() {
        let mut predictor = BranchPredictor::new(0.7);
        for _ in 0..6 {
            predictor.record_switch(PresetId::Adaptive, PresetId::Warm);
        }
        assert_eq!(predictor.session_mode(), SessionMode::Exploration);
    }

    #[test]
    fn accuracy_tracks_recorded_outcomes() {
        let mut predictor = BranchPredictor::new(0.7);
        predictor.record_outcome(PresetId::Warm, PresetId::Warm);
        predictor.record_outcome(PresetId::Warm, PresetId::Bright);
        assert!((predictor.accuracy() - 0.5).abs() < 1e-6);
    }
}
