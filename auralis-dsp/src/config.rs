//! Bootstrap configuration surface (§6.5).
//!
//! Loaded from a TOML file the same way the wider player loads its
//! bootstrap config, with every field defaulted so a missing file still
//! produces a usable `CoreConfig`.

use serde::Deserialize;

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub chunk_duration_s: f32,
    pub chunk_context_s: f32,
    pub chunk_overlap_s: f32,
    pub tier_budgets_mb: TierBudgets,
    pub worker_parallelism: usize,
    pub prediction_blend_user_weight: f32,
    pub fingerprint_strategy: FingerprintStrategyConfig,
    pub sampling_interval_s: f32,
    pub sampling_min_correlation: f32,
    pub memory_warning_pct: f32,
    pub memory_critical_pct: f32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintStrategyConfig {
    Full,
    Sampled,
}

impl Default for FingerprintStrategyConfig {
    fn default() -> Self {
        FingerprintStrategyConfig::Full
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TierBudgets {
    pub l1_mb: f32,
    pub l2_mb: f32,
    pub l3_mb: f32,
}

impl Default for TierBudgets {
    fn default() -> Self {
        Self { l1_mb: 18.0, l2_mb: 36.0, l3_mb: 45.0 }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            chunk_duration_s: 30.0,
            chunk_context_s: 5.0,
            chunk_overlap_s: 1.0,
            tier_budgets_mb: TierBudgets::default(),
            worker_parallelism: 1,
            prediction_blend_user_weight: 0.7,
            fingerprint_strategy: FingerprintStrategyConfig::Full,
            sampling_interval_s: 20.0,
            sampling_min_correlation: 0.85,
            memory_warning_pct: 0.80,
            memory_critical_pct: 0.90,
        }
    }
}

impl CoreConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// any field the file omits.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| CoreError::Config(format!("invalid config: {e}")))
    }

    pub fn tier_budget_bytes(&self) -> (usize, usize, usize) {
        (
            (self.tier_budgets_mb.l1_mb * 1_048_576.0) as usize,
            (self.tier_budgets_mb.l2_mb * 1_048_576.0) as usize,
            (self.tier_budgets_mb.l3_mb * 1_048_576.0) as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.chunk_duration_s, 30.0);
        assert_eq!(cfg.chunk_context_s, 5.0);
        assert_eq!(cfg.worker_parallelism, 1);
        assert_eq!(cfg.tier_budgets_mb.l1_mb, 18.0);
        assert_eq!(cfg.tier_budgets_mb.l3_mb, 45.0);
    }

    #[test]
    fn load_from_toml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("core.toml");
        std::fs::write(&path, "worker_parallelism = 4\nmemory_critical_pct = 0.95\n").unwrap();
        let cfg = CoreConfig::load(&path).unwrap();
        assert_eq!(cfg.worker_parallelism, 4);
        assert_eq!(cfg.memory_critical_pct, 0.95);
        assert_eq!(cfg.chunk_duration_s, 30.0);
    }
}
