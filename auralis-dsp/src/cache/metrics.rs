//! Read-only metrics snapshots (§6.2, §2 AMBIENT metrics layer): per-tier
//! hit rates and sizes, plus predictor accuracy, handed out by value so
//! callers (the fingerprint-server status endpoint, the CLI, tests) never
//! hold a lock.

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct CacheMetrics {
    pub l1_size_bytes: usize,
    pub l1_budget_bytes: usize,
    pub l1_hit_rate: f32,
    pub l2_size_bytes: usize,
    pub l2_budget_bytes: usize,
    pub l2_hit_rate: f32,
    pub l3_size_bytes: usize,
    pub l3_budget_bytes: usize,
    pub l3_hit_rate: f32,
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct PredictorMetrics {
    pub accuracy: f32,
    pub total_predictions: u64,
    pub correct_predictions: u64,
}
