//! Unified error type for the mastering core.
//!
//! Mirrors the layered `thiserror` style used across the wider fingerprint
//! service: one enum per subsystem boundary, each variant carrying just
//! enough context for a caller (or a log line) to act on it.

use thiserror::Error;

/// Errors that can surface from any core subsystem.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The decoder returned no samples or malformed PCM for a chunk.
    #[error("decode error: {0}")]
    Decode(String),

    /// Input audio shorter than the analyzer's minimum duration (5 s).
    #[error("audio too short for analysis: {duration_s:.2}s < 5s")]
    ShortAudio { duration_s: f32 },

    /// Sample rate outside the supported discrete set.
    #[error("unsupported sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    /// HPSS/YIN diverged; the fingerprint is usable but the harmonic group
    /// was zeroed and `confidence` reduced. Not fatal.
    #[error("analyzer degraded: {reason}")]
    AnalyzerDegraded { reason: String },

    /// A chunk failed DSP processing or source load after one retry.
    #[error("chunk {idx} failed processing: {reason}")]
    ChunkFailed { idx: u64, reason: String },

    /// A protected entry would have to be evicted to satisfy a budget.
    /// Internal invariant violation; callers fall back to on-demand
    /// processing bypassing the cache.
    #[error("cache full: protected entry would be evicted (tier={tier})")]
    CacheFull { tier: String },

    /// Sidecar file failed validation; the caller should regenerate it.
    #[error("sidecar invalid: {reason}")]
    SidecarInvalid { reason: String },

    /// Memory pressure crossed the critical threshold. Never propagated to
    /// external callers; only used internally to drive degradation.
    #[error("memory critical: {used_pct:.1}% resident")]
    MemoryCritical { used_pct: f32 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
