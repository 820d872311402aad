//! Multi-tier predictive cache (§4.5, §4.6): tier/key/entry types, the
//! L1/L2/L3 manager with composite eviction, the branch predictor and the
//! background worker that keeps predicted `(track, preset, chunk)` triples
//! warm ahead of playback.

pub mod manager;
pub mod metrics;
pub mod predictor;
pub mod tier;
pub mod worker;

pub use manager::{CacheManager, Lookup};
pub use metrics::{CacheMetrics, PredictorMetrics};
pub use predictor::{AudioContext, BranchPredictor, SessionMode};
pub use tier::{CacheEntry, CacheKey, Tier};
pub use worker::{CacheWorker, ChunkProducer, DesiredEntry, DesiredSetProvider};
