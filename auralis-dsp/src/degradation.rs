//! Memory pressure monitoring and degradation levels (§4.8).
//!
//! The monitor samples resident memory every 30s via a [`MemorySampler`]
//! trait rather than a hardcoded `/proc` read, so tests can inject a fake
//! sampler.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::manager::CacheManager;
use crate::cache::tier::Tier;
use crate::cache::worker::CacheWorker;
use crate::config::CoreConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DegradationLevel {
    /// <80% system memory: full caching (18/36/45 MB defaults).
    Full = 0,
    /// ≥80%: L1=12, L2=18, L3=0 (flush L3).
    Warning = 1,
    /// ≥90%: L1=9, L2=0, L3=0.
    Critical = 2,
    /// Worker causing audible latency spikes: pause worker, cache reads only.
    Paused = 3,
}

impl DegradationLevel {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => DegradationLevel::Full,
            1 => DegradationLevel::Warning,
            2 => DegradationLevel::Critical,
            _ => DegradationLevel::Paused,
        }
    }

    /// Tier budgets in bytes this level resizes the cache to.
    fn tier_budgets_bytes(&self) -> (usize, usize, usize) {
        const MB: usize = 1_048_576;
        match self {
            DegradationLevel::Full => (18 * MB, 36 * MB, 45 * MB),
            DegradationLevel::Warning => (12 * MB, 18 * MB, 0),
            DegradationLevel::Critical => (9 * MB, 0, 0),
            DegradationLevel::Paused => (9 * MB, 0, 0),
        }
    }
}

/// Reads current resident memory as a fraction of total system memory.
/// The real implementation reads `/proc/self/statm` and `/proc/meminfo`
/// on Linux; tests substitute a fixed or scripted value.
pub trait MemorySampler: Send + Sync {
    fn resident_fraction(&self) -> f32;
}

/// Default Linux sampler: resident pages from `/proc/self/statm` over
/// total memory from `/proc/meminfo`. No extra crate needed.
pub struct ProcStatmSampler;

impl MemorySampler for ProcStatmSampler {
    fn resident_fraction(&self) -> f32 {
        let resident_pages = std::fs::read_to_string("/proc/self/statm")
            .ok()
            .and_then(|s| s.split_whitespace().nth(1).map(str::to_string))
            .and_then(|s| s.parse::<u64>().ok());

        let total_kb = std::fs::read_to_string("/proc/meminfo").ok().and_then(|s| {
            s.lines().find(|l| l.starts_with("MemTotal:")).and_then(|l| {
                l.split_whitespace().nth(1).and_then(|v| v.parse::<u64>().ok())
            })
        });

        match (resident_pages, total_kb) {
            (Some(pages), Some(total_kb)) if total_kb > 0 => {
                let page_size_kb = 4; // standard 4 KiB pages on Linux
                let resident_kb = pages * page_size_kb;
                (resident_kb as f32 / total_kb as f32).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }
}

/// Shared, atomically-updated degradation level. Cheap to clone and pass
/// to any subsystem that needs to read the current level without taking
/// a lock (the worker's pause check, for instance).
#[derive(Clone)]
pub struct DegradationState {
    level: Arc<AtomicU8>,
}

impl DegradationState {
    pub fn new() -> Self {
        Self { level: Arc::new(AtomicU8::new(DegradationLevel::Full as u8)) }
    }

    pub fn level(&self) -> DegradationLevel {
        DegradationLevel::from_u8(self.level.load(Ordering::SeqCst))
    }

    fn set(&self, level: DegradationLevel) {
        self.level.store(level as u8, Ordering::SeqCst);
    }
}

impl Default for DegradationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodically samples memory and drives tier resizing / worker
/// pause-resume transitions. `report_latency_spike` lets the player or
/// worker escalate directly to level 3 without waiting for a poll tick.
pub struct DegradationMonitor {
    sampler: Box<dyn MemorySampler>,
    state: DegradationState,
    cache: Arc<CacheManager>,
    worker: Arc<CacheWorker>,
    warning_pct: f32,
    critical_pct: f32,
}

impl DegradationMonitor {
    pub fn new(
        sampler: Box<dyn MemorySampler>,
        state: DegradationState,
        cache: Arc<CacheManager>,
        worker: Arc<CacheWorker>,
        config: &CoreConfig,
    ) -> Self {
        Self {
            sampler,
            state,
            cache,
            worker,
            warning_pct: config.memory_warning_pct,
            critical_pct: config.memory_critical_pct,
        }
    }

    pub fn state(&self) -> DegradationState {
        self.state.clone()
    }

    /// One sampling tick: decide the level from resident memory and
    /// (unless already paused by a latency spike) apply it.
    pub fn tick(&self) {
        if self.state.level() == DegradationLevel::Paused {
            // Level 3 is only cleared explicitly via `resume_from_spike`.
            return;
        }

        let fraction = self.sampler.resident_fraction();
        let level = if fraction >= self.critical_pct {
            DegradationLevel::Critical
        } else if fraction >= self.warning_pct {
            DegradationLevel::Warning
        } else {
            DegradationLevel::Full
        };

        self.apply(level);
    }

    fn apply(&self, level: DegradationLevel) {
        if self.state.level() == level {
            return;
        }
        tracing::info!(from = ?self.state.level(), to = ?level, "degradation level transition");
        self.state.set(level);
        let (l1, l2, l3) = level.tier_budgets_bytes();
        self.cache.resize(l1, l2, l3);
        if l3 == 0 {
            self.cache.flush(Tier::L3);
        }
        if l2 == 0 {
            self.cache.flush(Tier::L2);
        }
    }

    /// Worker-reported latency spike: escalate straight to level 3,
    /// pausing the worker; cache reads keep working.
    pub fn report_latency_spike(&self) {
        self.state.set(DegradationLevel::Paused);
        self.worker.pause();
    }

    /// Clear a level-3 pause once latency has recovered; re-evaluates
    /// memory pressure on the next `tick`.
    pub fn resume_from_spike(&self) {
        self.worker.resume();
        self.state.set(DegradationLevel::Full);
    }

    /// Spawn the monitor's 30s polling thread. Returns the join handle;
    /// the caller owns its lifetime.
    pub fn spawn(self: Arc<Self>) -> std::thread::JoinHandle<()> {
        std::thread::spawn(move || loop {
            self.tick();
            std::thread::sleep(Duration::from_secs(30));
        })
    }
}
