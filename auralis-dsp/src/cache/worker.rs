//! Background cache worker (§4.6, §5): a fixed-size pool of OS threads
//! draining a single priority queue keyed by `(tier_priority asc,
//! probability desc, chunk_distance asc)`.
//!
//! Per the design notes' preference for explicit `std::sync` primitives
//! over pulling in another async runtime for library-internal
//! concurrency, the queue is a `Mutex<BinaryHeap<_>>` + `Condvar`
//! (`fingerprint-server` already depends on `tokio` for its HTTP surface,
//! but that dependency has no bearing on how `auralis-dsp` itself
//! schedules CPU-bound DSP work).

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::cache::tier::{CacheKey, Tier};
use crate::error::Result;

/// Implemented by the host application: produces the processed PCM for a
/// cache key by running the chunk pipeline against the right track,
/// preset and chunk index. Kept as a trait so `auralis-dsp` never has to
/// know about decoders or track storage.
pub trait ChunkProducer: Send + Sync {
    fn produce(&self, key: &CacheKey) -> Result<(Vec<f32>, Vec<f32>)>;
}

#[derive(Debug, Clone)]
struct WorkerJob {
    key: CacheKey,
    tier: Tier,
    probability: f32,
    chunk_distance: u64,
    epoch: u64,
}

impl PartialEq for WorkerJob {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for WorkerJob {}

/// `BinaryHeap::pop` returns the greatest element; "greatest" here means
/// "most urgent": lowest tier priority, then highest probability, then
/// smallest chunk distance.
impl Ord for WorkerJob {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .tier
            .priority()
            .cmp(&self.tier.priority())
            .then_with(|| self.probability.partial_cmp(&other.probability).unwrap_or(Ordering::Equal))
            .then_with(|| other.chunk_distance.cmp(&self.chunk_distance))
    }
}
impl PartialOrd for WorkerJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

type JobResult = Result<(Vec<f32>, Vec<f32>)>;

struct InflightSlot {
    lock: Mutex<Option<JobResult>>,
    cvar: Condvar,
}

/// A single desired cache entry the worker should ensure is present, as
/// computed by the host from the predictor's output and playback
/// position (§4.6's `{L1 keys...}`, `{L2 keys...}`, `{L3 keys...}` sets).
#[derive(Debug, Clone)]
pub struct DesiredEntry {
    pub key: CacheKey,
    pub tier: Tier,
    pub probability: f32,
    pub chunk_distance: u64,
}

pub trait DesiredSetProvider: Send + Sync {
    fn desired_set(&self) -> Vec<DesiredEntry>;
}

pub struct CacheWorker {
    manager: Arc<crate::cache::manager::CacheManager>,
    producer: Arc<dyn ChunkProducer>,
    queue: Mutex<BinaryHeap<WorkerJob>>,
    cvar: Condvar,
    epoch: AtomicU64,
    paused: AtomicBool,
    shutdown: AtomicBool,
    queued_keys: Mutex<HashSet<CacheKey>>,
    inflight: Mutex<HashMap<CacheKey, Arc<InflightSlot>>>,
}

impl CacheWorker {
    pub fn new(manager: Arc<crate::cache::manager::CacheManager>, producer: Arc<dyn ChunkProducer>) -> Arc<Self> {
        Arc::new(Self {
            manager,
            producer,
            queue: Mutex::new(BinaryHeap::new()),
            cvar: Condvar::new(),
            epoch: AtomicU64::new(0),
            paused: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            queued_keys: Mutex::new(HashSet::new()),
            inflight: Mutex::new(HashMap::new()),
        })
    }

    /// Seek or track/preset switch: bump the epoch so in-flight jobs
    /// carrying a stale epoch are discarded rather than inserted (§4.7
    /// cancellation, §5 epoch-bump rule).
    pub fn bump_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, AtomicOrdering::SeqCst) + 1
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(AtomicOrdering::SeqCst)
    }

    /// Degradation level 3: pause the worker entirely; cache reads still
    /// work, writes just never happen.
    pub fn pause(&self) {
        self.paused.store(true, AtomicOrdering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, AtomicOrdering::SeqCst);
        self.cvar.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(AtomicOrdering::SeqCst)
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, AtomicOrdering::SeqCst);
        self.cvar.notify_all();
    }

    fn enqueue(self: &Arc<Self>, entry: DesiredEntry) {
        let mut queued = self.queued_keys.lock().unwrap();
        if queued.contains(&entry.key) || self.manager.contains(&entry.key, entry.tier) {
            return;
        }
        queued.insert(entry.key.clone());
        drop(queued);

        let job = WorkerJob {
            key: entry.key,
            tier: entry.tier,
            probability: entry.probability,
            chunk_distance: entry.chunk_distance,
            epoch: self.current_epoch(),
        };
        self.queue.lock().unwrap().push(job);
        self.cvar.notify_one();
    }

    /// Recompute the desired set and enqueue every entry not yet cached.
    /// Call this from a dedicated poll thread every 0.5-2.0s (§4.6).
    pub fn poll_once(self: &Arc<Self>, provider: &dyn DesiredSetProvider) {
        if self.is_paused() {
            return;
        }
        for entry in provider.desired_set() {
            self.enqueue(entry);
        }
    }

    /// Spawn a poll thread plus `parallelism` worker threads. Returns
    /// handles the caller can join at shutdown.
    pub fn spawn(
        self: &Arc<Self>,
        parallelism: usize,
        provider: Arc<dyn DesiredSetProvider>,
        poll_interval: Duration,
    ) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(parallelism + 1);

        {
            let worker = Arc::clone(self);
            handles.push(std::thread::spawn(move || {
                while !worker.shutdown.load(AtomicOrdering::SeqCst) {
                    worker.poll_once(provider.as_ref());
                    std::thread::sleep(poll_interval);
                }
            }));
        }

        for _ in 0..parallelism.max(1) {
            let worker = Arc::clone(self);
            handles.push(std::thread::spawn(move || worker.run_loop()));
        }

        handles
    }

    fn run_loop(self: Arc<Self>) {
        loop {
            let job = {
                let mut queue = self.queue.lock().unwrap();
                loop {
                    if self.shutdown.load(AtomicOrdering::SeqCst) {
                        return;
                    }
                    if self.is_paused() {
                        queue = self.cvar.wait_timeout(queue, Duration::from_millis(200)).unwrap().0;
                        continue;
                    }
                    if let Some(job) = queue.pop() {
                        break job;
                    }
                    queue = self.cvar.wait_timeout(queue, Duration::from_millis(500)).unwrap().0;
                }
            };
            self.process(job);
        }
    }

    fn claim_inflight(&self, key: &CacheKey) -> (Arc<InflightSlot>, bool) {
        let mut inflight = self.inflight.lock().unwrap();
        if let Some(slot) = inflight.get(key) {
            return (Arc::clone(slot), false);
        }
        let slot = Arc::new(InflightSlot { lock: Mutex::new(None), cvar: Condvar::new() });
        inflight.insert(key.clone(), Arc::clone(&slot));
        (slot, true)
    }

    fn finish_inflight(&self, key: &CacheKey, slot: &Arc<InflightSlot>, result: JobResult) {
        *slot.lock.lock().unwrap() = Some(result);
        slot.cvar.notify_all();
        self.inflight.lock().unwrap().remove(key);
    }

    fn process(&self, job: WorkerJob) {
        self.queued_keys.lock().unwrap().remove(&job.key);

        let (slot, is_leader) = self.claim_inflight(&job.key);
        if !is_leader {
            // Someone else is already producing this key; await their
            // result instead of duplicating the work (§5 dedup rule).
            let mut guard = slot.lock.lock().unwrap();
            while guard.is_none() {
                guard = slot.cvar.wait(guard).unwrap();
            }
            return;
        }

        let result = self.producer.produce(&job.key);

        if job.epoch != self.current_epoch() {
            // Seek/switch invalidated this job mid-flight; discard.
            self.finish_inflight(&job.key, &slot, Err(crate::error::CoreError::ChunkFailed {
                idx: job.key.chunk_idx,
                reason: "cancelled: stale epoch".to_string(),
            }));
            return;
        }

        match &result {
            Ok((left, right)) => {
                let _ = self.manager.insert(job.key.clone(), left.clone(), right.clone(), job.tier, job.probability);
            }
            Err(e) => {
                tracing::warn!(key = ?job.key, error = %e, "worker job failed");
            }
        }

        self.finish_inflight(&job.key, &slot, result);
    }
}
