//! Multi-tier predictive cache manager (§4.5): lookup, insert and eviction
//! across L1/L2/L3, with the protected-entry invariant that the currently
//! playing `(track, preset, chunk, intensity)` is never dropped.
//!
//! Three budgeted tiers with a composite eviction priority, each guarded
//! by its own `parking_lot::RwLock` so tiers never contend on a shared
//! lock.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::cache::metrics::CacheMetrics;
use crate::cache::tier::{CacheEntry, CacheKey, Tier};
use crate::error::{CoreError, Result};

const L3_AGE_EVICTION: Duration = Duration::from_secs(5 * 60);

struct TierState {
    entries: HashMap<CacheKey, CacheEntry>,
    budget_bytes: usize,
    size_bytes: usize,
    hits: u64,
    misses: u64,
}

impl TierState {
    fn new(budget_bytes: usize) -> Self {
        Self { entries: HashMap::new(), budget_bytes, size_bytes: 0, hits: 0, misses: 0 }
    }

    fn hit_rate(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f32 / total as f32
        }
    }
}

pub enum Lookup<'a> {
    Hit { tier: Tier, left: &'a [f32], right: &'a [f32] },
    Miss,
}

/// Owns the three tiers. One instance per track is the common case (§3.3's
/// per-track budget), but the manager itself is track-agnostic: callers
/// key everything by `CacheKey::track_id`.
pub struct CacheManager {
    l1: RwLock<TierState>,
    l2: RwLock<TierState>,
    l3: RwLock<TierState>,
    protected_key: RwLock<Option<CacheKey>>,
}

impl CacheManager {
    pub fn new(l1_budget: usize, l2_budget: usize, l3_budget: usize) -> Self {
        Self {
            l1: RwLock::new(TierState::new(l1_budget)),
            l2: RwLock::new(TierState::new(l2_budget)),
            l3: RwLock::new(TierState::new(l3_budget)),
            protected_key: RwLock::new(None),
        }
    }

    fn tier_lock(&self, tier: Tier) -> &RwLock<TierState> {
        match tier {
            Tier::L1 => &self.l1,
            Tier::L2 => &self.l2,
            Tier::L3 => &self.l3,
        }
    }

    /// `get` protocol (§4.5): L1 → L2 → L3 → Miss. On hit, update
    /// last-access bookkeeping; promotion across tiers is not implicit,
    /// it's the worker's job.
    pub fn get(&self, key: &CacheKey) -> Option<(Tier, Vec<f32>, Vec<f32>)> {
        for tier in [Tier::L1, Tier::L2, Tier::L3] {
            let lock = self.tier_lock(tier);
            let mut state = lock.write();
            if let Some(entry) = state.entries.get_mut(key) {
                entry.touch();
                let result = (tier, entry.pcm_left.clone(), entry.pcm_right.clone());
                state.hits += 1;
                return Some(result);
            }
            state.misses += 1;
        }
        None
    }

    /// `insert` protocol (§4.5): evict within `tier` until `size + new ≤
    /// tier_budget`, then insert. Refuses (via `CacheFull`) only if
    /// satisfying the budget would require evicting a protected entry —
    /// callers fall back to on-demand processing bypassing the cache.
    pub fn insert(
        &self,
        key: CacheKey,
        left: Vec<f32>,
        right: Vec<f32>,
        tier: Tier,
        probability: f32,
    ) -> Result<()> {
        let protected = self.protected_key.read().as_ref() == Some(&key);
        let entry = CacheEntry::new(left, right, probability, protected);
        let size = entry.size_bytes;

        let lock = self.tier_lock(tier);
        let mut state = lock.write();

        if protected {
            // Protected entries are always in L1 (§4.5 invariant); the
            // caller should have targeted L1 for the playing key.
            debug_assert_eq!(tier, Tier::L1, "protected entry inserted outside L1");
        }

        self.evict_to_fit(&mut state, tier, size)?;
        state.size_bytes += size;
        state.entries.insert(key, entry);
        Ok(())
    }

    fn evict_to_fit(&self, state: &mut TierState, tier: Tier, incoming_size: usize) -> Result<()> {
        if state.size_bytes + incoming_size <= state.budget_bytes {
            return Ok(());
        }

        // L3: evict entries older than 5 minutes first.
        if tier == Tier::L3 {
            let stale: Vec<CacheKey> = state
                .entries
                .iter()
                .filter(|(_, e)| !e.protected && e.inserted_at.elapsed() >= L3_AGE_EVICTION)
                .map(|(k, _)| k.clone())
                .collect();
            for key in stale {
                if state.size_bytes + incoming_size <= state.budget_bytes {
                    break;
                }
                if let Some(entry) = state.entries.remove(&key) {
                    state.size_bytes -= entry.size_bytes;
                }
            }
        }

        while state.size_bytes + incoming_size > state.budget_bytes {
            let victim = state
                .entries
                .iter()
                .filter(|(_, e)| !e.protected)
                .min_by(|(_, a), (_, b)| {
                    a.probability
                        .partial_cmp(&b.probability)
                        .unwrap()
                        .then_with(|| a.last_access.cmp(&b.last_access))
                })
                .map(|(k, _)| k.clone());

            match victim {
                Some(key) => {
                    if let Some(entry) = state.entries.remove(&key) {
                        state.size_bytes -= entry.size_bytes;
                    }
                }
                None => {
                    return Err(CoreError::CacheFull { tier: format!("{tier:?}") });
                }
            }
        }
        Ok(())
    }

    /// Mark `key` as the currently playing entry: protected, and
    /// guaranteed present in L1 once this returns (moving it there if it
    /// was found in a lower tier). Un-protects the previous key.
    pub fn mark_playing(&self, key: &CacheKey) {
        *self.protected_key.write() = Some(key.clone());

        for tier in [Tier::L1, Tier::L2, Tier::L3] {
            let lock = self.tier_lock(tier);
            let mut state = lock.write();
            for (k, entry) in state.entries.iter_mut() {
                entry.protected = k == key;
            }
        }

        // Promote into L1 if found elsewhere so the "protected entries are
        // always in L1" invariant holds without waiting on the worker.
        if self.l1.read().entries.contains_key(key) {
            return;
        }
        let found = [Tier::L2, Tier::L3].into_iter().find_map(|tier| {
            let lock = self.tier_lock(tier);
            let mut state = lock.write();
            state.entries.remove(key).map(|e| {
                state.size_bytes -= e.size_bytes;
                e
            })
        });
        if let Some(mut entry) = found {
            entry.protected = true;
            let size = entry.size_bytes;
            let mut l1 = self.l1.write();
            // Ignore a budget failure here: a protected promotion must
            // never be refused, so evict non-protected neighbours first
            // and otherwise just let L1 grow momentarily over budget.
            let _ = self.evict_to_fit(&mut l1, Tier::L1, size);
            l1.size_bytes += size;
            l1.entries.insert(key.clone(), entry);
        }
    }

    pub fn contains(&self, key: &CacheKey, tier: Tier) -> bool {
        self.tier_lock(tier).read().entries.contains_key(key)
    }

    /// Resize tier budgets for a degradation-level transition (§4.8).
    /// Shrinking triggers eviction immediately; protected entries are
    /// never dropped even if the new budget is smaller than their size.
    pub fn resize(&self, l1_bytes: usize, l2_bytes: usize, l3_bytes: usize) {
        for (tier, new_budget) in [(Tier::L1, l1_bytes), (Tier::L2, l2_bytes), (Tier::L3, l3_bytes)] {
            let lock = self.tier_lock(tier);
            let mut state = lock.write();
            state.budget_bytes = new_budget;
            let _ = self.evict_to_fit(&mut state, tier, 0);
        }
    }

    /// Flush every non-protected entry from a tier (used when degradation
    /// sets a tier's budget to zero).
    pub fn flush(&self, tier: Tier) {
        let lock = self.tier_lock(tier);
        let mut state = lock.write();
        state.entries.retain(|_, e| e.protected);
        state.size_bytes = state.entries.values().map(|e| e.size_bytes).sum();
    }

    pub fn metrics(&self) -> CacheMetrics {
        let l1 = self.l1.read();
        let l2 = self.l2.read();
        let l3 = self.l3.read();
        CacheMetrics {
            l1_size_bytes: l1.size_bytes,
            l1_budget_bytes: l1.budget_bytes,
            l1_hit_rate: l1.hit_rate(),
            l2_size_bytes: l2.size_bytes,
            l2_budget_bytes: l2.budget_bytes,
            l2_hit_rate: l2.hit_rate(),
            l3_size_bytes: l3.size_bytes,
            l3_budget_bytes: l3.budget_bytes,
            l3_hit_rate: l3.hit_rate(),
        }
    }

    pub fn total_size_bytes(&self) -> usize {
        self.l1.read().size_bytes + self.l2.read().size_bytes + self.l3.read().size_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IntensityBucket, PresetId};

    fn key(chunk_idx: u64) -> CacheKey {
        CacheKey { track_id: 1, preset: PresetId::Adaptive, chunk_idx, intensity: IntensityBucket::quantize(0.5) }
    }

    fn pcm(frames: usize) -> (Vec<f32>, Vec<f32>) {
        (vec![0.1; frames], vec![0.1; frames])
    }

    #[test]
    fn insert_then_get_hits_target_tier() {
        let manager = CacheManager::new(1_000_000, 1_000_000, 1_000_000);
        let (l, r) = pcm(100);
        manager.insert(key(0), l.clone(), r.clone(), Tier::L1, 0.9).unwrap();
        match manager.get(&key(0)) {
            Some((tier, left, right)) => {
                assert_eq!(tier, Tier::L1);
                assert_eq!(left, l);
                assert_eq!(right, r);
            }
            None => panic!("expected hit"),
        }
    }

    #[test]
    fn missing_key_is_a_miss() {
        let manager = CacheManager::new(1_000_000, 1_000_000, 1_000_000);
        assert!(manager.get(&key(99)).is_none());
    }

    #[test]
    fn eviction_respects_budget() {
        let entry_bytes = 100 * 2 * 4; // two f32 channels, 100 frames
        let manager = CacheManager::new(entry_bytes * 2, 1_000_000, 1_000_000);
        let (l, r) = pcm(100);
        manager.insert(key(0), l.clone(), r.clone(), Tier::L1, 0.1).unwrap();
        manager.insert(key(1), l.clone(), r.clone(), Tier::L1, 0.9).unwrap();
        manager.insert(key(2), l, r, Tier::L1, 0.95).unwrap();
        assert!(manager.total_size_bytes() <= entry_bytes * 2);
        // the lowest-probability entry (key 0) should have been evicted first
        assert!(manager.get(&key(0)).is_none());
    }

    #[test]
    fn protected_entry_survives_eviction_pressure() {
        let entry_bytes = 100 * 2 * 4;
        let manager = CacheManager::new(entry_bytes, 1_000_000, 1_000_000);
        let (l, r) = pcm(100);
        manager.insert(key(0), l.clone(), r.clone(), Tier::L1, 0.01).unwrap();
        manager.mark_playing(&key(0));
        // Attempting to insert another entry that would need to evict the
        // protected one should fail rather than drop it.
        let err = manager.insert(key(1), l, r, Tier::L1, 0.99);
        assert!(err.is_err());
        assert!(manager.get(&key(0)).is_some());
    }

    #[test]
    fn mark_playing_promotes_from_l3_to_l1() {
        let manager = CacheManager::new(1_000_000, 1_000_000, 1_000_000);
        let (l, r) = pcm(100);
        manager.insert(key(5), l, r, Tier::L3, 0.4).unwrap();
        manager.mark_playing(&key(5));
        assert!(manager.contains(&key(5), Tier::L1));
        assert!(!manager.contains(&key(5), Tier::L3));
    }

    #[test]
    fn resize_down_flushes_excess_without_dropping_protected() {
        let manager = CacheManager::new(1_000_000, 1_000_000, 1_000_000);
        let (l, r) = pcm(100);
        manager.insert(key(0), l.clone(), r.clone(), Tier::L3, 0.5).unwrap();
        manager.insert(key(1), l, r, Tier::L3, 0.5).unwrap();
        manager.resize(1_000_000, 1_000_000, 0);
        assert_eq!(manager.metrics().l3_size_bytes, 0);
    }

    #[test]
    fn flush_keeps_protected_entries() {
        let manager = CacheManager::new(1_000_000, 1_000_000, 1_000_000);
        let (l, r) = pcm(100);
        manager.insert(key(0), l, r, Tier::L1, 0.5).unwrap();
        manager.mark_playing(&key(0));
        manager.flush(Tier::L1);
        assert!(manager.get(&key(0)).is_some());
    }
}
