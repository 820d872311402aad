//! Cache key, entry and tier definitions (§4.5).

use crate::types::{IntensityBucket, PresetId};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    L1,
    L2,
    L3,
}

impl Tier {
    /// Ascending tier lookup/eviction priority: L1 first.
    pub fn priority(&self) -> u8 {
        match self {
            Tier::L1 => 0,
            Tier::L2 => 1,
            Tier::L3 => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub track_id: i64,
    pub preset: PresetId,
    pub chunk_idx: u64,
    pub intensity: IntensityBucket,
}

/// One cached, fully-processed chunk plus the bookkeeping the eviction
/// rule needs.
pub struct CacheEntry {
    pub pcm_left: Vec<f32>,
    pub pcm_right: Vec<f32>,
    pub size_bytes: usize,
    pub last_access: Instant,
    pub access_count: u32,
    pub probability: f32,
    pub protected: bool,
    pub inserted_at: Instant,
}

impl CacheEntry {
    pub fn new(pcm_left: Vec<f32>, pcm_right: Vec<f32>, probability: f32, protected: bool) -> Self {
        let size_bytes = (pcm_left.len() + pcm_right.len()) * std::mem::size_of::<f32>();
        let now = Instant::now();
        Self { pcm_left, pcm_right, size_bytes, last_access: now, access_count: 0, probability, protected, inserted_at: now }
    }

    pub fn touch(&mut self) {
        self.last_access = Instant::now();
        self.access_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_priority_is_ascending() {
        assert!(Tier::L1.priority() < Tier::L2.priority());
        assert!(Tier::L2.priority() < Tier::L3.priority());
    }

    #[test]
    fn entry_size_matches_pcm_byte_length() {
        let entry = CacheEntry::new(vec![0.0; 100], vec![0.0; 100], 0.5, false);
        assert_eq!(entry.size_bytes, 200 * 4);
    }
}
