//! Chunked DSP pipeline (§4.4): context-padded processing with equal-power
//! crossfade stitching.
//!
//! Consecutive chunks' *core* regions overlap by `chunk_overlap_s`; each
//! chunk is processed independently over its own context-padded window so
//! filters/compressor/limiter enter the overlap warm, then trimmed and
//! faded. The player (or [`stitch`], used here for testing) sums the
//! overlapping fade regions when concatenating — equal-power fades (cos
//! for fade-out, sin for fade-in) guarantee `fade_in² + fade_out² == 1`
//! at every sample in the overlap, so the summed region neither dips nor
//! spikes in level (§8 invariant 5).

use std::sync::Arc;

use crate::config::CoreConfig;
use crate::dsp::chain::{process_chunk, DspChainState};
use crate::error::{CoreError, Result};
use crate::params::ProcessingParameters;

use super::source::ChunkSource;

#[derive(Debug, Clone)]
pub struct ProcessedChunk {
    pub chunk_idx: u64,
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub has_fade_in: bool,
    pub has_fade_out: bool,
}

fn equal_power_fade_in(samples: &mut [f32]) {
    let n = samples.len();
    if n == 0 {
        return;
    }
    for (i, s) in samples.iter_mut().enumerate() {
        let t = i as f32 / (n - 1).max(1) as f32;
        *s *= (t * std::f32::consts::FRAC_PI_2).sin();
    }
}

fn equal_power_fade_out(samples: &mut [f32]) {
    let n = samples.len();
    if n == 0 {
        return;
    }
    for (i, s) in samples.iter_mut().enumerate() {
        let t = i as f32 / (n - 1).max(1) as f32;
        *s *= (t * std::f32::consts::FRAC_PI_2).cos();
    }
}

/// Produces [`ProcessedChunk`]s on demand, seekable to any index. Parameters
/// are fixed for the lifetime of the pipeline (per-track, not per-chunk) —
/// callers that want to react to a mid-track preset change construct a new
/// pipeline and seek to the current chunk index, which the restartable
/// contract of §4.4 explicitly allows.
pub struct ChunkPipeline {
    source: Arc<dyn ChunkSource + Send + Sync>,
    params: ProcessingParameters,
    chunk_duration_frames: usize,
    context_frames: usize,
    overlap_frames: usize,
    hop_frames: usize,
    next_idx: u64,
}

impl ChunkPipeline {
    pub fn new(source: Arc<dyn ChunkSource + Send + Sync>, params: ProcessingParameters, config: &CoreConfig) -> Self {
        let sr = source.sample_rate() as f32;
        let chunk_duration_frames = (config.chunk_duration_s * sr) as usize;
        let context_frames = (config.chunk_context_s * sr) as usize;
        let overlap_frames = (config.chunk_overlap_s * sr) as usize;
        let hop_frames = chunk_duration_frames.saturating_sub(overlap_frames).max(1);

        Self { source, params, chunk_duration_frames, context_frames, overlap_frames, hop_frames, next_idx: 0 }
    }

    /// Seek to an arbitrary chunk index; the next `next_chunk()` call
    /// re-reads from the source rather than relying on prior state.
    pub fn seek(&mut self, chunk_idx: u64) {
        self.next_idx = chunk_idx;
    }

    fn core_range(&self, chunk_idx: u64) -> (usize, usize) {
        let total = self.source.total_frames();
        let start = (chunk_idx as usize) * self.hop_frames;
        let end = (start + self.chunk_duration_frames).min(total);
        (start.min(total), end)
    }

    fn is_last_chunk(&self, chunk_idx: u64) -> bool {
        let (_, end) = self.core_range(chunk_idx);
        end >= self.source.total_frames()
    }

    /// Produce the next chunk, or `None` at EOF. A decode failure is
    /// retried once before propagating `ChunkFailed`.
    pub fn next_chunk(&mut self) -> Option<Result<ProcessedChunk>> {
        let total = self.source.total_frames();
        let (core_start, core_end) = self.core_range(self.next_idx);
        if core_start >= total || core_start >= core_end {
            return None;
        }

        let idx = self.next_idx;
        self.next_idx += 1;

        let result = self.process_one(idx, core_start, core_end).or_else(|_| self.process_one(idx, core_start, core_end));
        Some(result.map_err(|e| CoreError::ChunkFailed { idx, reason: e.to_string() }))
    }

    fn process_one(&self, idx: u64, core_start: usize, core_end: usize) -> Result<ProcessedChunk> {
        let total = self.source.total_frames();
        let padded_start = core_start.saturating_sub(self.context_frames);
        let padded_end = (core_end + self.context_frames).min(total);

        let padded = self.source.read_range(padded_start, padded_end);
        let sample_rate = padded.sample_rate as f32;
        let (mut left, mut right) = padded.split_channels();

        let mut state = DspChainState::new(sample_rate, &self.params);
        process_chunk(&mut left, &mut right, sample_rate, &self.params, &mut state);

        let trim_start = core_start - padded_start;
        let trim_len = core_end - core_start;
        let mut core_left = left[trim_start..trim_start + trim_len].to_vec();
        let mut core_right = right[trim_start..trim_start + trim_len].to_vec();

        let is_first = idx == 0;
        let is_last = self.is_last_chunk(idx);
        let fade_len = self.overlap_frames.min(trim_len);

        let has_fade_in = !is_first && fade_len > 0;
        let has_fade_out = !is_last && fade_len > 0;

        if has_fade_in {
            equal_power_fade_in(&mut core_left[..fade_len]);
            equal_power_fade_in(&mut core_right[..fade_len]);
        }
        if has_fade_out {
            let start = trim_len - fade_len;
            equal_power_fade_out(&mut core_left[start..]);
            equal_power_fade_out(&mut core_right[start..]);
        }

        Ok(ProcessedChunk { chunk_idx: idx, left: core_left, right: core_right, has_fade_in, has_fade_out })
    }
}

/// Stitch a contiguous sequence of [`ProcessedChunk`]s into one buffer by
/// overlap-adding their faded regions. Used by tests and by any caller
/// that wants a whole-track render rather than the player's live mixing.
pub fn stitch(chunks: &[ProcessedChunk], overlap_frames: usize) -> (Vec<f32>, Vec<f32>) {
    let mut left = Vec::new();
    let mut right = Vec::new();

    for chunk in chunks {
        if chunk.has_fade_in && !left.is_empty() {
            let overlap = overlap_frames.min(chunk.left.len()).min(left.len());
            let tail_start = left.len() - overlap;
            for i in 0..overlap {
                left[tail_start + i] += chunk.left[i];
                right[tail_start + i] += chunk.right[i];
            }
            left.extend_from_slice(&chunk.left[overlap..]);
            right.extend_from_slice(&chunk.right[overlap..]);
        } else {
            left.extend_from_slice(&chunk.left);
            right.extend_from_slice(&chunk.right);
        }
    }

    (left, right)
}
