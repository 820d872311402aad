//! Single-slot prebuffer (§4.7): while PLAYING, the next queued track's
//! first chunk is loaded and processed ahead of time so track-end swaps
//! in with a gap under 10ms instead of the ~100ms a cold load costs.

use std::sync::{Arc, Mutex};

use crate::chunk::pipeline::{ChunkPipeline, ProcessedChunk};
use crate::chunk::source::ChunkSource;
use crate::params::ProcessingParameters;
use crate::types::TrackRef;

pub struct PrebufferedTrack {
    pub track: TrackRef,
    pub source: Arc<dyn ChunkSource + Send + Sync>,
    pub params: ProcessingParameters,
    pub chunk0: ProcessedChunk,
}

/// Holds at most one prebuffered track. Filling and taking are both
/// whole-slot operations — there is never a partially-consumed prebuffer.
#[derive(Default)]
pub struct Prebuffer {
    slot: Mutex<Option<PrebufferedTrack>>,
}

impl Prebuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fill(&self, entry: PrebufferedTrack) {
        *self.slot.lock().unwrap() = Some(entry);
    }

    /// Remove and return the slot's contents only if they're for `track`.
    /// A mismatch (queue changed since the prebuffer was filled) leaves the
    /// slot untouched — the old entry is simply stale and gets overwritten
    /// on the next fill.
    pub fn take_if_matches(&self, track: &TrackRef) -> Option<PrebufferedTrack> {
        let mut slot = self.slot.lock().unwrap();
        if slot.as_ref().map(|p| &p.track) == Some(track) {
            slot.take()
        } else {
            None
        }
    }

    /// Seeking or switching tracks mid-prebuffer invalidates whatever was
    /// in flight (§4.7: "Seeking invalidates the prebuffer").
    pub fn invalidate(&self) {
        *self.slot.lock().unwrap() = None;
    }

    pub fn is_filled_for(&self, track: &TrackRef) -> bool {
        self.slot.lock().unwrap().as_ref().map(|p| &p.track) == Some(track)
    }
}

/// Builds the next track's `ChunkSource` and `ProcessingParameters`.
/// Decoding and the parameter generator both live outside this crate's
/// player module (decoding is host-owned per the core's non-goals;
/// parameters come from [`crate::params::generate`] fed by a fingerprint
/// the host already has cached) — this trait is the seam between them.
pub trait TrackLoader: Send + Sync {
    fn load(&self, track: &TrackRef) -> crate::error::Result<(Arc<dyn ChunkSource + Send + Sync>, ProcessingParameters)>;
}

/// Load and process chunk 0 of `track`, ready to hand to [`Prebuffer::fill`].
pub fn prebuffer_next(
    track: &TrackRef,
    loader: &dyn TrackLoader,
    config: &crate::config::CoreConfig,
) -> crate::error::Result<PrebufferedTrack> {
    let (source, params) = loader.load(track)?;
    let mut pipeline = ChunkPipeline::new(Arc::clone(&source), params.clone(), config);
    let chunk0 = pipeline
        .next_chunk()
        .ok_or_else(|| crate::error::CoreError::ChunkFailed { idx: 0, reason: "empty track".to_string() })??;

    Ok(PrebufferedTrack { track: track.clone(), source, params, chunk0 })
}
