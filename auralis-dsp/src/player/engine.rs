//! Gapless player (§3.4, §4.7): the state machine plus the prebuffer and
//! seek/cancellation contract wired to the queue and cache.
//!
//! Audio I/O itself is host-owned (decoding is explicitly out of scope,
//! §1 non-goals); `GaplessPlayer` is a pull engine — the host's audio
//! callback repeatedly calls [`GaplessPlayer::next_chunk`] and writes the
//! returned PCM to its output device.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::cache::manager::CacheManager;
use crate::cache::tier::{CacheKey, Tier};
use crate::cache::worker::CacheWorker;
use crate::chunk::pipeline::{ChunkPipeline, ProcessedChunk};
use crate::chunk::source::ChunkSource;
use crate::config::CoreConfig;
use crate::error::{CoreError, Result};
use crate::params::ProcessingParameters;
use crate::types::{IntensityBucket, PresetId, TrackRef};

use super::notifier::Notifier;
use super::prebuffer::{prebuffer_next, Prebuffer, TrackLoader};
use super::queue::Queue;
use super::state::{PlaybackState, StateEvent};

/// How long `next_chunk` waits on a cold cache before dropping into
/// LOADING and processing synchronously (§4.7 wait-for-chunk timeout).
const WAIT_FOR_CHUNK_TIMEOUT: Duration = Duration::from_millis(150);

struct ActiveTrack {
    track: TrackRef,
    source: Arc<dyn ChunkSource + Send + Sync>,
    params: ProcessingParameters,
    pipeline: ChunkPipeline,
    total_frames: usize,
}

fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Ties the state machine, queue, prebuffer and cache together. One
/// instance per playback session; `Arc`-shared with the prebuffer thread.
pub struct GaplessPlayer {
    state: Mutex<PlaybackState>,
    queue: Mutex<Queue>,
    active: Mutex<Option<ActiveTrack>>,
    position_frames: AtomicU64,
    preset: Mutex<PresetId>,
    intensity: Mutex<IntensityBucket>,
    prebuffer: Prebuffer,
    cache: Arc<CacheManager>,
    worker: Arc<CacheWorker>,
    loader: Arc<dyn TrackLoader>,
    notifier: Notifier,
    config: CoreConfig,
}

impl GaplessPlayer {
    pub fn new(
        config: CoreConfig,
        cache: Arc<CacheManager>,
        worker: Arc<CacheWorker>,
        loader: Arc<dyn TrackLoader>,
        on_event: impl Fn(StateEvent) + Send + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PlaybackState::Stopped),
            queue: Mutex::new(Queue::new()),
            active: Mutex::new(None),
            position_frames: AtomicU64::new(0),
            preset: Mutex::new(PresetId::Adaptive),
            intensity: Mutex::new(IntensityBucket::quantize(0.5)),
            prebuffer: Prebuffer::new(),
            cache,
            worker,
            loader,
            notifier: Notifier::spawn(on_event),
            config,
        })
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.lock().unwrap()
    }

    pub fn position_samples(&self) -> u64 {
        self.position_frames.load(AtomicOrdering::SeqCst)
    }

    pub fn queue_mut(&self) -> std::sync::MutexGuard<'_, Queue> {
        self.queue.lock().unwrap()
    }

    fn transition(&self, next: PlaybackState) {
        let mut state = self.state.lock().unwrap();
        if !state.can_transition_to(next) {
            tracing::warn!(from = ?*state, to = ?next, "rejected invalid playback state transition");
            return;
        }
        *state = next;
        drop(state);
        self.emit();
    }

    fn emit(&self) {
        let active = self.active.lock().unwrap();
        self.notifier.notify(StateEvent {
            state: self.state(),
            position_samples: self.position_samples(),
            duration_samples: active.as_ref().map(|a| a.total_frames as u64).unwrap_or(0),
            current_track_id: active.as_ref().map(|a| a.track.track_id),
            preset: Some(*self.preset.lock().unwrap()),
            timestamp_ms: unix_millis(),
        });
    }

    /// Load `track` and transition STOPPED/PAUSED → LOADING → PLAYING.
    pub fn load_track(self: &Arc<Self>, track: TrackRef) -> Result<()> {
        self.transition(PlaybackState::Loading);
        self.prebuffer.invalidate();

        let (source, params) = self.loader.load(&track)?;
        let pipeline = ChunkPipeline::new(Arc::clone(&source), params.clone(), &self.config);
        let total_frames = source.total_frames();

        *self.active.lock().unwrap() = Some(ActiveTrack { track, source, params, pipeline, total_frames });
        self.position_frames.store(0, AtomicOrdering::SeqCst);
        self.worker.bump_epoch();

        self.transition(PlaybackState::Playing);
        self.try_start_prebuffer();
        Ok(())
    }

    pub fn play(&self) {
        self.transition(PlaybackState::Playing);
    }

    pub fn pause(&self) {
        self.transition(PlaybackState::Paused);
    }

    pub fn stop(&self) {
        self.transition(PlaybackState::Stopped);
        *self.active.lock().unwrap() = None;
        self.prebuffer.invalidate();
        self.position_frames.store(0, AtomicOrdering::SeqCst);
    }

    fn track_params(&self) -> Option<(i64, ProcessingParameters)> {
        self.active.lock().unwrap().as_ref().map(|a| (a.track.track_id, a.params.clone()))
    }

    fn cache_key_for(&self, track_id: i64, chunk_idx: u64) -> CacheKey {
        CacheKey {
            track_id,
            preset: *self.preset.lock().unwrap(),
            chunk_idx,
            intensity: *self.intensity.lock().unwrap(),
        }
    }

    /// Seek (§4.7): snap into the current track, invalidate the
    /// prebuffer, bump the worker epoch so stale in-flight jobs are
    /// discarded, then resume from the target chunk — on demand if it
    /// isn't cached.
    pub fn seek(&self, position_samples: u64) -> Result<()> {
        let mut active = self.active.lock().unwrap();
        let active = active.as_mut().ok_or_else(|| CoreError::ChunkFailed { idx: 0, reason: "no active track".to_string() })?;

        let clamped = position_samples.min(active.total_frames as u64);
        self.position_frames.store(clamped, AtomicOrdering::SeqCst);

        let chunk_duration_frames = (self.config.chunk_duration_s * active.source.sample_rate() as f32) as u64;
        let overlap_frames = (self.config.chunk_overlap_s * active.source.sample_rate() as f32) as u64;
        let hop_frames = chunk_duration_frames.saturating_sub(overlap_frames).max(1);
        let chunk_idx = clamped / hop_frames;

        active.pipeline.seek(chunk_idx);
        drop(active);

        self.prebuffer.invalidate();
        self.worker.bump_epoch();
        self.transition(PlaybackState::Loading);
        self.transition(PlaybackState::Playing);
        Ok(())
    }

    pub fn set_preset(&self, preset: PresetId) {
        *self.preset.lock().unwrap() = preset;
        self.worker.bump_epoch();
        self.prebuffer.invalidate();
    }

    /// Pull the next chunk for playback (§4.7 ordering guarantee: within a
    /// track and preset, strictly ascending `chunk_idx`). `None` signals
    /// track end, at which point the host should call
    /// [`Self::advance_to_next_track`].
    pub fn next_chunk(self: &Arc<Self>) -> Option<Result<ProcessedChunk>> {
        if self.state() != PlaybackState::Playing {
            return None;
        }

        let Some((track_id, _)) = self.track_params() else { return None };

        let mut active = self.active.lock().unwrap();
        let active_ref = active.as_mut()?;
        let started = Instant::now();

        let result = active_ref.pipeline.next_chunk();
        drop(active);

        match result {
            Some(Ok(chunk)) => {
                self.position_frames.fetch_add(chunk.left.len() as u64, AtomicOrdering::SeqCst);
                let key = self.cache_key_for(track_id, chunk.chunk_idx);
                self.cache.mark_playing(&key);
                let _ = self.cache.insert(key, chunk.left.clone(), chunk.right.clone(), Tier::L1, 1.0);

                if started.elapsed() > WAIT_FOR_CHUNK_TIMEOUT {
                    tracing::warn!(elapsed_ms = started.elapsed().as_millis(), "chunk production exceeded wait-for-chunk timeout");
                }
                self.emit();
                Some(Ok(chunk))
            }
            Some(Err(e)) => Some(Err(e)),
            None => None,
        }
    }

    /// Called by the host once `next_chunk` returns `None`: swap in the
    /// prebuffered track if ready, else load the next queue entry cold.
    pub fn advance_to_next_track(self: &Arc<Self>) -> Result<bool> {
        let next_track = { self.queue.lock().unwrap().peek_next().cloned() };
        let Some(next_track) = next_track else {
            self.stop();
            return Ok(false);
        };

        self.queue.lock().unwrap().advance();

        if let Some(prebuffered) = self.prebuffer.take_if_matches(&next_track) {
            let total_frames = prebuffered.source.total_frames();
            let mut pipeline = ChunkPipeline::new(Arc::clone(&prebuffered.source), prebuffered.params.clone(), &self.config);
            pipeline.seek(1); // chunk 0 was already produced for the prebuffer
            *self.active.lock().unwrap() = Some(ActiveTrack {
                track: prebuffered.track,
                source: prebuffered.source,
                params: prebuffered.params,
                pipeline,
                total_frames,
            });
            self.position_frames.store(0, AtomicOrdering::SeqCst);
            self.worker.bump_epoch();
            self.emit();
            self.try_start_prebuffer();
            Ok(true)
        } else {
            self.load_track(next_track)?;
            Ok(true)
        }
    }

    /// Fire off prebuffering of the next queued track in the background.
    /// A no-op if the queue has nothing next or a prebuffer is already in
    /// flight for that track.
    fn try_start_prebuffer(self: &Arc<Self>) {
        if self.state() != PlaybackState::Playing {
            return;
        }
        let Some(next_track) = self.queue.lock().unwrap().peek_next().cloned() else { return };
        if self.prebuffer.is_filled_for(&next_track) {
            return;
        }

        let player = Arc::clone(self);
        std::thread::spawn(move || match prebuffer_next(&next_track, player.loader.as_ref(), &player.config) {
            Ok(entry) => player.prebuffer.fill(entry),
            Err(e) => tracing::warn!(track_id = next_track.track_id, error = %e, "prebuffer failed"),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::source::InMemorySource;
    use crate::dsp::eq::EqCurve;
    use crate::params::{CompressionParams, ExpansionParams, LimiterParams};
    use crate::types::StereoSamples;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    fn flat_params() -> ProcessingParameters {
        ProcessingParameters {
            target_lufs: -14.0,
            peak_target_db: -1.0,
            eq_curve: EqCurve::default(),
            eq_blend: 0.0,
            compression: CompressionParams { ratio: 1.0, threshold_db: 0.0, attack_ms: 10.0, release_ms: 100.0, amount: 0.0 },
            expansion: ExpansionParams { target_crest_increase_db: 0.0, amount: 0.0 },
            limiter: LimiterParams { ceiling_db: -1.0, lookahead_ms: 5.0 },
            stereo_width_target: 0.5,
        }
    }

    struct SineLoader;
    impl TrackLoader for SineLoader {
        fn load(&self, _track: &TrackRef) -> Result<(Arc<dyn ChunkSource + Send + Sync>, ProcessingParameters)> {
            let n = 44100 * 5;
            let interleaved: Vec<f32> = (0..n * 2).map(|i| (i as f32 * 0.0002).sin() * 0.2).collect();
            let source: Arc<dyn ChunkSource + Send + Sync> =
                Arc::new(InMemorySource::new(StereoSamples { interleaved, sample_rate: 44100 }));
            Ok((source, flat_params()))
        }
    }

    struct NoopProducer;
    impl crate::cache::worker::ChunkProducer for NoopProducer {
        fn produce(&self, _key: &CacheKey) -> Result<(Vec<f32>, Vec<f32>)> {
            Ok((vec![0.0; 10], vec![0.0; 10]))
        }
    }

    fn player() -> Arc<GaplessPlayer> {
        let cache = Arc::new(CacheManager::new(1_000_000, 1_000_000, 1_000_000));
        let worker = CacheWorker::new(Arc::clone(&cache), Arc::new(NoopProducer));
        GaplessPlayer::new(CoreConfig::default(), cache, worker, Arc::new(SineLoader), |_event| {})
    }

    fn track(id: i64) -> TrackRef {
        TrackRef { track_id: id, path: PathBuf::from(format!("track-{id}.wav")) }
    }

    #[test]
    fn load_track_transitions_to_playing() {
        let player = player();
        player.load_track(track(1)).unwrap();
        assert_eq!(player.state(), PlaybackState::Playing);
    }

    #[test]
    fn next_chunk_advances_position_monotonically() {
        let player = player();
        player.load_track(track(1)).unwrap();
        let mut last = 0u64;
        for _ in 0..3 {
            let chunk = player.next_chunk().unwrap().unwrap();
            assert!(chunk.chunk_idx as u64 >= last);
            last = chunk.chunk_idx as u64;
        }
    }

    #[test]
    fn stop_resets_position_and_clears_active_track() {
        let player = player();
        player.load_track(track(1)).unwrap();
        player.next_chunk();
        player.stop();
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert_eq!(player.position_samples(), 0);
    }

    #[test]
    fn seek_clamps_to_track_length_and_invalidates_prebuffer() {
        let player = player();
        player.load_track(track(1)).unwrap();
        player.seek(999_999_999).unwrap();
        assert_eq!(player.state(), PlaybackState::Playing);
        assert!(player.position_samples() <= 44100 * 5);
    }

    #[test]
    fn advance_to_next_track_without_queue_entries_stops() {
        let player = player();
        player.load_track(track(1)).unwrap();
        let advanced = player.advance_to_next_track().unwrap();
        assert!(!advanced);
        assert_eq!(player.state(), PlaybackState::Stopped);
    }

    #[test]
    fn event_notifications_fire_on_state_transitions() {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let cache = Arc::new(CacheManager::new(1_000_000, 1_000_000, 1_000_000));
        let worker = CacheWorker::new(Arc::clone(&cache), Arc::new(NoopProducer));
        let player = GaplessPlayer::new(CoreConfig::default(), cache, worker, Arc::new(SineLoader), move |event| {
            seen_clone.lock().unwrap().push(event.state);
            count_clone.fetch_add(1, AtomicOrdering::SeqCst);
        });

        player.load_track(track(1)).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert!(count.load(AtomicOrdering::SeqCst) > 0);
        assert!(seen.lock().unwrap().contains(&PlaybackState::Playing));
    }
}
