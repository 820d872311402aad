//! Decodes a file on disk into [`auralis_dsp::StereoSamples`] via
//! `symphonia`. Compressed-format decoding is explicitly a host concern
//! (the core crate only ever sees already-decoded PCM), so this module
//! is the one place in the service that owns a decoder.

use auralis_dsp::StereoSamples;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, ReadOnlySource};
use symphonia::core::probe::Hint;

use crate::error::{FingerprintError, Result};

#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: StereoSamples,
    pub channels: u16,
}

/// Load audio from a file path, downmixing/upmixing to stereo. Runs
/// synchronously; callers on the async side wrap it in
/// `spawn_blocking`.
pub async fn load_audio(filepath: &str) -> Result<DecodedAudio> {
    if !std::path::Path::new(filepath).exists() {
        return Err(FingerprintError::FileNotFound(filepath.to_string()));
    }

    let filepath = filepath.to_string();
    tokio::task::spawn_blocking(move || load_audio_sync(&filepath))
        .await
        .map_err(|e| FingerprintError::InternalError(format!("task join error: {e}")))?
}

fn load_audio_sync(filepath: &str) -> Result<DecodedAudio> {
    tracing::debug!(filepath, "decoding audio file");

    let file = std::fs::File::open(filepath)
        .map_err(|e| FingerprintError::FileNotFound(format!("{filepath}: {e}")))?;
    let source = ReadOnlySource::new(file);
    let mss = MediaSourceStream::new(Box::new(source), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = std::path::Path::new(filepath).extension() {
        hint.with_extension(&ext.to_string_lossy());
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &Default::default())
        .map_err(|e| FingerprintError::UnsupportedFormat(format!("probe failed: {e}")))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.sample_rate.is_some())
        .ok_or_else(|| FingerprintError::InvalidAudio("no audio tracks found".to_string()))?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| FingerprintError::InvalidAudio("no sample rate found".to_string()))?;
    let channels = track
        .codec_params
        .channels
        .ok_or_else(|| FingerprintError::InvalidAudio("no channel info found".to_string()))?
        .count() as u16;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| FingerprintError::DecodingError(format!("decoder init: {e}")))?;

    let mut interleaved_stereo: Vec<f32> = Vec::new();
    loop {
        match format.next_packet() {
            Ok(packet) => match decoder.decode(&packet) {
                Ok(buf) => collect_stereo(&mut interleaved_stereo, &buf, channels as usize),
                Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
                Err(e) => return Err(FingerprintError::DecodingError(e.to_string())),
            },
            Err(symphonia::core::errors::Error::IoError(_)) => break,
            Err(symphonia::core::errors::Error::Unsupported(_)) => break,
            Err(e) => return Err(FingerprintError::DecodingError(e.to_string())),
        }
    }

    if interleaved_stereo.is_empty() {
        return Err(FingerprintError::InvalidAudio("no audio samples decoded".to_string()));
    }
    if !interleaved_stereo.iter().all(|s| s.is_finite()) {
        return Err(FingerprintError::InvalidAudio("audio contains NaN or infinite values".to_string()));
    }

    tracing::debug!(frames = interleaved_stereo.len() / 2, sample_rate, "decode complete");

    Ok(DecodedAudio { samples: StereoSamples { interleaved: interleaved_stereo, sample_rate }, channels })
}

/// Append one decoded buffer's frames to `out` as interleaved stereo,
/// downmixing mono by duplication and >2-channel audio by averaging the
/// extra channels into L/R.
fn collect_stereo(out: &mut Vec<f32>, buf: &AudioBufferRef, channels: usize) {
    macro_rules! process_buffer {
        ($buf:expr, $norm_fn:expr) => {{
            let n_frames = $buf.frames();
            if n_frames == 0 {
                return;
            }
            let ch_count = std::cmp::min(channels, $buf.spec().channels.count()).max(1);
            for frame_idx in 0..n_frames {
                if ch_count == 1 {
                    let s = $norm_fn($buf.chan(0)[frame_idx]);
                    out.push(s);
                    out.push(s);
                } else {
                    let l = $norm_fn($buf.chan(0)[frame_idx]);
                    let r = $norm_fn($buf.chan(1)[frame_idx]);
                    out.push(l);
                    out.push(r);
                }
            }
        }};
    }

    match buf {
        AudioBufferRef::F32(b) => process_buffer!(b, |v: f32| v),
        AudioBufferRef::F64(b) => process_buffer!(b, |v: f64| v as f32),
        AudioBufferRef::S8(b) => process_buffer!(b, |v: i8| v as f32 / i8::MAX as f32),
        AudioBufferRef::S16(b) => process_buffer!(b, |v: i16| v as f32 / i16::MAX as f32),
        AudioBufferRef::S24(b) => {
            process_buffer!(b, |v: symphonia::core::sample::i24| v.into_i32() as f32 / (2_i32.pow(23) - 1) as f32)
        }
        AudioBufferRef::S32(b) => process_buffer!(b, |v: i32| v as f32 / i32::MAX as f32),
        AudioBufferRef::U8(b) => process_buffer!(b, |v: u8| ((v as f32 / 255.0) - 0.5) * 2.0),
        AudioBufferRef::U16(b) => process_buffer!(b, |v: u16| ((v as f32 / 65535.0) - 0.5) * 2.0),
        AudioBufferRef::U24(b) => process_buffer!(b, |v: symphonia::core::sample::u24| {
            ((v.into_u32() as f32 / (2_u32.pow(24) - 1) as f32) - 0.5) * 2.0
        }),
        AudioBufferRef::U32(b) => process_buffer!(b, |v: u32| ((v as f32 / u32::MAX as f32) - 0.5) * 2.0),
    }
}
