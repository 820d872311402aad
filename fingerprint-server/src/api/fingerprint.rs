use axum::{Json, http::StatusCode};
use std::time::Instant;

use auralis_dsp::types::FingerStrategy;

use crate::analysis::analyzer::analyze_fingerprint;
use crate::audio::loader::load_audio;
use crate::error::Result;
use crate::models::request::{AudioMetadata, FingerprintRequest, FingerprintResponse};

pub async fn fingerprint_handler(
    Json(req): Json<FingerprintRequest>,
) -> Result<(StatusCode, Json<FingerprintResponse>)> {
    let start = Instant::now();

    tracing::debug!("processing fingerprint request for track {}: {}", req.track_id, req.filepath);

    let audio_data = load_audio(&req.filepath).await?;

    tracing::debug!(
        "loaded audio: {} frames at {} Hz, {} channels",
        audio_data.samples.frame_count(),
        audio_data.samples.sample_rate,
        audio_data.channels
    );

    let samples = audio_data.samples.clone();
    let fingerprint = tokio::task::spawn_blocking(move || analyze_fingerprint(&samples, FingerStrategy::Full))
        .await
        .map_err(|e| crate::error::FingerprintError::AnalysisError(format!("task join error: {e}")))??;

    tracing::debug!("fingerprint analysis complete for track {}", req.track_id);

    let duration_sec = audio_data.samples.duration_s();

    let response = FingerprintResponse {
        track_id: req.track_id,
        fingerprint,
        metadata: AudioMetadata {
            duration_sec,
            sample_rate: audio_data.samples.sample_rate,
            channels: audio_data.channels,
            format: infer_format(&req.filepath),
        },
        processing_time_ms: start.elapsed().as_millis(),
    };

    tracing::info!("fingerprinted track {} in {}ms", req.track_id, response.processing_time_ms);

    Ok((StatusCode::OK, Json(response)))
}

fn infer_format(filepath: &str) -> String {
    filepath.split('.').last().unwrap_or("unknown").to_lowercase()
}
