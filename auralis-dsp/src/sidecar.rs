//! `.25d` sidecar files (§4.9, §6.3): a JSON file next to the audio file
//! caching its fingerprint and processing analysis, written atomically
//! (tmp file + `fsync` + rename) so readers never observe a half-written
//! file — per the design notes' "single-writer per path, lock-free
//! readers via atomic file-rename" rule.

use std::path::Path;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CoreError, Result};
use crate::fingerprint::Fingerprint;

pub const SUPPORTED_FORMAT_VERSIONS: [&str; 1] = ["1.0"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFileInfo {
    pub path: String,
    pub size_bytes: u64,
    pub modified_at: u64,
    pub checksum_sha256: String,
    pub duration_s: f32,
    pub sample_rate: u32,
    pub channels: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintRecord {
    pub version: String,
    pub dimensions: usize,
    #[serde(flatten)]
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingCache {
    pub content_analysis: serde_json::Value,
    pub eq_analysis: serde_json::Value,
    pub recommended_preset: String,
    pub last_processed_at: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<u32>,
    pub track_number: Option<u32>,
    pub genre: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sidecar {
    pub format_version: String,
    pub audio_file: AudioFileInfo,
    pub fingerprint: FingerprintRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_cache: Option<ProcessingCache>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TrackMetadata>,
}

/// Optional seam (§6.4) for a host that wants the logical fingerprint
/// schema backed by its own database instead of (or in addition to)
/// sidecar files. This crate ships no implementation — persistence via
/// sidecars alone is the default and sufficient path.
pub trait FingerprintStore: Send + Sync {
    fn put(&self, track: &crate::types::TrackRef, record: &FingerprintRecord) -> Result<()>;
    fn get(&self, track: &crate::types::TrackRef) -> Result<Option<FingerprintRecord>>;
}

fn sidecar_path(audio_path: &Path) -> std::path::PathBuf {
    let mut p = audio_path.as_os_str().to_owned();
    p.push(".25d");
    std::path::PathBuf::from(p)
}

pub fn checksum_sha256(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

fn unix_time(t: SystemTime) -> u64 {
    t.duration_since(SystemTime::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

impl Sidecar {
    pub fn new(
        audio_path: &Path,
        duration_s: f32,
        sample_rate: u32,
        channels: u8,
        fingerprint: Fingerprint,
    ) -> Result<Self> {
        let meta = std::fs::metadata(audio_path)?;
        let checksum = checksum_sha256(audio_path)?;

        Ok(Self {
            format_version: "1.0".to_string(),
            audio_file: AudioFileInfo {
                path: audio_path.to_string_lossy().to_string(),
                size_bytes: meta.len(),
                modified_at: unix_time(meta.modified()?),
                checksum_sha256: checksum,
                duration_s,
                sample_rate,
                channels,
            },
            fingerprint: FingerprintRecord {
                version: crate::fingerprint::FINGERPRINT_VERSION.to_string(),
                dimensions: crate::fingerprint::FINGERPRINT_DIMENSIONS,
                fingerprint,
            },
            processing_cache: None,
            metadata: None,
        })
    }

    /// Atomic write: serialize to `<name>.25d.tmp`, `fsync`, then rename
    /// over the final path. UTF-8, trailing newline, LF line endings.
    pub fn write(&self, audio_path: &Path) -> Result<()> {
        let path = sidecar_path(audio_path);
        let tmp_path = path.with_extension("25d.tmp");

        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');

        {
            let file = std::fs::File::create(&tmp_path)?;
            use std::io::Write;
            let mut writer = std::io::BufWriter::new(&file);
            writer.write_all(json.as_bytes())?;
            writer.flush()?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    pub fn read(audio_path: &Path) -> Result<Self> {
        let path = sidecar_path(audio_path);
        let text = std::fs::read_to_string(&path)?;
        let sidecar: Sidecar = serde_json::from_str(&text)?;
        Ok(sidecar)
    }

    /// Validity (§4.9): exists (implied by successful [`Self::read`]),
    /// `format_version` supported, checksum matches the audio, modified_at
    /// matches, required fingerprint fields present and finite.
    pub fn validate(&self, audio_path: &Path) -> Result<()> {
        if !SUPPORTED_FORMAT_VERSIONS.contains(&self.format_version.as_str()) {
            return Err(CoreError::SidecarInvalid {
                reason: format!("unsupported format_version {}", self.format_version),
            });
        }

        let meta = std::fs::metadata(audio_path)?;
        if unix_time(meta.modified()?) != self.audio_file.modified_at {
            return Err(CoreError::SidecarInvalid { reason: "modified_at mismatch".to_string() });
        }

        let checksum = checksum_sha256(audio_path)?;
        if checksum != self.audio_file.checksum_sha256 {
            return Err(CoreError::SidecarInvalid { reason: "checksum mismatch".to_string() });
        }

        if !self.fingerprint.fingerprint.is_valid() {
            return Err(CoreError::SidecarInvalid { reason: "fingerprint fields invalid".to_string() });
        }

        Ok(())
    }

    /// Read and validate in one step; on any invalidity the sidecar is
    /// deleted so a fresh one can be regenerated (§4.9, §7 `SidecarInvalid`
    /// recovery policy: "regenerate silently").
    pub fn read_validated(audio_path: &Path) -> Result<Self> {
        let sidecar = Self::read(audio_path)?;
        match sidecar.validate(audio_path) {
            Ok(()) => Ok(sidecar),
            Err(e) => {
                let _ = std::fs::remove_file(sidecar_path(audio_path));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::HarmonicAnalysisMethod;

    fn sample_fingerprint() -> Fingerprint {
        Fingerprint {
            sub_bass_pct: 10.0,
            bass_pct: 20.0,
            low_mid_pct: 15.0,
            mid_pct: 20.0,
            upper_mid_pct: 15.0,
            presence_pct: 12.0,
            air_pct: 8.0,
            lufs: -14.0,
            crest_db: 12.0,
            bass_mid_ratio: 1.0,
            tempo_bpm: 120.0,
            rhythm_stability: 0.8,
            transient_density: 0.4,
            silence_ratio: 0.05,
            spectral_centroid: 0.4,
            spectral_rolloff: 0.6,
            spectral_flatness: 0.3,
            harmonic_ratio: 0.7,
            pitch_stability: 0.6,
            chroma_energy: 0.5,
            dynamic_range_variation: 0.2,
            loudness_variation_std: 1.0,
            peak_consistency: 0.8,
            stereo_width: 0.3,
            phase_correlation: 0.9,
            harmonic_analysis_method: HarmonicAnalysisMethod::Full,
            sampling_interval_s: None,
            confidence: 1.0,
        }
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let audio_path = dir.path().join("track.wav");
        std::fs::write(&audio_path, b"fake wav bytes").unwrap();

        let sidecar = Sidecar::new(&audio_path, 180.0, 44100, 2, sample_fingerprint()).unwrap();
        sidecar.write(&audio_path).unwrap();

        let read_back = Sidecar::read(&audio_path).unwrap();
        assert_eq!(read_back.format_version, sidecar.format_version);
        assert_eq!(read_back.audio_file.checksum_sha256, sidecar.audio_file.checksum_sha256);
        assert_eq!(read_back.fingerprint.fingerprint, sidecar.fingerprint.fingerprint);
    }

    #[test]
    fn validate_detects_modified_audio() {
        let dir = tempfile::tempdir().unwrap();
        let audio_path = dir.path().join("track.wav");
        std::fs::write(&audio_path, b"original bytes").unwrap();

        let sidecar = Sidecar::new(&audio_path, 180.0, 44100, 2, sample_fingerprint()).unwrap();
        sidecar.write(&audio_path).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));
        std::fs::write(&audio_path, b"changed bytes, different checksum").unwrap();

        let err = Sidecar::read_validated(&audio_path).unwrap_err();
        assert!(matches!(err, CoreError::SidecarInvalid { .. }));
        // Invalid sidecar should have been deleted.
        assert!(Sidecar::read(&audio_path).is_err());
    }

    #[test]
    fn unsupported_format_version_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let audio_path = dir.path().join("track.wav");
        std::fs::write(&audio_path, b"bytes").unwrap();

        let mut sidecar = Sidecar::new(&audio_path, 180.0, 44100, 2, sample_fingerprint()).unwrap();
        sidecar.format_version = "9.9".to_string();
        assert!(sidecar.validate(&audio_path).is_err());
    }
}
