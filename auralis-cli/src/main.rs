//! Command line front end for `auralis-dsp`: fingerprint a file, inspect
//! its sidecar, or run the full chunked mastering pipeline against a WAV
//! file and write the mastered output.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use auralis_dsp::chunk::pipeline::{stitch, ChunkPipeline};
use auralis_dsp::chunk::source::InMemorySource;
use auralis_dsp::params::{preference_for_preset, generate, ProcessingCoordinates};
use auralis_dsp::sidecar::Sidecar;
use auralis_dsp::types::{FingerStrategy, PresetId, StereoSamples};
use auralis_dsp::{fingerprint, CoreConfig};

#[derive(Parser, Debug)]
#[command(name = "auralis")]
#[command(about = "Auralis mastering core — fingerprint, inspect and master audio files")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to a `core.toml` config file; falls back to built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the 25-dimensional fingerprint for a WAV file and write its
    /// `.25d` sidecar next to it.
    Fingerprint {
        /// Path to a WAV file.
        path: PathBuf,

        /// Use the sampled harmonic-analysis acceleration strategy instead
        /// of analyzing the whole track.
        #[arg(long)]
        sampled: bool,
    },

    /// Print a track's existing `.25d` sidecar as JSON.
    ShowSidecar {
        /// Path to the audio file (not the sidecar itself).
        path: PathBuf,
    },

    /// Run the chunked mastering pipeline against a WAV file and write the
    /// mastered result to a new WAV file.
    Master {
        /// Path to the source WAV file.
        input: PathBuf,

        /// Path to write the mastered WAV file.
        output: PathBuf,

        /// Mastering preset to apply.
        #[arg(long, default_value = "adaptive")]
        preset: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "auralis_cli=info".into()))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => CoreConfig::load(path).with_context(|| format!("loading config from {path:?}"))?,
        None => CoreConfig::default(),
    };

    match args.command {
        Command::Fingerprint { path, sampled } => cmd_fingerprint(&path, sampled, &config),
        Command::ShowSidecar { path } => cmd_show_sidecar(&path),
        Command::Master { input, output, preset } => cmd_master(&input, &output, &preset, &config),
    }
}

fn read_wav(path: &PathBuf) -> Result<StereoSamples> {
    let mut reader = hound::WavReader::open(path).with_context(|| format!("opening {path:?}"))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        bail!("{path:?} has no channels");
    }

    let mono_or_interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("reading float samples")?,
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("reading integer samples")?
        }
    };

    let interleaved = if channels == 1 {
        let mut out = Vec::with_capacity(mono_or_interleaved.len() * 2);
        for s in mono_or_interleaved {
            out.push(s);
            out.push(s);
        }
        out
    } else if channels == 2 {
        mono_or_interleaved
    } else {
        let frames = mono_or_interleaved.len() / channels;
        let mut out = Vec::with_capacity(frames * 2);
        for frame in mono_or_interleaved.chunks(channels) {
            out.push(frame[0]);
            out.push(frame[1]);
        }
        out
    };

    Ok(StereoSamples { interleaved, sample_rate: spec.sample_rate })
}

fn write_wav(path: &PathBuf, left: &[f32], right: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec).with_context(|| format!("creating {path:?}"))?;
    for (&l, &r) in left.iter().zip(right.iter()) {
        writer.write_sample(l).context("writing sample")?;
        writer.write_sample(r).context("writing sample")?;
    }
    writer.finalize().context("finalizing wav file")?;
    Ok(())
}

fn cmd_fingerprint(path: &PathBuf, sampled: bool, config: &CoreConfig) -> Result<()> {
    let samples = read_wav(path)?;
    let duration_s = samples.duration_s();
    let sample_rate = samples.sample_rate;

    let strategy = if sampled {
        FingerStrategy::Sampled { interval_s: config.sampling_interval_s }
    } else {
        FingerStrategy::Full
    };

    let fp = fingerprint::analyze(&samples, strategy).with_context(|| format!("analyzing {path:?}"))?;
    tracing::info!(?path, lufs = fp.lufs, tempo_bpm = fp.tempo_bpm, "fingerprint computed");

    let sidecar = Sidecar::new(path, duration_s, sample_rate, 2, fp).context("building sidecar")?;
    sidecar.write(path).with_context(|| format!("writing sidecar for {path:?}"))?;

    println!("{}", serde_json::to_string_pretty(&sidecar)?);
    Ok(())
}

fn cmd_show_sidecar(path: &PathBuf) -> Result<()> {
    let sidecar = Sidecar::read_validated(path).with_context(|| format!("reading sidecar for {path:?}"))?;
    println!("{}", serde_json::to_string_pretty(&sidecar)?);
    Ok(())
}

fn cmd_master(input: &PathBuf, output: &PathBuf, preset: &str, config: &CoreConfig) -> Result<()> {
    let preset_id = PresetId::from_str(preset)
        .with_context(|| format!("unknown preset {preset:?}, expected one of {:?}", PresetId::ALL.map(|p| p.as_str())))?;

    let samples = read_wav(input)?;
    let fp = fingerprint::analyze(&samples, FingerStrategy::Full).with_context(|| format!("analyzing {input:?}"))?;

    let coords = ProcessingCoordinates::from_fingerprint(fp);
    let preference = preference_for_preset(preset_id);
    let params = generate(&coords, &preference);

    let sample_rate = samples.sample_rate;
    let source = Arc::new(InMemorySource::new(samples));
    let mut pipeline = ChunkPipeline::new(source, params, config);

    let mut chunks = Vec::new();
    while let Some(result) = pipeline.next_chunk() {
        chunks.push(result.with_context(|| format!("processing chunk of {input:?}"))?);
    }

    let overlap_frames = (config.chunk_overlap_s * sample_rate as f32) as usize;
    let (left, right) = stitch(&chunks, overlap_frames);

    write_wav(output, &left, &right, sample_rate)?;
    tracing::info!(?input, ?output, preset = preset_id.as_str(), chunks = chunks.len(), "mastering complete");
    println!("mastered {} chunks -> {output:?}", chunks.len());
    Ok(())
}
