//! Throughput of the chunked mastering pipeline against a synthetic
//! multi-minute track, to keep an eye on real-time margin (§4.4 expects a
//! 30s chunk to process well under its own duration).

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use auralis_dsp::chunk::pipeline::ChunkPipeline;
use auralis_dsp::chunk::source::InMemorySource;
use auralis_dsp::dsp::eq::EqCurve;
use auralis_dsp::params::{CompressionParams, ExpansionParams, LimiterParams, ProcessingParameters};
use auralis_dsp::types::StereoSamples;
use auralis_dsp::CoreConfig;

fn sine_source(freq: f32, sr: u32, seconds: f32) -> Arc<InMemorySource> {
    let n = (sr as f32 * seconds) as usize;
    let mut interleaved = Vec::with_capacity(n * 2);
    for i in 0..n {
        let s = (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin() * 0.3;
        interleaved.push(s);
        interleaved.push(s);
    }
    Arc::new(InMemorySource::new(StereoSamples { interleaved, sample_rate: sr }))
}

fn representative_params() -> ProcessingParameters {
    ProcessingParameters {
        target_lufs: -14.0,
        peak_target_db: -1.0,
        eq_curve: EqCurve { low_shelf_db: 2.0, low_mid_db: 0.0, mid_db: 0.0, high_mid_db: 0.0, high_shelf_db: 1.5 },
        eq_blend: 0.6,
        compression: CompressionParams { ratio: 1.8, threshold_db: -22.0, attack_ms: 10.0, release_ms: 100.0, amount: 0.5 },
        expansion: ExpansionParams { target_crest_increase_db: 0.0, amount: 0.0 },
        limiter: LimiterParams { ceiling_db: -1.0, lookahead_ms: 5.0 },
        stereo_width_target: 0.75,
    }
}

fn bench_three_minute_track(c: &mut Criterion) {
    let config = CoreConfig::default();

    c.bench_function("chunk_pipeline_3min_track", |b| {
        b.iter(|| {
            let source = sine_source(440.0, 44100, 180.0);
            let mut pipeline = ChunkPipeline::new(source, representative_params(), &config);
            let mut total_frames = 0usize;
            while let Some(result) = pipeline.next_chunk() {
                let chunk = result.expect("chunk processing should not fail on synthetic audio");
                total_frames += chunk.left.len();
            }
            black_box(total_frames);
        });
    });
}

fn bench_single_chunk(c: &mut Criterion) {
    let config = CoreConfig::default();

    c.bench_function("chunk_pipeline_single_30s_chunk", |b| {
        b.iter(|| {
            let source = sine_source(440.0, 44100, 30.0);
            let mut pipeline = ChunkPipeline::new(source, representative_params(), &config);
            let chunk = pipeline.next_chunk().unwrap().expect("chunk processing should not fail");
            black_box(chunk);
        });
    });
}

criterion_group!(benches, bench_three_minute_track, bench_single_chunk);
criterion_main!(benches);
