//! Criterion benchmarks for clarion-analysis metrics
//!
//! Run with: cargo bench -p clarion-analysis
#![allow(missing_docs)]

use clarion_analysis::resample::Resampler;
use clarion_analysis::{mse, pesq_score, psnr, snr, stoi_score};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::f32::consts::PI;

/// Tone bursts with silent gaps, loosely shaped like speech.
fn generate_speech_like(sample_rate: u32, seconds: f32) -> Vec<f32> {
    let fs = sample_rate as f32;
    (0..(seconds * fs) as usize)
        .map(|i| {
            let t = i as f32 / fs;
            let syllable = (PI * 2.5 * t).sin().max(0.0);
            let tone = (2.0 * PI * 220.0 * t).sin()
                + 0.5 * (2.0 * PI * 660.0 * t).sin()
                + 0.25 * (2.0 * PI * 1870.0 * t).sin();
            0.3 * syllable * tone
        })
        .collect()
}

/// Generate white noise
fn generate_noise(size: usize) -> Vec<f32> {
    let mut state = 0x1234_5678u32;
    (0..size)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state as i32 as f32) / (i32::MAX as f32)
        })
        .collect()
}

fn degrade(clean: &[f32]) -> Vec<f32> {
    clean
        .iter()
        .zip(generate_noise(clean.len()))
        .map(|(c, n)| c + 0.02 * n)
        .collect()
}

fn bench_basic_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("BasicMetrics");

    for &len in &[1600usize, 16000, 160000] {
        let clean = generate_speech_like(16000, len as f32 / 16000.0);
        let noisy = degrade(&clean);

        group.bench_with_input(BenchmarkId::new("mse", len), &len, |b, _| {
            b.iter(|| black_box(mse(black_box(&clean), black_box(&noisy))));
        });
        group.bench_with_input(BenchmarkId::new("snr", len), &len, |b, _| {
            b.iter(|| black_box(snr(black_box(&clean), black_box(&noisy))));
        });
        group.bench_with_input(BenchmarkId::new("psnr", len), &len, |b, _| {
            b.iter(|| black_box(psnr(black_box(&clean), black_box(&noisy), 1.0)));
        });
    }

    group.finish();
}

fn bench_pesq(c: &mut Criterion) {
    let mut group = c.benchmark_group("Pesq");
    group.sample_size(10);

    for &rate in &[8000u32, 16000, 22050] {
        let clean = generate_speech_like(rate, 3.0);
        let noisy = degrade(&clean);
        group.bench_with_input(BenchmarkId::new("3s", rate), &rate, |b, &rate| {
            b.iter(|| black_box(pesq_score(black_box(&clean), black_box(&noisy), rate)));
        });
    }

    group.finish();
}

fn bench_stoi(c: &mut Criterion) {
    let mut group = c.benchmark_group("Stoi");
    group.sample_size(10);

    for &rate in &[10000u32, 16000] {
        let clean = generate_speech_like(rate, 3.0);
        let noisy = degrade(&clean);
        group.bench_with_input(BenchmarkId::new("3s", rate), &rate, |b, &rate| {
            b.iter(|| black_box(stoi_score(black_box(&clean), black_box(&noisy), rate)));
        });
    }

    group.finish();
}

fn bench_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("Resample");

    for &(from, to) in &[(22050u32, 16000u32), (16000, 10000), (44100, 16000)] {
        let input: Vec<f64> = generate_speech_like(from, 1.0)
            .into_iter()
            .map(f64::from)
            .collect();
        let resampler = Resampler::new(from, to);
        group.bench_function(format!("{from}->{to}"), |b| {
            b.iter(|| black_box(resampler.process(black_box(&input))));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_basic_metrics,
    bench_pesq,
    bench_stoi,
    bench_resample
);
criterion_main!(benches);
