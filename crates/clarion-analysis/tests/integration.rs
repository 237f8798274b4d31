//! Integration tests for clarion-analysis.
//!
//! Runs the public metric entry points on synthetic speech-like material:
//! tone bursts separated by silence for PESQ, modulated noise for STOI.

use clarion_analysis::pesq::{self, PesqMode};
use clarion_analysis::{
    MetricOutcome, PesqError, StoiError, evaluate, mse, pesq_score, psnr, snr, stoi, stoi_score,
};
use clarion_config::{Metric, QualitySettings};

const TAU: f64 = std::f64::consts::TAU;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("clarion_analysis=debug")
        .with_test_writer()
        .try_init();
}

/// Deterministic white noise in [-1, 1) (xorshift).
fn noise(len: usize, seed: u64) -> Vec<f32> {
    let mut state = seed.max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 11) as f32 / (1u64 << 52) as f32 - 1.0
        })
        .collect()
}

/// Speech-like test material: inharmonic tone bursts with Hann envelopes,
/// separated by silence.
fn bursts(sample_rate: u32, count: usize) -> Vec<f32> {
    let fs = f64::from(sample_rate);
    let burst = (0.3 * fs) as usize;
    let gap = (0.2 * fs) as usize;
    let mut out = vec![0.0_f32; gap];
    for k in 0..count {
        let shift = 1.0 + 0.07 * k as f64;
        out.extend((0..burst).map(|i| {
            let t = i as f64 / fs;
            let env = (std::f64::consts::PI * i as f64 / burst as f64).sin().powi(2);
            let tone = 0.5 * (TAU * 310.0 * shift * t).sin()
                + 0.3 * (TAU * 740.0 * shift * t).sin()
                + 0.2 * (TAU * 1290.0 * shift * t).sin()
                + 0.1 * (TAU * 2630.0 * shift * t).sin();
            (0.5 * env * tone) as f32
        }));
        out.extend(std::iter::repeat_n(0.0, gap));
    }
    out
}

fn delayed(x: &[f32], delay: usize) -> Vec<f32> {
    let mut y = vec![0.0; delay];
    y.extend_from_slice(&x[..x.len() - delay]);
    y
}

fn add(x: &[f32], y: &[f32], gain: f32) -> Vec<f32> {
    x.iter().zip(y).map(|(a, b)| a + gain * b).collect()
}

/// Noise with a syllable-rate (4 Hz) envelope, the kind of material STOI
/// expects.
fn modulated_noise(sample_rate: u32, seconds: f64, seed: u64) -> Vec<f32> {
    let fs = f64::from(sample_rate);
    let len = (seconds * fs) as usize;
    noise(len, seed)
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            let env = 0.55 + 0.45 * (TAU * 4.0 * i as f64 / fs).sin();
            0.3 * v * env as f32
        })
        .collect()
}

// ============================================================================
// 1. Sample-domain metrics
// ============================================================================

#[test]
fn identical_signals_are_perfect() {
    let x = [1.0_f32, 1.0, 1.0, 1.0];
    assert_eq!(mse(&x, &x), 0.0);
    assert_eq!(psnr(&x, &x, 1.0), 100.0);
    // Bounded by the epsilon in the denominator.
    assert!((snr(&x, &x) - 100.0).abs() < 1e-6);
}

#[test]
fn alternating_against_silence() {
    let clean = [1.0_f32, -1.0, 1.0, -1.0];
    let noisy = [0.0_f32; 4];
    assert_eq!(mse(&clean, &noisy), 1.0);
    assert!(snr(&clean, &noisy).abs() < 1e-6);
    assert_eq!(psnr(&clean, &noisy, 1.0), 0.0);
}

#[test]
fn longer_input_is_truncated() {
    let clean = [0.5_f32, -0.25, 0.75];
    let noisy = [0.5_f32, 0.0, 0.75, 9.0, 9.0];
    assert_eq!(mse(&clean, &noisy), mse(&clean, &noisy[..3]));
    assert_eq!(snr(&clean, &noisy), snr(&clean, &noisy[..3]));
    assert_eq!(psnr(&clean, &noisy, 1.0), psnr(&clean, &noisy[..3], 1.0));
}

#[test]
fn empty_input_is_nan() {
    assert!(mse(&[], &[1.0]).is_nan());
    assert!(snr(&[], &[]).is_nan());
    assert!(psnr(&[1.0], &[], 1.0).is_nan());
}

// ============================================================================
// 2. PESQ
// ============================================================================

#[test]
fn pesq_identical_narrowband_scores_ceiling() {
    init_tracing();
    let x = bursts(8000, 4);
    let score = pesq_score(&x, &x, 8000).unwrap();
    assert!((score - pesq::max_score(PesqMode::Narrowband)).abs() < 1e-6, "{score}");
}

#[test]
fn pesq_identical_wideband_scores_ceiling() {
    let x = bursts(16000, 4);
    let score = pesq_score(&x, &x, 16000).unwrap();
    assert!((score - pesq::max_score(PesqMode::Wideband)).abs() < 1e-6, "{score}");
}

#[test]
fn pesq_ignores_a_constant_delay() {
    let x = bursts(8000, 4);
    let y = delayed(&x, 45);
    let score = pesq_score(&x, &y, 8000).unwrap();
    assert!(score > pesq::max_score(PesqMode::Narrowband) - 0.1, "{score}");
}

#[test]
fn pesq_drops_with_added_noise() {
    let x = bursts(8000, 4);
    let n = noise(x.len(), 7);
    let light = pesq_score(&x, &add(&x, &n, 0.02), 8000).unwrap();
    let heavy = pesq_score(&x, &add(&x, &n, 0.2), 8000).unwrap();
    let ceiling = pesq::max_score(PesqMode::Narrowband);
    assert!(light < ceiling - 0.2, "light noise scored {light}");
    assert!(heavy < light, "heavy {heavy} vs light {light}");
    assert!(heavy >= 0.999);
}

#[test]
fn pesq_resamples_other_rates_to_wideband() {
    let x = bursts(22050, 3);
    let prepared = pesq::prepare(&x, &x, 22050).unwrap();
    assert!(prepared.is_resampled());
    assert_eq!(prepared.mode, PesqMode::Wideband);
    assert_eq!(prepared.sample_rate, 16000);
    assert_eq!(prepared.reference.len(), (x.len() * 320).div_ceil(441));

    let score = pesq_score(&x, &x, 22050).unwrap();
    assert!((score - pesq::max_score(PesqMode::Wideband)).abs() < 1e-6, "{score}");
}

#[test]
fn pesq_errors_propagate() {
    let silence = vec![0.0_f32; 16000];
    assert_eq!(pesq_score(&silence, &silence, 16000), Err(PesqError::NoUtterances));

    let short = bursts(8000, 1);
    assert!(matches!(
        pesq_score(&short[..1000], &short[..1000], 8000),
        Err(PesqError::BufferTooShort { len: 1000, min: 2000 })
    ));

    assert!(matches!(
        pesq_score(&short, &short, 0),
        Err(PesqError::InvalidSampleRate { sample_rate: 0, .. })
    ));
}

// ============================================================================
// 3. STOI
// ============================================================================

#[test]
fn stoi_identical_is_one() {
    let x = modulated_noise(10000, 3.0, 3);
    let score = stoi_score(&x, &x, 10000).unwrap();
    assert!(score > 0.99, "{score}");
    assert!(score <= 1.0 + 1e-9);
}

#[test]
fn stoi_resamples_internally() {
    let x = modulated_noise(16000, 3.0, 5);
    let score = stoi_score(&x, &x, 16000).unwrap();
    assert!(score > 0.99, "{score}");
}

#[test]
fn stoi_drops_with_added_noise() {
    let x = modulated_noise(10000, 3.0, 11);
    let n = noise(x.len(), 99);
    let light = stoi_score(&x, &add(&x, &n, 0.03), 10000).unwrap();
    let heavy = stoi_score(&x, &add(&x, &n, 0.6), 10000).unwrap();
    assert!(light > heavy, "light {light} vs heavy {heavy}");
    assert!(heavy < 0.9, "{heavy}");
}

#[test]
fn stoi_short_input_scores_minimum() {
    let x = modulated_noise(10000, 0.2, 1);
    assert_eq!(stoi_score(&x, &x, 10000), Ok(stoi::MIN_SCORE));
    assert_eq!(stoi::MIN_SCORE, 1e-5);
    assert_eq!(stoi_score(&x, &x, 0), Err(StoiError::InvalidSampleRate(0)));
}

// ============================================================================
// 4. Report
// ============================================================================

#[test]
fn report_runs_every_metric() {
    let x = bursts(16000, 4);
    let y = add(&x, &noise(x.len(), 21), 0.01);
    let report = evaluate(&x, &y, &QualitySettings::new(16000)).unwrap();

    assert_eq!(report.samples, x.len());
    assert!(report.mse.unwrap() > 0.0);
    assert!(report.snr.unwrap() > 0.0);
    assert!(report.psnr.unwrap() > report.snr.unwrap());
    let pesq = report.pesq.as_ref().and_then(MetricOutcome::score).unwrap();
    assert!(pesq > 1.0 && pesq <= pesq::max_score(PesqMode::Wideband));
    assert!(report.stoi.as_ref().and_then(MetricOutcome::score).is_some());
}

#[test]
fn report_from_toml_settings() {
    let settings = QualitySettings::from_toml(
        r#"
        sample_rate = 8000
        metrics = ["mse", "pesq"]

        [reference_lowpass]
        cutoff_hz = 3400.0
        "#,
    )
    .unwrap();
    let x = bursts(8000, 4);
    let report = evaluate(&x, &x, &settings).unwrap();

    assert!(settings.is_enabled(Metric::Pesq));
    assert_eq!(report.snr, None);
    assert_eq!(report.reference_filter.as_ref().map(|f| f.path), Some("zero_phase"));
    // The conditioned reference differs from the raw degraded signal.
    assert!(report.mse.unwrap() > 0.0);
    assert!(matches!(report.pesq, Some(MetricOutcome::Score(_))));
}
