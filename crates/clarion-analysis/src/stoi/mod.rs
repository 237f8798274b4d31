//! Short-Time Objective Intelligibility (STOI).
//!
//! Predicts the intelligibility of a degraded speech signal from the
//! correlation of short-time one-third octave band envelopes with those of
//! the clean reference:
//!
//! 1. Resample both signals to 10 kHz.
//! 2. Remove frames where the reference is more than 40 dB below its loudest frame.
//! 3. STFT with 256-sample Hann frames, 50 % overlap, 512-point FFT.
//! 4. Group bins into 15 one-third octave bands from 150 Hz.
//! 5. For every 30-frame segment and band: scale the degraded envelope to the
//!    reference energy, clip it at `β = -15 dB` signal-to-distortion, and take
//!    the correlation coefficient with the reference envelope.
//! 6. Average over bands and segments.
//!
//! Reference: C. H. Taal, R. C. Hendriks, R. Heusdens, J. Jensen, "An Algorithm
//! for Intelligibility Prediction of Time-Frequency Weighted Noisy Speech",
//! IEEE Trans. Audio, Speech, Language Process., 19(7), 2011.

mod bands;
mod frames;

pub use bands::ThirdOctaveBands;
pub use frames::{remove_silent_frames, stft_power};

use clarion_core::align;
use tracing::{debug, warn};

use crate::error::StoiError;
use crate::resample::Resampler;

/// Internal processing rate in Hz.
pub const SAMPLE_RATE: u32 = 10_000;
/// Analysis frame length in samples.
pub const FRAME_LEN: usize = 256;
/// FFT size.
pub const NFFT: usize = 512;
/// Number of one-third octave bands.
pub const NUM_BANDS: usize = 15;
/// Centre of the lowest band in Hz.
pub const MIN_FREQ: f64 = 150.0;
/// Frames per intermediate-intelligibility segment.
pub const SEGMENT_LEN: usize = 30;
/// Lower signal-to-distortion bound in dB.
pub const BETA: f64 = -15.0;
/// Frames quieter than this many dB below the loudest are dropped.
pub const DYN_RANGE: f64 = 40.0;
/// Score returned when fewer than [`SEGMENT_LEN`] frames carry speech.
pub const MIN_SCORE: f64 = 1e-5;

const HOP: usize = FRAME_LEN / 2;

/// Computes STOI for a clean/degraded pair sampled at `sample_rate`.
///
/// Inputs are truncated to their common length first. Returns a value in
/// roughly `[-1, 1]`; `1.0` means the envelopes match exactly. When fewer
/// than [`SEGMENT_LEN`] frames remain after silent-frame removal, a warning
/// is logged and [`MIN_SCORE`] is returned.
///
/// # Errors
///
/// [`StoiError::InvalidSampleRate`] for a zero rate.
pub fn stoi(clean: &[f32], noisy: &[f32], sample_rate: u32) -> Result<f64, StoiError> {
    if sample_rate == 0 {
        return Err(StoiError::InvalidSampleRate(sample_rate));
    }
    let (clean, noisy) = align(clean, noisy);

    let mut x: Vec<f64> = clean.iter().map(|&v| f64::from(v)).collect();
    let mut y: Vec<f64> = noisy.iter().map(|&v| f64::from(v)).collect();
    if sample_rate != SAMPLE_RATE {
        debug!(from = sample_rate, to = SAMPLE_RATE, "resampling for STOI");
        let resampler = Resampler::new(sample_rate, SAMPLE_RATE);
        x = resampler.process(&x);
        y = resampler.process(&y);
    }

    let (x, y) = remove_silent_frames(&x, &y, DYN_RANGE, FRAME_LEN, HOP);

    let bands = ThirdOctaveBands::new(f64::from(SAMPLE_RATE), NFFT, NUM_BANDS, MIN_FREQ);
    let x_tob = band_envelopes(&bands, &stft_power(&x, FRAME_LEN, NFFT, HOP));
    let y_tob = band_envelopes(&bands, &stft_power(&y, FRAME_LEN, NFFT, HOP));

    let num_frames = x_tob.first().map_or(0, Vec::len);
    if num_frames < SEGMENT_LEN {
        warn!(
            frames = num_frames,
            required = SEGMENT_LEN,
            "not enough STFT frames for STOI, returning minimum score"
        );
        return Ok(MIN_SCORE);
    }
    debug!(frames = num_frames, "STOI envelopes ready");

    let clip = 10.0_f64.powf(-BETA / 20.0);
    let num_segments = num_frames - SEGMENT_LEN + 1;
    let mut total = 0.0;
    for end in SEGMENT_LEN..=num_frames {
        for (xb, yb) in x_tob.iter().zip(&y_tob) {
            let segment = end - SEGMENT_LEN..end;
            total += segment_correlation(&xb[segment.clone()], &yb[segment], clip);
        }
    }

    Ok(total / (num_segments * NUM_BANDS) as f64)
}

/// Band envelopes laid out as `[band][frame]`.
fn band_envelopes(bands: &ThirdOctaveBands, spectra: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let mut out = vec![Vec::with_capacity(spectra.len()); bands.len()];
    for spectrum in spectra {
        for (band, mag) in out.iter_mut().zip(bands.magnitudes(spectrum)) {
            band.push(mag);
        }
    }
    out
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|a| a * a).sum::<f64>().sqrt()
}

/// Subtracts the mean and scales to unit norm (plus `EPSILON`).
fn standardize(v: &mut [f64]) {
    let mean = v.iter().sum::<f64>() / v.len() as f64;
    for a in v.iter_mut() {
        *a -= mean;
    }
    let n = norm(v) + f64::EPSILON;
    for a in v.iter_mut() {
        *a /= n;
    }
}

/// Correlation of one band over one segment after normalization and clipping.
fn segment_correlation(x: &[f64], y: &[f64], clip: f64) -> f64 {
    let scale = norm(x) / (norm(y) + f64::EPSILON);
    let mut y_prime: Vec<f64> = y
        .iter()
        .zip(x)
        .map(|(&yv, &xv)| (yv * scale).min(xv * (1.0 + clip)))
        .collect();
    let mut x_centered = x.to_vec();

    standardize(&mut y_prime);
    standardize(&mut x_centered);

    y_prime.iter().zip(&x_centered).map(|(a, b)| a * b).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_correlation_of_identical_envelopes() {
        let x: Vec<f64> = (0..SEGMENT_LEN).map(|i| 1.0 + (i as f64 * 0.7).sin()).collect();
        let clip = 10.0_f64.powf(-BETA / 20.0);
        let r = segment_correlation(&x, &x, clip);
        assert!((r - 1.0).abs() < 1e-9, "r = {r}");
    }

    #[test]
    fn segment_correlation_ignores_gain() {
        let x: Vec<f64> = (0..SEGMENT_LEN).map(|i| 2.0 + (i as f64 * 0.3).cos()).collect();
        let y: Vec<f64> = x.iter().map(|v| v * 0.01).collect();
        let clip = 10.0_f64.powf(-BETA / 20.0);
        assert!((segment_correlation(&x, &y, clip) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn clipping_limits_outliers() {
        let mut x = vec![1.0; SEGMENT_LEN];
        x[0] = 0.1;
        let mut y = vec![0.0; SEGMENT_LEN];
        y[0] = 1000.0;
        let clip = 10.0_f64.powf(-BETA / 20.0);
        // Scaled y[0] would exceed x[0]·(1 + clip) and gets clipped to it.
        let scale = norm(&x) / norm(&y);
        assert!(y[0] * scale > x[0] * (1.0 + clip));
        let r = segment_correlation(&x, &y, clip);
        // The spike sits where x dips: anti-correlated.
        assert!(r.is_finite() && r < 0.0, "r = {r}");
    }

    #[test]
    fn zero_rate_is_rejected() {
        assert_eq!(
            stoi(&[0.0; 10], &[0.0; 10], 0),
            Err(StoiError::InvalidSampleRate(0))
        );
    }

    #[test]
    fn short_input_scores_minimum() {
        // 2000 samples frame to 14 windows, short of one segment.
        let x: Vec<f32> = (0..2000).map(|i| (i as f32 * 0.05).sin()).collect();
        assert_eq!(stoi(&x, &x, SAMPLE_RATE), Ok(MIN_SCORE));
        assert_eq!(stoi(&[], &[], SAMPLE_RATE), Ok(MIN_SCORE));
    }

    #[test]
    fn one_segment_is_enough() {
        // 256 + 30·128 + 1 samples keep 31 frames, whose overlap-add
        // frames to exactly 30 STFT windows.
        let mut state = 0x2545_f491_u32;
        let x: Vec<f32> = (0..256 + 30 * 128 + 1)
            .map(|i| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                let n = (state as i32 as f32) / (i32::MAX as f32);
                n * (1.2 + (i as f32 * 0.003).sin())
            })
            .collect();
        let score = stoi(&x, &x, SAMPLE_RATE).unwrap();
        assert!(score > 0.99, "{score}");
    }
}
