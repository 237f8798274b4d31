//! Clarion Analysis - objective speech and audio quality metrics
//!
//! Every metric compares a clean reference against a degraded signal. Inputs
//! of different lengths are silently truncated to their common prefix.
//!
//! - [`metrics`] - Sample-domain metrics: [`snr`], [`psnr`], [`mse`]
//! - [`pesq`] - Perceptual speech quality, MOS-LQO scale ([`pesq_score`])
//! - [`stoi`] - Short-time objective intelligibility ([`stoi_score`])
//! - [`report`] - Run a configured set of metrics in one pass
//! - [`fft`] - FFT wrapper with windowing functions
//! - [`resample`] - Rational polyphase resampler
//! - [`xcorr`] - Cross-correlation for delay estimation
//!
//! ## Example
//!
//! ```rust
//! use clarion_analysis::{mse, psnr, snr};
//!
//! let clean = [1.0_f32, -1.0, 1.0, -1.0];
//! let noisy = [0.0_f32; 4];
//!
//! assert_eq!(mse(&clean, &noisy), 1.0);
//! assert!(snr(&clean, &noisy).abs() < 1e-6);
//! assert_eq!(psnr(&clean, &noisy, 1.0), 0.0);
//! assert_eq!(psnr(&clean, &clean, 1.0), 100.0);
//! ```
//!
//! ## Perceptual scores
//!
//! ```rust,ignore
//! use clarion_analysis::{pesq_score, stoi_score};
//!
//! // Any rate works for PESQ; rates other than 8/16 kHz are resampled to 16 kHz.
//! let mos = pesq_score(&clean, &degraded, 22050)?;
//! let intelligibility = stoi_score(&clean, &degraded, 22050)?;
//! ```

mod error;

pub mod fft;
pub mod metrics;
pub mod pesq;
pub mod report;
pub mod resample;
pub mod stoi;
pub mod xcorr;

pub use error::{Error, PesqError, Result, StoiError};
pub use metrics::{DEFAULT_MAX_VAL, PSNR_PERFECT, SNR_EPSILON, mse, psnr, psnr_default, snr};
pub use pesq::PesqMode;
pub use report::{MetricOutcome, QualityReport, evaluate};

/// PESQ MOS-LQO of `noisy` against `clean`.
///
/// 16 kHz input is scored wideband and 8 kHz narrowband. Any other rate is
/// resampled to 16 kHz and scored wideband.
///
/// # Errors
///
/// Any [`PesqError`] from dispatch or scoring, unchanged.
pub fn pesq_score(
    clean: &[f32],
    noisy: &[f32],
    sample_rate: u32,
) -> std::result::Result<f64, PesqError> {
    let input = pesq::prepare(clean, noisy, sample_rate)?;
    pesq::pesq(&input.reference, &input.degraded, input.sample_rate, input.mode)
}

/// STOI of `noisy` against `clean`, roughly in `[-1, 1]`.
///
/// # Errors
///
/// Any [`StoiError`] from scoring, unchanged.
pub fn stoi_score(
    clean: &[f32],
    noisy: &[f32],
    sample_rate: u32,
) -> std::result::Result<f64, StoiError> {
    stoi::stoi(clean, noisy, sample_rate)
}
