//! Sample-domain comparison metrics: MSE, SNR and PSNR.
//!
//! All three compare a clean reference against a degraded signal over their
//! common prefix (see [`clarion_core::align`]) and accumulate in `f64`. An
//! empty prefix yields `NaN`: the mean of nothing is undefined.

use clarion_core::align;

/// Added to the noise power in [`snr`] so identical signals stay finite.
pub const SNR_EPSILON: f64 = 1e-10;

/// Value reported by [`psnr`] when the signals are identical.
pub const PSNR_PERFECT: f64 = 100.0;

/// Peak value for [`psnr_default`]: full scale of normalized float audio.
pub const DEFAULT_MAX_VAL: f64 = 1.0;

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    values.sum::<f64>() / n as f64
}

/// Mean squared error between two signals.
///
/// Symmetric in its arguments. Zero only for identical prefixes.
///
/// ```rust
/// use clarion_analysis::mse;
///
/// assert_eq!(mse(&[1.0, -1.0, 1.0, -1.0], &[0.0; 4]), 1.0);
/// ```
pub fn mse(clean: &[f32], noisy: &[f32]) -> f64 {
    let (clean, noisy) = align(clean, noisy);
    mean(
        clean
            .iter()
            .zip(noisy)
            .map(|(&c, &n)| (f64::from(c) - f64::from(n)).powi(2)),
    )
}

/// Signal-to-noise ratio in dB, treating `noisy - clean` as the noise.
///
/// ```text
/// SNR = 10·log10( mean(clean²) / (mse + ε) )
/// ```
pub fn snr(clean: &[f32], noisy: &[f32]) -> f64 {
    let (clean, noisy) = align(clean, noisy);
    let signal_power = mean(clean.iter().map(|&c| f64::from(c).powi(2)));
    let noise_power = mse(clean, noisy);
    10.0 * (signal_power / (noise_power + SNR_EPSILON)).log10()
}

/// Peak signal-to-noise ratio in dB for a signal whose peak is `max_val`.
///
/// ```text
/// PSNR = 20·log10( max_val / sqrt(mse) )
/// ```
///
/// Returns exactly [`PSNR_PERFECT`] when the signals are identical, instead
/// of infinity.
pub fn psnr(clean: &[f32], noisy: &[f32], max_val: f64) -> f64 {
    let error = mse(clean, noisy);
    if error == 0.0 {
        return PSNR_PERFECT;
    }
    20.0 * (max_val / error.sqrt()).log10()
}

/// [`psnr`] with `max_val = 1.0`.
pub fn psnr_default(clean: &[f32], noisy: &[f32]) -> f64 {
    psnr(clean, noisy, DEFAULT_MAX_VAL)
}
