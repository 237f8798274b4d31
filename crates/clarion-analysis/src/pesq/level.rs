//! Level alignment and input filtering.
//!
//! Both signals are scaled so their power in the speech band equals a fixed
//! target, then passed through the listening-device model: an IRS-like
//! handset receive characteristic in narrowband mode, a 100 Hz high-pass in
//! wideband mode.

use clarion_core::{butterworth, sosfilt};
use rustfft::num_complex::Complex;
use tracing::warn;

use super::PesqMode;
use crate::fft::Fft;

/// Average power both signals are scaled to.
pub(crate) const TARGET_POWER: f64 = 1e7;

/// Narrowband level measurement band, gain in dB over frequency in Hz.
const NARROWBAND_LEVEL_DB: [(f64, f64); 6] = [
    (0.0, -500.0),
    (250.0, -500.0),
    (300.0, 0.0),
    (3250.0, 0.0),
    (3300.0, -500.0),
    (8000.0, -500.0),
];

/// Wideband level measurement band.
const WIDEBAND_LEVEL_DB: [(f64, f64); 6] = [
    (0.0, -500.0),
    (50.0, -500.0),
    (100.0, 0.0),
    (7000.0, 0.0),
    (7250.0, -500.0),
    (8000.0, -500.0),
];

/// Handset receive characteristic for narrowband scoring.
const IRS_RECEIVE_DB: [(f64, f64); 26] = [
    (0.0, -200.0),
    (50.0, -40.0),
    (100.0, -20.0),
    (125.0, -12.0),
    (160.0, -6.0),
    (200.0, 0.0),
    (250.0, 4.0),
    (300.0, 6.0),
    (350.0, 8.0),
    (400.0, 10.0),
    (500.0, 11.0),
    (600.0, 12.0),
    (700.0, 12.0),
    (800.0, 12.0),
    (1000.0, 12.0),
    (1300.0, 12.0),
    (1600.0, 12.0),
    (2000.0, 12.0),
    (2500.0, 12.0),
    (3000.0, 12.0),
    (3250.0, 12.0),
    (3500.0, 4.0),
    (4000.0, -200.0),
    (5000.0, -200.0),
    (6300.0, -200.0),
    (8000.0, -200.0),
];

/// Wideband input high-pass corner in Hz.
const WIDEBAND_HIGHPASS_HZ: f64 = 100.0;

/// Linear interpolation of a dB table, holding the end values outside it.
fn gain_db(table: &[(f64, f64)], hz: f64) -> f64 {
    match table.iter().position(|&(f, _)| f >= hz) {
        None => table.last().map_or(0.0, |&(_, g)| g),
        Some(0) => table[0].1,
        Some(i) => {
            let (f0, g0) = table[i - 1];
            let (f1, g1) = table[i];
            g0 + (g1 - g0) * (hz - f0) / (f1 - f0)
        }
    }
}

/// Filters `signal` in the frequency domain with a piecewise-linear dB response.
///
/// One FFT over the whole signal (zero-padded to a power of two), so the
/// response is applied exactly, with circular wrap confined to the padding.
pub(crate) fn apply_response(signal: &[f64], sample_rate: f64, table: &[(f64, f64)]) -> Vec<f64> {
    if signal.is_empty() {
        return Vec::new();
    }
    let size = signal.len().next_power_of_two().max(2);
    let fft = Fft::new(size);

    let mut buffer: Vec<Complex<f64>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    buffer.resize(size, Complex::new(0.0, 0.0));
    fft.forward_complex(&mut buffer);

    for k in 0..=size / 2 {
        let hz = k as f64 * sample_rate / size as f64;
        let gain = 10.0_f64.powf(gain_db(table, hz) / 20.0);
        buffer[k] *= gain;
        if k != 0 && k != size / 2 {
            buffer[size - k] *= gain;
        }
    }

    fft.inverse_complex(&mut buffer);
    buffer.iter().take(signal.len()).map(|c| c.re).collect()
}

/// Scales `signal` so its speech-band power equals [`TARGET_POWER`].
///
/// Returns the applied gain, or `None` (leaving the signal untouched) when
/// the band holds no power.
pub(crate) fn align_level(signal: &mut [f64], sample_rate: u32, mode: PesqMode) -> Option<f64> {
    let table: &[(f64, f64)] = match mode {
        PesqMode::Narrowband => &NARROWBAND_LEVEL_DB,
        PesqMode::Wideband => &WIDEBAND_LEVEL_DB,
    };
    let band = apply_response(signal, f64::from(sample_rate), table);
    let power = band.iter().map(|x| x * x).sum::<f64>() / band.len().max(1) as f64;
    if !power.is_finite() || power <= 0.0 {
        return None;
    }

    let gain = (TARGET_POWER / power).sqrt();
    for x in signal.iter_mut() {
        *x *= gain;
    }
    Some(gain)
}

/// Applies the listening-device model for `mode`.
pub(crate) fn input_filter(signal: &[f64], sample_rate: u32, mode: PesqMode) -> Vec<f64> {
    match mode {
        PesqMode::Narrowband => apply_response(signal, f64::from(sample_rate), &IRS_RECEIVE_DB),
        PesqMode::Wideband => {
            let wn = WIDEBAND_HIGHPASS_HZ / (f64::from(sample_rate) / 2.0);
            match butterworth::highpass(2, wn) {
                Ok(sos) => sosfilt(&sos, signal, None),
                Err(err) => {
                    warn!(%err, "wideband input filter unavailable, scoring unfiltered signal");
                    signal.to_vec()
                }
            }
        }
    }
}
