//! Cross-correlation for delay estimation.
//!
//! PESQ lines the degraded signal up with the reference in two passes: a coarse
//! search over the whole file on block envelopes (FFT based), then a fine
//! search per utterance on the samples themselves (direct, over a narrow lag
//! window).
//!
//! # Mathematical Definition
//!
//! ```text
//! R_xy(τ) = Σ_{n} x[n] · y[n + τ]
//! ```
//!
//! If `y[n] = x[n - τ₀]` (y is x delayed by τ₀ samples) the correlation peaks
//! at `τ = τ₀`.
//!
//! # References
//!
//! - Oppenheim & Schafer, "Discrete-Time Signal Processing" (3rd ed.), section 2.8.
//! - Proakis & Manolakis, "Digital Signal Processing" (4th ed.), section 6.4.

use crate::fft::Fft;
use rustfft::num_complex::Complex;

/// FFT-based cross-correlation over lags `-max_lag..=max_lag`.
///
/// Uses `R_xy = IFFT(conj(X) · Y)` with zero-padding to avoid circular
/// wrap-around. Returns `2 * max_lag + 1` values laid out as
/// `[R(-max_lag), …, R(0), …, R(max_lag)]`; lags beyond the padded length
/// read as zero.
pub fn xcorr_fft(x: &[f64], y: &[f64], max_lag: usize) -> Vec<f64> {
    let fft_size = (x.len() + y.len()).next_power_of_two().max(2);
    let fft = Fft::new(fft_size);

    let mut buf_x: Vec<Complex<f64>> = x.iter().map(|&v| Complex::new(v, 0.0)).collect();
    buf_x.resize(fft_size, Complex::new(0.0, 0.0));
    let mut buf_y: Vec<Complex<f64>> = y.iter().map(|&v| Complex::new(v, 0.0)).collect();
    buf_y.resize(fft_size, Complex::new(0.0, 0.0));

    fft.forward_complex(&mut buf_x);
    fft.forward_complex(&mut buf_y);
    for (cx, cy) in buf_x.iter_mut().zip(buf_y.iter()) {
        *cx = cx.conj() * cy;
    }
    fft.inverse_complex(&mut buf_x);

    // Positive lags at 0, 1, ...; negative lags wrap to the end of the buffer.
    let reach = fft_size / 2;
    (-(max_lag as i64)..=max_lag as i64)
        .map(|lag| {
            if lag.unsigned_abs() as usize >= reach {
                0.0
            } else if lag >= 0 {
                buf_x[lag as usize].re
            } else {
                buf_x[(fft_size as i64 + lag) as usize].re
            }
        })
        .collect()
}

/// Normalized correlation of `x[range]` against `y` shifted by each lag in
/// `lags`.
///
/// Each value is `Σ x[n]·y[n+τ] / sqrt(Σ y[n+τ]²)` over `n ∈ range`, with
/// samples of `y` outside its bounds treated as zero. Normalizing by the
/// energy of the shifted window only makes the score maximal exactly where
/// `y` repeats `x`. Returns `(lag, score)` pairs in lag order.
pub fn xcorr_window(
    x: &[f64],
    y: &[f64],
    range: std::ops::Range<usize>,
    lags: std::ops::RangeInclusive<i64>,
) -> Vec<(i64, f64)> {
    let range = range.start.min(x.len())..range.end.min(x.len());
    lags.map(|lag| {
        let mut dot = 0.0;
        let mut energy = 0.0;
        for n in range.clone() {
            let m = n as i64 + lag;
            if m >= 0 && (m as usize) < y.len() {
                let v = y[m as usize];
                dot += x[n] * v;
                energy += v * v;
            }
        }
        let score = if energy > 0.0 { dot / energy.sqrt() } else { 0.0 };
        (lag, score)
    })
    .collect()
}

/// Lag of maximum (signed) correlation and its value.
///
/// `correlation` must use the layout of [`xcorr_fft`]. Anti-phase peaks are
/// ignored: an inverted copy is not an alignment. Returns `(0, 0.0)` for an
/// empty input. Ties resolve to the lag closest to zero.
pub fn peak_lag(correlation: &[f64], max_lag: usize) -> (i64, f64) {
    correlation
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as i64 - max_lag as i64, v))
        .fold(None, |best: Option<(i64, f64)>, (lag, v)| match best {
            Some((b_lag, b_v)) if b_v > v || (b_v == v && b_lag.abs() <= lag.abs()) => {
                Some((b_lag, b_v))
            }
            _ => Some((lag, v)),
        })
        .unwrap_or((0, 0.0))
}

/// Highest score in `(lag, score)` pairs from [`xcorr_window`], ties going to
/// the lag nearest `centre`. `None` when no score is positive.
pub fn peak_near(scores: &[(i64, f64)], centre: i64) -> Option<(i64, f64)> {
    scores
        .iter()
        .copied()
        .fold(None, |best: Option<(i64, f64)>, (lag, score)| match best {
            Some((b_lag, b_score))
                if b_score > score
                    || (b_score == score && (b_lag - centre).abs() <= (lag - centre).abs()) =>
            {
                Some((b_lag, b_score))
            }
            _ => Some((lag, score)),
        })
        .filter(|&(_, score)| score > 0.0)
}
