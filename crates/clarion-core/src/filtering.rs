//! Applying filters to whole signals.
//!
//! - [`sosfilt`] - single pass through an SOS cascade, optional initial state
//! - [`sosfiltfilt`] - zero-phase forward-backward filtering with odd-extension
//!   edge padding and steady-state initial conditions
//! - [`lfilter`] - single pass through an expanded `(b, a)` transfer function
//!
//! # Zero-phase filtering
//!
//! Running a filter forward and then backward squares its magnitude response
//! and cancels its phase response. Edge transients are suppressed by extending
//! the signal with a point-symmetric (odd) reflection of `padlen` samples on
//! each side and starting each pass from the steady state for its first sample:
//!
//! ```text
//! left  = 2·x[0]   - x[padlen..1]
//! right = 2·x[N-1] - x[N-2..N-1-padlen]
//! ```
//!
//! Reference: F. Gustafsson, "Determining the initial states in forward-backward
//! filtering", IEEE Trans. Signal Processing, 44(4), 1996.

use crate::biquad::Biquad;
use crate::butterworth::{Sos, TransferFunction};
use crate::error::FilterError;

/// Filters `input` through every section of `sos` in turn.
///
/// `initial` supplies one `[z1, z2]` state per section; `None` starts from rest.
pub fn sosfilt(sos: &Sos, input: &[f64], initial: Option<&[[f64; 2]]>) -> Vec<f64> {
    let mut sections: Vec<Biquad> = match initial {
        Some(states) => sos
            .sections()
            .iter()
            .zip(states.iter())
            .map(|(c, z)| Biquad::with_state(*c, *z))
            .collect(),
        None => sos.sections().iter().copied().map(Biquad::new).collect(),
    };

    input
        .iter()
        .map(|&x| sections.iter_mut().fold(x, |acc, s| s.process(acc)))
        .collect()
}

/// Per-section initial states for a unit step response of the whole cascade.
///
/// Section `i` sees the step scaled by the DC gain of sections `0..i`.
pub fn sosfilt_zi(sos: &Sos) -> Vec<[f64; 2]> {
    let mut scale = 1.0;
    sos.sections()
        .iter()
        .map(|s| {
            let [z1, z2] = s.step_state();
            let state = [scale * z1, scale * z2];
            scale *= s.dc_gain();
            state
        })
        .collect()
}

/// Edge padding used by [`sosfiltfilt`].
///
/// `3 · (2·n_sections + 1 - min(#sections with b2 = 0, #sections with a2 = 0))`
pub fn padlen(sos: &Sos) -> usize {
    let zero_b2 = sos.sections().iter().filter(|s| s.b2 == 0.0).count();
    let zero_a2 = sos.sections().iter().filter(|s| s.a2 == 0.0).count();
    3 * (2 * sos.len() + 1 - zero_b2.min(zero_a2))
}

/// Zero-phase forward-backward filtering through an SOS cascade.
///
/// Output has exactly `input.len()` samples.
///
/// # Errors
///
/// - [`FilterError::SignalTooShort`] if `input.len() <= padlen(sos)`
/// - [`FilterError::NonFinite`] if the result contains NaN or infinities
pub fn sosfiltfilt(sos: &Sos, input: &[f64]) -> Result<Vec<f64>, FilterError> {
    let edge = padlen(sos);
    if input.len() <= edge {
        return Err(FilterError::SignalTooShort {
            len: input.len(),
            padlen: edge,
        });
    }

    let zi = sosfilt_zi(sos);
    let scaled = |x0: f64| -> Vec<[f64; 2]> {
        zi.iter().map(|z| [z[0] * x0, z[1] * x0]).collect()
    };

    let extended = odd_extension(input, edge);

    let mut forward = sosfilt(sos, &extended, Some(&scaled(extended[0])));
    forward.reverse();

    let y0 = forward[0];
    let mut backward = sosfilt(sos, &forward, Some(&scaled(y0)));
    backward.reverse();

    let output = backward[edge..edge + input.len()].to_vec();
    if output.iter().all(|y| y.is_finite()) {
        Ok(output)
    } else {
        Err(FilterError::NonFinite)
    }
}

/// Single-pass IIR filtering with a direct-form transfer function.
///
/// Transposed Direct Form II of arbitrary order, starting from rest. The
/// output has the same length as the input.
///
/// # Errors
///
/// [`FilterError::InvalidArgument`] if `a` is empty or `a[0] == 0`.
pub fn lfilter(tf: &TransferFunction, input: &[f64]) -> Result<Vec<f64>, FilterError> {
    let a0 = match tf.a.first() {
        Some(&a0) if a0 != 0.0 => a0,
        _ => {
            return Err(FilterError::invalid_argument(
                "a",
                "leading denominator coefficient must be non-zero",
            ));
        }
    };

    let n = tf.b.len().max(tf.a.len());
    let mut b = vec![0.0; n];
    let mut a = vec![0.0; n];
    for (dst, &src) in b.iter_mut().zip(tf.b.iter()) {
        *dst = src / a0;
    }
    for (dst, &src) in a.iter_mut().zip(tf.a.iter()) {
        *dst = src / a0;
    }

    if n == 1 {
        return Ok(input.iter().map(|&x| b[0] * x).collect());
    }

    let mut z = vec![0.0; n - 1];
    let mut output = Vec::with_capacity(input.len());
    for &x in input {
        let y = b[0] * x + z[0];
        for i in 0..n - 2 {
            z[i] = b[i + 1] * x - a[i + 1] * y + z[i + 1];
        }
        z[n - 2] = b[n - 1] * x - a[n - 1] * y;
        output.push(y);
    }
    Ok(output)
}

/// Extends `input` by `n` odd-reflected samples on each side.
///
/// Requires `input.len() > n`.
fn odd_extension(input: &[f64], n: usize) -> Vec<f64> {
    let len = input.len();
    let first = input[0];
    let last = input[len - 1];

    let mut out = Vec::with_capacity(len + 2 * n);
    out.extend((1..=n).rev().map(|i| 2.0 * first - input[i]));
    out.extend_from_slice(input);
    out.extend((1..=n).map(|i| 2.0 * last - input[len - 1 - i]));
    out
}
