//! Butterworth filter design as cascaded second-order sections.
//!
//! The analog prototype of order N has its poles evenly spaced on the left half
//! of the unit circle. Conjugate pole pairs with angle
//! `θ_k = π·(2k + 1) / (2N)` give the analog sections
//!
//! ```text
//! H_k(s) = 1 / (s² + 2·sin(θ_k)·s + 1)
//! ```
//!
//! and an odd order adds the real pole `1 / (s + 1)`. Each section is mapped to
//! the z-plane with the bilinear transform, pre-warped so the -3 dB point lands
//! exactly on the requested cutoff:
//!
//! ```text
//! K = tan(π·Wn / 2),   Wn = cutoff / nyquist ∈ (0, 1)
//! ```
//!
//! Sections are ordered so the poles closest to the unit circle come last,
//! which keeps intermediate signal levels bounded in long cascades.
//!
//! Reference: A. V. Oppenheim and R. W. Schafer, *Discrete-Time Signal Processing*,
//! 3rd ed., Prentice Hall, 2009, Section 7.1.

use std::f64::consts::PI;

use crate::biquad::BiquadCoeffs;
use crate::error::FilterError;

/// A cascade of second-order sections.
#[derive(Debug, Clone, PartialEq)]
pub struct Sos {
    sections: Vec<BiquadCoeffs>,
}

/// Expanded numerator/denominator polynomials in powers of z⁻¹.
///
/// `a[0]` is always 1. Prone to coefficient quantization problems at high
/// orders and low cutoffs; prefer [`Sos`] whenever possible.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunction {
    /// Numerator coefficients
    pub b: Vec<f64>,
    /// Denominator coefficients
    pub a: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Response {
    Lowpass,
    Highpass,
}

impl Sos {
    /// Wraps an explicit list of sections.
    pub fn new(sections: Vec<BiquadCoeffs>) -> Self {
        Self { sections }
    }

    /// The sections in processing order.
    pub fn sections(&self) -> &[BiquadCoeffs] {
        &self.sections
    }

    /// Number of sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// True when the cascade has no sections.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Overall gain at DC.
    pub fn dc_gain(&self) -> f64 {
        self.sections.iter().map(BiquadCoeffs::dc_gain).product()
    }

    /// True when every section has finite coefficients.
    pub fn is_finite(&self) -> bool {
        self.sections.iter().all(BiquadCoeffs::is_finite)
    }

    /// Multiplies the sections out into a single `(b, a)` pair.
    pub fn transfer_function(&self) -> TransferFunction {
        let mut b = vec![1.0];
        let mut a = vec![1.0];
        for s in &self.sections {
            if s.is_first_order() {
                b = poly_mul(&b, &[s.b0, s.b1]);
                a = poly_mul(&a, &[1.0, s.a1]);
            } else {
                b = poly_mul(&b, &[s.b0, s.b1, s.b2]);
                a = poly_mul(&a, &[1.0, s.a1, s.a2]);
            }
        }
        TransferFunction { b, a }
    }
}

/// Designs an `order`-th order Butterworth low-pass at normalized cutoff `wn`.
///
/// `wn` is relative to Nyquist and must lie in the open interval (0, 1).
///
/// ```rust
/// use clarion_core::butterworth;
///
/// let sos = butterworth::lowpass(5, 0.25).unwrap();
/// assert_eq!(sos.len(), 3);
/// assert!((sos.dc_gain() - 1.0).abs() < 1e-12);
/// ```
pub fn lowpass(order: usize, wn: f64) -> Result<Sos, FilterError> {
    design(order, wn, Response::Lowpass)
}

/// Designs an `order`-th order Butterworth high-pass at normalized cutoff `wn`.
pub fn highpass(order: usize, wn: f64) -> Result<Sos, FilterError> {
    design(order, wn, Response::Highpass)
}

fn design(order: usize, wn: f64, response: Response) -> Result<Sos, FilterError> {
    if order == 0 {
        return Err(FilterError::InvalidOrder(order));
    }
    if !(wn > 0.0 && wn < 1.0) {
        return Err(FilterError::invalid_argument(
            "wn",
            format!("normalized cutoff must lie in (0, 1), got {wn}"),
        ));
    }

    let k = (PI * wn / 2.0).tan();
    let k2 = k * k;
    let mut sections = Vec::with_capacity(order.div_ceil(2));

    if order % 2 == 1 {
        // Real pole: K / (s + K) or s / (s + K)
        let a0 = 1.0 + k;
        let a1 = k - 1.0;
        let coeffs = match response {
            Response::Lowpass => BiquadCoeffs::new(k, k, 0.0, a0, a1, 0.0),
            Response::Highpass => BiquadCoeffs::new(1.0, -1.0, 0.0, a0, a1, 0.0),
        };
        sections.push(coeffs);
    }

    // Highest-Q pair (k = 0) goes last.
    for idx in (0..order / 2).rev() {
        let theta = PI * (2 * idx + 1) as f64 / (2 * order) as f64;
        let damping = 2.0 * theta.sin();

        let a0 = 1.0 + damping * k + k2;
        let a1 = 2.0 * (k2 - 1.0);
        let a2 = 1.0 - damping * k + k2;

        let coeffs = match response {
            Response::Lowpass => BiquadCoeffs::new(k2, 2.0 * k2, k2, a0, a1, a2),
            Response::Highpass => BiquadCoeffs::new(1.0, -2.0, 1.0, a0, a1, a2),
        };
        sections.push(coeffs);
    }

    let sos = Sos::new(sections);
    if !sos.is_finite() {
        return Err(FilterError::NonFinite);
    }
    Ok(sos)
}

fn poly_mul(p: &[f64], q: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; p.len() + q.len() - 1];
    for (i, &pi) in p.iter().enumerate() {
        for (j, &qj) in q.iter().enumerate() {
            out[i + j] += pi * qj;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biquad::Biquad;

    /// Magnitude response of a cascade at normalized frequency `w` (0..1 = 0..Nyquist).
    fn magnitude(sos: &Sos, w: f64) -> f64 {
        let omega = PI * w;
        let (c1, s1) = (omega.cos(), -omega.sin());
        let (c2, s2) = ((2.0 * omega).cos(), -(2.0 * omega).sin());
        sos.sections()
            .iter()
            .map(|s| {
                let num_re = s.b0 + s.b1 * c1 + s.b2 * c2;
                let num_im = s.b1 * s1 + s.b2 * s2;
                let den_re = 1.0 + s.a1 * c1 + s.a2 * c2;
                let den_im = s.a1 * s1 + s.a2 * s2;
                (num_re.hypot(num_im)) / (den_re.hypot(den_im))
            })
            .product()
    }

    #[test]
    fn section_count_follows_order() {
        for order in 1..=9 {
            let sos = lowpass(order, 0.3).unwrap();
            assert_eq!(sos.len(), order.div_ceil(2), "order {order}");
        }
    }

    #[test]
    fn odd_order_starts_with_first_order_section() {
        let sos = lowpass(5, 0.3).unwrap();
        assert!(sos.sections()[0].is_first_order());
        assert!(!sos.sections()[1].is_first_order());
    }

    #[test]
    fn lowpass_unity_dc_and_half_power_at_cutoff() {
        for order in [1, 2, 4, 5, 8] {
            let sos = lowpass(order, 0.2).unwrap();
            assert!((magnitude(&sos, 0.0) - 1.0).abs() < 1e-9);
            let at_cutoff = magnitude(&sos, 0.2);
            assert!(
                (at_cutoff - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-9,
                "order {order}: |H(wc)| = {at_cutoff}"
            );
        }
    }

    #[test]
    fn lowpass_rejects_near_nyquist() {
        let sos = lowpass(5, 0.1).unwrap();
        assert!(magnitude(&sos, 0.9) < 1e-4);
    }

    #[test]
    fn highpass_blocks_dc() {
        let sos = highpass(2, 0.05).unwrap();
        assert!(magnitude(&sos, 0.0) < 1e-12);
        assert!((magnitude(&sos, 0.9) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn rejects_zero_order() {
        assert_eq!(lowpass(0, 0.5), Err(FilterError::InvalidOrder(0)));
    }

    #[test]
    fn rejects_out_of_range_cutoff() {
        assert!(matches!(
            lowpass(4, 1.0),
            Err(FilterError::InvalidArgument { param: "wn", .. })
        ));
        assert!(lowpass(4, 0.0).is_err());
        assert!(lowpass(4, f64::NAN).is_err());
    }

    #[test]
    fn transfer_function_matches_cascade() {
        let sos = lowpass(5, 0.3).unwrap();
        let tf = sos.transfer_function();
        assert_eq!(tf.b.len(), 6);
        assert_eq!(tf.a.len(), 6);
        assert_eq!(tf.a[0], 1.0);

        // Impulse response through the cascade vs. the expanded polynomial.
        let mut cascade: Vec<Biquad> = sos.sections().iter().copied().map(Biquad::new).collect();
        let impulse: Vec<f64> = (0..64).map(|i| if i == 0 { 1.0 } else { 0.0 }).collect();
        let via_sos: Vec<f64> = impulse
            .iter()
            .map(|&x| cascade.iter_mut().fold(x, |acc, s| s.process(acc)))
            .collect();
        let via_tf = crate::filtering::lfilter(&tf, &impulse).unwrap();
        for (a, b) in via_sos.iter().zip(via_tf.iter()) {
            assert!((a - b).abs() < 1e-10, "{a} vs {b}");
        }
    }
}
