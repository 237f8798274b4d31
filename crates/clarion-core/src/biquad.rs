//! Biquad (bi-quadratic) filter sections.
//!
//! Second-order IIR building blocks for the Butterworth cascades in
//! [`crate::butterworth`]. Sections run in Transposed Direct Form II with `f64`
//! state, which keeps long cascades well conditioned at low cutoffs.

/// Normalized biquad coefficients (`a0 = 1`).
///
/// ```text
///         b0 + b1·z⁻¹ + b2·z⁻²
/// H(z) = ----------------------
///          1 + a1·z⁻¹ + a2·z⁻²
/// ```
///
/// A first-order section is stored with `b2 = a2 = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    /// Feedforward coefficient for x[n]
    pub b0: f64,
    /// Feedforward coefficient for x[n-1]
    pub b1: f64,
    /// Feedforward coefficient for x[n-2]
    pub b2: f64,
    /// Feedback coefficient for y[n-1]
    pub a1: f64,
    /// Feedback coefficient for y[n-2]
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Passthrough section: `y[n] = x[n]`.
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Builds a section from raw coefficients, normalizing by `a0`.
    pub fn new(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        let a0_inv = 1.0 / a0;
        Self {
            b0: b0 * a0_inv,
            b1: b1 * a0_inv,
            b2: b2 * a0_inv,
            a1: a1 * a0_inv,
            a2: a2 * a0_inv,
        }
    }

    /// True when the section has no second-order terms.
    pub fn is_first_order(&self) -> bool {
        self.b2 == 0.0 && self.a2 == 0.0
    }

    /// Gain at DC (z = 1).
    pub fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }

    /// True when every coefficient is finite.
    pub fn is_finite(&self) -> bool {
        [self.b0, self.b1, self.b2, self.a1, self.a2]
            .iter()
            .all(|c| c.is_finite())
    }

    /// Delay-line state after the section has settled on a unit step input.
    ///
    /// Solves `(I - Aᵀ)·z = b[1..] - a[1..]·b0` for the TDF-II state, which
    /// is what lets a filter start "already settled" on the first sample.
    pub fn step_state(&self) -> [f64; 2] {
        let beta1 = self.b1 - self.a1 * self.b0;
        let beta2 = self.b2 - self.a2 * self.b0;
        let z1 = (beta1 + beta2) / (1.0 + self.a1 + self.a2);
        [z1, beta2 - self.a2 * z1]
    }
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A biquad section with its delay line.
///
/// Transposed Direct Form II:
/// ```text
/// y[n]  = b0·x[n] + z1
/// z1'   = b1·x[n] - a1·y[n] + z2
/// z2'   = b2·x[n] - a2·y[n]
/// ```
#[derive(Debug, Clone)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    z1: f64,
    z2: f64,
}

impl Biquad {
    /// Creates a section with cleared state.
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Creates a section with explicit initial state.
    pub fn with_state(coeffs: BiquadCoeffs, state: [f64; 2]) -> Self {
        Self {
            coeffs,
            z1: state[0],
            z2: state[1],
        }
    }

    /// Section coefficients.
    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    /// Current delay-line state `[z1, z2]`.
    pub fn state(&self) -> [f64; 2] {
        [self.z1, self.z2]
    }

    /// Processes a single sample.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let c = &self.coeffs;
        let output = c.b0 * input + self.z1;
        self.z1 = c.b1 * input - c.a1 * output + self.z2;
        self.z2 = c.b2 * input - c.a2 * output;
        output
    }

    /// Clears the delay line without touching the coefficients.
    pub fn clear(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new(BiquadCoeffs::IDENTITY)
    }
}
