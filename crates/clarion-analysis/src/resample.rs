//! Rational sample-rate conversion for the perceptual metrics.
//!
//! STOI runs at 10 kHz and PESQ at 8 or 16 kHz, so inputs at any other rate are
//! converted with a polyphase FIR resampler. A rate change `from → to` reduces
//! to the ratio P/Q in lowest terms; the signal is conceptually upsampled by P,
//! low-pass filtered at `0.9 / max(P, Q)` of Nyquist and downsampled by Q. The
//! polyphase decomposition only evaluates the output samples that survive.
//!
//! The anti-aliasing prototype is a Blackman-windowed sinc:
//!   `h[n] = sinc(cutoff · (n - M/2)) · w[n]`
//! normalized to unity DC gain. Its group delay of `M/2` upsampled samples is
//! compensated, so output sample `m` lines up with input time `m · Q / P`.
//!
//! The prototype has `40 · max(P, Q) + 1` taps, so both factors are capped at
//! [`MAX_FACTOR`]. A ratio with a larger term (a prime input rate such as
//! 44101 Hz, for example) is replaced by its closest fraction within the cap,
//! which shifts the output rate by a few parts per million for audio rates.
//! Ratios steeper than `MAX_FACTOR : 1` are not supported and saturate.
//!
//! Reference: P. P. Vaidyanathan, *Multirate Systems and Filter Banks*, Prentice Hall,
//! 1993, Chapter 4.
//!
//! # Example
//!
//! ```rust
//! use clarion_analysis::resample::resample_rate;
//!
//! let signal = vec![0.0_f32; 22050];
//! let converted = resample_rate(&signal, 22050, 16000);
//! assert_eq!(converted.len(), 16000);
//! ```

use std::f64::consts::PI;
use tracing::debug;

/// Largest upsampling or downsampling factor after ratio reduction.
///
/// Every conversion between the common audio rates (8 to 96 kHz, including
/// the 44.1 kHz family) reduces to terms within this bound.
pub const MAX_FACTOR: usize = 1024;

/// Compute windowed-sinc lowpass FIR coefficients.
///
/// Designs a Type I linear-phase FIR lowpass filter using a Blackman window,
/// normalized to unity gain at DC. `cutoff` is relative to Nyquist.
///
/// Blackman window:
///   `w[n] = 0.42 - 0.5·cos(2πn/M) + 0.08·cos(4πn/M)`
///
/// Reference: A. V. Oppenheim and R. W. Schafer, *Discrete-Time Signal Processing*,
/// 3rd ed., Prentice Hall, 2009, Section 7.6.
pub fn design_lowpass(num_taps: usize, cutoff: f64) -> Vec<f64> {
    if num_taps == 0 {
        return Vec::new();
    }

    let m = num_taps - 1;
    let mut coeffs: Vec<f64> = (0..num_taps)
        .map(|n| {
            let x = n as f64 - m as f64 / 2.0;
            let sinc = if x.abs() < 1e-12 {
                cutoff
            } else {
                (PI * cutoff * x).sin() / (PI * x)
            };
            let window = if m == 0 {
                1.0
            } else {
                let phase = 2.0 * PI * n as f64 / m as f64;
                0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos()
            };
            sinc * window
        })
        .collect();

    let sum: f64 = coeffs.iter().sum();
    if sum.abs() > 1e-12 {
        for c in &mut coeffs {
            *c /= sum;
        }
    }
    coeffs
}

/// Greatest common divisor.
pub(crate) fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// Closest fraction to `up / down` whose terms are both at most `max`.
///
/// Walks the continued-fraction convergents of `up / down` and, at the first
/// one that exceeds `max`, picks the better of the previous convergent and
/// the largest semiconvergent that still fits. Inputs must be in lowest terms.
fn bounded_ratio(up: usize, down: usize, max: usize) -> (usize, usize) {
    if up.max(down) <= max {
        return (up, down);
    }

    let target = up as f64 / down as f64;
    let (mut p0, mut q0, mut p1, mut q1) = (0, 1, 1, 0);
    let (mut n, mut d) = (up, down);
    loop {
        let a = n / d;
        let (p2, q2) = (a * p1 + p0, a * q1 + q0);
        if p2.max(q2) > max {
            let k = [(p1, p0), (q1, q0)]
                .iter()
                .filter(|&&(step, _)| step > 0)
                .map(|&(step, base)| (max - base) / step)
                .min()
                .unwrap_or(0);
            let semi = (k * p1 + p0, k * q1 + q0);
            let error = |(p, q): (usize, usize)| (p as f64 / q as f64 - target).abs();
            return [semi, (p1, q1)]
                .into_iter()
                .filter(|&(p, q)| p > 0 && q > 0)
                .min_by(|&a, &b| error(a).total_cmp(&error(b)))
                .unwrap_or((max.min(up), max.min(down)));
        }
        (p0, q0, p1, q1) = (p1, q1, p2, q2);
        (n, d) = (d, n - a * d);
        if d == 0 {
            return (p1, q1);
        }
    }
}

/// Polyphase P/Q resampler with a precomputed filter bank.
///
/// Build once with [`Resampler::new`] and reuse it for every signal that needs
/// the same conversion (STOI converts both of its inputs, for example).
#[derive(Debug, Clone)]
pub struct Resampler {
    up: usize,
    down: usize,
    delay: usize,
    polyphase: Vec<Vec<f64>>,
}

impl Resampler {
    /// Creates a resampler from `from_hz` to `to_hz`.
    ///
    /// # Panics
    ///
    /// Panics if either rate is zero. Callers validate rates before
    /// reaching this point.
    pub fn new(from_hz: u32, to_hz: u32) -> Self {
        assert!(from_hz > 0 && to_hz > 0, "sample rates must be positive");
        let g = gcd(from_hz as usize, to_hz as usize);
        Self::with_ratio(to_hz as usize / g, from_hz as usize / g)
    }

    /// Creates a resampler for the rational factor `up / down`.
    ///
    /// The ratio is reduced to lowest terms first, then approximated when a
    /// term exceeds [`MAX_FACTOR`].
    ///
    /// # Panics
    ///
    /// Panics if either factor is zero.
    pub fn with_ratio(up: usize, down: usize) -> Self {
        assert!(up >= 1 && down >= 1, "resampling factors must be >= 1");
        let g = gcd(up, down);
        let (up, down) = (up / g, down / g);
        let (up, down) = match bounded_ratio(up, down, MAX_FACTOR) {
            approx if approx != (up, down) => {
                debug!(
                    up,
                    down,
                    approx_up = approx.0,
                    approx_down = approx.1,
                    "resampling ratio approximated"
                );
                approx
            }
            exact => exact,
        };

        if up == 1 && down == 1 {
            return Self {
                up,
                down,
                delay: 0,
                polyphase: vec![vec![1.0]],
            };
        }

        let num_taps = 4 * up.max(down) * 10 + 1;
        let prototype = design_lowpass(num_taps, 0.9 / up.max(down) as f64);

        // Sub-filter k holds prototype taps k, k+P, k+2P, ...
        let taps_per_phase = num_taps.div_ceil(up);
        let mut polyphase = vec![vec![0.0; taps_per_phase]; up];
        for (tap_idx, &coeff) in prototype.iter().enumerate() {
            polyphase[tap_idx % up][tap_idx / up] = coeff * up as f64;
        }

        Self {
            up,
            down,
            delay: (num_taps - 1) / 2,
            polyphase,
        }
    }

    /// Reduced `(P, Q)` factors.
    pub fn ratio(&self) -> (usize, usize) {
        (self.up, self.down)
    }

    /// Output length for an input of `input_len` samples: `ceil(len · P / Q)`.
    pub fn output_len(&self, input_len: usize) -> usize {
        (input_len * self.up).div_ceil(self.down)
    }

    /// Resamples `signal`, accumulating in `f64`.
    pub fn process(&self, signal: &[f64]) -> Vec<f64> {
        if self.up == 1 && self.down == 1 {
            return signal.to_vec();
        }

        (0..self.output_len(signal.len()))
            .map(|m| {
                // Position in the P-upsampled sequence, delay compensated.
                let full_idx = m * self.down + self.delay;
                let n = full_idx / self.up;
                let sub_filter = &self.polyphase[full_idx % self.up];

                sub_filter
                    .iter()
                    .enumerate()
                    .filter(|&(i, _)| i <= n && n - i < signal.len())
                    .map(|(i, &coeff)| coeff * signal[n - i])
                    .sum()
            })
            .collect()
    }
}

/// Converts `signal` from `from_hz` to `to_hz`.
///
/// Returns a copy when the rates match. The output has
/// `ceil(len · to / from)` samples (after reducing the ratio).
///
/// # Panics
///
/// Panics if either rate is zero.
pub fn resample_rate(signal: &[f32], from_hz: u32, to_hz: u32) -> Vec<f32> {
    if from_hz == to_hz {
        return signal.to_vec();
    }
    let input: Vec<f64> = signal.iter().map(|&x| f64::from(x)).collect();
    Resampler::new(from_hz, to_hz)
        .process(&input)
        .into_iter()
        .map(|x| x as f32)
        .collect()
}
