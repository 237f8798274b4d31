//! Reference conditioning with a Butterworth low-pass.
//!
//! [`lowpass_filter`] favours availability over fidelity: once its arguments
//! are valid it always returns a signal of the input's length. Each step down
//! the fallback ladder is recorded as a [`FilterNotice`] and logged with
//! `tracing::warn!`:
//!
//! 1. zero-phase SOS filtering ([`sosfiltfilt`])
//! 2. single-pass direct-form filtering ([`lfilter`]) with the same order and cutoff
//! 3. the unmodified input

use std::fmt;

use tracing::warn;

use crate::butterworth;
use crate::error::FilterError;
use crate::filtering::{lfilter, sosfiltfilt};

/// Smallest distance kept between the normalized cutoff and 0 or 1.
pub const CUTOFF_EPSILON: f64 = 1e-9;

/// Default cutoff frequency in Hz.
pub const DEFAULT_CUTOFF_HZ: f64 = 8000.0;

/// Default sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: f64 = 16000.0;

/// Default Butterworth order.
pub const DEFAULT_ORDER: usize = 5;

/// Which filtering path produced [`Filtered::samples`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPath {
    /// Forward-backward SOS filtering, no phase distortion
    ZeroPhase,
    /// Single forward pass through the transfer function
    SinglePass,
    /// Both filter paths failed; the input is returned as-is
    Passthrough,
}

/// A non-fatal condition encountered while filtering.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNotice {
    /// The normalized cutoff fell outside (0, 1) and was clamped.
    CutoffClamped {
        /// Normalized cutoff as requested
        requested: f64,
        /// Normalized cutoff actually used
        clamped: f64,
    },
    /// Zero-phase filtering failed; fell back to single-pass filtering.
    ZeroPhaseFailed {
        /// Underlying failure
        reason: String,
    },
    /// Single-pass filtering failed; returned the original signal.
    SinglePassFailed {
        /// Underlying failure
        reason: String,
    },
}

impl fmt::Display for FilterNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterNotice::CutoffClamped { requested, clamped } => write!(
                f,
                "normalized cutoff {requested:.9} out of (0,1), clamped to {clamped:.9}"
            ),
            FilterNotice::ZeroPhaseFailed { reason } => write!(
                f,
                "SOS filtering failed: {reason}; falling back to single-section filter"
            ),
            FilterNotice::SinglePassFailed { reason } => write!(
                f,
                "fallback filtering failed: {reason}; returning original signal"
            ),
        }
    }
}

/// Output of [`lowpass_filter`]: the signal plus every advisory notice raised.
#[derive(Debug, Clone, PartialEq)]
pub struct Filtered {
    /// Filtered samples, same length as the input
    pub samples: Vec<f32>,
    /// Path that produced `samples`
    pub path: FilterPath,
    /// Non-fatal conditions, in the order they occurred
    pub notices: Vec<FilterNotice>,
}

impl Filtered {
    /// True when any notice was raised.
    pub fn is_degraded(&self) -> bool {
        !self.notices.is_empty()
    }

    /// Consumes the result, keeping only the samples.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// Normalizes `cutoff` against Nyquist, clamping into `[ε, 1 - ε]`.
///
/// Returns the normalized cutoff and, when clamping happened, the notice
/// describing it.
///
/// # Errors
///
/// [`FilterError::InvalidArgument`] when `cutoff <= 0`, or when `sample_rate`
/// is not a positive number.
pub fn normalized_cutoff(
    cutoff: f64,
    sample_rate: f64,
) -> Result<(f64, Option<FilterNotice>), FilterError> {
    if cutoff.is_nan() || cutoff <= 0.0 {
        return Err(FilterError::invalid_argument(
            "cutoff",
            format!("must be > 0, got {cutoff}"),
        ));
    }
    if sample_rate.is_nan() || sample_rate <= 0.0 {
        return Err(FilterError::invalid_argument(
            "sample_rate",
            format!("must be > 0, got {sample_rate}"),
        ));
    }

    let requested = cutoff / (0.5 * sample_rate);
    let clamped = requested.clamp(CUTOFF_EPSILON, 1.0 - CUTOFF_EPSILON);
    if clamped == requested {
        Ok((requested, None))
    } else {
        Ok((clamped, Some(FilterNotice::CutoffClamped { requested, clamped })))
    }
}

/// Zero-phase Butterworth low-pass with graceful degradation.
///
/// # Arguments
///
/// * `signal` - Input samples (not modified)
/// * `cutoff` - Cutoff frequency in Hz, must be > 0
/// * `sample_rate` - Sample rate in Hz
/// * `order` - Butterworth order
///
/// # Errors
///
/// Only [`FilterError::InvalidArgument`]; every other problem degrades the
/// result and is reported through [`Filtered::notices`].
///
/// ```rust
/// use clarion_core::{lowpass_filter, FilterNotice, FilterPath};
///
/// let signal = vec![0.5_f32; 512];
///
/// // Cutoff above Nyquist is clamped, not rejected.
/// let out = lowpass_filter(&signal, 12000.0, 16000.0, 5).unwrap();
/// assert_eq!(out.samples.len(), 512);
/// assert!(matches!(out.notices[0], FilterNotice::CutoffClamped { .. }));
///
/// assert!(lowpass_filter(&signal, 0.0, 16000.0, 5).is_err());
/// ```
pub fn lowpass_filter(
    signal: &[f32],
    cutoff: f64,
    sample_rate: f64,
    order: usize,
) -> Result<Filtered, FilterError> {
    let (wn, clamp_notice) = normalized_cutoff(cutoff, sample_rate)?;

    let mut notices = Vec::new();
    if let Some(notice) = clamp_notice {
        warn!("{notice}");
        notices.push(notice);
    }

    let input: Vec<f64> = signal.iter().map(|&s| f64::from(s)).collect();

    match zero_phase(&input, order, wn) {
        Ok(output) => {
            return Ok(Filtered {
                samples: to_f32(&output),
                path: FilterPath::ZeroPhase,
                notices,
            });
        }
        Err(e) => {
            let notice = FilterNotice::ZeroPhaseFailed {
                reason: e.to_string(),
            };
            warn!("{notice}");
            notices.push(notice);
        }
    }

    match single_pass(&input, order, wn) {
        Ok(output) => Ok(Filtered {
            samples: to_f32(&output),
            path: FilterPath::SinglePass,
            notices,
        }),
        Err(e) => {
            let notice = FilterNotice::SinglePassFailed {
                reason: e.to_string(),
            };
            warn!("{notice}");
            notices.push(notice);
            Ok(Filtered {
                samples: signal.to_vec(),
                path: FilterPath::Passthrough,
                notices,
            })
        }
    }
}

fn zero_phase(input: &[f64], order: usize, wn: f64) -> Result<Vec<f64>, FilterError> {
    let sos = butterworth::lowpass(order, wn)?;
    sosfiltfilt(&sos, input)
}

fn single_pass(input: &[f64], order: usize, wn: f64) -> Result<Vec<f64>, FilterError> {
    let tf = butterworth::lowpass(order, wn)?.transfer_function();
    let output = lfilter(&tf, input)?;
    if output.iter().all(|y| y.is_finite()) {
        Ok(output)
    } else {
        Err(FilterError::NonFinite)
    }
}

fn to_f32(samples: &[f64]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32).collect()
}
