//! Clarion Core - signal primitives for objective audio quality metrics
//!
//! This crate holds the pieces shared by every metric in `clarion-analysis`:
//!
//! ## Alignment
//!
//! - [`align`] - Truncate a reference/degraded pair to their common prefix
//!
//! ## Filters
//!
//! - [`BiquadCoeffs`] / [`Biquad`] - Second-order sections in Transposed Direct Form II
//! - [`butterworth`] - Butterworth low-pass and high-pass design as SOS cascades
//! - [`filtering`] - `sosfilt`, zero-phase `sosfiltfilt`, and direct-form `lfilter`
//!
//! ## Reference Conditioning
//!
//! - [`lowpass_filter`] - Zero-phase Butterworth low-pass that degrades gracefully,
//!   reporting every fallback as a [`FilterNotice`] instead of failing
//!
//! # Example
//!
//! ```rust
//! use clarion_core::{lowpass_filter, FilterPath};
//!
//! let signal: Vec<f32> = (0..1600)
//!     .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16000.0).sin())
//!     .collect();
//!
//! let filtered = lowpass_filter(&signal, 4000.0, 16000.0, 5).unwrap();
//! assert_eq!(filtered.samples.len(), signal.len());
//! assert_eq!(filtered.path, FilterPath::ZeroPhase);
//! assert!(filtered.notices.is_empty());
//! ```

pub mod align;
pub mod biquad;
pub mod butterworth;
pub mod filtering;
pub mod lowpass;

mod error;

pub use align::{align, aligned_len};
pub use biquad::{Biquad, BiquadCoeffs};
pub use butterworth::{Sos, TransferFunction};
pub use error::FilterError;
pub use filtering::{lfilter, padlen, sosfilt, sosfilt_zi, sosfiltfilt};
pub use lowpass::{
    CUTOFF_EPSILON, DEFAULT_CUTOFF_HZ, DEFAULT_ORDER, DEFAULT_SAMPLE_RATE, FilterNotice,
    FilterPath, Filtered, lowpass_filter, normalized_cutoff,
};
