//! Error types for filter design and application.

use thiserror::Error;

/// Errors raised while designing or applying a filter.
///
/// Only [`FilterError::InvalidArgument`] ever escapes
/// [`lowpass_filter`](crate::lowpass_filter); the other variants describe why a
/// filtering path was abandoned and end up as notices.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// A caller-supplied argument is outside its valid domain.
    #[error("invalid argument '{param}': {reason}")]
    InvalidArgument {
        /// Name of the offending argument.
        param: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Filter order must be at least one.
    #[error("filter order must be >= 1, got {0}")]
    InvalidOrder(usize),

    /// Zero-phase filtering needs more samples than its edge padding.
    #[error("signal length {len} must be greater than padlen {padlen}")]
    SignalTooShort {
        /// Number of input samples.
        len: usize,
        /// Required edge padding.
        padlen: usize,
    },

    /// The filter produced NaN or infinite samples.
    #[error("filter output is not finite (ill-conditioned coefficients)")]
    NonFinite,
}

impl FilterError {
    /// Create an invalid argument error.
    pub fn invalid_argument(param: &'static str, reason: impl Into<String>) -> Self {
        FilterError::InvalidArgument {
            param,
            reason: reason.into(),
        }
    }
}
