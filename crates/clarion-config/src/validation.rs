//! Settings validation.
//!
//! Parsing only guarantees that values have the right types; validation
//! checks that the metrics can actually run with them.
//!
//! # Example
//!
//! ```rust
//! use clarion_config::{QualitySettings, ValidationError, validate_settings};
//!
//! let settings = QualitySettings::new(0);
//! assert_eq!(validate_settings(&settings), Err(ValidationError::ZeroSampleRate));
//! ```

use thiserror::Error;

use crate::settings::QualitySettings;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Sample rate must be positive.
    #[error("sample rate must be > 0")]
    ZeroSampleRate,

    /// PSNR peak value must be positive and finite.
    #[error("max_val must be a positive finite number, got {0}")]
    InvalidMaxVal(f64),

    /// Low-pass cutoff must be positive.
    #[error("reference low-pass cutoff must be > 0 Hz, got {0}")]
    InvalidCutoff(f64),

    /// Low-pass order must be at least one.
    #[error("reference low-pass order must be >= 1")]
    ZeroOrder,

    /// No metric selected.
    #[error("at least one metric must be selected")]
    EmptyMetricSet,

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate settings, collecting every problem.
///
/// A single problem is returned as-is; several are wrapped in
/// [`ValidationError::Multiple`].
pub fn validate_settings(settings: &QualitySettings) -> ValidationResult<()> {
    let mut errors = Vec::new();

    if settings.sample_rate == 0 {
        errors.push(ValidationError::ZeroSampleRate);
    }
    if !(settings.max_val.is_finite() && settings.max_val > 0.0) {
        errors.push(ValidationError::InvalidMaxVal(settings.max_val));
    }
    if settings.metrics.is_empty() {
        errors.push(ValidationError::EmptyMetricSet);
    }
    if let Some(lowpass) = &settings.reference_lowpass {
        if lowpass.cutoff_hz.is_nan() || lowpass.cutoff_hz <= 0.0 {
            errors.push(ValidationError::InvalidCutoff(lowpass.cutoff_hz));
        }
        if lowpass.order == 0 {
            errors.push(ValidationError::ZeroOrder);
        }
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}
