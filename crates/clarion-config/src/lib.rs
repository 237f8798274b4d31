//! Settings for clarion quality evaluation.
//!
//! This crate describes *how* a reference/degraded pair is scored: which
//! metrics run, at what sample rate, the PSNR peak value, and whether the
//! reference is low-pass conditioned first.
//!
//! # Features
//!
//! - **Settings**: [`QualitySettings`] with serde defaults, loadable from TOML
//! - **Validation**: [`validate_settings`] rejects values the metrics cannot use
//!
//! # Example
//!
//! ```rust
//! use clarion_config::{LowpassSettings, Metric, QualitySettings};
//!
//! let settings = QualitySettings::from_toml(r#"
//!     sample_rate = 8000
//!     metrics = ["snr", "pesq"]
//!
//!     [reference_lowpass]
//!     cutoff_hz = 3400.0
//! "#).unwrap();
//!
//! assert_eq!(settings.sample_rate, 8000);
//! assert!(settings.is_enabled(Metric::Pesq));
//! assert!(!settings.is_enabled(Metric::Stoi));
//! assert_eq!(settings.reference_lowpass, Some(LowpassSettings { cutoff_hz: 3400.0, order: 5 }));
//! settings.validate().unwrap();
//! ```

mod error;
mod settings;

/// Settings validation.
pub mod validation;

pub use error::{ConfigError, FileAction};
pub use settings::{LowpassSettings, Metric, QualitySettings};
pub use validation::{ValidationError, ValidationResult, validate_settings};
