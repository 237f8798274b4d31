//! Quality evaluation settings and their TOML file format.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, FileAction};
use crate::validation::{ValidationResult, validate_settings};

/// An objective quality metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Signal-to-noise ratio
    Snr,
    /// Peak signal-to-noise ratio
    Psnr,
    /// Mean squared error
    Mse,
    /// Perceptual evaluation of speech quality
    Pesq,
    /// Short-time objective intelligibility
    Stoi,
}

impl Metric {
    /// Every metric, in report order.
    pub const ALL: [Metric; 5] = [
        Metric::Snr,
        Metric::Psnr,
        Metric::Mse,
        Metric::Pesq,
        Metric::Stoi,
    ];

    /// Lowercase identifier used in TOML and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Snr => "snr",
            Metric::Psnr => "psnr",
            Metric::Mse => "mse",
            Metric::Pesq => "pesq",
            Metric::Stoi => "stoi",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Low-pass conditioning applied to the reference before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LowpassSettings {
    /// Cutoff frequency in Hz.
    #[serde(default = "default_cutoff_hz")]
    pub cutoff_hz: f64,

    /// Butterworth order.
    #[serde(default = "default_order")]
    pub order: usize,
}

impl Default for LowpassSettings {
    fn default() -> Self {
        Self {
            cutoff_hz: default_cutoff_hz(),
            order: default_order(),
        }
    }
}

/// How a reference/degraded pair is scored.
///
/// # TOML Format
///
/// ```toml
/// sample_rate = 16000
/// max_val = 1.0
/// metrics = ["snr", "psnr", "mse", "pesq", "stoi"]
///
/// [reference_lowpass]
/// cutoff_hz = 8000.0
/// order = 5
/// ```
///
/// Every key is optional; omitted keys take the defaults shown above, except
/// `reference_lowpass`, which is off unless the table is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySettings {
    /// Sample rate of both signals in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Peak value used by PSNR.
    #[serde(default = "default_max_val")]
    pub max_val: f64,

    /// Metrics to compute.
    #[serde(default = "default_metrics")]
    pub metrics: Vec<Metric>,

    /// Optional low-pass conditioning of the reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_lowpass: Option<LowpassSettings>,
}

fn default_sample_rate() -> u32 {
    clarion_core::DEFAULT_SAMPLE_RATE as u32
}

fn default_max_val() -> f64 {
    1.0
}

fn default_metrics() -> Vec<Metric> {
    Metric::ALL.to_vec()
}

fn default_cutoff_hz() -> f64 {
    clarion_core::DEFAULT_CUTOFF_HZ
}

fn default_order() -> usize {
    clarion_core::DEFAULT_ORDER
}

impl QualitySettings {
    /// Settings for the given sample rate with every other value defaulted.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    /// Set the PSNR peak value.
    pub fn with_max_val(mut self, max_val: f64) -> Self {
        self.max_val = max_val;
        self
    }

    /// Replace the metric selection.
    pub fn with_metrics(mut self, metrics: impl IntoIterator<Item = Metric>) -> Self {
        self.metrics = metrics.into_iter().collect();
        self
    }

    /// Enable low-pass conditioning of the reference.
    pub fn with_reference_lowpass(mut self, cutoff_hz: f64, order: usize) -> Self {
        self.reference_lowpass = Some(LowpassSettings { cutoff_hz, order });
        self
    }

    /// True when `metric` is selected.
    pub fn is_enabled(&self, metric: Metric) -> bool {
        self.metrics.contains(&metric)
    }

    /// Check that every value is usable by the metrics.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_settings(self)
    }

    /// Load settings from a TOML file and validate them.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::io(FileAction::Read, path, e))?;
        let settings = Self::from_toml(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a TOML string (no validation).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the settings to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::io(FileAction::CreateDir, parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::io(FileAction::Write, path, e))?;
        Ok(())
    }

    /// Convert the settings to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            max_val: default_max_val(),
            metrics: default_metrics(),
            reference_lowpass: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = QualitySettings::default();
        assert_eq!(settings.sample_rate, 16000);
        assert_eq!(settings.max_val, 1.0);
        assert_eq!(settings.metrics, Metric::ALL.to_vec());
        assert!(settings.reference_lowpass.is_none());
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let settings = QualitySettings::from_toml("").unwrap();
        assert_eq!(settings, QualitySettings::default());
    }

    #[test]
    fn test_lowpass_table_defaults() {
        let settings = QualitySettings::from_toml("[reference_lowpass]\n").unwrap();
        assert_eq!(settings.reference_lowpass, Some(LowpassSettings::default()));
        assert_eq!(settings.reference_lowpass.unwrap().cutoff_hz, 8000.0);
        assert_eq!(settings.reference_lowpass.unwrap().order, 5);
    }

    #[test]
    fn test_builder() {
        let settings = QualitySettings::new(8000)
            .with_max_val(32768.0)
            .with_metrics([Metric::Pesq])
            .with_reference_lowpass(3400.0, 4);
        assert_eq!(settings.sample_rate, 8000);
        assert_eq!(settings.max_val, 32768.0);
        assert!(settings.is_enabled(Metric::Pesq));
        assert!(!settings.is_enabled(Metric::Snr));
        assert_eq!(
            settings.reference_lowpass,
            Some(LowpassSettings {
                cutoff_hz: 3400.0,
                order: 4
            })
        );
    }

    #[test]
    fn test_unknown_metric_rejected() {
        let result = QualitySettings::from_toml(r#"metrics = ["snr", "pola"]"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_toml_roundtrip() {
        let settings = QualitySettings::new(22050).with_reference_lowpass(5000.0, 3);
        let text = settings.to_toml().unwrap();
        assert!(text.contains("sample_rate = 22050"));
        assert!(text.contains("[reference_lowpass]"));
        assert_eq!(QualitySettings::from_toml(&text).unwrap(), settings);
    }

    #[test]
    fn test_metric_display() {
        let names: Vec<String> = Metric::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["snr", "psnr", "mse", "pesq", "stoi"]);
    }
}
