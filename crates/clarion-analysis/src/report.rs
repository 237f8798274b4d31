//! One-pass evaluation of a configured metric set.
//!
//! [`evaluate`] runs every metric enabled in a [`QualitySettings`] and
//! collects the results into a serializable [`QualityReport`]. A failing
//! perceptual metric is recorded in the report and does not stop the others.

use clarion_config::{Metric, QualitySettings};
use clarion_core::{FilterPath, align, lowpass_filter};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::metrics::{mse, psnr, snr};
use crate::{pesq_score, stoi_score};

/// Score or failure of a metric that can fail.
///
/// Serializes as `{"score": 4.5}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricOutcome {
    /// The metric produced a value
    Score(f64),
    /// The metric failed; the message is the error's display text
    Error(String),
}

impl MetricOutcome {
    fn from_result<E: std::fmt::Display>(result: std::result::Result<f64, E>) -> Self {
        match result {
            Ok(score) => MetricOutcome::Score(score),
            Err(err) => MetricOutcome::Error(err.to_string()),
        }
    }

    /// The score, if the metric succeeded.
    pub fn score(&self) -> Option<f64> {
        match self {
            MetricOutcome::Score(score) => Some(*score),
            MetricOutcome::Error(_) => None,
        }
    }
}

/// How the reference was conditioned before scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceFilter {
    /// Requested cutoff in Hz
    pub cutoff_hz: f64,
    /// Butterworth order
    pub order: usize,
    /// Filtering path taken: `zero_phase`, `single_pass` or `passthrough`
    pub path: &'static str,
    /// Advisory notices raised while filtering
    pub notices: Vec<String>,
}

/// Results of [`evaluate`]. Metrics that were not enabled are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    /// Sample rate the pair was scored at
    pub sample_rate: u32,
    /// Length of the common prefix that was compared
    pub samples: usize,
    /// Reference conditioning, when configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_filter: Option<ReferenceFilter>,
    /// Signal-to-noise ratio in dB
    pub snr: Option<f64>,
    /// Peak signal-to-noise ratio in dB
    pub psnr: Option<f64>,
    /// Mean squared error
    pub mse: Option<f64>,
    /// PESQ MOS-LQO
    pub pesq: Option<MetricOutcome>,
    /// STOI
    pub stoi: Option<MetricOutcome>,
}

fn path_name(path: FilterPath) -> &'static str {
    match path {
        FilterPath::ZeroPhase => "zero_phase",
        FilterPath::SinglePass => "single_pass",
        FilterPath::Passthrough => "passthrough",
    }
}

/// Scores `noisy` against `clean` with every metric enabled in `settings`.
///
/// When `settings.reference_lowpass` is set, `clean` is low-pass filtered
/// first and the filtered signal is the reference for all metrics.
///
/// # Errors
///
/// - [`Error::Settings`](crate::Error::Settings) if `settings` fail validation
/// - [`Error::Filter`](crate::Error::Filter) if the low-pass rejects its arguments
///
/// PESQ and STOI failures are not errors here; they are reported as
/// [`MetricOutcome::Error`].
pub fn evaluate(clean: &[f32], noisy: &[f32], settings: &QualitySettings) -> Result<QualityReport> {
    settings.validate()?;
    let sample_rate = settings.sample_rate;

    let mut reference_filter = None;
    let conditioned;
    let clean = match &settings.reference_lowpass {
        Some(lowpass) => {
            let filtered = lowpass_filter(
                clean,
                lowpass.cutoff_hz,
                f64::from(sample_rate),
                lowpass.order,
            )?;
            reference_filter = Some(ReferenceFilter {
                cutoff_hz: lowpass.cutoff_hz,
                order: lowpass.order,
                path: path_name(filtered.path),
                notices: filtered.notices.iter().map(ToString::to_string).collect(),
            });
            conditioned = filtered.into_samples();
            conditioned.as_slice()
        }
        None => clean,
    };

    let samples = align(clean, noisy).0.len();
    debug!(sample_rate, samples, metrics = settings.metrics.len(), "evaluating");

    let enabled = |metric| settings.is_enabled(metric);
    Ok(QualityReport {
        sample_rate,
        samples,
        reference_filter,
        snr: enabled(Metric::Snr).then(|| snr(clean, noisy)),
        psnr: enabled(Metric::Psnr).then(|| psnr(clean, noisy, settings.max_val)),
        mse: enabled(Metric::Mse).then(|| mse(clean, noisy)),
        pesq: enabled(Metric::Pesq)
            .then(|| MetricOutcome::from_result(pesq_score(clean, noisy, sample_rate))),
        stoi: enabled(Metric::Stoi)
            .then(|| MetricOutcome::from_result(stoi_score(clean, noisy, sample_rate))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use clarion_config::ValidationError;

    fn ramp(n: usize) -> Vec<f32> {
        (0..n).map(|i| (i % 50) as f32 / 50.0 - 0.5).collect()
    }

    #[test]
    fn runs_only_enabled_metrics() {
        let x = ramp(400);
        let settings = QualitySettings::new(16000).with_metrics([Metric::Mse, Metric::Psnr]);
        let report = evaluate(&x, &x, &settings).unwrap();
        assert_eq!(report.mse, Some(0.0));
        assert_eq!(report.psnr, Some(100.0));
        assert_eq!(report.snr, None);
        assert_eq!(report.pesq, None);
        assert_eq!(report.stoi, None);
        assert_eq!(report.samples, 400);
    }

    #[test]
    fn compares_common_prefix() {
        let clean = ramp(300);
        let noisy = ramp(200);
        let settings = QualitySettings::new(16000).with_metrics([Metric::Mse]);
        let report = evaluate(&clean, &noisy, &settings).unwrap();
        assert_eq!(report.samples, 200);
        assert_eq!(report.mse, Some(0.0));
    }

    #[test]
    fn uses_configured_peak_value() {
        let clean = [1.0_f32, -1.0, 1.0, -1.0];
        let noisy = [0.0_f32; 4];
        let settings = QualitySettings::new(16000)
            .with_metrics([Metric::Psnr])
            .with_max_val(10.0);
        let report = evaluate(&clean, &noisy, &settings).unwrap();
        assert!((report.psnr.unwrap() - 20.0).abs() < 1e-12);
    }

    #[test]
    fn perceptual_failures_are_recorded() {
        let silence = vec![0.0_f32; 16000];
        let settings = QualitySettings::new(16000).with_metrics([Metric::Pesq, Metric::Mse]);
        let report = evaluate(&silence, &silence, &settings).unwrap();
        assert_eq!(
            report.pesq,
            Some(MetricOutcome::Error(
                "no utterances detected in the reference signal".to_string()
            ))
        );
        assert_eq!(report.mse, Some(0.0));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let x = ramp(100);
        let settings = QualitySettings::new(0);
        assert!(matches!(
            evaluate(&x, &x, &settings),
            Err(Error::Settings(ValidationError::ZeroSampleRate))
        ));
    }

    #[test]
    fn reference_lowpass_is_recorded() {
        let x = ramp(1000);
        let settings = QualitySettings::new(16000)
            .with_metrics([Metric::Mse])
            .with_reference_lowpass(2000.0, 4);
        let report = evaluate(&x, &x, &settings).unwrap();
        let filter = report.reference_filter.unwrap();
        assert_eq!(filter.path, "zero_phase");
        assert!(filter.notices.is_empty());
        // The sawtooth loses its upper harmonics, so the pair no longer matches.
        assert!(report.mse.unwrap() > 0.0);
    }

    #[test]
    fn serializes_outcomes() {
        let x = ramp(100);
        let settings = QualitySettings::new(16000).with_metrics([Metric::Mse, Metric::Stoi]);
        let report = evaluate(&x, &x, &settings).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mse"], 0.0);
        assert!(json["snr"].is_null());
        // Too short for one STOI segment: scored at the floor, not failed.
        assert_eq!(json["stoi"]["score"], 1e-5);
        assert!(json.get("reference_filter").is_none());

        let ok = serde_json::to_value(MetricOutcome::Score(4.5)).unwrap();
        assert_eq!(ok, serde_json::json!({ "score": 4.5 }));
    }
}
