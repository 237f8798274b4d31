//! Perceptual Evaluation of Speech Quality (PESQ).
//!
//! Follows the ITU-T P.862 processing chain:
//!
//! 1. Level alignment of both signals to a fixed speech-band power
//! 2. Listening-device filter (handset receive characteristic for narrowband,
//!    100 Hz high-pass for wideband)
//! 3. Envelope VAD, utterance detection, crude and per-utterance delay
//! 4. Bark-band pitch power densities per 32 ms frame
//! 5. Frequency response and gain compensation, Zwicker loudness
//! 6. Symmetric and asymmetric disturbance, L6/L2 aggregation
//! 7. `raw = 4.5 - 0.1·D - 0.0309·A`, mapped to MOS-LQO (P.862.1 for
//!    narrowband, P.862.2 for wideband)
//!
//! Bands, density corrections and hearing thresholds come from the P.862
//! tables. Utterances are split where their delay jumps, and runs of badly
//! disturbed frames are realigned. The frame model is simplified in places,
//! so scores track P.862 closely without being bit-exact.
//!
//! ```rust
//! use clarion_analysis::pesq::{self, PesqMode};
//!
//! // Identical inputs score the mode's ceiling.
//! assert!((pesq::max_score(PesqMode::Narrowband) - 4.549).abs() < 1e-3);
//! assert!((pesq::max_score(PesqMode::Wideband) - 4.644).abs() < 1e-3);
//! ```

mod align;
mod bands;
mod level;
mod model;
mod tables;

use std::borrow::Cow;
use std::fmt;

use clarion_core::align as align_signals;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PesqError;
use crate::resample::Resampler;

use bands::Layout;

/// Native narrowband rate in Hz.
pub const NARROWBAND_RATE: u32 = 8_000;
/// Native wideband rate in Hz; other rates are resampled to it.
pub const WIDEBAND_RATE: u32 = 16_000;

/// Raw score of a perfect match.
pub const RAW_MAX: f64 = 4.5;
/// Weight of the symmetric disturbance in the raw score.
const DISTURBANCE_WEIGHT: f64 = 0.1;
/// Weight of the asymmetric disturbance in the raw score.
const ASYMMETRY_WEIGHT: f64 = 0.0309;

/// Scoring mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PesqMode {
    /// Telephone band (P.862 with P.862.1 mapping)
    #[serde(rename = "nb")]
    Narrowband,
    /// Wideband (P.862.2)
    #[serde(rename = "wb")]
    Wideband,
}

impl PesqMode {
    /// Short name: `"nb"` or `"wb"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            PesqMode::Narrowband => "nb",
            PesqMode::Wideband => "wb",
        }
    }

    /// True when the scoring core accepts `sample_rate` in this mode.
    pub fn supports(&self, sample_rate: u32) -> bool {
        match self {
            PesqMode::Narrowband => sample_rate == NARROWBAND_RATE || sample_rate == WIDEBAND_RATE,
            PesqMode::Wideband => sample_rate == WIDEBAND_RATE,
        }
    }
}

impl fmt::Display for PesqMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signals ready for the scoring core, after alignment and rate dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedInput<'a> {
    /// Mode chosen from the input rate
    pub mode: PesqMode,
    /// Rate of `reference` and `degraded`
    pub sample_rate: u32,
    /// Clean signal (borrowed unless resampled)
    pub reference: Cow<'a, [f32]>,
    /// Degraded signal (borrowed unless resampled)
    pub degraded: Cow<'a, [f32]>,
}

impl PreparedInput<'_> {
    /// True when the inputs had to be resampled.
    pub fn is_resampled(&self) -> bool {
        matches!(self.reference, Cow::Owned(_))
    }
}

/// Aligns the pair and picks the mode for `sample_rate`.
///
/// 16 kHz scores wideband, 8 kHz narrowband; any other rate is resampled to
/// 16 kHz and scored wideband.
///
/// # Errors
///
/// [`PesqError::InvalidSampleRate`] for a zero rate.
pub fn prepare<'a>(
    clean: &'a [f32],
    noisy: &'a [f32],
    sample_rate: u32,
) -> Result<PreparedInput<'a>, PesqError> {
    let (clean, noisy) = align_signals(clean, noisy);
    match sample_rate {
        0 => Err(PesqError::InvalidSampleRate {
            mode: PesqMode::Wideband,
            sample_rate,
        }),
        WIDEBAND_RATE | NARROWBAND_RATE => {
            let mode = if sample_rate == WIDEBAND_RATE {
                PesqMode::Wideband
            } else {
                PesqMode::Narrowband
            };
            debug!(sample_rate, %mode, "PESQ native rate");
            Ok(PreparedInput {
                mode,
                sample_rate,
                reference: Cow::Borrowed(clean),
                degraded: Cow::Borrowed(noisy),
            })
        }
        other => {
            debug!(from = other, to = WIDEBAND_RATE, "resampling for wideband PESQ");
            let resampler = Resampler::new(other, WIDEBAND_RATE);
            let convert = |x: &[f32]| -> Vec<f32> {
                let input: Vec<f64> = x.iter().map(|&v| f64::from(v)).collect();
                resampler.process(&input).into_iter().map(|v| v as f32).collect()
            };
            Ok(PreparedInput {
                mode: PesqMode::Wideband,
                sample_rate: WIDEBAND_RATE,
                reference: Cow::Owned(convert(clean)),
                degraded: Cow::Owned(convert(noisy)),
            })
        }
    }
}

/// Maps a raw P.862 score to MOS-LQO for `mode`.
///
/// ```text
/// narrowband: 0.999 + 4 / (1 + exp(-1.4945·raw + 4.6607))
/// wideband:   0.999 + 4 / (1 + exp(-1.3669·raw + 3.8224))
/// ```
pub fn mos_lqo(raw: f64, mode: PesqMode) -> f64 {
    let (slope, offset) = match mode {
        PesqMode::Narrowband => (1.4945, 4.6607),
        PesqMode::Wideband => (1.3669, 3.8224),
    };
    0.999 + 4.0 / (1.0 + (-slope * raw + offset).exp())
}

/// Score of two identical signals in `mode`.
pub fn max_score(mode: PesqMode) -> f64 {
    mos_lqo(RAW_MAX, mode)
}

/// Scores `degraded` against `reference` at `sample_rate` in `mode`.
///
/// Inputs are truncated to their common length.
///
/// # Errors
///
/// - [`PesqError::InvalidSampleRate`] if `mode` does not support `sample_rate`
///   (wideband needs 16 kHz, narrowband 8 or 16 kHz)
/// - [`PesqError::BufferTooShort`] for less than a quarter second of audio
/// - [`PesqError::NoUtterances`] if the reference holds no speech activity
pub fn pesq(
    reference: &[f32],
    degraded: &[f32],
    sample_rate: u32,
    mode: PesqMode,
) -> Result<f64, PesqError> {
    if !mode.supports(sample_rate) {
        return Err(PesqError::InvalidSampleRate { mode, sample_rate });
    }
    let (reference, degraded) = align_signals(reference, degraded);
    let min = sample_rate as usize / 4;
    if reference.len() < min {
        return Err(PesqError::BufferTooShort {
            len: reference.len(),
            min,
        });
    }

    let layout = Layout::new(sample_rate);
    let mut reference: Vec<f64> = reference.iter().map(|&v| f64::from(v)).collect();
    let mut degraded: Vec<f64> = degraded.iter().map(|&v| f64::from(v)).collect();

    if level::align_level(&mut reference, layout.sample_rate, mode).is_none() {
        return Err(PesqError::NoUtterances);
    }
    if level::align_level(&mut degraded, layout.sample_rate, mode).is_none() {
        debug!("degraded signal has no speech-band power");
    }
    let reference = level::input_filter(&reference, layout.sample_rate, mode);
    let degraded = level::input_filter(&degraded, layout.sample_rate, mode);

    let timing = align::estimate(&reference, &degraded, layout.downsample)?;
    let indicators = model::indicators(&reference, &degraded, &timing, &layout);

    let raw = RAW_MAX
        - DISTURBANCE_WEIGHT * indicators.disturbance
        - ASYMMETRY_WEIGHT * indicators.asymmetry;
    debug!(
        %mode,
        disturbance = indicators.disturbance,
        asymmetry = indicators.asymmetry,
        raw,
        "PESQ indicators"
    );
    Ok(mos_lqo(raw, mode))
}
