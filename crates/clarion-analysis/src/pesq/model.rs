//! Perceptual model: from aligned signals to disturbance indicators.
//!
//! Per 50 %-overlapped frame, both signals are mapped to Bark-band pitch
//! power densities. The reference is corrected towards the degraded
//! signal's long-term spectrum, the degraded signal is corrected for
//! short-term gain changes, and both are turned into loudness densities. The
//! loudness difference (with a dead zone for masking) gives the symmetric
//! disturbance; weighting it by the power ratio gives the asymmetric
//! disturbance that penalizes added components. Runs of badly disturbed
//! frames get a second delay search, and a frame keeps whichever disturbance
//! is lower. Frames are aggregated with an L6 norm over split-second
//! intervals and an L2 norm over time.

use std::ops::Range;

use tracing::debug;

use super::align::{TimeAlignment, active_runs};
use super::bands::{BarkBands, Layout};
use crate::fft::{Fft, Window};
use crate::xcorr::{peak_near, xcorr_window};

/// Audible reference power below which a frame counts as silent.
const SILENCE_THRESHOLD: f64 = 1e7;
/// Bands count as audible above this multiple of the hearing threshold.
const AUDIBLE_FACTOR: f64 = 1e2;
/// Added to band averages in the frequency response compensation.
const FREQ_COMP_OFFSET: f64 = 1000.0;
const FREQ_COMP_RANGE: (f64, f64) = (0.01, 100.0);
/// Added to audible powers in the gain compensation.
const GAIN_COMP_OFFSET: f64 = 5e3;
const GAIN_COMP_RANGE: (f64, f64) = (3e-4, 5.0);
/// Weight of the previous frame's gain.
const GAIN_SMOOTHING: f64 = 0.2;
/// Dead zone as a fraction of the smaller loudness.
const MASKING_FRACTION: f64 = 0.25;
/// Asymmetry factor parameters.
const ASYM_OFFSET: f64 = 50.0;
const ASYM_POWER: f64 = 1.2;
const ASYM_MIN: f64 = 3.0;
const ASYM_MAX: f64 = 12.0;
/// Frame disturbance ceiling.
const MAX_FRAME_DISTURBANCE: f64 = 45.0;
/// Frames per split-second interval.
const FRAMES_PER_INTERVAL: usize = 20;
const INTERVAL_POWER: f64 = 6.0;
const TIME_POWER: f64 = 2.0;
/// Frames disturbed beyond this are candidates for re-alignment.
const BAD_FRAME_THRESHOLD: f64 = 30.0;
/// Shortest run of bad frames that is re-aligned.
const MIN_BAD_FRAMES: usize = 5;
/// Re-alignment search reach in frame hops.
const REALIGN_SEARCH_HOPS: i64 = 4;

/// Symmetric and asymmetric disturbance over the whole file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Indicators {
    pub disturbance: f64,
    pub asymmetry: f64,
}

/// Per-frame pitch power densities and frame powers of both signals.
struct FrameSpectra {
    /// Index of the first analysed frame
    first: usize,
    reference: Vec<Vec<f64>>,
    degraded: Vec<Vec<f64>>,
    reference_power: Vec<f64>,
}

/// Hann-windowed FFT front end shared by every frame.
struct Analyser<'a> {
    layout: &'a Layout,
    window: Vec<f64>,
    fft: Fft,
}

impl<'a> Analyser<'a> {
    fn new(layout: &'a Layout) -> Self {
        Self {
            layout,
            window: Window::Hann.coefficients(layout.frame_len),
            fft: Fft::new(layout.frame_len),
        }
    }

    fn pitch_power(&self, frame: &[f64]) -> Vec<f64> {
        let windowed: Vec<f64> = frame.iter().zip(&self.window).map(|(a, w)| a * w).collect();
        self.layout.bands.pitch_power(&self.fft.power_spectrum(&windowed))
    }
}

fn sample_at(signal: &[f64], index: i64) -> f64 {
    usize::try_from(index)
        .ok()
        .and_then(|i| signal.get(i))
        .copied()
        .unwrap_or(0.0)
}

/// `len` samples of `signal` from `start + delay`, zero outside it.
fn shifted_frame(signal: &[f64], start: usize, len: usize, delay: i64) -> Vec<f64> {
    (0..len)
        .map(|i| sample_at(signal, (start + i) as i64 + delay))
        .collect()
}

/// Frames between the start of the first and the end of the last utterance.
fn frame_range(timing: &TimeAlignment, hop: usize, num_frames: usize) -> (usize, usize) {
    let span = timing.speech_span();
    let last = num_frames.saturating_sub(1);
    let start = (span.start / hop).min(last);
    let stop = (span.end / hop).clamp(start, last);
    (start, stop)
}

fn analyse(
    reference: &[f64],
    degraded: &[f64],
    timing: &TimeAlignment,
    analyser: &Analyser,
) -> FrameSpectra {
    let n = analyser.layout.frame_len;
    let hop = analyser.layout.hop();
    let num_frames = if reference.len() >= n {
        (reference.len() - n) / hop + 1
    } else {
        0
    };
    let (start, stop) = frame_range(timing, hop, num_frames);

    let mut spectra = FrameSpectra {
        first: start,
        reference: Vec::with_capacity(stop + 1 - start),
        degraded: Vec::with_capacity(stop + 1 - start),
        reference_power: Vec::with_capacity(stop + 1 - start),
    };

    for frame in start..=stop.min(num_frames.saturating_sub(1)) {
        let s = frame * hop;
        if s + n > reference.len() {
            break;
        }
        let delay = timing.delay_at(s + n / 2);
        let ref_frame = &reference[s..s + n];

        spectra
            .reference_power
            .push(ref_frame.iter().map(|x| x * x).sum::<f64>() / n as f64);
        spectra.reference.push(analyser.pitch_power(ref_frame));
        spectra
            .degraded
            .push(analyser.pitch_power(&shifted_frame(degraded, s, n, delay)));
    }
    spectra
}

/// Scales the reference towards the degraded signal's average band power over
/// non-silent frames.
fn compensate_frequency_response(spectra: &mut FrameSpectra, layout: &Layout) {
    let bands = &layout.bands;
    let speech: Vec<usize> = (0..spectra.reference.len())
        .filter(|&f| {
            bands.total_audible(&spectra.reference[f], AUDIBLE_FACTOR) >= SILENCE_THRESHOLD
        })
        .collect();
    if speech.is_empty() {
        return;
    }

    for b in 0..bands.len() {
        let audible = AUDIBLE_FACTOR * bands.abs_threshold[b];
        let average = |frames: &[Vec<f64>]| -> f64 {
            speech
                .iter()
                .map(|&f| frames[f][b])
                .filter(|&p| p > audible)
                .sum::<f64>()
                / speech.len() as f64
        };
        let avg_ref = average(&spectra.reference);
        let avg_deg = average(&spectra.degraded);

        let factor = ((avg_deg + FREQ_COMP_OFFSET) / (avg_ref + FREQ_COMP_OFFSET))
            .clamp(FREQ_COMP_RANGE.0, FREQ_COMP_RANGE.1);
        for frame in &mut spectra.reference {
            frame[b] *= factor;
        }
    }
}

/// Ratio of audible reference power to audible degraded power.
fn gain_ratio(bands: &BarkBands, reference: &[f64], degraded: &[f64]) -> f64 {
    (bands.total_audible(reference, 1.0) + GAIN_COMP_OFFSET)
        / (bands.total_audible(degraded, 1.0) + GAIN_COMP_OFFSET)
}

/// Scales each degraded frame by the smoothed ratio of audible powers.
///
/// The smoothing runs on the unclamped ratios; only the applied gain is
/// clamped.
fn compensate_gain(spectra: &mut FrameSpectra, layout: &Layout) {
    let bands = &layout.bands;
    let mut previous: Option<f64> = None;
    for (reference, degraded) in spectra.reference.iter().zip(spectra.degraded.iter_mut()) {
        let ratio = gain_ratio(bands, reference, degraded);
        let smoothed = match previous {
            Some(prev) => GAIN_SMOOTHING * prev + (1.0 - GAIN_SMOOTHING) * ratio,
            None => ratio,
        };
        previous = Some(smoothed);
        let gain = smoothed.clamp(GAIN_COMP_RANGE.0, GAIN_COMP_RANGE.1);
        for p in degraded.iter_mut() {
            *p *= gain;
        }
    }
}

/// Symmetric and asymmetric disturbance of one frame.
fn frame_disturbance(
    reference: &[f64],
    degraded: &[f64],
    frame_power: f64,
    layout: &Layout,
) -> (f64, f64) {
    let bands = &layout.bands;
    let loud_ref = bands.loudness(reference);
    let loud_deg = bands.loudness(degraded);

    let density: Vec<f64> = loud_deg
        .iter()
        .zip(&loud_ref)
        .map(|(&d, &r)| {
            let diff = d - r;
            let mask = MASKING_FRACTION * d.min(r);
            if diff > mask {
                diff - mask
            } else if diff < -mask {
                diff + mask
            } else {
                0.0
            }
        })
        .collect();

    let asymmetric: Vec<f64> = density
        .iter()
        .zip(reference.iter().zip(degraded))
        .map(|(&d, (&r, &g))| {
            let factor = ((g + ASYM_OFFSET) / (r + ASYM_OFFSET)).powf(ASYM_POWER);
            let factor = if factor < ASYM_MIN { 0.0 } else { factor.min(ASYM_MAX) };
            d * factor
        })
        .collect();

    let weight = ((frame_power + 1e5) / 1e7).powf(0.04);
    let symmetric = (bands.pseudo_lp(&density, 2.0) / weight).min(MAX_FRAME_DISTURBANCE);
    let asymmetric = (bands.pseudo_lp(&asymmetric, 1.0) / weight).min(MAX_FRAME_DISTURBANCE);
    (symmetric, asymmetric)
}

/// Runs of at least [`MIN_BAD_FRAMES`] frames above [`BAD_FRAME_THRESHOLD`].
fn bad_intervals(symmetric: &[f64]) -> Vec<Range<usize>> {
    let excess: Vec<f64> = symmetric
        .iter()
        .map(|&d| (d - BAD_FRAME_THRESHOLD).max(0.0))
        .collect();
    active_runs(&excess)
        .into_iter()
        .filter(|run| run.len() >= MIN_BAD_FRAMES)
        .collect()
}

/// Searches a new delay over each bad interval and keeps, per frame, the
/// lower of the old and re-aligned disturbances.
fn realign_bad_intervals(
    reference: &[f64],
    degraded: &[f64],
    timing: &TimeAlignment,
    analyser: &Analyser,
    spectra: &FrameSpectra,
    symmetric: &mut [f64],
    asymmetric: &mut [f64],
) {
    let layout = analyser.layout;
    let (n, hop) = (layout.frame_len, layout.hop());
    let reach = REALIGN_SEARCH_HOPS * hop as i64;

    for interval in bad_intervals(symmetric) {
        let start = (spectra.first + interval.start) * hop;
        let end = ((spectra.first + interval.end - 1) * hop + n).min(reference.len());
        let current = timing.delay_at((start + end) / 2);
        let lags = current - reach..=current + reach;
        let scores = xcorr_window(reference, degraded, start..end, lags);
        let Some((delay, _)) = peak_near(&scores, current) else {
            continue;
        };
        if delay == current {
            continue;
        }
        debug!(start, end, from = current, to = delay, "PESQ bad interval re-aligned");

        for f in interval {
            let s = (spectra.first + f) * hop;
            let mut deg = analyser.pitch_power(&shifted_frame(degraded, s, n, delay));
            let gain = gain_ratio(&layout.bands, &spectra.reference[f], &deg)
                .clamp(GAIN_COMP_RANGE.0, GAIN_COMP_RANGE.1);
            for p in &mut deg {
                *p *= gain;
            }
            let (sym, asym) =
                frame_disturbance(&spectra.reference[f], &deg, spectra.reference_power[f], layout);
            if sym < symmetric[f] {
                symmetric[f] = sym;
                asymmetric[f] = asym;
            }
        }
    }
}

/// L6 over split-second intervals (half-overlapping, zero-padded at the
/// end), then L2 over the intervals.
pub(crate) fn aggregate(frames: &[f64]) -> f64 {
    if frames.is_empty() {
        return 0.0;
    }
    let mut total = 0.0;
    let mut count = 0usize;
    for start in (0..frames.len()).step_by(FRAMES_PER_INTERVAL / 2) {
        let interval: f64 = (start..start + FRAMES_PER_INTERVAL)
            .filter_map(|f| frames.get(f))
            .map(|d| d.powf(INTERVAL_POWER))
            .sum::<f64>()
            / FRAMES_PER_INTERVAL as f64;
        total += interval.powf(1.0 / INTERVAL_POWER).powf(TIME_POWER);
        count += 1;
    }
    (total / count as f64).powf(1.0 / TIME_POWER)
}

/// Runs the perceptual model over level-aligned, filtered signals.
pub(crate) fn indicators(
    reference: &[f64],
    degraded: &[f64],
    timing: &TimeAlignment,
    layout: &Layout,
) -> Indicators {
    let analyser = Analyser::new(layout);
    let mut spectra = analyse(reference, degraded, timing, &analyser);
    compensate_frequency_response(&mut spectra, layout);
    compensate_gain(&mut spectra, layout);

    let (mut symmetric, mut asymmetric): (Vec<f64>, Vec<f64>) = spectra
        .reference
        .iter()
        .zip(&spectra.degraded)
        .zip(&spectra.reference_power)
        .map(|((r, d), &p)| frame_disturbance(r, d, p, layout))
        .unzip();
    realign_bad_intervals(
        reference,
        degraded,
        timing,
        &analyser,
        &spectra,
        &mut symmetric,
        &mut asymmetric,
    );

    Indicators {
        disturbance: aggregate(&symmetric),
        asymmetry: aggregate(&asymmetric),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pesq::align::Utterance;

    #[test]
    fn aggregate_of_constant_is_constant() {
        let frames = vec![3.0; 40];
        // The last interval is half padding, so it reads lower than 3.
        let d = aggregate(&frames);
        assert!(d > 2.5 && d <= 3.0, "{d}");
        assert_eq!(aggregate(&[0.0; 10]), 0.0);
        assert_eq!(aggregate(&[]), 0.0);
    }

    #[test]
    fn aggregate_emphasises_peaks() {
        let mut frames = vec![0.0; 40];
        frames[5] = 10.0;
        let spread = vec![10.0 / 40.0; 40];
        assert!(aggregate(&frames) > aggregate(&spread));
    }

    #[test]
    fn identical_frames_have_no_disturbance() {
        let layout = Layout::new(8000);
        let pitch: Vec<f64> = (0..layout.bands.len()).map(|b| 1e4 * (1.0 + b as f64)).collect();
        assert_eq!(frame_disturbance(&pitch, &pitch, 1e7, &layout), (0.0, 0.0));
    }

    #[test]
    fn added_energy_is_asymmetric() {
        let layout = Layout::new(8000);
        let reference = vec![1e4; layout.bands.len()];
        let mut degraded = reference.clone();
        for p in &mut degraded[20..30] {
            *p = 1e6;
        }
        let (d_add, a_add) = frame_disturbance(&reference, &degraded, 1e7, &layout);
        assert!(d_add > 0.0 && a_add > 0.0);

        // Removing the same energy from the reference side is not asymmetric.
        let (d_rem, a_rem) = frame_disturbance(&degraded, &reference, 1e7, &layout);
        assert!(d_rem > 0.0);
        assert_eq!(a_rem, 0.0);
    }

    #[test]
    fn frame_range_follows_speech() {
        let timing = TimeAlignment {
            utterances: vec![Utterance {
                span: 1000..3000,
                delay: 0,
            }],
        };
        assert_eq!(frame_range(&timing, 128, 100), (7, 23));
        assert_eq!(frame_range(&timing, 128, 10), (7, 9));
    }

    #[test]
    fn bad_intervals_need_five_frames() {
        let mut d = vec![0.0; 30];
        d[2..5].fill(40.0);
        d[10..16].fill(31.0);
        d[20] = 45.0;
        assert_eq!(bad_intervals(&d), vec![10..16]);
    }

    #[test]
    fn gain_is_clamped_after_smoothing() {
        let layout = Layout::new(8000);
        let loud = vec![1e9; layout.bands.len()];
        let quiet = vec![1e-3; layout.bands.len()];
        let mut spectra = FrameSpectra {
            first: 0,
            reference: vec![loud.clone(), loud.clone()],
            degraded: vec![quiet.clone(), loud.clone()],
            reference_power: vec![1e7; 2],
        };
        compensate_gain(&mut spectra, &layout);
        let ceiling = GAIN_COMP_RANGE.1;
        assert!((spectra.degraded[0][10] - quiet[10] * ceiling).abs() < 1e-12);
        // The second frame matches, but the unclamped boost carried over from
        // the first still saturates its gain.
        assert!((spectra.degraded[1][10] / loud[10] - ceiling).abs() < 1e-12);
    }

    #[test]
    fn bad_interval_is_realigned() {
        let mut state = 0x5eed_u32;
        let x: Vec<f64> = (0..8000)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                1e3 * f64::from(state as i32) / f64::from(i32::MAX)
            })
            .collect();
        let mut y = vec![0.0; 200];
        y.extend_from_slice(&x[..x.len() - 200]);

        // Timing that misses the 200-sample delay.
        let timing = TimeAlignment {
            utterances: vec![Utterance {
                span: 0..x.len(),
                delay: 0,
            }],
        };
        let layout = Layout::new(8000);
        let analyser = Analyser::new(&layout);
        let spectra = analyse(&x, &y, &timing, &analyser);
        let frames = spectra.reference.len();
        let mut symmetric = vec![MAX_FRAME_DISTURBANCE; frames];
        let mut asymmetric = vec![MAX_FRAME_DISTURBANCE; frames];

        realign_bad_intervals(
            &x,
            &y,
            &timing,
            &analyser,
            &spectra,
            &mut symmetric,
            &mut asymmetric,
        );
        // Frames that fit inside the shifted signal now match exactly.
        let inside = (x.len() - 200 - layout.frame_len) / layout.hop() + 1;
        assert!(symmetric[..inside].iter().all(|&d| d == 0.0), "{symmetric:?}");
        assert!(asymmetric[..inside].iter().all(|&d| d == 0.0));
        assert!(symmetric.iter().all(|&d| d <= MAX_FRAME_DISTURBANCE));
    }

    #[test]
    fn sample_at_zero_pads() {
        let x = [1.0, 2.0];
        assert_eq!(sample_at(&x, -1), 0.0);
        assert_eq!(sample_at(&x, 1), 2.0);
        assert_eq!(sample_at(&x, 2), 0.0);
    }
}
