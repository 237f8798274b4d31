//! Voice activity, utterance detection and delay estimation.
//!
//! Both signals are reduced to 4 ms block envelopes. A noise-floor threshold
//! marks active blocks; runs of activity become utterances. A file-wide
//! delay from the activity envelopes centres the search for each
//! utterance's own envelope delay. An utterance whose two parts line up
//! better at different delays is split in two, recursively. Each final
//! utterance's delay is then refined on the samples.

use std::ops::Range;

use tracing::debug;

use crate::error::PesqError;
use crate::xcorr::{peak_lag, peak_near, xcorr_fft, xcorr_window};

/// Shortest run of active blocks that counts as speech.
const MIN_SPEECH_BLOCKS: usize = 4;
/// Active runs separated by at most this many blocks (200 ms) merge.
const JOIN_GAP_BLOCKS: usize = 50;
/// Fine search reach around the crude delay, in blocks.
const FINE_SEARCH_BLOCKS: i64 = 2;
/// Noise-floor refinement passes.
const THRESHOLD_PASSES: usize = 12;
/// Threshold never drops below this fraction of the mean envelope.
const THRESHOLD_FLOOR: f64 = 1e-3;
/// Envelope delay search reach around the file delay, in blocks (300 ms).
const UTTERANCE_SEARCH_BLOCKS: i64 = 75;
/// Each part of a split utterance spans at least this many blocks.
const MIN_SPLIT_BLOCKS: usize = 50;
/// Spacing of candidate split points, in blocks.
const SPLIT_STEP_BLOCKS: usize = 10;
/// Splitting stops once this many utterances exist.
const MAX_UTTERANCES: usize = 50;

/// A stretch of reference speech and the degraded signal's delay over it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Utterance {
    /// Sample range in the reference
    pub span: Range<usize>,
    /// Degraded sample `n + delay` lines up with reference sample `n`
    pub delay: i64,
}

/// Result of time alignment.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TimeAlignment {
    pub utterances: Vec<Utterance>,
}

impl TimeAlignment {
    /// Delay to apply at reference sample `n`: the containing utterance's, or
    /// the nearest one's between utterances.
    pub fn delay_at(&self, n: usize) -> i64 {
        self.utterances
            .iter()
            .min_by_key(|u| {
                if u.span.contains(&n) {
                    0
                } else if n < u.span.start {
                    u.span.start - n
                } else {
                    n + 1 - u.span.end
                }
            })
            .map_or(0, |u| u.delay)
    }

    /// Reference samples from the first utterance start to the last utterance end.
    pub fn speech_span(&self) -> Range<usize> {
        let start = self.utterances.first().map_or(0, |u| u.span.start);
        let end = self.utterances.last().map_or(0, |u| u.span.end);
        start..end
    }
}

/// Mean power of each full block of `block` samples.
pub(crate) fn block_envelope(signal: &[f64], block: usize) -> Vec<f64> {
    signal
        .chunks_exact(block)
        .map(|c| c.iter().map(|x| x * x).sum::<f64>() / block as f64)
        .collect()
}

/// Activity weight per block: 0 for inactive blocks, `1 + ln(env / threshold)`
/// for active ones. Runs shorter than [`MIN_SPEECH_BLOCKS`] are cleared.
pub(crate) fn activity(envelope: &[f64]) -> Vec<f64> {
    let mean = envelope.iter().sum::<f64>() / envelope.len().max(1) as f64;
    if mean.is_nan() || mean <= 0.0 {
        return vec![0.0; envelope.len()];
    }

    let floor = THRESHOLD_FLOOR * mean;
    let mut threshold = mean;
    for _ in 0..THRESHOLD_PASSES {
        let (count, sum, sum_sq) = envelope
            .iter()
            .filter(|&&e| e <= threshold)
            .fold((0usize, 0.0, 0.0), |(c, s, q), &e| (c + 1, s + e, q + e * e));
        if count == 0 {
            break;
        }
        let noise = sum / count as f64;
        let std = (sum_sq / count as f64 - noise * noise).max(0.0).sqrt();
        let next = (noise + 2.0 * std).max(floor);
        if next == threshold {
            break;
        }
        threshold = next;
    }

    let mut weights: Vec<f64> = envelope
        .iter()
        .map(|&e| {
            if e >= threshold && e > 0.0 {
                1.0 + (e / threshold).ln()
            } else {
                0.0
            }
        })
        .collect();

    for run in active_runs(&weights) {
        if run.len() < MIN_SPEECH_BLOCKS {
            weights[run].fill(0.0);
        }
    }
    weights
}

/// Runs of consecutive positive values.
pub(crate) fn active_runs(weights: &[f64]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, &w) in weights.iter().enumerate() {
        match (w > 0.0, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push(s..i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(s..weights.len());
    }
    runs
}

/// Block ranges of utterances: active runs with short gaps bridged.
pub(crate) fn utterance_blocks(weights: &[f64]) -> Vec<Range<usize>> {
    let mut merged: Vec<Range<usize>> = Vec::new();
    for run in active_runs(weights) {
        match merged.last_mut() {
            Some(last) if run.start - last.end <= JOIN_GAP_BLOCKS => last.end = run.end,
            _ => merged.push(run),
        }
    }
    merged
}

/// Utterance in block units with its envelope delay.
#[derive(Debug, Clone, PartialEq)]
struct BlockUtterance {
    blocks: Range<usize>,
    /// Envelope delay in blocks
    delay: i64,
    /// Normalized envelope correlation at `delay`
    confidence: f64,
}

/// Envelope delay of the reference blocks in `blocks`, searched around `centre`.
fn locate(
    ref_weights: &[f64],
    deg_weights: &[f64],
    blocks: Range<usize>,
    centre: i64,
) -> BlockUtterance {
    let energy: f64 = ref_weights[blocks.clone()].iter().map(|w| w * w).sum();
    let lags = centre - UTTERANCE_SEARCH_BLOCKS..=centre + UTTERANCE_SEARCH_BLOCKS;
    let scores = xcorr_window(ref_weights, deg_weights, blocks.clone(), lags);
    let (delay, score) = peak_near(&scores, centre).unwrap_or((centre, 0.0));
    BlockUtterance {
        blocks,
        delay,
        confidence: if energy > 0.0 { score / energy.sqrt() } else { 0.0 },
    }
}

/// Best split of `utt` into two parts that line up at different delays, each
/// more confidently than the whole.
fn best_split(
    ref_weights: &[f64],
    deg_weights: &[f64],
    utt: &BlockUtterance,
) -> Option<(BlockUtterance, BlockUtterance)> {
    let (start, end) = (utt.blocks.start, utt.blocks.end);
    if end - start < 2 * MIN_SPLIT_BLOCKS {
        return None;
    }
    (start + MIN_SPLIT_BLOCKS..=end - MIN_SPLIT_BLOCKS)
        .step_by(SPLIT_STEP_BLOCKS)
        .map(|at| {
            (
                locate(ref_weights, deg_weights, start..at, utt.delay),
                locate(ref_weights, deg_weights, at..end, utt.delay),
            )
        })
        .filter(|(first, second)| {
            first.delay != second.delay
                && first.confidence > utt.confidence
                && second.confidence > utt.confidence
        })
        .max_by(|a, b| {
            let joint = |(first, second): &(BlockUtterance, BlockUtterance)| {
                first.confidence + second.confidence
            };
            joint(a).total_cmp(&joint(b))
        })
}

/// Splits utterances until no part gains from a split, keeping time order.
fn split_utterances(
    ref_weights: &[f64],
    deg_weights: &[f64],
    utterances: Vec<BlockUtterance>,
) -> Vec<BlockUtterance> {
    let mut done = Vec::with_capacity(utterances.len());
    let mut pending: Vec<BlockUtterance> = utterances.into_iter().rev().collect();
    while let Some(utt) = pending.pop() {
        let room = done.len() + pending.len() + 1 < MAX_UTTERANCES;
        match best_split(ref_weights, deg_weights, &utt).filter(|_| room) {
            Some((first, second)) => {
                debug!(
                    at = first.blocks.end,
                    first_delay = first.delay,
                    second_delay = second.delay,
                    "PESQ utterance split"
                );
                pending.push(second);
                pending.push(first);
            }
            None => done.push(utt),
        }
    }
    done
}

/// Finds utterances in `reference` and the delay of `degraded` over each.
///
/// # Errors
///
/// [`PesqError::NoUtterances`] when the reference has no speech activity.
pub(crate) fn estimate(
    reference: &[f64],
    degraded: &[f64],
    block: usize,
) -> Result<TimeAlignment, PesqError> {
    let ref_weights = activity(&block_envelope(reference, block));
    let deg_weights = activity(&block_envelope(degraded, block));

    let blocks = utterance_blocks(&ref_weights);
    if blocks.is_empty() {
        return Err(PesqError::NoUtterances);
    }

    let max_lag = ref_weights.len() / 2;
    let (crude_blocks, peak) = peak_lag(&xcorr_fft(&ref_weights, &deg_weights, max_lag), max_lag);
    let crude_blocks = if peak > 0.0 { crude_blocks } else { 0 };
    debug!(
        crude_delay = crude_blocks * block as i64,
        utterances = blocks.len(),
        "PESQ crude alignment"
    );

    let located = blocks
        .into_iter()
        .map(|b| locate(&ref_weights, &deg_weights, b, crude_blocks))
        .collect();
    let reach = FINE_SEARCH_BLOCKS * block as i64;
    let utterances = split_utterances(&ref_weights, &deg_weights, located)
        .into_iter()
        .map(|u| {
            let span = u.blocks.start * block..u.blocks.end * block;
            let crude = u.delay * block as i64;
            let delay = fine_delay(reference, degraded, span.clone(), crude, reach);
            debug!(start = span.start, end = span.end, delay, "PESQ utterance delay");
            Utterance { span, delay }
        })
        .collect();

    Ok(TimeAlignment { utterances })
}

/// Best lag within `crude ± reach`; ties go to the lag nearest `crude`.
fn fine_delay(
    reference: &[f64],
    degraded: &[f64],
    span: Range<usize>,
    crude: i64,
    reach: i64,
) -> i64 {
    let scores = xcorr_window(reference, degraded, span, crude - reach..=crude + reach);
    peak_near(&scores, crude).map_or(crude, |(lag, _)| lag)
}
