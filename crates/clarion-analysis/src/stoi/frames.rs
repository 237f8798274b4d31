//! Framing, silent-frame removal and the short-time spectrum.

use crate::fft::{Fft, Window};

/// Frame starts at `hop` spacing while `start < len - frame_len`.
///
/// A frame that would end exactly at `len` is not produced.
fn frame_starts(len: usize, frame_len: usize, hop: usize) -> impl Iterator<Item = usize> {
    let count = if len > frame_len {
        (len - frame_len - 1) / hop + 1
    } else {
        0
    };
    (0..count).map(move |i| i * hop)
}

fn windowed(signal: &[f64], start: usize, window: &[f64]) -> Vec<f64> {
    signal[start..start + window.len()]
        .iter()
        .zip(window)
        .map(|(s, w)| s * w)
        .collect()
}

fn overlap_add(frames: &[Vec<f64>], frame_len: usize, hop: usize) -> Vec<f64> {
    if frames.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; (frames.len() - 1) * hop + frame_len];
    for (i, frame) in frames.iter().enumerate() {
        for (o, s) in out[i * hop..].iter_mut().zip(frame) {
            *o += s;
        }
    }
    out
}

/// Drops frames of `x` more than `dyn_range` dB below its loudest frame, and
/// the same frames of `y`.
///
/// Both signals are cut into windowed frames, filtered on the energy of `x`
/// and reassembled by overlap-add. Inputs must have equal length.
pub fn remove_silent_frames(
    x: &[f64],
    y: &[f64],
    dyn_range: f64,
    frame_len: usize,
    hop: usize,
) -> (Vec<f64>, Vec<f64>) {
    let window = Window::HannOpen.coefficients(frame_len);
    let len = x.len().min(y.len());

    let (x_frames, y_frames): (Vec<Vec<f64>>, Vec<Vec<f64>>) = frame_starts(len, frame_len, hop)
        .map(|s| (windowed(x, s, &window), windowed(y, s, &window)))
        .unzip();

    let energies: Vec<f64> = x_frames
        .iter()
        .map(|f| 20.0 * (f.iter().map(|v| v * v).sum::<f64>().sqrt() + f64::EPSILON).log10())
        .collect();
    let loudest = energies.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let (x_kept, y_kept): (Vec<Vec<f64>>, Vec<Vec<f64>>) = x_frames
        .into_iter()
        .zip(y_frames)
        .zip(&energies)
        .filter(|&(_, &e)| loudest - dyn_range - e < 0.0)
        .map(|(pair, _)| pair)
        .unzip();

    (
        overlap_add(&x_kept, frame_len, hop),
        overlap_add(&y_kept, frame_len, hop),
    )
}

/// Power spectra `|X[k]|²` of Hann-windowed frames, zero-padded to `nfft`.
///
/// Framed like [`remove_silent_frames`], so the final full frame is not
/// analysed.
pub fn stft_power(x: &[f64], frame_len: usize, nfft: usize, hop: usize) -> Vec<Vec<f64>> {
    let window = Window::HannOpen.coefficients(frame_len);
    let fft = Fft::new(nfft);

    frame_starts(x.len(), frame_len, hop)
        .map(|s| fft.power_spectrum(&windowed(x, s, &window)))
        .collect()
}
