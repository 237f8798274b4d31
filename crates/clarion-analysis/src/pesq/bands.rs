//! Bark-scale band layout and the psychoacoustic constants that go with it.

use super::tables::{
    ABS_THRESHOLD, BANDS_8K, BANDS_16K, BINS_PER_BAND_8K, BINS_PER_BAND_16K, CENTRE_BARK,
    DENSITY_CORRECTION_8K, DENSITY_CORRECTION_16K, WIDTH_BARK, WIDTH_HZ,
};

/// Power scaling from FFT bins to pitch power density at 8 kHz.
const SP_8K: f64 = 2.764_344e-5;
/// Power scaling from FFT bins to pitch power density at 16 kHz.
const SP_16K: f64 = 6.910_853e-6;
/// Loudness scaling.
const SL: f64 = 1.866_055e-1;
/// Exponent of Zwicker's loudness law.
const ZWICKER_POWER: f64 = 0.23;
/// Bands centred below this Bark value get a steeper loudness slope.
const STEEP_SLOPE_BARK: f64 = 4.0;

/// Processing layout for one sample rate.
#[derive(Debug, Clone)]
pub(crate) struct Layout {
    pub sample_rate: u32,
    /// FFT frame length; frames advance by half of it.
    pub frame_len: usize,
    /// VAD block length in samples (4 ms).
    pub downsample: usize,
    pub bands: BarkBands,
}

impl Layout {
    /// Layout for 8 kHz or, for any other rate, 16 kHz.
    pub fn new(sample_rate: u32) -> Self {
        let (frame_len, downsample) = if sample_rate == 8000 { (256, 32) } else { (512, 64) };
        Self {
            sample_rate,
            frame_len,
            downsample,
            bands: BarkBands::new(sample_rate),
        }
    }

    pub fn hop(&self) -> usize {
        self.frame_len / 2
    }
}

/// Bark bands from the P.862 tables: 42 at 8 kHz, 49 at 16 kHz.
#[derive(Debug, Clone)]
pub(crate) struct BarkBands {
    pub centre_bark: &'static [f64],
    pub width_bark: &'static [f64],
    pub width_hz: &'static [f64],
    /// First and one-past-last FFT bin of each band.
    pub bins: Vec<(usize, usize)>,
    /// Scales summed bin power to the band's pitch power density.
    pub density_correction: &'static [f64],
    pub abs_threshold: &'static [f64],
    /// Bin power to pitch power scaling.
    pub sp: f64,
}

impl BarkBands {
    pub fn new(sample_rate: u32) -> Self {
        let (count, bins_per_band, density_correction, sp) = if sample_rate == 8000 {
            (BANDS_8K, &BINS_PER_BAND_8K[..], &DENSITY_CORRECTION_8K[..], SP_8K)
        } else {
            (BANDS_16K, &BINS_PER_BAND_16K[..], &DENSITY_CORRECTION_16K[..], SP_16K)
        };

        let bins = bins_per_band
            .iter()
            .scan(0, |start, &n| {
                let band = (*start, *start + n);
                *start += n;
                Some(band)
            })
            .collect();

        Self {
            centre_bark: &CENTRE_BARK[..count],
            width_bark: &WIDTH_BARK[..count],
            width_hz: &WIDTH_HZ[..count],
            bins,
            density_correction,
            abs_threshold: &ABS_THRESHOLD[..count],
            sp,
        }
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Pitch power density per band from a frame's `|X[k]|²`.
    pub fn pitch_power(&self, power: &[f64]) -> Vec<f64> {
        self.bins
            .iter()
            .zip(self.density_correction)
            .map(|(&(start, stop), &corr)| power[start..stop].iter().sum::<f64>() * corr * self.sp)
            .collect()
    }

    /// Power summed over bands that exceed `factor` times the hearing
    /// threshold, weighted by band width in Hz.
    pub fn total_audible(&self, pitch: &[f64], factor: f64) -> f64 {
        pitch
            .iter()
            .zip(self.abs_threshold)
            .zip(self.width_hz)
            .skip(1)
            .filter(|&((&p, &t), _)| p > factor * t)
            .map(|((&p, _), &w)| p * w)
            .sum()
    }

    /// Zwicker loudness density per band in sones per Bark.
    pub fn loudness(&self, pitch: &[f64]) -> Vec<f64> {
        pitch
            .iter()
            .zip(self.abs_threshold)
            .zip(self.centre_bark)
            .map(|((&p, &t), &z)| {
                let h = if z < STEEP_SLOPE_BARK { (6.0 / (z + 2.0)).min(2.0) } else { 1.0 };
                let h = h.powf(0.15);
                let power = ZWICKER_POWER * h;
                if p > t {
                    SL * (t / 0.5).powf(power) * ((0.5 + 0.5 * p / t).powf(power) - 1.0)
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Width-weighted pseudo `Lp` norm over bands, skipping the lowest.
    ///
    /// ```text
    /// (Σ |x_b·w_b|^p / Σ w_b)^(1/p) · Σ w_b
    /// ```
    pub fn pseudo_lp(&self, values: &[f64], p: f64) -> f64 {
        let (sum, total_weight) = values
            .iter()
            .zip(self.width_bark)
            .skip(1)
            .fold((0.0, 0.0), |(sum, tw), (&x, &w)| {
                (sum + (x.abs() * w).powf(p), tw + w)
            });
        if total_weight == 0.0 {
            return 0.0;
        }
        (sum / total_weight).powf(1.0 / p) * total_weight
    }
}
