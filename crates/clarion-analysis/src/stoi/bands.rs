//! One-third octave band layout over FFT bins.

use std::ops::Range;

/// One-third octave bands snapped to the bins of an `nfft`-point FFT.
#[derive(Debug, Clone, PartialEq)]
pub struct ThirdOctaveBands {
    /// Nominal centre frequencies in Hz
    pub centers: Vec<f64>,
    /// Half-open bin range covered by each band
    pub bins: Vec<Range<usize>>,
}

impl ThirdOctaveBands {
    /// Builds `num_bands` bands starting at `min_freq` Hz.
    ///
    /// Band `k` is centred on `min_freq · 2^(k/3)` with edges at
    /// `min_freq · 2^((2k ± 1)/6)`, each edge moved to the nearest bin
    /// frequency (lowest bin on a tie).
    pub fn new(sample_rate: f64, nfft: usize, num_bands: usize, min_freq: f64) -> Self {
        let bin_hz = sample_rate / nfft as f64;
        let num_bins = nfft / 2 + 1;
        let nearest_bin = |hz: f64| -> usize {
            (0..num_bins)
                .map(|i| (i, (i as f64 * bin_hz - hz).powi(2)))
                .fold((0, f64::INFINITY), |best, (i, d)| if d < best.1 { (i, d) } else { best })
                .0
        };

        let mut centers = Vec::with_capacity(num_bands);
        let mut bins = Vec::with_capacity(num_bands);
        for k in 0..num_bands {
            let k = k as f64;
            centers.push(min_freq * 2.0_f64.powf(k / 3.0));
            let low = nearest_bin(min_freq * 2.0_f64.powf((2.0 * k - 1.0) / 6.0));
            let high = nearest_bin(min_freq * 2.0_f64.powf((2.0 * k + 1.0) / 6.0));
            bins.push(low..high);
        }

        Self { centers, bins }
    }

    /// Number of bands.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// True when there are no bands.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Band magnitudes `sqrt(Σ |X[k]|²)` of one power spectrum.
    pub fn magnitudes(&self, power: &[f64]) -> Vec<f64> {
        self.bins
            .iter()
            .map(|r| power[r.clone()].iter().sum::<f64>().sqrt())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_layout_at_10k() {
        let bands = ThirdOctaveBands::new(10_000.0, 512, 15, 150.0);
        assert_eq!(bands.len(), 15);
        // 150·2^(-1/6) = 133.6 Hz -> bin 7 (136.7 Hz)
        assert_eq!(bands.bins[0].start, 7);
        // Highest edge 150·2^(29/6) = 4286 Hz -> bin 219 (4277 Hz)
        assert_eq!(bands.bins[14].end, 219);
        assert!((bands.centers[14] - 150.0 * 2.0_f64.powf(14.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn bands_are_contiguous_and_non_empty() {
        let bands = ThirdOctaveBands::new(10_000.0, 512, 15, 150.0);
        for pair in bands.bins.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert!(bands.bins.iter().all(|r| !r.is_empty()));
    }

    #[test]
    fn magnitudes_sum_power_in_band() {
        let bands = ThirdOctaveBands::new(10_000.0, 512, 15, 150.0);
        let mut power = vec![0.0; 257];
        for p in &mut power[bands.bins[3].clone()] {
            *p = 4.0;
        }
        let mags = bands.magnitudes(&power);
        let width = bands.bins[3].len() as f64;
        assert!((mags[3] - (4.0 * width).sqrt()).abs() < 1e-12);
        assert_eq!(mags[2], 0.0);
    }
}
