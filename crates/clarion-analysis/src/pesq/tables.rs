//! ITU-T P.862 Bark band tables.
//!
//! The 16 kHz layout has 49 bands; the 8 kHz layout uses the first 42 with
//! its own bin grouping and density correction for the top band. Bins are
//! 31.25 Hz wide at both rates (256-point FFT at 8 kHz, 512-point at 16 kHz)
//! and every band takes its bins in order starting from DC.

/// Bands at 8 kHz.
pub(super) const BANDS_8K: usize = 42;
/// Bands at 16 kHz.
pub(super) const BANDS_16K: usize = 49;

/// FFT bins summed into each band at 8 kHz (128 in total).
pub(super) const BINS_PER_BAND_8K: [usize; BANDS_8K] = [
    1, 1, 1, 1, 1, 1, 1, 1, 2, 1, //
    1, 1, 1, 1, 2, 1, 1, 2, 2, 2, //
    2, 2, 2, 2, 2, 3, 3, 3, 3, 4, //
    3, 4, 5, 4, 5, 6, 6, 7, 8, 9, //
    9, 11,
];

/// FFT bins summed into each band at 16 kHz (256 in total).
pub(super) const BINS_PER_BAND_16K: [usize; BANDS_16K] = [
    1, 1, 1, 1, 1, 1, 1, 1, 2, 1, //
    1, 1, 1, 1, 2, 1, 1, 2, 2, 2, //
    2, 2, 2, 2, 2, 3, 3, 3, 3, 4, //
    3, 4, 5, 4, 5, 6, 6, 7, 8, 9, //
    9, 12, 12, 15, 16, 18, 21, 25, 20,
];

/// Band centres in Bark.
pub(super) const CENTRE_BARK: [f64; BANDS_16K] = [
    0.078672, 0.316341, 0.636559, 0.961246, 1.290450, //
    1.624217, 1.962597, 2.305636, 2.653383, 3.005889, //
    3.363201, 3.725371, 4.092449, 4.464486, 4.841533, //
    5.223642, 5.610866, 6.003256, 6.400869, 6.803755, //
    7.211971, 7.625571, 8.044611, 8.469146, 8.899232, //
    9.334927, 9.776288, 10.223374, 10.676242, 11.134952, //
    11.599563, 12.070135, 12.546731, 13.029408, 13.518232, //
    14.013264, 14.514566, 15.022202, 15.536238, 16.056736, //
    16.583761, 17.117382, 17.657663, 18.204674, 18.758478, //
    19.319147, 19.886751, 20.461355, 21.043034,
];

/// Band widths in Bark.
pub(super) const WIDTH_BARK: [f64; BANDS_16K] = [
    0.157344, 0.317994, 0.322441, 0.326934, 0.331474, //
    0.336061, 0.340697, 0.345381, 0.350114, 0.354897, //
    0.359729, 0.364611, 0.369544, 0.374529, 0.379565, //
    0.384653, 0.389794, 0.394989, 0.400236, 0.405538, //
    0.410894, 0.416306, 0.421773, 0.427297, 0.432877, //
    0.438514, 0.444209, 0.449962, 0.455774, 0.461645, //
    0.467577, 0.473569, 0.479621, 0.485736, 0.491912, //
    0.498151, 0.504454, 0.510819, 0.517250, 0.523745, //
    0.530308, 0.536934, 0.543629, 0.550390, 0.557220, //
    0.564119, 0.571085, 0.578125, 0.585232,
];

/// Band widths in Hz.
pub(super) const WIDTH_HZ: [f64; BANDS_16K] = [
    15.734426, 31.799433, 32.244064, 32.693359, 33.147385, //
    33.606140, 34.069702, 34.538116, 35.011429, 35.489655, //
    35.972870, 36.461121, 36.954407, 37.452911, 40.269653, //
    42.311859, 45.992554, 51.348511, 55.040527, 56.775208, //
    58.699402, 62.445862, 64.820923, 69.195374, 76.745667, //
    84.016235, 90.825684, 97.931152, 103.348877, 107.801880, //
    113.552246, 121.490601, 130.420410, 143.431763, 158.486816, //
    176.872803, 198.314697, 219.549561, 240.600098, 268.702393, //
    306.060059, 349.937012, 398.065430, 454.251465, 506.916992, //
    564.975586, 637.689941, 794.347656, 931.082031,
];

/// Scales summed bin power to pitch power density at 8 kHz.
pub(super) const DENSITY_CORRECTION_8K: [f64; BANDS_8K] = [
    100.000000, 99.999992, 100.000000, 100.000008, 100.000008, //
    100.000015, 99.999992, 99.999969, 50.000027, 100.000000, //
    99.999969, 100.000015, 99.999947, 100.000061, 53.047077, //
    110.000046, 117.991989, 65.000000, 68.760147, 69.999931, //
    71.428818, 75.000038, 76.843384, 80.968781, 88.646126, //
    63.864388, 68.155350, 72.547775, 75.584831, 58.379192, //
    80.950836, 64.135651, 54.384785, 73.821884, 64.437073, //
    59.176456, 65.521278, 61.399822, 58.144047, 57.004543, //
    64.126297, 59.248363,
];

/// Scales summed bin power to pitch power density at 16 kHz.
pub(super) const DENSITY_CORRECTION_16K: [f64; BANDS_16K] = [
    100.000000, 99.999992, 100.000000, 100.000008, 100.000008, //
    100.000015, 99.999992, 99.999969, 50.000027, 100.000000, //
    99.999969, 100.000015, 99.999947, 100.000061, 53.047077, //
    110.000046, 117.991989, 65.000000, 68.760147, 69.999931, //
    71.428818, 75.000038, 76.843384, 80.968781, 88.646126, //
    63.864388, 68.155350, 72.547775, 75.584831, 58.379192, //
    80.950836, 64.135651, 54.384785, 73.821884, 64.437073, //
    59.176456, 65.521278, 61.399822, 58.144047, 57.004543, //
    64.126297, 54.311001, 61.114979, 55.077751, 56.849335, //
    55.628868, 53.137054, 54.985844, 79.546974,
];

/// Absolute hearing threshold per band in pitch power units.
pub(super) const ABS_THRESHOLD: [f64; BANDS_16K] = [
    51286152.0, 2454709.500, 70794.593750, 4897.788574, 1174.897705, //
    389.045166, 104.712860, 45.708820, 17.782795, 9.772372, //
    4.897789, 3.090296, 1.905461, 1.258925, 0.977237, //
    0.724436, 0.562341, 0.457088, 0.389045, 0.331131, //
    0.295121, 0.269153, 0.257040, 0.251189, 0.251189, //
    0.251189, 0.251189, 0.263027, 0.288403, 0.309030, //
    0.338844, 0.371535, 0.398107, 0.436516, 0.467735, //
    0.489779, 0.501187, 0.501187, 0.512861, 0.524807, //
    0.524807, 0.524807, 0.512861, 0.478630, 0.426580, //
    0.371535, 0.363078, 0.416869, 0.537032,
];
