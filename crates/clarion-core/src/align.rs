//! Reference/degraded alignment.
//!
//! Every two-signal metric compares only the overlapping prefix of its inputs.
//! A length mismatch is not an error: the longer signal is silently truncated.
//! Nothing is padded, resampled, or renormalized here.

/// Length of the common prefix of two signals.
#[inline]
pub fn aligned_len(clean: &[f32], noisy: &[f32]) -> usize {
    clean.len().min(noisy.len())
}

/// Truncate both signals to `min(clean.len(), noisy.len())` samples.
///
/// ```rust
/// use clarion_core::align;
///
/// let clean = [1.0, 2.0, 3.0, 4.0];
/// let noisy = [1.0, 2.0];
/// let (c, n) = align(&clean, &noisy);
/// assert_eq!(c, &[1.0, 2.0]);
/// assert_eq!(n, &[1.0, 2.0]);
/// ```
pub fn align<'a, 'b>(clean: &'a [f32], noisy: &'b [f32]) -> (&'a [f32], &'b [f32]) {
    let len = aligned_len(clean, noisy);
    (&clean[..len], &noisy[..len])
}
