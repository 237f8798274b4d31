//! Error types for the perceptual metrics.

use thiserror::Error;

use crate::pesq::PesqMode;

/// Errors raised by PESQ scoring.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PesqError {
    /// The scoring core does not support this rate for the requested mode.
    #[error("PESQ {mode} mode does not support a sample rate of {sample_rate} Hz")]
    InvalidSampleRate {
        /// Requested mode
        mode: PesqMode,
        /// Offending sample rate
        sample_rate: u32,
    },

    /// Fewer samples than a quarter second at the working rate.
    #[error("PESQ needs at least {min} samples, got {len}")]
    BufferTooShort {
        /// Aligned input length
        len: usize,
        /// Minimum length at this rate
        min: usize,
    },

    /// Voice activity detection found no speech in the reference.
    #[error("no utterances detected in the reference signal")]
    NoUtterances,
}

/// Errors raised by STOI scoring.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoiError {
    /// Sample rate of zero.
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),
}

/// Umbrella error for callers that mix metrics.
#[derive(Debug, Error)]
pub enum Error {
    /// PESQ failure
    #[error(transparent)]
    Pesq(#[from] PesqError),

    /// STOI failure
    #[error(transparent)]
    Stoi(#[from] StoiError),

    /// Reference conditioning failure
    #[error(transparent)]
    Filter(#[from] clarion_core::FilterError),

    /// Settings rejected before any metric ran
    #[error("invalid settings: {0}")]
    Settings(#[from] clarion_config::ValidationError),
}

/// Result type alias for mixed-metric operations.
pub type Result<T> = std::result::Result<T, Error>;
