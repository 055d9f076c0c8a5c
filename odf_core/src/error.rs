//! Error types for ODF peak operations
//!
//! Every fallible operation in the crate returns [`PeakResult`]. Per-voxel
//! degeneracies (flat functions, zero anisotropy, no candidates) are never
//! errors; they produce empty records instead.

use thiserror::Error;

/// Result type alias for peak operations
pub type PeakResult<T> = Result<T, PeakError>;

/// Root error type for peak extraction and field mapping
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PeakError {
    /// Coefficient count does not correspond to an even SH order
    #[error("invalid coefficient count: {ncoef} is not (L+1)(L+2)/2 for any even order L")]
    InvalidCoefficientCount { ncoef: usize },

    /// Array shape disagrees with the mask or with a sibling array
    #[error("shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        expected: String,
        got: String,
        context: String,
    },

    /// Invalid configuration parameter
    #[error("invalid configuration for '{parameter}' = '{value}': {reason}")]
    Configuration {
        parameter: String,
        value: String,
        reason: String,
    },

    /// No voxel contributed a positive value to the global maximum
    #[error("global maximum is zero: no voxel produced a positive peak, QA is undefined")]
    AllZeroVolume,

    /// The sweep was aborted; partial results were discarded
    #[error("sweep cancelled before completion")]
    Cancelled,

    /// Direction catalog cannot be used for sampling
    #[error("invalid direction set: {reason}")]
    InvalidDirectionSet { reason: String },
}

// Convenience constructors for common error patterns
impl PeakError {
    /// Create a shape mismatch error
    pub fn shape_mismatch(
        expected: impl std::fmt::Debug,
        got: impl std::fmt::Debug,
        context: impl Into<String>,
    ) -> Self {
        PeakError::ShapeMismatch {
            expected: format!("{expected:?}"),
            got: format!("{got:?}"),
            context: context.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(
        parameter: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        PeakError::Configuration {
            parameter: parameter.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an invalid direction set error
    pub fn invalid_direction_set(reason: impl Into<String>) -> Self {
        PeakError::InvalidDirectionSet {
            reason: reason.into(),
        }
    }
}
