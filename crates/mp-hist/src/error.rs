//! Histogram error types.

use thiserror::Error;

/// Errors raised while building or combining histograms.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistError {
    /// Bin edges are missing, unsorted or not finite.
    #[error("invalid binning: {0}")]
    InvalidBinning(String),

    /// Content array does not match the binning.
    #[error("length mismatch: {0}")]
    LengthMismatch(String),

    /// Two histograms with different binning cannot be added.
    #[error("incompatible merge: {0}")]
    IncompatibleMerge(String),
}

/// Result alias for histogram operations.
pub type Result<T> = std::result::Result<T, HistError>;
