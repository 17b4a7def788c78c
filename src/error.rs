//! Error taxonomy for sequence operations.
//!
//! Every error is raised synchronously at the point of violation; nothing is
//! downgraded or retried inside the crate. Retry policy belongs to callers.

use thiserror::Error;

use crate::frame::Shape;

/// Errors raised by sequences, sources and sinks.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The external source yielded no frames at all.
    #[error("source '{path}' yielded no frames")]
    SourceUnreadable { path: String },

    /// A frame's shape disagrees with the declared contract.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: Shape, actual: Shape },

    /// A companion's length or label set is inconsistent with the sequence.
    #[error("companion misaligned: {0}")]
    AlignmentMismatch(String),

    /// A rolling window is non-positive, even, or exceeds the length.
    #[error("invalid window {window} for sequence of length {length}")]
    InvalidWindow { window: usize, length: usize },

    /// A frame lookup by label missed.
    #[error("no frame with label {0}")]
    IndexNotFound(i64),

    /// A frame lookup by position fell outside [0, length).
    #[error("position {position} out of range (length {length})")]
    PositionOutOfRange { position: usize, length: usize },

    /// `concat` was given no sequences.
    #[error("concat requires at least one sequence")]
    EmptyConcat,

    /// IO failure in a source or sink.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Image decode/encode failure.
    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// Failure reported by an external decoder or encoder.
    #[error("codec error: {0}")]
    Codec(String),
}

/// Result type for sequence operations.
pub type CaptureResult<T> = std::result::Result<T, CaptureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_violation() {
        let err = CaptureError::InvalidWindow {
            window: 4,
            length: 10,
        };
        assert_eq!(
            format!("{err}"),
            "invalid window 4 for sequence of length 10"
        );

        let err = CaptureError::PositionOutOfRange {
            position: 7,
            length: 5,
        };
        assert!(format!("{err}").contains("7"));
    }
}
