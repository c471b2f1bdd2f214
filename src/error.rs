//! Error types for the anofox-wsa library.

use thiserror::Error;

/// Result type alias for seasonal adjustment operations.
pub type Result<T> = std::result::Result<T, WsaError>;

/// Errors that can occur while decomposing a weekly series.
///
/// A series without detectable seasonality is not an error; it is reported
/// through [`crate::decomposition::Decomposition::NotSeasonal`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WsaError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Dates are duplicated, out of order or not spaced one week apart.
    #[error("timestamp error: {0}")]
    TimestampError(String),

    /// A normal-equation matrix could not be inverted.
    #[error("singular design: {context}")]
    SingularDesign { context: String },

    /// The column proposed for a rank-one update lies in the span of the design.
    #[error("candidate column is collinear with the current design")]
    CollinearCandidate,

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),
}

impl WsaError {
    pub(crate) fn singular(context: impl Into<String>) -> Self {
        WsaError::SingularDesign {
            context: context.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = WsaError::EmptyData;
        assert_eq!(err.to_string(), "empty input data");

        let err = WsaError::InsufficientData { needed: 52, got: 5 };
        assert_eq!(
            err.to_string(),
            "insufficient data: need at least 52, got 5"
        );

        let err = WsaError::DimensionMismatch {
            expected: 3,
            got: 2,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 3, got 2");

        let err = WsaError::singular("weighted fit for 2021");
        assert_eq!(err.to_string(), "singular design: weighted fit for 2021");

        assert_eq!(
            WsaError::CollinearCandidate.to_string(),
            "candidate column is collinear with the current design"
        );
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = WsaError::TimestampError("dates must be weekly".into());
        let err2 = err1.clone();
        assert_eq!(err1, err2);
        assert_ne!(err1, WsaError::EmptyData);
    }
}
