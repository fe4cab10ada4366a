//! Error types for training, ranking and serialization.

use std::io;

use thiserror::Error;

/// Error type for all fallible operations in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Two feature vectors used together disagree on their length.
    #[error("feature vector length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Length of the first vector in the set
        expected: usize,
        /// Length of the offending vector
        actual: usize,
    },

    /// Two feature vectors used together were built against different mappers.
    #[error("feature vectors at instance {index} use a different feature mapper")]
    MapperMismatch {
        /// Position of the offending instance
        index: usize,
    },

    /// Two feature vectors used together disagree on their depth.
    #[error("feature vector depth mismatch: expected {expected}, got {actual}")]
    DepthMismatch {
        /// Depth of the first vector in the set
        expected: usize,
        /// Depth of the offending vector
        actual: usize,
    },

    /// A label index lies outside `[0, num_labels)`.
    #[error("label {label} out of range for {num_labels} labels")]
    LabelOutOfRange {
        /// The offending label
        label: usize,
        /// Number of valid labels
        num_labels: usize,
    },

    /// Fewer than two distinct labels are available for training.
    #[error("training requires at least 2 labels, found {found}")]
    TooFewLabels {
        /// Number of distinct labels found
        found: usize,
    },

    /// No training instances were supplied.
    #[error("no training data")]
    EmptyTrainingData,

    /// A parameter value failed validation.
    #[error("{0}")]
    InvalidParameter(String),

    /// A parameter name is not recognized.
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    /// A cost function returned a negative (or NaN) cost.
    #[error("cost between labels {correct} and {predicted} is negative: {cost}")]
    NegativeCost {
        /// The correct label
        correct: usize,
        /// The competing label
        predicted: usize,
        /// The returned cost
        cost: f64,
    },

    /// A feature value is NaN or infinite and cannot be exported.
    #[error("feature {name} has non-finite value {value}")]
    NonFiniteFeature {
        /// Feature name
        name: String,
        /// Offending value
        value: f64,
    },

    /// A feature value other than 0 or 1 was found while exporting binary features.
    #[error("feature {name} has non-binary value {value}")]
    NonBinaryFeature {
        /// Feature name
        name: String,
        /// Offending value
        value: f64,
    },

    /// A training instance file could not be parsed.
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// Description of the problem
        message: String,
    },

    /// A serialized classifier is malformed.
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// The conditional-logit optimizer failed.
    #[error("solver error: {0}")]
    Solver(String),

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn invalid<S: Into<String>>(message: S) -> Self {
        Error::InvalidParameter(message.into())
    }

    pub(crate) fn parse<S: Into<String>>(line: usize, message: S) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
