use thiserror::Error;

use crate::session::{Action, Status};

/// The result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Column {name} is not present in the dataset")]
    MissingColumn { name: String },

    #[error("No data to {stage}")]
    EmptyData { stage: &'static str },

    #[error("Length mismatch between features ({features}) and labels ({labels})")]
    LengthMismatch { features: usize, labels: usize },

    #[error("Invalid validation split {0}, expected a fraction in (0, 1)")]
    InvalidValidationSplit(f64),

    #[error("Training needs at least one epoch")]
    NoEpochs,

    #[error("Invalid input: {0:?} is not a number")]
    InvalidInput(String),

    #[error("Cannot {action} while the model is {status}")]
    InvalidState { action: Action, status: Status },

    #[error("Malformed model file: {0}")]
    Format(String),

    #[error("Stored model has topology {found}, expected {expected}")]
    TopologyMismatch { expected: String, found: String },

    #[error("No stored model for feature {0}")]
    ModelNotFound(String),
}

impl From<json::Error> for Error {
    fn from(err: json::Error) -> Self {
        Error::Format(err.to_string())
    }
}
