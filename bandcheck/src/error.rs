//! Error types for analysis runs

use crate::combos::ComboParseError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Neither band nor combo input was supplied
    #[error("No band or combo input supplied")]
    EmptyInput,

    /// A combo string in the input document could not be parsed
    #[error("Invalid {collection} combo '{key}': {error}")]
    InvalidCombo {
        collection: String,
        key: String,
        #[source]
        error: ComboParseError,
    },

    /// I/O, JSON or configuration failure
    #[error(transparent)]
    Common(#[from] bandcheck_common::Error),
}

impl From<serde_json::Error> for AnalysisError {
    fn from(e: serde_json::Error) -> Self {
        AnalysisError::Common(e.into())
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(e: std::io::Error) -> Self {
        AnalysisError::Common(e.into())
    }
}
