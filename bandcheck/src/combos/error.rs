//! Combo string parsing errors

use super::ComboType;
use thiserror::Error;

/// Error parsing a combo or band component from text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComboParseError {
    /// Input contained no band components
    #[error("combo has no band components")]
    Empty,

    /// A component was not of the form `[B|n]<band><class>`
    #[error("invalid band component '{0}'")]
    InvalidComponent(String),

    /// Bandwidth class outside A-I
    #[error("invalid bandwidth class '{class}' in component '{component}'")]
    InvalidBandClass { component: String, class: char },

    /// A stored combo's type differs from its set's type
    #[error("{found} combo '{key}' in a {expected} set")]
    TypeMismatch {
        key: String,
        expected: ComboType,
        found: ComboType,
    },
}
