use thiserror::Error;

/// Errors raised by model construction, evaluation and the analyses built on top.
///
/// Every variant maps to a process exit code for the `uq` binary:
/// - `2`: invalid configuration or inputs
/// - `3`: file I/O
/// - `4`: numerical failure
#[derive(Debug, Clone, Error)]
pub enum UqError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Non-finite evaluation: {0}")]
    NonFiniteEvaluation(String),

    #[error("Numerical failure: {0}")]
    Numerical(String),

    #[error("Chain too short: {0}")]
    ChainTooShort(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl UqError {
    pub fn dimension(message: impl Into<String>) -> Self {
        Self::InvalidDimension(message.into())
    }

    pub fn parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    pub fn non_finite(message: impl Into<String>) -> Self {
        Self::NonFiniteEvaluation(message.into())
    }

    pub fn numerical(message: impl Into<String>) -> Self {
        Self::Numerical(message.into())
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            UqError::InvalidDimension(_) | UqError::InvalidParameter(_) | UqError::Config(_) => 2,
            UqError::Io(_) => 3,
            UqError::NonFiniteEvaluation(_)
            | UqError::Numerical(_)
            | UqError::ChainTooShort(_) => 4,
        }
    }
}
