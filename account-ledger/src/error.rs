//! Error types for the account ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// Every failure is an atomic abort: no partial state change survives a
/// returned error.
#[derive(Error, Debug)]
pub enum Error {
    /// Balance arithmetic would overflow
    #[error("Amount overflow: {0}")]
    AmountOverflow(String),

    /// Account has less than the operation requires
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    /// Inactivation preconditions not met
    #[error("Inactivation not allowed: {0}")]
    InactivationNotAllowed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
