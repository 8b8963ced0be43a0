//! Error types for the token engine

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine errors
///
/// Every variant is a precondition failure: the operation is rejected in
/// full, with no partial state change, and the caller may retry with
/// corrected inputs or after the precondition is met.
#[derive(Error, Debug)]
pub enum Error {
    /// Account ledger error
    #[error("Ledger error: {0}")]
    Ledger(#[from] account_ledger::Error),

    /// Caller lacks the required role
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The null address was used where a real address is required
    #[error("Null address: {0}")]
    NullAddress(String),

    /// A role address would collide with another role
    #[error("Duplicate role address: {0}")]
    DuplicateRole(String),

    /// Post-settlement balance cannot cover the operation
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    /// Delegated transfer exceeds the approved allowance
    #[error("Insufficient allowance: {0}")]
    InsufficientAllowance(String),

    /// Transfer-flow rule violation between role classes
    #[error("Routing violation: {0}")]
    RoutingViolation(String),

    /// Mint would exceed the oracle bound or the hard supply cap
    #[error("Supply cap exceeded: {0}")]
    SupplyCapExceeded(String),

    /// Reserve oracle failure or authorization rejection
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// Forced settlement found nothing to collect
    #[error("Nothing owed: {0}")]
    NothingOwed(String),

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
