//! Crate-wide error taxonomy.
//!
//! Input validation errors are raised before any I/O. Authentication failures
//! are deliberately opaque: a wrong password and a corrupted envelope produce
//! the same variant, so callers cannot tell which part was wrong.

/// Errors surfaced by the wallet engine.
#[derive(Debug, PartialEq)]
pub enum WalletError {
    /// Malformed address, amount, or mnemonic. Rejected before any I/O.
    InvalidInput(String),
    /// Wrong password or corrupted envelope. No distinction is made.
    Authentication,
    /// The node rejected a transaction for lack of funds.
    InsufficientFunds(String),
    /// RPC or indexer request failure.
    ChainRequest(String),
    /// Unknown wallet profile or unconfigured price feed.
    NotFound(String),
}

impl std::fmt::Display for WalletError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            WalletError::Authentication => write!(f, "Incorrect password or corrupted key"),
            WalletError::InsufficientFunds(msg) => {
                write!(f, "Insufficient funds: {}", msg)
            }
            WalletError::ChainRequest(msg) => write!(f, "Chain request failed: {}", msg),
            WalletError::NotFound(msg) => write!(f, "Not found: {}", msg),
        }
    }
}

impl std::error::Error for WalletError {}
