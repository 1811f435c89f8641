//! Error handling for UTXO selection
//!
//! Every failure is terminal for the current selection attempt. Callers get no
//! partial result; they adjust the request (more UTXOs, lower fee rate, smaller
//! outputs) and build a fresh selector.
//!
//! # Usage
//!
//! ```
//! use utxo_select::error::{SelectorError, SelectorResult};
//! use utxo_select::math::Satoshi;
//!
//! fn fund() -> SelectorResult<()> {
//!     Err(SelectorError::InsufficientFunds { shortfall: Satoshi::from_sat(3_136) })
//! }
//!
//! let err = fund().unwrap_err();
//! assert_eq!(err.shortfall(), Some(Satoshi::from_sat(3_136)));
//! assert!(err.to_string().contains("3136"));
//! ```

use crate::math::{AmountError, Satoshi};
use thiserror::Error;

/// The main error type of the selector
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    /// The pool cannot cover the requested outputs plus fees
    #[error("Insufficient funds: lacking {shortfall} satoshis to fund this transaction")]
    InsufficientFunds { shortfall: Satoshi },

    /// Bad fee rate, empty output list, or an unresolvable UTXO
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Fixed-point arithmetic failure
    #[error("Amount error: {0}")]
    Amount(#[from] AmountError),
}

impl SelectorError {
    /// The missing amount, for insufficient-funds errors
    pub fn shortfall(&self) -> Option<Satoshi> {
        match self {
            SelectorError::InsufficientFunds { shortfall } => Some(*shortfall),
            _ => None,
        }
    }

    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self, SelectorError::InsufficientFunds { .. })
    }
}

/// Create a new configuration error with context
pub fn invalid_configuration<S: Into<String>>(context: S) -> SelectorError {
    SelectorError::InvalidConfiguration(context.into())
}

/// Create an insufficient-funds error for the given shortfall
pub fn insufficient_funds(shortfall: Satoshi) -> SelectorError {
    SelectorError::InsufficientFunds { shortfall }
}

// Implement From for bitcoin::consensus::encode::Error
impl From<bitcoin::consensus::encode::Error> for SelectorError {
    fn from(err: bitcoin::consensus::encode::Error) -> Self {
        SelectorError::InvalidConfiguration(format!("undecodable prior transaction: {}", err))
    }
}

/// Type alias for a Result with SelectorError
pub type SelectorResult<T> = Result<T, SelectorError>;
