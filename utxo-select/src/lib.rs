//! UTXO Select Library
//!
//! Greedy coin selection with exact fixed-point fee and change settlement.
//!
//! # Modules
//!
//! - `math`: Scale-tagged fixed-point amounts
//! - `types`: Fee rates, payment outputs and currency constants
//! - `error`: Error taxonomy of the selector
//! - `utxo_selection`: Cost models, candidate UTXOs and the selector
//! - `logging`: `env_logger` setup and structured events
//! - `config`: TOML-backed selector configuration
//!
//! # Example
//!
//! ```
//! use utxo_select::{CostModel, FeeRate, SelectorProps, TxOutput, UtxoSelector, Utxo, Satoshi};
//! use bitcoin::{ScriptBuf, Txid};
//! use rust_decimal_macros::dec;
//! use std::str::FromStr;
//!
//! let txid = Txid::from_str("7967a5185e907a25225574544c31f7b059c1a191d65b53dcc1554d339c4f9efc").unwrap();
//! let utxos = (0..10)
//!     .map(|vout| Utxo::from_witness(txid, vout, Satoshi::from_sat(8_000), ScriptBuf::new()))
//!     .collect();
//! let outputs = (0..9).map(|i| TxOutput::from_sat(format!("payee-{}", i), 1_500)).collect();
//!
//! let props = SelectorProps::new(utxos, outputs, FeeRate::from_sat_per_vb(dec!(1)).unwrap(), "change");
//! let selector = UtxoSelector::new(props, CostModel::p2wpkh()).unwrap();
//!
//! assert_eq!(selector.input_utxos().unwrap().len(), 2);
//! assert_eq!(selector.fee().unwrap(), Satoshi::from_sat(479));
//! ```

/// Scale-tagged fixed-point amounts
pub mod math;

/// Fee rates, payment outputs and currency constants
pub mod types;

/// Error types
pub mod error;

/// Coin selection
pub mod utxo_selection;

/// Logging setup and structured events
pub mod logging;

/// Selector configuration
pub mod config;

pub use config::SelectorConfig;
pub use error::{SelectorError, SelectorResult};
pub use math::{AmountError, FixedPoint, Normalized, Satoshi, TaggedAmount, Wei, XrpDrop};
pub use types::{FeeRate, TxOutput};
pub use utxo_selection::{
    ChangeSettlement, CostModel, DustPolicy, ScriptType, Selection, SelectionLog, SelectorProps,
    SpendableUtxo, TransactionBuilder, Utxo, UtxoSelector, WitnessUtxo,
};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

use std::sync::Once;

static INIT: Once = Once::new();

/// Library initialization
///
/// Installs default logging. Safe to call repeatedly; only the first call does work.
///
/// # Returns
/// * Result with () on success, or an error message string
pub fn init() -> Result<(), String> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = logging::init(&logging::LogConfig::default())
            .map_err(|e| format!("Failed to initialize logging: {}", e));
    });
    result
}
