//! UTXO selection module
//!
//! Chooses which unspent outputs fund a set of payments at a target fee rate, and settles
//! the leftover value as either a change output or extra fee.
//!
//! # Module Structure
//!
//! - `cost_model.rs` - Per-script-type byte costs, fee pricing and dust thresholds
//! - `types.rs` - Candidate UTXOs, their normalized form, request props and the selection log
//! - `selector.rs` - The greedy selector, its cached result and the transaction builder seam
//!
//! # Typical Usage
//!
//! ```no_run
//! use utxo_select::utxo_selection::{CostModel, SelectorProps, UtxoSelector, Utxo};
//! use utxo_select::types::{FeeRate, TxOutput};
//! use utxo_select::error::SelectorError;
//! use rust_decimal_macros::dec;
//!
//! # fn candidates() -> Vec<Utxo> { Vec::new() }
//! let props = SelectorProps::new(
//!     candidates(),
//!     vec![TxOutput::from_sat("bc1q...", 50_000)],
//!     FeeRate::from_sat_per_vb(dec!(3)).unwrap(),
//!     "bc1q-change...",
//! );
//! let model = CostModel::p2sh_p2wsh_multisig(2).unwrap();
//! let selector = UtxoSelector::new(props, model).unwrap();
//!
//! match selector.selection() {
//!     Ok(selection) => println!("fee {}", selection.fee),
//!     Err(SelectorError::InsufficientFunds { shortfall }) => println!("short by {}", shortfall),
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```
//!
//! # Security Considerations
//!
//! - The selector never sees private keys and never signs
//! - Structured log events shorten destinations before emitting them

pub mod cost_model;
pub mod selector;
pub mod types;

pub use cost_model::{CostModel, DustPolicy, ScriptType};
pub use selector::{ChangeSettlement, Selection, SelectionCosts, TransactionBuilder, UtxoSelector};
pub use types::{SelectionLog, SelectorProps, SpendableUtxo, Utxo, WitnessUtxo};
