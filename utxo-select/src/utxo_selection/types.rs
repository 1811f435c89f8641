//! Data model consumed and produced by the selector
//!
//! # Key Types
//!
//! - [`Utxo`]: a candidate input as supplied by the caller, in witness form, prior-transaction
//!   form, or both
//! - [`SpendableUtxo`]: a candidate whose value and locking script have been resolved
//! - [`SelectorProps`]: everything one selection request needs
//! - [`SelectionLog`]: human-readable diagnostics of a finished selection
//!
//! # Example
//!
//! ```
//! use utxo_select::utxo_selection::types::Utxo;
//! use utxo_select::math::Satoshi;
//! use bitcoin::{ScriptBuf, Txid};
//! use std::str::FromStr;
//!
//! let txid = Txid::from_str("7967a5185e907a25225574544c31f7b059c1a191d65b53dcc1554d339c4f9efc").unwrap();
//! let utxo = Utxo::from_witness(txid, 1, Satoshi::from_sat(8_000), ScriptBuf::new());
//!
//! let spendable = utxo.normalize().unwrap().unwrap();
//! assert_eq!(spendable.value, Satoshi::from_sat(8_000));
//! assert_eq!(spendable.outpoint.vout, 1);
//! ```

use crate::error::{invalid_configuration, SelectorResult};
use crate::math::Satoshi;
use crate::types::{is_valid_bitcoin_value, FeeRate, TxOutput};
use bitcoin::consensus::deserialize;
use bitcoin::{OutPoint, ScriptBuf, Transaction, Txid};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The output being spent, carried directly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessUtxo {
    pub script_pubkey: ScriptBuf,
    pub value: Satoshi,
}

/// Candidate input as supplied by the caller
///
/// A usable candidate carries either a [`WitnessUtxo`] (plus its txid) or the raw bytes of
/// the transaction that created it. When both are present the prior transaction is
/// authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    /// Hash of the creating transaction; required in witness form, checked in prior-transaction form
    pub txid: Option<Txid>,

    /// Index of the output inside the creating transaction
    pub vout: u32,

    pub witness_utxo: Option<WitnessUtxo>,

    /// Consensus-encoded creating transaction
    pub prior_transaction: Option<Vec<u8>>,

    /// Passed through to the transaction builder
    pub redeem_script: Option<ScriptBuf>,

    /// Passed through to the transaction builder
    pub witness_script: Option<ScriptBuf>,
}

impl Utxo {
    /// A candidate with no value information yet
    pub fn new(txid: Option<Txid>, vout: u32) -> Self {
        Self {
            txid,
            vout,
            witness_utxo: None,
            prior_transaction: None,
            redeem_script: None,
            witness_script: None,
        }
    }

    /// A candidate whose value and script are known directly
    pub fn from_witness(txid: Txid, vout: u32, value: Satoshi, script_pubkey: ScriptBuf) -> Self {
        Self::new(Some(txid), vout).with_witness_utxo(WitnessUtxo {
            script_pubkey,
            value,
        })
    }

    /// A candidate located inside its consensus-encoded creating transaction
    pub fn from_prior_transaction(vout: u32, raw_transaction: Vec<u8>) -> Self {
        Self::new(None, vout).with_prior_transaction(raw_transaction)
    }

    /// Like [`Utxo::from_prior_transaction`] but taking the transaction as hex
    pub fn from_prior_transaction_hex(vout: u32, raw_hex: &str) -> SelectorResult<Self> {
        let raw = hex::decode(raw_hex.trim())
            .map_err(|e| invalid_configuration(format!("prior transaction is not hex: {}", e)))?;
        Ok(Self::from_prior_transaction(vout, raw))
    }

    pub fn with_txid(mut self, txid: Txid) -> Self {
        self.txid = Some(txid);
        self
    }

    pub fn with_witness_utxo(mut self, witness_utxo: WitnessUtxo) -> Self {
        self.witness_utxo = Some(witness_utxo);
        self
    }

    pub fn with_prior_transaction(mut self, raw_transaction: Vec<u8>) -> Self {
        self.prior_transaction = Some(raw_transaction);
        self
    }

    pub fn with_redeem_script(mut self, script: ScriptBuf) -> Self {
        self.redeem_script = Some(script);
        self
    }

    pub fn with_witness_script(mut self, script: ScriptBuf) -> Self {
        self.witness_script = Some(script);
        self
    }

    /// Whether the candidate carries any form the selector can resolve
    pub fn has_value_source(&self) -> bool {
        self.witness_utxo.is_some() || self.prior_transaction.is_some()
    }

    /// Resolve the spendable value and locking script
    ///
    /// # Returns
    /// * `Ok(Some(_))` - the candidate is usable
    /// * `Ok(None)` - the candidate carries neither form and should be discarded
    /// * `Err(_)` - the candidate carries a form that cannot be resolved
    pub fn normalize(&self) -> SelectorResult<Option<SpendableUtxo>> {
        if !self.has_value_source() {
            return Ok(None);
        }

        if let Some(raw) = &self.prior_transaction {
            let transaction: Transaction = deserialize(raw)?;
            let txid = transaction.txid();
            if let Some(expected) = self.txid {
                if expected != txid {
                    return Err(invalid_configuration(format!(
                        "prior transaction hashes to {}, but the candidate names {}",
                        txid, expected
                    )));
                }
            }

            let output = transaction.output.get(self.vout as usize).ok_or_else(|| {
                invalid_configuration(format!(
                    "output index {} out of range for {} ({} outputs)",
                    self.vout,
                    txid,
                    transaction.output.len()
                ))
            })?;
            let value = Satoshi::from_sat(output.value);
            if !is_valid_bitcoin_value(value) {
                return Err(invalid_configuration(format!(
                    "candidate {}:{} has value {}, beyond the bitcoin supply",
                    txid, self.vout, value
                )));
            }

            return Ok(Some(SpendableUtxo {
                outpoint: OutPoint::new(txid, self.vout),
                value,
                script_pubkey: output.script_pubkey.clone(),
                redeem_script: self.redeem_script.clone(),
                witness_script: self.witness_script.clone(),
                prior_transaction: Some(transaction),
            }));
        }

        match &self.witness_utxo {
            Some(witness) => {
                let txid = self.txid.ok_or_else(|| {
                    invalid_configuration(format!(
                        "witness candidate at index {} has no transaction hash",
                        self.vout
                    ))
                })?;
                if !is_valid_bitcoin_value(witness.value) {
                    return Err(invalid_configuration(format!(
                        "candidate {}:{} has value {}, not a whole number of satoshis within the bitcoin supply",
                        txid, self.vout, witness.value
                    )));
                }
                Ok(Some(SpendableUtxo {
                    outpoint: OutPoint::new(txid, self.vout),
                    value: witness.value,
                    script_pubkey: witness.script_pubkey.clone(),
                    redeem_script: self.redeem_script.clone(),
                    witness_script: self.witness_script.clone(),
                    prior_transaction: None,
                }))
            }
            None => Ok(None),
        }
    }
}

/// A candidate with a resolved value, ready to be spent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendableUtxo {
    pub outpoint: OutPoint,
    pub value: Satoshi,
    pub script_pubkey: ScriptBuf,
    pub redeem_script: Option<ScriptBuf>,
    pub witness_script: Option<ScriptBuf>,
    /// Decoded creating transaction, when the candidate was supplied that way
    pub prior_transaction: Option<Transaction>,
}

impl SpendableUtxo {
    pub fn txid(&self) -> Txid {
        self.outpoint.txid
    }

    pub fn vout(&self) -> u32 {
        self.outpoint.vout
    }
}

impl fmt::Display for SpendableUtxo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} => {}", self.outpoint.txid, self.outpoint.vout, self.value)
    }
}

/// One selection request
#[derive(Debug, Clone)]
pub struct SelectorProps {
    /// Candidate pool
    pub utxos: Vec<Utxo>,

    /// Payments to fund, in order
    pub outputs: Vec<TxOutput>,

    pub fee_rate: FeeRate,

    /// Where change goes when it is worth creating
    pub change_destination: String,
}

impl SelectorProps {
    pub fn new(
        utxos: Vec<Utxo>,
        outputs: Vec<TxOutput>,
        fee_rate: FeeRate,
        change_destination: impl Into<String>,
    ) -> Self {
        Self {
            utxos,
            outputs,
            fee_rate,
            change_destination: change_destination.into(),
        }
    }
}

/// Diagnostics of a finished selection, not meant for machine parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionLog {
    /// One `txid:vout => value` line per selected input
    pub inputs: Vec<String>,

    /// One `destination => value` line per final output
    pub outputs: Vec<String>,

    pub fee: Satoshi,

    /// Requested rate in sat/vB
    pub fee_rate: FeeRate,

    /// Fee divided by the cost model's size estimate, two decimals
    pub effective_fee_rate: Option<Decimal>,
}

impl SelectionLog {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for SelectionLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Inputs:")?;
        for line in &self.inputs {
            writeln!(f, "  {}", line)?;
        }
        writeln!(f, "Outputs:")?;
        for line in &self.outputs {
            writeln!(f, "  {}", line)?;
        }
        write!(f, "Fee: {} (requested {} sat/vB", self.fee, self.fee_rate)?;
        match self.effective_fee_rate {
            Some(rate) => write!(f, ", effective {} sat/vB)", rate),
            None => write!(f, ")"),
        }
    }
}
