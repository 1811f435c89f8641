//! Core domain types shared by the cost model and the selector
//!
//! # Key Types
//!
//! - [`FeeRate`]: price per transaction byte, validated to be strictly positive
//! - [`TxOutput`]: a payment destination and its value in satoshis
//!
//! Destinations are opaque strings. This crate never decodes them; the external
//! transaction builder does.

use crate::error::{invalid_configuration, SelectorError, SelectorResult};
use crate::math::Satoshi;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Satoshis per bitcoin
pub const SATS_PER_BTC: u64 = 100_000_000;

/// Maximum bitcoin supply in satoshis
pub const MAX_BITCOIN_SUPPLY: u64 = 21_000_000 * SATS_PER_BTC;

/// Whether `value` is a whole number of satoshis within the bitcoin supply
pub fn is_valid_bitcoin_value(value: Satoshi) -> bool {
    value.is_integer() && !value.is_negative() && value <= Satoshi::from_sat(MAX_BITCOIN_SUPPLY)
}

/// Default multiple of (input cost + output cost) below which change is dust
pub const DEFAULT_DUST_MULTIPLIER: Decimal = dec!(1.1);

/// Default fee rate used when pricing the dust threshold
pub const DEFAULT_DUST_REFERENCE_RATE: Decimal = dec!(1);

/// Fee rate in satoshis per virtual byte
///
/// # Examples
///
/// ```
/// use utxo_select::types::FeeRate;
/// use rust_decimal_macros::dec;
///
/// let rate = FeeRate::from_sat_per_vb(dec!(2.5)).unwrap();
/// assert_eq!(rate.as_sat_per_vb(), dec!(2.5));
/// assert!(FeeRate::from_sat_per_vb(dec!(0)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct FeeRate(Decimal);

impl FeeRate {
    /// One satoshi per virtual byte
    pub const ONE_SAT_PER_VB: FeeRate = FeeRate(DEFAULT_DUST_REFERENCE_RATE);

    /// Create a fee rate, rejecting zero and negative rates
    pub fn from_sat_per_vb(rate: Decimal) -> SelectorResult<Self> {
        if rate <= Decimal::ZERO {
            return Err(invalid_configuration(format!(
                "fee rate must be greater than zero, got {}",
                rate
            )));
        }
        Ok(Self(rate))
    }

    pub fn as_sat_per_vb(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for FeeRate {
    type Error = SelectorError;

    fn try_from(rate: Decimal) -> Result<Self, Self::Error> {
        Self::from_sat_per_vb(rate)
    }
}

impl From<FeeRate> for Decimal {
    fn from(rate: FeeRate) -> Self {
        rate.0
    }
}

impl FromStr for FeeRate {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rate = Decimal::from_str(s.trim())
            .map_err(|e| invalid_configuration(format!("invalid fee rate '{}': {}", s, e)))?;
        Self::from_sat_per_vb(rate)
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// A payment output: destination and value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    /// Opaque destination understood by the transaction builder
    pub destination: String,

    /// Value in satoshis
    pub value: Satoshi,
}

impl TxOutput {
    pub fn new(destination: impl Into<String>, value: Satoshi) -> Self {
        Self {
            destination: destination.into(),
            value,
        }
    }

    /// Create an output paying a whole number of satoshis
    pub fn from_sat(destination: impl Into<String>, sats: u64) -> Self {
        Self::new(destination, Satoshi::from_sat(sats))
    }
}

impl fmt::Display for TxOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.destination, self.value)
    }
}
