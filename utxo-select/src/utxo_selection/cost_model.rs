//! Per-script-type byte costs and their conversion into fees
//!
//! A [`CostModel`] is plain data: the byte cost of one input, one output and the
//! fixed transaction header, plus a [`DustPolicy`]. The selector never asks which
//! script type it is pricing; it only reads these numbers.
//!
//! # Profiles
//!
//! | Profile | Input bytes | Output bytes | Header bytes |
//! |---|---|---|---|
//! | P2WPKH | 67.9 | 32.2 | 13 |
//! | P2SH-P2WSH m-of-n | 77 + 28·m | 32.2 | 13 |
//! | P2SH m-of-n | 55 + 108·m | 32.2 | 25 |
//!
//! # Example
//!
//! ```
//! use utxo_select::utxo_selection::cost_model::CostModel;
//! use utxo_select::types::FeeRate;
//! use utxo_select::math::Satoshi;
//! use rust_decimal_macros::dec;
//!
//! let model = CostModel::p2wpkh();
//! let rate = FeeRate::from_sat_per_vb(dec!(1)).unwrap();
//! assert_eq!(model.cost_per_input(rate).unwrap(), Satoshi::from_sat(68));
//! assert_eq!(model.cost_per_output(rate).unwrap(), Satoshi::from_sat(33));
//! assert_eq!(model.dust_threshold().unwrap(), Satoshi::from_sat(111));
//! ```

use crate::error::{invalid_configuration, SelectorResult};
use crate::math::{Normalized, RoundingStrategy, Satoshi};
use crate::types::{FeeRate, DEFAULT_DUST_MULTIPLIER};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Byte counts are unit-less whole-scale amounts
pub type ByteSize = Normalized;

/// Largest signature threshold for witness-script multisig
pub const MAX_WITNESS_MULTISIG_SIGNATURES: u8 = 20;

/// Largest signature threshold for legacy script-hash multisig (520-byte redeem script)
pub const MAX_LEGACY_MULTISIG_SIGNATURES: u8 = 15;

const P2WPKH_INPUT_BYTES: Decimal = dec!(67.9);
const STANDARD_OUTPUT_BYTES: Decimal = dec!(32.2);
const WITNESS_HEADER_BYTES: Decimal = dec!(13);
const P2SH_P2WSH_BASE_INPUT_BYTES: Decimal = dec!(77);
const P2SH_P2WSH_BYTES_PER_SIGNATURE: Decimal = dec!(28);
const P2SH_BASE_INPUT_BYTES: Decimal = dec!(55);
const P2SH_BYTES_PER_SIGNATURE: Decimal = dec!(108);
const LEGACY_HEADER_BYTES: Decimal = dec!(25);

/// Spending script types with a built-in cost profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptType {
    /// Native witness pay-to-key-hash
    P2wpkh,
    /// Witness-script multisig wrapped in script-hash
    P2shP2wsh,
    /// Legacy script-hash multisig
    P2sh,
}

impl ScriptType {
    /// Whether the profile needs a signature threshold
    pub fn is_multisig(&self) -> bool {
        !matches!(self, ScriptType::P2wpkh)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptType::P2wpkh => "p2wpkh",
            ScriptType::P2shP2wsh => "p2sh-p2wsh",
            ScriptType::P2sh => "p2sh",
        }
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScriptType {
    type Err = crate::error::SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "p2wpkh" => Ok(ScriptType::P2wpkh),
            "p2sh-p2wsh" => Ok(ScriptType::P2shP2wsh),
            "p2sh" => Ok(ScriptType::P2sh),
            other => Err(invalid_configuration(format!("unknown script type '{}'", other))),
        }
    }
}

/// How the minimum worthwhile change value is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DustPolicy {
    /// `(cost_per_input + cost_per_output) × multiplier`, priced at `reference_rate`
    Derived {
        multiplier: Decimal,
        reference_rate: FeeRate,
    },
    /// A threshold supplied directly
    Fixed(Satoshi),
}

impl Default for DustPolicy {
    fn default() -> Self {
        DustPolicy::Derived {
            multiplier: DEFAULT_DUST_MULTIPLIER,
            reference_rate: FeeRate::ONE_SAT_PER_VB,
        }
    }
}

/// Byte costs of one script type plus its dust policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostModel {
    /// Bytes added by one input
    pub input_bytes: ByteSize,
    /// Bytes added by one output
    pub output_bytes: ByteSize,
    /// Fixed per-transaction bytes
    pub header_bytes: ByteSize,
    pub dust_policy: DustPolicy,
}

impl CostModel {
    /// Single-key witness spending
    pub fn p2wpkh() -> Self {
        Self {
            input_bytes: ByteSize::new(P2WPKH_INPUT_BYTES),
            output_bytes: ByteSize::new(STANDARD_OUTPUT_BYTES),
            header_bytes: ByteSize::new(WITNESS_HEADER_BYTES),
            dust_policy: DustPolicy::default(),
        }
    }

    /// Script-hash-wrapped witness-script multisig requiring `m` signatures
    pub fn p2sh_p2wsh_multisig(m: u8) -> SelectorResult<Self> {
        check_signatures(ScriptType::P2shP2wsh, m, MAX_WITNESS_MULTISIG_SIGNATURES)?;
        Ok(Self {
            input_bytes: ByteSize::new(
                P2SH_P2WSH_BASE_INPUT_BYTES + P2SH_P2WSH_BYTES_PER_SIGNATURE * Decimal::from(m),
            ),
            output_bytes: ByteSize::new(STANDARD_OUTPUT_BYTES),
            header_bytes: ByteSize::new(WITNESS_HEADER_BYTES),
            dust_policy: DustPolicy::default(),
        })
    }

    /// Legacy script-hash multisig requiring `m` signatures
    pub fn p2sh_multisig(m: u8) -> SelectorResult<Self> {
        check_signatures(ScriptType::P2sh, m, MAX_LEGACY_MULTISIG_SIGNATURES)?;
        Ok(Self {
            input_bytes: ByteSize::new(
                P2SH_BASE_INPUT_BYTES + P2SH_BYTES_PER_SIGNATURE * Decimal::from(m),
            ),
            output_bytes: ByteSize::new(STANDARD_OUTPUT_BYTES),
            header_bytes: ByteSize::new(LEGACY_HEADER_BYTES),
            dust_policy: DustPolicy::default(),
        })
    }

    /// Arbitrary byte costs with an explicit dust policy
    ///
    /// The header may cost at most two outputs. Selection reserves two output costs for the
    /// change output beyond the payments, and that reserve is what pays the header, so a
    /// heavier header could stop selection before the fee is covered.
    pub fn custom(
        input_bytes: ByteSize,
        output_bytes: ByteSize,
        header_bytes: ByteSize,
        dust_policy: DustPolicy,
    ) -> SelectorResult<Self> {
        for (name, bytes) in [
            ("input", input_bytes),
            ("output", output_bytes),
            ("header", header_bytes),
        ] {
            if bytes.is_negative() {
                return Err(invalid_configuration(format!(
                    "{} byte cost must not be negative, got {}",
                    name, bytes
                )));
            }
        }
        let header_allowance = output_bytes.multiply_by_scalar(Decimal::from(2u8))?;
        if header_bytes > header_allowance {
            return Err(invalid_configuration(format!(
                "header byte cost {} exceeds twice the output byte cost ({})",
                header_bytes, header_allowance
            )));
        }
        if let DustPolicy::Fixed(threshold) = dust_policy {
            if threshold.is_negative() {
                return Err(invalid_configuration(format!(
                    "dust threshold must not be negative, got {}",
                    threshold
                )));
            }
        }
        Ok(Self {
            input_bytes,
            output_bytes,
            header_bytes,
            dust_policy,
        })
    }

    /// The built-in profile for a script type
    ///
    /// # Arguments
    /// * `script_type` - Which profile to use
    /// * `signatures` - Signature threshold `m`, required for multisig profiles
    pub fn for_script(script_type: ScriptType, signatures: Option<u8>) -> SelectorResult<Self> {
        match (script_type, signatures) {
            (ScriptType::P2wpkh, _) => Ok(Self::p2wpkh()),
            (ScriptType::P2shP2wsh, Some(m)) => Self::p2sh_p2wsh_multisig(m),
            (ScriptType::P2sh, Some(m)) => Self::p2sh_multisig(m),
            (other, None) => Err(invalid_configuration(format!(
                "{} needs a signature threshold",
                other
            ))),
        }
    }

    /// Replace the dust policy
    pub fn with_dust_policy(mut self, dust_policy: DustPolicy) -> Self {
        self.dust_policy = dust_policy;
        self
    }

    /// Fee for adding one input at `fee_rate`, rounded up to a whole satoshi
    pub fn cost_per_input(&self, fee_rate: FeeRate) -> SelectorResult<Satoshi> {
        price(self.input_bytes, fee_rate)
    }

    /// Fee for adding one output at `fee_rate`, rounded up to a whole satoshi
    pub fn cost_per_output(&self, fee_rate: FeeRate) -> SelectorResult<Satoshi> {
        price(self.output_bytes, fee_rate)
    }

    /// Fixed per-transaction fee at `fee_rate`, rounded up to a whole satoshi
    pub fn header_cost(&self, fee_rate: FeeRate) -> SelectorResult<Satoshi> {
        price(self.header_bytes, fee_rate)
    }

    /// Minimum change value worth creating, floored to a whole satoshi
    pub fn dust_threshold(&self) -> SelectorResult<Satoshi> {
        match self.dust_policy {
            DustPolicy::Fixed(threshold) => Ok(threshold.floor()),
            DustPolicy::Derived {
                multiplier,
                reference_rate,
            } => {
                let per_pair = self
                    .cost_per_input(reference_rate)?
                    .checked_add(self.cost_per_output(reference_rate)?)?;
                Ok(per_pair.multiply_by_scalar(multiplier)?.floor())
            }
        }
    }

    /// Estimated transaction size in bytes for the given shape
    pub fn estimated_size(&self, inputs: usize, outputs: usize) -> SelectorResult<ByteSize> {
        let inputs = self.input_bytes.multiply_by_scalar(Decimal::from(inputs))?;
        let outputs = self.output_bytes.multiply_by_scalar(Decimal::from(outputs))?;
        Ok(self.header_bytes.checked_add(inputs)?.checked_add(outputs)?)
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::p2wpkh()
    }
}

fn check_signatures(script_type: ScriptType, m: u8, max: u8) -> SelectorResult<()> {
    if m == 0 || m > max {
        return Err(invalid_configuration(format!(
            "{} multisig needs between 1 and {} signatures, got {}",
            script_type, max, m
        )));
    }
    Ok(())
}

fn price(bytes: ByteSize, fee_rate: FeeRate) -> SelectorResult<Satoshi> {
    let cost = bytes.magnitude().checked_mul(fee_rate.as_sat_per_vb()).ok_or(
        crate::math::AmountError::Overflow {
            operation: "pricing bytes",
        },
    )?;
    Ok(Satoshi::new(cost).round(RoundingStrategy::ToPositiveInfinity))
}
