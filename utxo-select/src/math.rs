//! Exact fixed-point arithmetic for monetary amounts
//!
//! Every amount handled by the selector is a decimal magnitude tagged with a
//! power-of-ten unit. `FixedPoint<-8>` with magnitude `8000` denotes 8000 satoshis,
//! i.e. `8000 × 10^-8` whole coins. The unit is a const generic parameter, so adding a
//! satoshi amount to a wei amount does not compile; crossing units requires an
//! explicit [`FixedPoint::convert_to_scale`].
//!
//! The magnitude is a `rust_decimal::Decimal`, never a binary float, so sums of fee
//! components like `67.9 + 32.2` are exact.
//!
//! Example:
//! ```
//! use utxo_select::math::{Satoshi, Wei, WEI_SCALE};
//! use rust_decimal::RoundingStrategy;
//!
//! let input = Satoshi::from_sat(8_000);
//! let cost: Satoshi = "67.9".parse().unwrap();
//! let left = input - cost;
//! assert_eq!(left.to_fixed(1, RoundingStrategy::ToZero), "7932.1");
//! assert_eq!(left.floor(), Satoshi::from_sat(7_932));
//!
//! let wei: Wei = Satoshi::from_sat(1).convert_to_scale::<WEI_SCALE>().unwrap();
//! assert_eq!(wei.to_string(), "10000000000");
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use thiserror::Error;

pub use rust_decimal::RoundingStrategy;

/// Unit of whole coins
pub const NORMALIZED_SCALE: i32 = 0;

/// Unit of bitcoin satoshis (10^-8)
pub const SATOSHI_SCALE: i32 = -8;

/// Unit of XRP drops (10^-6)
pub const XRP_DROP_SCALE: i32 = -6;

/// Unit of ether wei (10^-18)
pub const WEI_SCALE: i32 = -18;

/// Largest number of fractional digits a magnitude can carry
const MAX_FRACTIONAL_DIGITS: u32 = 28;

/// Errors raised by the fixed-point layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("Scale mismatch: expected unit 10^{expected}, found 10^{found}")]
    ScaleMismatch { expected: i32, found: i32 },

    #[error("Amount overflow while {operation}")]
    Overflow { operation: &'static str },

    #[error("Converting from 10^{from} to 10^{to} needs more than 28 fractional digits")]
    PrecisionLoss { from: i32, to: i32 },

    #[error("Invalid amount literal: {0}")]
    InvalidLiteral(String),

    #[error("Amount {0} is not a whole non-negative number of units")]
    NotInteger(String),
}

/// A decimal magnitude tagged with the unit `10^SCALE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "TaggedAmount", try_from = "TaggedAmount")]
pub struct FixedPoint<const SCALE: i32> {
    magnitude: Decimal,
}

/// Whole-coin amount, also used for plain byte counts
pub type Normalized = FixedPoint<NORMALIZED_SCALE>;

/// Satoshi amount
pub type Satoshi = FixedPoint<SATOSHI_SCALE>;

/// XRP drop amount
pub type XrpDrop = FixedPoint<XRP_DROP_SCALE>;

/// Wei amount
pub type Wei = FixedPoint<WEI_SCALE>;

impl<const SCALE: i32> FixedPoint<SCALE> {
    /// Create an amount from a magnitude expressed in this unit
    pub const fn new(magnitude: Decimal) -> Self {
        Self { magnitude }
    }

    pub const fn zero() -> Self {
        Self::new(Decimal::ZERO)
    }

    /// Create an amount from a whole number of units
    pub fn from_units(units: u64) -> Self {
        Self::new(Decimal::from(units))
    }

    /// Construct from a runtime-tagged amount whose scale may differ, converting explicitly
    pub fn from_tagged_converting(tagged: TaggedAmount) -> Result<Self, AmountError> {
        let factor = power_of_ten(tagged.scale, SCALE)?;
        tagged
            .magnitude
            .checked_mul(factor)
            .map(Self::new)
            .ok_or(AmountError::Overflow {
                operation: "converting a tagged amount",
            })
    }

    /// The magnitude in this amount's own unit
    pub fn magnitude(&self) -> Decimal {
        self.magnitude
    }

    pub fn scale(&self) -> i32 {
        SCALE
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.magnitude.is_sign_negative() && !self.magnitude.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.magnitude.is_sign_positive() && !self.magnitude.is_zero()
    }

    /// Whether the magnitude has no fractional part
    pub fn is_integer(&self) -> bool {
        self.magnitude.fract().is_zero()
    }

    /// The magnitude as a whole non-negative number of units, if it is one
    pub fn to_integer(&self) -> Option<u64> {
        if self.is_integer() && !self.is_negative() {
            self.magnitude.to_u64()
        } else {
            None
        }
    }

    /// Like [`FixedPoint::to_integer`] but reporting why the conversion failed
    pub fn try_to_integer(&self) -> Result<u64, AmountError> {
        self.to_integer()
            .ok_or_else(|| AmountError::NotInteger(self.magnitude.to_string()))
    }

    pub fn checked_add(self, other: Self) -> Result<Self, AmountError> {
        self.magnitude
            .checked_add(other.magnitude)
            .map(Self::new)
            .ok_or(AmountError::Overflow { operation: "adding" })
    }

    pub fn checked_sub(self, other: Self) -> Result<Self, AmountError> {
        self.magnitude
            .checked_sub(other.magnitude)
            .map(Self::new)
            .ok_or(AmountError::Overflow {
                operation: "subtracting",
            })
    }

    /// Sum amounts, failing instead of panicking when the total leaves `Decimal`'s range
    pub fn checked_sum<I>(amounts: I) -> Result<Self, AmountError>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::zero(), |total, amount| total.checked_add(amount))
    }

    /// Multiply the magnitude by a dimensionless scalar, keeping the unit
    ///
    /// # Arguments
    /// * `scalar` - Any value convertible to `Decimal` (counts, fee rates, multipliers)
    ///
    /// # Returns
    /// The scaled amount, or `AmountError::Overflow`
    pub fn multiply_by_scalar(self, scalar: impl Into<Decimal>) -> Result<Self, AmountError> {
        self.magnitude
            .checked_mul(scalar.into())
            .map(Self::new)
            .ok_or(AmountError::Overflow {
                operation: "multiplying",
            })
    }

    /// Round to a whole number of units with the given strategy
    pub fn round(self, strategy: RoundingStrategy) -> Self {
        Self::new(self.magnitude.round_dp_with_strategy(0, strategy))
    }

    /// Round toward negative infinity
    pub fn floor(self) -> Self {
        Self::new(self.magnitude.floor())
    }

    /// Round toward positive infinity
    pub fn ceil(self) -> Self {
        Self::new(self.magnitude.ceil())
    }

    /// Re-express this amount in the unit `10^TARGET`
    ///
    /// The magnitude is multiplied by `10^(SCALE - TARGET)`, so the denoted value is
    /// unchanged: 1 satoshi becomes `10^10` wei, or `0.00000001` normalized.
    pub fn convert_to_scale<const TARGET: i32>(self) -> Result<FixedPoint<TARGET>, AmountError> {
        let factor = power_of_ten(SCALE, TARGET)?;
        self.magnitude
            .checked_mul(factor)
            .map(FixedPoint::new)
            .ok_or(AmountError::Overflow {
                operation: "converting scale",
            })
    }

    /// The value in whole coins
    pub fn normalized(self) -> Result<Normalized, AmountError> {
        self.convert_to_scale::<NORMALIZED_SCALE>()
    }

    /// Render with exactly `digits` fractional digits
    ///
    /// # Arguments
    /// * `digits` - Number of fractional digits to print
    /// * `strategy` - How to round away digits beyond `digits`
    pub fn to_fixed(&self, digits: u32, strategy: RoundingStrategy) -> String {
        let rounded = self.magnitude.round_dp_with_strategy(digits, strategy);
        format!("{:.*}", digits as usize, rounded)
    }

    /// The runtime-tagged form of this amount
    pub fn tagged(&self) -> TaggedAmount {
        TaggedAmount {
            magnitude: self.magnitude,
            scale: SCALE,
        }
    }
}

impl Satoshi {
    /// Create an amount of whole satoshis
    pub fn from_sat(sats: u64) -> Self {
        Self::from_units(sats)
    }
}

/// Multiplier taking a magnitude from unit `10^from` to unit `10^to`
fn power_of_ten(from: i32, to: i32) -> Result<Decimal, AmountError> {
    let exponent = i64::from(from) - i64::from(to);
    if exponent < -i64::from(MAX_FRACTIONAL_DIGITS) {
        return Err(AmountError::PrecisionLoss { from, to });
    }

    let mut factor = Decimal::ONE;
    for _ in 0..exponent.unsigned_abs() {
        let next = if exponent > 0 {
            factor.checked_mul(Decimal::TEN)
        } else {
            factor.checked_div(Decimal::TEN)
        };
        factor = next.ok_or(AmountError::Overflow {
            operation: "computing a power of ten",
        })?;
    }
    Ok(factor)
}

impl<const SCALE: i32> Add for FixedPoint<SCALE> {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.magnitude + other.magnitude)
    }
}

impl<const SCALE: i32> Sub for FixedPoint<SCALE> {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.magnitude - other.magnitude)
    }
}

impl<const SCALE: i32> AddAssign for FixedPoint<SCALE> {
    fn add_assign(&mut self, other: Self) {
        self.magnitude += other.magnitude;
    }
}

impl<const SCALE: i32> SubAssign for FixedPoint<SCALE> {
    fn sub_assign(&mut self, other: Self) {
        self.magnitude -= other.magnitude;
    }
}

impl<const SCALE: i32> Neg for FixedPoint<SCALE> {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.magnitude)
    }
}

impl<const SCALE: i32> Sum for FixedPoint<SCALE> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, x| acc + x)
    }
}

impl<'a, const SCALE: i32> Sum<&'a FixedPoint<SCALE>> for FixedPoint<SCALE> {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, x| acc + *x)
    }
}

impl<const SCALE: i32> PartialOrd for FixedPoint<SCALE> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<const SCALE: i32> Ord for FixedPoint<SCALE> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.magnitude.cmp(&other.magnitude)
    }
}

impl<const SCALE: i32> fmt::Display for FixedPoint<SCALE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.magnitude.normalize(), f)
    }
}

impl<const SCALE: i32> FromStr for FixedPoint<SCALE> {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .map(Self::new)
            .map_err(|e| AmountError::InvalidLiteral(format!("{}: {}", s, e)))
    }
}

impl<const SCALE: i32> From<Decimal> for FixedPoint<SCALE> {
    fn from(magnitude: Decimal) -> Self {
        Self::new(magnitude)
    }
}

impl<const SCALE: i32> From<u64> for FixedPoint<SCALE> {
    fn from(units: u64) -> Self {
        Self::from_units(units)
    }
}

impl<const SCALE: i32> From<i64> for FixedPoint<SCALE> {
    fn from(units: i64) -> Self {
        Self::new(Decimal::from(units))
    }
}

impl<const SCALE: i32> TryFrom<f64> for FixedPoint<SCALE> {
    type Error = AmountError;

    /// Goes through the shortest decimal rendering that round-trips the float,
    /// so `67.9_f64` becomes exactly `67.9`.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(AmountError::InvalidLiteral(value.to_string()));
        }
        value.to_string().parse()
    }
}

impl From<bitcoin::Amount> for Satoshi {
    fn from(amount: bitcoin::Amount) -> Self {
        Self::from_sat(amount.to_sat())
    }
}

/// Runtime-tagged amount, the serialized form of [`FixedPoint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedAmount {
    pub magnitude: Decimal,
    pub scale: i32,
}

impl<const SCALE: i32> From<FixedPoint<SCALE>> for TaggedAmount {
    fn from(amount: FixedPoint<SCALE>) -> Self {
        amount.tagged()
    }
}

impl<const SCALE: i32> TryFrom<TaggedAmount> for FixedPoint<SCALE> {
    type Error = AmountError;

    fn try_from(tagged: TaggedAmount) -> Result<Self, Self::Error> {
        if tagged.scale != SCALE {
            return Err(AmountError::ScaleMismatch {
                expected: SCALE,
                found: tagged.scale,
            });
        }
        Ok(Self::new(tagged.magnitude))
    }
}
