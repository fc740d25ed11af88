//! Lossless decimal numeric type backed by rust_decimal.
//!
//! Provides canonical parsing from strings and formatting without exponent notation.

use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Lossless decimal numeric type for balances, quantities and prices.
///
/// Backed by rust_decimal to avoid floating-point drift.
/// Serializes to a JSON string and only accepts strings on input, so amounts
/// never pass through a binary float on the wire.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(
    #[serde(
        serialize_with = "serialize_canonical",
        deserialize_with = "deserialize_string"
    )]
    RustDecimal,
);

fn serialize_canonical<S: Serializer>(value: &RustDecimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.normalize().to_string())
}

fn deserialize_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RustDecimal, D::Error> {
    let raw = String::deserialize(deserializer)?;
    RustDecimal::from_str(raw.trim()).map_err(serde::de::Error::custom)
}

impl Decimal {
    /// Create a Decimal from a RustDecimal.
    pub fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s.trim()).map(Decimal)
    }

    /// Format the Decimal as a canonical string (no exponent notation).
    pub fn to_canonical_string(&self) -> String {
        // Use normalize() to remove trailing zeros, then format without exponent
        let normalized = self.0.normalize();
        format!("{}", normalized)
    }

    /// Get the underlying RustDecimal.
    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    /// The additive identity (0).
    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    /// The multiplicative identity (1).
    pub fn one() -> Self {
        Decimal(RustDecimal::ONE)
    }

    /// Returns true if the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// Number of significant fractional digits, ignoring trailing zeros.
    pub fn fractional_digits(&self) -> u32 {
        self.0.normalize().scale()
    }

    /// Checked multiplication; `None` on overflow of the 96-bit mantissa.
    pub fn checked_mul(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_mul(rhs.0).map(Decimal)
    }

    /// Checked addition; `None` on overflow.
    pub fn checked_add(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_add(rhs.0).map(Decimal)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal(RustDecimal::from(value))
    }
}

// Arithmetic operations
impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

impl std::iter::Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Decimal {
        iter.fold(Decimal::zero(), |acc, d| acc + d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_decimal_canonical_strips_trailing_zeros() {
        assert_eq!(d("10.500").to_canonical_string(), "10.5");
        assert_eq!(d("400.00").to_canonical_string(), "400");
        assert!(!d("0.00000001").to_canonical_string().contains('e'));
    }

    #[test]
    fn test_decimal_commission_is_exact() {
        // 0.1 + 0.2 style drift must not happen
        let consideration = d("0.1") + d("0.2");
        assert_eq!(consideration, d("0.3"));

        let commission = d("400") * d("0.03");
        assert_eq!(commission, d("12"));
    }

    #[test]
    fn test_decimal_json_is_string() {
        let json = serde_json::to_value(d("123.4500")).unwrap();
        assert!(json.is_string());
        assert_eq!(json, serde_json::json!("123.45"));
    }

    #[test]
    fn test_decimal_json_rejects_numbers() {
        let parsed: Result<Decimal, _> = serde_json::from_str("12.5");
        assert!(parsed.is_err());

        let parsed: Decimal = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(parsed, d("12.5"));
    }

    #[test]
    fn test_fractional_digits() {
        assert_eq!(d("10").fractional_digits(), 0);
        assert_eq!(d("10.10").fractional_digits(), 1);
        assert_eq!(d("0.00000001").fractional_digits(), 8);
    }

    #[test]
    fn test_sign_helpers() {
        assert!(d("0.01").is_positive());
        assert!(!d("0").is_positive());
        assert!(d("-1").is_negative());
        assert!(d("0").is_zero());
    }

    #[test]
    fn test_min_and_sum() {
        assert_eq!(d("3").min(d("2")), d("2"));
        let total: Decimal = vec![d("1.5"), d("2.5"), d("6")].into_iter().sum();
        assert_eq!(total, d("10"));
    }
}
