//! Amount type for handling monetary values with optional dollar signs.
//!
//! This module provides the `Amount` type which wraps `Decimal` and handles parsing values that
//! may or may not include a dollar sign and commas. Cells read back from the sheet are rendered
//! with the sheet's number format, so `$1,250.00` and `1250` must both be understood.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// Represents a money amount.
///
/// Amounts are written to the sheet in their shortest plain form (`12.5`, not `$12.50`) so that
/// the sheet interprets them as numbers.
///
/// # Examples
///
/// ```
/// # use expense_sheet::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("-$5,000.50").unwrap();
/// let b = Amount::from_str("-5000.5").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "-5000.5");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Converts a floating point number, as received from JSON, into an `Amount`.
    pub fn from_f64(value: f64) -> Result<Self, AmountError> {
        Decimal::from_f64(value)
            .map(Self)
            .ok_or(AmountError::NotFinite(value))
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is greater than zero.
    pub fn is_positive(&self) -> bool {
        !self.0.is_zero() && self.0.is_sign_positive()
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub enum AmountError {
    Empty,
    NotFinite(f64),
    Decimal(rust_decimal::Error),
}

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::Empty => f.write_str("An empty string is not an amount"),
            AmountError::NotFinite(v) => write!(f, "The number {v} cannot be used as an amount"),
            AmountError::Decimal(e) => Display::fmt(e, f),
        }
    }
}

impl Error for AmountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AmountError::Decimal(e) => Some(e),
            _ => None,
        }
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AmountError::Empty);
        }

        // "-$50.00", "$50.00", "-50.00" or "50.00"
        let without_dollar = if let Some(after_minus) = trimmed.strip_prefix('-') {
            match after_minus.strip_prefix('$') {
                Some(after_dollar) => format!("-{after_dollar}"),
                None => trimmed.to_string(),
            }
        } else if let Some(after_dollar) = trimmed.strip_prefix('$') {
            after_dollar.to_string()
        } else {
            trimmed.to_string()
        };

        // Thousands separators
        let without_commas = without_dollar.replace(',', "");

        Decimal::from_str(&without_commas)
            .map(Amount)
            .map_err(AmountError::Decimal)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

impl Amount {
    /// The sum of two amounts, or `None` when it does not fit in a `Decimal`. Amounts come from
    /// cells anyone can edit, so sums are never allowed to panic.
    pub fn checked_add(self, rhs: Self) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_dollar_sign() {
        let amount = Amount::from_str("$50.00").unwrap();
        assert_eq!(amount.value(), Decimal::from_str("50.00").unwrap());
    }

    #[test]
    fn test_parse_negative_with_dollar_sign() {
        let amount = Amount::from_str("-$50.00").unwrap();
        assert_eq!(amount.value(), Decimal::from_str("-50.00").unwrap());
    }

    #[test]
    fn test_parse_whitespace() {
        let amount = Amount::from_str("  $50.00  ").unwrap();
        assert_eq!(amount.value(), Decimal::from_str("50.00").unwrap());
    }

    #[test]
    fn test_parse_multiple_commas() {
        let amount = Amount::from_str("$1,234,567.89").unwrap();
        assert_eq!(amount.value(), Decimal::from_str("1234567.89").unwrap());
    }

    #[test]
    fn test_parse_empty_string_is_an_error() {
        assert!(matches!(Amount::from_str(""), Err(AmountError::Empty)));
        assert!(matches!(Amount::from_str("   "), Err(AmountError::Empty)));
    }

    #[test]
    fn test_parse_garbage() {
        let err = Amount::from_str("abc").unwrap_err();
        assert!(matches!(err, AmountError::Decimal(_)));
        assert!(Amount::from_str("12abc").is_err());
    }

    #[test]
    fn test_display_is_normalized() {
        assert_eq!(Amount::from_str("12.50").unwrap().to_string(), "12.5");
        assert_eq!(Amount::from_str("$100.00").unwrap().to_string(), "100");
        assert_eq!(Amount::from_str("0.05").unwrap().to_string(), "0.05");
    }

    #[test]
    fn test_from_f64() {
        assert_eq!(Amount::from_f64(12.5).unwrap().to_string(), "12.5");
        assert_eq!(Amount::from_f64(0.1).unwrap().to_string(), "0.1");
        assert!(Amount::from_f64(f64::NAN).is_err());
    }

    #[test]
    fn test_is_positive() {
        assert!(Amount::from_str("0.01").unwrap().is_positive());
        assert!(!Amount::from_str("0").unwrap().is_positive());
        assert!(!Amount::from_str("-$3.00").unwrap().is_positive());
    }

    #[test]
    fn test_checked_add() {
        let total = Amount::ZERO
            .checked_add(Amount::from_str("100").unwrap())
            .and_then(|t| t.checked_add(Amount::from_str("25.5").unwrap()))
            .unwrap();
        assert_eq!(total.to_string(), "125.5");

        let max = Amount::new(Decimal::MAX);
        assert_eq!(max.checked_add(Amount::from_str("1").unwrap()), None);
    }

    #[test]
    fn test_serde() {
        let amount: Amount = serde_json::from_str("\"$7.25\"").unwrap();
        assert_eq!(serde_json::to_string(&amount).unwrap(), "\"7.25\"");
    }
}
