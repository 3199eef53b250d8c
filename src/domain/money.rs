//! Monetary amounts.
//!
//! Every amount in the shop is a non-negative count of minor currency units
//! (cents). On the wire an amount is a decimal string in major units with two
//! fraction digits, e.g. `"129.99"`; input also accepts a JSON number.

use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Signed, ToPrimitive};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

const MINOR_PER_MAJOR: i64 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("'{0}' is not a decimal amount")]
    Malformed(String),
    #[error("amount must not be negative")]
    Negative,
    #[error("amount has more than two decimal places")]
    TooPrecise,
    #[error("amount is too large")]
    Overflow,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    pub const fn minor_units(self) -> i64 {
        self.0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Parse a decimal amount in major units (`"12.5"` is 1250 minor units).
    pub fn parse(input: &str) -> Result<Self, MoneyError> {
        let trimmed = input.trim();
        let decimal = BigDecimal::from_str(trimmed)
            .map_err(|_| MoneyError::Malformed(trimmed.to_string()))?;
        if decimal.is_negative() {
            return Err(MoneyError::Negative);
        }
        let minor = decimal * BigDecimal::from(MINOR_PER_MAJOR);
        if !minor.is_integer() {
            return Err(MoneyError::TooPrecise);
        }
        minor.to_i64().map(Money).ok_or(MoneyError::Overflow)
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse(s)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per = MINOR_PER_MAJOR as u64;
        write!(f, "{}{}.{:02}", sign, abs / per, abs % per)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = match RawAmount::deserialize(deserializer)? {
            RawAmount::Text(s) => s,
            RawAmount::Integer(i) => i.to_string(),
            RawAmount::Float(f) => f.to_string(),
        };
        Money::parse(&text).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(Money::parse("130").unwrap(), Money::from_minor(13_000));
        assert_eq!(Money::parse("12.5").unwrap(), Money::from_minor(1_250));
        assert_eq!(Money::parse(" 0.99 ").unwrap(), Money::from_minor(99));
    }

    #[test]
    fn rejects_negative_amounts() {
        assert_eq!(Money::parse("-1"), Err(MoneyError::Negative));
    }

    #[test]
    fn rejects_sub_cent_precision() {
        assert_eq!(Money::parse("1.005"), Err(MoneyError::TooPrecise));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(Money::parse("ten"), Err(MoneyError::Malformed(_))));
    }

    #[test]
    fn displays_two_fraction_digits() {
        assert_eq!(Money::from_minor(13_000).to_string(), "130.00");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
        assert_eq!(Money::from_minor(-250).to_string(), "-2.50");
    }

    #[test]
    fn deserializes_strings_and_numbers() {
        let from_str: Money = serde_json::from_str("\"10.25\"").unwrap();
        let from_int: Money = serde_json::from_str("20").unwrap();
        let from_float: Money = serde_json::from_str("10.5").unwrap();

        assert_eq!(from_str, Money::from_minor(1_025));
        assert_eq!(from_int, Money::from_minor(2_000));
        assert_eq!(from_float, Money::from_minor(1_050));
    }

    #[test]
    fn serializes_as_decimal_string() {
        let json = serde_json::to_string(&Money::from_minor(12_999)).unwrap();
        assert_eq!(json, "\"129.99\"");
    }
}
