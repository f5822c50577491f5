use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

/// A currency amount held as an exact decimal with two fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal.round_dp(2))
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Largest amount a single expense may carry (`decimal(10, 2)`).
    pub fn max_amount() -> Self {
        Money(Decimal::new(9_999_999_999, 2))
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Money)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMoneyError(pub String);

impl fmt::Display for ParseMoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid amount: '{}'", self.0)
    }
}

impl std::error::Error for ParseMoneyError {}

impl FromStr for Money {
    type Err = ParseMoneyError;

    /// Accepts plain decimals plus the usual spreadsheet decorations
    /// (`$`, thousands separators, surrounding whitespace).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = s.trim().replace([',', '$', ' '], "");
        Decimal::from_str(&cleaned)
            .map(Money::from_decimal)
            .map_err(|_| ParseMoneyError(s.to_string()))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Saturates at the decimal range instead of panicking.
impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        self.checked_add(rhs).unwrap_or(Money(Decimal::MAX))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |a, b| a + b)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal amount as a string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        Money::from_str(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        Ok(Money(Decimal::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        Ok(Money(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Decimal::try_from(v)
            .map(Money::from_decimal)
            .map_err(|_| E::custom(format!("invalid amount: {v}")))
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_always_has_two_decimals() {
        assert_eq!(Money::from_cents(3000).to_string(), "30.00");
        assert_eq!(Money::zero().to_string(), "0.00");
        assert_eq!("4.5".parse::<Money>().unwrap().to_string(), "4.50");
    }

    #[test]
    fn parse_strips_currency_decorations() {
        assert_eq!("$1,234.56".parse::<Money>().unwrap(), Money::from_cents(123456));
        assert_eq!(" 12 ".parse::<Money>().unwrap(), Money::from_cents(1200));
    }

    #[test]
    fn parse_rounds_to_cents() {
        assert_eq!("0.125".parse::<Money>().unwrap(), Money::from_cents(12));
        assert_eq!("0.135".parse::<Money>().unwrap(), Money::from_cents(14));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("twelve".parse::<Money>().is_err());
        assert!("".parse::<Money>().is_err());
    }

    #[test]
    fn sum_has_no_float_drift() {
        let total: Money = std::iter::repeat(Money::from_cents(10)).take(10).sum();
        assert_eq!(total.to_string(), "1.00");
    }

    #[test]
    fn addition_saturates_instead_of_overflowing() {
        let huge = Money::from_decimal(Decimal::MAX);
        assert_eq!(huge.checked_add(huge), None);
        assert_eq!(huge + huge, Money(Decimal::MAX));
        let total: Money = [huge, huge, Money::from_cents(1)].into_iter().sum();
        assert_eq!(total, Money(Decimal::MAX));
    }

    #[test]
    fn max_amount_is_ten_digits_with_cents() {
        assert_eq!(Money::max_amount().to_string(), "99999999.99");
    }

    #[test]
    fn negative_detection() {
        assert!(Money::from_cents(-1).is_negative());
        assert!(!Money::zero().is_negative());
        assert!(!"-0.00".parse::<Money>().unwrap().is_negative());
    }

    #[test]
    fn serde_accepts_strings_and_numbers() {
        let from_str: Money = serde_json::from_str("\"15.50\"").unwrap();
        let from_num: Money = serde_json::from_str("15.5").unwrap();
        let from_int: Money = serde_json::from_str("15").unwrap();
        assert_eq!(from_str, Money::from_cents(1550));
        assert_eq!(from_num, Money::from_cents(1550));
        assert_eq!(from_int, Money::from_cents(1500));
        assert_eq!(serde_json::to_string(&from_int).unwrap(), "\"15.00\"");
    }
}
