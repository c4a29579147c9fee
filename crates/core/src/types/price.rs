//! Type-safe price representation using decimal arithmetic.
//!
//! All amounts are Bangladeshi Taka (BDT). The shop sells in a single
//! currency, so no currency code travels with the amount.

use core::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
    /// The amount has more than two decimal places.
    #[error("price cannot have more than 2 decimal places (got {0})")]
    TooPrecise(Decimal),
    /// The amount exceeds [`Price::MAX`].
    #[error("price is too large (got {0})")]
    TooLarge(Decimal),
}

/// A non-negative amount of money in BDT, at most [`Price::MAX`], with at
/// most two decimal places (poisha).
///
/// Serialised as a plain JSON number (`3500`, `12.5`) because that is what
/// the storefront client sends and expects. Out-of-range amounts are
/// rejected both by [`Price::new`] and during deserialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// Zero taka.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest storable amount (`NUMERIC(12, 2)`).
    pub const MAX: Self = Self(Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2));

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns `PriceError` if the amount is negative, has more than two
    /// decimal places or exceeds [`Price::MAX`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        let amount = amount.normalize();
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        if amount.scale() > 2 {
            return Err(PriceError::TooPrecise(amount));
        }
        if amount > Self::MAX.0 {
            return Err(PriceError::TooLarge(amount));
        }
        Ok(Self(amount))
    }

    /// Create a price from a whole number of taka.
    #[must_use]
    pub fn from_taka(taka: u32) -> Self {
        Self(Decimal::from(taka))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `qty` units at this unit price, or `None` past [`Price::MAX`].
    #[must_use]
    pub fn line_total(&self, qty: u32) -> Option<Self> {
        self.0
            .checked_mul(Decimal::from(qty))
            .and_then(|amount| Self::new(amount).ok())
    }

    /// Sum of two prices, or `None` past [`Price::MAX`].
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0
            .checked_add(other.0)
            .and_then(|amount| Self::new(amount).ok())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "৳{}", self.0.normalize())
    }
}

impl Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let amount = self.0.normalize();
        if amount.fract().is_zero()
            && let Some(whole) = amount.to_i64()
        {
            return serializer.serialize_i64(whole);
        }
        let float = amount
            .to_f64()
            .ok_or_else(|| serde::ser::Error::custom("price out of range"))?;
        serializer.serialize_f64(float)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative() {
        assert!(matches!(
            Price::new(Decimal::new(-1, 0)),
            Err(PriceError::Negative(_))
        ));
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_bounds() {
        assert_eq!(Price::MAX.amount(), Decimal::new(999_999_999_999, 2));
        assert!(Price::new(Price::MAX.amount()).is_ok());
        assert!(matches!(
            Price::new(Decimal::new(10_000_000_000, 0)),
            Err(PriceError::TooLarge(_))
        ));
        assert!(matches!(
            Price::new(Decimal::new(12_345, 3)),
            Err(PriceError::TooPrecise(_))
        ));
        // Trailing zeros do not count as precision.
        assert_eq!(
            Price::new(Decimal::new(12_500, 3)).unwrap(),
            Price::new(Decimal::new(125, 1)).unwrap()
        );
    }

    #[test]
    fn test_line_total_and_add() {
        let saree = Price::from_taka(500);
        let kameez = Price::new(Decimal::new(12_50, 2)).unwrap();
        let total = saree
            .line_total(2)
            .unwrap()
            .checked_add(kameez.line_total(3).unwrap())
            .unwrap();
        assert_eq!(total.amount(), Decimal::new(1037_50, 2));
    }

    #[test]
    fn test_arithmetic_past_max_is_none() {
        assert_eq!(Price::MAX.line_total(2), None);
        assert_eq!(Price::MAX.line_total(u32::MAX), None);
        assert_eq!(Price::MAX.checked_add(Price::from_taka(1)), None);
        assert_eq!(Price::MAX.line_total(1), Some(Price::MAX));
        assert_eq!(Price::MAX.line_total(0), Some(Price::ZERO));
    }

    #[test]
    fn test_serializes_as_json_number() {
        assert_eq!(serde_json::to_string(&Price::from_taka(1000)).unwrap(), "1000");
        let fractional = Price::new(Decimal::new(125, 1)).unwrap();
        assert_eq!(serde_json::to_string(&fractional).unwrap(), "12.5");
    }

    #[test]
    fn test_deserializes_numbers() {
        let price: Price = serde_json::from_str("3500").unwrap();
        assert_eq!(price, Price::from_taka(3500));
        let price: Price = serde_json::from_str("99.5").unwrap();
        assert_eq!(price.amount(), Decimal::new(995, 1));
        assert!(serde_json::from_str::<Price>("-5").is_err());
        assert!(serde_json::from_str::<Price>("5e28").is_err());
        assert!(serde_json::from_str::<Price>("1.005").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_taka(1200).to_string(), "৳1200");
    }
}
