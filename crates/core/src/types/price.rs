//! Prices in West African CFA francs.
//!
//! Catalog prices are whole francs, but they travel through scrapers and
//! spreadsheets, so they are kept as [`Decimal`] and serialized as plain JSON
//! numbers (`15000`, not `"15000"`).

use core::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit.
    #[serde(with = "decimal_number")]
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A price in CFA francs.
    #[must_use]
    pub const fn fcfa(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::XOF)
    }

    /// Human-readable label, e.g. `15000 FCFA`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.amount.normalize(), self.currency_code.label())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    /// West African CFA franc.
    #[default]
    XOF,
    EUR,
    USD,
}

impl CurrencyCode {
    /// Label shown next to amounts.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::XOF => "FCFA",
            Self::EUR => "EUR",
            Self::USD => "USD",
        }
    }
}

/// Default `prix_texte` for a bare price: `"<prix> FCFA"`.
#[must_use]
pub fn price_label(prix: Decimal) -> String {
    Price::fcfa(prix).label()
}

/// Parse a decimal out of a JSON number or a numeric string.
fn parse_decimal_str<E: de::Error>(value: &str) -> Result<Decimal, E> {
    let trimmed = value.trim();
    trimmed
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| E::custom(format!("invalid price: {value}")))
}

struct DecimalVisitor;

impl Visitor<'_> for DecimalVisitor {
    type Value = Decimal;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or a numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
        Ok(Decimal::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
        Ok(Decimal::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Decimal, E> {
        if !v.is_finite() {
            return Err(E::custom(format!("invalid price: {v}")));
        }
        parse_decimal_str(&v.to_string())
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
        parse_decimal_str(v)
    }
}

/// Serialize a [`Decimal`] as a JSON number; accept numbers or numeric strings.
pub mod decimal_number {
    use super::{Decimal, DecimalVisitor, Deserializer, Serializer, ToPrimitive};

    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        let normalized = value.normalize();
        if normalized.scale() == 0
            && let Some(whole) = normalized.to_i64()
        {
            return serializer.serialize_i64(whole);
        }
        serializer.serialize_f64(normalized.to_f64().unwrap_or_default())
    }

    /// # Errors
    ///
    /// Fails on non-numeric input.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        deserializer.deserialize_any(DecimalVisitor)
    }
}

/// Optional variant of [`decimal_number`]; `null`, missing and `""` become `None`.
pub mod opt_decimal_number {
    use core::fmt;

    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;

    use super::{Decimal, DecimalVisitor};

    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(
        value: &Option<Decimal>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(amount) => super::decimal_number::serialize(amount, serializer),
            None => serializer.serialize_none(),
        }
    }

    struct OptVisitor;

    impl<'de> Visitor<'de> for OptVisitor {
        type Value = Option<Decimal>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number, a numeric string or null")
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(self)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            DecimalVisitor.visit_i64(v).map(Some)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            DecimalVisitor.visit_u64(v).map(Some)
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            DecimalVisitor.visit_f64(v).map(Some)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            if v.trim().is_empty() {
                return Ok(None);
            }
            DecimalVisitor.visit_str(v).map(Some)
        }
    }

    /// # Errors
    ///
    /// Fails on non-numeric input.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Decimal>, D::Error> {
        deserializer.deserialize_option(OptVisitor)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "decimal_number")]
        prix: Decimal,
        #[serde(default, with = "opt_decimal_number")]
        remise: Option<Decimal>,
    }

    #[test]
    fn test_label_drops_trailing_zeros() {
        assert_eq!(price_label(Decimal::new(1_500_000, 2)), "15000 FCFA");
        assert_eq!(price_label(Decimal::ZERO), "0 FCFA");
        assert_eq!(price_label(Decimal::new(995, 1)), "99.5 FCFA");
    }

    #[test]
    fn test_whole_amounts_serialize_as_integers() {
        let w = Wrapper {
            prix: Decimal::new(1_500_000, 2),
            remise: None,
        };
        assert_eq!(
            serde_json::to_value(&w).unwrap(),
            json!({"prix": 15000, "remise": null})
        );
    }

    #[test]
    fn test_fractional_amounts_serialize_as_floats() {
        let w = Wrapper {
            prix: Decimal::new(125, 1),
            remise: Some(Decimal::new(5, 0)),
        };
        assert_eq!(
            serde_json::to_value(&w).unwrap(),
            json!({"prix": 12.5, "remise": 5})
        );
    }

    #[test]
    fn test_accepts_numbers_and_strings() {
        let w: Wrapper = serde_json::from_value(json!({"prix": "2500", "remise": ""})).unwrap();
        assert_eq!(w.prix, Decimal::from(2500));
        assert_eq!(w.remise, None);

        let w: Wrapper = serde_json::from_value(json!({"prix": 19.99})).unwrap();
        assert_eq!(w.prix, Decimal::new(1999, 2));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(serde_json::from_value::<Wrapper>(json!({"prix": "cher"})).is_err());
    }
}
