//! Flexible parsing for loosely-typed caller inputs
//!
//! The HTTP layer hands the engine field sets where monetary values arrive
//! as either JSON numbers or decimal strings, and dates arrive as ISO
//! strings. These helpers normalize both at the deserialization boundary so
//! the core only ever sees `Decimal` and `NaiveDate`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

use crate::error::CoreError;

/// Parses an ISO 8601 date, accepting either a plain date (`2024-03-01`)
/// or a full RFC 3339 timestamp (`2024-03-01T12:00:00Z`).
pub fn parse_iso_date(input: &str) -> Result<NaiveDate, CoreError> {
    if let Ok(date) = NaiveDate::from_str(input) {
        return Ok(date);
    }
    chrono::DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.date_naive())
        .map_err(|_| CoreError::parse(format!("invalid ISO date: '{input}'")))
}

/// Parses a decimal from a string, rejecting malformed numbers.
pub fn parse_decimal(input: &str) -> Result<Decimal, CoreError> {
    Decimal::from_str(input.trim())
        .map_err(|_| CoreError::parse(format!("invalid decimal: '{input}'")))
}

/// Serde helper: deserializes a `Decimal` from a JSON number or string.
///
/// Use as `#[serde(deserialize_with = "core_kernel::parse::flexible_decimal")]`.
pub fn flexible_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Decimal::try_from(n)
            .map_err(|_| serde::de::Error::custom(format!("decimal out of range: {n}"))),
        NumberOrString::String(s) => Decimal::from_str(s.trim())
            .map_err(|_| serde::de::Error::custom(format!("invalid decimal: '{s}'"))),
    }
}

/// Serde helper: like [`flexible_decimal`] but tolerates an absent or null field.
pub fn flexible_decimal_opt<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "flexible_decimal")] Decimal);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|w| w.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Payload {
        #[serde(deserialize_with = "flexible_decimal")]
        amount: Decimal,
        #[serde(default, deserialize_with = "flexible_decimal_opt")]
        discount: Option<Decimal>,
    }

    #[test]
    fn test_parse_iso_date_plain() {
        let d = parse_iso_date("2024-03-01").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_parse_iso_date_timestamp() {
        let d = parse_iso_date("2024-03-01T15:30:00Z").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_parse_iso_date_invalid() {
        assert!(parse_iso_date("March 1st").is_err());
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal(" 12.50 ").unwrap(), dec!(12.50));
        assert!(parse_decimal("12,50").is_err());
    }

    #[test]
    fn test_flexible_decimal_from_number() {
        let p: Payload = serde_json::from_str(r#"{"amount": 99.95}"#).unwrap();
        assert_eq!(p.amount, dec!(99.95));
        assert!(p.discount.is_none());
    }

    #[test]
    fn test_flexible_decimal_from_string() {
        let p: Payload = serde_json::from_str(r#"{"amount": "99.95", "discount": "5"}"#).unwrap();
        assert_eq!(p.amount, dec!(99.95));
        assert_eq!(p.discount, Some(dec!(5)));
    }

    #[test]
    fn test_flexible_decimal_malformed() {
        let result: Result<Payload, _> = serde_json::from_str(r#"{"amount": "ninety"}"#);
        assert!(result.is_err());
    }
}
