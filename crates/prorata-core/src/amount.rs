//! Lenient coercion of user-entered amounts and flags.
//!
//! Table cells arrive as numbers, free text ("$1,250,000", "12_500"),
//! empty strings or nulls. Anything that does not parse is treated as zero
//! (or `false` for flags). Coercion never fails.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;

use crate::types::Money;

/// Parse free text into an amount. Invalid text yields zero.
pub fn parse_amount(text: &str) -> Money {
    parse_amount_opt(text).unwrap_or(Decimal::ZERO)
}

/// Parse free text into an amount, returning `None` for blank or invalid
/// text. Currency symbols, thousands separators and whitespace are ignored.
pub fn parse_amount_opt(text: &str) -> Option<Money> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '_' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// Parse a participation toggle. Accepts true/false, yes/no, on/off, y/n
/// and 1/0 in any case; anything else is `false`.
pub fn parse_flag(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "on" | "1"
    )
}

/// Coerce an arbitrary JSON value into an amount.
pub fn amount_from_value(value: &Value) -> Option<Money> {
    match value {
        Value::Number(n) => parse_amount_opt(&n.to_string()),
        Value::String(s) => parse_amount_opt(s),
        _ => None,
    }
}

/// Sum `values`, or `None` if the total does not fit in a `Decimal`.
pub fn checked_sum<I>(values: I) -> Option<Money>
where
    I: IntoIterator<Item = Money>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}

/// Sum `values`, clamping at the `Decimal` bounds instead of panicking.
pub fn saturating_sum<I>(values: I) -> Money
where
    I: IntoIterator<Item = Money>,
{
    values
        .into_iter()
        .fold(Decimal::ZERO, |acc, v| acc.saturating_add(v))
}

fn flag_from_value(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => parse_flag(s),
        _ => false,
    }
}

/// `deserialize_with` helper: any value -> amount, zero on bad input.
pub fn lenient_money<'de, D>(deserializer: D) -> Result<Money, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(amount_from_value)
        .unwrap_or(Decimal::ZERO))
}

/// `deserialize_with` helper for optional amounts: blank or bad input -> `None`.
pub fn lenient_optional_money<'de, D>(deserializer: D) -> Result<Option<Money>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(amount_from_value))
}

/// `deserialize_with` helper for optional descriptive text. Numbers and
/// booleans are kept as their text form; blanks become `None`.
pub fn lenient_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// `deserialize_with` helper for toggles.
pub fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().map(flag_from_value).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "lenient_money")]
        cash: Money,
        #[serde(default, deserialize_with = "lenient_optional_money")]
        target: Option<Money>,
        #[serde(default, deserialize_with = "lenient_flag")]
        on: bool,
    }

    #[test]
    fn test_parse_plain_and_formatted_amounts() {
        assert_eq!(parse_amount("1250000"), dec!(1250000));
        assert_eq!(parse_amount(" $1,250,000.50 "), dec!(1250000.50));
        assert_eq!(parse_amount("12_500"), dec!(12500));
        assert_eq!(parse_amount("5e6"), dec!(5000000));
    }

    #[test]
    fn test_invalid_text_is_zero() {
        assert_eq!(parse_amount("abc"), Decimal::ZERO);
        assert_eq!(parse_amount(""), Decimal::ZERO);
        assert_eq!(parse_amount("1.2.3"), Decimal::ZERO);
        assert!(parse_amount_opt("n/a").is_none());
    }

    #[test]
    fn test_parse_flag_variants() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("yes"));
        assert!(parse_flag("On"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("no"));
        assert!(!parse_flag(""));
        assert!(!parse_flag("maybe"));
    }

    #[test]
    fn test_deserialize_numbers_strings_and_nulls() {
        let row: Row =
            serde_json::from_str(r#"{"cash": "$2,000", "target": 150, "on": "yes"}"#).unwrap();
        assert_eq!(row.cash, dec!(2000));
        assert_eq!(row.target, Some(dec!(150)));
        assert!(row.on);

        let row: Row = serde_json::from_str(r#"{"cash": null, "target": "", "on": 0}"#).unwrap();
        assert_eq!(row.cash, Decimal::ZERO);
        assert_eq!(row.target, None);
        assert!(!row.on);
    }

    #[test]
    fn test_missing_fields_default() {
        let row: Row = serde_json::from_str("{}").unwrap();
        assert_eq!(row.cash, Decimal::ZERO);
        assert_eq!(row.target, None);
        assert!(!row.on);
    }

    #[test]
    fn test_non_scalar_values_coerce_to_zero() {
        let row: Row = serde_json::from_str(r#"{"cash": [1, 2], "on": {"x": 1}}"#).unwrap();
        assert_eq!(row.cash, Decimal::ZERO);
        assert!(!row.on);
    }

    #[test]
    fn test_checked_sum_reports_overflow() {
        assert_eq!(checked_sum(vec![dec!(1), dec!(2.5)]), Some(dec!(3.5)));
        assert_eq!(checked_sum(Vec::new()), Some(Decimal::ZERO));
        assert_eq!(checked_sum(vec![Decimal::MAX, Decimal::ONE]), None);
        assert_eq!(saturating_sum(vec![Decimal::MAX, Decimal::ONE]), Decimal::MAX);
    }

    #[test]
    fn test_optional_text_keeps_scalars() {
        #[derive(Deserialize)]
        struct Rated {
            #[serde(default, deserialize_with = "lenient_optional_text")]
            rating: Option<String>,
        }
        let r: Rated = serde_json::from_str(r#"{"rating": " B+ "}"#).unwrap();
        assert_eq!(r.rating.as_deref(), Some("B+"));
        let r: Rated = serde_json::from_str(r#"{"rating": 3}"#).unwrap();
        assert_eq!(r.rating.as_deref(), Some("3"));
        let r: Rated = serde_json::from_str(r#"{"rating": ""}"#).unwrap();
        assert_eq!(r.rating, None);
    }
}
