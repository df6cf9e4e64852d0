//! Display formatting for report cells.
//!
//! Each helper formats a single cell and falls back to a safe default on
//! missing or unparseable input so one bad value never blocks a table.

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

use crate::amount::amount_from_value;
use crate::types::{Money, Rate};

/// Format an amount as whole dollars with thousands separators.
/// `None` renders as `"$0"`.
pub fn format_money(amount: Option<Money>) -> String {
    let Some(amount) = amount else {
        return "$0".to_string();
    };
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();
    let grouped = group_thousands(&digits);
    if rounded < Decimal::ZERO {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

/// Format a rate (0.125) as a percentage ("12.50%"). `None` renders blank.
pub fn format_pct(rate: Option<Rate>) -> String {
    match rate {
        Some(r) => format!("{:.2}%", r * Decimal::ONE_HUNDRED),
        None => String::new(),
    }
}

/// Format a serialized amount cell. Anything that is not a number or a
/// numeric string renders as `"$0"`.
pub fn format_money_value(value: &Value) -> String {
    format_money(amount_from_value(value))
}

/// Format a serialized rate cell; null or bad input renders blank.
pub fn format_pct_value(value: &Value) -> String {
    format_pct(amount_from_value(value))
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
