use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use super::eligibility::Facility;
use crate::amount::{
    lenient_flag, lenient_money, lenient_optional_money, lenient_optional_text, saturating_sum,
};
use crate::types::{Money, Multiple};

/// New money or an amendment to an existing credit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DealType {
    #[default]
    NewDeal,
    Amendment,
}

impl DealType {
    /// Read a free-text label ("New Deal", "amendment", "NewDeal").
    /// Anything that is not an amendment is a new deal.
    pub fn from_label(text: &str) -> Self {
        let key: String = text
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "amendment" | "amend" | "amendments" => DealType::Amendment,
            _ => DealType::NewDeal,
        }
    }
}

impl fmt::Display for DealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DealType::NewDeal => write!(f, "New Deal"),
            DealType::Amendment => write!(f, "Amendment"),
        }
    }
}

fn lenient_deal_type<'de, D>(deserializer: D) -> Result<DealType, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_str)
        .map(DealType::from_label)
        .unwrap_or_default())
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(Value::as_str).and_then(|s| {
        let s = s.trim();
        ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"]
            .iter()
            .find_map(|pattern| NaiveDate::parse_from_str(s, pattern).ok())
    }))
}

/// A deal row. Facility sizes feed the allocator; everything else is
/// descriptive and passed through to the report untouched. Descriptive
/// cells never fail a run: unreadable values become blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_money")]
    pub term_loan: Money,
    #[serde(default, deserialize_with = "lenient_money")]
    pub revolver: Money,
    #[serde(default, deserialize_with = "lenient_money")]
    pub ddtl: Money,

    #[serde(
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub est_closing_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_deal_type")]
    pub deal_type: DealType,
    #[serde(
        default,
        deserialize_with = "lenient_optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub transaction_type: Option<String>,
    /// EBITDA in $mm.
    #[serde(
        default,
        deserialize_with = "lenient_optional_money",
        skip_serializing_if = "Option::is_none"
    )]
    pub ebitda: Option<Decimal>,
    #[serde(
        default,
        deserialize_with = "lenient_optional_money",
        skip_serializing_if = "Option::is_none"
    )]
    pub senior_net_leverage: Option<Multiple>,
    #[serde(
        default,
        deserialize_with = "lenient_optional_money",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_leverage: Option<Multiple>,
    #[serde(
        default,
        deserialize_with = "lenient_optional_money",
        skip_serializing_if = "Option::is_none"
    )]
    pub opening_spread_bps: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub covenant_lite: bool,
    #[serde(
        default,
        deserialize_with = "lenient_optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub internal_rating: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub sp_rating: Option<String>,
    /// Hold approved by the investment committee.
    #[serde(
        default,
        deserialize_with = "lenient_optional_money",
        skip_serializing_if = "Option::is_none"
    )]
    pub ic_approved_hold: Option<Money>,
    #[serde(
        default,
        deserialize_with = "lenient_optional_money",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_hold: Option<Money>,
}

impl Deal {
    /// A deal with only facility sizes set.
    pub fn new(name: impl Into<String>, term_loan: Money, revolver: Money, ddtl: Money) -> Self {
        Self {
            name: name.into(),
            term_loan,
            revolver,
            ddtl,
            est_closing_date: None,
            deal_type: DealType::NewDeal,
            transaction_type: None,
            ebitda: None,
            senior_net_leverage: None,
            total_leverage: None,
            opening_spread_bps: None,
            covenant_lite: false,
            internal_rating: None,
            sp_rating: None,
            ic_approved_hold: None,
            target_hold: None,
        }
    }

    pub fn facility_size(&self, facility: Facility) -> Money {
        match facility {
            Facility::TermLoan => self.term_loan,
            Facility::Revolver => self.revolver,
            Facility::Ddtl => self.ddtl,
        }
    }

    /// Sum of the three facility sizes.
    pub fn total_size(&self) -> Money {
        saturating_sum(Facility::ALL.map(|f| self.facility_size(f)))
    }
}
