//! Vehicle availability.
//!
//! Availability = cash + unfunded commitments + uncalled capital. It is the
//! proration weight for every facility, and a vehicle participates in any
//! allocation only while its availability is strictly positive.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::amount::{lenient_flag, lenient_money, lenient_optional_money};
use crate::types::Money;

/// A fund vehicle as entered in the vehicles table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Vehicle / fund name. Identity within a run.
    pub name: String,
    /// Cash on hand.
    #[serde(default, deserialize_with = "lenient_money")]
    pub cash: Money,
    /// Commitments made to the vehicle but not yet funded.
    #[serde(default, deserialize_with = "lenient_money")]
    pub unfunded_commitments: Money,
    /// Capital the vehicle may still call from investors.
    #[serde(default, deserialize_with = "lenient_money")]
    pub uncalled_capital: Money,
    /// Opt-in to Revolver allocations.
    #[serde(default, deserialize_with = "lenient_flag")]
    pub revolver_on: bool,
    /// Opt-in to Delayed-Draw Term Loan allocations.
    #[serde(default, deserialize_with = "lenient_flag")]
    pub ddtl_on: bool,
    /// Reference hold used only for the utilisation column of the report.
    #[serde(
        default,
        deserialize_with = "lenient_optional_money",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_hold: Option<Money>,
}

impl Vehicle {
    pub fn availability(&self) -> Money {
        availability(self.cash, self.uncalled_capital, self.unfunded_commitments)
    }

    /// Availability, or `None` when the sum does not fit in a `Decimal`.
    pub fn checked_availability(&self) -> Option<Money> {
        self.cash
            .checked_add(self.uncalled_capital)?
            .checked_add(self.unfunded_commitments)
    }

    /// True when the vehicle can receive anything at all.
    pub fn has_availability(&self) -> bool {
        self.availability() > Decimal::ZERO
    }
}

/// Sum of the three capacity sources. Saturates at `Decimal::MAX`; the
/// allocators reject such rows before prorating.
pub fn availability(cash: Money, uncalled_capital: Money, unfunded_commitments: Money) -> Money {
    cash.saturating_add(uncalled_capital)
        .saturating_add(unfunded_commitments)
}

/// One row of the availability table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRow {
    pub vehicle: String,
    pub cash: Money,
    pub unfunded_commitments: Money,
    pub uncalled_capital: Money,
    pub availability: Money,
    /// Whether availability is strictly positive.
    pub eligible: bool,
}

/// Availability table for a set of vehicles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySummary {
    pub rows: Vec<AvailabilityRow>,
    /// Sum of positive availabilities; the Term Loan proration base.
    pub total_availability: Money,
    pub eligible_vehicles: usize,
}

/// Build the availability table.
pub fn availability_summary(vehicles: &[Vehicle]) -> AvailabilitySummary {
    let rows: Vec<AvailabilityRow> = vehicles
        .iter()
        .map(|v| {
            let availability = v.availability();
            AvailabilityRow {
                vehicle: v.name.clone(),
                cash: v.cash,
                unfunded_commitments: v.unfunded_commitments,
                uncalled_capital: v.uncalled_capital,
                availability,
                eligible: availability > Decimal::ZERO,
            }
        })
        .collect();

    let total_availability = rows
        .iter()
        .filter(|r| r.eligible)
        .fold(Decimal::ZERO, |acc, r| acc.saturating_add(r.availability));
    let eligible_vehicles = rows.iter().filter(|r| r.eligible).count();

    AvailabilitySummary {
        rows,
        total_availability,
        eligible_vehicles,
    }
}
