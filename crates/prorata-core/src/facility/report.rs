//! Per-deal report tables.
//!
//! Everything here is derived from finished prorations: the facility x
//! vehicle matrix with its totals row, the consistency check of allocated
//! vs. stated facility sizes, and the pro-rata summary per vehicle.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::availability::Vehicle;
use super::deal::Deal;
use super::eligibility::Facility;
use crate::amount::saturating_sum;
use crate::proration::Share;
use crate::types::{Money, Rate};

/// One facility of one deal, split across vehicles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityAllocation {
    pub facility: Facility,
    /// Stated facility size.
    pub size: Money,
    pub eligible_vehicles: usize,
    /// One share per vehicle, in vehicle order.
    pub shares: Vec<Share>,
    pub allocated: Money,
    /// Size left unallocated because no vehicle was eligible.
    pub undistributed: Money,
}

impl FacilityAllocation {
    pub fn amount_for(&self, vehicle: &str) -> Money {
        self.shares
            .iter()
            .find(|s| s.name == vehicle)
            .map(|s| s.amount)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Stated size vs. sum of allocations for one facility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyCheck {
    pub facility: Facility,
    pub stated_size: Money,
    pub allocated: Money,
    /// `stated_size - allocated`.
    pub difference: Money,
    pub within_tolerance: bool,
}

/// Per-vehicle line of the pro-rata summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProRataRow {
    pub vehicle: String,
    pub allocated: Money,
    /// Share of the whole deal; `None` when the deal size is zero.
    pub pct_of_deal: Option<Rate>,
    /// Allocation over the vehicle's target hold; `None` when the target
    /// is zero or absent.
    pub pct_of_target_hold: Option<Rate>,
}

/// Full result for one deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealAllocation {
    /// The deal row, descriptive metrics included.
    pub deal: Deal,
    pub facilities: Vec<FacilityAllocation>,
    /// Totals row: per-vehicle sum across facilities.
    pub totals: Vec<Share>,
    pub total_allocated: Money,
    pub consistency: Vec<ConsistencyCheck>,
    pub pro_rata: Vec<ProRataRow>,
    /// Total allocated over the IC approved hold.
    pub approved_hold_utilization: Option<Rate>,
    /// Total allocated over the deal-level target hold.
    pub target_hold_utilization: Option<Rate>,
}

/// `amount / base`, or `None` when the base is missing or not positive.
pub fn pct_of(amount: Money, base: Option<Money>) -> Option<Rate> {
    match base {
        Some(b) if b > Decimal::ZERO => Some(amount / b),
        _ => None,
    }
}

/// Totals row of the facility matrix.
pub fn vehicle_totals(vehicles: &[Vehicle], facilities: &[FacilityAllocation]) -> Vec<Share> {
    vehicles
        .iter()
        .map(|v| Share {
            name: v.name.clone(),
            amount: saturating_sum(facilities.iter().map(|f| f.amount_for(&v.name))),
        })
        .collect()
}

/// Compare allocated and stated sizes. A facility with nobody eligible
/// shows its full size as the difference.
pub fn consistency_checks(
    facilities: &[FacilityAllocation],
    tolerance: Money,
) -> Vec<ConsistencyCheck> {
    facilities
        .iter()
        .map(|f| {
            let difference = f.size - f.allocated;
            ConsistencyCheck {
                facility: f.facility,
                stated_size: f.size,
                allocated: f.allocated,
                difference,
                within_tolerance: difference.abs() <= tolerance,
            }
        })
        .collect()
}

pub fn pro_rata_summary(vehicles: &[Vehicle], totals: &[Share], deal_size: Money) -> Vec<ProRataRow> {
    vehicles
        .iter()
        .zip(totals)
        .map(|(v, t)| ProRataRow {
            vehicle: v.name.clone(),
            allocated: t.amount,
            pct_of_deal: pct_of(t.amount, Some(deal_size)),
            pct_of_target_hold: pct_of(t.amount, v.target_hold),
        })
        .collect()
}

/// Assemble the report for one deal from its facility allocations.
pub fn build_deal_report(
    deal: &Deal,
    vehicles: &[Vehicle],
    facilities: Vec<FacilityAllocation>,
    tolerance: Money,
) -> DealAllocation {
    let totals = vehicle_totals(vehicles, &facilities);
    let total_allocated = saturating_sum(totals.iter().map(|s| s.amount));
    let consistency = consistency_checks(&facilities, tolerance);
    let pro_rata = pro_rata_summary(vehicles, &totals, deal.total_size());

    DealAllocation {
        deal: deal.clone(),
        approved_hold_utilization: pct_of(total_allocated, deal.ic_approved_hold),
        target_hold_utilization: pct_of(total_allocated, deal.target_hold),
        facilities,
        totals,
        total_allocated,
        consistency,
        pro_rata,
    }
}
