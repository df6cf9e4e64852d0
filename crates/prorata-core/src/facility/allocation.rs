//! Availability-based facility allocation.
//!
//! For every deal, each facility (Term Loan, Revolver, DDTL) is prorated
//! across the vehicles eligible for it, weighted by availability. Deals are
//! independent of each other: every deal sees the full availability of
//! every vehicle.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, warn};

use super::availability::{availability_summary, AvailabilitySummary, Vehicle};
use super::deal::Deal;
use super::eligibility::{facility_weights, Facility};
use super::report::{build_deal_report, DealAllocation, FacilityAllocation};
use crate::amount::{checked_sum, saturating_sum};
use crate::error::AllocationError;
use crate::proration::prorate;
use crate::types::*;
use crate::AllocationResult;

fn default_tolerance() -> Money {
    dec!(0.000001)
}

/// Run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationSettings {
    /// Largest |stated - allocated| accepted by the consistency check.
    #[serde(default = "default_tolerance")]
    pub consistency_tolerance: Money,
}

impl Default for AllocationSettings {
    fn default() -> Self {
        Self {
            consistency_tolerance: default_tolerance(),
        }
    }
}

/// Deals and vehicles tables for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityAllocationInput {
    pub deals: Vec<Deal>,
    pub vehicles: Vec<Vehicle>,
    #[serde(default)]
    pub settings: AllocationSettings,
}

/// Output of a facility allocation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityAllocationOutput {
    pub availability: AvailabilitySummary,
    pub deals: Vec<DealAllocation>,
    /// Sum of every deal's total allocation.
    pub grand_total: Money,
}

/// Allocate every deal's facilities across the vehicles.
///
/// Fails before computing anything when the tables are invalid or when no
/// vehicle has positive availability; no partial results are produced.
pub fn allocate_facilities(
    input: &FacilityAllocationInput,
) -> AllocationResult<ComputationOutput<FacilityAllocationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;

    let availability = availability_summary(&input.vehicles);
    if availability.eligible_vehicles == 0 {
        return Err(AllocationError::NoAvailability(
            "Total availability is zero; no vehicle can receive an allocation.".into(),
        ));
    }
    debug!(
        vehicles = input.vehicles.len(),
        eligible = availability.eligible_vehicles,
        total_availability = %availability.total_availability,
        "computed availability"
    );

    let mut deals = Vec::with_capacity(input.deals.len());
    for deal in &input.deals {
        let result = allocate_deal(deal, &input.vehicles, &input.settings);

        for f in &result.facilities {
            if f.undistributed > Decimal::ZERO {
                warn!(deal = %deal.name, facility = %f.facility, size = %f.size, "facility not distributed");
                warnings.push(format!(
                    "Deal '{}': {} of {} not allocated, no eligible vehicle.",
                    deal.name, f.facility, f.size
                ));
            }
        }
        for c in &result.consistency {
            if !c.within_tolerance && c.allocated > Decimal::ZERO {
                warnings.push(format!(
                    "Deal '{}': {} allocations differ from stated size by {}.",
                    deal.name, c.facility, c.difference
                ));
            }
        }
        deals.push(result);
    }

    let grand_total = saturating_sum(deals.iter().map(|d| d.total_allocated));
    let output = FacilityAllocationOutput {
        availability,
        deals,
        grand_total,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Availability-weighted pro-rata facility allocation",
        &serde_json::json!({
            "weight": "cash + unfunded commitments + uncalled capital",
            "term_loan_eligibility": "availability > 0",
            "revolver_eligibility": "availability > 0 and revolver_on",
            "ddtl_eligibility": "availability > 0 and ddtl_on",
            "consistency_tolerance": input.settings.consistency_tolerance.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Allocate a single deal. Does no validation.
pub fn allocate_deal(deal: &Deal, vehicles: &[Vehicle], settings: &AllocationSettings) -> DealAllocation {
    let facilities: Vec<FacilityAllocation> = Facility::ALL
        .iter()
        .map(|&facility| {
            let size = deal.facility_size(facility);
            let weights = facility_weights(vehicles, facility);
            let eligible_vehicles = weights.iter().filter(|(_, w)| *w > Decimal::ZERO).count();
            let proration = prorate(size, &weights);
            debug!(
                deal = %deal.name,
                facility = %facility,
                size = %size,
                eligible = eligible_vehicles,
                "prorated facility"
            );
            FacilityAllocation {
                facility,
                size,
                eligible_vehicles,
                shares: proration.shares,
                allocated: proration.allocated,
                undistributed: proration.undistributed,
            }
        })
        .collect();

    build_deal_report(deal, vehicles, facilities, settings.consistency_tolerance)
}

fn validate_input(input: &FacilityAllocationInput) -> AllocationResult<()> {
    if input.vehicles.is_empty() {
        return Err(AllocationError::InsufficientData(
            "At least one vehicle is required.".into(),
        ));
    }
    if input.deals.is_empty() {
        return Err(AllocationError::InsufficientData(
            "At least one deal is required.".into(),
        ));
    }

    let mut seen = HashSet::new();
    let mut positive_availability = Vec::with_capacity(input.vehicles.len());
    for v in &input.vehicles {
        if v.name.trim().is_empty() {
            return Err(AllocationError::InvalidInput {
                field: "vehicles.name".into(),
                reason: "Vehicle name must not be blank.".into(),
            });
        }
        if !seen.insert(v.name.as_str()) {
            return Err(AllocationError::InvalidInput {
                field: "vehicles.name".into(),
                reason: format!("Duplicate vehicle '{}'.", v.name),
            });
        }
        match v.checked_availability() {
            Some(a) if a > Decimal::ZERO => positive_availability.push(a),
            Some(_) => {}
            None => {
                return Err(AllocationError::InvalidInput {
                    field: "vehicles".into(),
                    reason: format!("Availability of vehicle '{}' is too large.", v.name),
                })
            }
        }
    }
    if checked_sum(positive_availability).is_none() {
        return Err(AllocationError::InvalidInput {
            field: "vehicles".into(),
            reason: "Total availability is too large.".into(),
        });
    }

    for deal in &input.deals {
        for facility in Facility::ALL {
            if deal.facility_size(facility) < Decimal::ZERO {
                return Err(AllocationError::InvalidInput {
                    field: format!("deals.{}", facility.label()),
                    reason: format!("{} size cannot be negative for deal '{}'.", facility, deal.name),
                });
            }
        }
    }
    let all_sizes = input
        .deals
        .iter()
        .flat_map(|deal| Facility::ALL.map(|f| deal.facility_size(f)));
    if checked_sum(all_sizes).is_none() {
        return Err(AllocationError::InvalidInput {
            field: "deals".into(),
            reason: "Total of all facility sizes is too large.".into(),
        });
    }

    if input.settings.consistency_tolerance < Decimal::ZERO {
        return Err(AllocationError::InvalidInput {
            field: "settings.consistency_tolerance".into(),
            reason: "Tolerance cannot be negative.".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle(name: &str, cash: Decimal, revolver_on: bool, ddtl_on: bool) -> Vehicle {
        Vehicle {
            name: name.into(),
            cash,
            unfunded_commitments: Decimal::ZERO,
            uncalled_capital: Decimal::ZERO,
            revolver_on,
            ddtl_on,
            target_hold: None,
        }
    }

    fn make_base_input() -> FacilityAllocationInput {
        FacilityAllocationInput {
            deals: vec![Deal::new("Deal 1", dec!(100), dec!(50), dec!(20))],
            vehicles: vec![
                vehicle("A", dec!(10), false, true),
                vehicle("B", dec!(30), true, true),
            ],
            settings: AllocationSettings::default(),
        }
    }

    #[test]
    fn test_term_loan_split_by_availability() {
        let out = allocate_facilities(&make_base_input()).unwrap();
        let tl = &out.result.deals[0].facilities[0];
        assert_eq!(tl.facility, Facility::TermLoan);
        assert_eq!(tl.amount_for("A"), dec!(25));
        assert_eq!(tl.amount_for("B"), dec!(75));
    }

    #[test]
    fn test_revolver_respects_toggle() {
        let out = allocate_facilities(&make_base_input()).unwrap();
        let rev = &out.result.deals[0].facilities[1];
        assert_eq!(rev.amount_for("A"), Decimal::ZERO);
        assert_eq!(rev.amount_for("B"), dec!(50));
        assert_eq!(rev.eligible_vehicles, 1);
    }

    #[test]
    fn test_totals_and_grand_total() {
        let out = allocate_facilities(&make_base_input()).unwrap();
        let deal = &out.result.deals[0];
        // A: 25 TL + 0 REV + 5 DDTL; B: 75 + 50 + 15
        assert_eq!(deal.totals[0].amount, dec!(30));
        assert_eq!(deal.totals[1].amount, dec!(140));
        assert_eq!(deal.total_allocated, dec!(170));
        assert_eq!(out.result.grand_total, dec!(170));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_no_availability_is_blocking() {
        let mut input = make_base_input();
        for v in &mut input.vehicles {
            v.cash = Decimal::ZERO;
        }
        match allocate_facilities(&input) {
            Err(AllocationError::NoAvailability(_)) => {}
            other => panic!("expected NoAvailability, got {other:?}"),
        }
    }

    #[test]
    fn test_undistributed_facility_warns() {
        let mut input = make_base_input();
        input.vehicles[1].revolver_on = false;
        let out = allocate_facilities(&input).unwrap();
        let rev = &out.result.deals[0].facilities[1];
        assert_eq!(rev.allocated, Decimal::ZERO);
        assert_eq!(rev.undistributed, dec!(50));
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].contains("Revolver"));
    }

    #[test]
    fn test_zero_facility_is_all_zero_without_warning() {
        let mut input = make_base_input();
        input.deals[0].ddtl = Decimal::ZERO;
        let out = allocate_facilities(&input).unwrap();
        let ddtl = &out.result.deals[0].facilities[2];
        assert!(ddtl.shares.iter().all(|s| s.amount.is_zero()));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_reject_empty_vehicles() {
        let mut input = make_base_input();
        input.vehicles.clear();
        assert!(matches!(
            allocate_facilities(&input),
            Err(AllocationError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_reject_empty_deals() {
        let mut input = make_base_input();
        input.deals.clear();
        assert!(allocate_facilities(&input).is_err());
    }

    #[test]
    fn test_reject_negative_facility_size() {
        let mut input = make_base_input();
        input.deals[0].revolver = dec!(-1);
        assert!(matches!(
            allocate_facilities(&input),
            Err(AllocationError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_reject_duplicate_vehicle_names() {
        let mut input = make_base_input();
        input.vehicles[1].name = "A".into();
        assert!(allocate_facilities(&input).is_err());
    }

    #[test]
    fn test_reject_negative_tolerance() {
        let mut input = make_base_input();
        input.settings.consistency_tolerance = dec!(-0.1);
        assert!(allocate_facilities(&input).is_err());
    }

    #[test]
    fn test_reject_overflowing_availability() {
        let input: FacilityAllocationInput = serde_json::from_str(
            r#"{
                "deals": [{"name": "D", "term_loan": 100}],
                "vehicles": [{
                    "name": "Huge",
                    "cash": "79228162514264337593543950335",
                    "uncalled_capital": "79228162514264337593543950335"
                }]
            }"#,
        )
        .unwrap();
        match allocate_facilities(&input) {
            Err(AllocationError::InvalidInput { field, .. }) => assert_eq!(field, "vehicles"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_reject_overflowing_total_availability() {
        let mut input = make_base_input();
        input.vehicles[0].cash = Decimal::MAX;
        input.vehicles[1].cash = Decimal::MAX;
        assert!(matches!(
            allocate_facilities(&input),
            Err(AllocationError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_reject_overflowing_facility_sizes() {
        let mut input = make_base_input();
        input.deals[0].term_loan = Decimal::MAX;
        input.deals[0].revolver = Decimal::MAX;
        match allocate_facilities(&input) {
            Err(AllocationError::InvalidInput { field, .. }) => assert_eq!(field, "deals"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_settings_default_when_missing() {
        let input: FacilityAllocationInput = serde_json::from_str(
            r#"{"deals": [{"name": "D", "term_loan": 10}], "vehicles": [{"name": "A", "cash": 5}]}"#,
        )
        .unwrap();
        assert_eq!(input.settings.consistency_tolerance, dec!(0.000001));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let out = allocate_facilities(&make_base_input()).unwrap();
        let json = serde_json::to_string(&out).unwrap();
        let _: ComputationOutput<FacilityAllocationOutput> = serde_json::from_str(&json).unwrap();
    }
}
