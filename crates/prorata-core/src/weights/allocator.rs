//! Weight-based portfolio allocation.
//!
//! 1. Enabled vehicle capacities are scaled so they sum to the total
//!    portfolio value (a new value per vehicle; inputs are untouched).
//! 2. Each vehicle's scaled capacity is split across the asset classes it
//!    may hold, pro-rata to the target weights.
//! 3. Constraint rules run in order.
//! 4. Every row is rescaled back to its scaled capacity.
//!
//! Step 4 runs after the rules and can undo part of their effect. The
//! rule-only matrix is returned as `after_rules` for inspection, but
//! `allocation` (post-rescale) is the result.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use tracing::{debug, warn};

use super::model::{asset_total, row_sum, AllocationMatrix, AssetClass, PortfolioVehicle};
use super::rules::{apply_rules, rescale_to_capacity, AllocationRule, RuleContext, RuleDefinition};
use crate::amount::{checked_sum, lenient_money, saturating_sum};
use crate::error::AllocationError;
use crate::proration::{prorate, Proration, Share};
use crate::types::*;
use crate::AllocationResult;

/// Input for the weight-based allocator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioAllocationInput {
    #[serde(deserialize_with = "lenient_money")]
    pub total_portfolio_value: Money,
    pub asset_classes: Vec<AssetClass>,
    /// Target weight per asset class. Missing entries weigh zero.
    pub target_weights: BTreeMap<String, Rate>,
    pub vehicles: Vec<PortfolioVehicle>,
    /// Constraint rules, applied in order.
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

/// Output of the weight-based allocator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioAllocationOutput {
    /// Capacity of each vehicle after scaling to the portfolio value.
    pub scaled_capacities: Vec<Share>,
    /// Target weights of enabled assets, normalized to sum to one.
    pub normalized_weights: Vec<Share>,
    /// Allocation before any rule ran.
    pub proposed: AllocationMatrix,
    /// Allocation after the rules, before the capacity rescale.
    pub after_rules: AllocationMatrix,
    /// Final allocation.
    pub allocation: AllocationMatrix,
    pub vehicle_totals: Vec<Share>,
    pub asset_totals: Vec<Share>,
    pub total_allocated: Money,
}

/// Distribute the portfolio value across vehicles and asset classes.
pub fn allocate_portfolio(
    input: &PortfolioAllocationInput,
) -> AllocationResult<ComputationOutput<PortfolioAllocationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_portfolio_input(input)?;

    let scaled = scale_capacities(&input.vehicles, input.total_portfolio_value)?;
    let ctx = RuleContext {
        total_portfolio_value: input.total_portfolio_value,
        capacities: input
            .vehicles
            .iter()
            .filter(|v| v.enabled)
            .map(|v| (v.name.clone(), scaled.amount_for(&v.name)))
            .collect(),
    };

    let enabled_assets: Vec<&AssetClass> = input.asset_classes.iter().filter(|a| a.enabled).collect();
    let asset_weights: Vec<(String, Decimal)> = enabled_assets
        .iter()
        .map(|a| (a.name.clone(), target_weight(input, &a.name)))
        .collect();
    let normalized = prorate(Decimal::ONE, &asset_weights);
    if normalized.total_weight.is_zero() {
        warnings.push("No enabled asset class carries a positive target weight.".into());
    }

    let proposed = initial_proposal(input, &ctx, &enabled_assets, &mut warnings);

    let rules: Vec<Box<dyn AllocationRule>> = input.rules.iter().map(|r| r.to_rule()).collect();
    let outcome = apply_rules(&ctx, &proposed, &rules);
    for note in &outcome.notes {
        warn!(note = %note, "rule not fully satisfied");
    }
    warnings.extend(outcome.notes);
    let after_rules = outcome.allocation;

    let allocation = rescale_to_capacity(&ctx, &after_rules);
    debug!(
        vehicles = input.vehicles.len(),
        assets = enabled_assets.len(),
        rules = rules.len(),
        "portfolio allocation complete"
    );

    let vehicle_totals: Vec<Share> = input
        .vehicles
        .iter()
        .map(|v| Share {
            name: v.name.clone(),
            amount: row_sum(&allocation, &v.name),
        })
        .collect();
    let asset_totals: Vec<Share> = enabled_assets
        .iter()
        .map(|a| Share {
            name: a.name.clone(),
            amount: asset_total(&allocation, &a.name),
        })
        .collect();
    let total_allocated = saturating_sum(vehicle_totals.iter().map(|s| s.amount));

    let output = PortfolioAllocationOutput {
        scaled_capacities: scaled.shares,
        normalized_weights: normalized.shares,
        proposed,
        after_rules,
        allocation,
        vehicle_totals,
        asset_totals,
        total_allocated,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Target-weight portfolio allocation with cap/floor rules and capacity rescale",
        &serde_json::json!({
            "total_portfolio_value": input.total_portfolio_value.to_string(),
            "rules": input.rules.len(),
            "eligibility": "vehicle enabled, asset enabled, asset allowed (default allow)",
            "rescale": "each vehicle row rescaled to capacity after all rules",
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Scale enabled capacities so they sum to `total_value`. Disabled
/// vehicles scale to zero.
pub fn scale_capacities(
    vehicles: &[PortfolioVehicle],
    total_value: Money,
) -> AllocationResult<Proration> {
    let weights: Vec<(String, Decimal)> = vehicles
        .iter()
        .map(|v| {
            let w = if v.enabled { v.capacity } else { Decimal::ZERO };
            (v.name.clone(), w)
        })
        .collect();

    let scaled = prorate(total_value, &weights);
    if scaled.total_weight.is_zero() {
        return Err(AllocationError::NoAvailability(
            "No enabled vehicle has positive capacity.".into(),
        ));
    }
    Ok(scaled)
}

fn target_weight(input: &PortfolioAllocationInput, asset: &str) -> Decimal {
    input
        .target_weights
        .get(asset)
        .copied()
        .unwrap_or(Decimal::ZERO)
}

/// Split each vehicle's scaled capacity across its eligible assets.
fn initial_proposal(
    input: &PortfolioAllocationInput,
    ctx: &RuleContext,
    enabled_assets: &[&AssetClass],
    warnings: &mut Vec<String>,
) -> AllocationMatrix {
    let mut matrix = AllocationMatrix::new();
    for vehicle in &input.vehicles {
        let capacity = ctx
            .capacities
            .get(&vehicle.name)
            .copied()
            .unwrap_or(Decimal::ZERO);

        let weights: Vec<(String, Decimal)> = enabled_assets
            .iter()
            .filter(|a| vehicle.allows(a))
            .map(|a| (a.name.clone(), target_weight(input, &a.name)))
            .collect();
        let split = prorate(capacity, &weights);
        if split.undistributed > Decimal::ZERO {
            warnings.push(format!(
                "Vehicle '{}': capacity of {} unused, no eligible asset class has a target weight.",
                vehicle.name, split.undistributed
            ));
        }

        let row: BTreeMap<String, Money> = split
            .shares
            .into_iter()
            .map(|s| (s.name, s.amount))
            .collect();
        matrix.insert(vehicle.name.clone(), row);
    }
    matrix
}

fn validate_portfolio_input(input: &PortfolioAllocationInput) -> AllocationResult<()> {
    if input.total_portfolio_value < Decimal::ZERO {
        return Err(AllocationError::InvalidInput {
            field: "total_portfolio_value".into(),
            reason: "Total portfolio value cannot be negative.".into(),
        });
    }
    if input.vehicles.is_empty() {
        return Err(AllocationError::InsufficientData(
            "At least one vehicle is required.".into(),
        ));
    }
    if input.asset_classes.is_empty() {
        return Err(AllocationError::InsufficientData(
            "At least one asset class is required.".into(),
        ));
    }

    let mut vehicle_names = HashSet::new();
    for v in &input.vehicles {
        if v.name.trim().is_empty() {
            return Err(AllocationError::InvalidInput {
                field: "vehicles.name".into(),
                reason: "Vehicle name must not be blank.".into(),
            });
        }
        if !vehicle_names.insert(v.name.as_str()) {
            return Err(AllocationError::InvalidInput {
                field: "vehicles.name".into(),
                reason: format!("Duplicate vehicle '{}'.", v.name),
            });
        }
    }
    let mut asset_names = HashSet::new();
    for a in &input.asset_classes {
        if a.name.trim().is_empty() {
            return Err(AllocationError::InvalidInput {
                field: "asset_classes.name".into(),
                reason: "Asset class name must not be blank.".into(),
            });
        }
        if !asset_names.insert(a.name.as_str()) {
            return Err(AllocationError::InvalidInput {
                field: "asset_classes.name".into(),
                reason: format!("Duplicate asset class '{}'.", a.name),
            });
        }
    }

    for (asset, weight) in &input.target_weights {
        if !asset_names.contains(asset.as_str()) {
            return Err(AllocationError::InvalidInput {
                field: "target_weights".into(),
                reason: format!("Unknown asset class '{asset}'."),
            });
        }
        if *weight < Decimal::ZERO {
            return Err(AllocationError::InvalidInput {
                field: "target_weights".into(),
                reason: format!("Target weight for '{asset}' cannot be negative."),
            });
        }
    }

    let capacities = input
        .vehicles
        .iter()
        .filter(|v| v.enabled && v.capacity > Decimal::ZERO)
        .map(|v| v.capacity);
    if checked_sum(capacities).is_none() {
        return Err(AllocationError::InvalidInput {
            field: "vehicles.capacity".into(),
            reason: "Total capacity is too large.".into(),
        });
    }
    if checked_sum(input.target_weights.values().copied()).is_none() {
        return Err(AllocationError::InvalidInput {
            field: "target_weights".into(),
            reason: "Sum of target weights is too large.".into(),
        });
    }

    // Each floor rule can add up to the portfolio value to the matrix.
    let floors = input
        .rules
        .iter()
        .filter(|r| matches!(r, RuleDefinition::MinAssetInPortfolio { .. }))
        .count();
    if input
        .total_portfolio_value
        .checked_mul(Decimal::from(floors + 1))
        .is_none()
    {
        return Err(AllocationError::InvalidInput {
            field: "total_portfolio_value".into(),
            reason: "Total portfolio value is too large.".into(),
        });
    }

    for rule in &input.rules {
        let (asset, pct, field) = match rule {
            RuleDefinition::MaxAssetInVehicle {
                vehicle,
                asset,
                max_pct,
            } => {
                if !vehicle_names.contains(vehicle.as_str()) {
                    return Err(AllocationError::InvalidInput {
                        field: "rules.vehicle".into(),
                        reason: format!("Unknown vehicle '{vehicle}'."),
                    });
                }
                (asset, *max_pct, "rules.max_pct")
            }
            RuleDefinition::MinAssetInPortfolio { asset, min_pct } => {
                (asset, *min_pct, "rules.min_pct")
            }
        };
        if !asset_names.contains(asset.as_str()) {
            return Err(AllocationError::InvalidInput {
                field: "rules.asset".into(),
                reason: format!("Unknown asset class '{asset}'."),
            });
        }
        if pct < Decimal::ZERO || pct > Decimal::ONE {
            return Err(AllocationError::InvalidInput {
                field: field.into(),
                reason: "Rule percentage must be in [0, 1].".into(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
