//! Post-hoc constraint rules for the weight-based allocator.
//!
//! Rules run in the order given, each seeing the previous rule's output.
//! After the last rule every vehicle row is rescaled to its capacity
//! (`rescale_to_capacity`). That final rescale can partially or fully undo
//! what a rule did; the reported allocation is the post-rescale one.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::model::{asset_total, row_sum, AllocationMatrix};
use crate::proration::prorate;
use crate::types::{Money, Rate};

/// What a rule can see besides the proposal itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleContext {
    pub total_portfolio_value: Money,
    /// Scaled capacity per enabled vehicle.
    pub capacities: BTreeMap<String, Money>,
}

/// Output of applying one or more rules.
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub allocation: AllocationMatrix,
    /// Conditions the rule could not resolve (discarded excess, unmet floor).
    pub notes: Vec<String>,
}

/// A transform over a proposed allocation.
pub trait AllocationRule {
    /// Human-readable description, used in notes and logs.
    fn describe(&self) -> String;

    fn apply(&self, ctx: &RuleContext, proposed: &AllocationMatrix) -> RuleOutcome;
}

/// Caps one asset at `max_pct` of one vehicle's capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxAssetInVehicleRule {
    pub vehicle: String,
    pub asset: String,
    pub max_pct: Rate,
}

impl AllocationRule for MaxAssetInVehicleRule {
    fn describe(&self) -> String {
        format!(
            "max {} in {} <= {}",
            self.asset, self.vehicle, self.max_pct
        )
    }

    fn apply(&self, ctx: &RuleContext, proposed: &AllocationMatrix) -> RuleOutcome {
        let mut notes = Vec::new();

        let capacity = ctx
            .capacities
            .get(&self.vehicle)
            .copied()
            .unwrap_or(Decimal::ZERO);
        let cap = self.max_pct * capacity;

        let Some(current_row) = proposed.get(&self.vehicle) else {
            return RuleOutcome {
                allocation: proposed.clone(),
                notes,
            };
        };
        let current = current_row.get(&self.asset).copied().unwrap_or(Decimal::ZERO);
        if current <= cap {
            return RuleOutcome {
                allocation: proposed.clone(),
                notes,
            };
        }

        let excess = current - cap;
        let others: Vec<(String, Decimal)> = current_row
            .iter()
            .filter(|(name, amount)| **name != self.asset && **amount > Decimal::ZERO)
            .map(|(name, amount)| (name.clone(), *amount))
            .collect();

        let mut allocation = proposed.clone();
        if let Some(row) = allocation.get_mut(&self.vehicle) {
            row.insert(self.asset.clone(), cap);
            for share in prorate(excess, &others).shares {
                if let Some(amount) = row.get_mut(&share.name) {
                    *amount = amount.saturating_add(share.amount);
                }
            }
        }

        if others.is_empty() {
            notes.push(format!(
                "{}: excess of {} discarded, {} holds no other asset.",
                self.describe(),
                excess,
                self.vehicle
            ));
        }

        RuleOutcome { allocation, notes }
    }
}

/// Lifts one asset's portfolio total to at least `min_pct` of the total
/// portfolio value, topping up existing holders pro-rata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinAssetInPortfolioRule {
    pub asset: String,
    pub min_pct: Rate,
}

impl AllocationRule for MinAssetInPortfolioRule {
    fn describe(&self) -> String {
        format!("min {} in portfolio >= {}", self.asset, self.min_pct)
    }

    fn apply(&self, ctx: &RuleContext, proposed: &AllocationMatrix) -> RuleOutcome {
        let mut allocation = proposed.clone();
        let mut notes = Vec::new();

        let floor = self.min_pct * ctx.total_portfolio_value;
        let total = asset_total(&allocation, &self.asset);
        if total >= floor {
            return RuleOutcome { allocation, notes };
        }
        let shortfall = floor - total;

        let holders: Vec<(String, Decimal)> = allocation
            .iter()
            .filter_map(|(vehicle, row)| {
                row.get(&self.asset)
                    .filter(|amount| **amount > Decimal::ZERO)
                    .map(|amount| (vehicle.clone(), *amount))
            })
            .collect();

        if holders.is_empty() {
            notes.push(format!(
                "{}: floor of {} not reached, no vehicle holds {}.",
                self.describe(),
                floor,
                self.asset
            ));
            return RuleOutcome { allocation, notes };
        }

        for share in prorate(shortfall, &holders).shares {
            if let Some(amount) = allocation
                .get_mut(&share.name)
                .and_then(|row| row.get_mut(&self.asset))
            {
                *amount = amount.saturating_add(share.amount);
            }
        }

        RuleOutcome { allocation, notes }
    }
}

/// Serializable rule definitions, as they appear in the input document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleDefinition {
    MaxAssetInVehicle {
        vehicle: String,
        asset: String,
        max_pct: Rate,
    },
    MinAssetInPortfolio {
        asset: String,
        min_pct: Rate,
    },
}

impl RuleDefinition {
    pub fn to_rule(&self) -> Box<dyn AllocationRule> {
        match self {
            RuleDefinition::MaxAssetInVehicle {
                vehicle,
                asset,
                max_pct,
            } => Box::new(MaxAssetInVehicleRule {
                vehicle: vehicle.clone(),
                asset: asset.clone(),
                max_pct: *max_pct,
            }),
            RuleDefinition::MinAssetInPortfolio { asset, min_pct } => {
                Box::new(MinAssetInPortfolioRule {
                    asset: asset.clone(),
                    min_pct: *min_pct,
                })
            }
        }
    }
}

/// Apply rules in order.
pub fn apply_rules(
    ctx: &RuleContext,
    proposed: &AllocationMatrix,
    rules: &[Box<dyn AllocationRule>],
) -> RuleOutcome {
    let mut allocation = proposed.clone();
    let mut notes = Vec::new();
    for rule in rules {
        let outcome = rule.apply(ctx, &allocation);
        allocation = outcome.allocation;
        notes.extend(outcome.notes);
    }
    RuleOutcome { allocation, notes }
}

/// Rescale every row by `capacity / row_sum` so it re-sums to the vehicle's
/// capacity. Empty rows are left alone.
pub fn rescale_to_capacity(ctx: &RuleContext, matrix: &AllocationMatrix) -> AllocationMatrix {
    matrix
        .iter()
        .map(|(vehicle, row)| {
            let sum = row_sum(matrix, vehicle);
            let capacity = ctx.capacities.get(vehicle).copied().unwrap_or(Decimal::ZERO);
            let scaled = if sum.is_zero() {
                row.clone()
            } else {
                let factor = capacity / sum;
                row.iter()
                    .map(|(asset, amount)| (asset.clone(), *amount * factor))
                    .collect()
            };
            (vehicle.clone(), scaled)
        })
        .collect()
}
