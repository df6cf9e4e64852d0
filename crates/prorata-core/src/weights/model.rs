use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::amount::{lenient_money, saturating_sum};
use crate::types::Money;

/// vehicle -> asset class -> amount.
pub type AllocationMatrix = BTreeMap<String, BTreeMap<String, Money>>;

/// An asset class that can be held by vehicles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetClass {
    pub name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

/// A vehicle in the weight-based allocator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioVehicle {
    pub name: String,
    /// Relative capacity. Rescaled (as a new value) so the enabled
    /// capacities sum to the total portfolio value.
    #[serde(default, deserialize_with = "lenient_money")]
    pub capacity: Money,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Explicit allow/deny per asset class. Absent assets are allowed.
    #[serde(default)]
    pub allowed_assets: BTreeMap<String, bool>,
}

fn enabled_by_default() -> bool {
    true
}

impl PortfolioVehicle {
    /// Whether this vehicle may hold `asset`.
    pub fn allows(&self, asset: &AssetClass) -> bool {
        self.enabled
            && asset.enabled
            && self.allowed_assets.get(&asset.name).copied().unwrap_or(true)
    }
}

/// Sum of one vehicle's row; zero for an unknown vehicle.
pub fn row_sum(matrix: &AllocationMatrix, vehicle: &str) -> Money {
    matrix
        .get(vehicle)
        .map(|row| saturating_sum(row.values().copied()))
        .unwrap_or(Decimal::ZERO)
}

/// Portfolio-wide total of one asset class.
pub fn asset_total(matrix: &AllocationMatrix, asset: &str) -> Money {
    saturating_sum(matrix.values().filter_map(|row| row.get(asset)).copied())
}
