use pretty_assertions::assert_eq;
use prorata_core::weights::allocator::{allocate_portfolio, PortfolioAllocationInput};
use prorata_core::weights::model::{asset_total, row_sum, AssetClass, PortfolioVehicle};
use prorata_core::weights::rules::RuleDefinition;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

// ===========================================================================
// Weight-based allocation with constraint rules
// ===========================================================================

fn approx_eq(a: Decimal, b: Decimal, eps: Decimal) -> bool {
    (a - b).abs() < eps
}

fn assets(names: &[&str]) -> Vec<AssetClass> {
    names
        .iter()
        .map(|n| AssetClass {
            name: n.to_string(),
            enabled: true,
        })
        .collect()
}

fn weights(pairs: &[(&str, Decimal)]) -> BTreeMap<String, Decimal> {
    pairs.iter().map(|(n, w)| (n.to_string(), *w)).collect()
}

fn vehicle(name: &str, capacity: Decimal, denied: &[&str]) -> PortfolioVehicle {
    PortfolioVehicle {
        name: name.into(),
        capacity,
        enabled: true,
        allowed_assets: denied.iter().map(|a| (a.to_string(), false)).collect(),
    }
}

#[test]
fn test_cap_scenario_row_sums_to_capacity() {
    let input = PortfolioAllocationInput {
        total_portfolio_value: dec!(100),
        asset_classes: assets(&["High Yield", "Investment Grade", "Loans"]),
        target_weights: weights(&[
            ("High Yield", dec!(0.40)),
            ("Investment Grade", dec!(0.35)),
            ("Loans", dec!(0.25)),
        ]),
        vehicles: vec![vehicle("Fund I", dec!(100), &[])],
        rules: vec![RuleDefinition::MaxAssetInVehicle {
            vehicle: "Fund I".into(),
            asset: "High Yield".into(),
            max_pct: dec!(0.20),
        }],
    };
    let out = allocate_portfolio(&input).unwrap().result;

    assert_eq!(out.proposed["Fund I"]["High Yield"], dec!(40));
    let row = &out.allocation["Fund I"];
    assert!(approx_eq(row["High Yield"], dec!(20), dec!(0.000001)));
    // excess 20 split 35:25
    assert!(approx_eq(row["Investment Grade"], dec!(46.666667), dec!(0.000001)));
    assert!(approx_eq(row["Loans"], dec!(33.333333), dec!(0.000001)));
    assert!(approx_eq(row_sum(&out.allocation, "Fund I"), dec!(100), dec!(0.000001)));
}

#[test]
fn test_floor_partially_undone_by_rescale() {
    // V1 holds A 45 / B 5, V2 cannot hold B. Floor B at 20%:
    // the rules lift V1's B to 20, then V1's row (65) is rescaled back to 50.
    let input = PortfolioAllocationInput {
        total_portfolio_value: dec!(100),
        asset_classes: assets(&["A", "B"]),
        target_weights: weights(&[("A", dec!(0.9)), ("B", dec!(0.1))]),
        vehicles: vec![vehicle("V1", dec!(50), &[]), vehicle("V2", dec!(50), &["B"])],
        rules: vec![RuleDefinition::MinAssetInPortfolio {
            asset: "B".into(),
            min_pct: dec!(0.20),
        }],
    };
    let out = allocate_portfolio(&input).unwrap().result;

    assert_eq!(asset_total(&out.proposed, "B"), dec!(5));
    assert_eq!(asset_total(&out.after_rules, "B"), dec!(20));

    let b = asset_total(&out.allocation, "B");
    assert!(approx_eq(b, dec!(15.384615), dec!(0.000001)), "post-rescale B = {b}");
    assert!(b < dec!(20));
    assert!(approx_eq(row_sum(&out.allocation, "V1"), dec!(50), dec!(0.000001)));
    assert_eq!(row_sum(&out.allocation, "V2"), dec!(50));
}

#[test]
fn test_unmet_floor_reported_as_warning() {
    let input = PortfolioAllocationInput {
        total_portfolio_value: dec!(100),
        asset_classes: assets(&["A", "B"]),
        target_weights: weights(&[("A", dec!(1))]),
        vehicles: vec![vehicle("V1", dec!(1), &[])],
        rules: vec![RuleDefinition::MinAssetInPortfolio {
            asset: "B".into(),
            min_pct: dec!(0.10),
        }],
    };
    let out = allocate_portfolio(&input).unwrap();
    assert_eq!(asset_total(&out.result.allocation, "B"), Decimal::ZERO);
    assert_eq!(out.warnings.len(), 1);
    assert!(out.warnings[0].contains("B"));
}

#[test]
fn test_rule_order_is_observable() {
    let base = PortfolioAllocationInput {
        total_portfolio_value: dec!(200),
        asset_classes: assets(&["HY", "IG"]),
        target_weights: weights(&[("HY", dec!(0.5)), ("IG", dec!(0.5))]),
        vehicles: vec![vehicle("V1", dec!(1), &[]), vehicle("V2", dec!(1), &["HY"])],
        rules: vec![],
    };
    let cap = RuleDefinition::MaxAssetInVehicle {
        vehicle: "V1".into(),
        asset: "HY".into(),
        max_pct: dec!(0.10),
    };
    let floor = RuleDefinition::MinAssetInPortfolio {
        asset: "HY".into(),
        min_pct: dec!(0.25),
    };

    let mut cap_first = base.clone();
    cap_first.rules = vec![cap.clone(), floor.clone()];
    let mut floor_first = base;
    floor_first.rules = vec![floor, cap];

    let a = allocate_portfolio(&cap_first).unwrap().result;
    let b = allocate_portfolio(&floor_first).unwrap().result;
    assert!(a.after_rules != b.after_rules);
}

#[test]
fn test_parse_input_document() {
    let raw = r#"{
        "total_portfolio_value": "$1,000",
        "asset_classes": [{"name": "HY"}, {"name": "IG"}, {"name": "EQ", "enabled": false}],
        "target_weights": {"HY": "0.25", "IG": "0.75", "EQ": "0.5"},
        "vehicles": [
            {"name": "V1", "capacity": 3},
            {"name": "V2", "capacity": "1", "allowed_assets": {"HY": false}}
        ],
        "rules": [{"rule": "max_asset_in_vehicle", "vehicle": "V1", "asset": "HY", "max_pct": "0.5"}]
    }"#;
    let input: PortfolioAllocationInput = serde_json::from_str(raw).unwrap();
    let out = allocate_portfolio(&input).unwrap().result;
    assert_eq!(out.scaled_capacities[0].amount, dec!(750));
    assert_eq!(out.allocation["V2"]["IG"], dec!(250));
    assert!(!out.allocation["V1"].contains_key("EQ"));
    assert!(approx_eq(out.total_allocated, dec!(1000), dec!(0.000001)));
}
