use colored::Colorize;
use prorata_core::amount::amount_from_value;
use prorata_core::display::{format_money, format_money_value, format_pct_value};
use prorata_core::facility::eligibility::Facility;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{plain, result_of};

/// Render output as tables using the tabled crate.
///
/// Facility and portfolio results get their matrix layouts; anything else
/// falls back to a field/value table.
pub fn print_table(value: &Value) {
    let result = result_of(value);

    if let Some(deals) = result.get("deals").and_then(Value::as_array) {
        if let Some(availability) = result.get("availability") {
            print_availability(availability);
        }
        for deal in deals {
            print_deal(deal);
        }
        if let Some(total) = result.get("grand_total") {
            println!("\nGrand total: {}", format_money_value(total));
        }
    } else if let Some(Value::Object(matrix)) = result.get("allocation") {
        print_portfolio(result, matrix);
    } else if result.get("rows").is_some() {
        print_availability(result);
    } else if let Some(Value::Array(shares)) = result.get("shares") {
        print_shares(shares);
    } else {
        print_flat_object(result);
    }

    if let Value::Object(envelope) = value {
        print_envelope_notes(envelope);
    }
}

fn print_availability(summary: &Value) {
    let mut builder = Builder::default();
    builder.push_record(["Vehicle", "Cash", "Unfunded", "Uncalled", "Availability", "Eligible"]);
    for row in array(summary, "rows") {
        builder.push_record([
            field(row, "vehicle"),
            money(row, "cash"),
            money(row, "unfunded_commitments"),
            money(row, "uncalled_capital"),
            money(row, "availability"),
            yes_no(row.get("eligible")),
        ]);
    }
    builder.push_record([
        "Total".to_string(),
        String::new(),
        String::new(),
        String::new(),
        money(summary, "total_availability"),
        field(summary, "eligible_vehicles"),
    ]);
    println!("{}", "Availability".bold());
    println!("{}", Table::from(builder));
}

fn print_deal(deal: &Value) {
    let name = deal
        .get("deal")
        .map(|d| field(d, "name"))
        .unwrap_or_default();
    println!("\n{}", format!("Deal: {name}").bold());

    let vehicles: Vec<String> = array(deal, "totals")
        .iter()
        .map(|s| field(s, "name"))
        .collect();

    // facility x vehicle matrix with totals row
    let mut builder = Builder::default();
    let mut header = vec!["Facility".to_string(), "Size".to_string()];
    header.extend(vehicles.iter().cloned());
    header.push("Allocated".to_string());
    builder.push_record(header);

    let mut size_total = Decimal::ZERO;
    for facility in array(deal, "facilities") {
        size_total += facility.get("size").and_then(amount_from_value).unwrap_or_default();
        let mut row = vec![facility_label(facility.get("facility")), money(facility, "size")];
        row.extend(array(facility, "shares").iter().map(|s| money(s, "amount")));
        row.push(money(facility, "allocated"));
        builder.push_record(row);
    }
    let mut totals = vec!["Total".to_string(), format_money(Some(size_total))];
    totals.extend(array(deal, "totals").iter().map(|s| money(s, "amount")));
    totals.push(money(deal, "total_allocated"));
    builder.push_record(totals);
    println!("{}", Table::from(builder));

    let mut builder = Builder::default();
    builder.push_record(["Facility", "Stated", "Allocated", "Difference", "OK"]);
    for check in array(deal, "consistency") {
        builder.push_record([
            facility_label(check.get("facility")),
            money(check, "stated_size"),
            money(check, "allocated"),
            money(check, "difference"),
            yes_no(check.get("within_tolerance")),
        ]);
    }
    println!("Consistency check");
    println!("{}", Table::from(builder));

    let mut builder = Builder::default();
    builder.push_record(["Vehicle", "Allocated", "% of Deal", "% of Target Hold"]);
    for row in array(deal, "pro_rata") {
        builder.push_record([
            field(row, "vehicle"),
            money(row, "allocated"),
            pct(row, "pct_of_deal"),
            pct(row, "pct_of_target_hold"),
        ]);
    }
    println!("Pro-rata summary");
    println!("{}", Table::from(builder));

    let approved = pct(deal, "approved_hold_utilization");
    if !approved.is_empty() {
        println!("IC approved hold utilisation: {approved}");
    }
    let target = pct(deal, "target_hold_utilization");
    if !target.is_empty() {
        println!("Target hold utilisation: {target}");
    }
}

fn print_portfolio(result: &Value, matrix: &Map<String, Value>) {
    let assets: Vec<String> = array(result, "asset_totals")
        .iter()
        .map(|s| field(s, "name"))
        .collect();

    let mut builder = Builder::default();
    let mut header = vec!["Vehicle".to_string()];
    header.extend(assets.iter().cloned());
    header.push("Total".to_string());
    builder.push_record(header);

    for total in array(result, "vehicle_totals") {
        let vehicle = field(total, "name");
        let mut row = vec![vehicle.clone()];
        let cells = matrix.get(&vehicle);
        row.extend(assets.iter().map(|a| {
            cells
                .and_then(|c| c.get(a))
                .map(format_money_value)
                .unwrap_or_else(|| "-".to_string())
        }));
        row.push(money(total, "amount"));
        builder.push_record(row);
    }

    let mut totals = vec!["Total".to_string()];
    totals.extend(array(result, "asset_totals").iter().map(|s| money(s, "amount")));
    totals.push(money(result, "total_allocated"));
    builder.push_record(totals);

    println!("{}", "Portfolio allocation".bold());
    println!("{}", Table::from(builder));
}

fn print_shares(shares: &[Value]) {
    let mut builder = Builder::default();
    builder.push_record(["Participant", "Amount"]);
    for share in shares {
        builder.push_record([field(share, "name"), money(share, "amount")]);
    }
    println!("{}", Table::from(builder));
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.clone(), plain(val)]);
        }
        println!("{}", Table::from(builder));
    } else {
        println!("{}", plain(value));
    }
}

fn print_envelope_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\n{}", "Warnings:".yellow());
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn field(value: &Value, key: &str) -> String {
    value.get(key).map(plain).unwrap_or_default()
}

fn money(value: &Value, key: &str) -> String {
    format_money_value(value.get(key).unwrap_or(&Value::Null))
}

fn pct(value: &Value, key: &str) -> String {
    format_pct_value(value.get(key).unwrap_or(&Value::Null))
}

fn yes_no(value: Option<&Value>) -> String {
    match value {
        Some(Value::Bool(true)) => "yes".to_string(),
        Some(Value::Bool(false)) => "no".to_string(),
        _ => String::new(),
    }
}

fn facility_label(value: Option<&Value>) -> String {
    value
        .and_then(|v| serde_json::from_value::<Facility>(v.clone()).ok())
        .map(|f| f.to_string())
        .unwrap_or_else(|| value.map(plain).unwrap_or_default())
}
