use serde_json::Value;
use std::io;

use super::{plain, result_of};

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as long-format CSV to stdout. Amounts are written raw, not
/// currency-formatted.
pub fn print_csv(value: &Value) {
    let result = result_of(value);
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    if let Some(deals) = result.get("deals").and_then(Value::as_array) {
        write_deals(&mut wtr, deals);
    } else if let Some(Value::Object(matrix)) = result.get("allocation") {
        let _ = wtr.write_record(["vehicle", "asset", "amount"]);
        for (vehicle, row) in matrix {
            if let Value::Object(row) = row {
                for (asset, amount) in row {
                    let _ = wtr.write_record([vehicle.as_str(), asset.as_str(), &plain(amount)]);
                }
            }
        }
    } else if let Some(Value::Array(rows)) = result.get("rows") {
        write_array_csv(&mut wtr, rows);
    } else if let Some(Value::Array(shares)) = result.get("shares") {
        write_array_csv(&mut wtr, shares);
    } else if let Value::Object(map) = result {
        let _ = wtr.write_record(["field", "value"]);
        for (key, val) in map {
            let _ = wtr.write_record([key.as_str(), &plain(val)]);
        }
    } else {
        let _ = wtr.write_record([&plain(result)]);
    }

    let _ = wtr.flush();
}

fn write_deals(wtr: &mut StdoutWriter<'_>, deals: &[Value]) {
    let _ = wtr.write_record(["deal", "facility", "vehicle", "amount"]);
    for deal in deals {
        let name = deal
            .get("deal")
            .and_then(|d| d.get("name"))
            .map(plain)
            .unwrap_or_default();
        let facilities = deal
            .get("facilities")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for facility in facilities {
            let label = facility.get("facility").map(plain).unwrap_or_default();
            let shares = facility
                .get("shares")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for share in shares {
                let vehicle = share.get("name").map(plain).unwrap_or_default();
                let amount = share.get("amount").map(plain).unwrap_or_default();
                let _ = wtr.write_record([name.as_str(), label.as_str(), vehicle.as_str(), amount.as_str()]);
            }
        }
    }
}

fn write_array_csv(wtr: &mut StdoutWriter<'_>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(plain).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&plain(item)]);
        }
    }
}
