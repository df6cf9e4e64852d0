use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use prorata_core::amount::parse_amount_opt;
use prorata_core::proration;

/// Arguments for a single proration
#[derive(Args)]
pub struct ProrateArgs {
    /// Amount to distribute
    #[arg(long)]
    pub total: Decimal,

    /// Comma-separated name=weight pairs (e.g. "Fund I=10,Fund II=30")
    #[arg(long, value_delimiter = ',', required = true)]
    pub weights: Vec<String>,
}

pub fn run_prorate(args: ProrateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let weights = parse_weights(&args.weights)?;
    let result = proration::try_prorate(args.total, &weights)?;
    Ok(serde_json::to_value(result)?)
}

fn parse_weights(pairs: &[String]) -> Result<Vec<(String, Decimal)>, Box<dyn std::error::Error>> {
    pairs
        .iter()
        .map(|pair| -> Result<(String, Decimal), Box<dyn std::error::Error>> {
            let (name, weight) = pair
                .split_once('=')
                .ok_or_else(|| format!("Expected name=weight, got '{pair}'"))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(format!("Missing name in '{pair}'").into());
            }
            let weight = parse_amount_opt(weight)
                .ok_or_else(|| format!("Invalid weight for '{name}': '{}'", weight.trim()))?;
            Ok((name.to_string(), weight))
        })
        .collect()
}
