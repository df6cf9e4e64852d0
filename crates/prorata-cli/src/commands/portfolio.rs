use clap::Args;
use serde_json::Value;

use prorata_core::weights::allocator::{self, PortfolioAllocationInput};

use crate::input;

/// Arguments for weight-based portfolio allocation
#[derive(Args)]
pub struct PortfolioArgs {
    /// JSON/YAML document with total value, asset classes, weights,
    /// vehicles and rules
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_portfolio(args: PortfolioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input_data: PortfolioAllocationInput = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file> or stdin required".into());
    };
    let result = allocator::allocate_portfolio(&input_data)?;
    Ok(serde_json::to_value(result)?)
}
