use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use prorata_core::facility::allocation::{self, AllocationSettings, FacilityAllocationInput};
use prorata_core::facility::availability::{self, Vehicle};
use prorata_core::facility::deal::Deal;

use crate::input;

/// Arguments for the availability table
#[derive(Args)]
pub struct AvailabilityArgs {
    /// JSON/YAML document with a `vehicles` list
    #[arg(long, conflicts_with = "vehicles")]
    pub input: Option<String>,

    /// Vehicles table (CSV with header row, or JSON/YAML list)
    #[arg(long)]
    pub vehicles: Option<String>,
}

/// Arguments for facility allocation
#[derive(Args)]
pub struct AllocateArgs {
    /// JSON/YAML document with `deals`, `vehicles` and optional `settings`
    #[arg(long, conflicts_with_all = ["deals", "vehicles"])]
    pub input: Option<String>,

    /// Deals table (JSON/YAML list)
    #[arg(long, requires = "vehicles")]
    pub deals: Option<String>,

    /// Vehicles table (CSV with header row, or JSON/YAML list)
    #[arg(long, requires = "deals")]
    pub vehicles: Option<String>,

    /// Consistency-check tolerance (overrides the document's settings)
    #[arg(long)]
    pub tolerance: Option<Decimal>,
}

#[derive(Deserialize)]
struct VehiclesDocument {
    vehicles: Vec<Vehicle>,
}

pub fn run_availability(args: AvailabilityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let vehicles: Vec<Vehicle> = if let Some(ref path) = args.vehicles {
        input::file::read_vehicles(path)?
    } else if let Some(ref path) = args.input {
        input::file::read_document::<VehiclesDocument>(path)?.vehicles
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value::<VehiclesDocument>(data)?.vehicles
    } else {
        return Err("--input <file>, --vehicles <file> or stdin required".into());
    };
    let result = availability::availability_summary(&vehicles);
    Ok(serde_json::to_value(result)?)
}

pub fn run_allocate(args: AllocateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut input_data: FacilityAllocationInput =
        if let (Some(deals), Some(vehicles)) = (&args.deals, &args.vehicles) {
            FacilityAllocationInput {
                deals: input::file::read_document::<Vec<Deal>>(deals)?,
                vehicles: input::file::read_vehicles(vehicles)?,
                settings: AllocationSettings::default(),
            }
        } else if let Some(ref path) = args.input {
            input::file::read_document(path)?
        } else if let Some(data) = input::stdin::read_stdin()? {
            serde_json::from_value(data)?
        } else {
            return Err("--input <file>, --deals/--vehicles or stdin required".into());
        };

    if let Some(tolerance) = args.tolerance {
        input_data.settings.consistency_tolerance = tolerance;
    }

    let result = allocation::allocate_facilities(&input_data)?;
    Ok(serde_json::to_value(result)?)
}
