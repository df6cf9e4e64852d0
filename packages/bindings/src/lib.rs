use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Facility allocation
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct VehiclesDocument {
    vehicles: Vec<prorata_core::facility::availability::Vehicle>,
}

#[napi]
pub fn availability_summary(input_json: String) -> NapiResult<String> {
    let input: VehiclesDocument = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = prorata_core::facility::availability::availability_summary(&input.vehicles);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn allocate_facilities(input_json: String) -> NapiResult<String> {
    let input: prorata_core::facility::allocation::FacilityAllocationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = prorata_core::facility::allocation::allocate_facilities(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Portfolio allocation
// ---------------------------------------------------------------------------

#[napi]
pub fn allocate_portfolio(input_json: String) -> NapiResult<String> {
    let input: prorata_core::weights::allocator::PortfolioAllocationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        prorata_core::weights::allocator::allocate_portfolio(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Proration primitive
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ProrateRequest {
    total: Decimal,
    weights: Vec<(String, Decimal)>,
}

#[napi]
pub fn prorate(input_json: String) -> NapiResult<String> {
    let input: ProrateRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = prorata_core::proration::try_prorate(input.total, &input.weights)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
