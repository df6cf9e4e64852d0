pub mod amount;
pub mod display;
pub mod error;
pub mod proration;
pub mod types;

#[cfg(feature = "facility")]
pub mod facility;

#[cfg(feature = "weights")]
pub mod weights;

pub use error::AllocationError;
pub use types::*;

/// Standard result type for all allocation operations
pub type AllocationResult<T> = Result<T, AllocationError>;
