pub mod allocation;
pub mod availability;
pub mod deal;
pub mod eligibility;
pub mod report;
