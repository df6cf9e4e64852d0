pub mod facility;
pub mod portfolio;
pub mod prorate;
