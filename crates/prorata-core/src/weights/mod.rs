pub mod allocator;
pub mod model;
pub mod rules;
