pub mod contract;
pub mod payload;
