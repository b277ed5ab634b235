pub mod analysis;
pub mod contract;
pub mod lenient;
pub mod product;
