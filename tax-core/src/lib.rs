pub mod calculations;
pub mod models;

pub use calculations::{
    BracketTaxCalculator, BracketTaxConfig, BracketTaxError, BracketTaxResult, compute_tax,
};
pub use models::*;
