//! Tax calculation modules.
//!
//! [`bracket_tax`] holds the marginal-rate calculator; [`employer_cost`]
//! builds on it to gross reported wages up to full employer cost.

pub mod bracket_tax;
pub mod common;
pub mod employer_cost;

pub use bracket_tax::{
    BracketTaxCalculator, BracketTaxConfig, BracketTaxError, BracketTaxResult, compute_tax,
};
pub use employer_cost::{
    EmployerCostCalculator, EmployerCostConfig, EmployerCostError, EmployerCostResult,
};
