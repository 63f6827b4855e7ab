use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of a marginal-rate schedule.
///
/// The bracket covers income from `lower_bound` up to the next bracket's
/// lower bound. The last bracket in a schedule is open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub lower_bound: Decimal,
    pub rate: Decimal,
}

impl TaxBracket {
    pub fn new(
        lower_bound: Decimal,
        rate: Decimal,
    ) -> Self {
        Self { lower_bound, rate }
    }
}
