//! Ordered marginal-rate schedules.
//!
//! A schedule pairs each bracket's lower bound with the marginal rate applied
//! to income falling inside that bracket. Bracket `i` runs from
//! `levels[i]` up to `levels[i + 1]`; the last bracket is open-ended and is
//! closed off by the salary being taxed.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use tax_core::BracketSchedule;
//!
//! let schedule = BracketSchedule::from_levels(
//!     &[dec!(0), dec!(5944)],
//!     &[dec!(0.0345), dec!(0.075)],
//! ).unwrap();
//!
//! let bands: Vec<_> = schedule.bands(dec!(8000)).collect();
//! assert_eq!(bands[0].upper, dec!(5944));
//! assert_eq!(bands[1].upper, dec!(8000));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::TaxBracket;

/// Errors raised when a bracket schedule is malformed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    /// The lower bounds and rates were given with different lengths.
    #[error("schedule has {levels} levels but {rates} rates")]
    LengthMismatch { levels: usize, rates: usize },

    /// Lower bounds must be strictly increasing.
    #[error("bracket {index} lower bound {lower_bound} does not exceed previous bound {previous}")]
    NotIncreasing {
        index: usize,
        previous: Decimal,
        lower_bound: Decimal,
    },
}

/// A single slice of income taxed at one marginal rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketBand {
    pub rate: Decimal,
    pub lower: Decimal,
    pub upper: Decimal,
}

/// A validated, ascending list of tax brackets.
///
/// Only the ordering is checked. Bounds and rates may take any value, so a
/// negative first bound or a rate above one is computed as given, and an
/// empty schedule taxes nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TaxBracket>", into = "Vec<TaxBracket>")]
pub struct BracketSchedule {
    brackets: Vec<TaxBracket>,
}

impl BracketSchedule {
    /// Builds a schedule from brackets already sorted by lower bound.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::NotIncreasing`] if a lower bound is not
    /// strictly greater than its predecessor.
    pub fn new(brackets: Vec<TaxBracket>) -> Result<Self, ScheduleError> {
        if let Some(index) = brackets
            .windows(2)
            .position(|pair| pair[1].lower_bound <= pair[0].lower_bound)
        {
            return Err(ScheduleError::NotIncreasing {
                index: index + 1,
                previous: brackets[index].lower_bound,
                lower_bound: brackets[index + 1].lower_bound,
            });
        }

        Ok(Self { brackets })
    }

    /// Builds a schedule from parallel `levels` and `rates` slices.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::LengthMismatch`] when the slices differ in
    /// length, otherwise the same errors as [`BracketSchedule::new`].
    pub fn from_levels(
        levels: &[Decimal],
        rates: &[Decimal],
    ) -> Result<Self, ScheduleError> {
        if levels.len() != rates.len() {
            return Err(ScheduleError::LengthMismatch {
                levels: levels.len(),
                rates: rates.len(),
            });
        }

        let brackets = levels
            .iter()
            .zip(rates)
            .map(|(&lower_bound, &rate)| TaxBracket::new(lower_bound, rate))
            .collect();

        Self::new(brackets)
    }

    /// Pairs every bracket with its upper bound.
    ///
    /// Closed brackets end at the next bracket's lower bound. The final,
    /// open-ended bracket ends at `salary`.
    pub fn bands(
        &self,
        salary: Decimal,
    ) -> impl Iterator<Item = BracketBand> + '_ {
        let uppers = self
            .brackets
            .iter()
            .skip(1)
            .map(|b| b.lower_bound)
            .chain(std::iter::once(salary));

        self.brackets
            .iter()
            .zip(uppers)
            .map(|(bracket, upper)| BracketBand {
                rate: bracket.rate,
                lower: bracket.lower_bound,
                upper,
            })
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    pub fn levels(&self) -> Vec<Decimal> {
        self.brackets.iter().map(|b| b.lower_bound).collect()
    }

    pub fn rates(&self) -> Vec<Decimal> {
        self.brackets.iter().map(|b| b.rate).collect()
    }

    pub fn len(&self) -> usize {
        self.brackets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brackets.is_empty()
    }
}

impl TryFrom<Vec<TaxBracket>> for BracketSchedule {
    type Error = ScheduleError;

    fn try_from(brackets: Vec<TaxBracket>) -> Result<Self, Self::Error> {
        Self::new(brackets)
    }
}

impl From<BracketSchedule> for Vec<TaxBracket> {
    fn from(schedule: BracketSchedule) -> Self {
        schedule.brackets
    }
}
