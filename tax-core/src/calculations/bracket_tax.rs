//! Progressive bracket tax with a flat credit offset and an optional cap.
//!
//! The calculation runs in three steps:
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Cap check: if both cap fields are positive and the salary reaches `max_salary`, the result is `max_tax` |
//! | 2    | Bracket accumulation: each bracket taxes the slice of salary that falls inside it |
//! | 3    | Credit: `credit_points × credit_value` is subtracted, flooring the result at zero |
//!
//! All arithmetic is exact; callers round at their output boundary.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use tax_core::{BracketTaxConfig, compute_tax};
//!
//! let config = BracketTaxConfig {
//!     credit_points: dec!(0),
//!     ..BracketTaxConfig::default()
//! };
//!
//! let tax = compute_tax(
//!     dec!(3000),
//!     &[dec!(0), dec!(5944)],
//!     &[dec!(0.0345), dec!(0.075)],
//!     &config,
//! ).unwrap();
//!
//! assert_eq!(tax, dec!(103.5));
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::models::{BracketSchedule, ScheduleError};

/// Errors that can occur during bracket tax calculations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BracketTaxError {
    /// The salary being taxed is negative.
    #[error("salary must be non-negative, got {0}")]
    NegativeSalary(Decimal),

    /// The number of credit points is negative.
    #[error("credit points must be non-negative, got {0}")]
    NegativeCreditPoints(Decimal),

    /// The value of a single credit point is negative.
    #[error("credit point value must be non-negative, got {0}")]
    NegativeCreditValue(Decimal),

    /// The cap salary threshold is negative.
    #[error("cap salary threshold must be non-negative, got {0}")]
    NegativeMaxSalary(Decimal),

    /// The capped tax amount is negative.
    #[error("capped tax amount must be non-negative, got {0}")]
    NegativeMaxTax(Decimal),

    /// An intermediate amount left the range of `Decimal`.
    #[error("arithmetic overflow computing {0}")]
    Overflow(&'static str),

    /// The bracket schedule is malformed.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Credit and cap parameters for a bracket tax calculation.
///
/// The defaults are 2.25 credit points worth 219 each and no cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketTaxConfig {
    /// Number of credit points held by the earner.
    pub credit_points: Decimal,

    /// Monetary value of a single credit point.
    pub credit_value: Decimal,

    /// Salary at or above which the cap replaces the bracket computation.
    ///
    /// The cap is only active when both this and `max_tax` are positive.
    pub max_salary: Decimal,

    /// Flat tax returned once the cap is active.
    pub max_tax: Decimal,
}

impl Default for BracketTaxConfig {
    fn default() -> Self {
        Self {
            credit_points: dec!(2.25),
            credit_value: dec!(219),
            max_salary: Decimal::ZERO,
            max_tax: Decimal::ZERO,
        }
    }
}

impl BracketTaxConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`BracketTaxError`] if any field is negative or the credit
    /// overflows.
    pub fn validate(&self) -> Result<(), BracketTaxError> {
        if self.credit_points < Decimal::ZERO {
            return Err(BracketTaxError::NegativeCreditPoints(self.credit_points));
        }
        if self.credit_value < Decimal::ZERO {
            return Err(BracketTaxError::NegativeCreditValue(self.credit_value));
        }
        if self.max_salary < Decimal::ZERO {
            return Err(BracketTaxError::NegativeMaxSalary(self.max_salary));
        }
        if self.max_tax < Decimal::ZERO {
            return Err(BracketTaxError::NegativeMaxTax(self.max_tax));
        }
        self.credit()?;
        Ok(())
    }

    /// Total flat credit subtracted from the gross bracket tax.
    pub fn credit(&self) -> Result<Decimal, BracketTaxError> {
        self.credit_points
            .checked_mul(self.credit_value)
            .ok_or(BracketTaxError::Overflow("credit"))
    }

    pub fn cap_enabled(&self) -> bool {
        self.max_tax > Decimal::ZERO && self.max_salary > Decimal::ZERO
    }

    /// Whether `salary` triggers the cap short-circuit.
    pub fn cap_applies(
        &self,
        salary: Decimal,
    ) -> bool {
        self.cap_enabled() && salary >= self.max_salary
    }
}

/// Result of a bracket tax calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketTaxResult {
    /// Salary the tax was computed for.
    pub salary: Decimal,

    /// Tax accumulated across the brackets before the credit.
    ///
    /// Equal to `max_tax` when the cap fired.
    pub gross_tax: Decimal,

    /// Portion of the credit actually used, never more than `gross_tax`.
    pub credit: Decimal,

    /// Tax payable. Always non-negative.
    pub tax: Decimal,

    /// Indicates whether the cap replaced the bracket computation.
    pub capped: bool,
}

impl BracketTaxResult {
    fn at_cap(
        salary: Decimal,
        max_tax: Decimal,
    ) -> Self {
        Self {
            salary,
            gross_tax: max_tax,
            credit: Decimal::ZERO,
            tax: max_tax,
            capped: true,
        }
    }

    /// Salary left after the tax is paid.
    pub fn net(&self) -> Decimal {
        self.salary - self.tax
    }
}

/// Calculator applying a [`BracketSchedule`] and a [`BracketTaxConfig`].
///
/// The calculator holds no mutable state, so one instance can be shared
/// across any number of salaries.
///
/// # Example
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::{BracketSchedule, BracketTaxCalculator, BracketTaxConfig};
///
/// let schedule = BracketSchedule::from_levels(
///     &[dec!(0), dec!(5944)],
///     &[dec!(0.0345), dec!(0.075)],
/// ).unwrap();
/// let config = BracketTaxConfig {
///     credit_points: dec!(0),
///     max_salary: dec!(43370),
///     max_tax: dec!(3012),
///     ..BracketTaxConfig::default()
/// };
///
/// let calculator = BracketTaxCalculator::new(&schedule, config);
/// let result = calculator.calculate(dec!(50000)).unwrap();
///
/// assert!(result.capped);
/// assert_eq!(result.tax, dec!(3012));
/// ```
#[derive(Debug, Clone)]
pub struct BracketTaxCalculator<'a> {
    schedule: &'a BracketSchedule,
    config: BracketTaxConfig,
}

impl<'a> BracketTaxCalculator<'a> {
    pub fn new(
        schedule: &'a BracketSchedule,
        config: BracketTaxConfig,
    ) -> Self {
        Self { schedule, config }
    }

    /// Calculates the tax owed on `salary`.
    ///
    /// # Errors
    ///
    /// Returns [`BracketTaxError`] if the configuration is invalid or the
    /// salary is negative.
    pub fn calculate(
        &self,
        salary: Decimal,
    ) -> Result<BracketTaxResult, BracketTaxError> {
        self.config.validate()?;

        if salary < Decimal::ZERO {
            return Err(BracketTaxError::NegativeSalary(salary));
        }

        if self.config.cap_applies(salary) {
            debug!(
                salary = %salary,
                max_salary = %self.config.max_salary,
                max_tax = %self.config.max_tax,
                "salary at or above cap threshold; returning capped tax"
            );
            return Ok(BracketTaxResult::at_cap(salary, self.config.max_tax));
        }

        let gross_tax = self.gross_tax(salary)?;
        let credit = self.credit_used(gross_tax)?;

        Ok(BracketTaxResult {
            salary,
            gross_tax,
            credit,
            tax: gross_tax - credit,
            capped: false,
        })
    }

    /// Sums the marginal tax of every bracket the salary reaches.
    fn gross_tax(
        &self,
        salary: Decimal,
    ) -> Result<Decimal, BracketTaxError> {
        let overflow = || BracketTaxError::Overflow("bracket tax");
        let mut tax = Decimal::ZERO;

        for band in self.schedule.bands(salary) {
            if salary <= band.lower {
                break;
            }

            let top = if salary > band.upper { band.upper } else { salary };
            let taxed = top.checked_sub(band.lower).ok_or_else(overflow)?;
            tax = band
                .rate
                .checked_mul(taxed)
                .and_then(|amount| tax.checked_add(amount))
                .ok_or_else(overflow)?;

            trace!(
                lower = %band.lower,
                upper = %band.upper,
                rate = %band.rate,
                taxed = %taxed,
                running_total = %tax,
                "accumulated bracket"
            );
        }

        Ok(tax)
    }

    /// Credit applied against `gross_tax`; the whole gross tax when it does
    /// not exceed the configured credit.
    fn credit_used(
        &self,
        gross_tax: Decimal,
    ) -> Result<Decimal, BracketTaxError> {
        let credit = self.config.credit()?;
        Ok(if gross_tax <= credit { gross_tax } else { credit })
    }
}

/// Computes the tax owed on `salary` for parallel `levels` and `pcts`.
///
/// # Errors
///
/// Returns [`BracketTaxError::Schedule`] when `levels` and `pcts` do not form
/// a valid schedule, and the errors of [`BracketTaxCalculator::calculate`]
/// otherwise.
pub fn compute_tax(
    salary: Decimal,
    levels: &[Decimal],
    pcts: &[Decimal],
    config: &BracketTaxConfig,
) -> Result<Decimal, BracketTaxError> {
    let schedule = BracketSchedule::from_levels(levels, pcts)?;
    let result = BracketTaxCalculator::new(&schedule, *config).calculate(salary)?;
    Ok(result.tax)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const LEVELS: [Decimal; 2] = [dec!(0), dec!(5944)];
    const PCTS: [Decimal; 2] = [dec!(0.0345), dec!(0.075)];

    fn no_credit() -> BracketTaxConfig {
        BracketTaxConfig {
            credit_points: dec!(0),
            ..BracketTaxConfig::default()
        }
    }

    fn capped() -> BracketTaxConfig {
        BracketTaxConfig {
            credit_points: dec!(0),
            max_salary: dec!(43370),
            max_tax: dec!(3012),
            ..BracketTaxConfig::default()
        }
    }

    fn income_tax_schedule() -> BracketSchedule {
        BracketSchedule::from_levels(
            &[dec!(0), dec!(6310), dec!(9050), dec!(14530), dec!(20200)],
            &[dec!(0.10), dec!(0.14), dec!(0.20), dec!(0.31), dec!(0.35)],
        )
        .expect("valid schedule")
    }

    // =========================================================================
    // config tests
    // =========================================================================

    #[test]
    fn default_config_uses_standard_credit() {
        let config = BracketTaxConfig::default();

        assert_eq!(config.credit_points, dec!(2.25));
        assert_eq!(config.credit_value, dec!(219));
        assert_eq!(config.credit(), Ok(dec!(492.75)));
        assert!(!config.cap_enabled());
    }

    #[test]
    fn cap_requires_both_fields_positive() {
        let salary_only = BracketTaxConfig {
            max_salary: dec!(43370),
            ..BracketTaxConfig::default()
        };
        let tax_only = BracketTaxConfig {
            max_tax: dec!(3012),
            ..BracketTaxConfig::default()
        };

        assert!(!salary_only.cap_applies(dec!(50000)));
        assert!(!tax_only.cap_applies(dec!(50000)));
        assert!(capped().cap_applies(dec!(50000)));
    }

    #[test]
    fn validate_rejects_negative_credit_points() {
        let config = BracketTaxConfig {
            credit_points: dec!(-1),
            ..BracketTaxConfig::default()
        };

        assert_eq!(
            config.validate(),
            Err(BracketTaxError::NegativeCreditPoints(dec!(-1)))
        );
    }

    #[test]
    fn validate_rejects_negative_credit_value() {
        let config = BracketTaxConfig {
            credit_value: dec!(-219),
            ..BracketTaxConfig::default()
        };

        assert_eq!(
            config.validate(),
            Err(BracketTaxError::NegativeCreditValue(dec!(-219)))
        );
    }

    #[test]
    fn validate_rejects_negative_cap_fields() {
        let salary = BracketTaxConfig {
            max_salary: dec!(-1),
            ..BracketTaxConfig::default()
        };
        let tax = BracketTaxConfig {
            max_tax: dec!(-1),
            ..BracketTaxConfig::default()
        };

        assert_eq!(
            salary.validate(),
            Err(BracketTaxError::NegativeMaxSalary(dec!(-1)))
        );
        assert_eq!(tax.validate(), Err(BracketTaxError::NegativeMaxTax(dec!(-1))));
    }

    #[test]
    fn validate_rejects_credit_overflow() {
        let config = BracketTaxConfig {
            credit_points: Decimal::MAX,
            credit_value: dec!(2),
            ..BracketTaxConfig::default()
        };

        assert_eq!(
            config.validate(),
            Err(BracketTaxError::Overflow("credit"))
        );
    }

    // =========================================================================
    // compute_tax tests
    // =========================================================================

    #[test]
    fn compute_tax_single_bracket() {
        let tax = compute_tax(dec!(3000), &LEVELS, &PCTS, &no_credit());

        assert_eq!(tax, Ok(dec!(103.5)));
    }

    #[test]
    fn compute_tax_spans_two_brackets_below_cap() {
        let tax = compute_tax(dec!(40000), &LEVELS, &PCTS, &capped());

        // 0.0345 * 5944 + 0.075 * (40000 - 5944) = 205.068 + 2554.2
        assert_eq!(tax, Ok(dec!(2759.268)));
    }

    #[test]
    fn compute_tax_returns_cap_above_threshold() {
        let tax = compute_tax(dec!(50000), &LEVELS, &PCTS, &capped());

        assert_eq!(tax, Ok(dec!(3012)));
    }

    #[test]
    fn compute_tax_returns_cap_at_threshold() {
        let tax = compute_tax(dec!(43370), &LEVELS, &PCTS, &capped());

        assert_eq!(tax, Ok(dec!(3012)));
    }

    #[test]
    fn compute_tax_cap_ignores_brackets_and_credit() {
        let config = BracketTaxConfig {
            max_salary: dec!(43370),
            max_tax: dec!(3012),
            ..BracketTaxConfig::default()
        };

        let tax = compute_tax(dec!(1000000), &[dec!(0)], &[dec!(0.9)], &config);

        assert_eq!(tax, Ok(dec!(3012)));
    }

    #[test]
    fn compute_tax_zero_salary_is_zero() {
        assert_eq!(compute_tax(dec!(0), &LEVELS, &PCTS, &no_credit()), Ok(dec!(0)));
        assert_eq!(
            compute_tax(dec!(0), &LEVELS, &PCTS, &BracketTaxConfig::default()),
            Ok(dec!(0))
        );
    }

    #[test]
    fn compute_tax_below_credit_is_zero() {
        // 205.068 + 0.075 * 3056 = 434.268 <= 492.75
        let tax = compute_tax(dec!(9000), &LEVELS, &PCTS, &BracketTaxConfig::default());

        assert_eq!(tax, Ok(dec!(0)));
    }

    #[test]
    fn compute_tax_exactly_at_credit_is_zero() {
        // 205.068 + 0.075 * 3835.76 = 492.75
        let tax = compute_tax(dec!(9779.76), &LEVELS, &PCTS, &BracketTaxConfig::default());

        assert_eq!(tax, Ok(dec!(0)));
    }

    #[test]
    fn compute_tax_subtracts_credit_above_it() {
        // 205.068 + 0.075 * 14056 = 1259.268; minus 492.75
        let tax = compute_tax(dec!(20000), &LEVELS, &PCTS, &BracketTaxConfig::default());

        assert_eq!(tax, Ok(dec!(766.518)));
    }

    #[test]
    fn compute_tax_rejects_length_mismatch() {
        let tax = compute_tax(dec!(1000), &LEVELS, &[dec!(0.1)], &no_credit());

        assert_eq!(
            tax,
            Err(BracketTaxError::Schedule(ScheduleError::LengthMismatch {
                levels: 2,
                rates: 1
            }))
        );
    }

    #[test]
    fn compute_tax_rate_above_one() {
        let tax = compute_tax(dec!(1000), &[dec!(0)], &[dec!(1.5)], &no_credit());

        assert_eq!(tax, Ok(dec!(1500)));
    }

    #[test]
    fn compute_tax_negative_lower_bound() {
        // 0.1 * 100 + 0.2 * 50
        let tax = compute_tax(
            dec!(50),
            &[dec!(-100), dec!(0)],
            &[dec!(0.1), dec!(0.2)],
            &no_credit(),
        );

        assert_eq!(tax, Ok(dec!(20)));
    }

    #[test]
    fn compute_tax_empty_schedule_is_zero() {
        assert_eq!(compute_tax(dec!(100), &[], &[], &no_credit()), Ok(dec!(0)));
        assert_eq!(
            compute_tax(dec!(100), &[], &[], &BracketTaxConfig::default()),
            Ok(dec!(0))
        );
    }

    #[test]
    fn compute_tax_reports_bracket_overflow() {
        let tax = compute_tax(Decimal::MAX, &[dec!(0)], &[dec!(2)], &no_credit());

        assert_eq!(tax, Err(BracketTaxError::Overflow("bracket tax")));
    }

    #[test]
    fn compute_tax_rejects_negative_salary() {
        let tax = compute_tax(dec!(-1), &LEVELS, &PCTS, &no_credit());

        assert_eq!(tax, Err(BracketTaxError::NegativeSalary(dec!(-1))));
    }

    // =========================================================================
    // calculator tests
    // =========================================================================

    #[test]
    fn calculate_reports_breakdown() {
        let schedule = income_tax_schedule();
        let calculator = BracketTaxCalculator::new(&schedule, BracketTaxConfig::default());

        let result = calculator.calculate(dec!(12000)).expect("valid input");

        // 631 + 0.14 * 2740 + 0.20 * 2950 = 631 + 383.6 + 590
        assert_eq!(
            result,
            BracketTaxResult {
                salary: dec!(12000),
                gross_tax: dec!(1604.6),
                credit: dec!(492.75),
                tax: dec!(1111.85),
                capped: false,
            }
        );
        assert_eq!(result.net(), dec!(10888.15));
    }

    #[test]
    fn calculate_reports_partial_credit_when_gross_below_credit() {
        let schedule = income_tax_schedule();
        let calculator = BracketTaxCalculator::new(&schedule, BracketTaxConfig::default());

        let result = calculator.calculate(dec!(3000)).expect("valid input");

        assert_eq!(result.gross_tax, dec!(300));
        assert_eq!(result.credit, dec!(300));
        assert_eq!(result.tax, dec!(0));
    }

    #[test]
    fn calculate_marks_capped_results() {
        let schedule = BracketSchedule::from_levels(&LEVELS, &PCTS).expect("valid schedule");
        let calculator = BracketTaxCalculator::new(&schedule, capped());

        let result = calculator.calculate(dec!(60000)).expect("valid input");

        assert!(result.capped);
        assert_eq!(result.gross_tax, dec!(3012));
        assert_eq!(result.credit, dec!(0));
        assert_eq!(result.net(), dec!(56988));
    }

    #[test]
    fn calculate_untaxed_below_nonzero_first_threshold() {
        let schedule =
            BracketSchedule::from_levels(&[dec!(1000), dec!(2000)], &[dec!(0.1), dec!(0.2)])
                .expect("valid schedule");
        let calculator = BracketTaxCalculator::new(&schedule, no_credit());

        assert_eq!(calculator.calculate(dec!(800)).map(|r| r.tax), Ok(dec!(0)));
        assert_eq!(calculator.calculate(dec!(1500)).map(|r| r.tax), Ok(dec!(50)));
        assert_eq!(calculator.calculate(dec!(2500)).map(|r| r.tax), Ok(dec!(200)));
    }

    #[test]
    fn calculate_salary_on_bracket_boundary() {
        let schedule = BracketSchedule::from_levels(&LEVELS, &PCTS).expect("valid schedule");
        let calculator = BracketTaxCalculator::new(&schedule, no_credit());

        let result = calculator.calculate(dec!(5944)).expect("valid input");

        assert_eq!(result.tax, dec!(205.068));
    }

    #[test]
    fn calculate_rejects_invalid_config() {
        let schedule = income_tax_schedule();
        let config = BracketTaxConfig {
            credit_value: dec!(-1),
            ..BracketTaxConfig::default()
        };
        let calculator = BracketTaxCalculator::new(&schedule, config);

        assert_eq!(
            calculator.calculate(dec!(1000)),
            Err(BracketTaxError::NegativeCreditValue(dec!(-1)))
        );
    }

    // =========================================================================
    // property tests
    // =========================================================================

    #[test]
    fn tax_is_never_negative() {
        let schedule = income_tax_schedule();
        let calculator = BracketTaxCalculator::new(&schedule, BracketTaxConfig::default());

        for step in 0..=300 {
            let salary = Decimal::from(step * 100);
            let result = calculator.calculate(salary).expect("valid input");
            assert!(result.tax >= Decimal::ZERO, "negative tax at {salary}");
        }
    }

    #[test]
    fn tax_is_monotonic_without_cap() {
        let schedule = income_tax_schedule();
        let calculator = BracketTaxCalculator::new(&schedule, BracketTaxConfig::default());

        let mut previous = Decimal::ZERO;
        for step in 0..=300 {
            let salary = Decimal::from(step * 137);
            let tax = calculator.calculate(salary).expect("valid input").tax;
            assert!(tax >= previous, "tax decreased at {salary}");
            previous = tax;
        }
    }
}
