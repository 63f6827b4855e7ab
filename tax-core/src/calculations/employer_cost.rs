//! Employer cost imputation for reported wages.
//!
//! A reported gross wage understates what the employer actually pays. This
//! module grosses the wage up to full employer cost by adding:
//!
//! | Component | Description |
//! |-----------|-------------|
//! | Employer contribution | National-insurance style contribution computed with the bracket calculator |
//! | Pension contribution  | Flat share of the wage paid into a pension fund |
//!
//! The imputed wage is `wage + employer_contribution + pension_contribution`.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use tax_core::calculations::{EmployerCostCalculator, EmployerCostConfig};
//!
//! let calculator = EmployerCostCalculator::new(EmployerCostConfig::default());
//! let result = calculator.calculate(dec!(10000)).unwrap();
//!
//! // 0.0345 * 5944 + 0.075 * 4056 = 509.268; pension 12.5% = 1250
//! assert_eq!(result.employer_contribution, dec!(509.268));
//! assert_eq!(result.pension_contribution, dec!(1250));
//! assert_eq!(result.imputed_wage, dec!(11759.268));
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculations::bracket_tax::{BracketTaxCalculator, BracketTaxConfig, BracketTaxError};
use crate::models::{BracketSchedule, TaxBracket};

/// Errors that can occur during employer cost imputation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmployerCostError {
    /// The pension contribution rate must be between 0 and 1.
    #[error("pension rate must be between 0 and 1, got {0}")]
    InvalidPensionRate(Decimal),

    /// The imputed wage left the range of `Decimal`.
    #[error("arithmetic overflow imputing employer cost for wage {0}")]
    Overflow(Decimal),

    /// The employer contribution could not be computed.
    #[error("employer contribution: {0}")]
    Contribution(#[from] BracketTaxError),
}

/// Configuration parameters for employer cost imputation.
///
/// The default reproduces the employer national-insurance schedule
/// (3.45% up to 5,944 and 7.5% above, capped at 3,012 from a wage of 43,370,
/// no credit points) together with a 12.5% employer pension contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployerCostConfig {
    /// Bracket schedule for the employer contribution.
    pub schedule: BracketSchedule,

    /// Credit and cap parameters for the employer contribution.
    pub contribution: BracketTaxConfig,

    /// Share of the wage the employer pays into a pension fund.
    pub pension_rate: Decimal,
}

impl Default for EmployerCostConfig {
    fn default() -> Self {
        let schedule = BracketSchedule::new(vec![
            TaxBracket::new(dec!(0), dec!(0.0345)),
            TaxBracket::new(dec!(5944), dec!(0.075)),
        ])
        .unwrap_or_else(|e| unreachable!("default employer schedule is valid: {e}"));

        Self {
            schedule,
            contribution: BracketTaxConfig {
                credit_points: Decimal::ZERO,
                credit_value: dec!(219),
                max_salary: dec!(43370),
                max_tax: dec!(3012),
            },
            pension_rate: dec!(0.125),
        }
    }
}

impl EmployerCostConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`EmployerCostError`] if the pension rate is outside `[0, 1]`
    /// or the contribution config is invalid.
    pub fn validate(&self) -> Result<(), EmployerCostError> {
        if self.pension_rate < Decimal::ZERO || self.pension_rate > Decimal::ONE {
            return Err(EmployerCostError::InvalidPensionRate(self.pension_rate));
        }
        self.contribution.validate()?;
        Ok(())
    }
}

/// Result of employer cost imputation for a single wage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployerCostResult {
    /// Reported gross wage.
    pub wage: Decimal,

    /// Employer contribution from the bracket schedule.
    pub employer_contribution: Decimal,

    /// Employer pension contribution.
    pub pension_contribution: Decimal,

    /// Wage grossed up to full employer cost.
    pub imputed_wage: Decimal,
}

/// Calculator for employer cost imputation.
#[derive(Debug, Clone)]
pub struct EmployerCostCalculator {
    config: EmployerCostConfig,
}

impl EmployerCostCalculator {
    pub fn new(config: EmployerCostConfig) -> Self {
        Self { config }
    }

    /// Grosses `wage` up to full employer cost.
    ///
    /// # Errors
    ///
    /// Returns [`EmployerCostError`] if the configuration is invalid, the
    /// wage is negative or the imputed wage overflows.
    pub fn calculate(
        &self,
        wage: Decimal,
    ) -> Result<EmployerCostResult, EmployerCostError> {
        self.config.validate()?;

        let employer_contribution =
            BracketTaxCalculator::new(&self.config.schedule, self.config.contribution)
                .calculate(wage)?
                .tax;
        let overflow = || EmployerCostError::Overflow(wage);
        let pension_contribution = wage
            .checked_mul(self.config.pension_rate)
            .ok_or_else(overflow)?;
        let imputed_wage = wage
            .checked_add(employer_contribution)
            .and_then(|total| total.checked_add(pension_contribution))
            .ok_or_else(overflow)?;

        Ok(EmployerCostResult {
            wage,
            employer_contribution,
            pension_contribution,
            imputed_wage,
        })
    }
}
