//! Batch tax computation over salary records.
//!
//! Every record is taxed independently against the same schedule, so the
//! output order always matches the input order. Alongside the per-record
//! results the batch keeps weighted totals, where each amount is multiplied
//! by the record's weight before summing.

use std::io::Write;

use rust_decimal::Decimal;
use serde::Serialize;
use tax_core::calculations::common::round_half_up;
use tax_core::calculations::{EmployerCostCalculator, EmployerCostConfig, EmployerCostError};
use tax_core::{BracketSchedule, BracketTaxCalculator, BracketTaxConfig, BracketTaxError};
use thiserror::Error;
use tracing::debug;

use crate::loader::SalaryRecord;

/// Errors that can occur while running a batch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("invalid tax configuration: {0}")]
    TaxConfig(#[from] BracketTaxError),

    #[error("invalid employer cost configuration: {0}")]
    EmployerCostConfig(#[from] EmployerCostError),

    #[error("row '{id}': {source}")]
    Tax { id: String, source: BracketTaxError },

    #[error("row '{id}': {source}")]
    EmployerCost { id: String, source: EmployerCostError },

    #[error("row '{id}': weight must be non-negative, got {weight}")]
    NegativeWeight { id: String, weight: Decimal },

    #[error("row '{id}': weighted totals overflow")]
    Overflow { id: String },
}

/// Options applied to every record in a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Credit and cap parameters for the tax itself.
    pub tax: BracketTaxConfig,

    /// When set, each salary is also grossed up to full employer cost.
    pub employer_cost: Option<EmployerCostConfig>,
}

/// Computed tax for a single salary record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxRecord {
    pub id: String,
    pub salary: Decimal,
    pub weight: Decimal,
    pub gross_tax: Decimal,
    pub credit: Decimal,
    pub tax: Decimal,
    pub net: Decimal,
    pub capped: bool,
    pub imputed_wage: Option<Decimal>,
}

impl TaxRecord {
    /// A copy with every monetary amount rounded to two decimal places.
    pub fn rounded(&self) -> Self {
        Self {
            id: self.id.clone(),
            salary: round_half_up(self.salary),
            weight: self.weight,
            gross_tax: round_half_up(self.gross_tax),
            credit: round_half_up(self.credit),
            tax: round_half_up(self.tax),
            net: round_half_up(self.net),
            capped: self.capped,
            imputed_wage: self.imputed_wage.map(round_half_up),
        }
    }
}

/// Weighted totals across a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Number of records processed.
    pub records: usize,

    /// Number of records whose tax came from the cap.
    pub capped: usize,

    /// Sum of record weights.
    pub total_weight: Decimal,

    /// Sum of `salary × weight`.
    pub weighted_salary: Decimal,

    /// Sum of `tax × weight`.
    pub weighted_tax: Decimal,

    /// Sum of `net × weight`.
    pub weighted_net: Decimal,

    /// Sum of `imputed_wage × weight`, when employer cost was computed.
    pub weighted_imputed_wage: Option<Decimal>,
}

/// `total + amount × weight`, or `None` outside the range of `Decimal`.
fn accumulate(
    total: Decimal,
    amount: Decimal,
    weight: Decimal,
) -> Option<Decimal> {
    amount
        .checked_mul(weight)
        .and_then(|weighted| total.checked_add(weighted))
}

impl BatchSummary {
    fn add(
        &mut self,
        record: &TaxRecord,
    ) -> Result<(), BatchError> {
        let overflow = || BatchError::Overflow {
            id: record.id.clone(),
        };
        let weight = record.weight;

        let total_weight = self.total_weight.checked_add(weight).ok_or_else(overflow)?;
        let weighted_salary =
            accumulate(self.weighted_salary, record.salary, weight).ok_or_else(overflow)?;
        let weighted_tax =
            accumulate(self.weighted_tax, record.tax, weight).ok_or_else(overflow)?;
        let weighted_net =
            accumulate(self.weighted_net, record.net, weight).ok_or_else(overflow)?;
        let weighted_imputed_wage = match record.imputed_wage {
            Some(imputed) => Some(
                accumulate(
                    self.weighted_imputed_wage.unwrap_or(Decimal::ZERO),
                    imputed,
                    weight,
                )
                .ok_or_else(overflow)?,
            ),
            None => self.weighted_imputed_wage,
        };

        self.records += 1;
        if record.capped {
            self.capped += 1;
        }
        self.total_weight = total_weight;
        self.weighted_salary = weighted_salary;
        self.weighted_tax = weighted_tax;
        self.weighted_net = weighted_net;
        self.weighted_imputed_wage = weighted_imputed_wage;
        Ok(())
    }

    /// Weighted mean tax per unit of weight, or `None` for an empty batch.
    pub fn mean_tax(&self) -> Option<Decimal> {
        self.weighted_tax.checked_div(self.total_weight)
    }

    /// Weighted tax as a share of weighted salary, or `None` when no salary
    /// was taxed.
    pub fn effective_rate(&self) -> Option<Decimal> {
        self.weighted_tax.checked_div(self.weighted_salary)
    }
}

/// Per-record results and totals for a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutput {
    pub records: Vec<TaxRecord>,
    pub summary: BatchSummary,
}

/// Taxes every record in `records` against `schedule`.
///
/// # Errors
///
/// Returns [`BatchError`] if either configuration is invalid, or names the
/// first record with a negative salary or weight or whose weighted amounts
/// overflow the totals.
///
/// # Example
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::BracketSchedule;
/// use tax_data::{BatchOptions, SalaryRecord, run_batch};
///
/// let schedule = BracketSchedule::from_levels(&[dec!(0)], &[dec!(0.1)]).unwrap();
/// let records = vec![SalaryRecord {
///     id: "a".to_string(),
///     salary: dec!(10000),
///     weight: Some(dec!(2)),
/// }];
///
/// let output = run_batch(&schedule, &records, &BatchOptions::default()).unwrap();
///
/// // 1000 gross tax minus a 492.75 credit, counted twice
/// assert_eq!(output.summary.weighted_tax, dec!(1014.50));
/// ```
pub fn run_batch(
    schedule: &BracketSchedule,
    records: &[SalaryRecord],
    options: &BatchOptions,
) -> Result<BatchOutput, BatchError> {
    options.tax.validate()?;
    let employer_cost = options
        .employer_cost
        .as_ref()
        .map(|config| {
            config.validate()?;
            Ok::<_, EmployerCostError>(EmployerCostCalculator::new(config.clone()))
        })
        .transpose()?;

    let calculator = BracketTaxCalculator::new(schedule, options.tax);
    let mut summary = BatchSummary::default();
    let mut output = Vec::with_capacity(records.len());

    for record in records {
        let weight = record.weight();
        if weight < Decimal::ZERO {
            return Err(BatchError::NegativeWeight {
                id: record.id.clone(),
                weight,
            });
        }

        let result = calculator
            .calculate(record.salary)
            .map_err(|source| BatchError::Tax {
                id: record.id.clone(),
                source,
            })?;

        let imputed_wage = employer_cost
            .as_ref()
            .map(|calc| calc.calculate(record.salary))
            .transpose()
            .map_err(|source| BatchError::EmployerCost {
                id: record.id.clone(),
                source,
            })?
            .map(|cost| cost.imputed_wage);

        let tax_record = TaxRecord {
            id: record.id.clone(),
            salary: result.salary,
            weight,
            gross_tax: result.gross_tax,
            credit: result.credit,
            tax: result.tax,
            net: result.net(),
            capped: result.capped,
            imputed_wage,
        };

        summary.add(&tax_record)?;
        output.push(tax_record);
    }

    debug!(
        records = summary.records,
        capped = summary.capped,
        weighted_tax = %summary.weighted_tax,
        "batch complete"
    );

    Ok(BatchOutput {
        records: output,
        summary,
    })
}

/// Writes tax records as CSV with monetary amounts rounded to two places.
pub fn write_records<W: Write>(
    records: &[TaxRecord],
    writer: W,
) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record.rounded())?;
    }
    wtr.flush()?;
    Ok(())
}
