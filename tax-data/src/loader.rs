use std::io::Read;

use rust_decimal::Decimal;
use serde::Deserialize;
use tax_core::{BracketSchedule, ScheduleError, TaxBracket};
use thiserror::Error;

/// Errors that can occur when loading schedules or salaries from CSV.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Invalid schedule: {0}")]
    Schedule(#[from] ScheduleError),
}

impl From<csv::Error> for LoaderError {
    fn from(err: csv::Error) -> Self {
        LoaderError::CsvParse(err.to_string())
    }
}

/// A single row from a salary CSV file.
///
/// - `id`: caller-chosen identifier, carried through to the output
/// - `salary`: the gross amount to tax
/// - `weight`: optional survey or frequency weight (empty or absent means 1)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SalaryRecord {
    pub id: String,
    pub salary: Decimal,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub weight: Option<Decimal>,
}

impl SalaryRecord {
    /// The row's weight, defaulting to one.
    pub fn weight(&self) -> Decimal {
        self.weight.unwrap_or(Decimal::ONE)
    }
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Loader for bracket schedules stored as `lower_bound,rate` CSV.
///
/// - `lower_bound`: the income at which the bracket starts
/// - `rate`: the marginal rate as a decimal (e.g., 0.075 for 7.5%)
///
/// Rows must already be in ascending order of `lower_bound`; the loader
/// validates rather than sorts so a mistyped file fails loudly.
pub struct ScheduleLoader;

impl ScheduleLoader {
    /// Parse and validate a bracket schedule from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<BracketSchedule, LoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut brackets = Vec::new();

        for result in csv_reader.deserialize() {
            let bracket: TaxBracket = result?;
            brackets.push(bracket);
        }

        Ok(BracketSchedule::new(brackets)?)
    }
}

/// Loader for salary batches stored as `id,salary[,weight]` CSV.
pub struct SalaryLoader;

impl SalaryLoader {
    /// Parse salary records from a CSV reader, preserving file order.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<SalaryRecord>, LoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: SalaryRecord = result?;
            records.push(record);
        }

        Ok(records)
    }
}
