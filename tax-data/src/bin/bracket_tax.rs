use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tax_core::calculations::EmployerCostConfig;
use tax_core::calculations::common::round_half_up;
use tax_core::{BracketSchedule, BracketTaxCalculator, BracketTaxConfig};
use tax_data::logging::init_logging;
use tax_data::{BatchOptions, SalaryLoader, ScheduleLoader, run_batch, write_records};
use tracing::{debug, info};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Progressive bracket tax calculator.
///
/// Applies a marginal-rate schedule, a flat credit and an optional cap to a
/// single salary or to a CSV batch of salaries.
#[derive(Debug, Parser)]
#[command(name = "bracket-tax")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Also append log output to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compute the tax for one salary and print the breakdown.
    Compute(ComputeArgs),

    /// Compute the tax for every row of a salary CSV file.
    ///
    /// The salary file needs `id,salary` columns and may carry a `weight`
    /// column. The schedule file needs `lower_bound,rate` columns.
    Batch(BatchArgs),
}

#[derive(Debug, Args)]
struct ComputeArgs {
    /// Salary to tax.
    #[arg(short, long)]
    salary: Decimal,

    /// Bracket lower bounds, comma separated (e.g. 0,5944).
    #[arg(short, long, value_delimiter = ',', required = true)]
    levels: Vec<Decimal>,

    /// Marginal rates, one per level, comma separated (e.g. 0.0345,0.075).
    #[arg(short, long, value_delimiter = ',', required = true)]
    rates: Vec<Decimal>,

    #[command(flatten)]
    tax: TaxArgs,
}

#[derive(Debug, Args)]
struct BatchArgs {
    /// Path to the CSV file containing the bracket schedule.
    #[arg(long)]
    schedule: PathBuf,

    /// Path to the CSV file containing the salaries.
    #[arg(long)]
    salaries: PathBuf,

    /// Write results here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also gross each salary up to full employer cost.
    #[arg(long, default_value_t = false)]
    employer_cost: bool,

    #[command(flatten)]
    tax: TaxArgs,
}

/// Credit and cap flags shared by both subcommands.
#[derive(Debug, Args)]
struct TaxArgs {
    /// Number of credit points.
    #[arg(long, default_value = "2.25")]
    credit_points: Decimal,

    /// Value of a single credit point.
    #[arg(long, default_value = "219")]
    credit_value: Decimal,

    /// Salary at or above which the cap applies (0 disables the cap).
    #[arg(long, default_value = "0")]
    max_salary: Decimal,

    /// Tax returned once the cap applies (0 disables the cap).
    #[arg(long, default_value = "0")]
    max_tax: Decimal,
}

impl From<&TaxArgs> for BracketTaxConfig {
    fn from(args: &TaxArgs) -> Self {
        Self {
            credit_points: args.credit_points,
            credit_value: args.credit_value,
            max_salary: args.max_salary,
            max_tax: args.max_tax,
        }
    }
}

// ─── commands ────────────────────────────────────────────────────────────────

fn compute(args: &ComputeArgs) -> Result<()> {
    let schedule = BracketSchedule::from_levels(&args.levels, &args.rates)
        .context("Invalid bracket schedule")?;
    let config = BracketTaxConfig::from(&args.tax);

    debug!(brackets = schedule.len(), "computing single salary");
    let result = BracketTaxCalculator::new(&schedule, config)
        .calculate(args.salary)
        .context("Failed to compute tax")?;

    println!("Salary:     {}", round_half_up(result.salary));
    if result.capped {
        println!("Capped at:  {}", round_half_up(config.max_salary));
    }
    println!("Gross tax:  {}", round_half_up(result.gross_tax));
    println!("Credit:     {}", round_half_up(result.credit));
    println!("Tax:        {}", round_half_up(result.tax));
    println!("Net:        {}", round_half_up(result.net()));

    Ok(())
}

fn batch(args: &BatchArgs) -> Result<()> {
    info!("Loading schedule from: {}", args.schedule.display());
    let file = File::open(&args.schedule)
        .with_context(|| format!("Failed to open: {}", args.schedule.display()))?;
    let schedule = ScheduleLoader::parse(BufReader::new(file))
        .with_context(|| format!("Failed to parse CSV: {}", args.schedule.display()))?;

    info!("Loading salaries from: {}", args.salaries.display());
    let file = File::open(&args.salaries)
        .with_context(|| format!("Failed to open: {}", args.salaries.display()))?;
    let records = SalaryLoader::parse(BufReader::new(file))
        .with_context(|| format!("Failed to parse CSV: {}", args.salaries.display()))?;

    info!(
        "Parsed {} brackets and {} salaries",
        schedule.len(),
        records.len()
    );

    let options = BatchOptions {
        tax: BracketTaxConfig::from(&args.tax),
        employer_cost: args.employer_cost.then(EmployerCostConfig::default),
    };
    let output = run_batch(&schedule, &records, &options).context("Failed to compute batch")?;

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create: {}", path.display()))?;
            write_records(&output.records, BufWriter::new(file))
                .with_context(|| format!("Failed to write CSV: {}", path.display()))?;
            info!("Wrote {} records to: {}", output.records.len(), path.display());
        }
        None => {
            write_records(&output.records, io::stdout().lock())
                .context("Failed to write CSV to stdout")?;
        }
    }

    let summary = &output.summary;
    info!(
        records = summary.records,
        capped = summary.capped,
        total_weight = %summary.total_weight,
        weighted_salary = %round_half_up(summary.weighted_salary),
        weighted_tax = %round_half_up(summary.weighted_tax),
        weighted_net = %round_half_up(summary.weighted_net),
        "batch summary"
    );
    if let Some(rate) = summary.effective_rate() {
        info!("Effective rate: {:.4}", rate);
    }
    if let Some(imputed) = summary.weighted_imputed_wage {
        info!("Weighted imputed wage: {}", round_half_up(imputed));
    }

    Ok(())
}

// ─── entry point ─────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.log_file.as_deref())?;

    match &cli.command {
        Command::Compute(args) => compute(args),
        Command::Batch(args) => batch(args),
    }
}
