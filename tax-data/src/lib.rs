pub mod batch;
pub mod loader;
pub mod logging;

pub use batch::{
    BatchError, BatchOptions, BatchOutput, BatchSummary, TaxRecord, run_batch, write_records,
};
pub use loader::{LoaderError, SalaryLoader, SalaryRecord, ScheduleLoader};
